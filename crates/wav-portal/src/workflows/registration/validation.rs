use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{ApplicationField, ApplicationRecord, IdentityField, IdentityRecord};

/// Key used for failures that do not belong to a single field.
pub const GENERAL_KEY: &str = "general";

pub const MIN_PASSWORD_CHARS: usize = 6;

/// Field-keyed, human-readable messages shown next to the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<&'static str, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map holding a single general message.
    pub fn general(message: impl Into<String>) -> Self {
        let mut map = Self::new();
        map.insert(GENERAL_KEY, message);
        map
    }

    pub fn insert(&mut self, key: &'static str, message: impl Into<String>) {
        self.0.insert(key, message.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn clear_field(&mut self, key: &str) {
        self.0.remove(key);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Checks every step 1 field; a step passes only when the returned map is empty.
pub fn validate_identity(record: &IdentityRecord) -> ErrorMap {
    let mut errors = ErrorMap::new();

    if blank(&record.first_name) {
        errors.insert(IdentityField::FirstName.key(), "First name is required");
    }
    if blank(&record.last_name) {
        errors.insert(IdentityField::LastName.key(), "Last name is required");
    }

    if blank(&record.email) {
        errors.insert(IdentityField::Email.key(), "Email is required");
    } else if !record.email.contains('@') {
        errors.insert(IdentityField::Email.key(), "Please enter a valid email");
    }

    if blank(&record.phone) {
        errors.insert(IdentityField::Phone.key(), "Phone number is required");
    }

    // Passwords are compared raw: surrounding whitespace is part of the secret.
    if record.password.is_empty() {
        errors.insert(IdentityField::Password.key(), "Password is required");
    } else if record.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert(
            IdentityField::Password.key(),
            "Password must be at least 6 characters",
        );
    }

    if record.confirm_password.is_empty() {
        errors.insert(
            IdentityField::ConfirmPassword.key(),
            "Please confirm your password",
        );
    } else if record.password != record.confirm_password {
        errors.insert(IdentityField::ConfirmPassword.key(), "Passwords do not match");
    }

    if record.gender.is_none() {
        errors.insert(IdentityField::Gender.key(), "Please select your gender");
    }
    if record.date_of_birth.is_none() {
        errors.insert(IdentityField::DateOfBirth.key(), "Date of birth is required");
    }

    errors
}

/// Checks every step 2 field. Previous projects is optional.
pub fn validate_application(record: &ApplicationRecord) -> ErrorMap {
    let mut errors = ErrorMap::new();

    if blank(&record.address) {
        errors.insert(ApplicationField::Address.key(), "Address is required");
    }
    if blank(&record.school_university) {
        errors.insert(
            ApplicationField::SchoolUniversity.key(),
            "School/University is required",
        );
    }
    if blank(&record.current_course) {
        errors.insert(
            ApplicationField::CurrentCourse.key(),
            "Current course is required",
        );
    }
    if record.education_level.is_none() {
        errors.insert(
            ApplicationField::EducationLevel.key(),
            "Education level is required",
        );
    }
    if record.programming_experience.is_none() {
        errors.insert(
            ApplicationField::ProgrammingExperience.key(),
            "Programming experience is required",
        );
    }
    if blank(&record.web_dev_challenges) {
        errors.insert(
            ApplicationField::WebDevChallenges.key(),
            "Please describe your challenges",
        );
    }
    if blank(&record.bootcamp_goals) {
        errors.insert(
            ApplicationField::BootcampGoals.key(),
            "Please describe your goals",
        );
    }
    if !record.has_laptop {
        errors.insert(
            ApplicationField::HasLaptop.key(),
            "Laptop access is required for the bootcamp",
        );
    }
    if !record.availability_confirmed {
        errors.insert(
            ApplicationField::AvailabilityConfirmed.key(),
            "Please confirm your availability",
        );
    }
    if !record.agree_terms {
        errors.insert(
            ApplicationField::AgreeTerms.key(),
            "You must agree to the terms and conditions",
        );
    }

    errors
}
