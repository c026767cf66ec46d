use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backend::{AccountId, AccountMetadata, ApplicationRow, ProfileRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EducationLevel {
    HighSchool,
    Diploma,
    Bachelor,
    Master,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgrammingExperience {
    #[serde(rename = "none")]
    NoExperience,
    Beginner,
    Intermediate,
    Advanced,
}

/// Review state of a submitted bootcamp application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Step 1 answers: identity and credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
}

impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .field("confirm_password", &"<redacted>")
            .field("gender", &self.gender)
            .field("date_of_birth", &self.date_of_birth)
            .finish()
    }
}

impl IdentityRecord {
    /// Sign-up metadata; `None` until gender and date of birth are filled in.
    pub fn metadata(&self) -> Option<AccountMetadata> {
        Some(AccountMetadata {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            gender: self.gender?,
            date_of_birth: self.date_of_birth?,
        })
    }

    pub fn profile_row(&self, id: &AccountId) -> Option<ProfileRow> {
        let metadata = self.metadata()?;
        Some(ProfileRow {
            id: id.clone(),
            first_name: metadata.first_name,
            last_name: metadata.last_name,
            phone: metadata.phone,
            gender: metadata.gender,
            date_of_birth: metadata.date_of_birth,
            created_at: None,
        })
    }

    pub fn apply(&mut self, patch: IdentityPatch) -> Vec<IdentityField> {
        let mut touched = Vec::new();
        if let Some(value) = patch.first_name {
            self.first_name = value;
            touched.push(IdentityField::FirstName);
        }
        if let Some(value) = patch.last_name {
            self.last_name = value;
            touched.push(IdentityField::LastName);
        }
        if let Some(value) = patch.email {
            self.email = value;
            touched.push(IdentityField::Email);
        }
        if let Some(value) = patch.phone {
            self.phone = value;
            touched.push(IdentityField::Phone);
        }
        if let Some(value) = patch.password {
            self.password = value;
            touched.push(IdentityField::Password);
        }
        if let Some(value) = patch.confirm_password {
            self.confirm_password = value;
            touched.push(IdentityField::ConfirmPassword);
        }
        if let Some(value) = patch.gender {
            self.gender = Some(value);
            touched.push(IdentityField::Gender);
        }
        if let Some(value) = patch.date_of_birth {
            self.date_of_birth = Some(value);
            touched.push(IdentityField::DateOfBirth);
        }
        touched
    }
}

/// Partial update of step 1; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IdentityPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    FirstName,
    LastName,
    Email,
    Phone,
    Password,
    ConfirmPassword,
    Gender,
    DateOfBirth,
}

impl IdentityField {
    pub const fn key(self) -> &'static str {
        match self {
            IdentityField::FirstName => "firstName",
            IdentityField::LastName => "lastName",
            IdentityField::Email => "email",
            IdentityField::Phone => "phone",
            IdentityField::Password => "password",
            IdentityField::ConfirmPassword => "confirmPassword",
            IdentityField::Gender => "gender",
            IdentityField::DateOfBirth => "dateOfBirth",
        }
    }
}

/// Step 2 answers: background, goals and the required confirmations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub address: String,
    pub school_university: String,
    pub current_course: String,
    pub education_level: Option<EducationLevel>,
    pub programming_experience: Option<ProgrammingExperience>,
    pub web_dev_challenges: String,
    pub bootcamp_goals: String,
    pub previous_projects: String,
    pub has_laptop: bool,
    pub availability_confirmed: bool,
    pub agree_terms: bool,
}

impl ApplicationRecord {
    /// Row for a new application; `None` until both selects are answered.
    pub fn application_row(&self, user_id: &AccountId) -> Option<ApplicationRow> {
        let previous_projects = match self.previous_projects.trim() {
            "" => None,
            _ => Some(self.previous_projects.clone()),
        };

        Some(ApplicationRow {
            user_id: user_id.clone(),
            address: self.address.clone(),
            school_university: self.school_university.clone(),
            current_course: self.current_course.clone(),
            education_level: self.education_level?,
            programming_experience: self.programming_experience?,
            web_dev_challenges: self.web_dev_challenges.clone(),
            bootcamp_goals: self.bootcamp_goals.clone(),
            previous_projects,
            has_laptop: self.has_laptop,
            availability_confirmed: self.availability_confirmed,
            terms_agreed: self.agree_terms,
            application_status: ApplicationStatus::Pending,
            submitted_at: None,
        })
    }

    pub fn apply(&mut self, patch: ApplicationPatch) -> Vec<ApplicationField> {
        let mut touched = Vec::new();
        if let Some(value) = patch.address {
            self.address = value;
            touched.push(ApplicationField::Address);
        }
        if let Some(value) = patch.school_university {
            self.school_university = value;
            touched.push(ApplicationField::SchoolUniversity);
        }
        if let Some(value) = patch.current_course {
            self.current_course = value;
            touched.push(ApplicationField::CurrentCourse);
        }
        if let Some(value) = patch.education_level {
            self.education_level = Some(value);
            touched.push(ApplicationField::EducationLevel);
        }
        if let Some(value) = patch.programming_experience {
            self.programming_experience = Some(value);
            touched.push(ApplicationField::ProgrammingExperience);
        }
        if let Some(value) = patch.web_dev_challenges {
            self.web_dev_challenges = value;
            touched.push(ApplicationField::WebDevChallenges);
        }
        if let Some(value) = patch.bootcamp_goals {
            self.bootcamp_goals = value;
            touched.push(ApplicationField::BootcampGoals);
        }
        if let Some(value) = patch.previous_projects {
            self.previous_projects = value;
            touched.push(ApplicationField::PreviousProjects);
        }
        if let Some(value) = patch.has_laptop {
            self.has_laptop = value;
            touched.push(ApplicationField::HasLaptop);
        }
        if let Some(value) = patch.availability_confirmed {
            self.availability_confirmed = value;
            touched.push(ApplicationField::AvailabilityConfirmed);
        }
        if let Some(value) = patch.agree_terms {
            self.agree_terms = value;
            touched.push(ApplicationField::AgreeTerms);
        }
        touched
    }
}

/// Partial update of step 2; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationPatch {
    pub address: Option<String>,
    pub school_university: Option<String>,
    pub current_course: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub programming_experience: Option<ProgrammingExperience>,
    pub web_dev_challenges: Option<String>,
    pub bootcamp_goals: Option<String>,
    pub previous_projects: Option<String>,
    pub has_laptop: Option<bool>,
    pub availability_confirmed: Option<bool>,
    pub agree_terms: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationField {
    Address,
    SchoolUniversity,
    CurrentCourse,
    EducationLevel,
    ProgrammingExperience,
    WebDevChallenges,
    BootcampGoals,
    PreviousProjects,
    HasLaptop,
    AvailabilityConfirmed,
    AgreeTerms,
}

impl ApplicationField {
    pub const fn key(self) -> &'static str {
        match self {
            ApplicationField::Address => "address",
            ApplicationField::SchoolUniversity => "schoolUniversity",
            ApplicationField::CurrentCourse => "currentCourse",
            ApplicationField::EducationLevel => "educationLevel",
            ApplicationField::ProgrammingExperience => "programmingExperience",
            ApplicationField::WebDevChallenges => "webDevChallenges",
            ApplicationField::BootcampGoals => "bootcampGoals",
            ApplicationField::PreviousProjects => "previousProjects",
            ApplicationField::HasLaptop => "hasLaptop",
            ApplicationField::AvailabilityConfirmed => "availabilityConfirmed",
            ApplicationField::AgreeTerms => "agreeTerms",
        }
    }
}
