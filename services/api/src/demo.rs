use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;
use wav_portal::backend::InMemoryBackend;
use wav_portal::error::AppError;
use wav_portal::session::SessionContext;
use wav_portal::workflows::dashboard::DashboardView;
use wav_portal::workflows::login::Credentials;
use wav_portal::workflows::program::ProgramCatalogue;
use wav_portal::workflows::registration::{
    ApplicationPatch, ApplicationStatus, EducationLevel, ErrorMap, Gender, IdentityPatch,
    ProgrammingExperience, RegistrationWizard, StepOutcome,
};
use wav_portal::PortalState;

const DEMO_PASSWORD: &str = "lumley-beach";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Email address the demo student registers with.
    #[arg(long, default_value = "aminata.sesay@example.com")]
    pub(crate) email: String,
    /// Approve the application before the second dashboard load.
    #[arg(long)]
    pub(crate) approve: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { email, approve } = args;
    let state = PortalState::new(Arc::new(InMemoryBackend::default()));

    let catalogue = ProgramCatalogue::standard();
    println!("{} ({} weeks)", catalogue.name, catalogue.duration_weeks);
    for week in &catalogue.roadmap {
        println!("- Week {} [{}]: {}", week.week, week.phase, week.title);
    }
    if let Some(plan) = catalogue.recommended_plan() {
        println!("Recommended plan: {} at Le{}", plan.name, plan.price_leones);
    }

    println!("\nRegistration (passwords redacted)");
    let registration = state.registration();
    let mut wizard = RegistrationWizard::new();
    wizard.edit_identity(IdentityPatch {
        first_name: Some("Aminata".to_string()),
        email: Some("aminata.sesay".to_string()),
        password: Some("short".to_string()),
        confirm_password: Some("shorter".to_string()),
        ..IdentityPatch::default()
    });

    match registration.submit_identity(&mut wizard).await {
        Ok(StepOutcome::Blocked(errors)) => {
            println!("- Step 1 rejected locally:");
            render_errors(&errors);
        }
        Ok(other) => println!("- Unexpected step 1 outcome: {other:?}"),
        Err(err) => {
            println!("  Registration unavailable: {err}");
            return Ok(());
        }
    }

    wizard.edit_identity(IdentityPatch {
        last_name: Some("Sesay".to_string()),
        email: Some(email.clone()),
        phone: Some("+23276555010".to_string()),
        password: Some(DEMO_PASSWORD.to_string()),
        confirm_password: Some(DEMO_PASSWORD.to_string()),
        gender: Some(Gender::Female),
        date_of_birth: NaiveDate::from_ymd_opt(2000, 6, 14),
        ..IdentityPatch::default()
    });
    match registration.submit_identity(&mut wizard).await {
        Ok(StepOutcome::Advanced(cursor)) => {
            println!("- Step 1 accepted -> step {} ({})", cursor.step(), cursor.title());
        }
        Ok(StepOutcome::Blocked(errors)) => {
            println!("- Step 1 blocked:");
            render_errors(&errors);
            return Ok(());
        }
        Ok(other) => {
            println!("- Unexpected step 1 outcome: {other:?}");
            return Ok(());
        }
        Err(err) => {
            println!("  Registration unavailable: {err}");
            return Ok(());
        }
    }

    wizard.edit_application(ApplicationPatch {
        address: Some("Wilkinson Road, Freetown".to_string()),
        school_university: Some("Fourah Bay College".to_string()),
        current_course: Some("Computer Science".to_string()),
        education_level: Some(EducationLevel::Bachelor),
        programming_experience: Some(ProgrammingExperience::Beginner),
        web_dev_challenges: Some("Turning designs into responsive pages".to_string()),
        bootcamp_goals: Some("Build and ship a full-stack project".to_string()),
        previous_projects: None,
        has_laptop: Some(true),
        availability_confirmed: Some(true),
        agree_terms: Some(true),
    });
    match registration.submit_application(&mut wizard).await {
        Ok(StepOutcome::Completed { redirect }) => {
            println!("- Step 2 accepted -> redirect to {}", redirect.label());
        }
        Ok(StepOutcome::Blocked(errors)) => {
            println!("- Step 2 blocked:");
            render_errors(&errors);
            return Ok(());
        }
        Ok(other) => {
            println!("- Unexpected step 2 outcome: {other:?}");
            return Ok(());
        }
        Err(err) => {
            println!("  Registration unavailable: {err}");
            return Ok(());
        }
    }

    println!("\nSign in as {email}");
    let credentials = Credentials {
        email,
        password: DEMO_PASSWORD.to_string(),
    };
    let success = match state.login().submit(&credentials, None).await {
        Ok(success) => success,
        Err(err) => {
            println!("  Sign in failed: {err}");
            return Ok(());
        }
    };
    if let Some(page) = success.redirect {
        println!("- Signed in -> redirect to {}", page.label());
    }

    let mut context = SessionContext::established(success.session);
    let dashboard = state.dashboard();
    match dashboard.load(&mut context).await {
        Ok(view) => render_dashboard(&view),
        Err(err) => {
            println!("  Dashboard unavailable: {err}");
            return Ok(());
        }
    }

    if approve {
        if let Some(account_id) = context.account_id() {
            state
                .backend
                .set_application_status(account_id, ApplicationStatus::Approved)?;
            println!("\nApplication approved by staff");
        }
        match dashboard.load(&mut context).await {
            Ok(view) => render_dashboard(&view),
            Err(err) => println!("  Dashboard unavailable: {err}"),
        }
    }

    let landing = state.login().sign_out(&mut context).await?;
    println!("\nSigned out -> redirect to {}", landing.label());
    Ok(())
}

fn render_errors(errors: &ErrorMap) {
    for key in errors.keys() {
        println!("  - {}: {}", key, errors.get(key).unwrap_or_default());
    }
}

fn render_dashboard(view: &DashboardView) {
    println!("\n{}", view.welcome);
    println!("- Application status: {}", view.status.label());
    if let Some(notice) = view.status_notice {
        println!("  {notice}");
    }
    if let Some(application) = &view.application {
        println!(
            "- {} at {}",
            application.current_course, application.school_university
        );
    }
    println!(
        "- Pay {} via {} to {} (reference \"{}\")",
        view.payment.amount, view.payment.method, view.payment.recipient, view.payment.reference
    );
}
