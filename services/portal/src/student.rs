use crate::infra::parse_date;
use crate::render::{print_excuse_page, print_profile, print_validation_report};
use crate::session::Connection;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use excuse_portal::domain::{
    AttachmentSlot, ExcuseType, HospitalLocation, Relationship, StudentProfile,
};
use excuse_portal::error::AppError;
use excuse_portal::lookup::SessionScope;
use excuse_portal::workflows::auth::AuthService;
use excuse_portal::workflows::student::StudentPortal;
use excuse_portal::workflows::wizard::{AdvanceOutcome, CourseRow, WizardError, WizardStep};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub(crate) enum StudentCommand {
    /// Sign in and show the student profile
    Login(Credentials),
    /// Show the terms and optionally accept them
    Terms(TermsArgs),
    /// List the student's own requests, newest first
    Requests(RequestsArgs),
    /// Fill in and submit the four-step excuse wizard
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub(crate) struct Credentials {
    /// University e-mail address
    #[arg(long)]
    pub(crate) email: String,
    /// Student id
    #[arg(long)]
    pub(crate) password: String,
}

#[derive(Args, Debug)]
pub(crate) struct TermsArgs {
    #[command(flatten)]
    pub(crate) credentials: Credentials,
    /// Record acceptance of the current terms
    #[arg(long)]
    pub(crate) accept: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RequestsArgs {
    #[command(flatten)]
    pub(crate) credentials: Credentials,
    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    #[command(flatten)]
    pub(crate) credentials: Credentials,
    /// health or death
    #[arg(long = "type")]
    pub(crate) excuse_type: ExcuseType,
    /// Hospital id (health excuses)
    #[arg(long)]
    pub(crate) hospital: Option<String>,
    /// inside_jeddah or outside_jeddah (health excuses)
    #[arg(long)]
    pub(crate) location: Option<HospitalLocation>,
    /// Relationship to the deceased (bereavement excuses)
    #[arg(long)]
    pub(crate) relationship: Option<Relationship>,
    /// First day of absence (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: NaiveDate,
    /// Number of days absent
    #[arg(long)]
    pub(crate) days: String,
    /// Optional free-text explanation
    #[arg(long, default_value = "")]
    pub(crate) reason: String,
    /// Affected course as COURSE_ID:REASON_ID; repeat for several courses
    #[arg(long = "course", value_parser = parse_course_row)]
    pub(crate) courses: Vec<CourseRow>,
    /// Medical report (PDF, PNG or JPG)
    #[arg(long)]
    pub(crate) medical: PathBuf,
    /// Sehaty excuse (PDF, PNG or JPG)
    #[arg(long)]
    pub(crate) sehaty: PathBuf,
    /// College form (PDF, PNG or JPG)
    #[arg(long)]
    pub(crate) college: PathBuf,
}

fn parse_course_row(raw: &str) -> Result<CourseRow, String> {
    match raw.split_once(':') {
        Some((course, reason)) => Ok(CourseRow::new(course.trim(), reason.trim())),
        None => Err(format!("expected COURSE_ID:REASON_ID, got '{raw}'")),
    }
}

pub(crate) async fn run_student(
    connection: Connection,
    command: StudentCommand,
) -> Result<(), AppError> {
    match command {
        StudentCommand::Login(credentials) => {
            let profile = sign_in(&connection, &credentials).await?;
            print_profile(&profile);
            Ok(())
        }
        StudentCommand::Terms(args) => terms(&connection, args).await,
        StudentCommand::Requests(args) => {
            let mut portal = open_portal(&connection, &args.credentials).await?;
            portal.refresh_requests().await?;
            print_excuse_page(&portal.requests_page(args.page));
            Ok(())
        }
        StudentCommand::Submit(args) => submit(&connection, args).await,
    }
}

async fn sign_in(
    connection: &Connection,
    credentials: &Credentials,
) -> Result<StudentProfile, AppError> {
    let auth = AuthService::new(connection.client.clone(), &connection.config.auth);
    Ok(auth.login(&credentials.email, &credentials.password).await?)
}

async fn open_portal(
    connection: &Connection,
    credentials: &Credentials,
) -> Result<StudentPortal, AppError> {
    let profile = sign_in(connection, credentials).await?;
    let context = connection.context(SessionScope::Student).await?;
    Ok(StudentPortal::new(
        connection.client.clone(),
        profile,
        context,
        &connection.config.listing,
    ))
}

async fn terms(connection: &Connection, args: TermsArgs) -> Result<(), AppError> {
    let auth = AuthService::new(connection.client.clone(), &connection.config.auth);
    let mut profile = auth
        .login(&args.credentials.email, &args.credentials.password)
        .await?;

    println!("{}", auth.terms().await?);
    if args.accept && !profile.terms_agreed {
        auth.accept_terms(&mut profile).await?;
        println!("Terms accepted.");
    } else if profile.terms_agreed {
        println!("Terms already accepted.");
    }
    Ok(())
}

async fn submit(connection: &Connection, args: SubmitArgs) -> Result<(), AppError> {
    let mut portal = open_portal(connection, &args.credentials).await?;
    let mut wizard = portal.open_wizard();

    let form = wizard.form_mut();
    form.set_excuse_type(Some(args.excuse_type));
    form.hospital = args.hospital.unwrap_or_default();
    form.location = args.location;
    form.relationship = args.relationship;
    form.excuse_date = Some(args.date);
    form.num_days = args.days;
    form.reason = args.reason;
    if !args.courses.is_empty() {
        form.courses = args.courses;
    }

    let uploader = wizard.uploader();
    for (slot, path) in [
        (AttachmentSlot::Medical, &args.medical),
        (AttachmentSlot::Sehaty, &args.sehaty),
        (AttachmentSlot::College, &args.college),
    ] {
        if let Some(read) = uploader.spawn_read(slot, path).await? {
            if !matches!(read.await, Ok(true)) {
                tracing::warn!(slot = slot.label(), "attachment read did not complete");
            }
        }
    }

    // Steps one to three only gate navigation; the last one submits.
    while wizard.current_step() != WizardStep::LAST {
        match wizard.advance().await? {
            AdvanceOutcome::Blocked(report) => {
                print_validation_report(&report);
                return Err(WizardError::Incomplete(report).into());
            }
            outcome => tracing::debug!(?outcome, "wizard advanced"),
        }
    }

    match portal.submit(&mut wizard).await {
        Ok(receipt) => {
            let id = receipt.id.map(|id| id.0).unwrap_or_else(|| "-".to_string());
            println!("Request #{id} submitted.");
            print_excuse_page(&portal.requests_page(1));
            Ok(())
        }
        Err(WizardError::Incomplete(report)) => {
            print_validation_report(&report);
            Err(WizardError::Incomplete(report).into())
        }
        Err(err) => Err(err.into()),
    }
}
