use crate::infra::parse_date;
use crate::render::{
    print_decision_view, print_excuse_detail, print_excuse_page, print_saved_decision,
    print_settings, print_signatures,
};
use crate::session::Connection;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use excuse_portal::domain::{
    CommitteeDecision, EmployeeDecision, ExcuseId, ExcuseStatus, ExcuseType, LookupCategory,
    SignatureId,
};
use excuse_portal::error::AppError;
use excuse_portal::lookup::SessionScope;
use excuse_portal::workflows::auth::{AuthService, OtpChallenge};
use excuse_portal::workflows::review::{paginate, CommitteeInput, ExcuseFilter, ReviewService};
use excuse_portal::workflows::settings::SettingsService;
use excuse_portal::workflows::signatures::{SignatureDraft, SignatureService};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Subcommand, Debug)]
pub(crate) enum AdminCommand {
    /// Send a one-time sign-in code to an administrator e-mail
    Otp {
        #[arg(long)]
        email: String,
    },
    /// Sign in with a one-time code
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
    /// List excuses with optional filters
    List(ListArgs),
    /// Show one excuse and its review state
    Show(IdArgs),
    /// Record the employee decision (approved, rejected or committee)
    Decide(DecideArgs),
    /// Record the committee decision with comment and signatures
    Committee(CommitteeArgs),
    /// Delete an excuse
    Delete(IdArgs),
    /// Download the decision document of a finalized excuse
    Pdf(PdfArgs),
    /// Export the filtered list as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct FilterArgs {
    #[arg(long)]
    pub(crate) status: Option<ExcuseStatus>,
    #[arg(long = "type")]
    pub(crate) excuse_type: Option<ExcuseType>,
    /// Earliest submission date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Latest submission date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) to: Option<NaiveDate>,
    /// Match student name, student id or excuse id
    #[arg(long)]
    pub(crate) search: Option<String>,
}

impl From<FilterArgs> for ExcuseFilter {
    fn from(args: FilterArgs) -> Self {
        ExcuseFilter {
            status: args.status,
            excuse_type: args.excuse_type,
            from: args.from,
            to: args.to,
            search: args.search,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
}

#[derive(Args, Debug)]
pub(crate) struct IdArgs {
    #[arg(long)]
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct DecideArgs {
    #[arg(long)]
    pub(crate) id: String,
    #[arg(long)]
    pub(crate) decision: EmployeeDecision,
}

#[derive(Args, Debug)]
pub(crate) struct CommitteeArgs {
    #[arg(long)]
    pub(crate) id: String,
    #[arg(long)]
    pub(crate) decision: CommitteeDecision,
    #[arg(long, default_value = "")]
    pub(crate) comment: String,
    /// Signature id; repeat for several signatories
    #[arg(long = "signature")]
    pub(crate) signatures: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct PdfArgs {
    #[arg(long)]
    pub(crate) id: String,
    /// Directory the document is written to
    #[arg(long, default_value = ".")]
    pub(crate) out: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    /// Target file; standard output when omitted
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SignatureCommand {
    List,
    /// Create a signatory, or edit one when --id is given
    Save {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum SettingsCommand {
    Show,
    Add {
        #[arg(long)]
        category: LookupCategory,
        #[arg(long)]
        name: String,
    },
    Rename {
        #[arg(long)]
        category: LookupCategory,
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    Remove {
        #[arg(long)]
        category: LookupCategory,
        #[arg(long)]
        id: String,
    },
    /// Replace the terms text shown to students
    Terms {
        #[arg(long)]
        text: String,
    },
}

async fn review_service(connection: &Connection) -> Result<ReviewService, AppError> {
    let context = connection.context(SessionScope::Admin).await?;
    let mut review = ReviewService::new(connection.client.clone(), context);
    review.reload().await?;
    Ok(review)
}

pub(crate) async fn run_admin(
    connection: Connection,
    command: AdminCommand,
) -> Result<(), AppError> {
    match command {
        AdminCommand::Otp { email } => {
            let auth = AuthService::new(connection.client.clone(), &connection.config.auth);
            let challenge = auth.request_otp(&email).await?;
            println!("A sign-in code was sent to {}.", challenge.email());
        }
        AdminCommand::Login { email, code } => {
            let auth = AuthService::new(connection.client.clone(), &connection.config.auth);
            let challenge = OtpChallenge::new(email.trim(), Instant::now());
            let admin = auth.admin_login(&challenge, &code).await?;
            println!("Signed in as {} <{}>.", admin.name, admin.email);
        }
        AdminCommand::List(args) => {
            let review = review_service(&connection).await?;
            let matching: Vec<_> = review
                .filtered(&ExcuseFilter::from(args.filter))
                .into_iter()
                .cloned()
                .collect();
            print_excuse_page(&paginate(
                &matching,
                args.page,
                connection.config.listing.admin_page_size,
            ));
        }
        AdminCommand::Show(args) => {
            let review = review_service(&connection).await?;
            let id = ExcuseId(args.id);
            print_excuse_detail(review.find(&id)?, review.context().lookups());
            print_decision_view(&review.view(&id)?);
        }
        AdminCommand::Decide(args) => {
            let mut review = review_service(&connection).await?;
            let saved = review
                .save_employee_decision(&ExcuseId(args.id), Some(args.decision))
                .await?;
            print_saved_decision(&saved);
        }
        AdminCommand::Committee(args) => {
            let mut review = review_service(&connection).await?;
            let input = CommitteeInput {
                decision: Some(args.decision),
                comment: args.comment,
                signatures: args.signatures.into_iter().map(SignatureId).collect(),
            };
            let saved = review
                .save_committee_decision(&ExcuseId(args.id), &input)
                .await?;
            print_saved_decision(&saved);
        }
        AdminCommand::Delete(args) => {
            let mut review = review_service(&connection).await?;
            review.delete_excuse(&ExcuseId(args.id)).await?;
            println!("Excuse deleted; {} remaining.", review.excuses().len());
        }
        AdminCommand::Pdf(args) => {
            let review = review_service(&connection).await?;
            let path = review.download_pdf(&ExcuseId(args.id), &args.out).await?;
            println!("Saved {}", path.display());
        }
        AdminCommand::Export(args) => {
            let review = review_service(&connection).await?;
            let filter = ExcuseFilter::from(args.filter);
            let rows = match args.out {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    let rows = review.export_csv(file, &filter)?;
                    eprintln!("Wrote {rows} row(s) to {}", path.display());
                    rows
                }
                None => review.export_csv(std::io::stdout().lock(), &filter)?,
            };
            tracing::info!(rows, "csv export finished");
        }
    }
    Ok(())
}

pub(crate) async fn run_signatures(
    connection: Connection,
    command: SignatureCommand,
) -> Result<(), AppError> {
    let mut service = SignatureService::new(connection.client.clone());
    service.reload().await?;

    let signatures = match command {
        SignatureCommand::List => service.signatures(),
        SignatureCommand::Save {
            id,
            name,
            position,
            image_url,
        } => {
            let draft = SignatureDraft {
                id: id.map(SignatureId),
                name,
                position,
                image_url,
            };
            service.save(draft).await?
        }
        SignatureCommand::Delete { id } => service.delete(&SignatureId(id)).await?,
    };
    print_signatures(signatures);
    Ok(())
}

pub(crate) async fn run_settings(
    connection: Connection,
    command: SettingsCommand,
) -> Result<(), AppError> {
    let mut service =
        SettingsService::new(connection.client.clone(), Some(connection.cache.clone()));

    let data = match command {
        SettingsCommand::Show => service.load().await?,
        SettingsCommand::Add { category, name } => service.add_item(category, &name).await?,
        SettingsCommand::Rename { category, id, name } => {
            service.update_item(category, &id, &name).await?
        }
        SettingsCommand::Remove { category, id } => service.delete_item(category, &id).await?,
        SettingsCommand::Terms { text } => service.update_terms(&text).await?,
    };
    print_settings(data);
    Ok(())
}
