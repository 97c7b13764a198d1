use crate::admin::{
    run_admin, run_settings, run_signatures, AdminCommand, SettingsCommand, SignatureCommand,
};
use crate::server;
use crate::session::Connection;
use crate::student::{run_student, StudentCommand};
use clap::{Args, Parser, Subcommand};
use excuse_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "excuse-portal",
    about = "Submit and review academic absence excuses from the command line",
    version
)]
struct Cli {
    /// Override PORTAL_ENDPOINT_URL for this invocation
    #[arg(long, global = true)]
    endpoint: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the in-memory backend (default command)
    StubBackend(ServeArgs),
    /// Student sign-in, requests and the submission wizard
    Student {
        #[command(subcommand)]
        command: StudentCommand,
    },
    /// Administrator review of submitted excuses
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Manage committee signatories
    Signatures {
        #[command(subcommand)]
        command: SignatureCommand,
    },
    /// Manage lookup tables and the terms text
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the stub backend
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the stub backend
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::StubBackend(ServeArgs::default()));

    match command {
        Command::StubBackend(args) => server::run(args).await,
        Command::Student { command } => run_student(Connection::open(cli.endpoint)?, command).await,
        Command::Admin { command } => run_admin(Connection::open(cli.endpoint)?, command).await,
        Command::Signatures { command } => {
            run_signatures(Connection::open(cli.endpoint)?, command).await
        }
        Command::Settings { command } => {
            run_settings(Connection::open(cli.endpoint)?, command).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn stub_backend_is_the_default() {
        let cli = Cli::try_parse_from(["excuse-portal"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn committee_signatures_repeat() {
        let cli = Cli::try_parse_from([
            "excuse-portal",
            "admin",
            "committee",
            "--id",
            "7",
            "--decision",
            "approved",
            "--signature",
            "1",
            "--signature",
            "2",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Admin {
                command: AdminCommand::Committee(args),
            }) => assert_eq!(args.signatures, vec!["1", "2"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
