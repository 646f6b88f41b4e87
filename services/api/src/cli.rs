use crate::admin::{run_list, ListArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Job Application Intake",
    about = "Serve the paid job application form and inspect submitted applications",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect stored applications without starting the server
    Applications {
        #[command(subcommand)]
        command: ApplicationsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ApplicationsCommand {
    /// Print submitted applications, newest first
    List(ListArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Applications {
            command: ApplicationsCommand::List(args),
        } => run_list(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["job-intake-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_host_and_port_overrides() {
        let cli = Cli::try_parse_from(["job-intake-api", "serve", "--host", "0.0.0.0", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(8080));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn applications_list_parses_limit() {
        let cli = Cli::try_parse_from(["job-intake-api", "applications", "list", "--limit", "5"])
            .expect("parses");
        match cli.command {
            Some(Command::Applications {
                command: ApplicationsCommand::List(args),
            }) => assert_eq!(args.limit, Some(5)),
            other => panic!("expected applications list, got {other:?}"),
        }
    }
}
