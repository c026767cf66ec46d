use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use wav_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Code with WAV Portal",
    about = "Run the Code with WAV registration portal or walk through a student journey",
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
    /// Register, sign in and load the dashboard against an in-memory backend
    Demo(DemoArgs),
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
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["wav-portal-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "wav-portal-api",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
        ])
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
    fn demo_flags_parse() {
        let cli = Cli::try_parse_from(["wav-portal-api", "demo", "--approve"]).expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert!(args.approve),
            other => panic!("expected demo, got {other:?}"),
        }
    }
}
