use crate::demo::{run_demo, run_rules, DemoArgs, RulesArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sponsor_match::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Sponsor Match",
    about = "Run and demonstrate the sponsor to student matching engine from the command line",
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
    /// Run a bulk matching pass over a seeded demo population and print the outcome
    Demo(DemoArgs),
    /// Print the default matching rule set
    Rules(RulesArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load the demo student and sponsor profiles into the in-memory store
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Rules(args) => run_rules(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["sponsor-match-api"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn demo_accepts_reference_date_and_flags() {
        let cli = Cli::try_parse_from([
            "sponsor-match-api",
            "demo",
            "--as-of",
            "2025-10-06",
            "--no-auto-assign",
            "--json",
        ])
        .expect("parse");

        match cli.command {
            Some(Command::Demo(args)) => {
                assert!(args.as_of.is_some());
                assert!(args.no_auto_assign);
                assert!(args.json);
            }
            other => panic!("expected demo command, got {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from(["sponsor-match-api", "serve", "--port", "9090", "--seed-demo"])
            .expect("parse");

        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(9090));
                assert!(args.seed_demo);
            }
            other => panic!("expected serve command, got {other:?}"),
        }
    }
}
