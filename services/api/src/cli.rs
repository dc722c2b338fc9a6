use crate::demo::{run_demo, run_evaluate, DemoArgs, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gbu_planner::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "GBU Planner",
    about = "Plan event risk assessments with automatic hazard selection",
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
    /// Check a selection rule against project attributes from JSON files
    Evaluate(EvaluateArgs),
    /// Seed the default catalog, create a sample project and print its briefing
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
        Command::Evaluate(args) => run_evaluate(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["gbu-planner"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn evaluate_requires_rule_project_and_date() {
        let parsed = Cli::try_parse_from(["gbu-planner", "evaluate", "--rule", "rule.json"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from([
            "gbu-planner",
            "evaluate",
            "--rule",
            "rule.json",
            "--project",
            "project.json",
            "--event-date",
            "2024-12-06",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Evaluate(args)) => {
                assert_eq!(args.event_date.to_string(), "2024-12-06");
                assert!(args.criteria.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn demo_rejects_malformed_dates() {
        let parsed = Cli::try_parse_from(["gbu-planner", "demo", "--event-date", "06.12.2024"]);
        assert!(parsed.is_err());
    }
}
