//! Orchestra - Entry Point
//!
//! Sets up logging and the LLM client, wires the orchestrator, then runs
//! either a single command or an interactive loop. Backend services are
//! attached by the embedding application; this binary runs against the
//! in-memory mocks so the pipeline can be exercised end to end.

use clap::Parser;
use orchestra::core::config::Settings;
use orchestra::core::error::Result;
use orchestra::llm::LlmClient;
use orchestra::orchestrator::{CommandOutcome, Orchestrator};
use orchestra::services::mock::{MockCalendarService, MockDriveService, MockMailService};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "orchestra", about = "Natural-language command orchestration")]
struct Cli {
    /// Run a single command and exit (otherwise starts the interactive loop)
    #[arg(short, long)]
    command: Option<String>,

    /// Simulate mutating actions without executing them
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompts for destructive actions
    #[arg(long)]
    auto_confirm: bool,

    /// Session identifier for context memory
    #[arg(long)]
    session: Option<String>,

    /// Optional TOML config file (env vars still win)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "orchestra=info".to_string()),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::from_env(),
    };
    if let Some(session) = &cli.session {
        settings.default_session = session.clone();
    }

    let model = Arc::new(LlmClient::from_settings(&settings)?);

    let mut orchestrator = Orchestrator::new(model, &settings)
        .with_mail(Arc::new(MockMailService::new()))
        .with_calendar(Arc::new(MockCalendarService::new()))
        .with_drive(Arc::new(MockDriveService::new()))
        .auto_confirm(cli.auto_confirm)
        .dry_run(cli.dry_run);

    if let Some(command) = &cli.command {
        let outcome = orchestrator.process_command(command).await;
        print_outcome(&outcome);
        return Ok(());
    }

    run_interactive(&mut orchestrator).await
}

async fn run_interactive(orchestrator: &mut Orchestrator) -> Result<()> {
    println!("\n=== ORCHESTRA ===");
    println!("Type a command in plain language, or:");
    println!("  history      - Show recent commands");
    println!("  undo         - Undo the last reversible action");
    println!("  suggestions  - Proactive suggestions");
    println!("  clear        - Clear session context");
    println!("  quit / q     - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        match input {
            "history" => {
                for record in orchestrator.memory().get_last_n_commands(10) {
                    let status = if record.success { "ok" } else { "failed" };
                    println!("[{status}] {} -> {}/{}", record.command, record.service, record.intent);
                }
            }
            "undo" => {
                let outcome = orchestrator.undo_last_action().await;
                print_outcome(&outcome);
            }
            "suggestions" => {
                let suggestions = orchestrator.suggestions().await;
                if suggestions.is_empty() {
                    println!("Nothing to suggest right now");
                }
                for suggestion in suggestions {
                    println!("- {suggestion}");
                }
            }
            "clear" => {
                orchestrator.memory_mut().clear();
                println!("Session context cleared");
            }
            command => {
                let outcome = orchestrator.process_command(command).await;
                print_outcome(&outcome);
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}

fn print_outcome(outcome: &CommandOutcome) {
    println!("{}", outcome.message);
    if let Some(data) = &outcome.data {
        if let Ok(pretty) = serde_json::to_string_pretty(data) {
            println!("{pretty}");
        }
    }
}
