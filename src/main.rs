use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use repair_assistant::core::config::{AppPaths, ConfigService};
use repair_assistant::core::logging;
use repair_assistant::state::error::InitializationError;
use repair_assistant::state::{global, AppState};

/// Repair assistant: suggestions for equipment faults grounded in past work orders
#[derive(Parser, Debug)]
#[command(name = "repair-assistant", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask about a fault, optionally continuing a stored conversation
    Ask {
        /// Equipment name, e.g. "Treadmill X9000"
        equipment: String,
        /// Description of the reported fault
        fault: String,
        /// Conversation to continue
        conversation_id: Option<i64>,
    },
    /// List stored conversations, newest first
    History,
    /// Print the merged configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);
    let config = ConfigService::new(paths.clone());

    if let Command::Config = cli.command {
        return match config.redacted_config() {
            Ok(value) => {
                println!("{}", serde_json::to_string_pretty(&value)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                tracing::error!("Config could not be read: {}", err);
                eprintln!("{}", err.user_message());
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let state = match global::get_or_try_init(|| initialize(&config)).await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("Initialization failed: {}", err);
            eprintln!("{}", err.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    let code = run(&state, cli.command).await;
    drop(state);
    global::shutdown().await;
    Ok(code)
}

async fn initialize(config: &ConfigService) -> Result<Arc<AppState>, InitializationError> {
    let settings = config.load_settings().map_err(InitializationError::Config)?;
    AppState::initialize(settings).await
}

async fn run(state: &AppState, command: Command) -> ExitCode {
    let outcome = match command {
        Command::Ask {
            equipment,
            fault,
            conversation_id,
        } => state
            .assistant
            .ask(conversation_id, &equipment, &fault)
            .await
            .map(|reply| {
                println!("{}", reply.answer);
                eprintln!("conversation {}", reply.conversation_id);
            }),
        Command::History => state.assistant.conversations().await.map(|conversations| {
            for conversation in conversations {
                println!(
                    "{}\t{}\t{} messages\t{}",
                    conversation.id,
                    conversation.name,
                    conversation.messages.len(),
                    conversation.updated_at
                );
            }
        }),
        Command::Config => Ok(()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Command failed: {}", err);
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}
