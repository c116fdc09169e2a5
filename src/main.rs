use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use trade_journal_lib::{
    coach::GeminiClient,
    commands::{self, strategy::Field, trades::TradeFields},
    config::AppConfig,
    repository::TradeRepository,
    sync::StrategyEditor,
};

#[derive(Parser)]
#[command(name = "trade-journal")]
#[command(about = "Log trades, review your stats and find your sweet spots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all trades, newest first
    List,
    /// Show one trade
    Show { id: String },
    /// Log a new trade
    Add {
        #[command(flatten)]
        fields: TradeFields,
    },
    /// Change fields of a logged trade
    Edit {
        id: String,
        #[command(flatten)]
        fields: TradeFields,
    },
    /// Delete a trade
    Delete { id: String },
    /// Dashboard: totals, win rate, net P&L and recent activity
    Stats,
    /// Sweet spots, danger zones and per-category breakdowns
    Patterns,
    /// Ask the AI coach for insights on your recent trades
    Coach {
        /// Gemini key for this run (overrides GEMINI_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Strategy & rules document
    Strategy {
        #[command(subcommand)]
        action: StrategyAction,
    },
}

#[derive(Subcommand)]
enum StrategyAction {
    /// Print the stored document
    Show,
    /// Replace the strategy and/or notes text
    Set {
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Append lines from stdin, autosaving when typing pauses
    Edit {
        #[arg(long, value_enum, default_value_t = Field::Notes)]
        field: Field,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let store = config.open_store()?;
    info!("Using {} store", store.backend_name());

    let mut repo = TradeRepository::new(store.clone());

    match cli.command {
        Commands::List => commands::trades::list(&mut repo).await?,
        Commands::Show { id } => commands::trades::show(&mut repo, &id).await?,
        Commands::Add { fields } => commands::trades::add(&mut repo, fields).await?,
        Commands::Edit { id, fields } => commands::trades::edit(&mut repo, &id, fields).await?,
        Commands::Delete { id } => commands::trades::delete(&mut repo, &id).await?,
        Commands::Stats => commands::stats::run(&mut repo).await?,
        Commands::Patterns => commands::patterns::run(&mut repo).await?,
        Commands::Coach { api_key } => {
            let key = config.coach_key(api_key.as_deref()).unwrap_or_default();
            let client = GeminiClient::new(key).with_model(config.gemini_model.clone());
            commands::patterns::coach(&mut repo, &client).await?
        }
        Commands::Strategy { action } => {
            let editor = StrategyEditor::new(store);
            match action {
                StrategyAction::Show => commands::strategy::show(&editor).await?,
                StrategyAction::Set { strategy, notes } => {
                    commands::strategy::set(&editor, strategy, notes).await?
                }
                StrategyAction::Edit { field } => {
                    commands::strategy::edit(&editor, field, tokio::io::stdin()).await?
                }
            }
        }
    }

    Ok(())
}
