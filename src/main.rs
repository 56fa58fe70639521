use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use squad_gear::config::Config;
use squad_gear::report::print_state;
use squad_gear::store::{DocumentStore, MemoryStore, SurrealStore};
use squad_gear::{
    EquipmentLoader, EquipmentRecord, EquipmentSheet, EquipmentView, LoaderSettings,
    NormalizeOptions, ViewState, normalize_with,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "squad-gear")]
#[command(about = "Equipment assigned to a player")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and show a player's equipment
    Show {
        /// Player identifier
        #[arg(long)]
        player: String,
        /// Read documents from a local JSON file instead of the database
        #[arg(long)]
        fixtures: Option<PathBuf>,
        /// Print the view state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Normalize a single stored document from a JSON file
    Check {
        /// Path to the document
        file: PathBuf,
        /// Also read the old boolean-flag shape
        #[arg(long)]
        legacy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("squad_gear=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show {
            player,
            fixtures,
            json,
        } => {
            let config = Config::load()?;
            let store: Arc<dyn DocumentStore> = match fixtures {
                Some(path) => Arc::new(
                    MemoryStore::from_json_file(&path, &config.equipment.collection)
                        .with_context(|| format!("Failed to load fixtures from {}", path.display()))?,
                ),
                None => Arc::new(SurrealStore::connect(&config).await?),
            };
            show(store, &config, &player, json).await?;
        }
        Commands::Check { file, legacy } => {
            check(&file, legacy)?;
        }
    }

    Ok(())
}

async fn show(
    store: Arc<dyn DocumentStore>,
    config: &Config,
    player: &str,
    json: bool,
) -> Result<()> {
    let loader = EquipmentLoader::new(store, LoaderSettings::from(&config.equipment));
    let options = NormalizeOptions {
        legacy_flags: config.equipment.legacy_flags,
    };
    let view = EquipmentView::new(loader, player, options);
    let outcome = view.load().await;
    info!(player, ?outcome, "equipment view loaded");

    let state = view.state();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_state(&state);
    }

    if let ViewState::Failed { message, .. } = &state {
        anyhow::bail!("{}", message);
    }
    Ok(())
}

fn check(file: &Path, legacy: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let record: EquipmentRecord = serde_json::from_str(&content)
        .with_context(|| format!("{} is not an equipment document", file.display()))?;

    let items = normalize_with(&record, &NormalizeOptions { legacy_flags: legacy });
    let sheet = EquipmentSheet::build(&record, &items);
    println!("{}", serde_json::to_string_pretty(&sheet)?);
    Ok(())
}
