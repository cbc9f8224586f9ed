use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sea_orm_migration::MigratorTrait;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use statemachine_data::config::Settings;
use statemachine_data::database::{establish_connection, migrations::Migrator, TransitionKind};
use statemachine_data::model::{DocumentFormat, MachineDocument};
use statemachine_data::services::{ImportMode, MachineDocumentService, TransitionService};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// YAML settings file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path, overrides the settings file
    #[clap(short, long, global = true)]
    database: Option<String>,
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Store a machine document (JSON or YAML)
    Import {
        #[clap(short, long)]
        file: PathBuf,
        /// Replace the machine if it already exists
        #[clap(short, long)]
        replace: bool,
    },
    /// Write a stored machine as a document
    Export {
        #[clap(short, long)]
        machine_id: String,
        #[clap(short, long, default_value = "yaml")]
        format: String,
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored machine ids
    Machines,
    /// List the transitions of a machine
    Transitions {
        #[clap(short, long)]
        machine_id: String,
        /// Only list transitions of this kind (external, internal, local, initial)
        #[clap(long)]
        kind: Option<TransitionKind>,
        #[clap(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
    Migrate {
        #[clap(value_enum)]
        direction: MigrateDirection,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = Settings::load(args.config.as_deref())?
        .with_overrides(args.database.clone(), args.log_level.clone());
    setup_logging(&settings.log_level);

    let db = establish_connection(&settings.database)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database.path))?;

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database: {}", settings.database.path);
                Migrator::up(&db, None).await?;
            }
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                match direction {
                    MigrateDirection::Up => Migrator::up(&db, None).await?,
                    MigrateDirection::Down => Migrator::down(&db, None).await?,
                    MigrateDirection::Fresh => Migrator::fresh(&db).await?,
                }
            }
        },
        Commands::Import { file, replace } => {
            Migrator::up(&db, None).await?;
            let document = MachineDocument::parse(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Create
            };
            let summary = MachineDocumentService::new(db).import(&document, mode).await?;
            println!(
                "Imported {}: {} states, {} transitions, {} actions, {} guards",
                summary.machine_id,
                summary.states,
                summary.transitions,
                summary.actions,
                summary.guards
            );
        }
        Commands::Export {
            machine_id,
            format,
            output,
        } => {
            let format = DocumentFormat::from_name(&format)?;
            let document = MachineDocumentService::new(db).export(&machine_id).await?;
            let rendered = document.render(format)?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote machine {} to {}", machine_id, path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Machines => {
            for machine_id in MachineDocumentService::new(db).list_machines().await? {
                println!("{}", machine_id);
            }
        }
        Commands::Transitions {
            machine_id,
            kind,
            json,
        } => {
            let mut transitions = TransitionService::new(db)
                .find_by_machine_id(&machine_id)
                .await?;
            if let Some(kind) = kind {
                transitions.retain(|transition| transition.kind() == Some(kind));
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&transitions)?);
            } else {
                for transition in &transitions {
                    println!("{}", transition);
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(log_level: &str) {
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
