//! Wardrobe CLI - drive the wardrobe store from a terminal

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wardrobe_lib::commands::{self, CreateItemInput, CreateOutfitInput};
use wardrobe_lib::state::Category;
use wardrobe_lib::{AppConfig, AppState, CommandError};

#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(version)]
#[command(about = "Manage clothing items and outfits stored on this device")]
struct Cli {
    /// Data directory (defaults to $WARDROBE_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and image directory if they are missing
    Init,

    /// Show the tables and columns of the database
    Doctor,

    /// Manage clothing items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Manage outfits
    #[command(subcommand)]
    Outfit(OutfitCommand),

    /// Replace all items and their photos with the sample wardrobe
    Seed {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ItemCommand {
    /// Add an item from a photo on disk
    Add {
        #[arg(short, long)]
        name: String,

        /// tops, bottoms, shoes, accessories or outerwear
        #[arg(short, long)]
        category: Category,

        #[arg(long, default_value = "")]
        color: String,

        /// Photo to copy into the wardrobe
        #[arg(short, long)]
        image: PathBuf,

        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List items, newest first
    List {
        #[arg(short, long)]
        category: Option<Category>,
    },

    /// Delete an item and its photo
    Rm {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum OutfitCommand {
    /// Create an outfit from existing items
    Add {
        #[arg(short, long)]
        name: String,

        /// Item id to include (repeatable, order is kept)
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        #[arg(short, long)]
        preview: Option<String>,
    },

    /// List outfits, newest first
    List,

    /// Delete an outfit
    Rm {
        id: String,

        #[arg(short, long)]
        yes: bool,
    },
}

/// Ask on stdin; anything but "y"/"yes" is a no
fn ask(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn command_failed(e: CommandError) -> anyhow::Error {
    anyhow::anyhow!(e.message().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match cli.data_dir {
        Some(dir) => AppConfig::with_data_dir(dir),
        None => AppConfig::from_env().context("could not determine the data directory")?,
    };

    // Startup failure is fatal; the user has to fix the cause and rerun
    let state = AppState::open(&config).context("failed to open the wardrobe database")?;
    tracing::debug!("Using data directory {}", config.data_dir().display());

    match cli.command {
        Commands::Init => {
            state.images.ensure_dir().await?;
            println!("Wardrobe ready at {}", config.data_dir().display());
        }
        Commands::Doctor => {
            print_json(&commands::describe_schema(&state).map_err(command_failed)?)?;
        }
        Commands::Seed { yes } => {
            let outcome = commands::seed_wardrobe(&state, &|p: &str| yes || ask(p))
                .await
                .map_err(command_failed)?;
            match outcome {
                Some(_) => print_json(&commands::list_items(&state, None).map_err(command_failed)?)?,
                None => print_json(&commands::Deletion::Cancelled)?,
            }
        }
        Commands::Item(ItemCommand::Add {
            name,
            category,
            color,
            image,
            tags,
        }) => {
            let input = CreateItemInput {
                name,
                category,
                color,
                source_path: image,
                tags,
            };
            let item = commands::create_item(&state, input)
                .await
                .map_err(command_failed)?;
            print_json(&item)?;
        }
        Commands::Item(ItemCommand::List { category }) => {
            print_json(&commands::list_items(&state, category).map_err(command_failed)?)?;
        }
        Commands::Item(ItemCommand::Rm { id, yes }) => {
            let outcome = commands::delete_item(&state, &id, &|p: &str| yes || ask(p))
                .await
                .map_err(command_failed)?;
            print_json(&outcome)?;
        }
        Commands::Outfit(OutfitCommand::Add {
            name,
            items,
            preview,
        }) => {
            let input = CreateOutfitInput {
                name,
                item_ids: items,
                image_preview: preview,
            };
            let outfit = commands::create_outfit(&state, input)
                .await
                .map_err(command_failed)?;
            print_json(&outfit)?;
        }
        Commands::Outfit(OutfitCommand::List) => {
            print_json(&commands::list_outfits(&state).map_err(command_failed)?)?;
        }
        Commands::Outfit(OutfitCommand::Rm { id, yes }) => {
            let outcome = commands::delete_outfit(&state, &id, &|p: &str| yes || ask(p))
                .await
                .map_err(command_failed)?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}
