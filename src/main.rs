//! # Question Bank CLI (`qbank`)
//!
//! ## Usage
//!
//! ```bash
//! qbank --config ./config/qbank.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qbank init` | Create the settings file, data directory and database |
//! | `qbank token show` | Print the import token for the browser extension |
//! | `qbank token regenerate` | Replace the import token |
//! | `qbank serve` | Run the import bridge with a headless entry view |
//! | `qbank check <id>` | Report whether a question exists and where its image is |
//!
//! ## Examples
//!
//! ```bash
//! # First run: choose where the bank lives
//! qbank init --data-path ~/question-bank
//!
//! # Paste this into the extension's options page
//! qbank token show
//!
//! # Accept imports until Ctrl+C
//! RUST_LOG=debug qbank serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use question_bank::bridge::ImportBridgeState;
use question_bank::config::{self, Config};
use question_bank::dispatch::{ui_channel, UiInbox};
use question_bank::entry::{ApplyReport, ImageOutcome, ImportApplier};
use question_bank::memory_view::MemoryViewFactory;
use question_bank::settings::SettingsStore;
use question_bank::view::ViewRegistry;
use question_bank::{db, logging, migrate, questions, token};

/// Question Bank CLI: manage the local bank and accept imports from the
/// browser extension.
#[derive(Parser)]
#[command(name = "qbank", version, about)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./config/qbank.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the settings file, data directory and database schema
    Init {
        /// Directory holding the database and question images
        #[arg(long)]
        data_path: Option<PathBuf>,
    },
    /// Show or rotate the import token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Run the import bridge until interrupted
    Serve,
    /// Report whether a question exists in the bank
    Check {
        /// Question id
        id: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Print the current token, creating one if needed
    Show,
    /// Replace the token; extensions using the old one get 403
    Regenerate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let cfg = config::load_or_default(&cli.config)?;
    let settings = SettingsStore::open(&cfg.settings.path)?;

    match cli.command {
        Commands::Init { data_path } => run_init(&settings, data_path.as_deref()).await?,
        Commands::Token { action } => {
            let token = match action {
                TokenAction::Show => token::get_or_create_token(&settings)?,
                TokenAction::Regenerate => token::regenerate_token(&settings)?,
            };
            println!("{}", token);
        }
        Commands::Serve => {
            tokio::task::block_in_place(|| run_serve(&cfg, &settings))?;
        }
        Commands::Check { id } => run_check(&settings, &id).await?,
    }

    Ok(())
}

async fn run_init(settings: &SettingsStore, data_path: Option<&Path>) -> Result<()> {
    settings.ensure_file()?;
    if let Some(dir) = data_path {
        let dir = dir.to_string_lossy().into_owned();
        settings.update(|s| s.data_path = dir)?;
    }

    match settings.data_dir() {
        Some(data_dir) => {
            std::fs::create_dir_all(data_dir.join(questions::IMAGE_DIR_NAME)).with_context(
                || format!("Failed to create data directory {}", data_dir.display()),
            )?;
            let db_path = db::database_path(settings)?;
            migrate::run_migrations(&db_path).await?;
            println!("Database initialized at {}", db_path.display());
        }
        None => {
            eprintln!(
                "No data path configured; settings written to {}. Re-run with --data-path to create the database.",
                settings.path().display()
            );
        }
    }

    token::get_or_create_token(settings)?;
    println!("Settings: {}", settings.path().display());
    Ok(())
}

async fn run_check(settings: &SettingsStore, id: &str) -> Result<()> {
    if !questions::is_valid_question_id(id) {
        anyhow::bail!(
            "'{}' is not a valid question id (letters, digits and '-', at most {} characters)",
            id,
            questions::MAX_QUESTION_ID_LEN
        );
    }

    let db_path = db::database_path(settings)?;
    let pool = db::connect(&db_path, false).await?;
    let exists = questions::question_exists(&pool, id).await?;
    pool.close().await;

    let data_dir = settings.data_dir().unwrap_or_default();
    let image = questions::image_path(&data_dir, id);

    println!("{}: {}", id, if exists { "in bank" } else { "not in bank" });
    if image.exists() {
        println!("image: {}", image.display());
    } else {
        println!("image: none");
    }
    Ok(())
}

/// Runs the import bridge. The calling thread plays the GUI thread: it owns
/// the view registry and applies queued imports one at a time.
fn run_serve(cfg: &Config, settings: &SettingsStore) -> Result<()> {
    let (dispatcher, inbox) = ui_channel();
    let mut bridge = match ImportBridgeState::new(settings, cfg.import.clone(), dispatcher) {
        Ok(bridge) => Some(bridge),
        Err(e) => {
            warn!(error = %e, "import token unavailable; continuing without import");
            None
        }
    };

    let handle = bridge.as_mut().and_then(ImportBridgeState::start_or_disable);
    match &handle {
        Some(handle) => {
            eprintln!("Import endpoint: {}", handle.endpoint());
            eprintln!("Token: run `qbank token show` and paste it into the extension.");
        }
        None => eprintln!("Import is unavailable; see the log above."),
    }

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::SeqCst);
        }
    });

    let preview_box = bridge
        .as_ref()
        .map(ImportBridgeState::preview_box)
        .unwrap_or_default();
    let mut applier = ImportApplier::new(ViewRegistry::new(), MemoryViewFactory::new(), preview_box);
    serve_loop(&inbox, &mut applier, settings, &stop);

    if let Some(bridge) = bridge.as_mut() {
        bridge.stop();
    }
    eprintln!("Stopped.");
    Ok(())
}

fn serve_loop(
    inbox: &UiInbox,
    applier: &mut ImportApplier,
    settings: &SettingsStore,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        if let Some(request) = inbox.recv_timeout(Duration::from_millis(250)) {
            let report = applier.apply(request);
            store_import(settings, &report);
        }
    }
}

fn store_import(settings: &SettingsStore, report: &ApplyReport) {
    let ImageOutcome::Shown(preview) = &report.image else {
        info!(question_id = %report.question_id, "import applied without image");
        return;
    };
    let Some(data_dir) = settings.data_dir() else {
        info!(question_id = %report.question_id, "import applied; no data path, image not saved");
        return;
    };
    if !questions::is_valid_question_id(&report.question_id) {
        warn!(question_id = %report.question_id, "import applied; id not usable as a file name");
        return;
    }

    match questions::save_question_image(&data_dir, &report.question_id, preview.original()) {
        Ok(path) => {
            info!(question_id = %report.question_id, path = %path.display(), "import applied")
        }
        Err(e) => warn!(question_id = %report.question_id, error = %e, "failed to save image"),
    }
}
