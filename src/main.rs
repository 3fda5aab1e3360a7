//! obs-overlay - inspect and drive shared overlay state
//!
//! Works on the same SQLite state database the dock and overlay pages use,
//! and can run a self-contained scoreboard demo.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use obs_overlay::config::{self, AppConfig};
use obs_overlay::context::{ContextDetector, Document, StyleSheet};
use obs_overlay::elements::{register_builtin_elements, Dock, DockBehavior, Markup, Overlay};
use obs_overlay::scoreboard::{self, ScoreboardDock, ScoreboardOverlay};
use obs_overlay::storage;
use obs_overlay::{Origin, State};

/// obs-overlay - shared state for OBS docks and overlays
#[derive(Parser, Debug)]
#[command(name = "obs-overlay")]
#[command(about = "Inspect and update the state shared by OBS docks and overlays")]
struct Args {
    /// State database path (defaults to the configured location)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List every page path that has stored state
    #[arg(long)]
    list: bool,

    /// Print the stored state for a page path
    #[arg(long, value_name = "PATH")]
    show: Option<String>,

    /// Page path to update through a dock commit
    #[arg(long, value_name = "PATH")]
    set: Option<String>,

    /// KEY=VALUE to merge into the state given by --set; VALUE is JSON or plain text
    #[arg(long = "value", value_name = "KEY=VALUE")]
    values: Vec<String>,

    /// Run the scoreboard dock and overlay side by side in memory
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_or_create_config(args.config.as_deref());

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    register_builtin_elements(&config.elements)?;

    if args.demo {
        return run_demo(&config).await;
    }

    let db_path = match args.db {
        Some(path) => path,
        None => config.storage.database_path(&storage::get_data_dir()?),
    };
    let origin = Origin::with_database(&db_path)?;

    if args.list {
        let keys = origin.store().keys()?;
        if keys.is_empty() {
            println!("No stored state in {}", db_path.display());
        }
        for key in keys {
            println!("{}", key);
        }
        return Ok(());
    }

    if let Some(path) = args.show {
        match origin.store().read(&path) {
            Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
            None => println!("No state stored for {}", path),
        }
        return Ok(());
    }

    if let Some(path) = args.set {
        return run_set(&origin, &config, &path, &args.values).await;
    }

    println!("Nothing to do; see --help");
    Ok(())
}

/// Load configuration from file or use the defaults
fn load_or_create_config(explicit: Option<&Path>) -> AppConfig {
    let config_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => storage::get_config_dir()
            .ok()
            .map(|dir| dir.join("config.toml")),
    };

    if let Some(config_path) = config_path {
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => warn!("Ignoring unreadable config {:?}: {}", config_path, e),
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Split `key=value`, reading the value as JSON when it parses
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", assignment))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty key in '{}'", assignment));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Dock that shows its state as JSON; used for command-line updates
struct JsonDock;

impl DockBehavior for JsonDock {
    fn template(&self, state: &State) -> Option<Markup> {
        serde_json::to_string_pretty(state)
            .ok()
            .map(|json| Markup::new(format!("<pre>{}</pre>", json)))
    }
}

/// Merge assignments into the state at `path` and commit them
async fn run_set(origin: &Origin, config: &AppConfig, path: &str, values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Err(anyhow!("--set needs at least one --value KEY=VALUE"));
    }

    let update: State = values
        .iter()
        .map(|v| parse_assignment(v))
        .collect::<Result<_>>()?;

    // A command-line dock is never captured, so it always resolves to the dock role
    let ctx = origin.open(path, Document::loaded())?;
    let mut dock = Dock::new(JsonDock).configured(&config.elements, &config.signal);
    dock.connect(&ctx, &ContextDetector::fixed(false))
        .await
        .context("failed to attach dock")?;

    dock.state_mut().merge(update);
    if !dock.commit()? {
        return Err(anyhow!("failed to store state for {}", path));
    }

    println!("{}", serde_json::to_string_pretty(dock.state())?);
    Ok(())
}

/// Run the scoreboard pair on an in-memory origin and print each overlay frame
async fn run_demo(config: &AppConfig) -> Result<()> {
    info!("Running scoreboard demo");

    let origin = Origin::in_memory();
    let detector = ContextDetector::from_config(&config.detection);

    let dock_ctx = origin.open("http://localhost/demo/scoreboard", Document::loaded())?;

    // The capture host injects its stylesheet while the page loads
    let overlay_doc = Document::loading();
    let overlay_ctx = origin.open("http://localhost/demo/scoreboard", overlay_doc.clone())?;
    overlay_doc.add_stylesheet(StyleSheet::linked("data:text/css;base64,Ym9keyB7IH0="));
    overlay_doc.complete_load();

    let mut dock = Dock::new(ScoreboardDock).configured(&config.elements, &config.signal);
    let mut overlay = Overlay::new(ScoreboardOverlay)
        .configured(&config.elements)
        .with_mirror(scoreboard::HOME_SCORE)
        .with_mirror(scoreboard::AWAY_SCORE);

    let dock_role = dock.connect(&dock_ctx, &detector).await?;
    let overlay_role = overlay.connect(&overlay_ctx, &detector).await?;
    println!("dock role: {:?}, overlay role: {:?}", dock_role, overlay_role);
    println!("--- initial\n{}", overlay.output());

    for action in ["home_up", "home_up", "away_up", "home_down", "reset"] {
        dock.interact(action)?;
        overlay.process_signals()?;
        println!("--- {}\n{}", action, overlay.output());
    }

    overlay.detach();
    dock.detach();
    info!("Demo finished");
    Ok(())
}
