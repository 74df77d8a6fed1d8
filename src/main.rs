use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde_json::Value;
use std::path::{Path, PathBuf};

use checklist_gate::checklist::{self, ChecklistDocument, ProgressStore};
use checklist_gate::server::{self, AppState};
use checklist_gate::{AppConfig, Gate, Values};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Json,
    Markdown,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a single condition
    Eval {
        /// Condition as JSON (array/object/string) or a bare text expression
        #[arg(long)]
        condition: String,

        /// Progression values as a JSON object; defaults to stored progress
        #[arg(long)]
        values: Option<String>,
    },
    /// Show completion and lock state of every item
    Status {
        /// Only list locked items
        #[arg(long)]
        locked_only: bool,

        /// List sections and their lock state instead of items
        #[arg(long)]
        sections: bool,
    },
    /// Mark an item as completed
    Mark {
        #[arg(short, long)]
        key: String,

        /// Clear the mark instead
        #[arg(long)]
        undo: bool,
    },
    /// Show or update progression values
    Progression {
        #[arg(long)]
        game_mode: Option<i64>,

        /// Zero-based index of the last region reached
        #[arg(long)]
        region: Option<i64>,
    },
    /// Export progress
    Export {
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import progress from a JSON export
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn load_document(config: &AppConfig) -> Result<ChecklistDocument> {
    let Some(path) = &config.content else {
        bail!("no checklist content configured (set `content` or CHECKLIST_CONTENT)");
    };
    ChecklistDocument::load(path)
        .with_context(|| format!("failed to load checklist content from {}", path.display()))
}

fn progress_path(config: &AppConfig) -> PathBuf {
    config
        .progress
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.progress.json", config.progress_key)))
}

fn load_progress(config: &AppConfig, document: Option<&ChecklistDocument>) -> Result<ProgressStore> {
    let path = progress_path(config);
    let mut store = ProgressStore::open(&path, config.progress_key.as_str())
        .with_context(|| format!("failed to open progress file {}", path.display()))?;
    if let Some(document) = document {
        store.merge_defaults(document.completed_defaults());
    }
    Ok(store)
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::resolve(args.config.as_deref())?;

    match args.command {
        Commands::Eval { condition, values } => {
            let gate = Gate::from_config(&config.gate);
            let values = match values {
                Some(raw) => {
                    let parsed: Value =
                        serde_json::from_str(&raw).context("--values is not valid JSON")?;
                    match Values::from_json(&parsed) {
                        Some(values) => values,
                        None => bail!("--values must be a JSON object"),
                    }
                }
                None => load_progress(&config, None)?.values(),
            };
            // anything that is not JSON is taken as a text expression
            let condition = serde_json::from_str::<Value>(&condition)
                .unwrap_or(Value::String(condition));
            let unlocked = gate.is_unlocked_json(Some(&condition), &values);
            println!("{}", if unlocked { "unlocked" } else { "locked" });
        }
        Commands::Status {
            locked_only,
            sections,
        } => {
            let document = load_document(&config)?;
            let progress = load_progress(&config, Some(&document))?;
            let gate = Gate::from_config(&config.gate);

            if sections {
                let outline = document.outline(&progress, &gate);
                for section in outline.iter().filter(|s| !locked_only || s.locked) {
                    let indent = if section.key.contains('/') { "  " } else { "" };
                    println!(
                        "{}{}{}  ({})",
                        indent,
                        section.title,
                        if section.locked { " [locked]" } else { "" },
                        section.key
                    );
                }
                return Ok(());
            }

            let statuses = document.statuses(&progress, &gate);
            for status in statuses.iter().filter(|s| !locked_only || s.locked) {
                let title = if status.code {
                    format!("`{}`", status.title)
                } else {
                    status.title.clone()
                };
                println!(
                    "{} {}{}  ({})",
                    if status.completed { "[x]" } else { "[ ]" },
                    title,
                    if status.locked { " [locked]" } else { "" },
                    status.key
                );
            }
            let completed = statuses.iter().filter(|s| s.completed).count();
            println!("{}/{} completed", completed, statuses.len());
        }
        Commands::Mark { key, undo } => {
            let mut progress = load_progress(&config, None)?;
            if progress.set_completed(&key, !undo) {
                progress.save()?;
                println!("{} {}", if undo { "Unmarked" } else { "Marked" }, key);
            } else {
                println!("{} unchanged", key);
            }
        }
        Commands::Progression { game_mode, region } => {
            let mut progress = load_progress(&config, None)?;
            if game_mode.is_some() || region.is_some() {
                if let Some(game_mode) = game_mode {
                    progress.set_game_mode(game_mode);
                }
                if let Some(region) = region {
                    progress.set_last_region(region);
                }
                progress.save()?;
            }
            println!("{}", serde_json::to_string_pretty(&progress.values())?);
        }
        Commands::Export { format, output } => match format {
            ExportFormat::Json => {
                let progress = load_progress(&config, None)?;
                match checklist::export_json(&progress, &config.progress_key)? {
                    Some(json) => write_output(output.as_deref(), &json)?,
                    None => log::warn!("Nothing to export: no completed items"),
                }
            }
            ExportFormat::Markdown => {
                let document = load_document(&config)?;
                let progress = load_progress(&config, Some(&document))?;
                match checklist::generate_markdown(&config.title, &document, &progress) {
                    Some(markdown) => write_output(output.as_deref(), &markdown)?,
                    None => log::warn!("Nothing to export: checklist is empty"),
                }
            }
        },
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut progress = load_progress(&config, None)?;
            let count = checklist::import_into(&mut progress, &content, &config.progress_key)?;
            progress.save()?;
            println!("Imported {} completed items", count);
        }
        Commands::Serve { port } => {
            let document = load_document(&config)?;
            let progress = load_progress(&config, Some(&document))?;
            let port = port.unwrap_or(config.server.port);
            let state = AppState::new(&config, document, progress);
            server::serve(state, &config.server.host, port).await?;
        }
    }

    Ok(())
}
