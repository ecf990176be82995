//! VTU Translate - batch translation of Android strings.xml resources
//!
//! Command-line entry point: parses a resource file, drives the batch
//! scheduler against the configured AI provider and writes the translated
//! `values-<lang>/strings.xml`.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vtu_translate::cli::{Args, Commands};
use vtu_translate::config::{Config, ProviderKind};
use vtu_translate::invoker::RateLimitInvoker;
use vtu_translate::progress::{LogSink, Progress};
use vtu_translate::resource::{ItemState, ResourceStore};
use vtu_translate::scheduler::{BatchScheduler, RunOutcome};
use vtu_translate::session::{SESSION_DIR, Session};
use vtu_translate::strings_xml::{read_strings_file, save_translated_file};
use vtu_translate::translate::BackendFactory;

#[derive(Debug, Clone, Copy)]
enum RunMode {
    FromStart,
    Continue,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let session_path = Session::default_path(std::env::current_dir()?);

    match args.command {
        Commands::Translate {
            input,
            target_lang,
            batch_size,
            speed,
            output_dir,
            export_log,
        } => {
            if let Some(lang) = target_lang {
                config.translate.target_language = lang.trim().to_lowercase();
            }
            if let Some(batch_size) = batch_size {
                config.translate.batch_size = batch_size;
            }
            if let Some(speed) = speed {
                config.translate.speed = speed;
            }
            config.validate()?;

            info!("Reading strings from {}", input.display());
            let parsed = read_strings_file(&input)?;
            println!(
                "Parsed {} strings: {} to translate ({} with placeholders), {} technical (copied as is), {} not translatable, {} empty",
                parsed.resources.len(),
                parsed.pending(),
                parsed.with_technical_parts,
                parsed.technical,
                parsed.non_translatable,
                parsed.empty
            );

            let session = Session::new(
                &input,
                config.translate.target_language.clone(),
                parsed.resources,
            );
            run_translation(&config, session, &session_path, RunMode::FromStart, output_dir, export_log)
                .await?;
        }
        Commands::Continue { output_dir, export_log } => {
            let session = Session::load(&session_path)?;
            config.translate.target_language = session.target_language.clone();
            config.validate()?;
            run_translation(&config, session, &session_path, RunMode::Continue, output_dir, export_log)
                .await?;
        }
        Commands::RetryErrors { output_dir, export_log } => {
            let mut session = Session::load(&session_path)?;
            let store = ResourceStore::with_resources(std::mem::take(&mut session.resources));
            let reset = store.reset_errors();
            if reset == 0 {
                println!("No failed strings in the saved session");
                return Ok(());
            }
            println!("Retrying {} failed strings", reset);
            session.resources = store.snapshot().to_vec();

            config.translate.target_language = session.target_language.clone();
            config.validate()?;
            run_translation(&config, session, &session_path, RunMode::Continue, output_dir, export_log)
                .await?;
        }
        Commands::Edit { name, value } => {
            let mut session = Session::load(&session_path)?;
            let store = ResourceStore::with_resources(std::mem::take(&mut session.resources));
            let index = store
                .position_of(&name)
                .ok_or_else(|| anyhow!("No string named '{}' in the saved session", name))?;
            store.update_translation(index, value);
            session.resources = store.snapshot().to_vec();
            session.save(&session_path)?;
            println!("Updated '{}'", name);
        }
        Commands::Status => {
            let session = Session::load(&session_path)?;
            print_status(&session);
        }
        Commands::Export { output_dir } => {
            let session = Session::load(&session_path)?;
            let root = output_dir.unwrap_or_else(|| PathBuf::from(&config.translate.output_dir));
            let log = LogSink::new();
            let path =
                save_translated_file(&root, &session.target_language, &session.resources, &log)
                    .await?;
            println!("Wrote {}", path.display());
        }
        Commands::Models { provider } => {
            let kind = match provider {
                Some(id) => id.parse::<ProviderKind>()?,
                None => config.provider.selected,
            };
            let timeout = Duration::from_secs(config.translate.request_timeout_secs);
            let backend = BackendFactory::create_backend_for(&config.provider, kind, timeout)?;

            info!("Fetching models from {}...", kind);
            let models = backend.fetch_available_models().await?;
            let selected = config.provider.settings(kind).model.clone();

            println!("\nAvailable {} models:", kind);
            println!("{}", "-".repeat(60));
            for model in &models {
                let marker = if *model == selected { "*" } else { " " };
                println!("{} {}", marker, model);
            }
            println!("\n{} models", models.len());
        }
        Commands::Clear => {
            if Session::clear(&session_path)? {
                println!("Cleared saved session");
            } else {
                println!("No saved session");
            }
        }
        Commands::InitConfig { path } => {
            if path.exists() {
                return Err(anyhow!("{} already exists", path.display()));
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Run the scheduler over `session`, then persist the session and the output file.
///
/// Ctrl-C stops the run after the batch in flight; what was translated so far
/// is kept and can be picked up with `continue`.
async fn run_translation(
    config: &Config,
    mut session: Session,
    session_path: &Path,
    mode: RunMode,
    output_dir: Option<PathBuf>,
    export_log: Option<PathBuf>,
) -> Result<()> {
    let timeout = Duration::from_secs(config.translate.request_timeout_secs);
    let backend = BackendFactory::create_backend(&config.provider, timeout)?;

    let store = ResourceStore::with_resources(std::mem::take(&mut session.resources));
    let log = LogSink::new();
    let scheduler = BatchScheduler::new(backend, store.clone(), log.clone())
        .with_invoker(RateLimitInvoker::new(timeout));

    let cancel = scheduler.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            cancel.cancel();
        }
    });
    let (bar, watcher) = spawn_progress_bar(&store);

    let target_language = config.translate.target_language.as_str();
    let speed = config.translate.speed;
    let batch_size = config.translate.batch_size;
    let result = match mode {
        RunMode::FromStart => scheduler.translate_all(target_language, speed, batch_size).await,
        RunMode::Continue => {
            scheduler
                .continue_translation(target_language, speed, batch_size)
                .await
        }
    };

    interrupt.abort();
    watcher.abort();
    bar.set_position(store.progress().done as u64);
    bar.finish_and_clear();

    session.resources = store.snapshot().to_vec();
    session
        .save(session_path)
        .with_context(|| format!("Failed to save session to {}", session_path.display()))?;

    let outcome = result?;
    match outcome {
        RunOutcome::Completed => println!("Translation completed"),
        RunOutcome::Stopped => println!("Translation stopped, run `continue` to resume"),
        RunOutcome::NothingToDo => println!("Nothing left to translate"),
    }

    let root = output_dir.unwrap_or_else(|| PathBuf::from(&config.translate.output_dir));
    let path = save_translated_file(&root, target_language, &session.resources, &log).await?;
    println!("Wrote {}", path.display());

    if let Some(log_path) = export_log {
        std::fs::write(&log_path, log.to_text())
            .with_context(|| format!("Failed to write log to {}", log_path.display()))?;
        println!("Log written to {}", log_path.display());
    }

    print_status(&session);
    Ok(())
}

/// Progress bar fed by the resource store's change notifications
fn spawn_progress_bar(store: &ResourceStore) -> (ProgressBar, JoinHandle<()>) {
    let bar = ProgressBar::new(store.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar.set_position(store.progress().done as u64);

    let mut changes = store.subscribe();
    let task_bar = bar.clone();
    let watcher = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let progress = Progress::from_resources(&changes.borrow_and_update());
            task_bar.set_position(progress.done as u64);
        }
    });

    (bar, watcher)
}

fn print_status(session: &Session) {
    let progress = Progress::from_resources(&session.resources);
    let count = |state: ItemState| {
        session
            .resources
            .iter()
            .filter(|r| r.state() == state)
            .count()
    };

    println!("\nSession: {} -> {}", session.source_file.display(), session.target_language);
    println!(
        "Progress: {}/{} ({}%)",
        progress.done,
        progress.total,
        progress.percent()
    );
    println!(
        "Translated: {}  Failed: {}  Remaining: {}",
        count(ItemState::Done),
        count(ItemState::Errored),
        count(ItemState::Untranslated)
    );
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(SESSION_DIR).join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive every log call
    let file_appender = rolling::daily(&log_dir, "vtu-translate.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("vtu-translate.log").display()
    );

    Ok(())
}
