// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! topicfold: files loose documents into topic folders with a local AI model

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use topicfold::completions::CompletionsClient;
use topicfold::config::{AppConfig, Backend};
use topicfold::executor::execute_operations;
use topicfold::extract::DocumentExtractor;
use topicfold::hints::HintLog;
use topicfold::history::{EntryKind, History};
use topicfold::isolator::{Isolator, QuarantineReason};
use topicfold::model;
use topicfold::ollama::OllamaClient;
use topicfold::organize::{OrganizeMode, Organizer};
use topicfold::planner::PlanState;
use topicfold::scan::{absolute_path, collect_file_paths, render_directory_tree};
use topicfold::sink::{self, Sink};
use topicfold::{Result, TopicfoldError};

const RULE: &str = "--------------------------------------------------";

/// topicfold CLI - AI-assisted topic folders for loose documents
#[derive(Parser, Debug)]
#[command(name = "topicfold")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Sort documents into topic folders using a local AI model", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify files and move them into topic folders
    Organize {
        /// Directory (or single file) to organize; asked for when omitted
        input: Option<PathBuf>,

        /// Output root (default: organized_folder next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sorting mode (default: classify.mode from the config)
        #[arg(short, long, value_parser = ["filename", "grouped", "bulk", "date", "type"])]
        mode: Option<String>,

        /// Insert <year>/<N분기> above each topic folder
        #[arg(long)]
        quarters: bool,

        /// Write messages to the log file instead of the console
        #[arg(long)]
        silent: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Show what would be moved without moving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Move exact duplicates and stale versions into a quarantine folder
    Isolate {
        /// Directory to scan; asked for when omitted
        dir: Option<PathBuf>,

        /// Quarantine root (default: 삭제후보 next to the directory)
        #[arg(long)]
        quarantine: Option<PathBuf>,

        /// Write messages to the log file instead of the console
        #[arg(long)]
        silent: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Report without moving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show AI engine status
    Status,
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Undo recent moves
    Undo {
        /// Number of moves to undo
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

/// Options shared by the interactive and flag-driven organize paths
struct OrganizeArgs {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    mode: Option<String>,
    silent: Option<bool>,
    yes: bool,
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let silent = matches!(
        cli.command,
        Some(Commands::Organize { silent: true, .. }) | Some(Commands::Isolate { silent: true, .. })
    );

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet || silent {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let mut config = AppConfig::load(&cli.config).map_err(|e| {
        TopicfoldError::Config(format!("Failed to load configuration from {:?}: {}", cli.config, e))
    })?;

    match cli.command {
        Some(Commands::Organize { input, output, mode, quarters, silent, yes, dry_run }) => {
            if quarters {
                config.output.segment_by_quarter = true;
            }
            let args = OrganizeArgs {
                input,
                output,
                mode,
                silent: Some(silent),
                yes,
                dry_run,
            };
            run_organize(&config, args).await?;
        }
        Some(Commands::Isolate { dir, quarantine, silent, yes, dry_run }) => {
            if let Some(q) = quarantine {
                config.isolate.quarantine_dir = Some(q.to_string_lossy().into_owned());
            }
            run_isolate(&config, dir, silent, yes, dry_run)?;
        }
        Some(Commands::History { action }) => run_history_command(&config, action)?,
        Some(Commands::Config { action }) => run_config_command(&config, action, &cli.config)?,
        Some(Commands::Status) => run_status(&config).await?,
        None => run_interactive(&config).await?,
    }

    Ok(())
}

/// Read one trimmed line from stdin after printing `prompt`
fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim().to_string())
}

/// Ask until the answer is yes or no; `/exit` quits
fn get_yes_no(prompt: &str) -> io::Result<bool> {
    loop {
        match prompt_line(prompt)?.to_lowercase().as_str() {
            "yes" | "y" => return Ok(true),
            "no" | "n" => return Ok(false),
            "/exit" => {
                println!("Exiting program.");
                std::process::exit(0);
            }
            _ => println!("Please enter 'yes' or 'no'. To exit, type '/exit'."),
        }
    }
}

/// Ask for an existing path until one is given
fn prompt_existing_path(prompt: &str, sink: &dyn Sink) -> io::Result<PathBuf> {
    loop {
        let path = PathBuf::from(prompt_line(prompt)?);
        if path.exists() {
            return Ok(path);
        }
        sink.emit(&format!("Input path {} does not exist. Please enter a valid path.", path.display()));
    }
}

fn default_output(input: &Path, config: &AppConfig) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&config.output.dir_name)
}

/// Prompt-driven loop over one directory after another
async fn run_interactive(config: &AppConfig) -> Result<()> {
    println!("{}", RULE);
    println!("**NOTE: Silent mode logs all outputs to a text file instead of displaying them in the terminal.");
    let silent = get_yes_no("Would you like to enable silent mode? (yes/no): ")?;

    loop {
        let args = OrganizeArgs {
            input: None,
            output: None,
            mode: None,
            silent: Some(silent),
            yes: false,
            dry_run: false,
        };
        run_organize(config, args).await?;

        if !get_yes_no("Would you like to organize another directory? (yes/no): ")? {
            return Ok(());
        }
    }
}

/// Plan, preview, confirm and execute one organize run
async fn run_organize(config: &AppConfig, args: OrganizeArgs) -> Result<()> {
    let silent = args.silent.unwrap_or(false);
    let log_file = PathBuf::from(&config.logging.log_file);
    let sink = sink::for_mode(silent, &log_file);
    let interactive = args.input.is_none();

    let input = match args.input {
        Some(path) if path.exists() => path,
        Some(path) => {
            sink.emit(&format!("Input path {} does not exist. Please enter a valid path.", path.display()));
            prompt_existing_path("Enter the path of the directory you want to organize: ", sink.as_ref())?
        }
        None => prompt_existing_path("Enter the path of the directory you want to organize: ", sink.as_ref())?,
    };
    let input = absolute_path(&input)?;
    sink.emit(&format!("Input path successfully uploaded: {}", input.display()));

    let output = match args.output {
        Some(path) => path,
        None if interactive => {
            let answer = prompt_line(
                "Enter the path to store organized files and folders \
                 (press Enter to use 'organized_folder' in the input directory): ",
            )?;
            if answer.is_empty() {
                default_output(&input, config)
            } else {
                PathBuf::from(answer)
            }
        }
        None => default_output(&input, config),
    };
    let output = absolute_path(&output)?;
    sink.emit(&format!("Output path successfully set to: {}", output.display()));

    let mode = match args.mode.as_deref() {
        Some(m) => m.parse::<OrganizeMode>()?,
        None => OrganizeMode::from(config.classify.mode),
    };

    let files = collect_file_paths(&input, &[output.clone()])?;
    sink.emit(&format!("Found {} files", files.len()));
    if !silent {
        println!("{}", RULE);
        println!("Directory tree before organizing:");
        print!("{}", render_directory_tree(&input)?);
        println!("{}", RULE);
    }

    let model = model::from_config(&config.ai_engine)?;
    let extractor = DocumentExtractor::new();
    let hints = HintLog::new(&config.logging.hint_log);
    let organizer = Organizer::new(config, model.as_ref(), &extractor, sink.as_ref()).with_hints(&hints);

    let mut state = PlanState::new();
    let plan = organizer.plan(&files, &output, mode, &mut state).await?;

    sink.emit(RULE);
    sink.emit("Proposed directory structure:");
    sink.emit(plan.preview(&output).trim_end());
    if !plan.unplaced.is_empty() {
        sink.emit(&format!("{} files could not be classified and will stay in place:", plan.unplaced.len()));
        for path in &plan.unplaced {
            sink.emit(&format!("  {}", path.display()));
        }
    }
    sink.emit(RULE);

    if plan.operations.is_empty() {
        sink.emit("Nothing to move.");
        return Ok(());
    }

    if args.dry_run {
        let report = execute_operations(&plan.operations, true, sink.as_ref(), None);
        info!("Dry run: {} operations planned", report.total());
        return Ok(());
    }

    let proceed = args.yes || get_yes_no("Would you like to proceed with these changes? (yes/no): ")?;
    if !proceed {
        println!("Operation canceled by the user.");
        return Ok(());
    }

    sink.emit("Performing file operations...");
    let history = History::new(PathBuf::from(&config.logging.history_file));
    let report = execute_operations(&plan.operations, false, sink.as_ref(), Some(&history));

    sink.emit(RULE);
    if report.failed.is_empty() {
        sink.emit("The files have been organized successfully.");
    } else {
        sink.emit(&format!(
            "Organized {} files; {} could not be moved.",
            report.succeeded.len(),
            report.failed.len()
        ));
    }
    sink.emit(RULE);

    Ok(())
}

/// Quarantine duplicates and stale versions under one directory
fn run_isolate(config: &AppConfig, dir: Option<PathBuf>, silent: bool, yes: bool, dry_run: bool) -> Result<()> {
    let sink = sink::for_mode(silent, Path::new(&config.logging.log_file));

    let dir = match dir {
        Some(path) if path.is_dir() => path,
        Some(path) => {
            sink.emit(&format!("Input path {} does not exist. Please enter a valid path.", path.display()));
            prompt_existing_path("Enter the directory to scan for duplicates: ", sink.as_ref())?
        }
        None => prompt_existing_path("Enter the directory to scan for duplicates: ", sink.as_ref())?,
    };
    let dir = absolute_path(&dir)?;
    let root = config.isolate.quarantine_root(&dir);

    if !dry_run && !yes {
        let question = format!(
            "Duplicates and old versions under {} will be moved to {}. Continue? (yes/no): ",
            dir.display(),
            root.display()
        );
        if !get_yes_no(&question)? {
            println!("Operation canceled by the user.");
            return Ok(());
        }
    }

    sink.emit(&format!("전체 폴더 기반 중복 및 구버전 정리 시작: {}", dir.display()));

    let extractor = DocumentExtractor::new();
    let history = History::new(PathBuf::from(&config.logging.history_file));
    let isolator = Isolator::new(&config.isolate, &extractor, sink.as_ref()).with_history(&history);
    let report = isolator.isolate_all(&dir, dry_run)?;

    sink.emit(&format!(
        "정리 완료: {}개 검사, 중복 {}개, 구버전 {}개, 실패 {}개",
        report.scanned,
        report.count(QuarantineReason::Duplicate),
        report.count(QuarantineReason::StaleVersion),
        report.failed.len()
    ));

    Ok(())
}

/// Run history commands
fn run_history_command(config: &AppConfig, action: HistoryCommands) -> Result<()> {
    let history = History::new(PathBuf::from(&config.logging.history_file));

    match action {
        HistoryCommands::List { count } => {
            let entries = history.recent(count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                let kind = match entry.kind {
                    EntryKind::Filed => "filed",
                    EntryKind::Quarantined => "quarantined",
                };
                println!("  {} {} [{}] {} -> {} {}",
                    entry.recorded_at.format("%Y-%m-%d %H:%M"),
                    kind,
                    entry.folder,
                    entry.source.display(),
                    entry.destination.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let console = sink::ConsoleSink;
            let report = history.undo_recent(count, dry_run, &console)?;
            if report.undone.is_empty() && report.skipped.is_empty() {
                println!("No moves to undo");
            } else if !report.skipped.is_empty() {
                warn!("{} entries could not be undone", report.skipped.len());
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: &AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Backend: {:?} ({})", config.ai_engine.backend, config.ai_engine.url);
            println!("  Model: {}", config.ai_engine.model);
            println!("  Classify mode: {:?}", config.classify.mode);
            println!("  Grouping: {:?} >= {}", config.grouping.strategy, config.grouping.threshold());
            println!("  Reconcile cutoff: {}", config.reconcile.cutoff);
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: &AppConfig) -> Result<()> {
    println!("topicfold v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    match config.ai_engine.backend {
        Backend::Ollama => {
            let client = OllamaClient::new(&config.ai_engine)?;
            match client.health_check().await {
                Ok(()) => println!("Ollama: Running"),
                Err(e) => println!("Ollama: Error - {}", e),
            }

            match client.model_available().await {
                Ok(true) => println!("Model {}: available", config.ai_engine.model),
                Ok(false) => println!(
                    "Model {}: not found (run `ollama pull {}`)",
                    config.ai_engine.model, config.ai_engine.model
                ),
                Err(_) => {}
            }

            match client.list_models().await {
                Ok(models) => {
                    println!("\nAvailable models:");
                    for m in &models {
                        let marker = if m.starts_with(config.ai_engine.model.as_str()) { "→" } else { " " };
                        println!("  {} {}", marker, m);
                    }
                }
                Err(e) => println!("  Error listing models: {}", e),
            }
        }
        Backend::Completions => {
            let client = CompletionsClient::new(&config.ai_engine)?;
            println!("Completions endpoint: {}", client.endpoint());
        }
    }

    println!("\nConfiguration:");
    println!("  Model: {}", config.ai_engine.model);
    println!("  Classify mode: {:?}", config.classify.mode);
    println!("  Example log: {}", config.logging.hint_log);
    println!("  History: {}", config.logging.history_file);

    Ok(())
}
