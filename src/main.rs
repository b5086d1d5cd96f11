// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use transgate::app_config::{Config, LogLevel};
use transgate::translation::{CleanupTask, ContextType, TranslationManager, TranslationOutcome};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ContextType to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliContext {
    Private,
    Group,
    Public,
}

impl From<CliContext> for ContextType {
    fn from(context: CliContext) -> Self {
        match context {
            CliContext::Private => ContextType::Private,
            CliContext::Group => ContextType::Group,
            CliContext::Public => ContextType::Public,
        }
    }
}

/// Overrides shared by the commands that translate
#[derive(Args, Debug, Clone)]
struct TranslateOverrides {
    /// Source language code (e.g., 'en', 'zh', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'zh', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Conversation context of the text
    #[arg(long, value_enum)]
    context: Option<CliContext>,

    /// Minimum acceptable quality (0.0 - 1.0)
    #[arg(long)]
    min_quality: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate one or more texts
    Translate {
        /// Texts to translate
        #[arg(value_name = "TEXT", required = true)]
        texts: Vec<String>,

        #[command(flatten)]
        overrides: TranslateOverrides,

        /// Print outcomes as JSON, including both analyses
        #[arg(long)]
        json: bool,
    },

    /// Translate lines read from standard input until EOF
    Interactive {
        #[command(flatten)]
        overrides: TranslateOverrides,
    },

    /// Show cache, token and cost statistics
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recently used cache entries
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Evict stale and single-use cache entries
    Cleanup {
        /// Retention window in days (defaults to the configured cache days)
        #[arg(long)]
        max_days: Option<u32>,
    },

    /// Generate shell completions for transgate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// transgate - quality-gated translation routing
///
/// Routes texts between a fast machine translation service and a language
/// model, caching every result in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "transgate")]
#[command(version = "0.1.0")]
#[command(about = "Quality-gated translation with a persistent cache")]
#[command(long_about = "transgate translates short texts through a fast machine translation \
service, escalating to a language model when the text is emotionally loaded, long, or the \
fast result is not good enough. Every result is cached.

EXAMPLES:
    transgate translate 'hello there'                  # Translate with the configured languages
    transgate translate -s zh -t en --context private '宝贝我好想你'
    transgate interactive -t fr                       # Translate stdin line by line
    transgate stats --json                            # Cache and usage statistics
    transgate history -n 5                            # Most recently used entries
    transgate cleanup --max-days 14                   # Evict entries unused for 14 days
    transgate completions bash > transgate.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys may come from OPENAI_API_KEY or
    ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Cache database path (overrides the configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install the logger at its most verbose; the effective level is set below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "transgate", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).into());
    }

    let mut config = load_or_create_config(&cli.config_path)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    }
    if let Some(database) = &cli.database {
        config.database_path = Some(database.clone());
    }

    match cli.command {
        Commands::Translate {
            texts,
            overrides,
            json,
        } => {
            apply_overrides(&mut config, &overrides);
            let manager = build_manager(&config)?;
            run_translate(&manager, &config, &texts, json).await
        }
        Commands::Interactive { overrides } => {
            apply_overrides(&mut config, &overrides);
            let manager = build_manager(&config)?;
            run_interactive(&manager, &config).await
        }
        Commands::Stats { json } => {
            let manager = build_manager(&config)?;
            let stats = manager.get_usage_statistics().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats);
            }
            Ok(())
        }
        Commands::History { limit } => {
            let manager = build_manager(&config)?;
            let history = manager.history(limit).await?;
            if history.is_empty() {
                info!("Cache is empty");
            }
            for entry in history {
                println!(
                    "[{}] (q={:.2}, used {}x) {} => {}",
                    entry.last_used.format("%Y-%m-%d %H:%M"),
                    entry.quality_score,
                    entry.use_count,
                    entry.original_text,
                    entry.translated_text
                );
            }
            Ok(())
        }
        Commands::Cleanup { max_days } => {
            let manager = build_manager(&config)?;
            let max_days = max_days.unwrap_or(config.translation.cache_days);
            let removed = manager.cleanup(max_days).await?;
            println!("Removed {} cache entries", removed);
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the configuration, writing a default one when the file is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        Config::load(config_path)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

fn apply_overrides(config: &mut Config, overrides: &TranslateOverrides) {
    if let Some(source_language) = &overrides.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &overrides.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(context) = &overrides.context {
        config.context_type = context.clone().into();
    }
    if let Some(min_quality) = overrides.min_quality {
        config.translation.min_quality = min_quality;
    }
}

/// Validate the final configuration, apply its log level and build the manager
fn build_manager(config: &Config) -> Result<TranslationManager> {
    config
        .validate()
        .context("Configuration validation failed")?;
    log::set_max_level(config.log_level.into());
    debug!("Using configuration: {:?}", config.translation);
    TranslationManager::from_config(config)
}

async fn run_translate(
    manager: &TranslationManager,
    config: &Config,
    texts: &[String],
    json: bool,
) -> Result<()> {
    let outcomes = manager
        .translate_many(
            texts,
            &config.source_language,
            &config.target_language,
            config.context_type,
        )
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            print_outcome(outcome);
        }
    }

    if outcomes.iter().all(|outcome| !outcome.is_translated()) {
        return Err(anyhow!("No text could be translated"));
    }
    Ok(())
}

async fn run_interactive(manager: &TranslationManager, config: &Config) -> Result<()> {
    let cleanup = CleanupTask::spawn(
        manager.cache().clone(),
        config.translation.cache_days,
        Duration::from_secs(config.translation.cleanup_interval_hours * 3600),
    );

    info!(
        "Translating {} -> {} ({} context). Enter one text per line, Ctrl-D to quit.",
        config.source_language, config.target_language, config.context_type
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let outcome = manager
            .translate(
                text,
                &config.source_language,
                &config.target_language,
                config.context_type,
            )
            .await;
        print_outcome(&outcome);
    }

    let removed = cleanup.shutdown().await;
    debug!("Background cleanup removed {} entries this session", removed);
    println!("{}", manager.get_usage_statistics().await?);
    Ok(())
}

fn print_outcome(outcome: &TranslationOutcome) {
    println!(
        "{}\t[{} q={:.2}]",
        outcome.translation, outcome.source, outcome.quality_score
    );
    if let Some(error) = &outcome.error {
        warn!("{}", error);
    }
}
