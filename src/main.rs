//! 命令行程序入口

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use polywoof::env::{self, EnvVar};
use polywoof::translation::{
    config::ConfigManager, error::helpers::log_error, LanguageKind, LanguageTable, MessageFilter,
    TranslationConfig, TranslationError, TranslationResult, TranslationService,
};

#[derive(Parser)]
#[command(
    name = "polywoof",
    version,
    about = "Cached DeepL translation for short, frequently repeated text"
)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// DeepL authentication key, overrides configuration
    #[arg(long, global = true)]
    token: Option<String>,

    /// Bypass the on-disk translation cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a single text
    Translate {
        #[arg(help = "Text to translate")]
        text: String,

        /// Target language code or name prefix (default from configuration)
        #[arg(long, short = 't')]
        to: Option<String>,

        /// Apply a built-in message filter before translating
        #[arg(long, value_enum)]
        filter: Option<FilterKind>,
    },
    /// List languages supported by the API
    Languages {
        /// List source languages instead of target languages
        #[arg(long)]
        source: bool,

        /// Show the bundled offline list without contacting the API
        #[arg(long)]
        offline: bool,
    },
    /// Show character usage for the current key
    Usage,
    /// Resolve a language query against the bundled list
    Resolve {
        #[arg(help = "Language code or name prefix")]
        query: String,
    },
    /// Write an example configuration file
    InitConfig {
        #[arg(default_value = "polywoof.toml")]
        path: PathBuf,
    },
    /// Print environment variable documentation
    EnvDocs,
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterKind {
    Chat,
    Dialogue,
    Overhead,
}

impl FilterKind {
    fn build(self) -> MessageFilter {
        match self {
            FilterKind::Chat => MessageFilter::chat(),
            FilterKind::Dialogue => MessageFilter::dialogue(),
            FilterKind::Overhead => MessageFilter::overhead(),
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => std::env::var(env::core::LogLevel::NAME)
            .ok()
            .and_then(|value| env::core::LogLevel::parse(&value).ok())
            .unwrap_or_else(|| "warn".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("polywoof={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> TranslationResult<TranslationConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path)?,
        None => ConfigManager::new()?,
    };

    let mut config = manager.into_config();
    if let Some(token) = &cli.token {
        config.token = token.clone();
    }
    if cli.no_cache {
        config.cache_enabled = false;
    }
    Ok(config)
}

async fn build_service(cli: &Cli) -> TranslationResult<TranslationService> {
    let service = TranslationService::new(load_config(cli)?)?;
    service.start().await;
    Ok(service)
}

async fn run(cli: Cli) -> TranslationResult<ExitCode> {
    match &cli.command {
        Command::Translate { text, to, filter } => {
            let text = match filter {
                Some(kind) => match kind.build().apply(text) {
                    Some(filtered) => filtered,
                    None => {
                        eprintln!("Message skipped by filter");
                        return Ok(ExitCode::from(2));
                    }
                },
                None => text.clone(),
            };

            let service = build_service(&cli).await?;
            let query = to
                .clone()
                .unwrap_or_else(|| service.config().language.clone());

            let result = service.translate(&text, &query).await;
            service.shutdown().await;

            match result? {
                Some(translated) => {
                    println!("{}", translated);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    let language = service.resolve(&query);
                    if language.is_unknown() {
                        eprintln!("Unknown language: {}", language.code);
                    } else if !service.client().has_credential() {
                        eprintln!("No API key configured, set POLYWOOF_TOKEN or use --token");
                    } else {
                        eprintln!("Nothing to translate");
                    }
                    Ok(ExitCode::from(2))
                }
            }
        }
        Command::Languages { source, offline } => {
            if *offline {
                for language in LanguageTable::with_bundled().offline() {
                    println!("{}\t{}", language.code, language.name);
                }
                return Ok(ExitCode::SUCCESS);
            }

            let service = TranslationService::new(load_config(&cli)?)?;
            let kind = if *source {
                LanguageKind::Source
            } else {
                LanguageKind::Target
            };

            for language in service.client().list_languages(kind).await? {
                println!("{}\t{}", language.code, language.name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Usage => {
            let service = TranslationService::new(load_config(&cli)?)?;
            let usage = service.usage().await?;
            println!(
                "{} / {} characters ({:.1}%), {} remaining",
                usage.character_count,
                usage.character_limit,
                usage.fraction_used() * 100.0,
                usage.remaining()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve { query } => {
            let language = LanguageTable::with_bundled().resolve(query);
            if language.is_unknown() {
                println!("{}\tUnknown", language.code);
                Ok(ExitCode::from(2))
            } else {
                println!("{}\t{}", language.code, language.name);
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::InitConfig { path } => {
            ConfigManager::generate_example_config(path)?;
            println!("Wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::EnvDocs => {
            print!("{}", env::generate_env_docs());
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log_error("polywoof", &e);
            eprintln!("Error: {}", e);
            match e {
                TranslationError::Config(_) => ExitCode::from(3),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
