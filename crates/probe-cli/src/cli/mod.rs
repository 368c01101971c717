//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use probe_core::backend::BackendClient;
use probe_core::config::{self, Config};
use probe_core::logging::{self, OperationLog};

mod commands;

pub use commands::ReportFailed;

#[derive(Parser)]
#[command(name = "probe")]
#[command(version)]
#[command(about = "Diagnostic client for the text and vision generation backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "PROBE_BACKEND_URL", value_name = "URL")]
    backend_url: Option<String>,

    /// Raise diagnostic output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Question source shared by the generation commands.
#[derive(clap::Args, Debug, Clone, Default)]
struct QuestionArgs {
    /// Question to send
    #[arg(short, long)]
    question: Option<String>,

    /// Use a named question preset from the config
    #[arg(long, value_name = "NAME", conflicts_with = "question")]
    preset: Option<String>,
}

impl QuestionArgs {
    /// Resolves `--preset` against `lookup`, otherwise returns `--question`.
    fn resolve<'a>(
        &'a self,
        lookup: impl FnOnce(&str) -> Result<&'a str>,
    ) -> Result<Option<&'a str>> {
        match self.preset.as_deref() {
            Some(name) => lookup(name).map(Some),
            None => Ok(self.question.as_deref()),
        }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(flatten)]
    Probe(ProbeCommands),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Commands that talk to the backend or read the loaded config.
#[derive(clap::Subcommand)]
enum ProbeCommands {
    /// Check backend health
    Health,
    /// Validate the backend's API key
    Validate,
    /// Standard text generation
    Generate {
        #[command(flatten)]
        question: QuestionArgs,
    },
    /// Streaming text generation
    Stream {
        #[command(flatten)]
        question: QuestionArgs,

        /// Override maxTokens sent to the backend
        #[arg(long, value_name = "N")]
        max_tokens: Option<u32>,

        /// Print only the final result, then the retained operation log
        #[arg(long)]
        final_only: bool,
    },
    /// Image analysis
    Vision {
        /// Image file (any format the decoder supports)
        #[arg(value_name = "IMAGE")]
        image: Option<String>,

        #[command(flatten)]
        question: QuestionArgs,
    },
    /// Streaming image analysis
    VisionStream {
        /// Image file (any format the decoder supports)
        #[arg(value_name = "IMAGE")]
        image: Option<String>,

        #[command(flatten)]
        question: QuestionArgs,

        /// Print only the final result, then the retained operation log
        #[arg(long)]
        final_only: bool,
    },
    /// List configured question presets
    Questions,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        command,
        backend_url,
        verbose,
    } = cli;

    match command {
        Commands::Probe(command) => probe(command, backend_url.as_deref(), verbose).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}

async fn probe(command: ProbeCommands, backend_url: Option<&str>, verbose: u8) -> Result<()> {
    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging, verbose).context("init logging")?;

    let mut client_config = config
        .client_config(backend_url)
        .context("resolve backend")?;
    tracing::debug!(
        base_url = %client_config.base_url,
        config_path = %config::paths::config_path().display(),
        "probe starting"
    );

    let log = OperationLog::from_config(&config.logging);
    let mut out = if matches!(
        command,
        ProbeCommands::Stream { final_only: true, .. }
            | ProbeCommands::VisionStream { final_only: true, .. }
    ) {
        commands::ReportSink::deferred(log)
    } else {
        commands::ReportSink::new(log)
    };

    match command {
        ProbeCommands::Health => {
            commands::check::health(&BackendClient::new(client_config), &mut out).await
        }
        ProbeCommands::Validate => {
            commands::check::validate(&BackendClient::new(client_config), &mut out).await
        }
        ProbeCommands::Generate { question } => {
            let question = question.resolve(|name| config.question(name))?;
            commands::generate::run(
                &BackendClient::new(client_config),
                question.unwrap_or_default(),
                &mut out,
            )
            .await
        }
        ProbeCommands::Stream {
            question,
            max_tokens,
            final_only,
        } => {
            if let Some(max_tokens) = max_tokens {
                client_config.stream_max_tokens = max_tokens;
            }
            let question = question.resolve(|name| config.question(name))?;
            commands::stream::text(
                &BackendClient::new(client_config),
                question.unwrap_or_default(),
                final_only,
                &mut out,
            )
            .await
        }
        ProbeCommands::Vision { image, question } => {
            let question = question.resolve(|name| config.vision_question(name))?;
            commands::vision::run(
                &BackendClient::new(client_config),
                image.as_deref(),
                question,
                &mut out,
            )
            .await
        }
        ProbeCommands::VisionStream {
            image,
            question,
            final_only,
        } => {
            let question = question.resolve(|name| config.vision_question(name))?;
            commands::stream::vision(
                &BackendClient::new(client_config),
                image.as_deref(),
                question,
                final_only,
                &mut out,
            )
            .await
        }
        ProbeCommands::Questions => {
            commands::questions::list(&config);
            Ok(())
        }
    }
}
