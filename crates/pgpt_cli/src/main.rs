use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pgpt_client::{create_service, ClientConfig, HttpDocumentService, DEFAULT_API_URL};
use pgpt_core::{AgeGroup, FeedbackType, PersonalizationConfig, ReadingLevel};
use pgpt_session::{Capabilities, DocumentSession, FeedbackOutcome, RequestOutcome, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod files;
mod render;
mod repl;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Summarize insurance policy PDFs with PolicyGPT",
    long_about = None
)]
pub struct Cli {
    #[arg(long, env = "PGPT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Request timeout; unset waits as long as the backend takes.
    #[arg(long, env = "PGPT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
    /// Retry a failed upload once before reporting the error.
    #[arg(long)]
    legacy_retry: bool,
    #[arg(long)]
    no_personalization: bool,
    /// Only apply a new language on the next upload.
    #[arg(long)]
    no_incremental_translation: bool,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    reading_level: Option<ReadingLevel>,
    /// Customer interest code; repeat for several.
    #[arg(long = "interest")]
    interests: Vec<String>,
    #[arg(long)]
    age_group: Option<AgeGroup>,
}

impl ProfileArgs {
    fn into_config(self) -> PersonalizationConfig {
        let mut config = PersonalizationConfig::default();
        if let Some(level) = self.reading_level {
            config.reading_level = level;
        }
        for interest in &self.interests {
            config.set_interest(interest, true);
        }
        config.age_group = self.age_group;
        config
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Summarize one or more PDFs in a single batch
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Also translate the summaries into this language code
        #[arg(long)]
        lang: Option<String>,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Replace the default summarization instruction
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List the supported summary languages
    Languages,
    /// List the customer interests available for personalization
    Interests,
    /// Summarize a PDF, then rate its summary
    Feedback {
        file: PathBuf,
        #[arg(long = "type")]
        feedback_type: FeedbackType,
        /// What was unclear or inaccurate
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Check that the backend is up
    Health,
    /// Interactive session
    Session,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::new(&cli.api_url)
        .with_context(|| format!("Invalid API URL: {}", cli.api_url))?
        .with_upload_retry(cli.legacy_retry);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

fn session_config(cli: &Cli) -> SessionConfig {
    SessionConfig {
        capabilities: Capabilities {
            supports_personalization: !cli.no_personalization,
            supports_incremental_translation: !cli.no_incremental_translation,
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn summarize(session: &DocumentSession, paths: &[PathBuf], lang: Option<&str>) -> Result<()> {
    let selected = files::read_all(paths).await?;
    if session.handle_files(selected) == 0 {
        bail!("{}", session.error_message().unwrap_or_default());
    }
    if let Some(lang) = lang {
        session.on_language_change(lang).await;
    }
    if session.upload_files().await == RequestOutcome::Failed {
        bail!("{}", session.error_message().unwrap_or_default());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = client_config(&cli)?;
    let session_config = session_config(&cli);
    info!("🔌 Using backend at {}", config.api_url);

    match cli.command {
        Commands::Health => {
            let service = HttpDocumentService::new(config)?;
            if service.health().await? {
                println!("✨ Backend is healthy");
            } else {
                bail!("Backend answered but is not healthy");
            }
        }
        Commands::Languages => {
            let service = create_service(config)?;
            print!("{}", render::languages(&service.list_languages().await?));
        }
        Commands::Interests => {
            let service = create_service(config)?;
            print!("{}", render::interests(&service.list_interests().await?));
        }
        Commands::Upload {
            files,
            lang,
            profile,
            prompt,
            json,
        } => {
            let session_config = SessionConfig {
                custom_prompt: prompt,
                ..session_config
            };
            let session = DocumentSession::new(create_service(config)?, session_config);
            session.set_personalization(profile.into_config());
            summarize(&session, &files, lang.as_deref()).await?;

            let snapshot = session.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.results)?);
            } else {
                print!("{}", render::results(&snapshot));
            }
        }
        Commands::Feedback {
            file,
            feedback_type,
            text,
            lang,
        } => {
            let session = DocumentSession::new(create_service(config)?, session_config);
            summarize(&session, &[file], lang.as_deref()).await?;
            let filename = session
                .results()
                .first()
                .map(|result| result.filename.clone())
                .context("Backend returned no result")?;

            let mut outcome = session.submit_feedback(&filename, feedback_type).await?;
            if outcome == FeedbackOutcome::DialogOpened {
                outcome = session.submit_dialog(text.as_deref().unwrap_or_default()).await?;
            }
            let status = session.feedback_status(&filename);
            let message = status.and_then(|s| s.message).unwrap_or_default();
            match outcome {
                FeedbackOutcome::Recorded { refined } => {
                    println!("✅ {}", message);
                    if refined {
                        print!("{}", render::results(&session.snapshot()));
                    }
                }
                FeedbackOutcome::Failed => bail!("{}", message),
                _ => {}
            }
        }
        Commands::Session => {
            let session = DocumentSession::new(create_service(config)?, session_config);
            repl::Repl::new(session).run().await?;
        }
    }

    Ok(())
}
