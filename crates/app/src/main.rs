mod activity;
mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_brief_core::{
    DocumentPipeline, Generation, GenerationSettings, LanguageDetector, LinguaDetector,
    LopdfExtractor, OllamaClient, Session, SummaryProgress, SummaryResult, TextGenerator,
    DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use server::{AppState, ServerPipeline, DEFAULT_SESSION_TTL};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-brief", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ollama generate endpoint
    #[arg(long, env = "PDF_BRIEF_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    endpoint: String,

    /// Model name sent with every request
    #[arg(long, env = "PDF_BRIEF_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Page summaries allowed in flight at once (1 = strictly sequential)
    #[arg(long, env = "PDF_BRIEF_MAX_IN_FLIGHT", default_value = "1", global = true)]
    max_in_flight: usize,

    /// Directory for the temporary copy of uploaded PDFs (system temp dir by default)
    #[arg(long, env = "PDF_BRIEF_STAGING_DIR", global = true)]
    staging_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the session API over HTTP.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
        /// Seconds a session may sit idle before it is dropped.
        #[arg(long, env = "PDF_BRIEF_SESSION_TTL_SECS", default_value_t = DEFAULT_SESSION_TTL.as_secs())]
        session_ttl_secs: u64,
    },
    /// Summarize every non-empty page of a PDF.
    Summarize {
        /// PDF file to read.
        #[arg(long)]
        file: PathBuf,
        /// Key points per page (3-10).
        #[arg(long, default_value = "5")]
        highlights: i64,
    },
    /// Ask one question about a PDF.
    Ask {
        /// PDF file to read.
        #[arg(long)]
        file: PathBuf,
        /// Question to answer from the document.
        #[arg(long)]
        question: String,
    },
}

fn build_pipeline(cli: &Cli) -> anyhow::Result<ServerPipeline> {
    let client = OllamaClient::new(&cli.endpoint)
        .with_context(|| format!("invalid endpoint {}", cli.endpoint))?;
    let settings = GenerationSettings {
        model: cli.model.clone(),
        max_in_flight: cli.max_in_flight.max(1),
    };

    let pipeline = DocumentPipeline::new(
        LopdfExtractor,
        Box::new(LinguaDetector::new()) as Box<dyn LanguageDetector + Send + Sync>,
        Box::new(client) as Box<dyn TextGenerator>,
        settings,
    );

    Ok(match &cli.staging_dir {
        Some(dir) => pipeline.with_staging_dir(dir),
        None => pipeline,
    })
}

fn load_session(pipeline: &ServerPipeline, file: &Path) -> anyhow::Result<Session> {
    let bytes = std::fs::read(file)?;
    let file_name = file.file_name().and_then(|name| name.to_str());

    let mut session = Session::new();
    let overview = session
        .document_uploaded(pipeline, &bytes, file_name)
        .with_context(|| format!("could not load {}", file.display()))?;

    println!("pages: {}", overview.page_count);
    println!("language: {}", overview.language_display);
    Ok(session)
}

/// Prints one line per page as the run reaches it.
struct ConsoleProgress;

impl SummaryProgress for ConsoleProgress {
    fn page_started(&self, page: u32, position: usize, total: usize) {
        eprintln!("summarizing page {page} ({position}/{total})...");
    }

    fn page_finished(&self, result: &SummaryResult) {
        if result.generation.is_failed() {
            eprintln!("page {} failed", result.page_number);
        }
    }
}

fn print_generation(heading: &str, generation: &Generation) {
    match generation {
        Generation::Completed { text } => println!("{heading}\n{text}\n"),
        Generation::Failed { error } => println!("{heading}\n  failed: {error}\n"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let pipeline = build_pipeline(&cli)?;

    info!(
        version = app_version,
        endpoint = %cli.endpoint,
        model = %cli.model,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-brief boot"
    );

    match &cli.command {
        Command::Serve {
            bind,
            session_ttl_secs,
        } => {
            let state = AppState::new(pipeline)
                .with_session_ttl(Duration::from_secs(*session_ttl_secs));
            server::serve(state, *bind).await?;
        }
        Command::Summarize { file, highlights } => {
            let mut session = load_session(&pipeline, file)?;
            session.highlight_count_changed(*highlights)?;

            let run = session
                .summarize_requested_with_progress(&pipeline, &ConsoleProgress)
                .await?;

            if run.results.is_empty() {
                println!("no page had extractable text");
            }
            for result in &run.results {
                print_generation(&format!("[page {}]", result.page_number), &result.generation);
            }
            if run.failed_pages() > 0 {
                warn!(failed = run.failed_pages(), "some pages could not be summarized");
            }
        }
        Command::Ask { file, question } => {
            let mut session = load_session(&pipeline, file)?;
            eprintln!("waiting for the model...");
            let answer = session.question_asked(&pipeline, question).await?;

            print_generation("answer:", &answer.answer);
        }
    }

    Ok(())
}
