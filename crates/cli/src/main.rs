use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use koma_client::{ClientConfig, KomaApi};
use koma_core::recognition::BatchReport;
use koma_core::{ruby, sanitize};
use koma_editor::batch::{run_batch_ocr, run_batch_tagging, DEFAULT_BATCH_PAUSE};
use koma_editor::{AnnotationStore, NotificationBus};

#[derive(Parser)]
#[command(name = "koma", version, about = "Manga page annotation tools")]
struct Cli {
    /// Annotation server base URL.
    #[arg(long, global = true, env = "KOMA_API_URL")]
    api_url: Option<String>,
    #[arg(long, global = true, env = "KOMA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ruby notation utilities (offline).
    Ruby {
        #[command(subcommand)]
        command: RubyCommand,
    },
    /// Page operations against an annotation server.
    Page {
        #[command(subcommand)]
        command: PageCommand,
    },
}

#[derive(Subcommand)]
enum RubyCommand {
    /// `漢字{かんじ}` notation to stored markup.
    Encode { text: String },
    /// Stored markup back to notation.
    Decode { text: String },
    /// Escape every tag except ruby markup.
    Sanitize { html: String },
}

#[derive(Subcommand)]
enum PageCommand {
    /// Every page image with its status.
    List,
    /// Print the reading sequence with labels, types and text.
    Show {
        image_id: String,
        /// Print base text only, dropping ruby readings.
        #[arg(long)]
        plain: bool,
    },
    /// Close gaps in the reading order.
    Compact {
        image_id: String,
    },
    /// Re-run OCR on every text annotation.
    OcrAll {
        image_id: String,
    },
    /// Re-run the tagger on every figure annotation.
    TagAll {
        image_id: String,
        /// Defaults to the server's advertised threshold.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Print the server's tagger threshold, or store a new one.
    Threshold { value: Option<f64> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "koma_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ruby { command } => {
            let output = match command {
                RubyCommand::Encode { text } => ruby::encode(&text),
                RubyCommand::Decode { text } => ruby::decode(&text),
                RubyCommand::Sanitize { html } => sanitize::sanitize_ruby_html(&html),
            };
            println!("{output}");
        }
        Commands::Page { command } => {
            let mut config = ClientConfig::from_env()?;
            if let Some(url) = cli.api_url {
                config.api_url = url.trim_end_matches('/').to_string();
            }
            if cli.api_key.is_some() {
                config.api_key = cli.api_key;
            }
            tracing::debug!(api_url = %config.api_url, "Client configured");
            let api = KomaApi::from_config(&config)?;
            run_page_command(api, &config, command).await?;
        }
    }

    Ok(())
}

async fn run_page_command(
    api: KomaApi,
    config: &ClientConfig,
    command: PageCommand,
) -> anyhow::Result<()> {
    let recognizer = api.clone();
    let mut store = AnnotationStore::new(api, Arc::new(NotificationBus::default()));

    match command {
        PageCommand::List => {
            for page in store.repository().list_pages().await? {
                let status = match (page.has_annotation, page.is_completed) {
                    (_, true) => "done",
                    (true, false) => "in progress",
                    (false, false) => "new",
                };
                println!("{}\t{status}", page.id);
            }
        }
        PageCommand::Show { image_id, plain } => {
            let page = store
                .load(&image_id)
                .await
                .with_context(|| format!("Failed to load page {image_id}"))?;
            if let Some(summary) = page.page_summary.as_deref().filter(|s| !s.is_empty()) {
                println!("# {summary}");
            }
            for (label, annotation) in store.labelled() {
                let text = if plain {
                    ruby::base_text(&annotation.text)
                } else {
                    ruby::decode(&annotation.text)
                };
                println!("{label}\t{}\t{text}", annotation.kind.label());
            }
        }
        PageCommand::Compact { image_id } => {
            store.load(&image_id).await?;
            let changes = store.sequence().compact().await?;
            for change in &changes {
                println!("{}\t{} -> {}", change.id, change.from, change.to);
            }
            println!("{} annotations renumbered", changes.len());
        }
        PageCommand::OcrAll { image_id } => {
            store.load(&image_id).await?;
            let report = run_batch_ocr(&mut store, &recognizer, DEFAULT_BATCH_PAUSE).await?;
            print_report("OCR", &report)?;
        }
        PageCommand::TagAll {
            image_id,
            threshold,
        } => {
            let threshold = match threshold {
                Some(value) => value,
                None => recognizer
                    .tagger_threshold()
                    .await
                    .unwrap_or(config.tagger_threshold),
            };
            store.load(&image_id).await?;
            let report =
                run_batch_tagging(&mut store, &recognizer, threshold, DEFAULT_BATCH_PAUSE).await?;
            print_report("Tagging", &report)?;
        }
        PageCommand::Threshold { value } => {
            let current = match value {
                Some(value) => store.repository().set_tagger_threshold(value).await?,
                None => store.repository().tagger_threshold().await?,
            };
            println!("{current}");
        }
    }

    Ok(())
}

fn print_report(what: &str, report: &BatchReport) -> anyhow::Result<()> {
    for (id, message) in &report.failures {
        eprintln!("{id}\t{message}");
    }
    println!("{what}: {}", report.summary());
    if report.failed() > 0 {
        bail!("{} of {} annotations failed", report.failed(), report.attempted);
    }
    Ok(())
}
