use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use trendcover::config::Config;
use trendcover::crawl::rate_limiter::RateLimiter;
use trendcover::crawl::{listing, Checkpoint, ChatSummarizer, ExcerptSummarizer, PageClient, Summarizer};
use trendcover::encode::{Encoder, EncoderStrategy};
use trendcover::loader::{self, ColumnMapping};
use trendcover::output::markdown::ReportContext;
use trendcover::pipeline;
use trendcover::records::validate_courses;

/// trendcover: measure how well a course catalogue covers a set of trends.
///
/// Scores every course description against every trend phrase and reports
/// which courses and trends are covered.
#[derive(Parser)]
#[command(name = "trendcover", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a course table against a trend list
    Score {
        /// Course table (CSV)
        courses: PathBuf,

        /// Trend list: comma- or newline-separated phrases
        #[arg(long, conflicts_with = "trends_text", required_unless_present = "trends_text")]
        trends: Option<PathBuf>,

        /// Trend list given inline instead of as a file
        #[arg(long)]
        trends_text: Option<String>,

        /// Coverage threshold in [0, 1] (overrides TRENDCOVER_THRESHOLD)
        #[arg(long)]
        threshold: Option<f64>,

        /// Encoder: tfidf or embedding (overrides TRENDCOVER_ENCODER)
        #[arg(long)]
        encoder: Option<EncoderStrategy>,

        /// Number of top matches to report (overrides TRENDCOVER_TOP_N)
        #[arg(long)]
        top_n: Option<usize>,

        /// Column holding the course name
        #[arg(long)]
        name_column: Option<String>,

        /// Column holding the course description
        #[arg(long)]
        text_column: Option<String>,

        /// Column holding the key-technology category
        #[arg(long)]
        category_column: Option<String>,

        /// Keep courses in every category (default skips category 0)
        #[arg(long)]
        all_categories: bool,

        /// Skip writing the Markdown report and CSV exports
        #[arg(long)]
        no_export: bool,
    },

    /// Extract course names and links from a saved listing page
    Listing {
        /// Saved HTML of the catalogue overview page
        page: PathBuf,

        /// Where to write the name,url CSV
        #[arg(long, default_value = "output/listing.csv")]
        out: PathBuf,

        /// Site prefix for relative links (overrides TRENDCOVER_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Fetch and summarize every listed course, resuming from a checkpoint
    Summarize {
        /// Listing CSV written by `trendcover listing`
        listing: PathBuf,

        /// Checkpoint file (created if missing)
        #[arg(long, default_value = "output/summaries.checkpoint.json")]
        checkpoint: PathBuf,

        /// Final name,url,markdown,summary CSV
        #[arg(long, default_value = "output/summaries.csv")]
        out: PathBuf,

        /// Number of courses processed in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Max summarizer requests per minute, 0 for unlimited (default: 30)
        #[arg(long, default_value = "30")]
        rate: u32,

        /// Keep an excerpt of each description instead of calling the LLM
        #[arg(long)]
        no_llm: bool,
    },

    /// Download the sentence embedding model (~90 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trendcover=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            courses,
            trends,
            trends_text,
            threshold,
            encoder,
            top_n,
            name_column,
            text_column,
            category_column,
            all_categories,
            no_export,
        } => {
            let mut config = Config::load()?;
            if let Some(t) = threshold {
                config.threshold = t;
            }
            if let Some(e) = encoder {
                config.encoder = e;
            }
            if let Some(n) = top_n {
                config.top_n = n;
            }
            config.require_encoder()?;

            let trend_set = match (&trends, &trends_text) {
                (_, Some(text)) => loader::parse_trends(text),
                (Some(path), None) => loader::load_trends(path)?,
                (None, None) => anyhow::bail!("Pass --trends <file> or --trends-text <phrases>"),
            };

            let mut mapping = ColumnMapping::default().with_overrides(
                name_column.as_deref(),
                text_column.as_deref(),
                category_column.as_deref(),
            );
            if all_categories {
                mapping.excluded_categories.clear();
            }

            let raw = loader::load_courses(&courses, &mapping)?;
            let (records, issues) = validate_courses(raw);
            info!(
                courses = records.len(),
                issues = issues.len(),
                trends = trend_set.len(),
                encoder = %config.encoder,
                "Starting coverage run"
            );

            let settings = config.coverage_settings();
            let strategy = config.encoder;
            let model_dir = config.model_dir.clone();
            let batch_size = config.batch_size;

            // Encoding is CPU-bound; keep it off the async workers
            let (outcome, encoder_name) = tokio::task::spawn_blocking(move || -> Result<_> {
                let mut encoder = Encoder::for_strategy(strategy, &model_dir, batch_size)?;
                info!(strategy = %encoder.strategy(), "Encoder ready");
                let outcome = pipeline::coverage::run(records, trend_set, &mut encoder, settings)?;
                Ok((outcome, encoder.describe()))
            })
            .await
            .context("Coverage task panicked")??;

            trendcover::output::terminal::display_issues(&issues);
            trendcover::output::terminal::display_report(&outcome.report, &outcome.trends);

            if !no_export {
                let dir = &config.output_dir;
                let files = trendcover::output::csv::write_coverage_files(
                    dir,
                    &outcome.courses,
                    &outcome.trends,
                    &outcome.matrix,
                    &outcome.decision,
                )?;

                let source = courses.display().to_string();
                let report_path = trendcover::output::markdown::generate_report(
                    &outcome.report,
                    &outcome.trends,
                    &ReportContext {
                        encoder: encoder_name,
                        source: Some(&source),
                    },
                    &dir.join("coverage-report.md").display().to_string(),
                )?;

                println!("{}", format!("Markdown report saved to: {report_path}").bold());
                for file in files {
                    println!("  {} {}", "wrote".dimmed(), file);
                }
            }
        }

        Commands::Listing {
            page,
            out,
            base_url,
        } => {
            let config = Config::load()?;
            let base_url = base_url.unwrap_or(config.base_url);

            let entries = listing::read_listing_page(&page, &base_url)?;
            if entries.is_empty() {
                anyhow::bail!(
                    "No <h4><a href=...> course links found in {}",
                    page.display()
                );
            }
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            listing::write_listing_csv(&out, &entries)?;

            println!(
                "{}",
                format!("Found {} courses, saved to {}", entries.len(), out.display()).bold()
            );
            println!("Next: trendcover summarize {}", out.display());
        }

        Commands::Summarize {
            listing: listing_path,
            checkpoint,
            out,
            concurrency,
            rate,
            no_llm,
        } => {
            let config = Config::load()?;

            let summarizer: Box<dyn Summarizer> = if no_llm {
                Box::new(ExcerptSummarizer::default())
            } else {
                config.require_llm()?;
                let chat = ChatSummarizer::new(
                    config.llm_api_url.clone(),
                    Some(config.llm_api_key.clone()),
                    config.llm_model.clone(),
                    RateLimiter::per_minute(rate),
                )?;
                info!(model = chat.model(), rate_per_minute = rate, "Using chat summarizer");
                Box::new(chat)
            };

            let entries = listing::read_listing_csv(&listing_path)?;
            let mut cp = Checkpoint::open(&checkpoint, &entries)?;
            let pages = PageClient::new()?;

            let stats =
                pipeline::summarize::run(&mut cp, &pages, summarizer.as_ref(), concurrency).await?;
            trendcover::output::terminal::display_summarize_stats(&stats);
            println!("  {} {}", "checkpoint".dimmed(), cp.path().display());

            trendcover::output::csv::write_summaries_file(&out, cp.entries())?;
            println!(
                "{}",
                format!("Summaries saved to: {}", out.display()).bold()
            );
            if stats.failed > 0 {
                println!("Re-run the same command to retry the failed courses.");
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading sentence embedding model...");
            println!("  Destination: {}", model_dir.display());

            trendcover::encode::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `trendcover score --encoder embedding ...`.");
        }
    }

    Ok(())
}
