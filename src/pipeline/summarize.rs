// Summarize pipeline: fetch each listed course page and summarize it.
//
// Courses already summarized in the checkpoint are skipped. Pages are
// fetched and summarized concurrently; results are applied to the
// checkpoint one at a time as they arrive and the checkpoint is saved after
// every item, so a crash loses at most the in-flight work. A failing course
// is logged and left pending; it never aborts the run.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::crawl::checkpoint::{Checkpoint, CheckpointEntry};
use crate::crawl::page::PageSource;
use crate::crawl::summarizer::Summarizer;
use crate::output::truncate_chars;

/// Counts from one summarize run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummarizeStats {
    /// Courses in the checkpoint
    pub total: usize,
    /// Already done before this run
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// What happened to one course.
enum ItemOutcome {
    Done {
        url: String,
        content: String,
        summary: String,
    },
    Failed {
        url: String,
        name: String,
        content: Option<String>,
        error: anyhow::Error,
    },
}

/// Fetch (when needed) and summarize one pending course.
async fn process(
    entry: CheckpointEntry,
    pages: &dyn PageSource,
    summarizer: &dyn Summarizer,
) -> ItemOutcome {
    let CheckpointEntry {
        name, url, content, ..
    } = entry;

    // Content from an earlier, partially failed run is reused
    let content = if content.trim().is_empty() {
        match pages.fetch_content(&url).await {
            Ok(c) => c,
            Err(error) => {
                return ItemOutcome::Failed {
                    url,
                    name,
                    content: None,
                    error,
                }
            }
        }
    } else {
        content
    };

    match summarizer.summarize(&content).await {
        Ok(summary) => ItemOutcome::Done {
            url,
            content,
            summary,
        },
        Err(error) => ItemOutcome::Failed {
            url,
            name,
            content: Some(content),
            error,
        },
    }
}

/// Run the summarize pipeline over every pending checkpoint entry.
pub async fn run(
    checkpoint: &mut Checkpoint,
    pages: &dyn PageSource,
    summarizer: &dyn Summarizer,
    concurrency: usize,
) -> Result<SummarizeStats> {
    let pending = checkpoint.pending();
    let mut stats = SummarizeStats {
        total: checkpoint.entries().len(),
        skipped: checkpoint.entries().len() - pending.len(),
        ..Default::default()
    };

    if pending.is_empty() {
        info!(total = stats.total, "All courses already summarized");
        return Ok(stats);
    }

    info!(
        pending = pending.len(),
        skipped = stats.skipped,
        concurrency = concurrency,
        "Summarizing courses"
    );

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Summarizing [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );

    let mut results = stream::iter(
        pending
            .into_iter()
            .map(|entry| process(entry, pages, summarizer)),
    )
    .buffer_unordered(concurrency.max(1));

    while let Some(outcome) = results.next().await {
        match outcome {
            ItemOutcome::Done {
                url,
                content,
                summary,
            } => {
                info!(url = %url, summary = %truncate_chars(&summary, 60), "Summarized");
                checkpoint.record_success(&url, content, summary);
                stats.succeeded += 1;
            }
            ItemOutcome::Failed {
                url,
                name,
                content,
                error,
            } => {
                warn!(url = %url, name = %name, error = %error, "Failed to summarize course, skipping");
                checkpoint.record_failure(&url, content, format!("{error:#}"));
                stats.failed += 1;
            }
        }
        checkpoint.save()?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        skipped = stats.skipped,
        "Summarize run complete"
    );

    Ok(stats)
}
