// Resumable progress for the summarize pipeline.
//
// One JSON file holds an entry per course URL. An entry counts as done once
// its summary is non-blank; anything else is retried on the next run, reusing
// page content that was already fetched. The file is rewritten after every
// item through a temp file + rename so an interrupted run never leaves a
// truncated checkpoint behind.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::listing::ListingEntry;

/// Progress for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub name: String,
    pub url: String,
    /// Extracted page text
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    /// Last error for this course, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CheckpointEntry {
    fn pending(entry: &ListingEntry) -> Self {
        Self {
            name: entry.name.clone(),
            url: entry.url.clone(),
            content: String::new(),
            summary: String::new(),
            error: None,
            updated_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        !self.summary.trim().is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct CheckpointFile {
    version: u32,
    entries: Vec<CheckpointEntry>,
}

const CHECKPOINT_VERSION: u32 = 1;

/// On-disk progress keyed by course URL.
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    entries: Vec<CheckpointEntry>,
    index: HashMap<String, usize>,
}

impl Checkpoint {
    /// Open the checkpoint at `path` and line it up with `listing`.
    ///
    /// Entries are ordered like the listing, one per URL. Saved entries whose
    /// URL is no longer listed are kept at the end so earlier work is never
    /// dropped.
    pub fn open(path: &Path, listing: &[ListingEntry]) -> Result<Self> {
        let mut saved: Vec<CheckpointEntry> = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?;
            let file: CheckpointFile = serde_json::from_str(&data)
                .with_context(|| format!("Corrupt checkpoint file: {}", path.display()))?;
            if file.version != CHECKPOINT_VERSION {
                anyhow::bail!(
                    "Checkpoint {} has version {}, expected {}",
                    path.display(),
                    file.version,
                    CHECKPOINT_VERSION
                );
            }
            file.entries
        } else {
            Vec::new()
        };

        let mut by_url: HashMap<String, CheckpointEntry> = HashMap::new();
        let mut leftover_order = Vec::new();
        for entry in saved.drain(..) {
            if !by_url.contains_key(&entry.url) {
                leftover_order.push(entry.url.clone());
            }
            by_url.insert(entry.url.clone(), entry);
        }

        let mut entries = Vec::with_capacity(listing.len());
        let mut listed = HashSet::with_capacity(listing.len());
        for item in listing {
            if !listed.insert(item.url.as_str()) {
                debug!(url = %item.url, "Duplicate listing url, keeping the first entry");
                continue;
            }
            match by_url.remove(&item.url) {
                Some(existing) => entries.push(existing),
                None => entries.push(CheckpointEntry::pending(item)),
            }
        }
        for url in leftover_order {
            if let Some(entry) = by_url.remove(&url) {
                entries.push(entry);
            }
        }

        let checkpoint = Self::from_entries(path.to_path_buf(), entries);
        info!(
            path = %path.display(),
            total = checkpoint.entries.len(),
            done = checkpoint.done_count(),
            "Opened checkpoint"
        );
        Ok(checkpoint)
    }

    fn from_entries(path: PathBuf, entries: Vec<CheckpointEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            index.entry(e.url.clone()).or_insert(i);
        }
        Self {
            path,
            entries,
            index,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[CheckpointEntry] {
        &self.entries
    }

    pub fn get(&self, url: &str) -> Option<&CheckpointEntry> {
        self.index.get(url).map(|&i| &self.entries[i])
    }

    pub fn is_done(&self, url: &str) -> bool {
        self.get(url).is_some_and(CheckpointEntry::is_done)
    }

    pub fn done_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_done()).count()
    }

    /// Entries that still need a summary, in listing order.
    pub fn pending(&self) -> Vec<CheckpointEntry> {
        self.entries.iter().filter(|e| !e.is_done()).cloned().collect()
    }

    pub fn record_success(&mut self, url: &str, content: String, summary: String) {
        if let Some(&i) = self.index.get(url) {
            let entry = &mut self.entries[i];
            entry.content = content;
            entry.summary = summary;
            entry.error = None;
            entry.updated_at = Some(Utc::now());
        }
    }

    /// Remember a failure. Content fetched before the failure is kept so the
    /// next run can skip straight to summarizing.
    pub fn record_failure(&mut self, url: &str, content: Option<String>, error: String) {
        if let Some(&i) = self.index.get(url) {
            let entry = &mut self.entries[i];
            if let Some(content) = content {
                entry.content = content;
            }
            entry.error = Some(error);
            entry.updated_at = Some(Utc::now());
        }
    }

    /// Write the checkpoint atomically.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = CheckpointFile {
            version: CHECKPOINT_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize checkpoint")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), done = self.done_count(), "Checkpoint saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(urls: &[&str]) -> Vec<ListingEntry> {
        urls.iter()
            .map(|u| ListingEntry {
                name: format!("Course {u}"),
                url: u.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_new_checkpoint_is_all_pending() {
        let dir = tempfile::tempdir().unwrap();
        let cp = Checkpoint::open(&dir.path().join("cp.json"), &listing(&["a", "b"])).unwrap();
        assert_eq!(cp.entries().len(), 2);
        assert_eq!(cp.pending().len(), 2);
        assert_eq!(cp.done_count(), 0);
    }

    #[test]
    fn test_duplicate_listing_urls_share_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        let mut cp = Checkpoint::open(&path, &listing(&["u", "v", "u"])).unwrap();
        assert_eq!(cp.path(), path.as_path());
        assert_eq!(cp.entries().len(), 2);

        cp.record_success("u", "content".into(), "summary".into());
        let pending: Vec<_> = cp.pending().into_iter().map(|e| e.url).collect();
        assert_eq!(pending, vec!["v"]);
    }

    #[test]
    fn test_resume_skips_done_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");

        let mut cp = Checkpoint::open(&path, &listing(&["a", "b", "c"])).unwrap();
        cp.record_success("a", "content a".into(), "summary a".into());
        cp.record_success("b", "content b".into(), "   ".into());
        cp.record_failure("c", Some("content c".into()), "timeout".into());
        cp.save().unwrap();

        let cp = Checkpoint::open(&path, &listing(&["a", "b", "c"])).unwrap();
        assert!(cp.is_done("a"));
        assert!(!cp.is_done("b"), "blank summary is not done");
        let pending: Vec<_> = cp.pending().into_iter().map(|e| e.url).collect();
        assert_eq!(pending, vec!["b", "c"]);
        assert_eq!(cp.get("c").unwrap().content, "content c");
        assert_eq!(cp.get("c").unwrap().error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_unlisted_entries_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");

        let mut cp = Checkpoint::open(&path, &listing(&["old", "a"])).unwrap();
        cp.record_success("old", "c".into(), "s".into());
        cp.save().unwrap();

        let cp = Checkpoint::open(&path, &listing(&["a", "new"])).unwrap();
        let urls: Vec<_> = cp.entries().iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "new", "old"]);
        assert!(cp.is_done("old"));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cp.json");
        let cp = Checkpoint::open(&path, &listing(&["a"])).unwrap();
        cp.save().unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested").join("cp.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Checkpoint::open(&path, &listing(&["a"])).is_err());
    }
}
