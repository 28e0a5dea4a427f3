use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::data::{Dataset, TOPIC_PREFIX};

/// Display names for topic columns: line *i* of the names file labels
/// column `topic_i`. Immutable after load.
#[derive(Debug, Clone)]
pub struct TopicCatalog {
    labels: Vec<String>,
}

impl TopicCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("opening topic names {}", path.display()))?;
        let labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        if labels.is_empty() || labels.iter().all(|l| l.is_empty()) {
            bail!("topic names file {} is empty", path.display());
        }
        Ok(Self { labels })
    }

    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn key(index: usize) -> String {
        format!("{}{}", TOPIC_PREFIX, index)
    }

    /// Display name for a topic key. A key with no label aborts the
    /// triggering recompute; after [`TopicCatalog::check_matches`] passes
    /// at startup this cannot happen for keys from the dataset.
    pub fn label(&self, key: &str) -> Result<&str> {
        let index = key
            .strip_prefix(TOPIC_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .with_context(|| format!("'{}' is not a topic key", key))?;
        match self.labels.get(index) {
            Some(label) => Ok(label.as_str()),
            None => bail!("no display name for topic key '{}'", key),
        }
    }

    /// Startup invariant: one label line per topic column. The original
    /// data files were only correct by convention; a mismatch here would
    /// otherwise surface as a lookup failure mid-recompute.
    pub fn check_matches(&self, dataset: &Dataset) -> Result<()> {
        if self.labels.len() != dataset.topic_keys.len() {
            bail!(
                "topic names file has {} labels but dataset has {} topic columns",
                self.labels.len(),
                dataset.topic_keys.len()
            );
        }
        Ok(())
    }
}
