//! Label vocabulary for the classification model
//!
//! Loads the class-name list that pairs with the model's output vector,
//! one entry per line. ImageNet synset files prefix each line with a
//! WordNet id ("n01440764 tench, Tinca tinca"); the id is stripped.

use std::path::Path;

use anyhow::{Context, Result};

/// Ordered class names, index-aligned with the model output
#[derive(Debug, Clone)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Load a vocabulary from a one-label-per-line text file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {:?}", path))?;
        Ok(Self::parse(&content))
    }

    /// Parse vocabulary text, stripping synset ids and blank lines
    pub fn parse(content: &str) -> Self {
        let labels = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(strip_synset_id)
            .collect();

        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Class name for a model output index, if in range
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

/// Drop a leading WordNet id ("nXXXXXXXX ") if present
fn strip_synset_id(line: &str) -> String {
    match line.split_once(' ') {
        Some((id, rest))
            if id.len() == 9 && id.starts_with('n') && id[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest.to_string()
        }
        _ => line.to_string(),
    }
}
