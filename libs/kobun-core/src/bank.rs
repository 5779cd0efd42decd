//! Loaded question bank.

use std::path::Path;
use std::sync::Arc;

use crate::error::{LoadError, Result};
use crate::parser;
use crate::types::QuestionRecord;

/// Immutable set of questions. Sessions hold `Arc` references into it.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    records: Vec<Arc<QuestionRecord>>,
}

impl QuestionBank {
    /// Build a bank from CSV text. Malformed rows are skipped.
    pub fn from_csv(content: &str, skip_header: bool) -> Self {
        let records = parser::parse(content, skip_header);
        if records.is_empty() {
            tracing::warn!("question bank is empty");
        }
        Self::from_records(records)
    }

    /// Read and parse a CSV file.
    pub fn from_path(path: impl AsRef<Path>, skip_header: bool) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let bank = Self::from_csv(&content, skip_header);
        tracing::info!(path = %path.display(), questions = bank.len(), "loaded question bank");
        Ok(bank)
    }

    pub fn from_records(records: Vec<QuestionRecord>) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn records(&self) -> &[Arc<QuestionRecord>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
