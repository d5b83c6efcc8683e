//! Label schema and label keys.
//!
//! A `LabelSchema` is chosen once at startup and fixes the arity and order of
//! every label key for the process lifetime. Values are taken verbatim from
//! the record: no trimming, no case folding.

use serde::Deserialize;

use crate::error::{PmPromError, Result};
use crate::protocol::record::Record;

/// An identity column usable as a label dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum LabelField {
    Application,
    #[serde(rename = "ProcessID")]
    ProcessId,
    SwapChainAddress,
    Runtime,
    SyncInterval,
    PresentFlags,
    AllowsTearing,
    PresentMode,
}

impl LabelField {
    /// Column index in the input line.
    pub fn column(self) -> usize {
        match self {
            LabelField::Application => 0,
            LabelField::ProcessId => 1,
            LabelField::SwapChainAddress => 2,
            LabelField::Runtime => 3,
            LabelField::SyncInterval => 4,
            LabelField::PresentFlags => 5,
            LabelField::AllowsTearing => 6,
            LabelField::PresentMode => 7,
        }
    }

    /// Label name as exposed to the monitoring backend.
    pub fn name(self) -> &'static str {
        match self {
            LabelField::Application => "Application",
            LabelField::ProcessId => "ProcessID",
            LabelField::SwapChainAddress => "SwapChainAddress",
            LabelField::Runtime => "Runtime",
            LabelField::SyncInterval => "SyncInterval",
            LabelField::PresentFlags => "PresentFlags",
            LabelField::AllowsTearing => "AllowsTearing",
            LabelField::PresentMode => "PresentMode",
        }
    }
}

/// Ordered tuple of label values identifying one series partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelKey(Vec<String>);

impl LabelKey {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[&str; N]> for LabelKey {
    fn from(values: [&str; N]) -> Self {
        Self(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Fixed, ordered set of label dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    fields: Vec<LabelField>,
}

impl Default for LabelSchema {
    fn default() -> Self {
        Self {
            fields: vec![LabelField::Application, LabelField::ProcessId],
        }
    }
}

impl LabelSchema {
    /// Build a schema. Must be non-empty and free of duplicates.
    pub fn new(fields: Vec<LabelField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(PmPromError::Config("labels must not be empty".into()));
        }
        for (i, f) in fields.iter().enumerate() {
            if fields[..i].contains(f) {
                return Err(PmPromError::Config(format!(
                    "duplicate label: {}",
                    f.name()
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[LabelField] {
        &self.fields
    }

    /// Label names in key order.
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Derive the label key for a parsed record. Cannot fail.
    pub fn key_for(&self, record: &Record) -> LabelKey {
        LabelKey(
            self.fields
                .iter()
                .map(|f| record.identity(f.column()).unwrap_or_default().to_string())
                .collect(),
        )
    }
}
