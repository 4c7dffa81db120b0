use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    AddFiles {
        paths: Vec<PathBuf>,
    },
    Remove {
        path: PathBuf,
    },
    Clear,
    List,
    ToSpreadsheet {
        target: OutputTarget,
    },
    ToDocument {
        target: OutputTarget,
    },
    Merge {
        output: PathBuf,
    },
}

impl Command {
    /// The batch action this command runs, if it is one
    pub fn action(&self) -> Option<Action> {
        match self {
            Command::ToSpreadsheet { .. } => Some(Action::Spreadsheet),
            Command::ToDocument { .. } => Some(Action::Document),
            Command::Merge { .. } => Some(Action::Merge),
            _ => None,
        }
    }
}

/// Where conversion outputs go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path")]
pub enum OutputTarget {
    /// A single output file; only valid with one selected input
    File(PathBuf),
    /// One output per input, named after the input
    Directory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Spreadsheet,
    Document,
    Merge,
}

impl Action {
    /// User-facing message for a failed batch.
    ///
    /// Validation errors are already phrased for the user and pass through
    /// unprefixed.
    pub fn failure_message(&self, err: &ConvertError) -> String {
        if let ConvertError::ValidationError(message) = err {
            return message.clone();
        }

        match self {
            Action::Spreadsheet => format!("Error converting to Excel: {}", err),
            Action::Document => format!("Error converting to Word: {}", err),
            Action::Merge => format!("Error merging PDFs: {}", err),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub message: String,
    /// Files written by the command
    pub outputs: Vec<PathBuf>,
    /// Selection after the command ran
    pub selected: Vec<PathBuf>,
    pub metrics: Option<ProcessMetrics>,
}

impl Outcome {
    pub(crate) fn message(message: impl Into<String>, selected: Vec<PathBuf>) -> Self {
        Self {
            message: message.into(),
            outputs: Vec::new(),
            selected,
            metrics: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub file_count: usize,
    pub input_size_bytes: u64,
    pub output_size_bytes: u64,
    /// Pages written; only known for merges
    pub page_count: Option<u32>,
    pub processing_time_ms: u64,
}
