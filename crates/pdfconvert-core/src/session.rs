//! Stateful conversion session
//!
//! Holds the file selection and the collaborators used by each action.
//! Every user action arrives as a [`Command`] and runs to completion before
//! `execute` returns.

use crate::command::{Command, Outcome, OutputTarget, ProcessMetrics};
use crate::config::ConvertConfig;
use crate::convert::{DocumentConverter, DocxConverter};
use crate::error::ConvertError;
use crate::extract::{extract, TableExtractor, TextTableExtractor};
use crate::merge::merge_files;
use crate::output::{ensure_extension, output_path_for};
use crate::selection::{is_pdf_path, FileSelection};
use crate::spreadsheet::{write_spreadsheet, SPREADSHEET_EXTENSION};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Input file paired with the file it converts to
type Job = (PathBuf, PathBuf);

pub struct Session {
    selection: FileSelection,
    extractor: Box<dyn TableExtractor>,
    converter: Box<dyn DocumentConverter>,
    config: ConvertConfig,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ConvertConfig::default())
    }
}

impl Session {
    pub fn new(config: ConvertConfig) -> Self {
        let mut extractor = TextTableExtractor::new(config.min_columns);
        if !config.fallback {
            extractor = extractor.without_fallback();
        }

        Self {
            selection: FileSelection::new(),
            extractor: Box::new(extractor),
            converter: Box::new(DocxConverter),
            config,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TableExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_converter(mut self, converter: Box<dyn DocumentConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn selection(&self) -> &FileSelection {
        &self.selection
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Run one command.
    ///
    /// Batch actions clear the selection on success and leave it untouched
    /// on failure.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, ConvertError> {
        match command {
            Command::AddFiles { paths } => Ok(self.add_files(paths)),
            Command::Remove { path } => {
                let message = if self.selection.remove(&path) {
                    format!("Removed {}", path.display())
                } else {
                    format!("Not selected: {}", path.display())
                };
                Ok(Outcome::message(message, self.selected()))
            }
            Command::Clear => {
                self.selection.clear();
                Ok(Outcome::message("Selection cleared", Vec::new()))
            }
            Command::List => {
                let message = match self.selection.len() {
                    0 => "No files selected".to_string(),
                    1 => "1 file selected".to_string(),
                    n => format!("{} files selected", n),
                };
                Ok(Outcome::message(message, self.selected()))
            }
            Command::ToSpreadsheet { target } => self.to_spreadsheet(&target),
            Command::ToDocument { target } => self.to_document(&target),
            Command::Merge { output } => self.merge(&output),
        }
    }

    fn add_files(&mut self, paths: Vec<PathBuf>) -> Outcome {
        let mut added = 0;
        let mut skipped = 0;

        for path in paths {
            if !is_pdf_path(&path) {
                tracing::warn!(path = %path.display(), "skipping non-PDF file");
                skipped += 1;
            } else if !path.is_file() {
                tracing::warn!(path = %path.display(), "skipping missing file");
                skipped += 1;
            } else if self.selection.add(path) {
                added += 1;
            }
        }

        let mut message = format!("Added {} file{}", added, plural(added));
        if skipped > 0 {
            message.push_str(&format!(" ({} skipped)", skipped));
        }
        Outcome::message(message, self.selected())
    }

    fn to_spreadsheet(&mut self, target: &OutputTarget) -> Result<Outcome, ConvertError> {
        let started = Instant::now();
        let jobs = self.plan_jobs(target, SPREADSHEET_EXTENSION)?;

        for (input, output) in &jobs {
            let table = extract(self.extractor.as_ref(), input)?;
            write_spreadsheet(&table, output, self.config.header_row)?;
        }

        let message = batch_message(&jobs, "Excel");
        Ok(self.finish(jobs, message, None, started))
    }

    fn to_document(&mut self, target: &OutputTarget) -> Result<Outcome, ConvertError> {
        let started = Instant::now();
        let extension = self.converter.extension().to_string();
        let jobs = self.plan_jobs(target, &extension)?;

        for (input, output) in &jobs {
            self.converter.convert(input, output)?;
        }

        let message = batch_message(&jobs, "Word");
        Ok(self.finish(jobs, message, None, started))
    }

    fn merge(&mut self, output: &Path) -> Result<Outcome, ConvertError> {
        let started = Instant::now();
        let output = ensure_extension(output, "pdf");
        let report = merge_files(self.selection.as_slice(), &output)?;

        let jobs: Vec<Job> = self
            .selection
            .iter()
            .map(|input| (input.to_path_buf(), output.clone()))
            .collect();
        let message = format!("Merged {} PDFs successfully!", jobs.len());
        Ok(self.finish(jobs, message, Some(report.page_count), started))
    }

    /// Pair each selected input with its output path
    fn plan_jobs(&self, target: &OutputTarget, extension: &str) -> Result<Vec<Job>, ConvertError> {
        if self.selection.is_empty() {
            return Err(ConvertError::ValidationError("No PDF file selected".into()));
        }

        match target {
            OutputTarget::File(path) => match self.selection.as_slice() {
                [input] => Ok(vec![(input.clone(), ensure_extension(path, extension))]),
                inputs => Err(ConvertError::ValidationError(format!(
                    "{} files selected; choose an output directory instead of a file",
                    inputs.len()
                ))),
            },
            OutputTarget::Directory(dir) => Ok(self
                .selection
                .iter()
                .map(|input| (input.to_path_buf(), output_path_for(input, dir, extension)))
                .collect()),
        }
    }

    /// Clear the selection and report a successful batch
    fn finish(
        &mut self,
        jobs: Vec<Job>,
        message: String,
        page_count: Option<u32>,
        started: Instant,
    ) -> Outcome {
        let input_size_bytes = jobs.iter().map(|(input, _)| file_size(input)).sum();
        let mut outputs: Vec<PathBuf> = Vec::new();
        for (_, output) in jobs.iter() {
            if !outputs.contains(output) {
                outputs.push(output.clone());
            }
        }
        let output_size_bytes = outputs.iter().map(|output| file_size(output)).sum();

        let metrics = ProcessMetrics {
            file_count: jobs.len(),
            input_size_bytes,
            output_size_bytes,
            page_count,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            files = metrics.file_count,
            elapsed_ms = metrics.processing_time_ms,
            "{}",
            message
        );

        self.selection.clear();
        Outcome {
            message,
            outputs,
            selected: Vec::new(),
            metrics: Some(metrics),
        }
    }

    fn selected(&self) -> Vec<PathBuf> {
        self.selection.as_slice().to_vec()
    }
}

fn batch_message(jobs: &[Job], format_name: &str) -> String {
    match jobs {
        [(_, output)] => format!("Converted and saved: {}", output.display()),
        _ => format!("Converted {} PDFs to {}!", jobs.len(), format_name),
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
