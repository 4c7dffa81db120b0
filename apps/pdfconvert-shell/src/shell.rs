//! Line parsing for the interactive shell
//!
//! Each input line is split into words (double or single quotes group
//! words containing spaces) and parsed with clap into a [`ShellCommand`].

use clap::{Parser, Subcommand};
use pdfconvert_core::{Command, OutputTarget};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Select PDF files
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Drop a file from the selection
    #[command(alias = "rm")]
    Remove { path: PathBuf },
    /// Show the selected files
    #[command(alias = "ls")]
    List,
    /// Drop every selected file
    Clear,
    /// Extract tables to .xlsx (a file for one input, else a directory)
    Excel { target: Option<PathBuf> },
    /// Convert to .docx (a file for one input, else a directory)
    Word { target: Option<PathBuf> },
    /// Merge the selected PDFs into one file
    Merge { output: PathBuf },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// What the shell should do with a parsed line
#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Command),
    Quit,
    /// Help text or a usage error, already rendered
    Message(String),
    Empty,
}

/// Split a line into words, honouring quotes
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("Unterminated {} quote", q));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parse one input line into a session command
pub fn parse_line(line: &str, default_dir: &Path) -> Parsed {
    let words = match tokenize(line) {
        Ok(words) => words,
        Err(e) => return Parsed::Message(e),
    };
    if words.is_empty() {
        return Parsed::Empty;
    }

    match ShellLine::try_parse_from(words) {
        Ok(parsed) => to_parsed(parsed.command, default_dir),
        Err(e) => Parsed::Message(e.render().to_string()),
    }
}

fn to_parsed(command: ShellCommand, default_dir: &Path) -> Parsed {
    let command = match command {
        ShellCommand::Add { paths } => Command::AddFiles { paths },
        ShellCommand::Remove { path } => Command::Remove { path },
        ShellCommand::List => Command::List,
        ShellCommand::Clear => Command::Clear,
        ShellCommand::Excel { target } => Command::ToSpreadsheet {
            target: resolve_target(target, default_dir),
        },
        ShellCommand::Word { target } => Command::ToDocument {
            target: resolve_target(target, default_dir),
        },
        ShellCommand::Merge { output } => Command::Merge { output },
        ShellCommand::Quit => return Parsed::Quit,
    };
    Parsed::Run(command)
}

/// An existing directory or no argument means one output per input
pub fn resolve_target(target: Option<PathBuf>, default_dir: &Path) -> OutputTarget {
    match target {
        Some(path) if path.is_dir() => OutputTarget::Directory(path),
        Some(path) => OutputTarget::File(path),
        None => OutputTarget::Directory(default_dir.to_path_buf()),
    }
}
