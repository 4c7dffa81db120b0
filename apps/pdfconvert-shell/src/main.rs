//! PDF conversion shell
//!
//! Interactive front end: select PDFs, then convert them to spreadsheets
//! or documents, or merge them into one file.

mod shell;

use anyhow::Context;
use clap::Parser;
use pdfconvert_core::{ConvertConfig, HeaderRow, Outcome, Session};
use shell::{parse_line, Parsed};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfconvert")]
#[command(version, about = "Convert PDFs to Excel or Word, or merge them")]
struct Args {
    /// Minimum cells per line for a line to count as a table row
    #[arg(long, default_value_t = pdfconvert_core::extract::DEFAULT_MIN_COLUMNS)]
    min_columns: usize,

    /// Spreadsheet header: first-row or column-index
    #[arg(long, default_value = "first-row")]
    header_row: HeaderRow,

    /// Directory for batch outputs (defaults to the Documents folder)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only use the content-stream text layout for table detection
    #[arg(long)]
    no_fallback: bool,

    /// Print command results as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

const PROMPT: &str = "pdf> ";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ConvertConfig {
        min_columns: args.min_columns,
        header_row: args.header_row,
        output_dir: args.output_dir.clone().or_else(dirs::document_dir),
        fallback: !args.no_fallback,
    };
    tracing::debug!(?config, "starting shell");
    let mut session = Session::new(config);
    let default_dir = session
        .config()
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    println!(
        "pdfconvert v{}. Type 'help' for commands.",
        env!("CARGO_PKG_VERSION")
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", PROMPT);
        stdout.flush().context("Failed to flush prompt")?;

        let line = match lines.next() {
            Some(line) => line.context("Failed to read input")?,
            None => break,
        };

        match parse_line(&line, &default_dir) {
            Parsed::Empty => {}
            Parsed::Quit => break,
            Parsed::Message(text) => println!("{}", text.trim_end()),
            Parsed::Run(command) => {
                let action = command.action();
                match session.execute(command) {
                    Ok(outcome) => print_outcome(&outcome, args.json)?,
                    Err(e) => match action {
                        Some(action) => eprintln!("{}", action.failure_message(&e)),
                        None => eprintln!("Error: {}", e),
                    },
                }
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &Outcome, json: bool) -> anyhow::Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(outcome).context("Failed to serialize result")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("{}", outcome.message);
    if outcome.metrics.is_none() {
        for (index, path) in outcome.selected.iter().enumerate() {
            println!("  {}. {}", index + 1, path.display());
        }
    }
    Ok(())
}
