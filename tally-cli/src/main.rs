use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tally_core::{Account, InstitutionCode, Statement};
use tally_finance::{MemoryStore, StatementProcessor, StatementStore, StatementSummary, Upload};
use tally_ingest::StatementExtractionPipeline;
use tracing_subscriber::EnvFilter;

mod config;
mod output;
mod state;

use output::{ExtractReport, ProcessRow};

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Read credit card and bank statement PDFs into transactions"
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract one statement PDF and print what was found
    Extract {
        pdf: PathBuf,

        /// Existing account (JSON) to update with the statement's metadata
        #[arg(long)]
        account_json: Option<PathBuf>,

        /// Print statement, account and transactions as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Write transactions as CSV (`-` for stdout)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the institution code for a PDF or an extracted text file
    Classify { path: PathBuf },

    /// Run extraction over already-extracted text
    ParseText {
        path: PathBuf,

        /// Skip classification and use this extractor (e.g. CHASE, BANK_OF_AMERICA)
        #[arg(long)]
        institution: Option<InstitutionCode>,

        #[arg(long, conflicts_with = "csv")]
        json: bool,

        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Process several statements concurrently and print a status table
    Process {
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Extract {
            pdf,
            account_json,
            json,
            csv,
        } => extract(&pdf, account_json.as_deref(), json, csv.as_deref())?,

        Command::Classify { path } => {
            let pipeline = pipeline()?;
            let text = read_text(&pipeline, &path)?;
            println!("{}", pipeline.classify(&text));
        }

        Command::ParseText {
            path,
            institution,
            json,
            csv,
        } => {
            let pipeline = pipeline()?;
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let mut statement = Statement::new(file_name(&path));
            let outcome = match institution {
                Some(code) => pipeline.extract(&text, code, &mut statement, None),
                None => pipeline.run_text(&text, &mut statement, None),
            };
            let report = ExtractReport {
                statement: &statement,
                account: None,
                outcome: &outcome,
            };
            emit(&report, json, csv.as_deref())?;
        }

        Command::Process { pdfs, json } => process(pdfs, json).await?,

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn pipeline() -> Result<StatementExtractionPipeline> {
    let cfg = config::load_config()?;
    Ok(StatementExtractionPipeline::new(cfg.extraction))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn read_text(pipeline: &StatementExtractionPipeline, path: &Path) -> Result<String> {
    if is_pdf(path) {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let extracted = pipeline
            .extract_text(&bytes)
            .with_context(|| format!("extract text from {}", path.display()))?;
        Ok(extracted.text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
    }
}

fn emit(report: &ExtractReport<'_>, json: bool, csv: Option<&Path>) -> Result<()> {
    if let Some(target) = csv {
        output::write_csv(target, &report.outcome.transactions)?;
        if target == Path::new("-") {
            return Ok(());
        }
    }
    if json {
        output::print_json(report)
    } else {
        output::print_extract_report(report)
    }
}

fn extract(pdf: &Path, account_json: Option<&Path>, json: bool, csv: Option<&Path>) -> Result<()> {
    if !is_pdf(pdf) {
        bail!("{} is not a PDF (use `tally parse-text` for text files)", pdf.display());
    }
    let pipeline = pipeline()?;
    let bytes = std::fs::read(pdf).with_context(|| format!("read {}", pdf.display()))?;

    let mut account = match account_json {
        Some(p) => {
            let s = std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
            let a: Account =
                serde_json::from_str(&s).with_context(|| format!("parse account {}", p.display()))?;
            Some(a)
        }
        None => None,
    };

    let mut statement = Statement::new(file_name(pdf));
    statement.file_path = Some(pdf.display().to_string());
    statement.account_id = account.as_ref().map(|a| a.id);

    let outcome = pipeline
        .run(&bytes, &mut statement, account.as_mut())
        .with_context(|| format!("extract {}", pdf.display()))?;

    let report = ExtractReport {
        statement: &statement,
        account: account.as_ref(),
        outcome: &outcome,
    };
    emit(&report, json, csv)
}

async fn process(pdfs: Vec<PathBuf>, json: bool) -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let processor = StatementProcessor::new(Arc::clone(&store), pipeline()?);

    tracing::info!(count = pdfs.len(), "processing statements");
    let mut pending = Vec::with_capacity(pdfs.len());
    for path in &pdfs {
        let document = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let submitted = processor
            .submit(Upload {
                file_name: file_name(path),
                file_path: Some(path.display().to_string()),
                document,
                account_id: None,
            })
            .await
            .with_context(|| format!("submit {}", path.display()))?;
        pending.push((file_name(path), submitted.task));
    }

    let mut rows = Vec::with_capacity(pending.len());
    for (file, task) in pending {
        let statement = task
            .await
            .with_context(|| format!("processing task for {file}"))?
            .with_context(|| format!("process {file}"))?;
        let account = match statement.account_id {
            Some(id) => store.account(id)?.map(|a| a.name),
            None => None,
        };
        let transactions = store.transactions(statement.id)?;
        let summary = StatementSummary::build(&statement, &transactions);
        rows.push(ProcessRow {
            file,
            statement,
            account,
            summary,
        });
    }

    if json {
        output::print_json(&rows)
    } else {
        output::print_process_table(&rows)
    }
}
