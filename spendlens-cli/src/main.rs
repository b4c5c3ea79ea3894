use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use spendlens_core::{CategoryBudget, NormalizedTransaction, StatementSource, VerificationStatus};
use spendlens_finance::{
    BudgetMonitor, ClassificationWorkflow, GeminiOracle, InsightsEngine, JobBoard, JobStatus, LogNotifier,
    MemoryStore, ProfileStore, RunOutcome, TransactionStore,
};
use spendlens_ingest::{ingest_document, load_document, IngestReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod state;

#[derive(Parser, Debug)]
#[command(name = "spendlens", version, about = "Statement ingestion and spend classification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse statement files (text, JSON document, or CSV grid) into the ledger
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Statement kind recorded on every row
        #[arg(long, value_enum)]
        source: Option<SourceArg>,

        #[arg(long)]
        owner: Option<String>,
    },

    /// Classify one batch of unverified transactions
    Classify {
        /// Restrict to one owner (default: everyone)
        #[arg(long)]
        owner: Option<String>,

        /// Address for budget alerts; without it no alert is sent
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        threshold: Option<f64>,

        /// Run through the job board and poll until it finishes
        #[arg(long)]
        background: bool,
    },

    /// Aggregate verified spend and generate the narrative report
    Insights {
        #[arg(long)]
        owner: String,
    },

    /// List transactions waiting for human review
    Flagged {
        #[arg(long)]
        owner: Option<String>,
    },

    /// Category budgets
    Budget {
        #[command(subcommand)]
        command: BudgetCommand,
    },

    /// Owner demographics used by reports and alerts
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    /// Create or update a monthly ceiling (0 disables alerts)
    Set {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        max: f64,

        /// Check this month's spend against the new ceiling and alert this address
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    Set {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        income: Option<f64>,
        #[arg(long)]
        country: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.spendlens/config.toml with defaults
    Init,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Upi,
    Bank,
    CreditCard,
}

impl From<SourceArg> for StatementSource {
    fn from(s: SourceArg) -> Self {
        match s {
            SourceArg::Upi => StatementSource::Upi,
            SourceArg::Bank => StatementSource::Bank,
            SourceArg::CreditCard => StatementSource::CreditCard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest { files, source, owner } => {
            ingest(&files, source.map(Into::into), owner.as_deref()).await?;
        }

        Command::Classify {
            owner,
            email,
            batch_size,
            threshold,
            background,
        } => {
            classify(owner, email, batch_size, threshold, background).await?;
        }

        Command::Insights { owner } => {
            insights(&owner).await?;
        }

        Command::Flagged { owner } => {
            let store = state::open_store()?;
            let rows = store
                .fetch_by_status(owner.as_deref(), &[VerificationStatus::RequiredHumanVerification], None)
                .await?;
            println!("{} transaction(s) awaiting review\n", rows.len());
            for t in &rows {
                println!(
                    "#{:<5} {} | {:>10.2} {} | {} | {} [{}]",
                    t.id.unwrap_or_default(),
                    t.date.map(|d| d.to_string()).unwrap_or_else(|| "----------".into()),
                    t.amount,
                    t.direction,
                    t.details,
                    t.category.as_deref().unwrap_or("-"),
                    t.tags.join(", ")
                );
            }
        }

        Command::Budget { command } => match command {
            BudgetCommand::Set {
                owner,
                category,
                max,
                email,
            } => {
                set_budget(&owner, category.trim(), max, email.as_deref()).await?;
            }
        },

        Command::Profile { command } => match command {
            ProfileCommand::Set {
                owner,
                name,
                age,
                income,
                country,
            } => {
                let store = state::open_store()?;
                let mut profile = store.profile(&owner).await?.unwrap_or_default();
                if name.is_some() {
                    profile.name = name;
                }
                if let Some(age) = age {
                    profile.age = age;
                }
                if let Some(income) = income {
                    profile.yearly_income = income;
                }
                if let Some(country) = country {
                    profile.country = country;
                }
                store.set_profile(&owner, profile.clone())?;
                state::save_store(&store)?;
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}

/// Load and extract one file. An unreadable file yields no report.
fn ingest_file(path: &Path, source: Option<StatementSource>, owner: Option<&str>) -> Option<IngestReport> {
    match load_document(path) {
        Ok(doc) => Some(ingest_document(&doc, source, owner)),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %format!("{e:#}"), "could not load statement");
            None
        }
    }
}

/// Records from every readable file; a bad file never drops the others.
fn collect_records(files: &[PathBuf], source: Option<StatementSource>, owner: Option<&str>) -> Vec<NormalizedTransaction> {
    let mut records = Vec::new();
    for path in files {
        match ingest_file(path, source, owner) {
            Some(report) => {
                println!(
                    "{}: {} format, {} row(s), {} undated",
                    path.display(),
                    report.format,
                    report.tuples,
                    report.undated()
                );
                records.extend(report.records);
            }
            None => println!("{}: unreadable, 0 row(s)", path.display()),
        }
    }
    records
}

async fn ingest(files: &[PathBuf], source: Option<StatementSource>, owner: Option<&str>) -> Result<()> {
    let store = state::open_store()?;
    let records = collect_records(files, source, owner);

    let parsed = records.len();
    let inserted = store.upsert_transactions(records).await?;
    state::save_store(&store)?;
    println!("\nInserted {inserted} new transaction(s) ({} already known)", parsed - inserted);
    Ok(())
}

async fn set_budget(owner: &str, category: &str, max: f64, email: Option<&str>) -> Result<()> {
    if !max.is_finite() || max < 0.0 {
        bail!("--max must be a non-negative amount");
    }
    let store = Arc::new(state::open_store()?);
    store.set_budget(owner, CategoryBudget::new(category, max))?;
    state::save_store(&store)?;
    println!("Budget for {owner}: {category} <= {max:.2}");

    if let Some(email) = email {
        let cfg = config::load_config()?;
        let monitor = BudgetMonitor::new(
            store.clone(),
            Arc::new(GeminiOracle::new(cfg.gemini())),
            Arc::new(LogNotifier),
            cfg.workflow()?.timezone,
        );
        match monitor.check(owner, email, category, monitor.today()).await {
            Some(alert) => println!("Over budget: spent {:.2} of {:.2}\n{}", alert.spent, alert.limit, alert.message),
            None => println!("Within budget this month"),
        }
    }
    Ok(())
}

fn build_workflow(
    store: Arc<MemoryStore>,
    batch_size: Option<usize>,
    threshold: Option<f64>,
) -> Result<ClassificationWorkflow> {
    let cfg = config::load_config()?;
    let mut wf_cfg = cfg.workflow()?;
    if let Some(n) = batch_size {
        wf_cfg.batch_size = n;
    }
    if let Some(t) = threshold {
        wf_cfg.threshold = t;
    }
    if wf_cfg.batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    if !(0.0..=1.0).contains(&wf_cfg.threshold) {
        bail!("threshold must be within [0, 1]");
    }

    let oracle = GeminiOracle::new(cfg.gemini());
    if !oracle.is_configured() {
        tracing::warn!(
            env = %cfg.oracle.api_key_env,
            "no oracle API key; every result will be flagged for review"
        );
    }

    Ok(ClassificationWorkflow::new(store, Arc::new(oracle), Arc::new(LogNotifier), wf_cfg))
}

async fn classify(
    owner: Option<String>,
    email: Option<String>,
    batch_size: Option<usize>,
    threshold: Option<f64>,
    background: bool,
) -> Result<()> {
    let store = Arc::new(state::open_store()?);
    let workflow = build_workflow(store.clone(), batch_size, threshold)?;

    let outcome: RunOutcome = if background {
        let board = JobBoard::new();
        let id = board.spawn_classification(Arc::new(workflow), owner, email).await;
        println!("Job {id} queued");

        let job = board
            .wait(id, Duration::from_millis(250))
            .await
            .context("job vanished from the board")?;
        if job.status != JobStatus::Done {
            bail!("job {id} failed: {}", job.error.unwrap_or_default());
        }
        serde_json::from_value(job.result.unwrap_or_default()).context("decode job result")?
    } else {
        workflow.run(owner.as_deref(), email.as_deref()).await
    };

    state::save_store(&store)?;

    println!(
        "Path: {:?} | processed {} | flagged {} | alerts {}",
        outcome.path, outcome.processed, outcome.flagged_count, outcome.alerts
    );
    for r in &outcome.flagged {
        println!(
            "  #{:<5} {:>10.2} {} | {} -> {} ({:.2})",
            r.id, r.amount, r.direction, r.details, r.category, r.confidence
        );
    }
    Ok(())
}

async fn insights(owner: &str) -> Result<()> {
    let cfg = config::load_config()?;
    let store = Arc::new(state::open_store()?);
    let engine = InsightsEngine::new(store.clone(), Arc::new(GeminiOracle::new(cfg.gemini())));

    let report = engine.generate(owner, &[]).await;
    state::save_store(&store)?;

    println!("# Spend by category\n");
    for (name, totals) in &report.stats.categories {
        println!("- {name}: debit {:.2}, credit {:.2}", totals.debit_total, totals.credit_total);
    }
    println!(
        "\nTotal debit {:.2}, total credit {:.2}\n",
        report.stats.total_debit(),
        report.stats.total_credit()
    );
    println!("{}", report.text);
    Ok(())
}
