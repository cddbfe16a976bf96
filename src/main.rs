mod db;
mod error;
mod export;
mod parser;
mod settings;
mod source;
mod terms;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::export::Format;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "spec_organizer",
    about = "Turn test-specification documents into test-item tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract test items from a .pdf or a form-feed separated .txt dump
    Extract {
        input: PathBuf,
        /// Output file (default: <output_dir>/<name>_<timestamp>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
        /// Leading pages to ignore (overrides SPEC_SKIP_PAGES)
        #[arg(long)]
        skip_pages: Option<u32>,
        /// Do not record this run in the history database
        #[arg(long)]
        no_history: bool,
    },
    /// List recent extraction runs
    Runs {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Re-export the records of a stored run
    Export {
        run_id: i64,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
    },
    /// Manage the term-mapping master data
    Terms {
        #[command(subcommand)]
        action: TermsAction,
    },
}

#[derive(Subcommand)]
enum TermsAction {
    /// Show every standard term with its variants
    List,
    /// Map a variant spelling onto a standard term
    Add { standard: String, variant: String },
    /// Remove a variant from a standard term
    Remove { standard: String, variant: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(settings = ?settings, "settings loaded");

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            format,
            skip_pages,
            no_history,
        } => run_extract(&settings, &input, output, format, skip_pages, no_history),
        Commands::Runs { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let runs = db::fetch_runs(&conn, limit)?;
            if runs.is_empty() {
                println!("No extraction runs yet. Run 'extract' first.");
                return Ok(());
            }
            println!(
                "{:>4} | {:<19} | {:>5} | {:>5} | {:>7} | {}",
                "ID", "Created", "Pages", "Items", "Orphans", "Source"
            );
            println!("{}", "-".repeat(72));
            for r in &runs {
                println!(
                    "{:>4} | {:<19} | {:>5} | {:>5} | {:>7} | {}",
                    r.id, r.created_at, r.pages_total, r.record_count, r.orphans, r.source_path
                );
            }
            Ok(())
        }
        Commands::Export {
            run_id,
            output,
            format,
        } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            if !db::run_exists(&conn, run_id)? {
                bail!("No extraction run with id {}", run_id);
            }
            let records = db::fetch_records(&conn, run_id)?;
            let path = output.unwrap_or_else(|| {
                let name = PathBuf::from(format!("run{}", run_id));
                export::default_output_path(&settings.output_dir, &name, format)
            });
            export::export_to(&path, &records, format)?;
            println!("Wrote {} items to {}", records.len(), path.display());
            Ok(())
        }
        Commands::Terms { action } => run_terms(&settings, action),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn run_extract(
    settings: &Settings,
    input: &Path,
    output: Option<PathBuf>,
    format: Format,
    skip_pages: Option<u32>,
    no_history: bool,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let mut opts = settings.scan_options();
    if let Some(n) = skip_pages {
        opts.skip_pages = n;
    }

    let source = source::open_document(input).context("Extraction failed")?;

    let pb = ProgressBar::new(u64::from(source.page_count()));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] page {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );
    let extraction = parser::extract_records(&*source, &opts, |_| pb.inc(1));
    pb.finish_and_clear();

    extraction.stats.print();

    let path = output
        .unwrap_or_else(|| export::default_output_path(&settings.output_dir, input, format));
    export::export_to(&path, &extraction.records, format)?;
    println!(
        "Wrote {} items to {}",
        extraction.records.len(),
        path.display()
    );

    if !no_history {
        let conn = db::connect(&settings.db_path)?;
        db::init_schema(&conn)?;
        let run_id = db::save_run(
            &conn,
            &input.display().to_string(),
            &extraction.stats,
            &extraction.records,
        )?;
        println!("Saved as run {}.", run_id);
    }
    Ok(())
}

fn run_terms(settings: &Settings, action: TermsAction) -> anyhow::Result<()> {
    let mut store = terms::TermStore::load_or_init(&settings.terms_path)?;
    match action {
        TermsAction::List => {
            let mut any = false;
            for (standard, variants) in store.iter() {
                any = true;
                println!("{}", standard);
                for v in variants {
                    println!("  - {}", v);
                }
            }
            if !any {
                println!("No term mappings in {}.", store.path().display());
            }
        }
        TermsAction::Add { standard, variant } => {
            let (standard, variant) = (standard.trim(), variant.trim());
            if standard.is_empty() || variant.is_empty() {
                bail!("Both the standard term and the variant are required");
            }
            store.add(standard, variant)?;
            let count = store.variants(standard).map_or(0, <[String]>::len);
            println!("Added mapping {} - {} ({} variants)", standard, variant, count);
        }
        TermsAction::Remove { standard, variant } => {
            if store.remove(&standard, &variant)? {
                println!("Removed mapping {} - {}", standard, variant);
            } else {
                println!("No mapping {} - {} to remove.", standard, variant);
            }
        }
    }
    Ok(())
}
