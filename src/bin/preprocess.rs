//! Slide deck preprocessor
//!
//! Keeps only the pages that carry a question or solution header and writes
//! them to a filtered PDF, with an optional JSON summary of what was kept.
//! Usage: preprocess <INPUT_PDF> [-o OUTPUT] [--summary-json PATH]

use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use exambank_lib::bank;
use exambank_lib::classifier::SlideClassifier;
use exambank_lib::extractor;
use exambank_lib::pdf::SourceDocument;
use exambank_lib::report;
use exambank_lib::settings::{self, Settings};
use exambank_lib::BankError;

#[derive(Parser)]
#[command(name = "preprocess")]
#[command(version, about = "Keep only question/solution slides of a deck, deduplicated by question")]
struct Args {
    /// Source PDF (raw slides)
    input_pdf: PathBuf,

    /// Filtered PDF (default: <input>_filtered.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON summary of kept/removed pages here
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Data directory whose settings.json supplies the header ranges
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Detailed logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings::default_log_filter(args.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("[Preprocess] Error: {}", e);
        std::process::exit(1);
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_filtered.{}", stem, ext.to_string_lossy()),
        None => format!("{}_filtered", stem),
    };
    input.with_file_name(name)
}

fn run(args: &Args) -> Result<(), BankError> {
    let start = Instant::now();
    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input_pdf));

    let data_dir = settings::data_dir(args.data_dir.as_deref());
    let settings = Settings::load(&data_dir)?;
    let classifier = SlideClassifier::new(settings.header)?;

    println!("[Preprocess] Parsing PDF: {:?}", args.input_pdf);
    let entries = extractor::extract_entries_from_pdf(&classifier, &args.input_pdf)?;
    println!("[Preprocess] Found {} entries (questions/solutions/challenge variants)", entries.len());

    let questions = bank::build_bank(&entries);
    println!("[Preprocess] Built question bank with {} unique questions", questions.len());

    let source = SourceDocument::open(&args.input_pdf)?;
    let summary = report::summarize(&args.input_pdf, &output, &questions, source.page_count());

    println!();
    println!("=== Summary ===");
    println!("Total pages      : {}", summary.total_pages);
    println!("Pages kept       : {}", summary.num_kept_pages);
    println!("Pages removed    : {}", summary.num_removed_pages);
    println!("Kept page numbers: {:?}", summary.kept_pages);
    println!("Removed pages    : {:?}", summary.removed_pages);

    println!();
    println!("Page usage (page -> question IDs):");
    for (page, ids) in &summary.page_usage {
        println!("  Page {}: {}", page, ids.join(", "));
    }

    if !summary.duplicates.is_empty() {
        println!();
        println!("[Preprocess] WARNING: {} pages claimed as a question by several records:", summary.duplicates.len());
        for dup in &summary.duplicates {
            println!("  Page {}: {}", dup.page, dup.ids.join(", "));
        }
    }

    if summary.kept_pages.is_empty() {
        println!();
        println!("[Preprocess] WARNING: No pages found with questions or solutions. No filtered PDF written.");
        return Ok(());
    }

    println!();
    println!("[Preprocess] Writing filtered PDF to: {:?}", output);
    let written = source.write_pages(&summary.kept_pages, &output)?;

    if let Some(json_path) = &args.summary_json {
        report::save_summary(&summary, json_path)?;
        println!("[Preprocess] Wrote summary JSON to: {:?}", json_path);
    }

    println!(
        "[Preprocess] Done: {} of {} pages in {:.1}s",
        written,
        summary.total_pages,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
