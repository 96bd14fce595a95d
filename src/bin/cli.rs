//! Exambank CLI - build the question bank and generate practice exams
//!
//! Usage: exambank-cli [OPTIONS] <COMMAND>
//!
//! Supports JSON output for scripting.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use exambank_lib::bank::{self, BankSource};
use exambank_lib::classifier::SlideClassifier;
use exambank_lib::exam::{self, ExamRequest, ExamSize, NameParts};
use exambank_lib::goals::GoalCatalog;
use exambank_lib::pdf::{self, SourceDocument};
use exambank_lib::report;
use exambank_lib::selector::{self, SelectionFilter};
use exambank_lib::settings::{self, Settings};
use exambank_lib::usage::UsageStore;
use exambank_lib::{BankError, Question};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "exambank-cli")]
#[command(version, about = "Practice exam builder for tagged slide decks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory holding settings.json, the bank cache and usage files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Detailed logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Question bank operations
    Bank {
        #[command(subcommand)]
        cmd: BankCommands,
    },
    /// List learning goals from the goals file
    Goals {
        /// Only these topics (repeat or comma separate)
        #[arg(long = "topic", value_delimiter = ',')]
        topics: Vec<u32>,
    },
    /// Show the questions matching a filter
    Select {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Sample a practice exam and write question, solution and Q&A PDFs
    Exam {
        #[command(flatten)]
        filters: FilterArgs,
        /// Number of questions
        #[arg(long, short = 'n', default_value = "10")]
        count: usize,
        /// Use every matching question (ignores --count)
        #[arg(long)]
        all: bool,
        /// Track used questions for this user across runs
        #[arg(long)]
        user: Option<String>,
        /// Allow questions this user has already seen
        #[arg(long)]
        no_avoid_used: bool,
        /// Output file stem (default: generated from the filters)
        #[arg(long)]
        name: Option<String>,
        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Used-question tracking
    Usage {
        #[command(subcommand)]
        cmd: UsageCommands,
    },
    /// Report questions whose slide appears on more than one page of a preprocess summary
    Duplicates {
        /// Summary JSON written by `preprocess --summary-json`
        summary: PathBuf,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum BankCommands {
    /// Parse the source PDF into the bank cache
    Build {
        /// Re-parse even if the cache exists
        #[arg(long)]
        force: bool,
        /// Source PDF (default: from settings)
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Counts by topic, level and missing halves
    Stats,
}

#[derive(Subcommand)]
enum UsageCommands {
    /// Show the question IDs a user has been given
    Show {
        #[arg(long)]
        user: String,
    },
    /// Forget a user's history
    Reset {
        #[arg(long)]
        user: String,
    },
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Exam preset from settings, e.g. "Exam 3" (overrides --topics)
    #[arg(long)]
    preset: Option<String>,
    /// Topics to include (comma separated)
    #[arg(long, value_delimiter = ',')]
    topics: Vec<u32>,
    /// Difficulty levels to include (challenges are exempt)
    #[arg(long, value_delimiter = ',')]
    levels: Vec<u8>,
    /// Learning-goal codes, any overlap matches
    #[arg(long = "goals", value_delimiter = ',')]
    goals: Vec<String>,
    /// Leave out challenge questions
    #[arg(long)]
    no_challenges: bool,
    /// Keep questions that have no solution slide
    #[arg(long)]
    allow_missing_solutions: bool,
}

struct Ctx {
    data_dir: PathBuf,
    settings: Settings,
    json: bool,
}

// ============================================================================
// Entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings::default_log_filter(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), BankError> {
    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "exambank-cli", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = settings::data_dir(cli.data_dir.as_deref());
    let ctx = Ctx {
        settings: Settings::load(&data_dir)?,
        data_dir,
        json: cli.json,
    };

    match cli.command {
        Commands::Bank { cmd } => handle_bank(cmd, &ctx),
        Commands::Goals { topics } => handle_goals(topics, &ctx),
        Commands::Select { filters } => handle_select(&filters, &ctx),
        Commands::Exam { filters, count, all, user, no_avoid_used, name, seed } => {
            let size = if all { ExamSize::AllMatching } else { ExamSize::Count(count) };
            handle_exam(&filters, size, user.as_deref(), !no_avoid_used, name, seed, &ctx)
        }
        Commands::Usage { cmd } => handle_usage(cmd, &ctx),
        Commands::Duplicates { summary } => handle_duplicates(summary, &ctx),
        Commands::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), BankError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BankError::Serialize { what: "output", source: e })?;
    println!("{}", text);
    Ok(())
}

/// Load the bank, parsing the source PDF on first use
fn load_bank(ctx: &Ctx) -> Result<Vec<Question>, BankError> {
    let classifier = SlideClassifier::new(ctx.settings.header.clone())?;
    let (questions, source) =
        bank::ensure_bank(&classifier, &ctx.settings.source_pdf, &ctx.settings.bank_path, false)?;

    if !ctx.json {
        match source {
            BankSource::Cache => println!("[Bank] Using existing question bank at {:?}", ctx.settings.bank_path),
            BankSource::Parsed { entries } => println!(
                "[Bank] Built question bank from {:?}: {} entries, {} questions",
                ctx.settings.source_pdf,
                entries,
                questions.len()
            ),
        }
    }
    Ok(questions)
}

/// Turn CLI filter flags into a selection filter; returns the preset label when one was used
fn build_filter(
    args: &FilterArgs,
    ctx: &Ctx,
    bank: &[Question],
) -> Result<(SelectionFilter, Option<String>), BankError> {
    let mut preset_label = None;
    let topics = if let Some(name) = &args.preset {
        let preset = exam::find_preset(&ctx.settings.exam_presets, name)?;
        preset_label = Some(exam::preset_label(preset));
        Some(exam::preset_topics(preset, bank))
    } else if args.topics.is_empty() {
        None
    } else {
        Some(args.topics.iter().copied().collect::<BTreeSet<u32>>())
    };

    let learning_goals = if args.goals.is_empty() {
        None
    } else {
        let goals: BTreeSet<String> = args.goals.iter().map(|g| g.trim().to_string()).collect();
        warn_unknown_goals(ctx, &goals, topics.as_ref())?;
        Some(goals)
    };

    let filter = SelectionFilter {
        topics,
        levels: (!args.levels.is_empty()).then(|| args.levels.iter().copied().collect()),
        learning_goals,
        include_challenges: !args.no_challenges,
        require_question_page: true,
        require_solution_page: ctx.settings.require_solution_page && !args.allow_missing_solutions,
    };
    Ok((filter, preset_label))
}

fn warn_unknown_goals(
    ctx: &Ctx,
    goals: &BTreeSet<String>,
    topics: Option<&BTreeSet<u32>>,
) -> Result<(), BankError> {
    let catalog = GoalCatalog::load_if_present(&ctx.settings.goals_path)?;
    if catalog.is_empty() {
        return Ok(());
    }
    let unknown = catalog.unknown_codes(goals, topics);
    if !unknown.is_empty() {
        eprintln!("[Goals] WARNING: unknown learning goal codes: {}", unknown.join(", "));
    }
    Ok(())
}

fn describe(q: &Question) -> String {
    let level = q.level.map(|l| format!("L{}", l)).unwrap_or_else(|| "--".to_string());
    let goals = q
        .learning_goals
        .as_ref()
        .filter(|g| !g.is_empty())
        .map(|g| format!("LG {}", g.join(",")))
        .unwrap_or_default();
    let page = |p: Option<u32>| p.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
    format!(
        "{:<14} {:<3} q:p{:<5} s:p{:<5} {}",
        q.label(),
        level,
        page(q.question_page),
        page(q.solution_page),
        goals
    )
}

// ============================================================================
// Handlers
// ============================================================================

fn handle_bank(cmd: BankCommands, ctx: &Ctx) -> Result<(), BankError> {
    match cmd {
        BankCommands::Build { force, source } => {
            let classifier = SlideClassifier::new(ctx.settings.header.clone())?;
            let source = source.unwrap_or_else(|| ctx.settings.source_pdf.clone());
            let (questions, origin) =
                bank::ensure_bank(&classifier, &source, &ctx.settings.bank_path, force)?;

            if ctx.json {
                return print_json(&bank::bank_stats(&questions));
            }
            match origin {
                BankSource::Cache => {
                    println!("[Bank] Cache already present at {:?} ({} questions)", ctx.settings.bank_path, questions.len());
                    println!("[Bank] Use --force to re-parse {:?}", source);
                }
                BankSource::Parsed { entries } => {
                    println!("[Bank] Parsed {} question/solution/challenge slides", entries);
                    println!("[Bank] Built question bank with {} unique questions", questions.len());
                    println!("[Bank] Saved to {:?}", ctx.settings.bank_path);
                }
            }
            Ok(())
        }
        BankCommands::Stats => {
            let questions = load_bank(ctx)?;
            let stats = bank::bank_stats(&questions);
            if ctx.json {
                return print_json(&stats);
            }
            println!("Total questions: {}", stats.total);
            println!("Challenges:      {}", stats.challenges);
            println!("Missing question slide: {}", stats.missing_question_page);
            println!("Missing solution slide: {}", stats.missing_solution_page);
            println!("\nBy topic:");
            for (topic, count) in &stats.by_topic {
                println!("  T{:<3} {}", topic, count);
            }
            println!("\nBy level:");
            for (level, count) in &stats.by_level {
                println!("  L{}   {}", level, count);
            }
            Ok(())
        }
    }
}

fn handle_goals(topics: Vec<u32>, ctx: &Ctx) -> Result<(), BankError> {
    let catalog = GoalCatalog::load(&ctx.settings.goals_path)?;
    let topics: BTreeSet<u32> = topics.into_iter().collect();
    let labels = catalog.labels((!topics.is_empty()).then_some(&topics));

    if ctx.json {
        return print_json(&labels);
    }
    let mut current = None;
    for label in &labels {
        if current != Some(label.topic) {
            current = Some(label.topic);
            println!("\nT{}: {}", label.topic, catalog.title(label.topic).unwrap_or(""));
        }
        println!("  LG {}: {}", label.code, label.text);
    }
    Ok(())
}

fn handle_select(filters: &FilterArgs, ctx: &Ctx) -> Result<(), BankError> {
    let questions = load_bank(ctx)?;
    let (filter, _) = build_filter(filters, ctx, &questions)?;
    let selected = selector::select(&questions, &filter);

    if ctx.json {
        return print_json(&selected);
    }
    if selected.is_empty() {
        println!("No questions match these filters.");
        return Ok(());
    }
    for q in &selected {
        println!("{}", describe(q));
    }
    println!("\n{} questions match", selected.len());
    Ok(())
}

#[derive(serde::Serialize)]
struct ExamReport<'a> {
    matched: usize,
    unused_matched: usize,
    requested: usize,
    shortfall: usize,
    selected: Vec<String>,
    documents: Option<&'a pdf::ExamDocuments>,
}

fn handle_exam(
    filters: &FilterArgs,
    size: ExamSize,
    user: Option<&str>,
    avoid_used: bool,
    name: Option<String>,
    seed: Option<u64>,
    ctx: &Ctx,
) -> Result<(), BankError> {
    let questions = load_bank(ctx)?;
    let (filter, preset_label) = build_filter(filters, ctx, &questions)?;

    // Without --user every run is its own session
    let store = UsageStore::new(&ctx.data_dir);
    let used = match user {
        Some(user) => store.load(user)?.ids,
        None => BTreeSet::new(),
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let request = ExamRequest { filter: filter.clone(), size, avoid_used };
    let plan = exam::plan_exam(&questions, &request, &used, &mut rng);

    if !ctx.json {
        println!("[Exam] Questions matching filters: {}", plan.matched);
        println!("[Exam] Unused questions matching filters: {}", plan.unused_matched);
    }

    if plan.selected.is_empty() {
        if ctx.json {
            return print_json(&ExamReport {
                matched: plan.matched,
                unused_matched: plan.unused_matched,
                requested: plan.requested,
                shortfall: plan.shortfall,
                selected: Vec::new(),
                documents: None,
            });
        }
        if plan.matched == 0 {
            println!("[Exam] No questions match these filters.");
        } else {
            println!("[Exam] No available questions left (given filters and usage history).");
        }
        return Ok(());
    }

    if plan.shortfall > 0 && !ctx.json {
        println!(
            "[Exam] WARNING: only {} questions available; the exam will have {} questions.",
            plan.selected.len(),
            plan.selected.len()
        );
    }

    let base_name = name.unwrap_or_else(|| {
        let parts = NameParts {
            user,
            preset_label: preset_label.as_deref(),
            topics: filter.topics.as_ref(),
            levels: filter.levels.as_ref(),
            learning_goals: filter.learning_goals.as_ref(),
        };
        exam::suggested_name(&parts, size)
    });

    let source = SourceDocument::open(&ctx.settings.source_pdf)?;
    let documents = pdf::build_exam_pdfs(&source, &plan.selected, &ctx.settings.output_dir, &base_name)?;

    if let Some(user) = user {
        store.save(user, &plan.used)?;
    }

    if ctx.json {
        return print_json(&ExamReport {
            matched: plan.matched,
            unused_matched: plan.unused_matched,
            requested: plan.requested,
            shortfall: plan.shortfall,
            selected: plan.selected.iter().map(|q| q.id()).collect(),
            documents: Some(&documents),
        });
    }

    println!("[Exam] Selected {} questions:", plan.selected.len());
    for q in &plan.selected {
        println!("  {}", describe(q));
    }
    println!();
    println!("[Exam] Questions PDF: {:?}", documents.questions);
    println!("[Exam] Solutions PDF: {:?}", documents.solutions);
    println!("[Exam] Q&A PDF:       {:?}", documents.interleaved);
    Ok(())
}

fn handle_usage(cmd: UsageCommands, ctx: &Ctx) -> Result<(), BankError> {
    let store = UsageStore::new(&ctx.data_dir);
    match cmd {
        UsageCommands::Show { user } => {
            let used = store.load(&user)?;
            if ctx.json {
                return print_json(&used);
            }
            println!("{} questions used by {}", used.ids.len(), user);
            for id in &used.ids {
                println!("  {}", id);
            }
            Ok(())
        }
        UsageCommands::Reset { user } => {
            if store.reset(&user)? {
                println!("Cleared usage history for {}", user);
            } else {
                println!("No usage history for {}", user);
            }
            Ok(())
        }
    }
}

fn handle_duplicates(summary_path: PathBuf, ctx: &Ctx) -> Result<(), BankError> {
    let summary = report::load_summary(&summary_path)?;
    let analysis = report::analyze_summary(&summary);

    if ctx.json {
        return print_json(&analysis);
    }

    let file_name = summary_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    println!("Summary file: {}", file_name);
    println!("Total unique question IDs (T*-Q*-C*): {}", analysis.all_ids.len());
    println!("Question IDs with duplicates (Q appears on >1 page): {}", analysis.duplicates.len());

    if analysis.duplicates.is_empty() {
        println!("\nNo duplicate question IDs found");
        return Ok(());
    }

    println!("\n=== Duplicated Question IDs ===");
    for id in &analysis.duplicates {
        let pages = |map: &std::collections::BTreeMap<String, BTreeSet<u32>>| {
            map.get(id)
                .map(|p| p.iter().map(u32::to_string).collect::<Vec<_>>().join(", "))
                .unwrap_or_default()
        };
        println!("\n- {}", id);
        println!("  Question pages : [{}]", pages(&analysis.question_pages));
        let solution_pages = pages(&analysis.solution_pages);
        if !solution_pages.is_empty() {
            println!("  Solution pages : [{}]", solution_pages);
        }
    }
    Ok(())
}
