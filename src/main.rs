use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use midnight_ai::ai::{parse_edit_candidates, ChatCommand, ChatError};
use midnight_ai::config::{self, AppConfig};
use midnight_ai::{
    apply_candidates, commit_to_disk, confirm_and_commit, diff, generate_report, propose_edits,
    render_unified, AiError, ChatSession, Diff, DiffTag, Document, EditCandidate, GeminiClient,
    Outcome, PatchResult, SectionBody, Ui, NO_NEWLINE_MARKER,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Unchanged lines shown around each change in previews.
const DIFF_CONTEXT: usize = 3;

#[derive(Parser)]
#[command(name = "midnight-ai")]
#[command(about = "AI-assisted review and fixing of Midnight smart contracts", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults: ./midnight-ai.toml, ~/.midnight-ai.toml)
    #[arg(short, long, global = true, env = "MIDNIGHT_AI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review a contract: print an audit report, or propose and apply fixes
    Review {
        /// Source file to review
        file: PathBuf,

        /// Ask for line-level fixes and apply them after confirmation
        #[arg(long)]
        fix: bool,

        /// Apply fixes without asking
        #[arg(short, long, requires = "fix")]
        yes: bool,
    },

    /// Apply edits from a JSON file (same schema the model returns)
    Apply {
        /// Source file to patch
        file: PathBuf,

        /// JSON array of edits
        #[arg(short, long)]
        edits: PathBuf,

        /// Apply without asking
        #[arg(short, long)]
        yes: bool,

        /// Print the unified diff and exit without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Chat about contracts, optionally starting with a file as context
    Chat {
        /// File to load into the conversation
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Review { file, fix, yes } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_review(&config, &file, fix, yes)
        }
        Commands::Apply {
            file,
            edits,
            yes,
            dry_run,
        } => cmd_apply(&file, &edits, yes, dry_run),
        Commands::Chat { file } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_chat(&config, file.as_deref())
        }
    }
}

/// Structured logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let (config, source) = config::discover(explicit)?;
    if let Some(path) = source {
        println!("{}", format!("Using config {}", path.display()).dimmed());
    }
    Ok(config)
}

fn model_client(config: &AppConfig) -> Result<GeminiClient> {
    GeminiClient::from_config(&config.model).map_err(|e| {
        report_ai_error(&e);
        anyhow::anyhow!("could not configure AI model")
    })
}

fn report_ai_error(error: &AiError) {
    match error {
        AiError::ModelAccess { .. } => eprintln!("{}", "AI Model Access Error:".red().bold()),
        _ => eprintln!("{}", format!("Error contacting AI model: {error}").red().bold()),
    }
    if let Some(steps) = error.guidance() {
        for (idx, step) in steps.iter().enumerate() {
            eprintln!("{}. {}", idx + 1, step);
        }
    }
    if let AiError::ModelAccess { message, .. } = error {
        eprintln!("{}", format!("Details: {message}").dimmed());
    }
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).map_err(|e| {
        eprintln!(
            "{}",
            format!("Error: File not found at '{}'.", file.display())
                .red()
                .bold()
        );
        anyhow::Error::new(e).context(format!("failed to read {}", file.display()))
    })
}

fn cmd_review(config: &AppConfig, file: &Path, fix: bool, yes: bool) -> Result<()> {
    println!("{}", format!("Analyzing {}...", file.display()).blue());
    let code = read_source(file)?;
    let model = model_client(config)?;
    let language = &config.review.language;

    if fix {
        let candidates = match propose_edits(&model, &code, language) {
            Ok(candidates) => candidates,
            Err(e) => {
                if let AiError::InvalidResponse { .. } = e {
                    eprintln!(
                        "{}",
                        "Error: Could not parse JSON from AI response.".red().bold()
                    );
                }
                report_ai_error(&e);
                std::process::exit(1);
            }
        };
        return run_patch(file, &candidates, yes, false);
    }

    let report = generate_report(&model, &code, &config.review.sections, language, |n, name| {
        println!("{}", format!("Generating {n}. {name}...").dimmed());
    });
    print_report(&report);
    Ok(())
}

fn cmd_apply(file: &Path, edits: &Path, yes: bool, dry_run: bool) -> Result<()> {
    let raw = fs::read_to_string(edits)
        .with_context(|| format!("failed to read edits from {}", edits.display()))?;
    let candidates = parse_edit_candidates(&raw)
        .with_context(|| format!("invalid edits file {}", edits.display()))?;
    run_patch(file, &candidates, yes, dry_run)
}

/// Normalize, apply, preview and (after confirmation) commit.
fn run_patch(file: &Path, candidates: &[EditCandidate], yes: bool, dry_run: bool) -> Result<()> {
    let original = Document::load(file)?;
    if candidates.is_empty() {
        println!("{}", "✅ No issues found or no fixes suggested.".green());
        return Ok(());
    }

    let result = apply_candidates(&original, candidates);
    print_rejections(&result);

    if dry_run {
        let preview = diff(&original, &result.document);
        print!(
            "{}",
            render_unified(&preview, &file.display().to_string(), DIFF_CONTEXT)
        );
        print_summary(&result);
        return Ok(());
    }

    let mut ui = TerminalUi::new(yes);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk)?;

    match outcome {
        Outcome::Committed { applied, .. } => {
            println!("{}", "✅ Fixes applied successfully!".green());
            for edit in &applied {
                if let Some(rationale) = &edit.rationale {
                    println!(
                        "  {} lines {}-{}: {}",
                        "✓".green(),
                        edit.start_line,
                        edit.end_line,
                        rationale
                    );
                }
            }
        }
        Outcome::Aborted => {
            println!("{}", "Aborted. No changes were made.".dimmed());
        }
        Outcome::NoChanges { .. } => {
            println!("{}", "No applicable changes.".yellow());
        }
    }
    print_summary(&result);
    Ok(())
}

fn print_rejections(result: &PatchResult) {
    if result.rejected.is_empty() {
        return;
    }
    eprintln!(
        "{}",
        format!("{} proposed edit(s) rejected:", result.rejected.len()).yellow()
    );
    for rejection in &result.rejected {
        eprintln!("  {} {}", "✗".red(), rejection);
        if let Some(explanation) = &rejection.explanation {
            eprintln!("    {}", explanation.dimmed());
        }
    }
}

fn print_summary(result: &PatchResult) {
    println!("{}", "Summary:".bold());
    println!("  {} applicable", format!("{}", result.applied.len()).green());
    println!("  {} rejected", format!("{}", result.rejected.len()).red());
}

/// Terminal implementation of the gate's UI collaborator.
struct TerminalUi {
    assume_yes: bool,
}

impl TerminalUi {
    fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Ui for TerminalUi {
    fn render(&mut self, diff: &Diff) {
        println!("\n{}", "--- Proposed Changes ---".yellow().bold());
        for hunk in diff.hunks(DIFF_CONTEXT) {
            println!("{}", hunk.header().cyan());
            for line in &hunk.lines {
                let text = format!("{}{}", line.tag.sign(), line.line.text);
                match line.tag {
                    DiffTag::Added => println!("{}", text.green()),
                    DiffTag::Removed => println!("{}", text.red()),
                    DiffTag::Context => println!("{}", text.normal()),
                }
                if !line.line.is_terminated() {
                    println!("{}", NO_NEWLINE_MARKER.dimmed());
                }
            }
        }
        let stats = diff.stats();
        println!(
            "{} {} {}",
            "--- End of Changes".yellow().bold(),
            format!("+{}", stats.added).green(),
            format!("-{}", stats.removed).red()
        );
        println!();
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        if self.assume_yes {
            println!("{prompt} {}", "yes".bold());
            return Ok(true);
        }

        let stdin = io::stdin();
        let mut input = stdin.lock();
        loop {
            print!("{prompt} [y/n]: ");
            io::stdout().flush()?;

            let mut answer = String::new();
            if input.read_line(&mut answer)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before an answer was given",
                ));
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("{}", "Please enter y or n.".yellow()),
            }
        }
    }
}

fn print_report(report: &midnight_ai::AuditReport) {
    let title = report.title();
    let rule = "═".repeat(title.chars().count() + 4);
    println!("\n{}", rule.blue());
    println!("{}", format!("  {title}  ").bold());
    println!("{}", rule.blue());
    println!("{}\n", report.description());

    println!("{}", "Code Snippet".bold().underline());
    println!("```{}\n{}\n```\n", report.language, report.code.trim_end());

    println!("{}\n", "Audit Findings".bold().underline());
    for section in &report.sections {
        println!("{}", format!("{}. {}", section.number, section.name).bold());
        match &section.body {
            SectionBody::Findings(text) => println!("{}", text.trim_end()),
            SectionBody::NoFindings => println!("{}", "No findings for this section.".dimmed()),
            SectionBody::Failed(reason) => println!(
                "{}",
                format!("Error getting '{}': {reason}", section.name).red()
            ),
        }
        println!();
    }
}

fn cmd_chat(config: &AppConfig, file: Option<&Path>) -> Result<()> {
    let model = model_client(config)?;
    println!(
        "{}",
        "Starting interactive chat... (Type 'exit' to quit)".green()
    );

    let context = file.and_then(|path| match fs::read_to_string(path) {
        Ok(content) => {
            println!("{}", format!("Chatting about {}...", path.display()).blue());
            Some((path.display().to_string(), content))
        }
        Err(e) => {
            eprintln!(
                "{}",
                format!(
                    "Error reading '{}': {e}. Starting a general chat session.",
                    path.display()
                )
                .red()
                .bold()
            );
            None
        }
    });

    let mut session = ChatSession::new(&model);
    if let Err(e) = session.start(context.as_ref().map(|(p, c)| (p.as_str(), c.as_str()))) {
        report_ai_error(&e);
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        print!("{}", "You: ".cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        match ChatCommand::parse(&line) {
            ChatCommand::Exit => break,
            ChatCommand::Empty => continue,
            ChatCommand::LoadFile(path) => match session.load_file(&path) {
                Ok(reply) => {
                    println!("{}", format!("Loaded {path} into the conversation.").blue());
                    println!("{} {}", "AI:".yellow().bold(), reply.trim_end());
                }
                Err(ChatError::File { path, source }) => {
                    eprintln!("{}", format!("Error reading '{path}': {source}.").red().bold());
                }
                Err(ChatError::Ai(e)) => {
                    report_ai_error(&e);
                    break;
                }
            },
            ChatCommand::Message(text) => match session.send(&text) {
                Ok(reply) => println!("{} {}", "AI:".yellow().bold(), reply.trim_end()),
                Err(e) => {
                    report_ai_error(&e);
                    break;
                }
            },
        }
    }

    println!("\n{}", "Chat session ended.".yellow());
    Ok(())
}
