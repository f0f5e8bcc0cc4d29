//! CLI binary for edgequake-paraphrase.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ParaphraseConfig` + `StyleConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_paraphrase::{
    assess, paraphrase_with_engine, read_document, write_output, Creativity, FidelityReport,
    Formality, LlmRewriter, ParaphraseConfig, ParaphraseEngine, ProgressEvent, StyleConfig, Tone,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Colour a string by one of the risk level colour names.
fn paint(color: &str, s: &str) -> String {
    let code = match color {
        "green" => "32",
        "blue" => "34",
        "yellow" => "33",
        "orange" => "38;5;208",
        "red" => "31",
        _ => "0",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Paraphrase to stdout
  paraphrase essay.txt

  # Formal, conservative rewrite into a Word file
  paraphrase --tone formal --creativity conservative report.pdf -o report.docx

  # Heavier rewrite with a specific model
  paraphrase --intensity 5 --model openai/gpt-4.1 --provider openrouter notes.txt

  # Show how the document would be chunked (no API key needed)
  paraphrase --chunks-only book.txt

  # Score an existing paraphrase against its source (no API key needed)
  paraphrase --score-only original.txt rewritten.txt

  # Machine-readable progress (one JSON event per line)
  paraphrase --events --no-progress essay.txt > events.ndjson

STYLE:
  --tone         formal | neutral | casual
  --formality    high | medium | low
  --creativity   conservative (t=0.3) | moderate (t=0.6) | creative (t=0.9)
  --intensity    1 (minimal changes) .. 5 (complete rewrite)

FIDELITY SCORE (0 = faithful, 100 = drifted):
   0-20  Excellent   21-40  Good   41-60  Moderate   61-80  Poor   81-100  Critical

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY      OpenRouter API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openrouter, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Paraphrase PDF, DOCX and TXT documents with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "paraphrase",
    version,
    about = "Paraphrase PDF, DOCX and TXT documents with LLMs",
    long_about = "Paraphrase whole documents with a large language model. The text is split \
into overlapping chunks, each chunk is rewritten in order under the chosen style, the \
results are stitched back together and the rewrite is scored for fidelity to the source.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input document (.pdf, .docx or .txt).
    #[arg(required_unless_present = "score_only")]
    input: Option<PathBuf>,

    /// Write the result to this file instead of stdout (.txt or .docx).
    #[arg(short, long, env = "PARAPHRASE_OUTPUT")]
    output: Option<PathBuf>,

    /// Tone of the rewrite.
    #[arg(long, env = "PARAPHRASE_TONE", value_enum, default_value = "neutral")]
    tone: ToneArg,

    /// Formality of the rewrite.
    #[arg(long, env = "PARAPHRASE_FORMALITY", value_enum, default_value = "medium")]
    formality: FormalityArg,

    /// Creativity (sampling temperature) of the rewrite.
    #[arg(long, env = "PARAPHRASE_CREATIVITY", value_enum, default_value = "moderate")]
    creativity: CreativityArg,

    /// How much to change the text, 1 (minimal) to 5 (complete rewrite).
    #[arg(long, env = "PARAPHRASE_INTENSITY", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(1..=5))]
    intensity: u8,

    /// Allow the model to drop paragraph breaks, lists and headings.
    #[arg(long, env = "PARAPHRASE_NO_PRESERVE_FORMATTING")]
    no_preserve_formatting: bool,

    /// LLM model ID (default: anthropic/claude-3.5-sonnet).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openrouter, openai, anthropic, gemini, ollama.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Maximum chunk size in characters.
    #[arg(long, env = "PARAPHRASE_MAX_CHUNK_SIZE", default_value_t = 4000)]
    max_chunk_size: usize,

    /// Overlap carried into each chunk, in characters.
    #[arg(long, env = "PARAPHRASE_OVERLAP_SIZE", default_value_t = 200)]
    overlap_size: usize,

    /// Pause between chunk calls in milliseconds.
    #[arg(long, env = "PARAPHRASE_CHUNK_DELAY_MS", default_value_t = 1000)]
    chunk_delay_ms: u64,

    /// Retries per chunk on LLM failure.
    #[arg(long, env = "PARAPHRASE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "PARAPHRASE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PARAPHRASE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Output structured JSON (ParaphraseOutput) instead of plain text.
    #[arg(long, env = "PARAPHRASE_JSON")]
    json: bool,

    /// Print every progress event as one JSON line on stdout.
    #[arg(long)]
    events: bool,

    /// Disable progress bar.
    #[arg(long, env = "PARAPHRASE_NO_PROGRESS")]
    no_progress: bool,

    /// Print the chunk plan only; no LLM calls.
    #[arg(long)]
    chunks_only: bool,

    /// Score REWRITTEN against ORIGINAL and exit; no LLM calls.
    #[arg(long, num_args = 2, value_names = ["ORIGINAL", "REWRITTEN"])]
    score_only: Option<Vec<PathBuf>>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PARAPHRASE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PARAPHRASE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToneArg {
    Formal,
    Neutral,
    Casual,
}

impl From<ToneArg> for Tone {
    fn from(v: ToneArg) -> Self {
        match v {
            ToneArg::Formal => Tone::Formal,
            ToneArg::Neutral => Tone::Neutral,
            ToneArg::Casual => Tone::Casual,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormalityArg {
    High,
    Medium,
    Low,
}

impl From<FormalityArg> for Formality {
    fn from(v: FormalityArg) -> Self {
        match v {
            FormalityArg::High => Formality::High,
            FormalityArg::Medium => Formality::Medium,
            FormalityArg::Low => Formality::Low,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CreativityArg {
    Conservative,
    Moderate,
    Creative,
}

impl From<CreativityArg> for Creativity {
    fn from(v: CreativityArg) -> Self {
        match v {
            CreativityArg::Conservative => Creativity::Conservative,
            CreativityArg::Moderate => Creativity::Moderate,
            CreativityArg::Creative => Creativity::Creative,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.events;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Score-only mode ──────────────────────────────────────────────────
    if let Some(ref paths) = cli.score_only {
        let (original, rewritten) = match paths.as_slice() {
            [a, b] => (a, b),
            _ => anyhow::bail!("--score-only takes exactly two files"),
        };
        let (_, original) = read_document(original)
            .await
            .with_context(|| format!("Failed to read {}", original.display()))?;
        let (_, rewritten) = read_document(rewritten)
            .await
            .with_context(|| format!("Failed to read {}", rewritten.display()))?;

        let report = assess(&original.text, &rewritten.text);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_report(&report);
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input document is required")?;
    let config = build_config(&cli).await?;
    let style = build_style(&cli);

    let (format, document) = read_document(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    // ── Chunks-only mode ─────────────────────────────────────────────────
    if cli.chunks_only {
        let chunks = edgequake_paraphrase::TextChunker::from_config(&config).split(&document.text);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&chunks).context("Failed to serialise chunks")?
            );
        } else {
            println!("File:     {} ({})", input.display(), format);
            if let Some(pages) = document.page_count {
                println!("Pages:    {}", pages);
            }
            println!("Words:    {}", document.word_count);
            println!("Chunks:   {}", chunks.len());
            for c in &chunks {
                println!(
                    "  #{:<3} chars {:>6}..{:<6} ({} chars)",
                    c.index + 1,
                    c.start_offset,
                    c.end_offset,
                    c.text.chars().count()
                );
            }
        }
        return Ok(());
    }

    // ── Run paraphrase ───────────────────────────────────────────────────
    let rewriter = LlmRewriter::from_config(&config, &style)
        .context("Failed to initialise LLM provider")?;
    let engine = ParaphraseEngine::new(Arc::new(rewriter), &config);
    let total_chunks = engine.chunk(&document.text).len();

    let bar = if show_progress {
        Some(progress_bar(total_chunks))
    } else {
        None
    };
    let events = cli.events;

    let result = paraphrase_with_engine(&engine, &document.text, &style, |event| {
        if events {
            if let Ok(line) = event.to_json_line() {
                println!("{line}");
            }
        }
        if let Some(ref bar) = bar {
            match event {
                ProgressEvent::Progress {
                    current_chunk,
                    total_chunks,
                    ..
                } => {
                    bar.println(format!(
                        "  {} Chunk {:>3}/{:<3}",
                        green("✓"),
                        current_chunk,
                        total_chunks
                    ));
                    bar.set_position(*current_chunk as u64);
                }
                ProgressEvent::Complete { .. } => bar.finish_and_clear(),
                ProgressEvent::Error { message } => {
                    bar.println(format!("  {} {}", red("✗"), red(message)));
                    bar.finish_and_clear();
                }
            }
        }
    })
    .await
    .context("Paraphrase failed")?;

    // ── Output ───────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        write_output(output_path, &result.text)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} chunks  {}ms  →  {}",
                green("✔"),
                result.stats.total_chunks,
                result.stats.duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.events {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !result.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} words in  /  {} words out",
            dim(&result.stats.original_words.to_string()),
            dim(&result.stats.paraphrased_words.to_string()),
        );
        print_report(&result.fidelity);
    }

    Ok(())
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  \
         [{bar:42.green/238}] {pos:>3}/{len} chunks  \
         ⏱ {elapsed_precise}  ETA {eta_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(SPINNER);

    bar.set_style(style);
    bar.set_prefix("Paraphrasing");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar.println(format!(
        "{} {}",
        cyan("◆"),
        bold(&format!("Paraphrasing {total} chunks…"))
    ));
    bar
}

fn print_report(report: &FidelityReport) {
    let risk = report.risk();
    eprintln!(
        "{} Fidelity score {}  {}",
        cyan("◆"),
        bold(&report.score.to_string()),
        paint(risk.color(), risk.label()),
    );
    eprintln!("   {}", dim(risk.description()));
    eprintln!(
        "   {}",
        dim(&format!(
            "length {}  keywords {}  structure {}  overlap {}",
            report.length_deviation,
            report.keyword_preservation,
            report.structural_similarity,
            report.lexical_overlap
        ))
    );
}

/// Map CLI args to `ParaphraseConfig`.
async fn build_config(cli: &Cli) -> Result<ParaphraseConfig> {
    let mut builder = ParaphraseConfig::builder()
        .max_chunk_size(cli.max_chunk_size)
        .overlap_size(cli.overlap_size)
        .chunk_delay_ms(cli.chunk_delay_ms)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn build_style(cli: &Cli) -> StyleConfig {
    StyleConfig::default()
        .with_tone(cli.tone.into())
        .with_formality(cli.formality.into())
        .with_creativity(cli.creativity.into())
        .with_intensity(cli.intensity)
        .with_preserve_formatting(!cli.no_preserve_formatting)
}
