use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use simplecalc::calculator::{
    CalcResult, CalculatorState, Key, copy_to_clipboard, format_grouped, looks_like_expression,
};
use simplecalc::config::Config;
use simplecalc::history::{
    FileHistory, HistoryEntry, HistoryRecorder, HistoryStore, MemoryHistory, import_legacy,
    now_millis, query,
};
use simplecalc::voice::{RecognitionError, SpeechOutput, prompt};

#[derive(Parser, Debug)]
#[command(name = "simplecalc", version, about = "Keypad and voice calculator")]
struct Cli {
    /// Config file (default: <config dir>/simplecalc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Do not read or write the history file
    #[arg(long, global = true)]
    no_history: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate an expression
    Eval {
        #[arg(required = true)]
        expression: Vec<String>,
        /// Copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Evaluate a spoken-style phrase, e.g. "12 plus 48"
    Voice {
        /// Transcript; read from stdin when omitted
        transcript: Vec<String>,
        /// Print the rewritten expression without evaluating it
        #[arg(long)]
        normalize_only: bool,
    },
    /// Replay a sequence of keypad keys, e.g. "12+3<=" ('<' is backspace, 'c' clears)
    Keys { sequence: String },
    /// Interactive keypad; prefix a line with "say " for voice input
    Repl,
    /// Inspect or manage history
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// List entries, newest first
    List {
        /// Only entries from this day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<NaiveDate>,
        /// Group entries under a header per day
        #[arg(long)]
        grouped: bool,
    },
    /// Find entries containing text
    Search {
        query: String,
        /// Rank by fuzzy match instead of substring
        #[arg(long)]
        fuzzy: bool,
    },
    /// Delete all entries
    Clear,
    /// Import history exported by older releases
    Import { file: PathBuf },
}

/// Speaks by printing to stdout.
struct ConsoleSpeech;

impl SpeechOutput for ConsoleSpeech {
    fn speak(&self, text: &str) {
        println!("{text}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let store = open_store(&config, cli.no_history)?;

    match cli.command {
        Command::Eval { expression, copy } => run_eval(&config, store, &expression.join(" "), copy),
        Command::Voice {
            transcript,
            normalize_only,
        } => run_voice(&config, store, transcript.join(" "), normalize_only),
        Command::Keys { sequence } => {
            let mut state = build_state(&config, store)?;
            press_keys(&mut state, &sequence);
            println!("{}", state.expression());
            println!("{}", state.display());
            Ok(())
        }
        Command::Repl => run_repl(&config, store),
        Command::History { action } => run_history(store.as_ref(), action),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_store(config: &Config, no_history: bool) -> Result<Arc<dyn HistoryStore>> {
    if no_history || !config.history.enabled {
        return Ok(Arc::new(MemoryHistory::new()));
    }

    match config.history_path() {
        Some(path) => {
            let store = FileHistory::open(&path)
                .with_context(|| format!("failed to open history at {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("no data directory available; history will not be saved");
            Ok(Arc::new(MemoryHistory::new()))
        }
    }
}

fn build_state(config: &Config, store: Arc<dyn HistoryStore>) -> Result<CalculatorState> {
    let recorder = HistoryRecorder::spawn(store).context("failed to start history writer")?;
    Ok(CalculatorState::new()
        .with_history(recorder)
        .with_phrases(config.phrase_table())
        .with_speak_prefix(config.voice.speak_prefix.clone()))
}

fn run_eval(config: &Config, store: Arc<dyn HistoryStore>, input: &str, copy: bool) -> Result<()> {
    if !looks_like_expression(input) {
        info!(input, "input has no operator between two numbers");
    }

    let result = CalcResult::evaluate(input);
    let recorder = HistoryRecorder::spawn(store).context("failed to start history writer")?;
    recorder.record(HistoryEntry::new(now_millis(), result.calculation()));

    let shown = match result.value() {
        Some(value) if config.display.group_digits => format_grouped(value),
        _ => result.display().to_string(),
    };
    println!("{shown}");

    if copy {
        copy_to_clipboard(result.display())?;
    }

    recorder.shutdown();
    Ok(())
}

fn run_voice(
    config: &Config,
    store: Arc<dyn HistoryStore>,
    transcript: String,
    normalize_only: bool,
) -> Result<()> {
    let outcome = if transcript.trim().is_empty() {
        eprintln!("{}", prompt(now_millis().unsigned_abs() as usize));
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let line = line.trim().to_string();
        if line.is_empty() {
            Err(RecognitionError::NoMatch)
        } else {
            Ok(line)
        }
    } else {
        Ok(transcript)
    };

    if normalize_only {
        let transcript = outcome?;
        println!("{}", config.phrase_table().normalize(&transcript));
        return Ok(());
    }

    let failed = outcome.is_err();
    let mut state = build_state(config, store)?;
    state.handle_recognition(outcome, &ConsoleSpeech);
    if failed {
        println!("{}", state.display());
    }
    Ok(())
}

fn press_keys(state: &mut CalculatorState, sequence: &str) {
    for c in sequence.chars() {
        match Key::from_char(c) {
            Some(key) => state.press(key),
            None if c.is_whitespace() => {}
            None => warn!(key = %c, "ignoring unknown key"),
        }
    }
}

fn run_repl(config: &Config, store: Arc<dyn HistoryStore>) -> Result<()> {
    let mut state = build_state(config, store)?;
    let updates = state.subscribe();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("{}", state.display());
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if matches!(trimmed, "q" | "quit" | "exit") {
            break;
        } else if let Some(transcript) = trimmed.strip_prefix("say ") {
            state.handle_recognition(Ok(transcript.to_string()), &ConsoleSpeech);
        } else if trimmed == "copy" {
            if let Err(e) = copy_to_clipboard(state.display()) {
                warn!(error = %e, "copy failed");
            }
        } else {
            press_keys(&mut state, trimmed);
        }

        if let Some(snapshot) = updates.try_iter().last() {
            println!("{}    [{}]", snapshot.display, snapshot.expression);
        }
        print!("> ");
        stdout.flush()?;
    }

    Ok(())
}

fn run_history(store: &dyn HistoryStore, action: HistoryCommand) -> Result<()> {
    match action {
        HistoryCommand::List { day, grouped } => {
            let mut entries = store.list_all()?;
            if let Some(day) = day {
                entries = query::on_day(&entries, day, &Local);
            }

            if grouped {
                for (day, group) in query::group_by_day(&entries, &Local) {
                    println!("{}", day.format("%A, %b %-d, %Y"));
                    for entry in &group {
                        println!("  {}", entry.calculation);
                    }
                }
            } else {
                entries.iter().for_each(print_entry);
            }
        }
        HistoryCommand::Search { query: text, fuzzy } => {
            let entries = if fuzzy {
                query::fuzzy_search(&store.list_all()?, &text)
            } else {
                store.search(&text)?
            };
            entries.iter().for_each(print_entry);
        }
        HistoryCommand::Clear => {
            store.clear()?;
            info!("history cleared");
        }
        HistoryCommand::Import { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let count = import_legacy(store, &raw, now_millis())?;
            println!("imported {count} entries");
        }
    }

    Ok(())
}

fn print_entry(entry: &HistoryEntry) {
    let when = Local
        .timestamp_millis_opt(entry.timestamp)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!("{when}  {}", entry.calculation);
}
