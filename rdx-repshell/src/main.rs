use anyhow::Result;
use colored::Colorize;
use repclock::prelude::*;
use repclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGO_TEXT: &str = r"
   ____              ____ _            _
  |  _ \ ___ _ __   / ___| | ___   ___| | __
  | |_) / _ \ '_ \ | |   | |/ _ \ / __| |/ /
  |  _ <  __/ |_) || |___| | (_) | (__|   <
  |_| \_\___| .__/  \____|_|\___/ \___|_|\_\
            |_|
";

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Renders cues as text: `.` for an interval beat, `*` for a count beat,
/// and spoken words in brackets.
struct TerminalCueSink;

impl CueSink for TerminalCueSink {
    fn play_sound(&self, sound: Sound) -> anyhow::Result<()> {
        let beat = match sound {
            Sound::Interval => ".".dimmed(),
            Sound::Count => "*".yellow().bold(),
        };
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", beat)?;
        stdout.flush()?;
        Ok(())
    }

    fn speak(&self, text: &str) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, " [{}] ", text.cyan().bold())?;
        stdout.flush()?;
        Ok(())
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(64).dimmed());
    println!("{}", version_string);
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license.".dimmed()
    );
    println!("{}", "-".repeat(64).dimmed());
}

/// Prints a status line whenever the rep changes or a run starts or ends.
async fn watch_progress(session: &TrainingSession) {
    let last: Mutex<Option<Progress>> = Mutex::new(None);
    session
        .scheduler()
        .on_progress(move |p: &Progress| {
            let Ok(mut last) = last.lock() else { return };
            let changed = last
                .as_ref()
                .map_or(true, |prev| prev.current_rep != p.current_rep || prev.running != p.running);
            if changed {
                let state = if p.running { "running".green() } else { "idle".dimmed() };
                println!("\n<-- [{}] rep {} ({})", p.display_text.bold(), p.current_rep, state);
            }
            *last = Some(p.clone());
        })
        .await;
}

async fn print_status(session: &TrainingSession) {
    let state = session.state().await;
    let snapshot = session.scheduler().snapshot().await;
    println!("Category : {}", state.selected_category);
    println!(
        "Step     : {}",
        state.selected_step.map(|s| s.to_string()).unwrap_or_default()
    );
    println!("Exercise : {}", state.selected_exercise);
    println!("Level    : {}", state.selected_level);
    println!("Reps     : {} x {} sets", state.total_reps, state.sets);
    println!(
        "Timer    : {} rep {} ({:?})",
        snapshot.progress.display_text, snapshot.progress.current_rep, snapshot.phase
    );
}

fn print_help() {
    println!("Available commands:");
    println!("  categories            - Lists exercise categories.");
    println!("  category <NAME>       - Selects a category.");
    println!("  steps                 - Lists steps, exercises and levels in the selection.");
    println!("  step <N>              - Selects a step.");
    println!("  exercise <NAME>       - Selects an exercise in the current step.");
    println!("  level <NAME>          - Selects a level.");
    println!("  reps [+|-|N]          - Shows or adjusts the reps for the next run.");
    println!("  start                 - Starts a run.");
    println!("  pause                 - Pauses the run.");
    println!("  stop                  - Stops the run and logs completed reps.");
    println!("  reset                 - Resets the timer and clears the reps.");
    println!("  status                - Shows the selection and timer state.");
    println!("  log                   - Shows the training log.");
    println!("  edit <INDEX> <REPS>   - Corrects the reps of a training log record.");
    println!("  exit                  - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = RepClockConfig::load(config_path.as_deref())?;
    info!("Loading catalog from {}", config.storage.catalog_path.display());

    let session = TrainingSession::from_config(config, Arc::new(TerminalCueSink)).await;
    watch_progress(&session).await;
    session.load().await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(MyHighlighter {}));

    println!("{} is ready. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting repshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        match command {
            "categories" => {
                for category in session.state().await.categories {
                    println!("  {}", category);
                }
            }
            "category" if !arg.is_empty() => {
                session.select_category(arg).await;
                print_status(&session).await;
            }
            "steps" => {
                let state = session.state().await;
                println!("Steps     : {:?}", state.steps);
                println!("Exercises : {:?}", state.exercises_for_step);
                println!("Levels    : {:?}", state.levels);
            }
            "step" => match arg.parse::<u32>() {
                Ok(step) => {
                    session.select_step(step).await;
                    print_status(&session).await;
                }
                Err(_) => println!("Usage: step <N>"),
            },
            "exercise" if !arg.is_empty() => {
                session.select_exercise(arg).await;
                print_status(&session).await;
            }
            "level" if !arg.is_empty() => {
                session.select_level(arg).await;
                print_status(&session).await;
            }
            "reps" => {
                let total = match arg {
                    "" => session.state().await.total_reps,
                    "+" => session.increment_total_reps().await,
                    "-" => session.decrement_total_reps().await,
                    n => match n.parse::<u32>() {
                        Ok(n) => {
                            session.set_total_reps(n).await;
                            n
                        }
                        Err(_) => {
                            println!("Usage: reps [+|-|N]");
                            continue;
                        }
                    },
                };
                println!("--> {} reps", total);
            }
            "start" => {
                if !session.start().await {
                    println!("--> Not started: a run is in progress or reps is 0.");
                }
            }
            "pause" => {
                if !session.pause().await {
                    println!("--> Nothing is running.");
                }
            }
            "stop" => match session.stop().await {
                Some(reps) => println!("--> Stopped after {} completed reps.", reps),
                None => println!("--> Stopped."),
            },
            "reset" => {
                session.reset().await;
                println!("--> Timer reset.");
            }
            "status" => print_status(&session).await,
            "log" => {
                let logs = session.training_logs().await;
                if logs.is_empty() {
                    println!("No training logged yet.");
                }
                for (index, entry) in logs.iter().enumerate() {
                    println!(
                        "  #{:<3} {} {:<12} step {:<3} {} reps",
                        index, entry.date, entry.category, entry.step, entry.reps
                    );
                }
            }
            "edit" => {
                let parsed = arg
                    .split_once(' ')
                    .and_then(|(index, reps)| {
                        Some((index.trim().parse::<usize>().ok()?, reps.trim().parse::<u32>().ok()?))
                    });
                let Some((index, reps)) = parsed else {
                    println!("Usage: edit <INDEX> <REPS>");
                    continue;
                };
                let logs = session.training_logs().await;
                let Some(entry) = logs.get(index) else {
                    println!("--> No training log record #{}.", index);
                    continue;
                };
                let mut edited = entry.clone();
                edited.reps = reps;
                if session.update_log(index, edited).await {
                    println!("--> Record #{} now has {} reps.", index, reps);
                } else {
                    println!("--> Could not update record #{}.", index);
                }
            }
            "help" => print_help(),
            "exit" => break,
            "" => {}
            _ => println!("Unknown command: '{}'. Type 'help'.", line),
        }
    }

    session.reset().await;
    Ok(())
}
