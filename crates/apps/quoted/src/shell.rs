//! Interactive session
//!
//! The session store lives as long as the shell, so `last` shows the quote
//! most recently displayed in this session. A background thread runs the
//! periodic sync; user commands and the timer share the store through a
//! mutex that the engine only takes for the merge step.

use log::{debug, warn};
use quotes::{CategoryFilter, QuoteError, QuoteStore, Result, SyncEngine, SyncOutcome};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::App;

/// How often the background thread checks whether a sync is due
const TICK: Duration = Duration::from_secs(1);

const HELP: &str = "\
Commands:
  show [category]        show a random quote (saved filter if omitted)
  last                   show the last displayed quote
  add <text> | <category>
  categories             list categories
  filter <category>      save the category filter (\"all\" for none)
  export <file>          write all quotes as JSON
  import <file>          append quotes from a JSON file
  sync                   sync with the server now
  push                   push local quotes to the server
  help                   show this help
  quit                   leave the shell";

/// A parsed shell line
#[derive(Debug, PartialEq)]
enum ShellCommand {
    Show(Option<String>),
    Last,
    Add { text: String, category: String },
    Categories,
    Filter(String),
    Export(PathBuf),
    Import(PathBuf),
    Sync,
    Push,
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<ShellCommand, String> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let required = |what: &str| {
        if rest.is_empty() {
            Err(format!("{} needs a {}", command, what))
        } else {
            Ok(rest.to_string())
        }
    };

    match command.to_lowercase().as_str() {
        "show" | "next" => Ok(ShellCommand::Show((!rest.is_empty()).then(|| rest.to_string()))),
        "last" => Ok(ShellCommand::Last),
        "add" => {
            let (text, category) = rest
                .rsplit_once('|')
                .ok_or_else(|| "usage: add <text> | <category>".to_string())?;
            Ok(ShellCommand::Add {
                text: text.trim().to_string(),
                category: category.trim().to_string(),
            })
        }
        "categories" => Ok(ShellCommand::Categories),
        "filter" => required("category").map(ShellCommand::Filter),
        "export" => required("file name").map(|f| ShellCommand::Export(PathBuf::from(f))),
        "import" => required("file name").map(|f| ShellCommand::Import(PathBuf::from(f))),
        "sync" => Ok(ShellCommand::Sync),
        "push" => Ok(ShellCommand::Push),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("Unknown command: {} (try \"help\")", other)),
    }
}

fn lock(store: &Mutex<QuoteStore>) -> Result<MutexGuard<'_, QuoteStore>> {
    store
        .lock()
        .map_err(|_| QuoteError::Storage(anyhow::anyhow!("Quote store lock poisoned")))
}

/// Run the periodic sync until `stop` is set
fn spawn_sync_timer(
    engine: Arc<SyncEngine>,
    store: Arc<Mutex<QuoteStore>>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Acquire) {
            let due = match store.lock() {
                Ok(guard) => SyncEngine::should_sync(guard.sync_state(), interval),
                Err(_) => break,
            };

            // A failed attempt leaves last_sync_at alone, so wait a full
            // interval before retrying instead of hammering the server
            if due {
                match engine.sync_shared(&store) {
                    Ok(SyncOutcome::AlreadyRunning) => debug!("Skipped timer sync, one is running"),
                    Ok(SyncOutcome::Completed(_)) => {}
                    Err(_) => sleep_unless_stopped(interval, &stop),
                }
            }
            thread::sleep(TICK);
        }
    })
}

fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) {
    let mut remaining = duration;
    while !remaining.is_zero() && !stop.load(Ordering::Acquire) {
        let step = remaining.min(TICK);
        thread::sleep(step);
        remaining -= step;
    }
}

fn execute(command: ShellCommand, engine: &SyncEngine, store: &Mutex<QuoteStore>) -> Result<bool> {
    match command {
        ShellCommand::Show(category) => {
            let store = lock(store)?;
            let filter = category
                .as_deref()
                .map(CategoryFilter::parse)
                .unwrap_or_else(|| store.category_filter());
            match store.select_random(&filter)? {
                Some(quote) => println!("{}", quote),
                None => println!("No quotes available for this category."),
            }
        }
        ShellCommand::Last => match lock(store)?.last_viewed()? {
            Some(quote) => println!("{}", quote),
            None => println!("Nothing shown yet in this session."),
        },
        ShellCommand::Add { text, category } => {
            let quote = lock(store)?.add(&text, &category)?;
            println!("Quote added successfully! {}", quote);
        }
        ShellCommand::Categories => {
            for option in lock(store)?.category_options() {
                println!("  {}", option);
            }
        }
        ShellCommand::Filter(category) => {
            let filter = CategoryFilter::parse(&category);
            lock(store)?.set_category_filter(&filter)?;
            println!("Category filter set to {}", filter);
        }
        ShellCommand::Export(path) => {
            lock(store)?.export_to_file(&path)?;
            println!("Exported to {}", path.display());
        }
        ShellCommand::Import(path) => {
            let count = lock(store)?.import_file(&path)?;
            println!("Quotes imported successfully! ({} added)", count);
        }
        ShellCommand::Sync => {
            if engine.sync_shared(store)? == SyncOutcome::AlreadyRunning {
                println!("A sync is already running.");
            }
        }
        ShellCommand::Push => {
            let count = engine.push_shared(store)?;
            println!("Pushed {} quotes to the server.", count);
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Run the interactive loop until `quit` or end of input
pub fn run(app: App, background_sync: bool) -> Result<()> {
    let App {
        config,
        store,
        engine,
    } = app;
    let store = Arc::new(Mutex::new(store));
    let stop = Arc::new(AtomicBool::new(false));

    let timer = background_sync.then(|| {
        spawn_sync_timer(
            engine.clone(),
            store.clone(),
            config.sync_interval(),
            stop.clone(),
        )
    });

    println!("Type \"help\" for commands.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("quote> ");
        let _ = io::stdout().flush();

        let Some(line) = lines.next() else { break };
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match execute(command, &engine, &store) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("{}", e),
        }
    }

    stop.store(true, Ordering::Release);
    if let Some(timer) = timer {
        let _ = timer.join();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show() {
        assert_eq!(parse_command("show"), Ok(ShellCommand::Show(None)));
        assert_eq!(
            parse_command("  show  Life "),
            Ok(ShellCommand::Show(Some("Life".to_string())))
        );
    }

    #[test]
    fn test_parse_add_splits_on_last_pipe() {
        assert_eq!(
            parse_command("add either | or | Choices"),
            Ok(ShellCommand::Add {
                text: "either | or".to_string(),
                category: "Choices".to_string(),
            })
        );
        assert!(parse_command("add no category").is_err());
    }

    #[test]
    fn test_parse_requires_arguments() {
        assert!(parse_command("filter").is_err());
        assert!(parse_command("export").is_err());
        assert_eq!(
            parse_command("import quotes.json"),
            Ok(ShellCommand::Import(PathBuf::from("quotes.json")))
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert!(parse_command("dance").is_err());
        assert_eq!(parse_command("EXIT"), Ok(ShellCommand::Quit));
    }
}
