//! Subcommand handlers

use log::info;
use quotes::{CategoryFilter, Result, SyncEngine, SyncOutcome, time_until_next_sync};
use std::path::Path;
use std::time::Duration;

use crate::App;

const MIN_WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Message shown when a filter matches nothing
const NO_QUOTES: &str = "No quotes available for this category.";

/// Resolve an optional category argument, falling back to the saved filter
fn resolve_filter(app: &App, category: Option<&str>) -> CategoryFilter {
    category
        .map(CategoryFilter::parse)
        .unwrap_or_else(|| app.store.category_filter())
}

pub fn show(app: &App, category: Option<&str>) -> Result<()> {
    let filter = resolve_filter(app, category);
    match app.store.select_random(&filter)? {
        Some(quote) => println!("{}", quote),
        None => println!("{}", NO_QUOTES),
    }
    Ok(())
}

pub fn add(app: &mut App, text: &str, category: &str) -> Result<()> {
    let quote = app.store.add(text, category)?;
    println!("Quote added successfully! {}", quote);
    Ok(())
}

pub fn categories(app: &App) -> Result<()> {
    let selected = app.store.category_filter();
    for option in app.store.category_options() {
        let marker = if CategoryFilter::parse(&option) == selected {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, option);
    }
    Ok(())
}

pub fn set_filter(app: &App, filter: &CategoryFilter) -> Result<()> {
    app.store.set_category_filter(filter)?;
    println!("Category filter set to {}", filter);
    Ok(())
}

pub fn list(app: &App, category: Option<&str>) -> Result<()> {
    let filter = resolve_filter(app, category);
    let quotes = app.store.filtered(&filter);
    if quotes.is_empty() {
        println!("{}", NO_QUOTES);
    }
    for quote in quotes {
        let id = quote.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        // Local ids have never reached the server
        let marker = if quote.id.is_some_and(|id| id.is_local()) {
            "+"
        } else {
            " "
        };
        println!("{:>5}{} {}", id, marker, quote);
    }

    let state = app.store.sync_state();
    match state.last_sync_at {
        Some(at) => println!("Last synced {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Never synced"),
    }
    if state.has_unsynced_changes {
        println!("Local changes not yet on the server are marked +");
    }
    Ok(())
}

pub fn export(app: &App, output: &Path) -> Result<()> {
    app.store.export_to_file(output)?;
    println!("Exported {} quotes to {}", app.store.len(), output.display());
    Ok(())
}

pub fn import(app: &mut App, input: &Path) -> Result<()> {
    let count = app.store.import_file(input)?;
    println!("Quotes imported successfully! ({} added)", count);
    Ok(())
}

pub fn sync(app: &mut App) -> Result<()> {
    match app.engine.sync_once(&mut app.store)? {
        SyncOutcome::Completed(_) => {}
        SyncOutcome::AlreadyRunning => println!("A sync is already running."),
    }
    Ok(())
}

pub fn push(app: &mut App) -> Result<()> {
    let count = app.engine.push_local(&mut app.store)?;
    println!("Pushed {} quotes to the server.", count);
    Ok(())
}

/// Sync on a fixed interval until the process is interrupted.
///
/// Failed attempts are reported and retried at the next tick. The interval
/// is at least one second; clap and config validation both enforce it.
pub fn watch(app: &mut App, interval_secs: Option<u64>) -> Result<()> {
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| app.config.sync_interval())
        .max(MIN_WATCH_INTERVAL);
    if app.store.sync_state().has_synced() {
        info!("Syncing every {}s", interval.as_secs());
    } else {
        info!("Never synced, starting now and then every {}s", interval.as_secs());
    }

    loop {
        if SyncEngine::should_sync(app.store.sync_state(), interval) {
            // Offline and conflict notices already went to the observer
            let _ = app.engine.sync_once(&mut app.store);
        }

        let wait = time_until_next_sync(app.store.sync_state().last_sync_at, interval);
        std::thread::sleep(if wait.is_zero() { interval } else { wait });
    }
}
