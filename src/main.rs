mod browser;
mod calendar;
mod cli;
mod config;
mod database;
mod error;
mod logging;
mod models;
mod report;
mod source;
mod ui;

#[cfg(test)]
mod tests;

use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use database::{Database, VisitedSet};
use ui::run_tui;

use browser::{CardEvent, PlanBrowser};
use calendar::{CalendarEngine, DailyListing};
use config::Settings;
use models::{PlanRecord, YearGroup};

fn load_schedule(location: &str, settings: &Settings) -> Result<Result<Vec<PlanRecord>, error::LoadError>> {
    let source = source::open_source(location)?;
    Ok(source::load(source.as_ref(), settings.offset()).map(|dataset| dataset.into_flat()))
}

fn load_repairs(location: &str, settings: &Settings) -> Result<Result<Vec<YearGroup>, error::LoadError>> {
    let source = source::open_source(location)?;
    Ok(source::load(source.as_ref(), settings.offset()).map(|dataset| dataset.into_groups()))
}

fn parse_month(month: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid month '{}', expected YYYY-MM", month))?;
    Ok((first.year(), first.month0()))
}

fn repair_browser(db: &Database, location: &str, settings: &Settings) -> Result<PlanBrowser> {
    let mut browser = PlanBrowser::new(VisitedSet::load(db), settings.offset());
    browser.load(load_repairs(location, settings)?);
    Ok(browser)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let tui_mode = matches!(cli.command, None | Some(Commands::Tui { .. }));
    let log_file = tui_mode.then(config::log_file_path);
    logging::init(&cli.log_level, log_file.as_deref())?;

    let db_path = cli.db.clone().unwrap_or_else(config::default_db_path);
    let mut db = Database::open(&db_path)?;
    let settings = Settings::resolve(&db)?;

    match cli.command {
        Some(Commands::Calendar { month, date, source }) => {
            let location = source.unwrap_or_else(|| settings.schedule_source.clone());
            let mut engine = match month.as_deref() {
                Some(month) => {
                    let (year, month0) = parse_month(month)?;
                    CalendarEngine::new(year, month0, settings.offset())?
                }
                None => CalendarEngine::starting_today(settings.offset()),
            };
            engine.load(load_schedule(&location, &settings)?);
            if let Some(date) = date {
                engine.select_key(&date)?;
            }
            print!("{}", report::calendar_text(&engine));
        }

        Some(Commands::Day { date, source, json }) => {
            let location = source.unwrap_or_else(|| settings.schedule_source.clone());
            let mut engine = CalendarEngine::starting_today(settings.offset());
            engine.load(load_schedule(&location, &settings)?);
            let listing = engine.select_key(&date)?;
            if json {
                let plans: &[PlanRecord] = match &listing {
                    DailyListing::Plans { plans, .. } => plans.as_slice(),
                    _ => &[],
                };
                println!("{}", serde_json::to_string_pretty(plans)?);
                return Ok(());
            }
            if let Some(banner) = engine.status().banner() {
                println!("{}", banner);
            }
            print!("{}", report::daily_text(&listing));
        }

        Some(Commands::Repairs { year, search, filter, source, json }) => {
            let location = source.unwrap_or_else(|| settings.repair_source.clone());
            let mut browser = repair_browser(&db, &location, &settings)?;
            if let Some(year) = year {
                browser.set_year(&year);
            }
            if let Some(search) = search {
                browser.set_search(&search);
            }
            if let Some(bucket) = filter {
                browser.apply_bucket(bucket);
            }
            let view = browser.render_plans();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            if let Some(banner) = browser.status().banner() {
                println!("{}\n", banner);
            }
            print!("{}", report::plans_text(&view));
        }

        Some(Commands::Open { id, source }) => {
            let location = source.unwrap_or_else(|| settings.repair_source.clone());
            let mut browser = repair_browser(&db, &location, &settings)?;
            if let Some(banner) = browser.status().banner() {
                bail!("{}", banner);
            }
            browser.handle_card(&id, CardEvent::Activate, &mut db)?;
            let card = browser
                .render_plans()
                .cards()
                .into_iter()
                .find(|card| card.id == id)
                .cloned();
            match card {
                Some(card) => print!("{}", report::card_text(&card)),
                None => println!("Marked {} as visited", id),
            }
        }

        Some(Commands::Visited { clear }) => {
            let mut visited = VisitedSet::load(&db);
            if clear {
                visited.clear(&mut db)?;
                println!("Cleared visited repair cards");
            } else if visited.ids().is_empty() {
                println!("No visited repair cards");
            } else {
                for id in visited.ids() {
                    println!("{}", id);
                }
            }
        }

        Some(Commands::Set { key, value }) => {
            config::validate_setting(&key, &value)?;
            db.set_config(&key, &value)?;
            println!("Set {} = {}", key, value);
        }

        Some(Commands::Get { key }) => match db.get_config(&key)? {
            Some(value) => println!("{}", value),
            None => println!("Setting '{}' not found", key),
        },

        Some(Commands::ConfigList) => {
            let items = db.get_all_configs()?;
            if items.is_empty() {
                println!("No stored settings");
            }
            for item in items {
                println!("{} = {}  (updated {})", item.key_name, item.value, item.updated_at);
            }
            println!();
            println!("Resolved:");
            println!("  {} = {}", config::SCHEDULE_SOURCE_KEY, settings.schedule_source);
            println!("  {} = {}", config::REPAIR_SOURCE_KEY, settings.repair_source);
            println!("  {} = {}", config::UTC_OFFSET_KEY, settings.utc_offset_hours);
        }

        Some(Commands::ConfigDelete { key }) => {
            if db.delete_config(&key)? {
                println!("Deleted setting '{}'", key);
            } else {
                println!("Setting '{}' not found", key);
            }
        }

        Some(Commands::Tui { schedule_source, repair_source }) => {
            let mut settings = settings;
            if let Some(location) = schedule_source {
                settings.schedule_source = location;
            }
            if let Some(location) = repair_source {
                settings.repair_source = location;
            }
            run_tui(db, settings)?;
        }

        Some(Commands::Completions { shell }) => {
            use clap_complete::{generate, Shell};
            let shell = shell.to_lowercase();
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "elvish" => Shell::Elvish,
                "powershell" => Shell::PowerShell,
                _ => {
                    println!("Unsupported shell: {}", shell);
                    return Ok(());
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "upkeep", &mut std::io::stdout());
        }

        None => {
            // Default behavior: launch TUI
            run_tui(db, settings)?;
        }
    }

    Ok(())
}
