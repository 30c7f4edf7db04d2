use std::io::Write;

use chrono::NaiveDate;

use crate::browser::{CardEvent, CardState, PlanBrowser, PlansView};
use crate::calendar::{CalendarEngine, DailyListing, MonthlyListing, MSG_NO_DATA};
use crate::database::{Database, KeyValueStore, VisitedSet, VISITED_KEY};
use crate::error::LoadError;
use crate::models::{reference_offset, Dataset, MonthStep, REFERENCE_UTC_OFFSET_HOURS};
use crate::source::{load, FileSource};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn load_body(body: &str) -> Result<Dataset, LoadError> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    let source = FileSource::new(file.path());
    load(&source, reference_offset(REFERENCE_UTC_OFFSET_HOURS))
}

fn november() -> CalendarEngine {
    CalendarEngine::new(2025, 10, reference_offset(REFERENCE_UTC_OFFSET_HOURS)).unwrap()
}

const REPAIRS: &str = r#"{
    "success": true,
    "data": [
        {"year": 2025, "plans": [
            {"ID": "r1", "Date": "2025-03-02", "Title": "Roof leak", "Status": "Completed", "Amount": 1500},
            {"ID": "r2", "Date": "2025-01-20", "Title": "Water heater", "Status": "Pending"}
        ]},
        {"year": 2024, "plans": [
            {"ID": "r3", "Date": "2024-07-07", "Title": "Door lock", "Status": "completed"}
        ]}
    ]
}"#;

fn repair_browser(db: &Database) -> PlanBrowser {
    let mut browser = PlanBrowser::new(VisitedSet::load(db), reference_offset(REFERENCE_UTC_OFFSET_HOURS));
    browser.load(load_body(REPAIRS).map(Dataset::into_groups));
    browser
}

#[test]
fn same_day_plans_are_listed_by_time() {
    let body = r#"[
        {"date": "2025-11-13", "time": "14:00", "description": "Tire check"},
        {"date": "2025-11-13", "time": "09:00", "description": "Oil change"}
    ]"#;
    let mut cal = november();
    cal.load_at(load_body(body).map(Dataset::into_flat), ymd(2030, 1, 1));

    let DailyListing::Plans { plans, .. } = cal.select_date(ymd(2025, 11, 13)) else {
        panic!("expected plans for 2025-11-13");
    };
    let titles: Vec<&str> = plans.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Oil change", "Tire check"]);
}

#[test]
fn next_month_from_november_2025() {
    let mut cal = november();
    cal.change_month_at(MonthStep::Next, ymd(2030, 1, 1));
    assert_eq!(cal.render_header(), "2025年12月");
    // 2025-12-01 is a Monday
    assert_eq!(cal.render_grid().leading_padding(), 1);
}

#[test]
fn empty_fetch_still_renders_the_month() {
    let result = load_body("[]");
    assert_eq!(result, Err(LoadError::EmptyData));

    let mut cal = november();
    cal.load_at(result.map(Dataset::into_flat), ymd(2030, 1, 1));
    let grid = cal.render_grid();
    assert_eq!(grid.days().count(), 30);
    assert!(grid.days().all(|d| !d.has_plans()));
    assert_eq!(cal.render_monthly(), MonthlyListing::NoData);
    assert!(crate::report::calendar_text(&cal).contains(MSG_NO_DATA));
}

#[test]
fn failed_fetch_leaves_both_views_usable() {
    let mut cal = november();
    cal.load_at(load_body("{not json").map(Dataset::into_flat), ymd(2030, 1, 1));
    assert!(cal.status().banner().is_some());
    cal.change_month_at(MonthStep::Prev, ymd(2030, 1, 1));
    assert_eq!(cal.render_header(), "2025年10月");

    let mut browser = PlanBrowser::new(VisitedSet::default(), reference_offset(8));
    browser.load(load_body("{not json").map(Dataset::into_groups));
    browser.set_search("roof");
    assert_eq!(browser.render_plans_at(2025), PlansView::NoData);
}

#[test]
fn open_then_close_keeps_card_visited() {
    let mut db = Database::open_in_memory().unwrap();
    let mut browser = repair_browser(&db);

    let state = browser.handle_card("r2", CardEvent::Activate, &mut db).unwrap();
    assert_eq!(state, CardState::Expanded);
    assert!(browser.find_plan("r2").unwrap().visited);

    let state = browser.handle_card("r2", CardEvent::Activate, &mut db).unwrap();
    assert_eq!(state, CardState::Collapsed);
    assert!(browser.find_plan("r2").unwrap().visited);

    // survives a restart
    let reopened = repair_browser(&db);
    assert!(reopened.find_plan("r2").unwrap().visited);
}

#[test]
fn visiting_twice_stores_one_id() {
    let mut db = Database::open_in_memory().unwrap();
    let mut browser = repair_browser(&db);
    browser.handle_card("r1", CardEvent::Activate, &mut db).unwrap();
    browser.handle_card("r1", CardEvent::Escape, &mut db).unwrap();
    browser.handle_card("r1", CardEvent::Activate, &mut db).unwrap();

    assert_eq!(db.get(VISITED_KEY).unwrap().as_deref(), Some(r#"["r1"]"#));
}

#[test]
fn text_filter_matches_status_case_insensitively() {
    let db = Database::open_in_memory().unwrap();
    let mut browser = repair_browser(&db);
    browser.set_search("completed");
    let view = browser.render_plans_at(2025);
    let ids: Vec<&str> = view.cards().into_iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["r1", "r3"]);
}

#[test]
fn rendering_twice_is_identical() {
    let db = Database::open_in_memory().unwrap();
    let browser = repair_browser(&db);
    let first = crate::report::plans_text(&browser.render_plans_at(2025));
    let second = crate::report::plans_text(&browser.render_plans_at(2025));
    assert_eq!(first, second);
    assert_eq!(first.matches("[r1]").count(), 1);

    let mut cal = november();
    cal.load_at(load_body(r#"[{"date":"2025-11-02","description":"A"}]"#).map(Dataset::into_flat), ymd(2025, 11, 2));
    assert_eq!(crate::report::calendar_text(&cal), crate::report::calendar_text(&cal));
}
