use anyhow::{bail, Result};
use chrono::{Datelike, FixedOffset};
use serde::Serialize;
use std::collections::HashSet;

use crate::calendar::today_in;
use crate::database::{KeyValueStore, VisitedSet};
use crate::error::LoadError;
use crate::models::{LoadStatus, PlanRecord, StatusBucket, YearGroup, NOT_SPECIFIED};

pub const MSG_NO_DATA: &str = "無修繕紀錄資料。";
pub const MSG_NO_RECORDS_FOR_YEAR: &str = "無此年度的修繕紀錄。";
pub const MSG_NO_MATCHES: &str = "無符合條件的紀錄。";
pub const MSG_NO_DETAILS: &str = "無額外詳細資訊。";
pub const DETAILS_HEADING: &str = "詳細內容：";
pub const ALL_YEARS_LABEL: &str = "所有年度...";

/// Ascending by parsed date; records with malformed dates go last.
pub fn sort_plans(plans: &[PlanRecord]) -> Vec<PlanRecord> {
    let mut sorted = plans.to_vec();
    sorted.sort_by_key(|plan| (plan.day.is_none(), plan.day));
    sorted
}

/// Case-insensitive substring match on title, status, raw date or amount.
pub fn matches_filter(plan: &PlanRecord, filter: &str) -> bool {
    let needle = filter.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    plan.title.to_lowercase().contains(&needle)
        || plan.status.to_lowercase().contains(&needle)
        || plan.date.to_lowercase().contains(&needle)
        || plan
            .amount
            .map_or(false, |amount| amount.to_string().contains(&needle))
}

pub fn filter_plans(plans: &[PlanRecord], filter: &str) -> Vec<PlanRecord> {
    plans
        .iter()
        .filter(|plan| matches_filter(plan, filter))
        .cloned()
        .collect()
}

/// Flattens every group and keeps the records in `bucket`, sorted by date.
pub fn bucket_plans(groups: &[YearGroup], bucket: StatusBucket, current_year: i32) -> Vec<PlanRecord> {
    let flattened: Vec<PlanRecord> = groups
        .iter()
        .flat_map(|group| group.plans.iter())
        .filter(|plan| match bucket {
            StatusBucket::ThisYear => plan.year() == Some(current_year),
            StatusBucket::Completed => plan.is_completed(),
            StatusBucket::Incomplete => !plan.is_completed(),
            StatusBucket::All => true,
        })
        .cloned()
        .collect();
    sort_plans(&flattened)
}

pub fn format_amount(amount: f64) -> String {
    let rounded = (amount * 1000.0).round() / 1000.0;
    let text = rounded.to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(frac) => format!("NT$ {}.{}", grouped, frac),
        None => format!("NT$ {}", grouped),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEvent {
    /// Click, Enter or Space.
    Activate,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEffect {
    MarkVisited(String),
}

/// Opening a card always requests a visit mark; closing never un-marks.
pub fn transition(state: CardState, event: CardEvent, id: &str) -> (CardState, Option<CardEffect>) {
    match (state, event) {
        (CardState::Collapsed, CardEvent::Activate) => {
            (CardState::Expanded, Some(CardEffect::MarkVisited(id.to_string())))
        }
        (CardState::Expanded, CardEvent::Activate) | (CardState::Expanded, CardEvent::Escape) => {
            (CardState::Collapsed, None)
        }
        (CardState::Collapsed, CardEvent::Escape) => (CardState::Collapsed, None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DetailLine {
    /// Multi-line free text, one entry per line.
    Details { heading: &'static str, lines: Vec<String> },
    Amount(String),
    Photos(Vec<String>),
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub date_display: String,
    pub status_label: &'static str,
    pub status_class: String,
    pub visited: bool,
    pub expanded: bool,
    pub details: Vec<DetailLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub heading: String,
    pub year: Option<i32>,
    pub cards: Vec<CardView>,
}

impl GroupView {
    pub fn empty_message(&self) -> Option<&'static str> {
        self.cards.is_empty().then_some(MSG_NO_MATCHES)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PlansView {
    NoData,
    NoRecordsForYear(String),
    NoBucketMatches,
    Groups(Vec<GroupView>),
}

impl PlansView {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            PlansView::NoData => Some(MSG_NO_DATA),
            PlansView::NoRecordsForYear(_) => Some(MSG_NO_RECORDS_FOR_YEAR),
            PlansView::NoBucketMatches => Some(MSG_NO_MATCHES),
            PlansView::Groups(_) => None,
        }
    }

    pub fn cards(&self) -> Vec<&CardView> {
        match self {
            PlansView::Groups(groups) => groups.iter().flat_map(|g| g.cards.iter()).collect(),
            _ => Vec::new(),
        }
    }
}

pub fn card_view(plan: &PlanRecord, expanded: bool) -> CardView {
    let date_display = match plan.day {
        Some(day) => day.format("%Y/%m/%d").to_string(),
        None if plan.date.is_empty() => NOT_SPECIFIED.to_string(),
        None => plan.date.clone(),
    };

    let mut details = Vec::new();
    if let Some(text) = &plan.details {
        details.push(DetailLine::Details {
            heading: DETAILS_HEADING,
            lines: text.lines().map(|line| line.trim_end().to_string()).collect(),
        });
    }
    if let Some(amount) = plan.amount {
        details.push(DetailLine::Amount(format!("修繕金額：{}", format_amount(amount))));
    }
    if !plan.photos.is_empty() {
        details.push(DetailLine::Photos(plan.photos.clone()));
    }
    if details.is_empty() {
        details.push(DetailLine::Placeholder);
    }

    CardView {
        id: plan.id.clone(),
        title: if plan.title.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            plan.title.clone()
        },
        date_display,
        status_label: if plan.is_completed() { "已完成" } else { "未完成" },
        status_class: plan
            .status
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-"),
        visited: plan.visited,
        expanded,
        details,
    }
}

/// Year-grouped repair records with search, year and status-bucket filters.
pub struct PlanBrowser {
    groups: Vec<YearGroup>,
    year_filter: String,
    search: String,
    bucket: Option<StatusBucket>,
    expanded: HashSet<String>,
    visited: VisitedSet,
    status: LoadStatus,
    offset: FixedOffset,
}

impl PlanBrowser {
    pub fn new(visited: VisitedSet, offset: FixedOffset) -> Self {
        PlanBrowser {
            groups: Vec::new(),
            year_filter: String::new(),
            search: String::new(),
            bucket: None,
            expanded: HashSet::new(),
            visited,
            status: LoadStatus::Loading,
            offset,
        }
    }

    /// Replaces the dataset wholesale and resets every filter.
    pub fn load(&mut self, result: Result<Vec<YearGroup>, LoadError>) {
        match result {
            Ok(mut groups) => {
                for plan in groups.iter_mut().flat_map(|g| g.plans.iter_mut()) {
                    plan.visited = plan.visited || self.visited.contains(&plan.id);
                }
                self.status = LoadStatus::Ready(groups.iter().map(|g| g.plans.len()).sum());
                self.groups = groups;
            }
            Err(err) => {
                self.status = LoadStatus::Failed(err.to_string());
                self.groups = Vec::new();
            }
        }
        self.year_filter.clear();
        self.search.clear();
        self.bucket = None;
        self.expanded.clear();
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn year_filter(&self) -> &str {
        &self.year_filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn bucket(&self) -> Option<StatusBucket> {
        self.bucket
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// `("", "所有年度...")` followed by one entry per loaded year.
    pub fn year_options(&self) -> Vec<(String, String)> {
        let mut options = vec![(String::new(), ALL_YEARS_LABEL.to_string())];
        options.extend(
            self.groups
                .iter()
                .map(|g| (g.year.to_string(), format!("{} 年", g.year))),
        );
        options
    }

    pub fn set_year(&mut self, year: &str) {
        self.year_filter = year.trim().to_string();
        self.search.clear();
        self.bucket = None;
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
        self.bucket = None;
    }

    pub fn apply_bucket(&mut self, bucket: StatusBucket) {
        self.bucket = Some(bucket);
        self.year_filter.clear();
        self.search.clear();
    }

    pub fn find_plan(&self, id: &str) -> Option<&PlanRecord> {
        self.groups
            .iter()
            .flat_map(|g| g.plans.iter())
            .find(|plan| plan.id == id)
    }

    pub fn card_state(&self, id: &str) -> CardState {
        if self.expanded.contains(id) {
            CardState::Expanded
        } else {
            CardState::Collapsed
        }
    }

    pub fn handle_card(
        &mut self,
        id: &str,
        event: CardEvent,
        store: &mut dyn KeyValueStore,
    ) -> Result<CardState> {
        if self.find_plan(id).is_none() {
            bail!("No repair record with id '{}'", id);
        }

        // The visit is persisted first; a failed write leaves the card collapsed.
        let (next, effect) = transition(self.card_state(id), event, id);
        if let Some(CardEffect::MarkVisited(id)) = effect {
            self.visited.mark(store, &id)?;
            for plan in self.groups.iter_mut().flat_map(|g| g.plans.iter_mut()) {
                if plan.id == id {
                    plan.visited = true;
                }
            }
        }

        match next {
            CardState::Expanded => self.expanded.insert(id.to_string()),
            CardState::Collapsed => self.expanded.remove(id),
        };
        Ok(next)
    }

    pub fn render_plans(&self) -> PlansView {
        let current_year = today_in(self.offset).year();
        self.render_plans_at(current_year)
    }

    pub fn render_plans_at(&self, current_year: i32) -> PlansView {
        match self.bucket {
            Some(bucket) if bucket != StatusBucket::All => {
                return self.render_bucket(bucket, current_year);
            }
            _ => {}
        }

        if self.groups.is_empty() {
            return PlansView::NoData;
        }

        let selected: Vec<&YearGroup> = self
            .groups
            .iter()
            .filter(|g| self.year_filter.is_empty() || g.year.to_string() == self.year_filter)
            .collect();
        if selected.is_empty() {
            return PlansView::NoRecordsForYear(self.year_filter.clone());
        }

        PlansView::Groups(
            selected
                .into_iter()
                .map(|group| GroupView {
                    heading: format!("{} 年修繕紀錄", group.year),
                    year: Some(group.year),
                    cards: filter_plans(&sort_plans(&group.plans), &self.search)
                        .iter()
                        .map(|plan| card_view(plan, self.expanded.contains(&plan.id)))
                        .collect(),
                })
                .collect(),
        )
    }

    fn render_bucket(&self, bucket: StatusBucket, current_year: i32) -> PlansView {
        let plans = bucket_plans(&self.groups, bucket, current_year);
        if plans.is_empty() {
            return PlansView::NoBucketMatches;
        }
        let heading = match bucket {
            StatusBucket::ThisYear => format!("{} 年 修繕紀錄", current_year),
            StatusBucket::Completed => "已完成 修繕紀錄".to_string(),
            StatusBucket::Incomplete => "未完成 修繕紀錄".to_string(),
            StatusBucket::All => "篩選結果 修繕紀錄".to_string(),
        };
        PlansView::Groups(vec![GroupView {
            heading,
            year: None,
            cards: plans
                .iter()
                .map(|plan| card_view(plan, self.expanded.contains(&plan.id)))
                .collect(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, VISITED_KEY};
    use crate::models::{reference_offset, REFERENCE_UTC_OFFSET_HOURS};

    fn groups() -> Vec<YearGroup> {
        vec![
            YearGroup {
                year: 2025,
                plans: vec![
                    PlanRecord::new("r2", "2025-06-10")
                        .with_title("Water heater")
                        .with_status("Pending")
                        .with_amount(12500.0),
                    PlanRecord::new("r1", "2025-02-01")
                        .with_title("Roof leak")
                        .with_status("Completed")
                        .with_amount(1500.0),
                ],
            },
            YearGroup {
                year: 2024,
                plans: vec![PlanRecord::new("r3", "2024-09-09")
                    .with_title("Door lock")
                    .with_status("Completed")],
            },
        ]
    }

    fn browser() -> PlanBrowser {
        let mut browser = PlanBrowser::new(
            VisitedSet::default(),
            reference_offset(REFERENCE_UTC_OFFSET_HOURS),
        );
        browser.load(Ok(groups()));
        browser
    }

    fn ids(view: &PlansView) -> Vec<&str> {
        view.cards().into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn groups_sort_by_date_ascending() {
        let view = browser().render_plans_at(2025);
        assert_eq!(ids(&view), ["r1", "r2", "r3"]);
        let PlansView::Groups(groups) = view else { panic!("expected groups") };
        assert_eq!(groups[0].heading, "2025 年修繕紀錄");
    }

    #[test]
    fn text_filter_matches_any_field_case_insensitively() {
        let plans = sort_plans(&groups()[0].plans);
        assert_eq!(filter_plans(&plans, "completed").len(), 1);
        assert_eq!(filter_plans(&plans, "HEATER")[0].id, "r2");
        assert_eq!(filter_plans(&plans, "2025-02")[0].id, "r1");
        assert_eq!(filter_plans(&plans, "125")[0].id, "r2");
        assert_eq!(filter_plans(&plans, "").len(), 2);
        // the needle is used as typed, surrounding spaces included
        assert!(filter_plans(&plans, " roof").is_empty());
        assert_eq!(filter_plans(&plans, "water heater")[0].id, "r2");
        assert!(filter_plans(&plans, "garage").is_empty());
    }

    #[test]
    fn year_filter_selects_one_group() {
        let mut browser = browser();
        browser.set_year("2024");
        assert_eq!(ids(&browser.render_plans_at(2025)), ["r3"]);
    }

    #[test]
    fn three_distinct_empty_states() {
        let mut empty = PlanBrowser::new(VisitedSet::default(), reference_offset(8));
        empty.load(Err(LoadError::EmptyData));
        let no_data = empty.render_plans_at(2025);
        assert_eq!(no_data, PlansView::NoData);

        let mut browser = browser();
        browser.set_year("1999");
        let no_year = browser.render_plans_at(2025);
        assert_eq!(no_year, PlansView::NoRecordsForYear("1999".to_string()));

        browser.set_year("2025");
        browser.set_search("garage");
        let PlansView::Groups(groups) = browser.render_plans_at(2025) else {
            panic!("expected groups");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].empty_message(), Some(MSG_NO_MATCHES));

        let messages = [no_data.message(), no_year.message(), groups[0].empty_message()];
        assert_eq!(
            messages,
            [Some(MSG_NO_DATA), Some(MSG_NO_RECORDS_FOR_YEAR), Some(MSG_NO_MATCHES)]
        );
    }

    #[test]
    fn buckets_flatten_into_one_group_and_clear_other_filters() {
        let mut browser = browser();
        browser.set_year("2024");
        browser.set_search("door");
        browser.apply_bucket(StatusBucket::Completed);
        assert_eq!(browser.year_filter(), "");
        assert_eq!(browser.search(), "");

        let PlansView::Groups(groups) = browser.render_plans_at(2025) else {
            panic!("expected groups");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].heading, "已完成 修繕紀錄");
        assert_eq!(
            groups[0].cards.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            ["r3", "r1"]
        );

        browser.apply_bucket(StatusBucket::Incomplete);
        assert_eq!(ids(&browser.render_plans_at(2025)), ["r2"]);

        browser.apply_bucket(StatusBucket::ThisYear);
        assert_eq!(ids(&browser.render_plans_at(2024)), ["r3"]);
        assert_eq!(browser.render_plans_at(2030), PlansView::NoBucketMatches);

        browser.apply_bucket(StatusBucket::All);
        assert_eq!(ids(&browser.render_plans_at(2025)), ["r1", "r2", "r3"]);
    }

    #[test]
    fn setting_a_filter_leaves_bucket_mode() {
        let mut browser = browser();
        browser.apply_bucket(StatusBucket::Completed);
        browser.set_search("heater");
        assert_eq!(browser.bucket(), None);
        assert_eq!(ids(&browser.render_plans_at(2025)), ["r2"]);
    }

    #[test]
    fn card_state_machine() {
        let (state, effect) = transition(CardState::Collapsed, CardEvent::Activate, "r1");
        assert_eq!(state, CardState::Expanded);
        assert_eq!(effect, Some(CardEffect::MarkVisited("r1".to_string())));
        assert_eq!(transition(state, CardEvent::Escape, "r1"), (CardState::Collapsed, None));
        assert_eq!(transition(state, CardEvent::Activate, "r1"), (CardState::Collapsed, None));
        assert_eq!(
            transition(CardState::Collapsed, CardEvent::Escape, "r1"),
            (CardState::Collapsed, None)
        );
    }

    #[test]
    fn escape_collapses_but_keeps_visited() {
        let mut store = MemoryStore::default();
        let mut browser = browser();
        browser.handle_card("r2", CardEvent::Activate, &mut store).unwrap();
        assert_eq!(browser.card_state("r2"), CardState::Expanded);

        browser.handle_card("r2", CardEvent::Escape, &mut store).unwrap();
        assert_eq!(browser.card_state("r2"), CardState::Collapsed);
        assert!(browser.find_plan("r2").unwrap().visited);
        assert!(browser.visited().contains("r2"));
    }

    #[test]
    fn reopening_does_not_duplicate_visited_ids() {
        let mut store = MemoryStore::default();
        let mut browser = browser();
        for _ in 0..3 {
            browser.handle_card("r1", CardEvent::Activate, &mut store).unwrap();
        }
        assert_eq!(store.get(VISITED_KEY).unwrap().as_deref(), Some(r#"["r1"]"#));
    }

    struct RejectingStore;

    impl KeyValueStore for RejectingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            bail!("read-only store")
        }
    }

    #[test]
    fn failed_visit_write_leaves_card_closed_and_unvisited() {
        let mut browser = browser();
        assert!(browser.handle_card("r1", CardEvent::Activate, &mut RejectingStore).is_err());
        assert_eq!(browser.card_state("r1"), CardState::Collapsed);
        assert!(!browser.find_plan("r1").unwrap().visited);

        let mut store = MemoryStore::default();
        browser.handle_card("r1", CardEvent::Activate, &mut store).unwrap();
        assert_eq!(browser.card_state("r1"), CardState::Expanded);
        assert_eq!(store.get(VISITED_KEY).unwrap().as_deref(), Some(r#"["r1"]"#));
    }

    #[test]
    fn unknown_card_is_an_error() {
        let mut store = MemoryStore::default();
        assert!(browser().handle_card("nope", CardEvent::Activate, &mut store).is_err());
    }

    #[test]
    fn persisted_visits_merge_on_load() {
        let mut store = MemoryStore::default();
        let mut visited = VisitedSet::load(&store);
        visited.mark(&mut store, "r3").unwrap();

        let mut browser = PlanBrowser::new(VisitedSet::load(&store), reference_offset(8));
        browser.load(Ok(groups()));
        let cards = browser.render_plans_at(2025);
        let visited: Vec<&str> = cards
            .cards()
            .into_iter()
            .filter(|c| c.visited)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(visited, ["r3"]);
    }

    #[test]
    fn reload_resets_filters_and_expansion() {
        let mut store = MemoryStore::default();
        let mut browser = browser();
        browser.set_year("2024");
        browser.handle_card("r3", CardEvent::Activate, &mut store).unwrap();
        browser.load(Ok(groups()));
        assert_eq!(browser.year_filter(), "");
        assert_eq!(browser.card_state("r3"), CardState::Collapsed);
        // the persisted visit is merged back in
        assert!(browser.find_plan("r3").unwrap().visited);
    }

    #[test]
    fn card_view_placeholders_and_details() {
        let bare = PlanRecord::new("x", "");
        let view = card_view(&bare, false);
        assert_eq!(view.title, NOT_SPECIFIED);
        assert_eq!(view.date_display, NOT_SPECIFIED);
        assert_eq!(view.status_label, "未完成");
        assert_eq!(view.details, vec![DetailLine::Placeholder]);

        let mut full = PlanRecord::new("y", "2025-02-01")
            .with_title("Roof")
            .with_status("In Progress")
            .with_amount(1234567.5);
        full.details = Some("line one\nline two".to_string());
        full.photos = vec!["https://img/1.jpg".to_string()];
        let view = card_view(&full, true);
        assert_eq!(view.date_display, "2025/02/01");
        assert_eq!(view.status_class, "in-progress");
        assert!(view.expanded);
        assert_eq!(
            view.details,
            vec![
                DetailLine::Details {
                    heading: "詳細內容：",
                    lines: vec!["line one".to_string(), "line two".to_string()],
                },
                DetailLine::Amount("修繕金額：NT$ 1,234,567.5".to_string()),
                DetailLine::Photos(vec!["https://img/1.jpg".to_string()]),
            ]
        );
    }

    #[test]
    fn amounts_use_thousands_separators() {
        assert_eq!(format_amount(0.0), "NT$ 0");
        assert_eq!(format_amount(999.0), "NT$ 999");
        assert_eq!(format_amount(1500.0), "NT$ 1,500");
        assert_eq!(format_amount(12500.25), "NT$ 12,500.25");
    }

    #[test]
    fn year_options_list_all_years_first() {
        let options = browser().year_options();
        assert_eq!(options[0], (String::new(), ALL_YEARS_LABEL.to_string()));
        assert_eq!(options[1], ("2025".to_string(), "2025 年".to_string()));
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn views_serialize_with_kind_tags() {
        let json = serde_json::to_value(browser().render_plans_at(2025)).unwrap();
        assert_eq!(json["kind"], "groups");
        assert_eq!(json["value"][0]["cards"][0]["id"], "r1");
        assert_eq!(json["value"][0]["cards"][0]["details"][0]["kind"], "amount");

        let empty = serde_json::to_value(PlansView::NoData).unwrap();
        assert_eq!(empty, serde_json::json!({"kind": "no_data"}));
    }

    #[test]
    fn rendering_is_idempotent() {
        let browser = browser();
        assert_eq!(browser.render_plans_at(2025), browser.render_plans_at(2025));
    }
}
