use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

/// Hours east of UTC used for "today" and for timestamp dates (Asia/Taipei, no DST).
pub const REFERENCE_UTC_OFFSET_HOURS: i32 = 8;

pub const NOT_SPECIFIED: &str = "未指定";

/// Falls back to UTC when `hours` is out of range.
pub fn reference_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Parses the date forms the endpoints emit: `YYYY-MM-DD`, `YYYY/MM/DD`,
/// or an RFC 3339 timestamp taken in the reference offset.
pub fn parse_day(raw: &str, offset: FixedOffset) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y/%m/%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&offset).date_naive())
}

/// `YYYY-MM-DD`, the key every calendar cell carries.
pub fn date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlanRecord {
    pub id: String,
    /// Date exactly as delivered by the endpoint.
    pub date: String,
    /// Parsed form of `date`; `None` when the raw value is malformed.
    pub day: Option<NaiveDate>,
    pub time: Option<String>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub amount: Option<f64>,
    pub details: Option<String>,
    pub photos: Vec<String>,
    pub color: Option<String>,
    pub visited: bool,
}

impl PlanRecord {
    pub fn is_completed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("completed")
    }

    pub fn time_or_empty(&self) -> &str {
        self.time.as_deref().unwrap_or("")
    }

    pub fn year(&self) -> Option<i32> {
        self.day.map(|d| d.year())
    }
}

/// Builders for hand-written fixtures; the loader fills records field by field.
#[cfg(test)]
impl PlanRecord {
    pub fn new(id: impl Into<String>, date: impl Into<String>) -> Self {
        let date = date.into();
        let day = parse_day(&date, reference_offset(REFERENCE_UTC_OFFSET_HOURS));
        PlanRecord {
            id: id.into(),
            date,
            day,
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: &str) -> Self {
        self.time = Some(time.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        if self.description.is_empty() {
            self.description = title.to_string();
        }
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        if self.title.is_empty() {
            self.title = description.to_string();
        }
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearGroup {
    pub year: i32,
    pub plans: Vec<PlanRecord>,
}

/// Whatever the endpoint returned, after boundary normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Flat(Vec<PlanRecord>),
    Grouped(Vec<YearGroup>),
}

impl Dataset {
    pub fn len(&self) -> usize {
        match self {
            Dataset::Flat(plans) => plans.len(),
            Dataset::Grouped(groups) => groups.iter().map(|g| g.plans.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_flat(self) -> Vec<PlanRecord> {
        match self {
            Dataset::Flat(plans) => plans,
            Dataset::Grouped(groups) => groups.into_iter().flat_map(|g| g.plans).collect(),
        }
    }

    pub fn into_groups(self) -> Vec<YearGroup> {
        match self {
            Dataset::Grouped(groups) => groups,
            Dataset::Flat(plans) => {
                let mut groups: Vec<YearGroup> = Vec::new();
                for plan in plans {
                    let year = plan.year().unwrap_or(0);
                    match groups.iter_mut().find(|g| g.year == year) {
                        Some(group) => group.plans.push(plan),
                        None => groups.push(YearGroup { year, plans: vec![plan] }),
                    }
                }
                groups.sort_by_key(|g| g.year);
                groups
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusBucket {
    ThisYear,
    Completed,
    Incomplete,
    All,
}

impl StatusBucket {
    pub const ALL_BUCKETS: [StatusBucket; 4] = [
        StatusBucket::ThisYear,
        StatusBucket::Completed,
        StatusBucket::Incomplete,
        StatusBucket::All,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusBucket::ThisYear => "今年",
            StatusBucket::Completed => "已完成",
            StatusBucket::Incomplete => "未完成",
            StatusBucket::All => "全部",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStep {
    Prev,
    Next,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading,
    Ready(usize),
    Failed(String),
}

impl LoadStatus {
    pub fn banner(&self) -> Option<String> {
        match self {
            LoadStatus::Loading => Some("載入中...".to_string()),
            LoadStatus::Ready(_) => None,
            LoadStatus::Failed(message) => Some(format!("資料載入失敗：{}", message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupMode {
    None,
    Search,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taipei() -> FixedOffset {
        reference_offset(REFERENCE_UTC_OFFSET_HOURS)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_each_date_form() {
        assert_eq!(parse_day("2025-11-13", taipei()), Some(ymd(2025, 11, 13)));
        assert_eq!(parse_day(" 2025/11/13 ", taipei()), Some(ymd(2025, 11, 13)));
        // 16:30 UTC is already the next morning in Taipei
        assert_eq!(parse_day("2025-11-12T16:30:00Z", taipei()), Some(ymd(2025, 11, 13)));
        assert_eq!(parse_day("2025-11-12T16:30:00Z", reference_offset(0)), Some(ymd(2025, 11, 12)));
        assert_eq!(parse_day("2025-11-13T09:00:00+08:00", taipei()), Some(ymd(2025, 11, 13)));
    }

    #[test]
    fn blank_or_malformed_dates_have_no_day() {
        for raw in ["", "   ", "2025-11", "2025-11-05x", "2025-13-01", "13/11/2025", "tomorrow"] {
            assert_eq!(parse_day(raw, taipei()), None, "{:?}", raw);
        }
    }

    #[test]
    fn flat_records_regroup_by_ascending_year() {
        let dataset = Dataset::Flat(vec![
            PlanRecord::new("a", "2025-03-01"),
            PlanRecord::new("b", "not a date"),
            PlanRecord::new("c", "2024/12/31"),
            PlanRecord::new("d", "2025-01-15"),
            PlanRecord::new("e", ""),
        ]);
        assert_eq!(dataset.len(), 5);

        let groups = dataset.into_groups();
        let shape: Vec<(i32, Vec<&str>)> = groups
            .iter()
            .map(|g| (g.year, g.plans.iter().map(|p| p.id.as_str()).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![(0, vec!["b", "e"]), (2024, vec!["c"]), (2025, vec!["a", "d"])]
        );
    }

    #[test]
    fn grouped_records_keep_their_grouping() {
        let groups = vec![
            YearGroup { year: 2025, plans: vec![PlanRecord::new("x", "2025-01-01")] },
            YearGroup { year: 2023, plans: Vec::new() },
        ];
        let dataset = Dataset::Grouped(groups.clone());
        assert_eq!(dataset.clone().into_groups(), groups);
        assert_eq!(dataset.into_flat().len(), 1);
        assert!(Dataset::Flat(Vec::new()).is_empty());
    }

    #[test]
    fn reference_offset_falls_back_to_utc() {
        assert_eq!(reference_offset(8).local_minus_utc(), 8 * 3600);
        assert_eq!(reference_offset(99).local_minus_utc(), 0);
    }
}
