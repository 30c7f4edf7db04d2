//! Month grid, day selection and plan listings for the schedule view.
//!
//! All derived views are computed from [`CalendarEngine`] state on demand,
//! so rendering twice with the same state yields the same structure.

use anyhow::{anyhow, Result};
use chrono::{Datelike, FixedOffset, Months, NaiveDate, Utc};

use crate::error::LoadError;
use crate::models::{date_key, LoadStatus, MonthStep, PlanRecord};

pub const MSG_SELECT_DATE: &str = "請選擇一個日期。";
pub const MSG_NO_PLANS_ON_DAY: &str = "當日無保養計畫。";
pub const MSG_NO_DATA: &str = "無保養計畫資料。";
pub const MSG_NO_PLANS_THIS_MONTH: &str = "本月無保養計畫。";
pub const TIME_NOT_SPECIFIED: &str = "未指定時間";
pub const TODAY_TOOLTIP: &str = "今天";

#[derive(Debug, Clone, PartialEq)]
pub struct DayInfo {
    pub day: u32,
    /// `YYYY-MM-DD`
    pub key: String,
    pub plan_count: usize,
    pub is_today: bool,
    pub is_selected: bool,
}

impl DayInfo {
    pub fn has_plans(&self) -> bool {
        self.plan_count > 0
    }

    pub fn tooltip(&self) -> Option<String> {
        if self.is_today {
            Some(TODAY_TOOLTIP.to_string())
        } else if self.has_plans() {
            Some(format!("有 {} 個保養計畫", self.plan_count))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayCell {
    Padding,
    Day(DayInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub year: i32,
    /// 1-based
    pub month: u32,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    #[cfg(test)]
    pub fn leading_padding(&self) -> usize {
        self.cells
            .iter()
            .take_while(|cell| matches!(cell, DayCell::Padding))
            .count()
    }

    pub fn days(&self) -> impl Iterator<Item = &DayInfo> {
        self.cells.iter().filter_map(|cell| match cell {
            DayCell::Day(info) => Some(info),
            DayCell::Padding => None,
        })
    }

    /// Rows of seven, Sunday first. The last row may be short.
    pub fn weeks(&self) -> Vec<&[DayCell]> {
        self.cells.chunks(7).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DailyListing {
    NoDateSelected,
    NoPlans(NaiveDate),
    Plans { date: NaiveDate, plans: Vec<PlanRecord> },
}

impl DailyListing {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            DailyListing::NoDateSelected => Some(MSG_SELECT_DATE),
            DailyListing::NoPlans(_) => Some(MSG_NO_PLANS_ON_DAY),
            DailyListing::Plans { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonthlyListing {
    NoData,
    NoPlansThisMonth,
    Plans(Vec<PlanRecord>),
}

impl MonthlyListing {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            MonthlyListing::NoData => Some(MSG_NO_DATA),
            MonthlyListing::NoPlansThisMonth => Some(MSG_NO_PLANS_THIS_MONTH),
            MonthlyListing::Plans(_) => None,
        }
    }
}

pub fn month_start(year: i32, month0: u32) -> Option<NaiveDate> {
    month0
        .checked_add(1)
        .and_then(|month| NaiveDate::from_ymd_opt(year, month, 1))
}

pub fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn today_in(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Plans on `date`, ordered by their zero-padded `HH:MM` time.
pub fn daily_plans(plans: &[PlanRecord], date: NaiveDate) -> Vec<PlanRecord> {
    let mut day_plans: Vec<PlanRecord> = plans
        .iter()
        .filter(|plan| plan.day == Some(date))
        .cloned()
        .collect();
    day_plans.sort_by(|a, b| a.time_or_empty().cmp(b.time_or_empty()));
    day_plans
}

/// Plans whose parsed date falls inside the month, ordered by (date, time).
pub fn monthly_plans(plans: &[PlanRecord], year: i32, month: u32) -> Vec<PlanRecord> {
    let mut month_plans: Vec<PlanRecord> = plans
        .iter()
        .filter(|plan| {
            plan.day
                .map_or(false, |day| day.year() == year && day.month() == month)
        })
        .cloned()
        .collect();
    month_plans.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then_with(|| a.time_or_empty().cmp(b.time_or_empty()))
    });
    month_plans
}

pub fn build_grid(
    first: NaiveDate,
    plans: &[PlanRecord],
    today: Option<NaiveDate>,
    selected: Option<NaiveDate>,
) -> MonthGrid {
    let padding = first.weekday().num_days_from_sunday() as usize;
    let mut cells = vec![DayCell::Padding; padding];

    for date in first.iter_days().take(days_in_month(first) as usize) {
        cells.push(DayCell::Day(DayInfo {
            day: date.day(),
            key: date_key(date),
            plan_count: plans.iter().filter(|plan| plan.day == Some(date)).count(),
            is_today: today == Some(date),
            is_selected: selected == Some(date),
        }));
    }

    MonthGrid {
        year: first.year(),
        month: first.month(),
        cells,
    }
}

pub struct CalendarEngine {
    cursor: NaiveDate,
    selected: Option<NaiveDate>,
    today: Option<NaiveDate>,
    plans: Vec<PlanRecord>,
    offset: FixedOffset,
    status: LoadStatus,
}

impl CalendarEngine {
    /// `month0` is zero-based.
    pub fn new(year: i32, month0: u32, offset: FixedOffset) -> Result<Self> {
        let cursor = month_start(year, month0)
            .ok_or_else(|| anyhow!("Invalid month: {} (zero-based) in {}", month0, year))?;
        Ok(CalendarEngine {
            cursor,
            selected: None,
            today: None,
            plans: Vec::new(),
            offset,
            status: LoadStatus::Loading,
        })
    }

    /// Opens on the current month of the reference offset.
    pub fn starting_today(offset: FixedOffset) -> Self {
        let today = today_in(offset);
        CalendarEngine {
            cursor: today.with_day(1).unwrap_or(today),
            selected: None,
            today: None,
            plans: Vec::new(),
            offset,
            status: LoadStatus::Loading,
        }
    }

    pub fn cursor(&self) -> NaiveDate {
        self.cursor
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn today(&self) -> Option<NaiveDate> {
        self.today
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn load(&mut self, result: Result<Vec<PlanRecord>, LoadError>) {
        let today = today_in(self.offset);
        self.load_at(result, today);
    }

    /// Replaces the dataset wholesale; any error leaves it empty.
    pub fn load_at(&mut self, result: Result<Vec<PlanRecord>, LoadError>, today: NaiveDate) {
        match result {
            Ok(plans) => {
                self.status = LoadStatus::Ready(plans.len());
                self.plans = plans;
            }
            Err(err) => {
                self.status = LoadStatus::Failed(err.to_string());
                self.plans = Vec::new();
            }
        }
        self.highlight_today_at(today);
    }

    pub fn set_month(&mut self, year: i32, month0: u32) -> Result<()> {
        self.cursor = month_start(year, month0)
            .ok_or_else(|| anyhow!("Invalid month: {} (zero-based) in {}", month0, year))?;
        Ok(())
    }

    pub fn change_month(&mut self, step: MonthStep) {
        let today = today_in(self.offset);
        self.change_month_at(step, today);
    }

    /// Moves the cursor one calendar month. The selection is kept even when
    /// it falls outside the new month.
    pub fn change_month_at(&mut self, step: MonthStep, today: NaiveDate) {
        let moved = match step {
            MonthStep::Next => self.cursor.checked_add_months(Months::new(1)),
            MonthStep::Prev => self.cursor.checked_sub_months(Months::new(1)),
        };
        match moved {
            Some(cursor) => self.cursor = cursor,
            None => log::warn!("Cannot move past {}", self.cursor),
        }
        self.highlight_today_at(today);
    }

    pub fn highlight_today(&mut self) {
        let today = today_in(self.offset);
        self.highlight_today_at(today);
    }

    /// Records `today` and selects it when nothing is selected and it is visible.
    pub fn highlight_today_at(&mut self, today: NaiveDate) {
        self.today = Some(today);
        if self.selected.is_none() && self.is_visible(today) {
            self.select_date(today);
        }
    }

    pub fn is_visible(&self, date: NaiveDate) -> bool {
        date.year() == self.cursor.year() && date.month() == self.cursor.month()
    }

    pub fn select_date(&mut self, date: NaiveDate) -> DailyListing {
        self.selected = Some(date);
        self.render_daily()
    }

    pub fn select_key(&mut self, key: &str) -> Result<DailyListing> {
        let date = NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d")
            .map_err(|_| anyhow!("Invalid date '{}', expected YYYY-MM-DD", key))?;
        Ok(self.select_date(date))
    }

    pub fn render_header(&self) -> String {
        format!("{}年{}月", self.cursor.year(), self.cursor.month())
    }

    pub fn render_grid(&self) -> MonthGrid {
        build_grid(self.cursor, &self.plans, self.today, self.selected)
    }

    pub fn render_daily(&self) -> DailyListing {
        let Some(date) = self.selected else {
            return DailyListing::NoDateSelected;
        };
        let plans = daily_plans(&self.plans, date);
        if plans.is_empty() {
            DailyListing::NoPlans(date)
        } else {
            DailyListing::Plans { date, plans }
        }
    }

    pub fn render_monthly(&self) -> MonthlyListing {
        if self.plans.is_empty() {
            return MonthlyListing::NoData;
        }
        let plans = monthly_plans(&self.plans, self.cursor.year(), self.cursor.month());
        if plans.is_empty() {
            MonthlyListing::NoPlansThisMonth
        } else {
            MonthlyListing::Plans(plans)
        }
    }
}
