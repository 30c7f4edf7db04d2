//! Plain-text rendering of the calendar and repair views for the CLI.

use std::fmt::Write;

use crate::browser::{CardView, DetailLine, PlansView};
use crate::calendar::{CalendarEngine, DailyListing, DayCell, MonthGrid, MonthlyListing, TIME_NOT_SPECIFIED};
use crate::models::PlanRecord;

pub const WEEKDAY_HEADER: [&str; 7] = ["日", "一", "二", "三", "四", "五", "六"];
pub const VISITED_MARK: &str = "●";

/// Each cell is four columns wide. `[13]` is the selected day, `(13)` today,
/// and a trailing `*` marks days with plans.
pub fn grid_text(grid: &MonthGrid) -> String {
    let mut out = String::new();
    for name in WEEKDAY_HEADER {
        // CJK glyphs are two columns wide
        let _ = write!(out, "  {}", name);
    }
    out.push('\n');

    for week in grid.weeks() {
        let mut line = String::new();
        for cell in week {
            match cell {
                DayCell::Padding => line.push_str("    "),
                DayCell::Day(info) => {
                    let (open, close) = if info.is_selected {
                        ('[', ']')
                    } else if info.is_today {
                        ('(', ')')
                    } else {
                        (' ', ' ')
                    };
                    let close = if close == ' ' && info.has_plans() { '*' } else { close };
                    let _ = write!(line, "{}{:>2}{}", open, info.day, close);
                }
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn plan_line(plan: &PlanRecord, with_date: bool) -> String {
    let time = plan.time.as_deref().filter(|t| !t.is_empty()).unwrap_or(TIME_NOT_SPECIFIED);
    if with_date {
        format!("  {} {}  {}", plan.date, time, plan.title)
    } else {
        format!("  {}  {}", time, plan.title)
    }
}

pub fn daily_text(listing: &DailyListing) -> String {
    match listing {
        DailyListing::Plans { date, plans } => {
            let mut out = format!("{}\n", date.format("%Y-%m-%d"));
            for plan in plans {
                out.push_str(&plan_line(plan, false));
                out.push('\n');
            }
            out
        }
        DailyListing::NoPlans(date) => {
            format!("{}\n  {}\n", date.format("%Y-%m-%d"), listing.message().unwrap_or_default())
        }
        DailyListing::NoDateSelected => format!("  {}\n", listing.message().unwrap_or_default()),
    }
}

pub fn monthly_text(listing: &MonthlyListing) -> String {
    match listing {
        MonthlyListing::Plans(plans) => plans
            .iter()
            .map(|plan| plan_line(plan, true) + "\n")
            .collect(),
        other => format!("  {}\n", other.message().unwrap_or_default()),
    }
}

pub fn calendar_text(engine: &CalendarEngine) -> String {
    let mut out = String::new();
    if let Some(banner) = engine.status().banner() {
        let _ = writeln!(out, "{}\n", banner);
    }
    let _ = writeln!(out, "{}", engine.render_header());
    out.push_str(&grid_text(&engine.render_grid()));
    out.push_str("\n當日計畫\n");
    out.push_str(&daily_text(&engine.render_daily()));
    out.push_str("\n本月計畫\n");
    out.push_str(&monthly_text(&engine.render_monthly()));
    out
}

pub fn card_text(card: &CardView) -> String {
    let marker = if card.visited { VISITED_MARK } else { " " };
    let mut out = format!(
        "{} [{}] {}  {}  {}\n",
        marker, card.id, card.date_display, card.title, card.status_label
    );
    if card.expanded {
        for line in &card.details {
            match line {
                DetailLine::Details { heading, lines } => {
                    let _ = writeln!(out, "      {}", heading);
                    for text in lines {
                        let _ = writeln!(out, "        {}", text);
                    }
                }
                DetailLine::Amount(text) => {
                    let _ = writeln!(out, "      {}", text);
                }
                DetailLine::Photos(urls) => {
                    for url in urls {
                        let _ = writeln!(out, "      照片：{}", url);
                    }
                }
                DetailLine::Placeholder => {
                    let _ = writeln!(out, "      {}", crate::browser::MSG_NO_DETAILS);
                }
            }
        }
    }
    out
}

pub fn plans_text(view: &PlansView) -> String {
    let PlansView::Groups(groups) = view else {
        return format!("{}\n", view.message().unwrap_or_default());
    };

    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "{}", group.heading);
        match group.empty_message() {
            Some(message) => {
                let _ = writeln!(out, "  {}", message);
            }
            None => group.cards.iter().for_each(|card| out.push_str(&card_text(card))),
        }
        out.push('\n');
    }
    out
}
