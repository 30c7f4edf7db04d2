use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;

use crate::browser::{CardEvent, CardView, DetailLine, PlanBrowser, PlansView, MSG_NO_DETAILS};
use crate::calendar::{today_in, CalendarEngine, DailyListing, DayCell, MonthlyListing, TIME_NOT_SPECIFIED};
use crate::config::Settings;
use crate::database::{Database, VisitedSet};
use crate::error::LoadError;
use crate::models::{LoadStatus, MonthStep, PlanRecord, PopupMode, StatusBucket};
use crate::report::{VISITED_MARK, WEEKDAY_HEADER};
use crate::source;

const TAB_TITLES: [&str; 2] = ["保養行事曆", "修繕紀錄"];

/// One line of the repair list. Only cards can be selected.
#[derive(Debug, Clone, PartialEq)]
enum Row {
    Heading(String),
    Message(&'static str),
    Card(CardView),
}

fn plan_rows(view: &PlansView) -> Vec<Row> {
    let PlansView::Groups(groups) = view else {
        return view.message().map(Row::Message).into_iter().collect();
    };
    let mut rows = Vec::new();
    for group in groups {
        rows.push(Row::Heading(group.heading.clone()));
        match group.empty_message() {
            Some(message) => rows.push(Row::Message(message)),
            None => rows.extend(group.cards.iter().cloned().map(Row::Card)),
        }
    }
    rows
}

/// `#rgb` or `#rrggbb`.
fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let expand = |i: usize| channel(hex[i..i + 1].repeat(2).as_str());
            Some(Color::Rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

fn status_banner(status: &LoadStatus) -> Option<String> {
    let banner = status.banner()?;
    Some(match status {
        LoadStatus::Failed(_) => format!("{}（按 r 重試）", banner),
        _ => banner,
    })
}

pub struct App {
    db: Database,
    settings: Settings,
    pub current_tab: usize,
    pub calendar: CalendarEngine,
    pub browser: PlanBrowser,
    pub card_list_state: ListState,
    pub should_quit: bool,
    pub input_buffer: String,
    pub popup_mode: PopupMode,
    pub notice: Option<String>,
}

impl App {
    pub fn new(db: Database, settings: Settings) -> Result<Self> {
        let offset = settings.offset();
        let visited = VisitedSet::load(&db);
        let mut app = App {
            db,
            settings,
            current_tab: 0,
            calendar: CalendarEngine::starting_today(offset),
            browser: PlanBrowser::new(visited, offset),
            card_list_state: ListState::default(),
            should_quit: false,
            input_buffer: String::new(),
            popup_mode: PopupMode::None,
            notice: None,
        };
        app.refresh_data();
        Ok(app)
    }

    /// Refetches both endpoints. Failures end up in each view's banner.
    pub fn refresh_data(&mut self) {
        let offset = self.settings.offset();

        let schedule = source::open_source(&self.settings.schedule_source)
            .map_err(|e| LoadError::Transport(e.to_string()))
            .and_then(|src| source::load(src.as_ref(), offset))
            .map(|dataset| dataset.into_flat());
        self.calendar.load(schedule);

        let repairs = source::open_source(&self.settings.repair_source)
            .map_err(|e| LoadError::Transport(e.to_string()))
            .and_then(|src| source::load(src.as_ref(), offset))
            .map(|dataset| dataset.into_groups());
        self.browser.load(repairs);

        self.notice = None;
        self.select_first_card();
    }

    pub fn next_tab(&mut self) {
        self.current_tab = (self.current_tab + 1) % TAB_TITLES.len();
    }

    pub fn previous_tab(&mut self) {
        self.current_tab = if self.current_tab == 0 { TAB_TITLES.len() - 1 } else { self.current_tab - 1 };
    }

    // Calendar tab

    /// Moves the selected day by `delta` days, following it into the
    /// neighbouring month when it leaves the visible one.
    pub fn move_day(&mut self, delta: i64) {
        let visible = |date: &NaiveDate| self.calendar.is_visible(*date);
        let base = self
            .calendar
            .selected()
            .filter(visible)
            .or_else(|| self.calendar.today().filter(visible))
            .unwrap_or_else(|| self.calendar.cursor());

        let target = if delta >= 0 {
            base.checked_add_days(Days::new(delta.unsigned_abs()))
        } else {
            base.checked_sub_days(Days::new(delta.unsigned_abs()))
        };
        let Some(target) = target else {
            return;
        };

        if !self.calendar.is_visible(target) {
            if let Err(e) = self.calendar.set_month(target.year(), target.month0()) {
                log::warn!("{:#}", e);
                return;
            }
        }
        self.calendar.select_date(target);
    }

    pub fn change_month(&mut self, step: MonthStep) {
        self.calendar.change_month(step);
    }

    pub fn jump_to_today(&mut self) {
        let today = today_in(self.settings.offset());
        if let Err(e) = self.calendar.set_month(today.year(), today.month0()) {
            log::warn!("{:#}", e);
            return;
        }
        self.calendar.select_date(today);
        self.calendar.highlight_today();
    }

    // Repairs tab

    fn rows(&self) -> Vec<Row> {
        plan_rows(&self.browser.render_plans())
    }

    fn select_first_card(&mut self) {
        let first = self.rows().iter().position(|row| matches!(row, Row::Card(_)));
        self.card_list_state.select(first);
    }

    pub fn selected_card(&self) -> Option<CardView> {
        let index = self.card_list_state.selected()?;
        match self.rows().into_iter().nth(index)? {
            Row::Card(card) => Some(card),
            _ => None,
        }
    }

    /// Steps to the next (or previous) card row, wrapping around.
    pub fn move_card(&mut self, forward: bool) {
        let rows = self.rows();
        let cards: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches!(row, Row::Card(_)))
            .map(|(i, _)| i)
            .collect();
        if cards.is_empty() {
            self.card_list_state.select(None);
            return;
        }

        let current = self
            .card_list_state
            .selected()
            .and_then(|i| cards.iter().position(|&c| c == i));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % cards.len(),
            (Some(0), false) => cards.len() - 1,
            (Some(i), false) => i - 1,
        };
        self.card_list_state.select(Some(cards[next]));
    }

    pub fn handle_card(&mut self, event: CardEvent) {
        let Some(card) = self.selected_card() else {
            return;
        };
        if let Err(e) = self.browser.handle_card(&card.id, event, &mut self.db) {
            log::error!("Could not update card {}: {:#}", card.id, e);
            self.notice = Some(format!("無法更新紀錄：{}", e));
        }
    }

    pub fn cycle_year(&mut self) {
        let options = self.browser.year_options();
        let current = options
            .iter()
            .position(|(value, _)| value == self.browser.year_filter())
            .unwrap_or(0);
        let (value, _) = &options[(current + 1) % options.len()];
        let value = value.clone();
        self.browser.set_year(&value);
        self.select_first_card();
    }

    pub fn apply_bucket(&mut self, bucket: StatusBucket) {
        self.browser.apply_bucket(bucket);
        self.select_first_card();
    }

    pub fn show_search_popup(&mut self) {
        self.input_buffer = self.browser.search().to_string();
        self.popup_mode = PopupMode::Search;
    }

    pub fn close_popup(&mut self) {
        self.popup_mode = PopupMode::None;
        self.input_buffer.clear();
    }

    pub fn handle_popup_input(&mut self, c: char) {
        self.input_buffer.push(c);
        self.browser.set_search(&self.input_buffer);
        self.select_first_card();
    }

    pub fn handle_backspace(&mut self) {
        self.input_buffer.pop();
        self.browser.set_search(&self.input_buffer);
        self.select_first_card();
    }

    pub fn cancel_search(&mut self) {
        self.browser.set_search("");
        self.close_popup();
        self.select_first_card();
    }
}

pub fn run_tui(db: Database, settings: Settings) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = App::new(db, settings).and_then(|mut app| Ok(run_app(&mut terminal, &mut app)?));

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if app.popup_mode == PopupMode::Search {
                match key.code {
                    KeyCode::Esc => app.cancel_search(),
                    KeyCode::Enter => app.close_popup(),
                    KeyCode::Char(c) => app.handle_popup_input(c),
                    KeyCode::Backspace => app.handle_backspace(),
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') => app.should_quit = true,
                KeyCode::Tab => app.next_tab(),
                KeyCode::BackTab => app.previous_tab(),
                KeyCode::Char('r') => app.refresh_data(),
                code if app.current_tab == 0 => match code {
                    KeyCode::Left => app.move_day(-1),
                    KeyCode::Right => app.move_day(1),
                    KeyCode::Up => app.move_day(-7),
                    KeyCode::Down => app.move_day(7),
                    KeyCode::Char('[') => app.change_month(MonthStep::Prev),
                    KeyCode::Char(']') => app.change_month(MonthStep::Next),
                    KeyCode::Char('t') => app.jump_to_today(),
                    _ => {}
                },
                code => match code {
                    KeyCode::Down => app.move_card(true),
                    KeyCode::Up => app.move_card(false),
                    KeyCode::Enter | KeyCode::Char(' ') => app.handle_card(CardEvent::Activate),
                    KeyCode::Esc => app.handle_card(CardEvent::Escape),
                    KeyCode::Char('y') => app.cycle_year(),
                    KeyCode::Char('/') => app.show_search_popup(),
                    KeyCode::Char(c @ '1'..='4') => {
                        let index = c as usize - '1' as usize;
                        app.apply_bucket(StatusBucket::ALL_BUCKETS[index]);
                    }
                    _ => {}
                },
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(f.area());

    let counts = [app.calendar.status(), app.browser.status()].map(|status| match status {
        LoadStatus::Ready(n) => n.to_string(),
        _ => "-".to_string(),
    });
    let titles: Vec<Line> = TAB_TITLES
        .iter()
        .zip(counts)
        .map(|(title, count)| Line::from(format!("{} ({})", title, count)))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Upkeep"))
        .select(app.current_tab)
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::Black),
        );
    f.render_widget(tabs, chunks[0]);

    let status = match app.current_tab {
        0 => app.calendar.status().clone(),
        _ => app.browser.status().clone(),
    };
    let banner = status_banner(&status).or_else(|| app.notice.clone());
    let body = match banner {
        Some(text) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)].as_ref())
                .split(chunks[1]);
            let style = match status {
                LoadStatus::Failed(_) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                _ => Style::default().fg(Color::Yellow),
            };
            f.render_widget(Paragraph::new(text).style(style), parts[0]);
            parts[1]
        }
        None => chunks[1],
    };

    match app.current_tab {
        0 => render_calendar(f, app, body),
        _ => render_repairs(f, app, body),
    }

    if app.popup_mode == PopupMode::Search {
        let popup_area = centered_rect(60, 20, f.area());
        let block = Block::default()
            .title("搜尋修繕紀錄")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::DarkGray));
        let content = Paragraph::new(format!(
            "標題、狀態、日期或金額：\n\n{}\n\nEnter 確認 / Esc 清除",
            app.input_buffer
        ))
        .block(block)
        .alignment(ratatui::layout::Alignment::Center)
        .style(Style::default().fg(Color::White));
        f.render_widget(Clear, popup_area);
        f.render_widget(content, popup_area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn plan_item(plan: &PlanRecord, with_date: bool) -> ListItem<'static> {
    let swatch = plan
        .color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or(Color::Cyan);
    let time = plan.time.as_deref().filter(|t| !t.is_empty()).unwrap_or(TIME_NOT_SPECIFIED);
    let mut spans = vec![Span::styled("■ ", Style::default().fg(swatch))];
    if with_date {
        spans.push(Span::styled(format!("{} ", plan.date), Style::default().fg(Color::Gray)));
    }
    spans.push(Span::styled(format!("{}  ", time), Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(plan.title.clone()));
    ListItem::new(Line::from(spans))
}

fn message_item(message: &str) -> ListItem<'static> {
    ListItem::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
}

fn render_calendar(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(0)].as_ref())
        .split(area);

    let grid = app.calendar.render_grid();
    let mut lines = vec![Line::from(
        WEEKDAY_HEADER
            .iter()
            .map(|name| Span::styled(format!("  {}", name), Style::default().fg(Color::Gray)))
            .collect::<Vec<_>>(),
    )];
    for week in grid.weeks() {
        let spans: Vec<Span> = week
            .iter()
            .map(|cell| match cell {
                DayCell::Padding => Span::raw("    "),
                DayCell::Day(info) => {
                    let mark = if info.has_plans() { '*' } else { ' ' };
                    let mut style = Style::default().fg(Color::White);
                    if info.has_plans() {
                        style = style.fg(Color::LightGreen);
                    }
                    if info.is_today {
                        style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                    }
                    if info.is_selected {
                        style = style.bg(Color::Cyan).fg(Color::Black);
                    }
                    Span::styled(format!(" {:>2}{}", info.day, mark), style)
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    let hint = Style::default().fg(Color::DarkGray);
    lines.push(Line::from(Span::styled("←→↑↓ 選擇日期  [ ] 切換月份", hint)));
    lines.push(Line::from(Span::styled("t 今天  r 重新載入  q 離開", hint)));

    let tooltip = grid
        .days()
        .find(|d| d.is_selected)
        .map(|d| match d.tooltip() {
            Some(t) => format!("  {} ({})", d.key, t),
            None => format!("  {}", d.key),
        })
        .unwrap_or_default();
    let grid_widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{}{}", app.calendar.render_header(), tooltip)),
    );
    f.render_widget(grid_widget, chunks[0]);

    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(chunks[1]);

    let daily = app.calendar.render_daily();
    let daily_title = match &daily {
        DailyListing::Plans { date, .. } | DailyListing::NoPlans(date) => {
            format!("當日計畫 {}", date.format("%Y-%m-%d"))
        }
        DailyListing::NoDateSelected => "當日計畫".to_string(),
    };
    let daily_items: Vec<ListItem> = match &daily {
        DailyListing::Plans { plans, .. } => plans.iter().map(|p| plan_item(p, false)).collect(),
        other => other.message().map(message_item).into_iter().collect(),
    };
    f.render_widget(
        List::new(daily_items).block(Block::default().borders(Borders::ALL).title(daily_title)),
        lists[0],
    );

    let monthly_items: Vec<ListItem> = match app.calendar.render_monthly() {
        MonthlyListing::Plans(plans) => plans.iter().map(|p| plan_item(p, true)).collect(),
        other => other.message().map(message_item).into_iter().collect(),
    };
    f.render_widget(
        List::new(monthly_items).block(Block::default().borders(Borders::ALL).title("本月計畫")),
        lists[1],
    );
}

fn render_repairs(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let year_label = app
        .browser
        .year_options()
        .into_iter()
        .find(|(value, _)| value == app.browser.year_filter())
        .map(|(_, label)| label)
        .unwrap_or_else(|| app.browser.year_filter().to_string());
    let bucket_label = app.browser.bucket().map(|b| b.label()).unwrap_or("-");
    let filters = Paragraph::new(Line::from(vec![
        Span::styled("年度 ", Style::default().fg(Color::Gray)),
        Span::styled(year_label, Style::default().fg(Color::Cyan)),
        Span::styled("  搜尋 ", Style::default().fg(Color::Gray)),
        Span::styled(app.browser.search().to_string(), Style::default().fg(Color::Cyan)),
        Span::styled("  篩選 ", Style::default().fg(Color::Gray)),
        Span::styled(bucket_label, Style::default().fg(Color::Cyan)),
    ]))
    .block(Block::default().borders(Borders::ALL).title(
        "y 年度  / 搜尋  1 今年  2 已完成  3 未完成  4 全部",
    ));
    f.render_widget(filters, chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(chunks[1]);

    let items: Vec<ListItem> = app
        .rows()
        .iter()
        .map(|row| match row {
            Row::Heading(heading) => ListItem::new(Line::from(Span::styled(
                heading.clone(),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            ))),
            Row::Message(message) => message_item(message),
            Row::Card(card) => {
                let status_color = if card.status_label == "已完成" { Color::Green } else { Color::Red };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        if card.visited { format!("{} ", VISITED_MARK) } else { "  ".to_string() },
                        Style::default().fg(Color::Blue),
                    ),
                    Span::styled(format!("{}  ", card.date_display), Style::default().fg(Color::Gray)),
                    Span::raw(format!("{}  ", card.title)),
                    Span::styled(card.status_label, Style::default().fg(status_color)),
                ]))
            }
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            "修繕紀錄（已查看 {}）",
            app.browser.visited().ids().len()
        )))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, panes[0], &mut app.card_list_state);

    let details = match app.selected_card() {
        Some(card) if card.expanded => card_details(&card),
        Some(card) => vec![
            Line::from(card.title),
            Line::from(""),
            Line::from(Span::styled("Enter / Space 展開", Style::default().fg(Color::DarkGray))),
        ],
        None => vec![Line::from(Span::styled(
            "↑/↓ 選擇紀錄",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    f.render_widget(
        Paragraph::new(details)
            .block(Block::default().borders(Borders::ALL).title("詳細資訊"))
            .wrap(Wrap { trim: false }),
        panes[1],
    );
}

fn card_details(card: &CardView) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(card.title.clone(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(format!("{}  {}", card.date_display, card.status_label)),
        Line::from(""),
    ];
    for detail in &card.details {
        match detail {
            DetailLine::Details { heading, lines: text } => {
                lines.push(Line::from(Span::styled(*heading, Style::default().add_modifier(Modifier::BOLD))));
                lines.extend(text.iter().cloned().map(Line::from));
            }
            DetailLine::Amount(text) => {
                lines.push(Line::from(Span::styled(text.clone(), Style::default().fg(Color::Yellow))))
            }
            DetailLine::Photos(urls) => lines.extend(
                urls.iter()
                    .map(|url| Line::from(Span::styled(format!("照片：{}", url), Style::default().fg(Color::Blue)))),
            ),
            DetailLine::Placeholder => lines.push(Line::from(MSG_NO_DETAILS)),
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Esc 收合", Style::default().fg(Color::DarkGray))));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::card_view;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#007bff"), Some(Color::Rgb(0, 123, 255)));
        assert_eq!(parse_hex_color("#fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(parse_hex_color("blue"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn empty_groups_keep_their_heading() {
        let plan = PlanRecord::new("r1", "2025-02-01").with_title("Roof");
        let view = PlansView::Groups(vec![
            crate::browser::GroupView {
                heading: "2025 年修繕紀錄".to_string(),
                year: Some(2025),
                cards: vec![card_view(&plan, false)],
            },
            crate::browser::GroupView {
                heading: "2024 年修繕紀錄".to_string(),
                year: Some(2024),
                cards: Vec::new(),
            },
        ]);
        let rows = plan_rows(&view);
        assert_eq!(rows.len(), 4);
        assert!(matches!(rows[1], Row::Card(_)));
        assert_eq!(rows[3], Row::Message(crate::browser::MSG_NO_MATCHES));
        assert_eq!(plan_rows(&PlansView::NoData), vec![Row::Message(crate::browser::MSG_NO_DATA)]);
    }

    #[test]
    fn only_failures_offer_retry() {
        assert!(status_banner(&LoadStatus::Failed("x".into())).unwrap().contains("按 r 重試"));
        assert_eq!(status_banner(&LoadStatus::Ready(3)), None);
        assert!(!status_banner(&LoadStatus::Loading).unwrap().contains("重試"));
    }
}
