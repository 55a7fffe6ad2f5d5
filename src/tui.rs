use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::HashMap;
use std::io::stdout;

use crate::community::suggest_mentors;
use crate::db::Database;
use crate::models::{ReferralOpportunity, User};
use crate::referral::{toggle_opportunity, visible_opportunities};
use crate::role::{is_mentor_candidate, Role};
use crate::session::Session;
use crate::views::user_name;

struct AppState {
    opportunities: Vec<ReferralOpportunity>,
    posters: HashMap<i64, User>,
    mentors: Vec<User>,
    selected: usize,
    scroll_offset: u16,
    can_toggle: bool,
    today: NaiveDate,
    status_line: Option<String>,
}

impl AppState {
    fn load(db: &Database, session: &Session, today: NaiveDate) -> Result<Self> {
        let users = db.list_users(None, None)?;
        let mentors = users
            .iter()
            .filter(|u| u.id != session.user_id() && is_mentor_candidate(u))
            .cloned()
            .collect();
        Ok(Self {
            opportunities: visible_opportunities(db, session, None)?,
            posters: users.into_iter().map(|u| (u.id, u)).collect(),
            mentors,
            selected: 0,
            scroll_offset: 0,
            can_toggle: session.role == Role::Admin,
            today,
            status_line: None,
        })
    }

    fn current(&self) -> Option<&ReferralOpportunity> {
        self.opportunities.get(self.selected)
    }

    fn next(&mut self) {
        if self.selected + 1 < self.opportunities.len() {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Flips the selected posting's `is_active` and keeps the list in sync.
    fn toggle_selected(&mut self, db: &Database, session: &Session) {
        if !self.can_toggle {
            self.status_line = Some("Only admins can activate or deactivate postings".into());
            return;
        }
        let Some(id) = self.current().map(|o| o.id) else {
            return;
        };
        match toggle_opportunity(db, session, id) {
            Ok(updated) => {
                self.status_line = Some(format!(
                    "#{} is now {}",
                    updated.id,
                    if updated.is_active { "active" } else { "inactive" }
                ));
                if let Some(slot) = self.opportunities.get_mut(self.selected) {
                    *slot = updated;
                }
            }
            Err(e) => self.status_line = Some(e.to_string()),
        }
    }
}

pub fn run_browse(db: &Database, session: &Session, today: NaiveDate) -> Result<()> {
    let mut state = AppState::load(db, session, today)?;
    if state.opportunities.is_empty() {
        println!("No opportunities posted yet.");
        return Ok(());
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db, session);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
    session: &Session,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('t') => state.toggle_selected(db, session),
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    let items: Vec<ListItem> = state
        .opportunities
        .iter()
        .map(|o| {
            let marker = if !o.is_active {
                "-"
            } else if o.accepts_applications(state.today) {
                " "
            } else {
                "x"
            };
            ListItem::new(format!(
                "{} #{:<4} {} | {}",
                marker,
                o.id,
                crate::truncate(&o.position, 30),
                o.company_name
            ))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Opportunities ({}) ", state.opportunities.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    let help = match (&state.status_line, state.can_toggle) {
        (Some(msg), _) => format!(" {}", msg),
        (None, true) => " j/k:navigate  J/K:scroll  t:toggle active  q:quit".to_string(),
        (None, false) => " j/k:navigate  J/K:scroll  q:quit".to_string(),
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[1],
    );
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(o) = state.current() else {
        return Text::raw("No opportunity selected");
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        format!("{} at {}", o.position, o.company_name),
        bold,
    )));
    lines.push(Line::from(format!(
        "{} · {}",
        o.job_type,
        o.location.as_deref().unwrap_or("Location not specified")
    )));
    lines.push(Line::from(format!(
        "Posted by {}",
        user_name(state.posters.get(&o.posted_by))
    )));

    let (label, color) = if !o.is_active {
        ("Inactive", Color::DarkGray)
    } else if o.accepts_applications(state.today) {
        ("Accepting applications", Color::Green)
    } else {
        ("Deadline passed", Color::Red)
    };
    lines.push(Line::from(Span::styled(label, Style::default().fg(color))));

    if let Some(deadline) = o.application_deadline {
        lines.push(Line::from(format!("Deadline: {}", deadline.format("%b %-d, %Y"))));
    }
    if let Some(salary) = &o.salary_range {
        lines.push(Line::from(format!("Salary: {}", salary)));
    }
    if !o.required_skills.is_empty() {
        lines.push(Line::from(format!("Skills: {}", o.required_skills.join(", "))));
    }

    lines.push(Line::from(""));
    for line in textwrap::fill(&o.description, 70).lines() {
        lines.push(Line::from(line.to_string()));
    }

    let suggested = suggest_mentors(&state.mentors, o);
    if !suggested.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Mentors who can help", bold)));
        for m in suggested {
            let at = m
                .current_company
                .as_deref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default();
            lines.push(Line::from(format!("  #{} {}{}", m.id, m.full_name, at)));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{opportunity, user};
    use crate::referral::tests::{admin_session, today};

    #[test]
    fn test_navigation_stays_in_bounds() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        opportunity(&db, admin.user_id(), "Acme");
        opportunity(&db, admin.user_id(), "Globex");
        let mut state = AppState::load(&db, &admin, today()).unwrap();

        state.prev();
        assert_eq!(state.selected, 0);
        state.next();
        state.next();
        assert_eq!(state.selected, 1);
        state.scroll_down();
        state.prev();
        assert_eq!(state.scroll_offset, 0);
    }

    #[test]
    fn test_toggle_from_browser() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let opp = opportunity(&db, admin.user_id(), "Acme");

        let mut as_student = AppState::load(&db, &student, today()).unwrap();
        as_student.toggle_selected(&db, &student);
        assert!(db.get_opportunity(opp.id).unwrap().unwrap().is_active);

        let mut as_admin = AppState::load(&db, &admin, today()).unwrap();
        as_admin.toggle_selected(&db, &admin);
        assert!(!as_admin.opportunities[0].is_active);
        assert!(!db.get_opportunity(opp.id).unwrap().unwrap().is_active);

        // students only see active postings
        let reloaded = AppState::load(&db, &student, today()).unwrap();
        assert!(reloaded.opportunities.is_empty());
    }
}
