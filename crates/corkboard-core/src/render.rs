use std::io::{self, IsTerminal, Write};

use corkboard_shared::dates::{format_card_date, format_project_date};
use corkboard_shared::{ProjectDto, TaskDto, TaskPriority, TaskStatus};
use unicode_width::UnicodeWidthStr;

use crate::session::Session;
use crate::workspace::{LoadState, Notice, Workspace};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn write_session<W: Write>(&self, out: &mut W, session: &Session) -> anyhow::Result<()> {
        match session.current_user() {
            Some(user) => writeln!(
                out,
                "[{}] {} <{}>",
                self.paint(&user.initials(), "36"),
                user.name,
                user.email
            )?,
            None => writeln!(out, "(signed out)")?,
        }
        Ok(())
    }

    /// One section per status column, cards in
    /// display order.
    #[tracing::instrument(skip_all)]
    pub fn write_board<W: Write>(&self, out: &mut W, ws: &Workspace) -> anyhow::Result<()> {
        let columns = match ws.load_state() {
            LoadState::Failed(err) => {
                writeln!(out, "{}", self.paint(&format!("board unavailable: {err}"), "31"))?;
                return Ok(());
            }
            LoadState::Idle => {
                writeln!(out, "no project loaded")?;
                return Ok(());
            }
            LoadState::Loaded(_) => ws.columns()?,
        };

        for (status, ids) in columns.iter() {
            writeln!(
                out,
                "{} ({})",
                self.paint(status.label(), status_color(status)),
                ids.len()
            )?;
            let rows = ids
                .iter()
                .filter_map(|id| ws.task(id))
                .map(|task| self.card_row(task, ws.queue().has_pending(&task.id)))
                .collect::<Vec<_>>();
            if rows.is_empty() {
                writeln!(out, "  (empty)")?;
            } else {
                write_table(
                    &mut *out,
                    ["", "Title", "Priority", "Due", "Who", "Subtasks", "Tags"],
                    rows,
                )?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn write_projects<W: Write>(
        &self,
        out: &mut W,
        projects: &[ProjectDto],
    ) -> anyhow::Result<()> {
        let rows = projects
            .iter()
            .map(|project| {
                let status = if project.is_active() {
                    self.paint(&project.status, "32")
                } else {
                    project.status.clone()
                };
                vec![
                    project.name.clone(),
                    status,
                    project.member_count().to_string(),
                    project
                        .due_date
                        .map(format_project_date)
                        .unwrap_or_default(),
                ]
            })
            .collect();
        write_table(out, ["Project", "Status", "Members", "Due"], rows)
    }

    pub fn write_notices<W: Write>(&self, out: &mut W, notices: &[Notice]) -> anyhow::Result<()> {
        for notice in notices {
            writeln!(out, "{} {notice}", self.paint("!", "31"))?;
        }
        Ok(())
    }

    fn card_row(&self, task: &TaskDto, pending: bool) -> Vec<String> {
        let marker = if pending { "*" } else { "" };
        let subtasks = if task.subtasks.is_empty() {
            String::new()
        } else {
            format!("{}/{}", task.completed_subtasks(), task.subtasks.len())
        };
        vec![
            marker.to_string(),
            task.title.clone(),
            self.paint(task.priority.label(), priority_color(task.priority)),
            task.due_date.map(format_card_date).unwrap_or_default(),
            task.assignee
                .as_ref()
                .map(|user| user.initials())
                .unwrap_or_default(),
            subtasks,
            task.tags
                .iter()
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" "),
        ]
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "37",
        TaskStatus::InProgress => "33",
        TaskStatus::Done => "32",
    }
}

fn priority_color(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "37",
        TaskPriority::Medium => "34",
        TaskPriority::High => "33",
        TaskPriority::Urgent => "31",
    }
}

fn write_table<W: Write, const N: usize>(
    mut writer: W,
    headers: [&str; N],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths = headers.map(|header| header.width());

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(N) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write!(writer, " ")?;
    for (header, width) in headers.iter().zip(widths) {
        write!(writer, " {header:width$}")?;
    }
    writeln!(writer)?;

    for row in rows {
        write!(writer, " ")?;
        for (cell, width) in row.iter().zip(widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, " {}{}", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
