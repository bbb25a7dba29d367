use crate::controller::{BulkAction, BulkReport, TaskListController};
use crate::error::Result;
use crate::filter::{DateRange, TaskFilter};
use crate::session::Session;
use crate::store::TaskStore;
use crate::task::{Category, NewTask, Task, TaskPatch, TaskStatus};
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Board,
}

#[derive(Debug)]
struct ViewState {
    mode: ViewMode,
    column: usize,
    row: usize,
    message: Option<String>,
}

impl ViewState {
    fn new() -> Self {
        Self {
            mode: ViewMode::List,
            column: 0,
            row: 0,
            message: None,
        }
    }
}

enum Flow {
    Continue,
    Redraw,
    Quit,
}

/// Run the interactive board until the user quits.
pub fn run<S: TaskStore>(
    controller: &mut TaskListController<S>,
    session: &Session,
    runtime: &Runtime,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, controller, session, runtime);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn run_app<B: Backend, S: TaskStore>(
    terminal: &mut Terminal<B>,
    controller: &mut TaskListController<S>,
    session: &Session,
    runtime: &Runtime,
) -> Result<()> {
    let mut state = ViewState::new();
    loop {
        clamp_cursor(controller, &mut state);
        terminal.draw(|f| draw(f, controller, session, &state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match handle_key(key.code, controller, &mut state, runtime) {
                Flow::Quit => return Ok(()),
                Flow::Redraw => terminal.clear()?,
                Flow::Continue => {}
            }
        }
    }
}

fn visible<'a, S: TaskStore>(controller: &'a TaskListController<S>, state: &ViewState) -> Vec<&'a Task> {
    let groups = controller.grouped();
    match state.mode {
        ViewMode::Board => groups
            .into_iter()
            .nth(state.column)
            .map(|(_, tasks)| tasks)
            .unwrap_or_default(),
        ViewMode::List => groups.into_iter().flat_map(|(_, tasks)| tasks).collect(),
    }
}

fn current_id<S: TaskStore>(controller: &TaskListController<S>, state: &ViewState) -> Option<String> {
    visible(controller, state).get(state.row).map(|t| t.id.clone())
}

fn clamp_cursor<S: TaskStore>(controller: &TaskListController<S>, state: &mut ViewState) {
    let len = visible(controller, state).len();
    state.row = state.row.min(len.saturating_sub(1));
}

fn handle_key<S: TaskStore>(
    code: KeyCode,
    controller: &mut TaskListController<S>,
    state: &mut ViewState,
    runtime: &Runtime,
) -> Flow {
    match code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Tab => {
            state.mode = match state.mode {
                ViewMode::List => ViewMode::Board,
                ViewMode::Board => ViewMode::List,
            };
            state.row = 0;
        }
        KeyCode::Left if state.mode == ViewMode::Board => {
            if state.column > 0 {
                state.column -= 1;
                state.row = 0;
            }
        }
        KeyCode::Right if state.mode == ViewMode::Board => {
            if state.column < TaskStatus::ALL.len() - 1 {
                state.column += 1;
                state.row = 0;
            }
        }
        KeyCode::Up => {
            state.row = state.row.saturating_sub(1);
        }
        KeyCode::Down => {
            let max_tasks = visible(controller, state).len();
            if state.row + 1 < max_tasks {
                state.row += 1;
            }
        }
        KeyCode::Enter | KeyCode::Char('>') => shift_current(controller, state, runtime, TaskStatus::next),
        KeyCode::Char('<') => shift_current(controller, state, runtime, TaskStatus::prev),
        KeyCode::Char(' ') => {
            if let Some(id) = current_id(controller, state) {
                controller.toggle_selection(&id);
            }
        }
        KeyCode::Esc => controller.clear_selection(),
        KeyCode::Char(digit @ '1'..='3') => {
            let status = TaskStatus::ALL[digit as usize - '1' as usize];
            if controller.selected().is_empty() {
                if let Some(id) = current_id(controller, state) {
                    let result = runtime.block_on(controller.move_task(&id, status));
                    state.message = Some(outcome(result.map(|t| format!("Moved to {}", t.status))));
                }
            } else {
                let report = runtime.block_on(controller.bulk_apply_selected(BulkAction::SetStatus(status)));
                state.message = Some(report_message(&report));
            }
        }
        KeyCode::Char('d') => {
            if controller.selected().is_empty() {
                if let Some(id) = current_id(controller, state) {
                    let result = runtime.block_on(controller.delete_task(&id));
                    state.message = Some(outcome(result.map(|()| "Task deleted".to_string())));
                }
            } else {
                let report = runtime.block_on(controller.bulk_apply_selected(BulkAction::Delete));
                state.message = Some(report_message(&report));
            }
        }
        KeyCode::Char('c') => {
            let mut filter = controller.filter().clone();
            filter.category = match filter.category {
                None => Some(Category::Work),
                Some(Category::Work) => Some(Category::Personal),
                Some(Category::Personal) => None,
            };
            controller.set_filter(filter);
        }
        KeyCode::Char('x') => controller.clear_filters(),
        KeyCode::Char('/') => {
            if let Some(text) = prompt("Search tasks") {
                controller.set_search(text);
            }
            return Flow::Redraw;
        }
        KeyCode::Char('r') => {
            if let Some(raw) = prompt("Due date range (YYYY-MM-DD YYYY-MM-DD, empty to clear)") {
                let mut filter: TaskFilter = controller.filter().clone();
                match parse_range(&raw) {
                    Ok(due) => {
                        filter.due = due;
                        controller.set_filter(filter);
                    }
                    Err(message) => state.message = Some(message),
                }
            }
            return Flow::Redraw;
        }
        KeyCode::Char('a') => {
            if let Some(task) = prompt_new_task() {
                let result = runtime.block_on(controller.add_task(task));
                state.message = Some(outcome(result.map(|t| format!("Added {}", t.title))));
            } else {
                state.message = Some("Add cancelled".to_string());
            }
            return Flow::Redraw;
        }
        KeyCode::Char('e') => {
            let Some(task) = current_id(controller, state).and_then(|id| controller.task(&id).cloned()) else {
                return Flow::Continue;
            };
            let Some(answers) = prompt_edit(&task) else {
                state.message = Some("Edit cancelled".to_string());
                return Flow::Redraw;
            };
            match edit_patch(&task, &answers) {
                Ok(patch) if patch.is_empty() => state.message = Some("Nothing changed".to_string()),
                Ok(patch) => {
                    let result = runtime.block_on(controller.update_task(&task.id, patch));
                    state.message = Some(outcome(result.map(|_| "Task updated".to_string())));
                }
                Err(message) => state.message = Some(message),
            }
            return Flow::Redraw;
        }
        _ => {}
    }
    Flow::Continue
}

fn shift_current<S: TaskStore>(
    controller: &mut TaskListController<S>,
    state: &mut ViewState,
    runtime: &Runtime,
    step: fn(TaskStatus) -> TaskStatus,
) {
    let Some(id) = current_id(controller, state) else {
        return;
    };
    let Some(status) = controller.task(&id).map(|t| step(t.status)) else {
        return;
    };
    let result = runtime.block_on(controller.move_task(&id, status));
    state.message = Some(outcome(result.map(|t| format!("Moved to {}", t.status))));
}

fn outcome(result: Result<String>) -> String {
    match result {
        Ok(message) => message,
        Err(err) => format!("Error: {err}"),
    }
}

fn report_message(report: &BulkReport) -> String {
    if report.is_complete() {
        format!("{} task(s) updated", report.succeeded.len())
    } else {
        format!(
            "{} task(s) updated, {} failed",
            report.succeeded.len(),
            report.failed.len()
        )
    }
}

fn parse_range(raw: &str) -> std::result::Result<Option<DateRange>, String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [] => Ok(None),
        [start, end] => {
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            Ok(Some(DateRange::new(start, end)))
        }
        _ => Err("Expected two dates".to_string()),
    }
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("Invalid date: {raw}"))
}

fn prompt_new_task() -> Option<NewTask> {
    let title = prompt("Enter task title")?;
    let due_date = parse_date(&prompt("Enter due date (YYYY-MM-DD)")?).ok()?;
    let categories = prompt("Enter categories (Work, Personal)")?
        .split(',')
        .filter_map(|raw| raw.parse::<Category>().ok())
        .collect::<Vec<_>>();
    let description = prompt("Enter description (optional)").unwrap_or_default();
    Some(NewTask::new(title, due_date, categories).with_description(description))
}

/// Raw answers to the edit prompts. Empty keeps the current value; `-`
/// clears the description or attachment.
#[derive(Debug, Default)]
struct EditAnswers {
    title: String,
    description: String,
    due_date: String,
    categories: String,
    status: String,
    attachment: String,
}

fn prompt_edit(task: &Task) -> Option<EditAnswers> {
    Some(EditAnswers {
        title: prompt(&format!("Title [{}]", task.title))?,
        description: prompt(&format!("Description [{}] (- to clear)", task.description))?,
        due_date: prompt(&format!("Due date [{}]", task.due_date))?,
        categories: prompt(&format!("Categories [{}]", task.categories_label()))?,
        status: prompt(&format!("Status [{}]", task.status))?,
        attachment: prompt(&format!(
            "Attachment [{}] (- to clear)",
            task.attachment.as_deref().unwrap_or("")
        ))?,
    })
}

/// Patch holding only the fields whose answer differs from `task`.
fn edit_patch(task: &Task, answers: &EditAnswers) -> std::result::Result<TaskPatch, String> {
    let mut patch = TaskPatch::default();

    let title = answers.title.trim();
    if !title.is_empty() && title != task.title {
        patch.title = Some(title.to_string());
    }

    match answers.description.trim() {
        "" => {}
        "-" if !task.description.is_empty() => patch.description = Some(String::new()),
        "-" => {}
        description if description != task.description => {
            patch.description = Some(description.to_string());
        }
        _ => {}
    }

    if !answers.due_date.trim().is_empty() {
        let due_date = parse_date(answers.due_date.trim())?;
        if due_date != task.due_date {
            patch.due_date = Some(due_date);
        }
    }

    if !answers.categories.trim().is_empty() {
        let category = answers
            .categories
            .split(',')
            .map(|raw| raw.parse::<Category>().map_err(|err| err.to_string()))
            .collect::<std::result::Result<std::collections::BTreeSet<_>, _>>()?;
        if category != task.category {
            patch.category = Some(category);
        }
    }

    if !answers.status.trim().is_empty() {
        let status = answers.status.parse::<TaskStatus>().map_err(|err| err.to_string())?;
        if status != task.status {
            patch.status = Some(status);
        }
    }

    match answers.attachment.trim() {
        "" => {}
        "-" if task.attachment.is_some() => patch.attachment = Some(None),
        "-" => {}
        attachment if task.attachment.as_deref() != Some(attachment) => {
            patch.attachment = Some(Some(attachment.to_string()));
        }
        _ => {}
    }

    Ok(patch)
}

fn draw<S: TaskStore>(f: &mut Frame, controller: &TaskListController<S>, session: &Session, state: &ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = match state.mode {
        ViewMode::List => "List",
        ViewMode::Board => "Board",
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("TaskBuddy", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  [{title}]  {}", session.display_name())),
        ])),
        rows[0],
    );
    f.render_widget(Paragraph::new(filter_line(controller)), rows[1]);

    match state.mode {
        ViewMode::Board => draw_board(f, rows[2], controller, state),
        ViewMode::List => draw_list(f, rows[2], controller, state),
    }

    f.render_widget(Paragraph::new(footer_line(controller, state)), rows[3]);
}

fn draw_board<S: TaskStore>(f: &mut Frame, area: Rect, controller: &TaskListController<S>, state: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    for (i, (status, tasks)) in controller.grouped().into_iter().enumerate() {
        let items: Vec<ListItem> = tasks.iter().map(|t| task_item(controller, t)).collect();
        let focused = state.column == i;
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!("{} ({})", status, tasks.len()))
                    .borders(Borders::ALL)
                    .border_style(if focused {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default().fg(status_color(status))
                    }),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

        let mut list_state = ListState::default();
        if focused && !tasks.is_empty() {
            list_state.select(Some(state.row));
        }
        f.render_stateful_widget(list, chunks[i], &mut list_state);
    }
}

fn draw_list<S: TaskStore>(f: &mut Frame, area: Rect, controller: &TaskListController<S>, state: &ViewState) {
    let mut items = Vec::new();
    let mut cursor = None;
    let mut index = 0;
    for (status, tasks) in controller.grouped() {
        items.push(ListItem::new(Line::from(Span::styled(
            format!("{} ({})", status, tasks.len()),
            Style::default()
                .fg(status_color(status))
                .add_modifier(Modifier::BOLD),
        ))));
        if tasks.is_empty() {
            items.push(ListItem::new(format!("  No Tasks in {status}")));
        }
        for task in tasks {
            if index == state.row {
                cursor = Some(items.len());
            }
            items.push(task_item(controller, task));
            index += 1;
        }
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    let mut list_state = ListState::default();
    list_state.select(cursor);
    f.render_stateful_widget(list, area, &mut list_state);
}

fn task_item<'a, S: TaskStore>(controller: &TaskListController<S>, t: &'a Task) -> ListItem<'a> {
    let mark = if controller.is_selected(&t.id) { "[x] " } else { "[ ] " };
    let title_style = if t.status == TaskStatus::Done {
        Style::default().fg(Color::White).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    ListItem::new(Line::from(vec![
        Span::raw(mark),
        Span::styled(t.title.as_str(), title_style),
        Span::raw(format!(" (Due: {}) {}", t.due_date, t.categories_label())),
    ]))
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Magenta,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Done => Color::Green,
    }
}

fn filter_line<S: TaskStore>(controller: &TaskListController<S>) -> String {
    let filter = controller.filter();
    let category = filter.category.map_or("any", |c| c.label());
    let due = filter
        .due
        .map(|r| format!("{} - {}", r.start, r.end))
        .unwrap_or_else(|| "any".to_string());
    format!(
        "Category: {category}  Due: {due}  Search: {}  ({} of {} tasks)",
        controller.search(),
        controller.filtered().len(),
        controller.tasks().len()
    )
}

fn footer_line<S: TaskStore>(controller: &TaskListController<S>, state: &ViewState) -> Line<'static> {
    if !controller.selected().is_empty() {
        return Line::from(Span::styled(
            format!(
                "{} Task(s) Selected  [1] To-Do [2] In Progress [3] Completed [d] Delete [Esc] Clear",
                controller.selected().len()
            ),
            Style::default().fg(Color::Black).bg(Color::Gray),
        ));
    }
    match &state.message {
        Some(message) => Line::from(message.clone()),
        None => Line::from(
            "q quit  Tab view  a add  e edit  </> move  space select  / search  c category  r dates  x clear",
        ),
    }
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_accepts_two_dates_or_nothing() {
        assert_eq!(parse_range("  ").unwrap(), None);
        let range = parse_range("2025-01-01 2025-01-31").unwrap().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert!(parse_range("2025-01-01").is_err());
        assert!(parse_range("2025-13-01 2025-01-31").is_err());
    }

    fn sample_task() -> Task {
        NewTask::new("Pay rent", NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), [Category::Personal])
            .with_description("before the 5th")
            .with_attachment("lease.pdf")
            .into_task("t1".into(), "ada", chrono::Utc::now())
    }

    #[test]
    fn blank_edit_answers_change_nothing() {
        let patch = edit_patch(&sample_task(), &EditAnswers::default()).unwrap();
        assert!(patch.is_empty());

        let same = EditAnswers {
            title: "Pay rent".into(),
            status: "todo".into(),
            categories: "personal".into(),
            ..EditAnswers::default()
        };
        assert!(edit_patch(&sample_task(), &same).unwrap().is_empty());
    }

    #[test]
    fn edit_answers_cover_every_field() {
        let answers = EditAnswers {
            title: "Pay rent early".into(),
            description: "-".into(),
            due_date: "2025-03-28".into(),
            categories: "Work, Personal".into(),
            status: "in progress".into(),
            attachment: "-".into(),
        };
        let patch = edit_patch(&sample_task(), &answers).unwrap();
        assert_eq!(patch.title.as_deref(), Some("Pay rent early"));
        assert_eq!(patch.description.as_deref(), Some(""));
        assert_eq!(patch.due_date, NaiveDate::from_ymd_opt(2025, 3, 28));
        assert_eq!(patch.category.unwrap().len(), 2);
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
        assert_eq!(patch.attachment, Some(None));
    }

    #[test]
    fn bad_edit_answers_are_reported() {
        let bad_date = EditAnswers {
            due_date: "28/03/2025".into(),
            ..EditAnswers::default()
        };
        assert_eq!(edit_patch(&sample_task(), &bad_date).unwrap_err(), "Invalid date: 28/03/2025");

        let bad_category = EditAnswers {
            categories: "Work, Errands".into(),
            ..EditAnswers::default()
        };
        assert!(edit_patch(&sample_task(), &bad_category).is_err());
    }

    #[test]
    fn report_message_mentions_failures() {
        let report = BulkReport {
            succeeded: vec!["a".into()],
            failed: vec!["b".into()],
        };
        assert_eq!(report_message(&report), "1 task(s) updated, 1 failed");
    }
}
