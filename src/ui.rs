use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;

use crate::editor::TextEditor;
use crate::models::{
    fold_case, EditorTarget, FilterField, GroupId, PopupMode, Priority, PriorityFilter, Scope, SortSettings,
    TagMode, TaskId, View,
};
use crate::query;
use crate::state::{
    FilterAction, GroupAction, NewTask, Outcome, TaskAction, TaskDisposal, TaskPatch, UiAction,
};
use crate::workspace::Workspace;

const EDITOR_PAGE: usize = 20;

/// Rows of the Filter tab, in display order.
const FILTER_ROWS: usize = 7;

pub struct App {
    ws: Workspace,
    pub group_list_state: ListState,
    pub filter_list_state: ListState,
    pub should_quit: bool,
    pub popup_mode: PopupMode,
    pub input_buffer: String,
    pub status: Option<String>,
    pub text_editor: Option<TextEditor>,
}

impl App {
    pub fn new(ws: Workspace) -> Result<Self> {
        let mut app = App {
            ws,
            group_list_state: ListState::default(),
            filter_list_state: ListState::default(),
            should_quit: false,
            popup_mode: PopupMode::None,
            input_buffer: String::new(),
            status: None,
            text_editor: None,
        };
        app.filter_list_state.select(Some(0));
        app.sync_selection()?;
        Ok(app)
    }

    fn view(&self) -> View {
        self.ws.state().ui().view
    }

    fn visible_ids(&self) -> Vec<TaskId> {
        query::visible_tasks(self.ws.state())
            .iter()
            .map(|task| task.id)
            .collect()
    }

    fn selected_task(&self) -> Option<TaskId> {
        self.ws.state().ui().selected_task
    }

    fn selected_group(&self) -> Option<GroupId> {
        self.group_list_state
            .selected()
            .and_then(|i| self.ws.state().groups().get(i))
            .map(|group| group.id)
    }

    /// Keep the selected task visible and the group cursor in range after
    /// anything that may have changed the lists.
    fn sync_selection(&mut self) -> Result<()> {
        let visible = self.visible_ids();
        let selected = self.selected_task();
        if selected.map_or(true, |id| !visible.contains(&id)) {
            let first = visible.first().copied();
            if first != selected {
                self.ws.dispatch(UiAction::SelectTask(first))?;
            }
        }

        let groups = self.ws.state().groups().len();
        let cursor = match self.group_list_state.selected() {
            _ if groups == 0 => None,
            Some(i) => Some(i.min(groups - 1)),
            None => Some(0),
        };
        self.group_list_state.select(cursor);
        Ok(())
    }

    fn move_task_cursor(&mut self, forward: bool) -> Result<()> {
        let visible = self.visible_ids();
        if visible.is_empty() {
            return Ok(());
        }
        let current = self
            .selected_task()
            .and_then(|id| visible.iter().position(|v| *v == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % visible.len(),
            (Some(0), false) => visible.len() - 1,
            (Some(i), false) => i - 1,
        };
        self.ws.dispatch(UiAction::SelectTask(Some(visible[next])))?;
        Ok(())
    }

    fn move_list_cursor(state: &mut ListState, len: usize, forward: bool) {
        if len == 0 {
            state.select(None);
            return;
        }
        let i = match (state.selected(), forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % len,
            (Some(0), false) => len - 1,
            (Some(i), false) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn next_item(&mut self) -> Result<()> {
        match self.view() {
            View::Tasks => self.move_task_cursor(true)?,
            View::Groups => {
                let len = self.ws.state().groups().len();
                Self::move_list_cursor(&mut self.group_list_state, len, true);
            }
            View::Filter => Self::move_list_cursor(&mut self.filter_list_state, FILTER_ROWS, true),
        }
        Ok(())
    }

    pub fn previous_item(&mut self) -> Result<()> {
        match self.view() {
            View::Tasks => self.move_task_cursor(false)?,
            View::Groups => {
                let len = self.ws.state().groups().len();
                Self::move_list_cursor(&mut self.group_list_state, len, false);
            }
            View::Filter => Self::move_list_cursor(&mut self.filter_list_state, FILTER_ROWS, false),
        }
        Ok(())
    }

    fn open_popup(&mut self, mode: PopupMode, initial: String) {
        self.popup_mode = mode;
        self.input_buffer = initial;
    }

    pub fn close_popup(&mut self) {
        self.popup_mode = PopupMode::None;
        self.input_buffer.clear();
    }

    /// All-scope -> ungrouped -> each group in turn -> all.
    fn cycle_scope(&mut self) -> Result<()> {
        let groups: Vec<GroupId> = self.ws.state().groups().iter().map(|g| g.id).collect();
        let next = match self.ws.state().ui().scope {
            Scope::All => Scope::Ungrouped,
            Scope::Ungrouped => groups
                .first()
                .map(|&group_id| Scope::Group { group_id })
                .unwrap_or(Scope::All),
            Scope::Group { group_id } => groups
                .iter()
                .skip_while(|id| **id != group_id)
                .nth(1)
                .map(|&group_id| Scope::Group { group_id })
                .unwrap_or(Scope::All),
        };
        self.ws.dispatch(UiAction::SetScope(next))?;
        Ok(())
    }

    fn open_description_editor(&mut self) -> Result<()> {
        let Some(id) = self.selected_task() else {
            return Ok(());
        };
        let Some(task) = self.ws.state().task(id) else {
            return Ok(());
        };
        let editor = TextEditor::new(
            format!("Describe: {}", task.name),
            EditorTarget::TaskDescription(id),
            &task.description,
        );
        self.ws.dispatch(UiAction::StartEditing(id))?;
        self.text_editor = Some(editor);
        self.popup_mode = PopupMode::TextEditor;
        Ok(())
    }

    pub fn close_text_editor(&mut self, save: bool) -> Result<()> {
        let editor = self.text_editor.take();
        self.popup_mode = PopupMode::None;
        if let Some(editor) = editor {
            if save && editor.is_dirty {
                let EditorTarget::TaskDescription(id) = editor.target;
                let patch = TaskPatch {
                    description: Some(editor.get_content()),
                    ..TaskPatch::default()
                };
                self.ws.dispatch(TaskAction::Update { id, patch })?;
            }
        }
        self.ws.dispatch(UiAction::StopEditing)?;
        Ok(())
    }

    fn handle_text_editor_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match key {
            KeyCode::Char('s') if ctrl => return self.close_text_editor(true),
            KeyCode::Char('q') if ctrl => return self.close_text_editor(false),
            KeyCode::Esc => return self.close_text_editor(false),
            _ => {}
        }
        let Some(editor) = &mut self.text_editor else {
            return Ok(());
        };
        match key {
            KeyCode::Char(c) if !ctrl => editor.insert_char(c),
            KeyCode::Enter => editor.insert_newline(),
            KeyCode::Backspace => editor.delete_char(),
            KeyCode::Left => editor.move_cursor_left(),
            KeyCode::Right => editor.move_cursor_right(),
            KeyCode::Up => editor.move_cursor_up(),
            KeyCode::Down => editor.move_cursor_down(),
            KeyCode::PageUp => editor.page_up(EDITOR_PAGE),
            KeyCode::PageDown => editor.page_down(EDITOR_PAGE),
            KeyCode::Home => editor.move_to_start_of_line(),
            KeyCode::End => editor.move_to_end_of_line(),
            _ => {}
        }
        Ok(())
    }

    fn handle_popup_input(&mut self, key: KeyCode) -> Result<()> {
        match (self.popup_mode, key) {
            (_, KeyCode::Esc) => self.close_popup(),
            (PopupMode::TaskPriority, KeyCode::Char(c @ '1'..='5')) => {
                self.close_popup();
                if let Some(id) = self.selected_task() {
                    let priority = Priority::new(c as u8 - b'0');
                    let patch = TaskPatch {
                        priority,
                        ..TaskPatch::default()
                    };
                    self.ws.dispatch(TaskAction::Update { id, patch })?;
                }
            }
            (PopupMode::TaskPriority, _) => {}
            (_, KeyCode::Enter) => self.commit_popup()?,
            (_, KeyCode::Backspace) => {
                self.input_buffer.pop();
            }
            (_, KeyCode::Char(c)) => self.input_buffer.push(c),
            _ => {}
        }
        Ok(())
    }

    fn commit_popup(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.input_buffer);
        let mode = self.popup_mode;
        self.close_popup();

        match mode {
            PopupMode::NewTask => {
                let group = match self.ws.state().ui().scope {
                    Scope::Group { group_id } => Some(group_id),
                    _ => None,
                };
                let new = NewTask {
                    priority: self.ws.settings().default_priority,
                    group,
                    ..NewTask::named(text)
                };
                if let Outcome::TaskCreated(id) = self.ws.dispatch(TaskAction::Create(new))? {
                    self.ws.dispatch(UiAction::SelectTask(Some(id)))?;
                }
            }
            PopupMode::RenameTask => {
                if let Some(id) = self.selected_task() {
                    let patch = TaskPatch {
                        name: Some(text),
                        ..TaskPatch::default()
                    };
                    self.ws.dispatch(TaskAction::Update { id, patch })?;
                }
            }
            PopupMode::TaskTags => {
                if let Some(id) = self.selected_task() {
                    let patch = TaskPatch {
                        tags: Some(split_tags(&text)),
                        ..TaskPatch::default()
                    };
                    self.ws.dispatch(TaskAction::Update { id, patch })?;
                }
            }
            PopupMode::NewGroup => {
                self.ws.dispatch(GroupAction::Create { name: text })?;
                let last = self.ws.state().groups().len().checked_sub(1);
                self.group_list_state.select(last);
            }
            PopupMode::RenameGroup => {
                if let Some(id) = self.selected_group() {
                    self.ws.dispatch(GroupAction::Rename { id, name: text })?;
                }
            }
            PopupMode::EditFilter(field) => {
                let action = match field {
                    FilterField::Name => FilterAction::SetName(text),
                    FilterField::Description => FilterAction::SetDescription(text),
                    FilterField::Priority if text.trim().is_empty() => FilterAction::SetPriority(None),
                    FilterField::Priority => {
                        let parsed: PriorityFilter = text.parse().map_err(|e: String| anyhow!(e))?;
                        FilterAction::SetPriority(Some(parsed))
                    }
                    FilterField::Tags => return self.apply_tag_filter(&text),
                };
                self.ws.dispatch(action)?;
            }
            PopupMode::TaskPriority | PopupMode::TextEditor | PopupMode::None => {}
        }
        Ok(())
    }

    /// Move the tag filter to the entered list one tag at a time.
    fn apply_tag_filter(&mut self, text: &str) -> Result<()> {
        let wanted: BTreeSet<String> = split_tags(text).iter().map(|tag| fold_case(tag)).collect();
        let current = self.ws.state().filter().tags.clone();
        for tag in current.difference(&wanted) {
            self.ws.dispatch(FilterAction::RemoveTag(tag.clone()))?;
        }
        for tag in wanted.difference(&current) {
            self.ws.dispatch(FilterAction::AddTag(tag.clone()))?;
        }
        Ok(())
    }

    fn activate_filter_row(&mut self) -> Result<()> {
        let filter = self.ws.state().filter().clone();
        let sort = self.ws.state().sort();
        match self.filter_list_state.selected().unwrap_or(0) {
            0 => self.open_popup(PopupMode::EditFilter(FilterField::Name), filter.name),
            1 => self.open_popup(
                PopupMode::EditFilter(FilterField::Description),
                filter.description,
            ),
            2 => self.open_popup(
                PopupMode::EditFilter(FilterField::Priority),
                filter.priority.map(|p| p.to_string()).unwrap_or_default(),
            ),
            3 => {
                let tags: Vec<String> = filter.tags.into_iter().collect();
                self.open_popup(PopupMode::EditFilter(FilterField::Tags), tags.join(", "));
            }
            4 => {
                let mode = match filter.tag_mode {
                    TagMode::All => TagMode::Any,
                    TagMode::Any => TagMode::All,
                };
                self.ws.dispatch(FilterAction::SetTagMode(mode))?;
            }
            5 => {
                let next = SortSettings {
                    key: sort.key.next(),
                    ..sort
                };
                self.ws.dispatch(FilterAction::SetSort(next))?;
            }
            _ => {
                let next = SortSettings {
                    direction: sort.direction.flipped(),
                    ..sort
                };
                self.ws.dispatch(FilterAction::SetSort(next))?;
            }
        }
        Ok(())
    }

    fn handle_tasks_key(&mut self, key: KeyCode) -> Result<()> {
        let selected = self.selected_task();
        match key {
            KeyCode::Char('n') => self.open_popup(PopupMode::NewTask, String::new()),
            KeyCode::Char('g') => self.cycle_scope()?,
            KeyCode::Char('c') => {
                self.ws.dispatch(TaskAction::CollapseAll)?;
            }
            _ => {
                let Some(id) = selected else {
                    return Ok(());
                };
                let Some(task) = self.ws.state().task(id) else {
                    return Ok(());
                };
                match key {
                    KeyCode::Enter | KeyCode::Char(' ') => {
                        self.ws.dispatch(TaskAction::ToggleOpen(id))?;
                    }
                    KeyCode::Char('r') => {
                        let name = task.name.clone();
                        self.open_popup(PopupMode::RenameTask, name);
                    }
                    KeyCode::Char('t') => {
                        let tags = task.tags.join(", ");
                        self.open_popup(PopupMode::TaskTags, tags);
                    }
                    KeyCode::Char('p') => self.open_popup(PopupMode::TaskPriority, String::new()),
                    KeyCode::Char('e') => self.open_description_editor()?,
                    KeyCode::Char('d') => {
                        self.ws.dispatch(TaskAction::Delete(id))?;
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_groups_key(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Char('n') => self.open_popup(PopupMode::NewGroup, String::new()),
            KeyCode::Char('r') => {
                if let Some(name) = self
                    .selected_group()
                    .and_then(|id| self.ws.state().group_name(id))
                {
                    let name = name.to_string();
                    self.open_popup(PopupMode::RenameGroup, name);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_group() {
                    self.ws.dispatch(GroupAction::Delete {
                        id,
                        tasks: TaskDisposal::Keep,
                    })?;
                }
            }
            KeyCode::Enter => {
                if let Some(group_id) = self.selected_group() {
                    self.ws.dispatch(UiAction::SetScope(Scope::Group { group_id }))?;
                    self.ws.dispatch(UiAction::SetView(View::Tasks))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_filter_key(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Enter => self.activate_filter_row()?,
            KeyCode::Char('c') => {
                self.ws.dispatch(FilterAction::Clear)?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if self.popup_mode == PopupMode::TextEditor {
            self.handle_text_editor_input(key, modifiers)?;
        } else if self.popup_mode != PopupMode::None {
            self.handle_popup_input(key)?;
        } else {
            self.status = None;
            match key {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Tab => {
                    self.ws.dispatch(UiAction::SetView(self.view().next()))?;
                }
                KeyCode::BackTab => {
                    self.ws.dispatch(UiAction::SetView(self.view().previous()))?;
                }
                KeyCode::Down => self.next_item()?,
                KeyCode::Up => self.previous_item()?,
                KeyCode::Char('R') => {
                    self.ws.reload()?;
                    self.status = Some("Reloaded".to_string());
                }
                _ => match self.view() {
                    View::Tasks => self.handle_tasks_key(key)?,
                    View::Groups => self.handle_groups_key(key)?,
                    View::Filter => self.handle_filter_key(key)?,
                },
            }
        }
        self.sync_selection()?;
        Ok(())
    }
}

fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

pub fn run_tui(ws: Workspace) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(ws)?;
    let res = run_app(&mut terminal, &mut app);

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
            if key.kind == KeyEventKind::Press {
                if let Err(err) = app.handle_key(key.code, key.modifiers) {
                    app.status = Some(err.to_string());
                }
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
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());

    let titles: Vec<Line> = View::ALL.iter().map(|v| Line::from(v.title())).collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Todo"))
        .select(app.view().index())
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::Black),
        );
    f.render_widget(tabs, chunks[0]);

    match app.view() {
        View::Tasks => render_tasks(f, app, chunks[1]),
        View::Groups => render_groups(f, app, chunks[1]),
        View::Filter => render_filter(f, app, chunks[1]),
    }

    let status = app.status.clone().unwrap_or_else(|| {
        "Tab: switch view | ↑/↓: navigate | R: reload | q: quit".to_string()
    });
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
        chunks[2],
    );

    if let Some((title, body)) = popup_text(app) {
        let popup_area = centered_rect(50, 25, f.area());
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::DarkGray));
        let content = Paragraph::new(body)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::White));
        f.render_widget(Clear, popup_area);
        f.render_widget(content, popup_area);
    }

    if let Some(editor) = &mut app.text_editor {
        render_editor(f, editor);
    }
}

fn popup_text(app: &App) -> Option<(&'static str, String)> {
    let prompt = |label: &str| {
        format!(
            "{}:\n\n{}_\n\nPress ENTER to save\nPress ESC to cancel",
            label, app.input_buffer
        )
    };
    let popup = match app.popup_mode {
        PopupMode::None | PopupMode::TextEditor => return None,
        PopupMode::NewTask => ("New Task", prompt("Task name")),
        PopupMode::RenameTask => ("Rename Task", prompt("New name")),
        PopupMode::TaskTags => ("Task Tags", prompt("Tags, comma separated")),
        PopupMode::NewGroup => ("New Group", prompt("Group name")),
        PopupMode::RenameGroup => ("Rename Group", prompt("New name")),
        PopupMode::EditFilter(FilterField::Name) => ("Filter", prompt("Name contains")),
        PopupMode::EditFilter(FilterField::Description) => ("Filter", prompt("Description contains")),
        PopupMode::EditFilter(FilterField::Priority) => {
            ("Filter", prompt("Priority such as 2, <=2 or !=5 (empty for any)"))
        }
        PopupMode::EditFilter(FilterField::Tags) => ("Filter", prompt("Tags, comma separated")),
        PopupMode::TaskPriority => (
            "Change Task Priority",
            "Enter new priority (1-5):\n\n1 = Highest Priority\n2 = High Priority\n3 = Medium Priority\n4 = Low Priority\n5 = Lowest Priority\n\nPress ESC to cancel".to_string(),
        ),
    };
    Some(popup)
}

// Helper function to create centered rectangles for popups
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

fn scope_title(app: &App) -> String {
    let state = app.ws.state();
    match state.ui().scope {
        Scope::All => "Tasks".to_string(),
        Scope::Ungrouped => "Tasks (ungrouped)".to_string(),
        Scope::Group { group_id } => format!(
            "Tasks in {}",
            state.group_name(group_id).unwrap_or("?")
        ),
    }
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let state = app.ws.state();
    let visible = query::visible_tasks(state);
    let selected = state.ui().selected_task;
    let mut list_state = ListState::default();
    list_state.select(selected.and_then(|id| visible.iter().position(|t| t.id == id)));

    let items: Vec<ListItem> = visible
        .iter()
        .map(|task| {
            let priority_color = match task.priority.value() {
                1 => Color::Red,
                2 => Color::Yellow,
                3 => Color::Blue,
                _ => Color::Gray,
            };
            let marker = if task.is_open { "▾ " } else { "▸ " };
            let mut spans = vec![
                Span::raw(marker),
                Span::styled(format!("{} ", task.name), Style::default().fg(Color::White)),
                Span::styled(format!("[{}]", task.priority), Style::default().fg(priority_color)),
            ];
            if !task.tags.is_empty() {
                spans.push(Span::styled(
                    format!(" #{}", task.tags.join(" #")),
                    Style::default().fg(Color::Cyan),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = format!("{} ({}/{})", scope_title(app), visible.len(), state.tasks().len());
    let tasks_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(tasks_list, chunks[0], &mut list_state);

    let controls = "Controls:\n• n: New task\n• Enter/Space: Open/close\n• e: Edit description\n• r: Rename\n• p: Priority\n• t: Tags\n• d: Delete\n• g: Cycle group scope\n• c: Close all";
    let info_text = match selected.and_then(|id| state.task(id)) {
        Some(task) => {
            let group = task
                .parent_group_id
                .and_then(|id| state.group_name(id))
                .unwrap_or("(none)");
            let mut text = format!(
                "Task: {}\nPriority: {}\nGroup: {}\nTags: {}\nCreated: {}\n",
                task.name,
                task.priority,
                group,
                task.tags.join(", "),
                task.created_at.format("%Y-%m-%d %H:%M")
            );
            if task.is_open {
                text.push_str(&format!("\n{}\n", task.description));
            }
            text.push('\n');
            text.push_str(controls);
            text
        }
        None => format!("No task selected\n\n{}", controls),
    };

    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Task Info"))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    f.render_widget(info_paragraph, chunks[1]);
}

fn render_groups(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let state = app.ws.state();
    let counts = query::group_counts(state);
    let items: Vec<ListItem> = state
        .groups()
        .iter()
        .map(|group| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", group.name), Style::default().fg(Color::White)),
                Span::styled(
                    format!("[{} tasks]", counts.of(group.id)),
                    Style::default().fg(Color::Green),
                ),
            ]))
        })
        .collect();

    let groups_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Groups"))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(groups_list, chunks[0], &mut app.group_list_state);

    let info_text = format!(
        "Ungrouped tasks: {}\n\nControls:\n• n: New group\n• r: Rename\n• d: Delete (tasks are kept)\n• Enter: Show its tasks",
        counts.ungrouped
    );
    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Group Info"))
        .style(Style::default().fg(Color::White));
    f.render_widget(info_paragraph, chunks[1]);
}

fn render_filter(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let filter = app.ws.state().filter();
    let sort = app.ws.state().sort();
    let or_any = |value: &str| {
        if value.is_empty() {
            "(any)".to_string()
        } else {
            value.to_string()
        }
    };
    let tags: Vec<&str> = filter.tags.iter().map(String::as_str).collect();
    let rows = [
        ("Name", or_any(&filter.name)),
        ("Description", or_any(&filter.description)),
        (
            "Priority",
            filter
                .priority
                .map(|p| p.to_string())
                .unwrap_or_else(|| "(any)".to_string()),
        ),
        ("Tags", or_any(&tags.join(", "))),
        (
            "Tag mode",
            match filter.tag_mode {
                TagMode::All => "all".to_string(),
                TagMode::Any => "any".to_string(),
            },
        ),
        ("Sort by", sort.key.as_str().to_string()),
        ("Direction", format!("{:?}", sort.direction).to_lowercase()),
    ];
    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|(label, value)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12}", label), Style::default().fg(Color::White)),
                Span::styled(value, Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let title = if filter.is_empty() {
        "Filter & Sort"
    } else {
        "Filter & Sort (active)"
    };
    let filter_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(filter_list, chunks[0], &mut app.filter_list_state);

    let info_text = "Controls:\n• Enter: Edit or toggle the field\n• c: Clear the filter (sort is kept)";
    let info_paragraph = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Filter Info"))
        .style(Style::default().fg(Color::White));
    f.render_widget(info_paragraph, chunks[1]);
}

fn render_editor(f: &mut Frame, editor: &mut TextEditor) {
    f.render_widget(Clear, f.area());
    f.render_widget(
        Block::default().style(Style::default().bg(Color::Black)),
        f.area(),
    );

    let editor_area = centered_rect(90, 80, f.area());
    let block = Block::default()
        .title(format!(
            "{} - Ctrl+S: Save | Ctrl+Q/ESC: Cancel | PgUp/PgDn: Scroll | Home/End: Line Nav",
            &editor.title
        ))
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let inner_area = block.inner(editor_area);
    f.render_widget(block, editor_area);

    let visible_height = inner_area.height as usize;
    editor.adjust_scroll_with_height(visible_height);

    let text_style = Style::default().fg(Color::White).bg(Color::Black);
    let cursor_style = Style::default().bg(Color::Cyan).fg(Color::Black);
    let start_line = editor.scroll_offset;
    let end_line = (start_line + visible_height).min(editor.content.len());

    let content_lines: Vec<Line> = (start_line..end_line)
        .map(|i| {
            let line = &editor.content[i];
            if i != editor.cursor_row {
                return Line::from(Span::styled(line.clone(), text_style));
            }
            let chars: Vec<char> = line.chars().collect();
            let col = editor.cursor_col.min(chars.len());
            let before: String = chars[..col].iter().collect();
            let cursor: String = chars.get(col).map_or(" ".to_string(), |c| c.to_string());
            let after: String = chars.iter().skip(col + 1).collect();
            Line::from(vec![
                Span::styled(before, text_style),
                Span::styled(cursor, cursor_style),
                Span::styled(after, text_style),
            ])
        })
        .collect();

    let editor_content = Paragraph::new(content_lines).style(text_style);
    f.render_widget(editor_content, inner_area);
}
