use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::cli::ListArgs;
use crate::config::ConfigKey;
use crate::matcher;
use crate::models::{Priority, Scope, SortDirection, TagMode, Task};
use crate::persistence::ImportMode;
use crate::query;
use crate::state::{
    AppState, FilterAction, GroupAction, NewTask, Outcome, TaskAction, TaskDisposal, TaskPatch,
    UiAction,
};
use crate::workspace::Workspace;

// Asked when a typed name only loosely matches an existing one
fn ask_user_confirmation(input_name: &str, suggested_name: &str) -> bool {
    print!("'{}' not found. Did you mean '{}'? (y/n): ", input_name, suggested_name);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    let answer = input.trim().to_lowercase();
    answer == "y" || answer == "yes"
}

fn ask_yes_no(question: &str) -> bool {
    print!("{} (y/n): ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

fn task_line(state: &AppState, task: &Task) -> String {
    let group = task
        .parent_group_id
        .and_then(|id| state.group_name(id))
        .map(|name| format!(" | Group: {}", name))
        .unwrap_or_default();
    let tags = if task.tags.is_empty() {
        String::new()
    } else {
        format!(" | Tags: {}", task.tags.join(", "))
    };
    let marker = if task.is_open { "▾" } else { "▸" };
    format!(
        "{} {} {} | {}{}{}",
        marker, task.id, task.name, task.priority, group, tags
    )
}

pub fn group_add(ws: &mut Workspace, name: &str) -> Result<()> {
    if let Outcome::GroupCreated(id) = ws.dispatch(GroupAction::Create { name: name.to_string() })? {
        println!("Group '{}' created ({})", name.trim(), id);
    }
    Ok(())
}

pub fn group_rename(ws: &mut Workspace, group: &str, name: &str) -> Result<()> {
    let id = ws.resolve_group(group, &mut ask_user_confirmation)?;
    ws.dispatch(GroupAction::Rename { id, name: name.to_string() })?;
    println!("Group {} renamed to '{}'", id, name.trim());
    Ok(())
}

pub fn group_delete(ws: &mut Workspace, group: &str, keep_tasks: bool) -> Result<()> {
    let id = ws.resolve_group(group, &mut ask_user_confirmation)?;
    let tasks = if keep_tasks {
        TaskDisposal::Keep
    } else {
        TaskDisposal::Delete
    };
    let members = query::group_counts(ws.state()).of(id);
    ws.dispatch(GroupAction::Delete { id, tasks })?;
    match tasks {
        TaskDisposal::Keep => println!("Group {} deleted; {} task(s) are now ungrouped", id, members),
        TaskDisposal::Delete => println!("Group {} deleted with {} task(s)", id, members),
    }
    Ok(())
}

pub fn group_list(ws: &Workspace) -> Result<()> {
    let state = ws.state();
    let counts = query::group_counts(state);

    println!("Groups:");
    println!("-------");
    for group in state.groups() {
        println!(
            "{} {} | Tasks: {} | Created: {}",
            group.id,
            group.name,
            counts.of(group.id),
            group.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("(ungrouped) | Tasks: {}", counts.ungrouped);
    Ok(())
}

pub struct AddArgs {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub tags: Vec<String>,
    pub group: Option<String>,
}

pub fn add(ws: &mut Workspace, args: AddArgs) -> Result<()> {
    let group = match args.group.as_deref() {
        Some(reference) => Some(ws.resolve_group(reference, &mut ask_user_confirmation)?),
        None => None,
    };
    let priority = args
        .priority
        .and_then(Priority::new)
        .unwrap_or(ws.settings().default_priority);
    let new = NewTask {
        name: args.name,
        description: args.description.unwrap_or_default(),
        priority,
        tags: args.tags,
        group,
    };
    if let Outcome::TaskCreated(id) = ws.dispatch(TaskAction::Create(new))? {
        if let Some(task) = ws.state().task(id) {
            println!("Task '{}' created ({})", task.name, id);
        }
    }
    Ok(())
}

pub struct EditArgs {
    pub task: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub tags: Vec<String>,
    pub clear_tags: bool,
    pub group: Option<String>,
    pub ungroup: bool,
}

pub fn edit(ws: &mut Workspace, args: EditArgs) -> Result<()> {
    let id = ws.resolve_task(&args.task, &mut ask_user_confirmation)?;
    let group = if args.ungroup {
        Some(None)
    } else {
        match args.group.as_deref() {
            Some(reference) => Some(Some(ws.resolve_group(reference, &mut ask_user_confirmation)?)),
            None => None,
        }
    };
    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(args.tags)
    };
    let patch = TaskPatch {
        name: args.name,
        description: args.description,
        priority: args.priority.and_then(Priority::new),
        tags,
        group,
    };
    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    ws.dispatch(TaskAction::Update { id, patch })?;
    if let Some(task) = ws.state().task(id) {
        println!("Task updated: {}", task_line(ws.state(), task));
    }
    Ok(())
}

pub fn delete(ws: &mut Workspace, task: &str) -> Result<()> {
    let id = ws.resolve_task(task, &mut ask_user_confirmation)?;
    ws.dispatch(TaskAction::Delete(id))?;
    println!("Task {} deleted", id);
    Ok(())
}

/// Flip a task card, or force it with `open`.
pub fn toggle(ws: &mut Workspace, task: &str, open: Option<bool>) -> Result<()> {
    let id = ws.resolve_task(task, &mut ask_user_confirmation)?;
    match open {
        Some(open) => ws.dispatch(TaskAction::SetOpen { id, open })?,
        None => ws.dispatch(TaskAction::ToggleOpen(id))?,
    };
    if let Some(task) = ws.state().task(id) {
        let state = if task.is_open { "open" } else { "closed" };
        println!("Task '{}' is now {}", task.name, state);
    }
    Ok(())
}

pub fn tag_add(ws: &mut Workspace, task: &str, tag: &str) -> Result<()> {
    let id = ws.resolve_task(task, &mut ask_user_confirmation)?;
    ws.dispatch(TaskAction::AddTag { id, tag: tag.to_string() })?;
    println!("Tag '{}' added to task {}", tag.trim(), id);
    Ok(())
}

pub fn tag_remove(ws: &mut Workspace, task: &str, tag: &str) -> Result<()> {
    let id = ws.resolve_task(task, &mut ask_user_confirmation)?;
    ws.dispatch(TaskAction::RemoveTag { id, tag: tag.to_string() })?;
    println!("Tag '{}' removed from task {}", tag.trim(), id);
    Ok(())
}

/// Turn list flags into filter, sort and scope actions on the session.
pub fn apply_list_args(ws: &mut Workspace, args: ListArgs) -> Result<()> {
    if let Some(name) = args.name {
        ws.dispatch(FilterAction::SetName(name))?;
    }
    if let Some(description) = args.description {
        ws.dispatch(FilterAction::SetDescription(description))?;
    }
    if args.priority.is_some() {
        ws.dispatch(FilterAction::SetPriority(args.priority))?;
    }
    if !args.tags.is_empty() {
        ws.dispatch(FilterAction::SetTags(args.tags))?;
    }
    if args.any_tag {
        ws.dispatch(FilterAction::SetTagMode(TagMode::Any))?;
    }

    let scope = if args.ungrouped {
        Scope::Ungrouped
    } else if let Some(reference) = args.group.as_deref() {
        Scope::Group {
            group_id: ws.resolve_group(reference, &mut ask_user_confirmation)?,
        }
    } else {
        Scope::All
    };
    ws.dispatch(UiAction::SetScope(scope))?;

    let mut sort = ws.state().sort();
    if let Some(key) = args.sort {
        sort.key = key;
    }
    if args.reverse {
        sort.direction = SortDirection::Desc;
    }
    ws.dispatch(FilterAction::SetSort(sort))?;
    Ok(())
}

pub fn list(ws: &mut Workspace, args: ListArgs) -> Result<()> {
    apply_list_args(ws, args)?;
    let state = ws.state();
    let tasks = query::visible_tasks(state);

    println!("Tasks:");
    println!("------");
    for task in &tasks {
        println!("{}", task_line(state, task));
    }
    if tasks.len() < state.tasks().len() {
        println!("({} of {} shown)", tasks.len(), state.tasks().len());
    }
    Ok(())
}

pub fn show(ws: &Workspace, task: &str) -> Result<()> {
    let id = ws.resolve_task(task, &mut ask_user_confirmation)?;
    let state = ws.state();
    let Some(task) = state.task(id) else {
        return Ok(());
    };
    let group = task
        .parent_group_id
        .and_then(|id| state.group_name(id))
        .unwrap_or("(none)");
    println!("Task: {} ({})", task.name, task.id);
    println!("Priority: {}", task.priority);
    println!("Group: {}", group);
    println!("Tags: {}", task.tags.join(", "));
    println!("Open: {}", task.is_open);
    println!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));
    if !task.description.is_empty() {
        println!("\n{}", task.description);
    }
    Ok(())
}

pub fn search(ws: &Workspace, query: &str) -> Result<()> {
    let state = ws.state();
    let hits = matcher::search(state.tasks(), query);
    if hits.is_empty() {
        println!("No matches found for '{}'", query);
        return Ok(());
    }
    for (_score, task) in hits {
        println!("{}", task_line(state, task));
    }
    Ok(())
}

pub fn export(ws: &Workspace, output: Option<&Path>) -> Result<()> {
    let json = ws.export()?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn import(ws: &mut Workspace, path: &Path, merge: bool) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mode = if merge {
        ImportMode::Merge
    } else {
        ImportMode::Replace
    };
    let summary = ws
        .import(&text, mode)
        .with_context(|| format!("import of {} failed", path.display()))?;
    println!(
        "Imported {} group(s) and {} task(s) from {}",
        summary.groups,
        summary.tasks,
        path.display()
    );
    Ok(())
}

pub fn config_set(ws: &Workspace, key: &str, value: &str) -> Result<()> {
    let key: ConfigKey = key.parse()?;
    let stored = ws.database().set_config(key, value)?;
    println!("{} = {}", key.name(), stored);
    Ok(())
}

pub fn config_get(ws: &Workspace, key: &str) -> Result<()> {
    let key: ConfigKey = key.parse()?;
    match ws.database().get_config(key)? {
        Some(item) => println!("{} = {}", item.key_name, item.value),
        None => println!("{} = {} (default)", key.name(), key.default_value()),
    }
    Ok(())
}

pub fn config_list(ws: &Workspace) -> Result<()> {
    let stored = ws.database().get_all_configs()?;
    println!("Config:");
    println!("-------");
    for key in ConfigKey::ALL {
        match stored.iter().find(|item| item.key_name == key.name()) {
            Some(item) => println!(
                "{} = {} | {} | Created: {} | Updated: {}",
                key.name(),
                item.value,
                item.description.as_deref().unwrap_or(key.description()),
                item.created_at,
                item.updated_at
            ),
            None => println!(
                "{} = {} (default) | {}",
                key.name(),
                key.default_value(),
                key.description()
            ),
        }
    }
    Ok(())
}

pub fn config_delete(ws: &Workspace, key: &str) -> Result<()> {
    let key: ConfigKey = key.parse()?;
    if ws.database().delete_config(key)? {
        println!("{} reset to default ({})", key.name(), key.default_value());
    } else {
        println!("{} was not set", key.name());
    }
    Ok(())
}

pub fn clear(ws: &mut Workspace, yes: bool) -> Result<()> {
    if !yes && !ask_yes_no("Delete all tasks and groups?") {
        println!("Operation cancelled.");
        return Ok(());
    }
    ws.clear()?;
    println!("All tasks and groups deleted.");
    Ok(())
}
