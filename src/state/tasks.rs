use super::{AppState, Outcome, StateError};
use crate::models::{normalize_tags, same_folded, GroupId, Priority, Task, TaskId};
use chrono::Utc;

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub group: Option<GroupId>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        NewTask {
            name: name.into(),
            description: String::new(),
            priority: Priority::default(),
            tags: Vec::new(),
            group: None,
        }
    }
}

/// Fields left as `None` are not touched. `group: Some(None)` ungroups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub group: Option<Option<GroupId>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.group.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    Create(NewTask),
    Update { id: TaskId, patch: TaskPatch },
    Delete(TaskId),
    ToggleOpen(TaskId),
    SetOpen { id: TaskId, open: bool },
    CollapseAll,
    AddTag { id: TaskId, tag: String },
    RemoveTag { id: TaskId, tag: String },
}

fn clean_name(name: &str) -> Result<String, StateError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StateError::EmptyName);
    }
    Ok(name.to_string())
}

pub(super) fn reduce(state: &mut AppState, action: TaskAction) -> Result<Outcome, StateError> {
    match action {
        TaskAction::Create(new) => {
            let name = clean_name(&new.name)?;
            if let Some(group) = new.group {
                state.require_group(group)?;
            }
            let id = state.next_task_id()?;
            state.tasks.push(Task {
                id,
                name,
                description: new.description,
                priority: new.priority,
                tags: normalize_tags(&new.tags),
                is_open: false,
                parent_group_id: new.group,
                created_at: Utc::now(),
            });
            log::info!("created task {}", id);
            Ok(Outcome::TaskCreated(id))
        }
        TaskAction::Update { id, patch } => {
            // Validate everything before touching the task.
            let name = patch.name.as_deref().map(clean_name).transpose()?;
            if let Some(Some(group)) = patch.group {
                state.require_group(group)?;
            }
            let task = state.task_mut(id)?;
            if let Some(name) = name {
                task.name = name;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(tags) = patch.tags {
                task.tags = normalize_tags(&tags);
            }
            if let Some(group) = patch.group {
                task.parent_group_id = group;
            }
            Ok(Outcome::Done)
        }
        TaskAction::Delete(id) => {
            let index = state
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(StateError::UnknownTask(id))?;
            state.tasks.remove(index);
            state.prune_ui();
            log::info!("deleted task {}", id);
            Ok(Outcome::Done)
        }
        TaskAction::ToggleOpen(id) => {
            let task = state.task_mut(id)?;
            task.is_open = !task.is_open;
            Ok(Outcome::Done)
        }
        TaskAction::SetOpen { id, open } => {
            state.task_mut(id)?.is_open = open;
            Ok(Outcome::Done)
        }
        TaskAction::CollapseAll => {
            for task in &mut state.tasks {
                task.is_open = false;
            }
            Ok(Outcome::Done)
        }
        TaskAction::AddTag { id, tag } => {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(StateError::EmptyTag);
            }
            let task = state.task_mut(id)?;
            if !task.has_tag(tag) {
                task.tags.push(tag.to_string());
            }
            Ok(Outcome::Done)
        }
        TaskAction::RemoveTag { id, tag } => {
            let task = state.task_mut(id)?;
            let tag = tag.trim();
            task.tags.retain(|t| !same_folded(t, tag));
            Ok(Outcome::Done)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{GroupAction, UiAction};
    use pretty_assertions::assert_eq;

    fn created_task(state: &mut AppState, new: NewTask) -> TaskId {
        match state.dispatch(TaskAction::Create(new)).unwrap() {
            Outcome::TaskCreated(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn created_group(state: &mut AppState, name: &str) -> GroupId {
        match state.dispatch(GroupAction::Create { name: name.into() }).unwrap() {
            Outcome::GroupCreated(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn create_trims_and_assigns_increasing_ids() {
        let mut state = AppState::default();
        let first = created_task(&mut state, NewTask::named("  buy milk "));
        let second = created_task(
            &mut state,
            NewTask {
                tags: vec!["home".into(), "Home".into(), " shop".into()],
                ..NewTask::named("call mom")
            },
        );
        assert_eq!(first, TaskId(1));
        assert_eq!(second, TaskId(2));
        assert_eq!(state.task(first).unwrap().name, "buy milk");
        assert_eq!(state.task(second).unwrap().tags, vec!["home", "shop"]);
        assert!(!state.task(first).unwrap().is_open);
    }

    #[test]
    fn create_rejects_empty_name_and_unknown_group() {
        let mut state = AppState::default();
        assert_eq!(
            state.dispatch(TaskAction::Create(NewTask::named("   "))),
            Err(StateError::EmptyName)
        );
        let in_missing_group = NewTask {
            group: Some(GroupId(3)),
            ..NewTask::named("orphan")
        };
        assert_eq!(
            state.dispatch(TaskAction::Create(in_missing_group)),
            Err(StateError::UnknownGroup(GroupId(3)))
        );
        assert!(state.tasks().is_empty());
    }

    #[test]
    fn rejected_update_changes_nothing() {
        let mut state = AppState::default();
        let id = created_task(&mut state, NewTask::named("draft"));
        let before = state.clone();

        let patch = TaskPatch {
            description: Some("new text".into()),
            group: Some(Some(GroupId(9))),
            ..TaskPatch::default()
        };
        assert_eq!(
            state.dispatch(TaskAction::Update { id, patch }),
            Err(StateError::UnknownGroup(GroupId(9)))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn update_applies_patch_fields() {
        let mut state = AppState::default();
        let group = created_group(&mut state, "Work");
        let id = created_task(&mut state, NewTask::named("draft"));

        let patch = TaskPatch {
            name: Some("final".into()),
            priority: Priority::new(1),
            tags: Some(vec!["q3".into()]),
            group: Some(Some(group)),
            ..TaskPatch::default()
        };
        state.dispatch(TaskAction::Update { id, patch }).unwrap();

        let task = state.task(id).unwrap();
        assert_eq!(task.name, "final");
        assert_eq!(task.priority.value(), 1);
        assert_eq!(task.tags, vec!["q3"]);
        assert_eq!(task.parent_group_id, Some(group));

        let ungroup = TaskPatch {
            group: Some(None),
            ..TaskPatch::default()
        };
        state.dispatch(TaskAction::Update { id, patch: ungroup }).unwrap();
        assert_eq!(state.task(id).unwrap().parent_group_id, None);
    }

    #[test]
    fn delete_clears_ui_references() {
        let mut state = AppState::default();
        let id = created_task(&mut state, NewTask::named("temp"));
        state.dispatch(UiAction::StartEditing(id)).unwrap();
        assert_eq!(state.ui().editing_task, Some(id));

        state.dispatch(TaskAction::Delete(id)).unwrap();
        assert_eq!(state.ui().editing_task, None);
        assert_eq!(state.ui().selected_task, None);
        assert_eq!(
            state.dispatch(TaskAction::Delete(id)),
            Err(StateError::UnknownTask(id))
        );
    }

    #[test]
    fn open_state_toggles_and_collapses() {
        let mut state = AppState::default();
        let a = created_task(&mut state, NewTask::named("a"));
        let b = created_task(&mut state, NewTask::named("b"));
        state.dispatch(TaskAction::ToggleOpen(a)).unwrap();
        state.dispatch(TaskAction::SetOpen { id: b, open: true }).unwrap();
        assert!(state.task(a).unwrap().is_open && state.task(b).unwrap().is_open);

        state.dispatch(TaskAction::ToggleOpen(a)).unwrap();
        assert!(!state.task(a).unwrap().is_open);

        state.dispatch(TaskAction::CollapseAll).unwrap();
        assert!(state.tasks().iter().all(|t| !t.is_open));
    }

    #[test]
    fn tags_are_added_once_and_removed_case_insensitively() {
        let mut state = AppState::default();
        let id = created_task(&mut state, NewTask::named("t"));
        for tag in ["urgent", "URGENT", " later "] {
            state
                .dispatch(TaskAction::AddTag { id, tag: tag.into() })
                .unwrap();
        }
        assert_eq!(state.task(id).unwrap().tags, vec!["urgent", "later"]);
        assert_eq!(
            state.dispatch(TaskAction::AddTag { id, tag: " ".into() }),
            Err(StateError::EmptyTag)
        );

        state
            .dispatch(TaskAction::RemoveTag { id, tag: "Urgent".into() })
            .unwrap();
        assert_eq!(state.task(id).unwrap().tags, vec!["later"]);
    }

    #[test]
    fn non_ascii_tags_fold_case() {
        let mut state = AppState::default();
        let id = created_task(&mut state, NewTask::named("t"));
        for tag in ["Öl", "öl", "ÖL"] {
            state
                .dispatch(TaskAction::AddTag { id, tag: tag.into() })
                .unwrap();
        }
        assert_eq!(state.task(id).unwrap().tags, vec!["Öl"]);
        state
            .dispatch(TaskAction::RemoveTag { id, tag: "öL".into() })
            .unwrap();
        assert!(state.task(id).unwrap().tags.is_empty());
    }
}
