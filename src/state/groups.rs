use super::{AppState, Outcome, StateError};
use crate::models::{GroupId, TaskGroup};
use chrono::Utc;

/// What happens to a deleted group's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskDisposal {
    Delete,
    /// Tasks stay, without a group.
    Keep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupAction {
    Create { name: String },
    Rename { id: GroupId, name: String },
    Delete { id: GroupId, tasks: TaskDisposal },
}

fn checked_name(state: &AppState, name: &str, except: Option<GroupId>) -> Result<String, StateError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StateError::EmptyName);
    }
    if state.group_name_taken(name, except) {
        return Err(StateError::DuplicateGroup(name.to_string()));
    }
    Ok(name.to_string())
}

pub(super) fn reduce(state: &mut AppState, action: GroupAction) -> Result<Outcome, StateError> {
    match action {
        GroupAction::Create { name } => {
            let name = checked_name(state, &name, None)?;
            let id = state.next_group_id()?;
            state.groups.push(TaskGroup {
                id,
                name,
                created_at: Utc::now(),
            });
            log::info!("created group {}", id);
            Ok(Outcome::GroupCreated(id))
        }
        GroupAction::Rename { id, name } => {
            state.require_group(id)?;
            let name = checked_name(state, &name, Some(id))?;
            if let Some(group) = state.groups.iter_mut().find(|g| g.id == id) {
                group.name = name;
            }
            Ok(Outcome::Done)
        }
        GroupAction::Delete { id, tasks } => {
            state.require_group(id)?;
            state.groups.retain(|g| g.id != id);
            match tasks {
                TaskDisposal::Delete => {
                    let before = state.tasks.len();
                    state.tasks.retain(|t| t.parent_group_id != Some(id));
                    log::info!(
                        "deleted group {} and {} task(s)",
                        id,
                        before - state.tasks.len()
                    );
                }
                TaskDisposal::Keep => {
                    for task in state.tasks.iter_mut().filter(|t| t.parent_group_id == Some(id)) {
                        task.parent_group_id = None;
                    }
                    log::info!("deleted group {}, tasks kept", id);
                }
            }
            state.prune_ui();
            Ok(Outcome::Done)
        }
    }
}
