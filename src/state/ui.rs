use super::{AppState, Outcome, StateError};
use crate::models::{Scope, TaskId, View};

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SetView(View),
    SetScope(Scope),
    SelectTask(Option<TaskId>),
    /// Also selects the task.
    StartEditing(TaskId),
    StopEditing,
}

pub(super) fn reduce(state: &mut AppState, action: UiAction) -> Result<Outcome, StateError> {
    match action {
        UiAction::SetView(view) => state.ui.view = view,
        UiAction::SetScope(scope) => {
            if let Scope::Group { group_id } = scope {
                state.require_group(group_id)?;
            }
            state.ui.scope = scope;
        }
        UiAction::SelectTask(selected) => {
            if let Some(id) = selected {
                state.task(id).ok_or(StateError::UnknownTask(id))?;
            }
            state.ui.selected_task = selected;
        }
        UiAction::StartEditing(id) => {
            state.task(id).ok_or(StateError::UnknownTask(id))?;
            state.ui.selected_task = Some(id);
            state.ui.editing_task = Some(id);
        }
        UiAction::StopEditing => state.ui.editing_task = None,
    }
    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupId;
    use crate::state::{NewTask, TaskAction};
    use pretty_assertions::assert_eq;

    #[test]
    fn scope_must_name_an_existing_group() {
        let mut state = AppState::default();
        assert_eq!(
            state.dispatch(UiAction::SetScope(Scope::Group { group_id: GroupId(1) })),
            Err(StateError::UnknownGroup(GroupId(1)))
        );
        state.dispatch(UiAction::SetScope(Scope::Ungrouped)).unwrap();
        assert_eq!(state.ui().scope, Scope::Ungrouped);
    }

    #[test]
    fn editing_selects_and_stop_keeps_selection() {
        let mut state = AppState::default();
        state
            .dispatch(TaskAction::Create(NewTask::named("x")))
            .unwrap();
        state.dispatch(UiAction::StartEditing(TaskId(1))).unwrap();
        assert_eq!(state.ui().selected_task, Some(TaskId(1)));
        state.dispatch(UiAction::StopEditing).unwrap();
        assert_eq!(state.ui().editing_task, None);
        assert_eq!(state.ui().selected_task, Some(TaskId(1)));

        assert_eq!(
            state.dispatch(UiAction::SelectTask(Some(TaskId(5)))),
            Err(StateError::UnknownTask(TaskId(5)))
        );
        state.dispatch(UiAction::SetView(View::Filter)).unwrap();
        assert_eq!(state.ui().view, View::Filter);
    }
}
