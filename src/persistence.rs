//! Reading and writing [`AppState`] through key-value stores, plus the
//! export/import document format.

use crate::models::{FilterSettings, SortSettings, Task, TaskGroup, UiState};
use crate::schema::{parse_validated, Schema, SchemaError};
use crate::state::{AppState, ImportSummary, StateError};
use crate::storage::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TASKS_KEY: &str = "todo.tasks";
pub const GROUPS_KEY: &str = "todo.taskGroups";
pub const FILTER_KEY: &str = "todo.filterSettings";
pub const SORT_KEY: &str = "todo.sortSettings";
pub const UI_KEY: &str = "todo.uiState";

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("rejected document: {0}")]
    Schema(#[from] SchemaError),
    #[error("unsupported export version {0} (expected {expected})", expected = EXPORT_VERSION)]
    UnsupportedVersion(u32),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn task_schema() -> Schema {
    Schema::object([
        ("id", Schema::Number),
        ("name", Schema::String),
        ("description", Schema::optional(Schema::String)),
        ("priority", Schema::Number),
        ("tags", Schema::optional(Schema::array(Schema::String))),
        ("isOpen", Schema::optional(Schema::Boolean)),
        ("parentGroupId", Schema::nullable(Schema::Number)),
        ("createdAt", Schema::String),
    ])
}

pub fn group_schema() -> Schema {
    Schema::object([
        ("id", Schema::Number),
        ("name", Schema::String),
        ("createdAt", Schema::String),
    ])
}

pub fn filter_schema() -> Schema {
    Schema::object([
        ("name", Schema::optional(Schema::String)),
        ("description", Schema::optional(Schema::String)),
        (
            "priority",
            Schema::nullable(Schema::object([
                ("comparison", Schema::String),
                ("value", Schema::Number),
            ])),
        ),
        ("tags", Schema::optional(Schema::array(Schema::String))),
        ("tagMode", Schema::optional(Schema::String)),
    ])
}

pub fn sort_schema() -> Schema {
    Schema::object([("key", Schema::String), ("direction", Schema::String)])
}

pub fn ui_schema() -> Schema {
    Schema::object([
        ("view", Schema::optional(Schema::String)),
        (
            "scope",
            Schema::optional(Schema::object([
                ("kind", Schema::String),
                ("groupId", Schema::optional(Schema::Number)),
            ])),
        ),
        ("selectedTask", Schema::nullable(Schema::Number)),
        ("editingTask", Schema::nullable(Schema::Number)),
    ])
}

pub fn export_schema() -> Schema {
    Schema::object([
        ("version", Schema::Number),
        ("exportedAt", Schema::String),
        ("taskGroups", Schema::array(group_schema())),
        ("tasks", Schema::array(task_schema())),
    ])
}

/// A stored slice that is missing falls back to its default; one that fails
/// validation is logged and also falls back, so one bad key cannot take the
/// others down with it.
fn load_slice<T>(store: &dyn KeyValueStore, key: &str, schema: &Schema) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let Some(text) = store.get(key)? else {
        return Ok(T::default());
    };
    match parse_validated(&text, schema) {
        Ok(value) => Ok(value),
        Err(err) => {
            log::warn!("discarding stored '{}': {}", key, err);
            Ok(T::default())
        }
    }
}

pub fn load(durable: &dyn KeyValueStore, session: &dyn KeyValueStore) -> Result<AppState, StoreError> {
    let tasks: Vec<Task> = load_slice(durable, TASKS_KEY, &Schema::array(task_schema()))?;
    let groups: Vec<TaskGroup> = load_slice(durable, GROUPS_KEY, &Schema::array(group_schema()))?;
    let filter: FilterSettings = load_slice(session, FILTER_KEY, &filter_schema())?;
    let sort: SortSettings = load_slice(session, SORT_KEY, &sort_schema())?;
    let ui: UiState = load_slice(session, UI_KEY, &ui_schema())?;
    log::debug!("loaded {} task(s) in {} group(s)", tasks.len(), groups.len());
    Ok(AppState::from_parts(tasks, groups, filter, sort, ui))
}

pub fn save(
    state: &AppState,
    durable: &mut dyn KeyValueStore,
    session: &mut dyn KeyValueStore,
) -> Result<(), PersistError> {
    durable.set(TASKS_KEY, &serde_json::to_string(state.tasks())?)?;
    durable.set(GROUPS_KEY, &serde_json::to_string(state.groups())?)?;
    save_session(state, session)
}

/// Only the ephemeral slices: filter, sort and UI state.
pub fn save_session(state: &AppState, session: &mut dyn KeyValueStore) -> Result<(), PersistError> {
    session.set(FILTER_KEY, &serde_json::to_string(state.filter())?)?;
    session.set(SORT_KEY, &serde_json::to_string(&state.sort())?)?;
    session.set(UI_KEY, &serde_json::to_string(state.ui())?)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub task_groups: Vec<TaskGroup>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Replace,
    Merge,
}

pub fn export_document(state: &AppState) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION,
        exported_at: Utc::now(),
        task_groups: state.groups().to_vec(),
        tasks: state.tasks().to_vec(),
    }
}

pub fn export_json(state: &AppState) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(&export_document(state))?)
}

/// Validate the whole document first; on any failure `state` is untouched.
pub fn import_json(state: &mut AppState, text: &str, mode: ImportMode) -> Result<ImportSummary, PersistError> {
    let document: ExportDocument = parse_validated(text, &export_schema())?;
    if document.version != EXPORT_VERSION {
        return Err(PersistError::UnsupportedVersion(document.version));
    }
    let summary = match mode {
        ImportMode::Replace => state.replace_content(document.task_groups, document.tasks),
        ImportMode::Merge => state.merge_content(document.task_groups, document.tasks)?,
    };
    log::info!(
        "imported {} group(s) and {} task(s) ({:?})",
        summary.groups,
        summary.tasks,
        mode
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupId, Scope, SortDirection, SortKey, TaskId, View};
    use crate::state::{FilterAction, GroupAction, NewTask, TaskAction, UiAction};
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn populated() -> AppState {
        let mut state = AppState::default();
        state
            .dispatch(GroupAction::Create { name: "Home".into() })
            .unwrap();
        state
            .dispatch(TaskAction::Create(NewTask {
                description: "front and back".into(),
                tags: vec!["chores".into()],
                group: Some(GroupId(1)),
                ..NewTask::named("mow lawn")
            }))
            .unwrap();
        state
            .dispatch(TaskAction::Create(NewTask::named("taxes")))
            .unwrap();
        state.dispatch(TaskAction::ToggleOpen(TaskId(2))).unwrap();
        state.dispatch(FilterAction::AddTag("chores".into())).unwrap();
        state
            .dispatch(FilterAction::SetSort(SortSettings {
                key: SortKey::Name,
                direction: SortDirection::Desc,
            }))
            .unwrap();
        state
            .dispatch(UiAction::SetScope(Scope::Group { group_id: GroupId(1) }))
            .unwrap();
        state.dispatch(UiAction::SetView(View::Groups)).unwrap();
        state
    }

    #[test]
    fn save_then_load_restores_state() {
        let state = populated();
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        save(&state, &mut durable, &mut session).unwrap();

        let loaded = load(&durable, &session).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn session_slices_do_not_touch_durable_store() {
        let state = populated();
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        save(&state, &mut durable, &mut session).unwrap();

        assert_eq!(durable.keys().unwrap(), vec![GROUPS_KEY, TASKS_KEY]);
        assert_eq!(session.keys().unwrap(), vec![FILTER_KEY, SORT_KEY, UI_KEY]);

        // a fresh session keeps the tasks but forgets the view state
        let reloaded = load(&durable, &MemoryStore::new()).unwrap();
        assert_eq!(reloaded.tasks(), state.tasks());
        assert_eq!(reloaded.ui(), &UiState::default());
        assert_eq!(reloaded.filter(), &FilterSettings::default());
    }

    #[test]
    fn corrupt_slice_falls_back_without_affecting_others() {
        let state = populated();
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        save(&state, &mut durable, &mut session).unwrap();

        durable
            .set(GROUPS_KEY, r#"[{"id":"one","name":"Home"}]"#)
            .unwrap();
        session.set(UI_KEY, "{{{").unwrap();

        let loaded = load(&durable, &session).unwrap();
        assert!(loaded.groups().is_empty());
        assert_eq!(loaded.tasks().len(), 2);
        // the group vanished, so its task was detached
        assert_eq!(loaded.task(TaskId(1)).unwrap().parent_group_id, None);
        assert_eq!(loaded.ui(), &UiState::default());
        assert_eq!(loaded.sort(), state.sort());
    }

    #[test]
    fn out_of_range_priority_is_rejected() {
        let mut durable = MemoryStore::new();
        durable
            .set(
                TASKS_KEY,
                r#"[{"id":1,"name":"x","priority":9,"createdAt":"2024-05-01T10:00:00Z"}]"#,
            )
            .unwrap();
        let loaded = load(&durable, &MemoryStore::new()).unwrap();
        assert!(loaded.tasks().is_empty());
    }

    #[test]
    fn stored_ids_past_the_id_range_load_and_stay_usable() {
        let mut durable = MemoryStore::new();
        durable
            .set(
                TASKS_KEY,
                r#"[{"id":18446744073709551615,"name":"x","priority":2,"createdAt":"2024-05-01T10:00:00Z"}]"#,
            )
            .unwrap();
        let mut loaded = load(&durable, &MemoryStore::new()).unwrap();
        assert_eq!(loaded.tasks()[0].id, TaskId(1));
        assert!(loaded
            .dispatch(TaskAction::Create(NewTask::named("after")))
            .is_ok());
        assert!(loaded.task(TaskId(2)).is_some());
    }

    #[test]
    fn minimal_stored_task_gets_defaults() {
        let mut durable = MemoryStore::new();
        durable
            .set(
                TASKS_KEY,
                r#"[{"id":4,"name":"x","priority":2,"createdAt":"2024-05-01T10:00:00Z","extra":true}]"#,
            )
            .unwrap();
        let loaded = load(&durable, &MemoryStore::new()).unwrap();
        let task = loaded.task(TaskId(4)).unwrap();
        assert_eq!(task.description, "");
        assert!(task.tags.is_empty());
        assert!(!task.is_open);
    }

    #[test]
    fn export_import_replace() {
        let source = populated();
        let text = export_json(&source).unwrap();

        let mut target = AppState::default();
        target
            .dispatch(TaskAction::Create(NewTask::named("will be replaced")))
            .unwrap();
        let summary = import_json(&mut target, &text, ImportMode::Replace).unwrap();

        assert_eq!(summary, ImportSummary { groups: 1, tasks: 2 });
        assert_eq!(target.tasks(), source.tasks());
        assert_eq!(target.groups(), source.groups());
    }

    #[test]
    fn export_import_merge_appends() {
        let source = populated();
        let text = export_json(&source).unwrap();

        let mut target = populated();
        let summary = import_json(&mut target, &text, ImportMode::Merge).unwrap();
        // same-named group folds into the existing one
        assert_eq!(summary, ImportSummary { groups: 0, tasks: 2 });
        assert_eq!(target.tasks().len(), 4);
        assert_eq!(target.groups().len(), 1);
    }

    #[test]
    fn invalid_import_leaves_state_untouched() {
        let mut target = populated();
        let before = target.clone();

        let missing_tasks = r#"{"version":1,"exportedAt":"2024-05-01T10:00:00Z","taskGroups":[]}"#;
        let err = import_json(&mut target, missing_tasks, ImportMode::Replace).unwrap_err();
        assert_eq!(
            err.to_string(),
            "rejected document: at $.tasks: expected array<object>, found undefined"
        );

        let future = r#"{"version":2,"exportedAt":"2024-05-01T10:00:00Z","taskGroups":[],"tasks":[]}"#;
        let err = import_json(&mut target, future, ImportMode::Replace).unwrap_err();
        assert!(matches!(err, PersistError::UnsupportedVersion(2)));
        assert_eq!(err.to_string(), "unsupported export version 2 (expected 1)");

        assert!(import_json(&mut target, "not json", ImportMode::Merge).is_err());
        assert_eq!(target, before);
    }
}
