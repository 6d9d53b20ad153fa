//! Application state and the reducers that change it.
//!
//! All mutation goes through [`AppState::dispatch`]. A rejected action
//! leaves the state untouched, and [`AppState::normalize`] re-establishes
//! the same invariants for state assembled from untrusted storage.

mod filter;
mod groups;
mod tasks;
mod ui;

pub use filter::FilterAction;
pub use groups::{GroupAction, TaskDisposal};
pub use tasks::{NewTask, TaskAction, TaskPatch};
pub use ui::UiAction;

use crate::models::{
    fold_case, normalize_tags, same_folded, FilterSettings, GroupId, Scope, SortSettings, Task,
    TaskGroup, TaskId, UiState,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("tag must not be empty")]
    EmptyTag,
    #[error("task {0} does not exist")]
    UnknownTask(TaskId),
    #[error("group {0} does not exist")]
    UnknownGroup(GroupId),
    #[error("a group named '{0}' already exists")]
    DuplicateGroup(String),
    #[error("no free ids left")]
    IdsExhausted,
}

/// Largest id handed out or accepted from storage: the largest integer a
/// JSON number holds exactly.
pub const MAX_ID: u64 = (1 << 53) - 1;

/// One above the largest used id, or the lowest gap once that would pass
/// [`MAX_ID`].
fn free_id(used: &HashSet<u64>) -> Option<u64> {
    used.iter()
        .max()
        .map_or(Some(1), |max| max.checked_add(1))
        .filter(|id| *id <= MAX_ID)
        .or_else(|| (1..=MAX_ID).find(|id| !used.contains(id)))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Task(TaskAction),
    Group(GroupAction),
    Filter(FilterAction),
    Ui(UiAction),
}

impl From<TaskAction> for Action {
    fn from(action: TaskAction) -> Self {
        Action::Task(action)
    }
}

impl From<GroupAction> for Action {
    fn from(action: GroupAction) -> Self {
        Action::Group(action)
    }
}

impl From<FilterAction> for Action {
    fn from(action: FilterAction) -> Self {
        Action::Filter(action)
    }
}

impl From<UiAction> for Action {
    fn from(action: UiAction) -> Self {
        Action::Ui(action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    TaskCreated(TaskId),
    GroupCreated(GroupId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub groups: usize,
    pub tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    tasks: Vec<Task>,
    groups: Vec<TaskGroup>,
    filter: FilterSettings,
    sort: SortSettings,
    ui: UiState,
}

impl AppState {
    /// Assemble state from independently loaded slices and repair anything
    /// that breaks an invariant.
    pub fn from_parts(
        tasks: Vec<Task>,
        groups: Vec<TaskGroup>,
        filter: FilterSettings,
        sort: SortSettings,
        ui: UiState,
    ) -> Self {
        let mut state = AppState {
            tasks,
            groups,
            filter,
            sort,
            ui,
        };
        state.normalize();
        state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn groups(&self) -> &[TaskGroup] {
        &self.groups
    }

    pub fn filter(&self) -> &FilterSettings {
        &self.filter
    }

    pub fn sort(&self) -> SortSettings {
        self.sort
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn group(&self, id: GroupId) -> Option<&TaskGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn group_name(&self, id: GroupId) -> Option<&str> {
        self.group(id).map(|g| g.name.as_str())
    }

    pub fn dispatch(&mut self, action: impl Into<Action>) -> Result<Outcome, StateError> {
        let action = action.into();
        log::debug!("dispatch {:?}", action);
        match action {
            Action::Task(action) => tasks::reduce(self, action),
            Action::Group(action) => groups::reduce(self, action),
            Action::Filter(action) => filter::reduce(self, action),
            Action::Ui(action) => ui::reduce(self, action),
        }
    }

    fn next_task_id(&self) -> Result<TaskId, StateError> {
        let used = self.tasks.iter().map(|t| t.id.0).collect();
        free_id(&used).map(TaskId).ok_or(StateError::IdsExhausted)
    }

    fn next_group_id(&self) -> Result<GroupId, StateError> {
        let used = self.groups.iter().map(|g| g.id.0).collect();
        free_id(&used).map(GroupId).ok_or(StateError::IdsExhausted)
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, StateError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StateError::UnknownTask(id))
    }

    fn require_group(&self, id: GroupId) -> Result<(), StateError> {
        self.group(id).map(|_| ()).ok_or(StateError::UnknownGroup(id))
    }

    fn group_name_taken(&self, name: &str, except: Option<GroupId>) -> bool {
        self.groups
            .iter()
            .any(|g| Some(g.id) != except && same_folded(&g.name, name))
    }

    /// Drop UI references to tasks or groups that no longer exist.
    fn prune_ui(&mut self) {
        let task_exists = |id: Option<TaskId>| id.map_or(true, |id| self.task(id).is_some());
        let selected_ok = task_exists(self.ui.selected_task);
        let editing_ok = task_exists(self.ui.editing_task);
        if !selected_ok {
            self.ui.selected_task = None;
        }
        if !editing_ok {
            self.ui.editing_task = None;
        }
        if let Scope::Group { group_id } = self.ui.scope {
            if self.group(group_id).is_none() {
                self.ui.scope = Scope::All;
            }
        }
    }

    /// Re-establish every invariant the reducers maintain. Ids that are
    /// duplicated or above [`MAX_ID`] get fresh ones; for groups the first
    /// occurrence of an id wins and later ones are dropped.
    pub fn normalize(&mut self) {
        let mut used_groups: HashSet<u64> = self
            .groups
            .iter()
            .map(|g| g.id.0)
            .filter(|id| *id <= MAX_ID)
            .collect();
        let mut renumbered: HashMap<GroupId, GroupId> = HashMap::new();
        let mut seen_groups = HashSet::new();
        let mut kept_groups: Vec<TaskGroup> = Vec::with_capacity(self.groups.len());
        for mut group in std::mem::take(&mut self.groups) {
            if !seen_groups.insert(group.id) {
                log::warn!("dropping group with duplicate id {}", group.id);
                continue;
            }
            if group.id.0 > MAX_ID {
                let Some(id) = free_id(&used_groups) else {
                    log::warn!("no id left for group '{}', dropping it", group.name);
                    continue;
                };
                log::warn!("group {} has an out-of-range id, assigning #{}", group.id, id);
                used_groups.insert(id);
                renumbered.insert(group.id, GroupId(id));
                group.id = GroupId(id);
            }
            group.name = group.name.trim().to_string();
            if group.name.is_empty() {
                group.name = "Untitled group".to_string();
            }
            let base = group.name.clone();
            let mut n = 2;
            while kept_groups
                .iter()
                .any(|g| same_folded(&g.name, &group.name))
            {
                group.name = format!("{} ({})", base, n);
                n += 1;
            }
            kept_groups.push(group);
        }
        let live_groups: HashSet<GroupId> = kept_groups.iter().map(|g| g.id).collect();
        self.groups = kept_groups;

        let mut used_tasks: HashSet<u64> = self
            .tasks
            .iter()
            .map(|t| t.id.0)
            .filter(|id| *id <= MAX_ID)
            .collect();
        let mut seen_tasks = HashSet::new();
        let mut kept_tasks: Vec<Task> = Vec::with_capacity(self.tasks.len());
        for mut task in std::mem::take(&mut self.tasks) {
            if task.id.0 > MAX_ID || !seen_tasks.insert(task.id) {
                let Some(id) = free_id(&used_tasks) else {
                    log::warn!("no id left for task '{}', dropping it", task.name);
                    continue;
                };
                log::warn!("task {} has a duplicate or out-of-range id, assigning #{}", task.id, id);
                used_tasks.insert(id);
                task.id = TaskId(id);
                seen_tasks.insert(task.id);
            }
            task.name = task.name.trim().to_string();
            if task.name.is_empty() {
                task.name = "Untitled task".to_string();
            }
            task.tags = normalize_tags(&task.tags);
            if let Some(group_id) = task.parent_group_id {
                let group_id = renumbered.get(&group_id).copied().unwrap_or(group_id);
                if live_groups.contains(&group_id) {
                    task.parent_group_id = Some(group_id);
                } else {
                    log::warn!("task {} points at missing group {}", task.id, group_id);
                    task.parent_group_id = None;
                }
            }
            kept_tasks.push(task);
        }
        self.tasks = kept_tasks;

        self.filter.name = self.filter.name.trim().to_string();
        self.filter.description = self.filter.description.trim().to_string();
        self.filter.tags = std::mem::take(&mut self.filter.tags)
            .into_iter()
            .map(|t| fold_case(t.trim()))
            .filter(|t| !t.is_empty())
            .collect();

        self.prune_ui();
    }

    /// Swap in imported content wholesale.
    pub fn replace_content(&mut self, groups: Vec<TaskGroup>, tasks: Vec<Task>) -> ImportSummary {
        self.groups = groups;
        self.tasks = tasks;
        self.normalize();
        ImportSummary {
            groups: self.groups.len(),
            tasks: self.tasks.len(),
        }
    }

    /// Append imported content under fresh ids. Groups whose name already
    /// exists are folded into the existing group; of several incoming groups
    /// sharing an id, the first wins. Nothing changes on error.
    pub fn merge_content(
        &mut self,
        groups: Vec<TaskGroup>,
        tasks: Vec<Task>,
    ) -> Result<ImportSummary, StateError> {
        let mut merged = self.clone();
        let mut summary = ImportSummary::default();
        let mut group_map: HashMap<GroupId, GroupId> = HashMap::new();

        for mut group in groups {
            if group_map.contains_key(&group.id) {
                log::warn!("skipping imported group with duplicate id {}", group.id);
                continue;
            }
            let name = group.name.trim().to_string();
            if let Some(existing) = merged.groups.iter().find(|g| same_folded(&g.name, &name)) {
                group_map.insert(group.id, existing.id);
                continue;
            }
            let new_id = merged.next_group_id()?;
            group_map.insert(group.id, new_id);
            group.id = new_id;
            group.name = name;
            merged.groups.push(group);
            summary.groups += 1;
        }

        for mut task in tasks {
            task.id = merged.next_task_id()?;
            task.parent_group_id = task
                .parent_group_id
                .and_then(|old| group_map.get(&old).copied());
            merged.tasks.push(task);
            summary.tasks += 1;
        }

        merged.normalize();
        *self = merged;
        Ok(summary)
    }

    /// Forget all tasks and groups. Filter and sort settings survive.
    pub fn clear_content(&mut self) {
        self.tasks.clear();
        self.groups.clear();
        self.prune_ui();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(id: u64, name: &str, group: Option<u64>) -> Task {
        Task {
            id: TaskId(id),
            name: name.to_string(),
            description: String::new(),
            priority: Priority::default(),
            tags: Vec::new(),
            is_open: false,
            parent_group_id: group.map(GroupId),
            created_at: Utc::now(),
        }
    }

    fn group(id: u64, name: &str) -> TaskGroup {
        TaskGroup {
            id: GroupId(id),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn normalize_repairs_untrusted_state() {
        let mut bad_task = task(1, "  write  ", Some(9));
        bad_task.tags = vec![" a".into(), "A".into(), "".into()];
        let state = AppState::from_parts(
            vec![bad_task, task(1, "dup", None), task(2, "   ", Some(1))],
            vec![group(1, "Home"), group(1, "Shadow"), group(2, "home")],
            FilterSettings::default(),
            SortSettings::default(),
            UiState {
                scope: Scope::Group { group_id: GroupId(42) },
                selected_task: Some(TaskId(77)),
                ..UiState::default()
            },
        );

        let names: Vec<_> = state.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Home", "home (2)"]);

        let tasks = state.tasks();
        assert_eq!(tasks[0].name, "write");
        assert_eq!(tasks[0].parent_group_id, None);
        assert_eq!(tasks[0].tags, vec!["a"]);
        assert_eq!(tasks[1].id, TaskId(3));
        assert_eq!(tasks[2].name, "Untitled task");
        assert_eq!(tasks[2].parent_group_id, Some(GroupId(1)));

        assert_eq!(state.ui().scope, Scope::All);
        assert_eq!(state.ui().selected_task, None);
    }

    #[test]
    fn merge_remaps_ids_and_folds_same_named_groups() {
        let mut state = AppState::from_parts(
            vec![task(1, "existing", Some(1))],
            vec![group(1, "Work")],
            FilterSettings::default(),
            SortSettings::default(),
            UiState::default(),
        );

        let summary = state.merge_content(
            vec![group(1, "work"), group(2, "Garden")],
            vec![task(1, "report", Some(1)), task(2, "weed", Some(2)), task(3, "lost", Some(5))],
        )
        .unwrap();

        assert_eq!(summary, ImportSummary { groups: 1, tasks: 3 });
        assert_eq!(state.groups().len(), 2);
        let by_name = |name: &str| state.tasks().iter().find(|t| t.name == name).unwrap();
        assert_eq!(by_name("report").id, TaskId(2));
        assert_eq!(by_name("report").parent_group_id, Some(GroupId(1)));
        assert_eq!(by_name("weed").parent_group_id, Some(GroupId(2)));
        assert_eq!(by_name("lost").parent_group_id, None);
    }

    #[test]
    fn ids_at_the_top_of_the_range_are_renumbered() {
        let mut state = AppState::from_parts(
            vec![task(u64::MAX, "huge", Some(u64::MAX)), task(MAX_ID, "edge", None)],
            vec![group(u64::MAX, "Far")],
            FilterSettings::default(),
            SortSettings::default(),
            UiState::default(),
        );
        assert!(state.groups().iter().all(|g| g.id.0 <= MAX_ID));
        assert!(state.tasks().iter().all(|t| t.id.0 <= MAX_ID));
        let far = state.groups()[0].id;
        assert_eq!(state.tasks()[0].parent_group_id, Some(far));
        assert_eq!(state.tasks()[1].id, TaskId(MAX_ID));

        // MAX_ID is taken, so new ids come from the lowest gap
        let Ok(Outcome::TaskCreated(id)) = state.dispatch(TaskAction::Create(NewTask::named("next")))
        else {
            panic!("task not created");
        };
        assert!(id.0 < MAX_ID);
        assert!(state.dispatch(GroupAction::Create { name: "Near".into() }).is_ok());

        let summary = state
            .merge_content(vec![group(u64::MAX, "Other")], vec![task(u64::MAX, "more", Some(u64::MAX))])
            .unwrap();
        assert_eq!(summary, ImportSummary { groups: 1, tasks: 1 });
        assert!(state.tasks().iter().all(|t| t.id.0 <= MAX_ID));
    }

    #[test]
    fn non_ascii_group_names_are_deduplicated() {
        let mut state = AppState::from_parts(
            vec![],
            vec![group(1, "Ärger"), group(2, "ärger")],
            FilterSettings::default(),
            SortSettings::default(),
            UiState::default(),
        );
        let names: Vec<_> = state.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Ärger", "ärger (2)"]);

        let summary = state
            .merge_content(vec![group(7, "ÄRGER")], vec![task(1, "sort it", Some(7))])
            .unwrap();
        assert_eq!(summary, ImportSummary { groups: 0, tasks: 1 });
        assert_eq!(state.tasks()[0].parent_group_id, Some(GroupId(1)));
    }

    #[test]
    fn merge_keeps_the_first_of_duplicate_group_ids() {
        let mut state = AppState::default();
        let summary = state
            .merge_content(
                vec![group(1, "First"), group(1, "Second")],
                vec![task(1, "member", Some(1))],
            )
            .unwrap();
        assert_eq!(summary, ImportSummary { groups: 1, tasks: 1 });
        let names: Vec<_> = state.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["First"]);
        let parent = state.tasks()[0].parent_group_id.and_then(|id| state.group_name(id));
        assert_eq!(parent, Some("First"));
    }

    #[test]
    fn replace_resets_dangling_ui_references() {
        let mut state = AppState::from_parts(
            vec![task(1, "old", None)],
            vec![],
            FilterSettings::default(),
            SortSettings::default(),
            UiState {
                selected_task: Some(TaskId(1)),
                ..UiState::default()
            },
        );
        let summary = state.replace_content(vec![group(4, "New")], vec![task(5, "fresh", Some(4))]);
        assert_eq!(summary, ImportSummary { groups: 1, tasks: 1 });
        assert_eq!(state.ui().selected_task, None);
        assert_eq!(state.task(TaskId(5)).unwrap().parent_group_id, Some(GroupId(4)));
    }
}
