use crate::models::{FilterSettings, GroupId, Scope, SortDirection, SortKey, SortSettings, TagMode, Task};
use crate::state::AppState;
use std::cmp::Ordering;
use std::collections::BTreeMap;

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn matches(task: &Task, filter: &FilterSettings) -> bool {
    if !contains_ignore_case(&task.name, &filter.name) {
        return false;
    }
    if !contains_ignore_case(&task.description, &filter.description) {
        return false;
    }
    if let Some(priority) = &filter.priority {
        if !priority.matches(task.priority) {
            return false;
        }
    }
    if filter.tags.is_empty() {
        return true;
    }
    match filter.tag_mode {
        TagMode::All => filter.tags.iter().all(|tag| task.has_tag(tag)),
        TagMode::Any => filter.tags.iter().any(|tag| task.has_tag(tag)),
    }
}

pub fn in_scope(task: &Task, scope: Scope) -> bool {
    match scope {
        Scope::All => true,
        Scope::Ungrouped => task.parent_group_id.is_none(),
        Scope::Group { group_id } => task.parent_group_id == Some(group_id),
    }
}

pub fn compare(a: &Task, b: &Task, sort: SortSettings) -> Ordering {
    let primary = match sort.key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Priority => a.priority.cmp(&b.priority),
        SortKey::Created => a.created_at.cmp(&b.created_at),
    };
    let primary = match sort.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Tasks in the current scope that pass the filter, in sort order.
pub fn visible_tasks(state: &AppState) -> Vec<&Task> {
    let scope = state.ui().scope;
    let mut tasks: Vec<&Task> = state
        .tasks()
        .iter()
        .filter(|t| in_scope(t, scope) && matches(t, state.filter()))
        .collect();
    tasks.sort_by(|a, b| compare(a, b, state.sort()));
    tasks
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupCounts {
    pub by_group: BTreeMap<GroupId, usize>,
    pub ungrouped: usize,
}

impl GroupCounts {
    pub fn of(&self, id: GroupId) -> usize {
        self.by_group.get(&id).copied().unwrap_or(0)
    }
}

pub fn group_counts(state: &AppState) -> GroupCounts {
    let mut counts = GroupCounts::default();
    for task in state.tasks() {
        match task.parent_group_id {
            Some(id) => *counts.by_group.entry(id).or_insert(0) += 1,
            None => counts.ungrouped += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskId};
    use crate::state::{FilterAction, GroupAction, NewTask, TaskAction, UiAction};
    use pretty_assertions::assert_eq;

    fn add(state: &mut AppState, name: &str, description: &str, priority: u8, tags: &[&str], group: Option<GroupId>) {
        state
            .dispatch(TaskAction::Create(NewTask {
                name: name.into(),
                description: description.into(),
                priority: Priority::new(priority).unwrap(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                group,
            }))
            .unwrap();
    }

    fn sample() -> AppState {
        let mut state = AppState::default();
        state
            .dispatch(GroupAction::Create { name: "Work".into() })
            .unwrap();
        let work = Some(GroupId(1));
        add(&mut state, "Quarterly report", "numbers for Q3", 1, &["office", "urgent"], work);
        add(&mut state, "book dentist", "call before noon", 2, &["health"], None);
        add(&mut state, "Answer email", "", 4, &["office"], work);
        add(&mut state, "water plants", "balcony", 5, &[], None);
        state
    }

    fn names(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn empty_filter_shows_everything_in_creation_order() {
        let state = sample();
        assert_eq!(visible_tasks(&state).len(), 4);
        assert_eq!(visible_tasks(&state)[0].id, TaskId(1));
    }

    #[test]
    fn name_and_description_are_case_insensitive_substrings() {
        let mut state = sample();
        state.dispatch(FilterAction::SetName("REPORT".into())).unwrap();
        assert_eq!(names(&visible_tasks(&state)), vec!["Quarterly report"]);

        state.dispatch(FilterAction::Clear).unwrap();
        state
            .dispatch(FilterAction::SetDescription("Noon".into()))
            .unwrap();
        assert_eq!(names(&visible_tasks(&state)), vec!["book dentist"]);
    }

    #[test]
    fn priority_comparison_uses_numeric_value() {
        let mut state = sample();
        state
            .dispatch(FilterAction::SetPriority(">=4".parse().ok()))
            .unwrap();
        assert_eq!(
            names(&visible_tasks(&state)),
            vec!["Answer email", "water plants"]
        );
    }

    #[test]
    fn tag_modes() {
        let mut state = sample();
        state.dispatch(FilterAction::AddTag("office".into())).unwrap();
        state.dispatch(FilterAction::AddTag("urgent".into())).unwrap();
        assert_eq!(names(&visible_tasks(&state)), vec!["Quarterly report"]);

        state.dispatch(FilterAction::SetTagMode(TagMode::Any)).unwrap();
        assert_eq!(
            names(&visible_tasks(&state)),
            vec!["Quarterly report", "Answer email"]
        );
    }

    #[test]
    fn tags_match_regardless_of_unicode_case() {
        let mut state = sample();
        add(&mut state, "renew permit", "", 3, &["Über"], None);
        state.dispatch(FilterAction::AddTag("Über".into())).unwrap();
        assert_eq!(names(&visible_tasks(&state)), vec!["renew permit"]);

        state.dispatch(FilterAction::SetTags(vec!["ÜBER".into()])).unwrap();
        assert_eq!(names(&visible_tasks(&state)), vec!["renew permit"]);
    }

    #[test]
    fn scope_limits_to_group_or_ungrouped() {
        let mut state = sample();
        state
            .dispatch(UiAction::SetScope(Scope::Group { group_id: GroupId(1) }))
            .unwrap();
        assert_eq!(
            names(&visible_tasks(&state)),
            vec!["Quarterly report", "Answer email"]
        );
        state.dispatch(UiAction::SetScope(Scope::Ungrouped)).unwrap();
        assert_eq!(
            names(&visible_tasks(&state)),
            vec!["book dentist", "water plants"]
        );
    }

    #[test]
    fn sorting_by_name_and_priority() {
        let mut state = sample();
        state
            .dispatch(FilterAction::SetSort(SortSettings {
                key: SortKey::Name,
                direction: SortDirection::Asc,
            }))
            .unwrap();
        assert_eq!(
            names(&visible_tasks(&state)),
            vec!["Answer email", "book dentist", "Quarterly report", "water plants"]
        );

        state
            .dispatch(FilterAction::SetSort(SortSettings {
                key: SortKey::Priority,
                direction: SortDirection::Desc,
            }))
            .unwrap();
        assert_eq!(
            names(&visible_tasks(&state)),
            vec!["water plants", "Answer email", "book dentist", "Quarterly report"]
        );
    }

    #[test]
    fn counts_per_group() {
        let state = sample();
        let counts = group_counts(&state);
        assert_eq!(counts.of(GroupId(1)), 2);
        assert_eq!(counts.ungrouped, 2);
        assert_eq!(counts.of(GroupId(9)), 0);
    }
}
