use super::{AppState, Outcome, StateError};
use crate::models::{fold_case, FilterSettings, PriorityFilter, SortSettings, TagMode};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    SetName(String),
    SetDescription(String),
    SetPriority(Option<PriorityFilter>),
    AddTag(String),
    RemoveTag(String),
    SetTags(Vec<String>),
    SetTagMode(TagMode),
    Clear,
    SetSort(SortSettings),
}

pub(super) fn reduce(state: &mut AppState, action: FilterAction) -> Result<Outcome, StateError> {
    let filter = &mut state.filter;
    match action {
        FilterAction::SetName(name) => filter.name = name.trim().to_string(),
        FilterAction::SetDescription(text) => filter.description = text.trim().to_string(),
        FilterAction::SetPriority(priority) => filter.priority = priority,
        FilterAction::AddTag(tag) => {
            let tag = fold_case(tag.trim());
            if tag.is_empty() {
                return Err(StateError::EmptyTag);
            }
            filter.tags.insert(tag);
        }
        FilterAction::RemoveTag(tag) => {
            filter.tags.remove(&fold_case(tag.trim()));
        }
        FilterAction::SetTags(tags) => {
            filter.tags = tags
                .iter()
                .map(|t| fold_case(t.trim()))
                .filter(|t| !t.is_empty())
                .collect();
        }
        FilterAction::SetTagMode(mode) => filter.tag_mode = mode,
        // Sort order is a view preference, not a filter: it survives a clear.
        FilterAction::Clear => *filter = FilterSettings::default(),
        FilterAction::SetSort(sort) => state.sort = sort,
    }
    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortDirection, SortKey};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    #[test]
    fn tags_are_stored_lowercase() {
        let mut state = AppState::default();
        state.dispatch(FilterAction::AddTag(" Home ".into())).unwrap();
        state.dispatch(FilterAction::AddTag("HOME".into())).unwrap();
        state.dispatch(FilterAction::AddTag("work".into())).unwrap();
        assert_eq!(
            state.filter().tags,
            BTreeSet::from(["home".to_string(), "work".to_string()])
        );
        state.dispatch(FilterAction::RemoveTag("Work".into())).unwrap();
        assert_eq!(state.filter().tags.len(), 1);
        assert_eq!(
            state.dispatch(FilterAction::AddTag("  ".into())),
            Err(StateError::EmptyTag)
        );
    }

    #[test]
    fn clear_resets_filter_but_keeps_sort() {
        let mut state = AppState::default();
        let sort = SortSettings {
            key: SortKey::Priority,
            direction: SortDirection::Desc,
        };
        state.dispatch(FilterAction::SetSort(sort)).unwrap();
        state.dispatch(FilterAction::SetName("report".into())).unwrap();
        state
            .dispatch(FilterAction::SetPriority("<3".parse().ok()))
            .unwrap();
        state.dispatch(FilterAction::SetTagMode(TagMode::Any)).unwrap();
        assert!(!state.filter().is_empty());

        state.dispatch(FilterAction::Clear).unwrap();
        assert_eq!(state.filter(), &FilterSettings::default());
        assert_eq!(state.sort(), sort);
    }
}
