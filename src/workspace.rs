use anyhow::{bail, Result};

use crate::config::Settings;
use crate::database::Database;
use crate::matcher::{NameIndex, Resolution};
use crate::models::{GroupId, SortDirection, SortSettings, TaskId};
use crate::persistence::{self, ImportMode};
use crate::state::{Action, AppState, FilterAction, ImportSummary, Outcome};
use crate::storage::MemoryStore;

/// Asked when a name lookup only found a close match: `(typed, suggested)`.
pub type Confirm<'a> = &'a mut dyn FnMut(&str, &str) -> bool;

/// Loaded state bound to its stores. Every successful dispatch is saved;
/// when the save fails the in-memory state is rolled back so it never runs
/// ahead of what is stored.
pub struct Workspace {
    db: Database,
    session: MemoryStore,
    state: AppState,
    settings: Settings,
}

impl Workspace {
    pub fn open(db: Database) -> Result<Self> {
        let settings = db.settings()?;
        let session = MemoryStore::new();
        let mut state = persistence::load(&db.local_storage(), &session)?;
        // A fresh session starts with the configured sort order.
        state.dispatch(FilterAction::SetSort(SortSettings {
            key: settings.default_sort,
            direction: SortDirection::Asc,
        }))?;
        Ok(Workspace {
            db,
            session,
            state,
            settings,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn dispatch(&mut self, action: impl Into<Action>) -> Result<Outcome> {
        let action = action.into();
        let touches_durable = matches!(action, Action::Task(_) | Action::Group(_));
        let before = self.state.clone();
        let outcome = self.state.dispatch(action)?;
        let saved = if touches_durable {
            self.save()
        } else {
            persistence::save_session(&self.state, &mut self.session).map_err(Into::into)
        };
        if let Err(err) = saved {
            log::warn!("save failed, rolling back: {:#}", err);
            self.state = before;
            return Err(err);
        }
        Ok(outcome)
    }

    pub fn save(&mut self) -> Result<()> {
        let mut local = self.db.local_storage();
        persistence::save(&self.state, &mut local, &mut self.session)?;
        Ok(())
    }

    /// Re-read everything from the stores, re-validating it.
    pub fn reload(&mut self) -> Result<()> {
        self.settings = self.db.settings()?;
        self.state = persistence::load(&self.db.local_storage(), &self.session)?;
        Ok(())
    }

    pub fn export(&self) -> Result<String> {
        Ok(persistence::export_json(&self.state)?)
    }

    pub fn import(&mut self, text: &str, mode: ImportMode) -> Result<ImportSummary> {
        let before = self.state.clone();
        let summary = persistence::import_json(&mut self.state, text, mode)?;
        if let Err(err) = self.save() {
            log::warn!("save failed, rolling back import: {:#}", err);
            self.state = before;
            return Err(err);
        }
        Ok(summary)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.db.clear_all_data()?;
        self.state.clear_content();
        persistence::save_session(&self.state, &mut self.session)?;
        Ok(())
    }

    /// Accepts `12`, `#12` or a task name.
    pub fn resolve_task(&self, reference: &str, confirm: Confirm<'_>) -> Result<TaskId> {
        if let Some(id) = parse_id(reference).map(TaskId) {
            if self.state.task(id).is_some() {
                return Ok(id);
            }
        }
        let names = self.state.tasks().iter().map(|t| t.name.clone());
        let name = self.resolve_name("task", reference, names, confirm)?;
        match self.state.tasks().iter().find(|t| t.name == name) {
            Some(task) => Ok(task.id),
            None => bail!("task '{}' not found", reference),
        }
    }

    /// Accepts `3`, `#3` or a group name.
    pub fn resolve_group(&self, reference: &str, confirm: Confirm<'_>) -> Result<GroupId> {
        if let Some(id) = parse_id(reference).map(GroupId) {
            if self.state.group(id).is_some() {
                return Ok(id);
            }
        }
        let names = self.state.groups().iter().map(|g| g.name.clone());
        let name = self.resolve_name("group", reference, names, confirm)?;
        match self.state.groups().iter().find(|g| g.name == name) {
            Some(group) => Ok(group.id),
            None => bail!("group '{}' not found", reference),
        }
    }

    fn resolve_name(
        &self,
        kind: &str,
        reference: &str,
        names: impl Iterator<Item = String>,
        confirm: Confirm<'_>,
    ) -> Result<String> {
        match NameIndex::build(names).resolve(reference.trim()) {
            Resolution::Exact(name) => Ok(name),
            Resolution::Suggestion { name, score } if self.settings.suggest_matches => {
                log::debug!("'{}' is closest to '{}' ({:.2})", reference, name, score);
                if confirm(reference, &name) {
                    Ok(name)
                } else {
                    bail!("{} '{}' not found", kind, reference)
                }
            }
            _ => bail!("{} '{}' not found", kind, reference),
        }
    }
}

fn parse_id(reference: &str) -> Option<u64> {
    let reference = reference.trim();
    reference.strip_prefix('#').unwrap_or(reference).parse().ok()
}
