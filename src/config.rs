use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::{Priority, SortKey};

/// Overrides the database location.
pub const DB_ENV: &str = "TODO_DB";
/// `EnvFilter` directive for log output, e.g. `debug` or `todolist=info`.
pub const LOG_ENV: &str = "TODO_LOG";

pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home_dir).join(".todo.db")
}

#[derive(Debug, Clone)]
pub struct ConfigItem {
    pub key_name: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DefaultPriority,
    DefaultSort,
    SuggestMatches,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [
        ConfigKey::DefaultPriority,
        ConfigKey::DefaultSort,
        ConfigKey::SuggestMatches,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::DefaultPriority => "default_priority",
            ConfigKey::DefaultSort => "default_sort",
            ConfigKey::SuggestMatches => "suggest_matches",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ConfigKey::DefaultPriority => "Priority given to new tasks (1-5)",
            ConfigKey::DefaultSort => "Sort order for task lists (name, priority, created)",
            ConfigKey::SuggestMatches => "Offer the closest name when a lookup misses (true/false)",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            ConfigKey::DefaultPriority => "3",
            ConfigKey::DefaultSort => "created",
            ConfigKey::SuggestMatches => "true",
        }
    }

    /// Check `value` and return it in canonical form.
    pub fn validate(self, value: &str) -> Result<String> {
        let value = value.trim();
        match self {
            ConfigKey::DefaultPriority => {
                let priority = value
                    .parse::<u8>()
                    .ok()
                    .and_then(Priority::new)
                    .ok_or_else(|| anyhow!("default_priority must be a number from 1 to 5"))?;
                Ok(priority.value().to_string())
            }
            ConfigKey::DefaultSort => {
                let key = SortKey::from_str(value).map_err(|e| anyhow!(e))?;
                Ok(key.as_str().to_string())
            }
            ConfigKey::SuggestMatches => match value.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok("true".to_string()),
                "false" | "no" | "off" | "0" => Ok("false".to_string()),
                _ => bail!("suggest_matches must be true or false"),
            },
        }
    }
}

impl FromStr for ConfigKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.name()).collect();
                anyhow!("unknown config key '{}' (known: {})", s, known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub default_priority: Priority,
    pub default_sort: SortKey,
    pub suggest_matches: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_priority: Priority::default(),
            default_sort: SortKey::default(),
            suggest_matches: true,
        }
    }
}

impl Settings {
    /// Unknown keys and invalid values are skipped with a warning.
    pub fn from_items(items: &[ConfigItem]) -> Self {
        let mut settings = Settings::default();
        for item in items {
            let Ok(key) = item.key_name.parse::<ConfigKey>() else {
                log::warn!("ignoring unknown config key '{}'", item.key_name);
                continue;
            };
            let value = match key.validate(&item.value) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("ignoring config {}: {}", item.key_name, e);
                    continue;
                }
            };
            match key {
                ConfigKey::DefaultPriority => {
                    if let Some(priority) = value.parse().ok().and_then(Priority::new) {
                        settings.default_priority = priority;
                    }
                }
                ConfigKey::DefaultSort => {
                    if let Ok(sort) = value.parse() {
                        settings.default_sort = sort;
                    }
                }
                ConfigKey::SuggestMatches => settings.suggest_matches = value == "true",
            }
        }
        settings
    }
}
