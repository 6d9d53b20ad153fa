use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;
pub const DEFAULT_PRIORITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Task priority, 1 (highest) to 5 (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub fn new(value: u8) -> Option<Self> {
        (MIN_PRIORITY..=MAX_PRIORITY)
            .contains(&value)
            .then_some(Priority(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority(DEFAULT_PRIORITY)
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::new(value).ok_or_else(|| {
            format!(
                "priority must be between {} and {}, got {}",
                MIN_PRIORITY, MAX_PRIORITY, value
            )
        })
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<GroupId>,
    pub created_at: DateTime<Utc>,
}

/// Case folding used for tag and group-name comparisons. Full Unicode,
/// so `Über` and `über` are the same tag.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

pub fn same_folded(a: &str, b: &str) -> bool {
    a == b || fold_case(a) == fold_case(b)
}

impl Task {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| same_folded(t, tag))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGroup {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Trim, drop empties and de-duplicate (case-insensitively, first one wins).
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| same_folded(t, tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityComparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl PriorityComparison {
    pub fn holds(self, lhs: u8, rhs: u8) -> bool {
        match self {
            PriorityComparison::Eq => lhs == rhs,
            PriorityComparison::Ne => lhs != rhs,
            PriorityComparison::Lt => lhs < rhs,
            PriorityComparison::Le => lhs <= rhs,
            PriorityComparison::Gt => lhs > rhs,
            PriorityComparison::Ge => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PriorityComparison::Eq => "=",
            PriorityComparison::Ne => "!=",
            PriorityComparison::Lt => "<",
            PriorityComparison::Le => "<=",
            PriorityComparison::Gt => ">",
            PriorityComparison::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityFilter {
    pub comparison: PriorityComparison,
    pub value: Priority,
}

impl PriorityFilter {
    pub fn matches(&self, priority: Priority) -> bool {
        self.comparison.holds(priority.value(), self.value.value())
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparison.symbol(), self.value.value())
    }
}

/// Parses `3`, `=3`, `!=3`, `<3`, `<=3`, `>3`, `>=3`.
impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Two-character operators first so "<=" is not read as "<".
        let (comparison, rest) = [
            ("<=", PriorityComparison::Le),
            (">=", PriorityComparison::Ge),
            ("!=", PriorityComparison::Ne),
            ("==", PriorityComparison::Eq),
            ("<", PriorityComparison::Lt),
            (">", PriorityComparison::Gt),
            ("=", PriorityComparison::Eq),
        ]
        .iter()
        .find_map(|(op, cmp)| s.strip_prefix(op).map(|rest| (*cmp, rest)))
        .unwrap_or((PriorityComparison::Eq, s));

        let value: u8 = rest
            .trim()
            .parse()
            .map_err(|_| format!("invalid priority filter '{}'", s))?;
        let value = Priority::try_from(value)?;
        Ok(PriorityFilter { comparison, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSettings {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityFilter>,
    /// Stored lowercased.
    pub tags: BTreeSet<String>,
    pub tag_mode: TagMode,
}

impl FilterSettings {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.description.is_empty()
            && self.priority.is_none()
            && self.tags.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Priority,
    #[default]
    Created,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Priority => "priority",
            SortKey::Created => "created",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Name => SortKey::Priority,
            SortKey::Priority => SortKey::Created,
            SortKey::Created => SortKey::Name,
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "priority" => Ok(SortKey::Priority),
            "created" => Ok(SortKey::Created),
            other => Err(format!(
                "unknown sort key '{}' (expected name, priority or created)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSettings {
    pub key: SortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Tasks,
    Groups,
    Filter,
}

impl View {
    pub const ALL: [View; 3] = [View::Tasks, View::Groups, View::Filter];

    pub fn index(self) -> usize {
        match self {
            View::Tasks => 0,
            View::Groups => 1,
            View::Filter => 2,
        }
    }

    pub fn next(self) -> Self {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }

    pub fn previous(self) -> Self {
        View::ALL[(self.index() + View::ALL.len() - 1) % View::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Tasks => "Tasks",
            View::Groups => "Groups",
            View::Filter => "Filter",
        }
    }
}

/// Which tasks the task list is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Ungrouped,
    Group {
        #[serde(rename = "groupId")]
        group_id: GroupId,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    pub view: View,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_task: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing_task: Option<TaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Name,
    Description,
    Priority,
    Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupMode {
    None,
    NewTask,
    RenameTask,
    TaskPriority,
    TaskTags,
    NewGroup,
    RenameGroup,
    EditFilter(FilterField),
    TextEditor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorTarget {
    TaskDescription(TaskId),
}
