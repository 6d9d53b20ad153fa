use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{PriorityFilter, SortKey};

#[derive(Parser)]
#[command(name = "todo", author, version, about = "Task groups, tasks and filters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task group
    GroupAdd {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Rename a task group
    GroupRename {
        #[arg(value_name = "GROUP")]
        group: String,
        #[arg(value_name = "NEW_NAME")]
        name: String,
    },
    /// Delete a task group and its tasks
    GroupDelete {
        #[arg(value_name = "GROUP")]
        group: String,
        /// Keep the group's tasks as ungrouped tasks
        #[arg(long)]
        keep_tasks: bool,
    },
    /// List task groups with their task counts
    GroupList,
    /// Create a task
    Add {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(short = 'd', long)]
        description: Option<String>,
        /// 1 (highest) to 5 (lowest); defaults to the default_priority config
        #[arg(short = 'p', long, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: Option<u8>,
        /// May be repeated
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        #[arg(short = 'g', long, value_name = "GROUP")]
        group: Option<String>,
    },
    /// Change a task's attributes
    Edit {
        #[arg(value_name = "TASK")]
        task: String,
        #[arg(short = 'n', long)]
        name: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(short = 'p', long, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: Option<u8>,
        /// Replaces all tags; may be repeated
        #[arg(short = 't', long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
        /// Move the task into a group
        #[arg(short = 'g', long, value_name = "GROUP")]
        group: Option<String>,
        /// Take the task out of its group
        #[arg(long, conflicts_with = "group")]
        ungroup: bool,
    },
    /// Delete a task
    Delete {
        #[arg(value_name = "TASK")]
        task: String,
    },
    /// Open or close a task card
    Toggle {
        #[arg(value_name = "TASK")]
        task: String,
        /// Open the card whatever its current state
        #[arg(long, conflicts_with = "close")]
        open: bool,
        /// Close the card whatever its current state
        #[arg(long)]
        close: bool,
    },
    /// Add a tag to a task
    TagAdd {
        #[arg(value_name = "TASK")]
        task: String,
        #[arg(value_name = "TAG")]
        tag: String,
    },
    /// Remove a tag from a task
    TagRemove {
        #[arg(value_name = "TASK")]
        task: String,
        #[arg(value_name = "TAG")]
        tag: String,
    },
    /// List tasks, optionally filtered and sorted
    List(ListArgs),
    /// Show one task in full
    Show {
        #[arg(value_name = "TASK")]
        task: String,
    },
    /// Fuzzy search over names, descriptions and tags
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Write all tasks and groups as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Load tasks and groups from an exported JSON file
    Import {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        /// Append to existing data instead of replacing it
        #[arg(long)]
        merge: bool,
    },
    /// Set a config value
    ConfigSet {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Show a config value
    ConfigGet {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List config values
    ConfigList,
    /// Reset a config value to its default
    ConfigDelete {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Delete all tasks and groups (config is kept)
    Clear {
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Launch TUI interface
    Tui,
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ListArgs {
    /// Name contains (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,
    /// Description contains (case-insensitive)
    #[arg(long = "desc", value_name = "TEXT")]
    pub description: Option<String>,
    /// Priority comparison such as 2, <=2, >3 or !=5
    #[arg(short = 'p', long, value_name = "CMP", allow_hyphen_values = true)]
    pub priority: Option<PriorityFilter>,
    /// Required tag; may be repeated
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    /// Match tasks having any of the tags instead of all
    #[arg(long)]
    pub any_tag: bool,
    /// Only tasks in this group
    #[arg(short = 'g', long, value_name = "GROUP")]
    pub group: Option<String>,
    /// Only tasks outside any group
    #[arg(long, conflicts_with = "group")]
    pub ungrouped: bool,
    /// name, priority or created
    #[arg(short = 's', long, value_name = "KEY")]
    pub sort: Option<SortKey>,
    /// Reverse the sort order
    #[arg(short = 'r', long)]
    pub reverse: bool,
}
