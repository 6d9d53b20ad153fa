mod cli;
mod commands;
mod config;
mod database;
mod editor;
mod matcher;
mod models;
mod persistence;
mod query;
mod schema;
mod state;
mod storage;
mod ui;
mod workspace;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::{AddArgs, EditArgs};
use database::Database;
use tracing_subscriber::EnvFilter;
use ui::run_tui;
use workspace::Workspace;

fn init_logging() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        use clap_complete::{generate, Shell};
        let shell = shell.to_lowercase();
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "elvish" => Shell::Elvish,
            "powershell" => Shell::PowerShell,
            _ => {
                println!("Unsupported shell: {}", shell);
                return Ok(());
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "todo", &mut std::io::stdout());
        return Ok(());
    }

    // Log lines would tear the alternate screen
    if !matches!(cli.command, None | Some(Commands::Tui)) {
        init_logging();
    }

    let db = Database::open(&config::database_path())?;
    let mut ws = Workspace::open(db)?;

    match cli.command {
        Some(Commands::GroupAdd { name }) => {
            commands::group_add(&mut ws, &name)?;
        }
        Some(Commands::GroupRename { group, name }) => {
            commands::group_rename(&mut ws, &group, &name)?;
        }
        Some(Commands::GroupDelete { group, keep_tasks }) => {
            commands::group_delete(&mut ws, &group, keep_tasks)?;
        }
        Some(Commands::GroupList) => {
            commands::group_list(&ws)?;
        }
        Some(Commands::Add {
            name,
            description,
            priority,
            tags,
            group,
        }) => {
            commands::add(
                &mut ws,
                AddArgs {
                    name,
                    description,
                    priority,
                    tags,
                    group,
                },
            )?;
        }
        Some(Commands::Edit {
            task,
            name,
            description,
            priority,
            tags,
            clear_tags,
            group,
            ungroup,
        }) => {
            commands::edit(
                &mut ws,
                EditArgs {
                    task,
                    name,
                    description,
                    priority,
                    tags,
                    clear_tags,
                    group,
                    ungroup,
                },
            )?;
        }
        Some(Commands::Delete { task }) => {
            commands::delete(&mut ws, &task)?;
        }
        Some(Commands::Toggle { task, open, close }) => {
            let force = match (open, close) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::toggle(&mut ws, &task, force)?;
        }
        Some(Commands::TagAdd { task, tag }) => {
            commands::tag_add(&mut ws, &task, &tag)?;
        }
        Some(Commands::TagRemove { task, tag }) => {
            commands::tag_remove(&mut ws, &task, &tag)?;
        }
        Some(Commands::List(args)) => {
            commands::list(&mut ws, args)?;
        }
        Some(Commands::Show { task }) => {
            commands::show(&ws, &task)?;
        }
        Some(Commands::Search { query }) => {
            commands::search(&ws, &query)?;
        }
        Some(Commands::Export { output }) => {
            commands::export(&ws, output.as_deref())?;
        }
        Some(Commands::Import { path, merge }) => {
            commands::import(&mut ws, &path, merge)?;
        }
        Some(Commands::ConfigSet { key, value }) => {
            commands::config_set(&ws, &key, &value)?;
        }
        Some(Commands::ConfigGet { key }) => {
            commands::config_get(&ws, &key)?;
        }
        Some(Commands::ConfigList) => {
            commands::config_list(&ws)?;
        }
        Some(Commands::ConfigDelete { key }) => {
            commands::config_delete(&ws, &key)?;
        }
        Some(Commands::Clear { yes }) => {
            commands::clear(&mut ws, yes)?;
        }
        Some(Commands::Completions { .. }) => {}
        Some(Commands::Tui) | None => {
            // Default behavior: launch TUI
            run_tui(ws)?;
        }
    }

    Ok(())
}
