//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::ForestSource;
use crate::cli::args::{ChangeArgs, Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, DisplayConfig, Settings};
use crate::domain::{find, violations, Node, NodeId};
use crate::infrastructure::ServiceContainer;
use crate::render::ToTermTree;

/// How a change command alters the target node.
#[derive(Debug, Clone, Copy)]
enum Change {
    Set(bool),
    Toggle,
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    execute_command_with_global(cli, global_config_path().as_deref())
}

/// Run a command with an explicit global config path instead of the XDG location.
pub fn execute_command_with_global(cli: &Cli, global_path: Option<&Path>) -> CliResult<()> {
    let local_dir = cli.file.as_deref().and_then(Path::parent);
    let settings = Settings::load_from(global_path, local_dir)?;
    let container = ServiceContainer::new(settings);
    let file = cli.file.as_deref();

    match &cli.command {
        Some(Commands::Show) => cmd_show(&container, file),
        Some(Commands::Select(args)) => cmd_change(&container, file, args, Change::Set(true)),
        Some(Commands::Deselect(args)) => cmd_change(&container, file, args, Change::Set(false)),
        Some(Commands::Toggle(args)) => cmd_change(&container, file, args, Change::Toggle),
        Some(Commands::Check) => cmd_check(&container, file),
        Some(Commands::Leaves) => cmd_leaves(&container, file),
        Some(Commands::Config { command }) => cmd_config(&container, command, local_dir),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

fn print_forest(forest: &[Node], display: &DisplayConfig) {
    for tree in forest.to_term_trees(display) {
        output::info(&tree);
    }
}

fn parse_id(raw: &str) -> CliResult<NodeId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidArgs("node id must not be empty".into()));
    }
    Ok(NodeId::from(trimmed))
}

#[instrument(skip(container))]
fn cmd_show(container: &ServiceContainer, file: Option<&Path>) -> CliResult<()> {
    let (forest, _) = container.selection.open(file)?;
    print_forest(&forest, &container.settings.display);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_change(
    container: &ServiceContainer,
    file: Option<&Path>,
    args: &ChangeArgs,
    change: Change,
) -> CliResult<()> {
    let id = parse_id(&args.id)?;
    let (forest, source) = container.selection.open(file)?;
    if args.write && source == ForestSource::Sample {
        return Err(CliError::Usage(
            "--write needs a forest document (--file or forest_file)".into(),
        ));
    }

    let updated = match change {
        Change::Set(checked) => container.selection.apply(&forest, &id, checked)?,
        Change::Toggle => container.selection.toggle(&forest, &id)?,
    };

    match find(&updated, &id) {
        Some(node) if node.selected => output::success(&format!("{} selected", id)),
        Some(_) => output::success(&format!("{} deselected", id)),
        None => output::warning(&format!("node not found: {}, forest unchanged", id)),
    }

    if let (true, ForestSource::File(path)) = (args.write, &source) {
        container.selection.save(path, &updated)?;
        output::action("Wrote", &path.display());
    }

    print_forest(&updated, &container.settings.display);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_check(container: &ServiceContainer, file: Option<&Path>) -> CliResult<()> {
    // Stored values, not the normalized view
    let (forest, _) = container.selection.open_with(file, false)?;
    let found = violations(&forest);
    debug!("check: {} violations", found.len());

    if found.is_empty() {
        output::success("forest is consistent");
        return Ok(());
    }

    output::header(&format!(
        "Inconsistent nodes: {}",
        found.iter().map(|v| v.id.as_str()).join(", ")
    ));
    for violation in &found {
        output::failure(violation);
    }
    Err(CliError::CheckFailed(found.len()))
}

#[instrument(skip(container))]
fn cmd_leaves(container: &ServiceContainer, file: Option<&Path>) -> CliResult<()> {
    let (forest, _) = container.selection.open(file)?;
    for id in container.selection.selected_leaves(&forest)? {
        output::info(&id);
    }
    Ok(())
}

fn cmd_config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    local_dir: Option<&Path>,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::warning("no global config directory on this platform"),
            }
            if let Some(dir) = local_dir {
                output::action("Local", &local_config_path(dir).display());
            }
        }
    }
    Ok(())
}
