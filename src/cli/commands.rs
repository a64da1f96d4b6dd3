//! Command dispatch: settings resolution and pipeline runs

use std::io::{self, Write};

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, Catalog, FieldProvider, Manifest, Pipeline};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::infrastructure::{FileSource, Graph, GraphSource, InfraError};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Files { directory, paths }) => cmd_files(cli, *directory, paths),
        Some(Commands::Graph { roots }) => cmd_graph(cli, roots),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        None => Err(CliError::Usage(
            "no command given, try 'hiertree --help'".to_string(),
        )),
    }
}

/// Effective settings: config layers with command line flags on top.
pub fn resolve_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.closure {
        settings.closure = true;
    }
    if let Some(parallel) = cli.parallel {
        settings.parallel = parallel;
    }
    if !cli.sort.is_empty() {
        settings.sort = cli.sort.clone();
    }
    if let Some(mode) = &cli.output {
        settings.output = mode.parse()?;
    }
    debug!(?settings, "resolved settings");
    Ok(settings)
}

#[instrument(level = "debug", skip(cli))]
fn cmd_files(cli: &Cli, directory: bool, paths: &[String]) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let source = FileSource::new().with_directories(directory);
    run(settings, paths, &source)
}

#[instrument(level = "debug", skip(cli))]
fn cmd_graph(cli: &Cli, roots: &[String]) -> CliResult<()> {
    let settings = resolve_settings(cli)?;
    let graph = Graph::demo().map_err(ApplicationError::from)?;
    run(settings, roots, &GraphSource::new(&graph))
}

fn run<S>(settings: Settings, specs: &[String], source: &S) -> CliResult<()>
where
    S: Catalog,
    S::Element: FieldProvider + Manifest,
{
    let pipeline = Pipeline::new(settings)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = pipeline.process(specs, source, &mut out);
    pipeline.close();
    let count = result?;
    out.flush()
        .map_err(|e| InfraError::io("flush stdout", e))?;
    info!("processed {count} elements");
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = resolve_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                output::labelled("global", &path.display());
                if !path.exists() {
                    output::warning("global config file does not exist");
                }
            }
            None => output::warning("no config directory available on this platform"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::OutputMode;
    use clap::Parser;

    #[test]
    fn given_flags_when_resolving_settings_then_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "hiertree", "-c", "-p", "3", "-s", "-value", "-o", "wide", "graph",
        ])
        .unwrap();
        let settings = resolve_settings(&cli).unwrap();
        assert!(settings.closure);
        assert_eq!(settings.parallel, 3);
        assert_eq!(settings.sort, ["-value"]);
        assert_eq!(settings.output, OutputMode::Wide);
    }

    #[test]
    fn given_bad_output_mode_when_resolving_then_usage_exit_code() {
        let cli = Cli::try_parse_from(["hiertree", "-o", "html", "graph"]).unwrap();
        let err = resolve_settings(&cli).unwrap_err();
        assert_eq!(err.exit_code(), crate::exitcode::USAGE);
    }

    #[test]
    fn given_no_command_when_executing_then_usage_error() {
        let cli = Cli::try_parse_from(["hiertree"]).unwrap();
        assert!(matches!(execute_command(&cli), Err(CliError::Usage(_))));
    }
}
