//! CLI command handling
//!
//! Dispatches CLI commands to the registrar and the scenario engine and
//! formats output.

use colored::Colorize;
use std::path::Path;

use crate::bridge::{EnvironmentBridge, ProcessEnvBridge, StaticBridge, TelemetryBridge};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, paths, Error, Result};
use crate::registrar::TestSuite;
use crate::scenario::{compile, load_fixture, Environment, RunOptions, ScenarioRunner};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config, verbose: bool) -> Result<()> {
    match command {
        Commands::Run {
            dir,
            filter,
            host,
            port,
            env,
            inherit_env,
            profile,
            catalog,
        } => {
            let mut suite = TestSuite::discover(&dir, &config.harness.fixture_extension)?;
            if let Some(pattern) = &filter {
                suite = suite.filter(pattern);
                if suite.is_empty() {
                    println!("No test cases match '{}'", pattern);
                    return Ok(());
                }
            }

            let overrides = parse_env_pairs(&env)?;
            let bridge: Box<dyn EnvironmentBridge> = match (profile, catalog) {
                (Some(profile), Some(path)) => {
                    let mut bridge =
                        TelemetryBridge::from_credentials_file(profile, config.clone(), &path)?;
                    for (key, value) in overrides.iter() {
                        bridge = bridge.with_resource(key, value);
                    }
                    Box::new(bridge)
                }
                (Some(_), None) => {
                    return Err(Error::Config("--profile requires --catalog".to_string()));
                }
                (None, _) if inherit_env => {
                    Box::new(ProcessEnvBridge::all().with_overrides(overrides))
                }
                (None, _) => Box::new(StaticBridge::new(overrides)),
            };

            let options = RunOptions {
                host,
                port,
                echo: verbose,
                ..RunOptions::from_config(&config)
            };
            let runner = ScenarioRunner::with_reqwest(options)?;

            println!(
                "Running {} test case(s) from {}",
                suite.len(),
                suite.dir().display()
            );
            let report = suite.run_all(bridge.as_ref(), &runner).await;
            report.print();

            if report.is_success() {
                Ok(())
            } else {
                Err(Error::SuiteFailed {
                    failed: report.failed(),
                    total: report.total(),
                })
            }
        }

        Commands::List { dir } => {
            let suite = TestSuite::discover(&dir, &config.harness.fixture_extension)?;
            for case in suite.cases() {
                println!("{}  {}", case.name, case.filename.dimmed());
            }
            Ok(())
        }

        Commands::Check { path } => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    Error::Config(format!("invalid scenario path '{}'", path.display()))
                })?;

            let scenario = compile(&load_fixture(dir, filename, config.cert_validate())?)?;
            println!(
                "{} {}: {} step(s)",
                "✓".green(),
                scenario.name,
                scenario.steps.len()
            );
            for step in &scenario.steps {
                let skipped = if step.skip.is_some() { " (skip)" } else { "" };
                println!("  {}. {} {}{}", step.index, step.method, step.name, skipped);
            }
            Ok(())
        }

        Commands::Config => {
            match paths::config_path() {
                Some(path) if path.exists() => println!("# {}", path.display()),
                Some(path) => println!("# {} (not found, using defaults)", path.display()),
                None => println!("# no configuration directory, using defaults"),
            }
            if let Some(log) = logging::log_file_path() {
                println!("# log file: {}", log.display());
            }
            let rendered =
                toml::to_string_pretty(&config).map_err(|e| Error::Config(e.to_string()))?;
            print!("{}", rendered);
            Ok(())
        }
    }
}

/// Parse repeated `KEY=VALUE` arguments
fn parse_env_pairs(pairs: &[String]) -> Result<Environment> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(Error::Config(format!(
                "invalid --env value '{}', expected KEY=VALUE",
                pair
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}
