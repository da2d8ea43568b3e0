//! Default Content command line
//!
//! Imports a module's default content into the in-memory storage backend,
//! optionally restored from and written back to a JSON state file.

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use default_content::core::Config;
use default_content::entity::{EntityClass, EntityTypeRegistry, StaticRegistry};
use default_content::events::ImportEvent;
use default_content::storage::MemoryStorage;
use default_content::Importer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config = configure(&matches)?;

    match matches.subcommand() {
        Some(("import", sub)) => {
            default_content::init(&config)?;
            import(&config, sub)
        }
        Some(("types", _)) => {
            list_types(&config);
            Ok(())
        }
        _ => unreachable!("subcommand_required"),
    }
}

fn cli() -> Command {
    Command::new("default-content")
        .version(default_content::VERSION)
        .about("Import bundled default content in dependency order.")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file path")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .help("Log level (trace, debug, info, warn, error)")
        )
        .subcommand(
            Command::new("import")
                .about("Import the default content of a module")
                .arg(Arg::new("module").value_name("MODULE").required(true))
                .arg(
                    Arg::new("update")
                        .long("update")
                        .action(ArgAction::SetTrue)
                        .help("Update entities that already exist")
                )
                .arg(
                    Arg::new("modules-dir")
                        .long("modules-dir")
                        .value_name("DIR")
                        .help("Directory containing the modules")
                )
                .arg(
                    Arg::new("state")
                        .long("state")
                        .value_name("FILE")
                        .help("JSON state file for the memory backend")
                )
        )
        .subcommand(Command::new("types").about("List the configured entity types"))
}

/// Layer file, environment and command line settings, then validate once
fn configure(matches: &ArgMatches) -> anyhow::Result<Config> {
    let path = matches.get_one::<String>("config").map(Path::new);
    let mut config = Config::read(path)?;

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    if let Some(("import", sub)) = matches.subcommand() {
        apply_import_overrides(&mut config, sub);
    }

    config.validate()?;
    Ok(config)
}

/// Apply `import` argument overrides to configuration
fn apply_import_overrides(config: &mut Config, matches: &ArgMatches) {
    if matches.get_flag("update") {
        config.import.update_existing = true;
    }

    if let Some(dir) = matches.get_one::<String>("modules-dir") {
        config.import.modules_dir = PathBuf::from(dir);
    }

    if let Some(state) = matches.get_one::<String>("state") {
        config.import.state_file = Some(PathBuf::from(state));
    }
}

fn import(config: &Config, matches: &ArgMatches) -> anyhow::Result<()> {
    let module = matches
        .get_one::<String>("module")
        .context("missing module name")?;

    let registry = Arc::new(StaticRegistry::from_config(&config.entity_types));
    let storage = match &config.import.state_file {
        Some(path) if path.exists() => MemoryStorage::restore(registry.as_ref(), path)
            .with_context(|| format!("failed to restore state from {}", path.display()))?,
        _ => MemoryStorage::new(registry.as_ref()),
    };

    let importer = Importer::builder(storage)
        .config(config.import.clone())
        .registry(registry)
        .listener(|event: &ImportEvent| {
            info!(
                event = %event.kind,
                module = %event.module,
                entities = event.entities.len(),
                "notified"
            );
        })
        .build();

    let outcome = importer.import(module)?;

    if let Some(path) = &config.import.state_file {
        importer
            .storage()
            .snapshot(path)
            .with_context(|| format!("failed to write state to {}", path.display()))?;
    }

    println!(
        "{}: {} created, {} updated, {} skipped",
        outcome.module,
        outcome.created.len(),
        outcome.updated.len(),
        outcome.skipped
    );
    Ok(())
}

fn list_types(config: &Config) {
    let registry = StaticRegistry::from_config(&config.entity_types);
    for definition in registry.definitions() {
        let kind = match definition.class {
            EntityClass::Config => "config".to_string(),
            EntityClass::Content(caps) => {
                let mut kind = "content".to_string();
                if caps.revisionable {
                    kind.push_str(", revisionable");
                }
                if caps.owner {
                    kind.push_str(", owned");
                }
                kind
            }
        };
        println!("{:<20} {:<8} {}", definition.id, definition.keys.id, kind);
    }
}
