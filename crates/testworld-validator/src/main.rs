//! `testworld-validate`: check the built-in world catalog against fixture files

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;
use testworld_core::{TestWorldsConfig, WorldRegistry};
use testworld_validator::WorldValidator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("testworld-validate")
        .version(testworld_validator::VERSION)
        .about("Validate test world definitions and their fixture files")
        .arg(
            Arg::new("fixtures-root")
                .long("fixtures-root")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding {world}/... fixture files"),
        )
        .arg(
            Arg::new("world")
                .long("world")
                .action(ArgAction::Append)
                .help("Validate only this world (repeatable)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        );

    let matches = cli.get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => TestWorldsConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TestWorldsConfig::from_env().context("reading environment overrides")?,
    };
    if let Some(root) = matches.get_one::<PathBuf>("fixtures-root") {
        config.fixtures_root.clone_from(root);
    }

    let validator = WorldValidator::from_config(Arc::new(WorldRegistry::builtin()), &config);
    let report = match matches.get_many::<String>("world") {
        Some(worlds) => validator.validate_worlds(worlds).await?,
        None => validator.validate_all().await,
    };

    if matches.get_flag("json") {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.generate_text());
    }

    std::process::exit(report.exit_code());
}
