//! `dmp-server` binary: serve, seed, list

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dmp_server::{init_logging, serve, ServerConfig};
use dmp_store::{load_seed_file, seed, CatalogStore, SeedMode};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("dmp-server")
        .version(dmp_server::VERSION)
        .about("Data marketplace catalog server")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(Command::new("serve").about("Run the HTTP server (default)"))
        .subcommand(
            Command::new("seed")
                .about("Load products from a seed file")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON seed file"),
                )
                .arg(
                    Arg::new("replace")
                        .long("replace")
                        .action(ArgAction::SetTrue)
                        .help("Replace a non-empty catalog instead of skipping"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("Print stored products")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config_path = matches.get_one::<PathBuf>("config").cloned();
    let config = ServerConfig::load(config_path.as_deref()).context("invalid configuration")?;
    init_logging(config.log_format);

    match matches.subcommand() {
        Some(("seed", args)) => run_seed(&config, args),
        Some(("list", args)) => run_list(&config, args.get_flag("json")),
        _ => tokio::runtime::Runtime::new()
            .context("failed to start runtime")?
            .block_on(serve(config)),
    }
}

fn run_seed(config: &ServerConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let file = args
        .get_one::<PathBuf>("file")
        .context("--file is required")?;
    let mode = if args.get_flag("replace") {
        SeedMode::Replace
    } else {
        SeedMode::IfEmpty
    };

    let inputs = load_seed_file(file)?;
    let store = CatalogStore::open(&config.store)?;
    let report = seed(&store, inputs, mode)?;
    store.close();

    if report.skipped_existing > 0 {
        println!(
            "Catalog already holds {} products; nothing seeded (use --replace to overwrite)",
            report.skipped_existing
        );
    } else {
        println!("Seeded {} products", report.inserted);
    }
    Ok(())
}

fn run_list(config: &ServerConfig, json: bool) -> anyhow::Result<()> {
    let store = CatalogStore::open(&config.store)?;
    let report = store.list_products_report()?;
    store.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&report.products)?);
        return Ok(());
    }
    for product in &report.products {
        let a = &product.attributes;
        println!("{}  {}  [{}]  {}", product.id, a.name, a.domain, product.tags.join(", "));
    }
    println!("{} products", report.products.len());
    for skipped in &report.skipped {
        eprintln!("warning: {skipped}");
    }
    Ok(())
}
