use std::{error::Error, path::PathBuf};

use clap::Parser;
use log::info;
use mixer::{Router, RouterConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Resolve the backend node owning a shard key", long_about = None)]
struct Cli {
    /// Path to the JSON rule file
    config: PathBuf,
    /// Schema name
    schema: String,
    /// Table name
    table: String,
    /// Shard key value
    #[arg(allow_negative_numbers = true)]
    key: i64,
    /// Only use the table's own rule, never the schema default rule
    #[arg(long)]
    exact: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = RouterConfig::from_path(&cli.config)?;
    let router = Router::new(&cfg)?;

    let rule = if cli.exact {
        router.get_rule(&cli.schema, &cli.table)
    } else {
        router.route(&cli.schema, &cli.table)
    }
    .ok_or_else(|| format!("no rule for '{}.{}'", cli.schema, cli.table))?;

    info!("resolved '{}.{}' to a {} rule", cli.schema, cli.table, rule.rule_type());
    println!("{} {}", rule.rule_type(), rule.find_node(cli.key));
    Ok(())
}
