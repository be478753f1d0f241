use clap::Parser;
use rulecast::{config, rule::file::load_rules, EngineConfig, Error, Facts, RulesEngine};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to rule file
    #[arg(short, long)]
    rules: PathBuf,

    /// Path to facts file
    #[arg(short, long)]
    facts: PathBuf,

    /// Path to engine config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only check whether this event would fire
    #[arg(short, long)]
    evaluate: Option<String>,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    debug!("config: {:?}", config);

    let engine = RulesEngine::new(config);
    engine.add_rules(load_rules(&cli.rules)?);
    let facts: Value = config::from_file(&cli.facts)?;
    let facts = Facts::new(facts);
    info!("{} rules loaded.", engine.rule_names().len());

    if let Some(event) = &cli.evaluate {
        let outcome = engine.evaluate(event, Some(facts)).await;
        println!("{}", outcome);
        return Ok(());
    }

    for event in engine.event_names() {
        let name = event.clone();
        engine.on(&event, "rulecast-cli", move |_| println!("{}", name));
    }
    let status = engine.update_facts(facts).await;
    debug!("pass {}", status);

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
