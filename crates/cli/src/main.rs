mod config;
mod error;
mod logger;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use admission::{DecisionHook, QueueItem, Snapshot, assigned_label, eligible_nodes};
use clap::{Parser, Subcommand};
use script::Interpreter;

use config::Config;
use error::{Error, Result};
use logger::LoggerFormat;

const CONFIG_FILE: &str = "labelgate.toml";

#[derive(Parser)]
#[command(name = "labelgate")]
#[command(about = "Script-driven node label assignment at queue admission", long_about = None)]
#[command(version)]
struct Cli {
    /// Queue snapshot file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log filter directive, e.g. `info` or `admission=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format (text, json)
    #[arg(long, global = true)]
    log_format: Option<LoggerFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a template for admission and show the label decision
    Admit {
        /// Template name
        template: String,
        /// Build parameter, overriding the template default
        #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
        param: Vec<(String, String)>,
    },
    /// Validate every configured policy
    Check,
    /// Upgrade legacy policies to the current record shape
    Migrate {
        /// Write the result back to the config file instead of stdout
        #[arg(short, long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Returns `false` when an admission attempt was rejected.
async fn run() -> Result<bool> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    let mut logger = config.logging.logger();
    if let Some(level) = cli.log_level {
        logger.level = level;
    }
    if let Some(format) = cli.log_format {
        logger.format = format;
    }
    logger::logger_init(&logger)?;

    match cli.command {
        Commands::Admit { template, param } => {
            cmd_admit(&config, &template, param.into_iter().collect()).await
        }
        Commands::Check => cmd_check(&config).map(|()| true),
        Commands::Migrate { write } => cmd_migrate(&mut config, &cli.config, write).map(|()| true),
    }
}

async fn cmd_admit(
    config: &Config,
    template: &str,
    params: BTreeMap<String, String>,
) -> Result<bool> {
    let host = Arc::new(config.snapshot()?);
    let hook = Arc::new(DecisionHook::new(Interpreter));
    let items = host.queue_items(template, &params)?;

    // Matrix siblings are independent attempts and are evaluated in parallel.
    let handles: Vec<_> = items
        .into_iter()
        .map(|mut item| {
            let host = Arc::clone(&host);
            let hook = Arc::clone(&hook);
            tokio::task::spawn_blocking(move || {
                let admitted = hook.admit(host.as_ref(), &mut item);
                (item, admitted)
            })
        })
        .collect();

    let mut all_admitted = true;
    for handle in handles {
        let (item, admitted) = handle.await?;
        all_admitted &= admitted;
        print_decision(&host, &item, admitted);
    }

    Ok(all_admitted)
}

fn print_decision(host: &Snapshot, item: &QueueItem, admitted: bool) {
    if !admitted {
        println!("{:<40}  rejected", item.task.name);
        return;
    }

    let label = assigned_label(host, item);
    let nodes: Vec<_> = eligible_nodes(host, label.as_ref())
        .into_iter()
        .map(|n| n.name.as_str())
        .collect();
    let label = label.map_or_else(|| "(any)".to_string(), |l| l.to_string());
    let source = if item.decorations.label_override().is_some() {
        "policy"
    } else {
        "static"
    };
    println!(
        "{:<40}  admitted  label={label} ({source})  nodes=[{}]",
        item.task.name,
        nodes.join(", ")
    );
}

fn cmd_check(config: &Config) -> Result<()> {
    let host = config.snapshot()?;
    let mut failed = 0;

    for template in host.templates() {
        let Some(policy) = &template.policy else {
            continue;
        };
        match policy.validate(&Interpreter) {
            Ok(()) => println!("{:<40}  ok", template.name),
            Err(e) => {
                failed += 1;
                println!("{:<40}  {e}", template.name);
            }
        }
    }

    if failed > 0 {
        return Err(Error::InvalidPolicies { count: failed });
    }
    Ok(())
}

fn cmd_migrate(config: &mut Config, path: &Path, write: bool) -> Result<()> {
    let upgraded = config.migrate();
    for name in &upgraded {
        eprintln!("upgraded legacy policy: {name}");
    }

    let toml = config.to_toml()?;
    if write {
        if !upgraded.is_empty() {
            std::fs::write(path, toml)?;
        }
    } else {
        print!("{toml}");
    }
    Ok(())
}

fn parse_param(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::InvalidParameter(s.to_string())),
    }
}
