//! Cascade CLI
//!
//! Entry point for the `cascade` command-line tool.

use cascade_config::{load_layers, logging, Config, ConfigError, Value};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Resolve selector-based configuration rules", version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more paths
    Resolve {
        /// Paths to resolve (e.g. "encoder.layers[0].width")
        #[arg(required = true)]
        paths: Vec<String>,

        /// Rule files, layered in order (later files win ties)
        #[arg(long = "rules", short = 'r', required = true)]
        rules: Vec<PathBuf>,

        /// Load the first rule file as defaults only
        #[arg(long)]
        first_as_default: bool,

        /// Return every matching key instead of failing on ambiguity
        #[arg(long)]
        all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Dump the layered rules in registration order
    Rules {
        /// Rule files, layered in order
        #[arg(long = "rules", short = 'r', required = true)]
        rules: Vec<PathBuf>,

        /// Load the first rule file as defaults only
        #[arg(long)]
        first_as_default: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Resolve {
            paths,
            rules,
            first_as_default,
            all,
            json,
        } => {
            let config = load_or_exit(&rules, first_as_default);
            run_resolve(&config, &paths, all, json);
        }
        Commands::Rules {
            rules,
            first_as_default,
        } => {
            let config = load_or_exit(&rules, first_as_default);
            for rule in config.rules() {
                println!("{}", rule);
            }
        }
    }
}

fn load_or_exit(rules: &[PathBuf], first_as_default: bool) -> Config {
    match load_layers(rules, first_as_default) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading rules: {}", e);
            process::exit(1);
        }
    }
}

fn run_resolve(config: &Config, paths: &[String], all: bool, json: bool) {
    let mut results = serde_json::Map::new();
    let mut failed = false;

    for path in paths {
        match resolve(config, path, all) {
            Ok(resolved) => {
                if json {
                    results.insert(path.clone(), resolved.to_json());
                } else {
                    resolved.print(path);
                }
            }
            Err(e) => {
                failed = true;
                if json {
                    results.insert(path.clone(), serde_json::json!({ "error": e.to_string() }));
                } else {
                    eprintln!("{}: {}", path, e);
                }
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&serde_json::Value::Object(results)) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

enum Resolved {
    One(Value),
    Many(IndexMap<String, Value>),
}

impl Resolved {
    fn to_json(&self) -> serde_json::Value {
        match self {
            Resolved::One(value) => value.to_json(),
            Resolved::Many(values) => serde_json::Value::Object(
                values
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    fn print(&self, path: &str) {
        match self {
            Resolved::One(value) => println!("{} = {}", path, value),
            Resolved::Many(values) => {
                println!("{}:", path);
                for (key, value) in values {
                    println!("  {} = {}", key, value);
                }
            }
        }
    }
}

fn resolve(config: &Config, path: &str, all: bool) -> Result<Resolved, ConfigError> {
    if all {
        config.get_all(path).map(Resolved::Many)
    } else {
        config.get(path).map(Resolved::One)
    }
}
