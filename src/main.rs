use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::error;
use serde::Serialize;

use weka_bridge::arff::SchemaStore;
use weka_bridge::{Bridge, BridgeConfig, TrainOptions};

/// Train and query a command-line classifier from tabular files.
#[derive(Parser, Debug)]
#[command(name = "weka-bridge", version)]
struct Cli {
    /// JSON configuration file; environment variables override it
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model and persist its schema
    Train {
        /// .csv, .json, .parquet or a ready .arff document
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Classifier class or alias (J48, NaiveBayes)
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Options passed to the classifier after `--`
        #[arg(last = true)]
        extra: Vec<String>,
    },
    /// Predict the first record of INPUT
    Predict {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Predict every record of INPUT
    PredictBatch {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Print what the tool reports about the current model
    ModelInfo,
    /// Print the persisted schema header
    Schema,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = BridgeConfig::load(cli.config.as_deref())?;
    let bridge = Bridge::from_config(config).context("building the bridge")?;

    match cli.command {
        Command::Train {
            input,
            algorithm,
            extra,
        } => {
            let options = TrainOptions {
                classifier: algorithm,
                extra,
            };
            print_json(&bridge.train(&input, &options)?)
        }
        Command::Predict { input } => print_json(&bridge.predict(&input)?),
        Command::PredictBatch { input } => print_json(&bridge.predict_batch(&input)?),
        Command::ModelInfo => {
            println!("{}", bridge.model_info()?);
            Ok(())
        }
        Command::Schema => {
            print!("{}", bridge.store().load()?.render());
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
