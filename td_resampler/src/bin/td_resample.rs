use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use td_resampler::{
    Error,
    config::{PipelineConfig, load_config_path},
    pipeline::run_pipeline,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Resample OHLC trading bars")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the pipeline described by a config file.
    Run {
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
        /// Override `input.path`.
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Override `output.path`.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Validate a config file and print what it would do.
    Check {
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_plan(cfg: &PipelineConfig) {
    println!("input:       {}", cfg.input.path.display());
    println!("timestamp:   {}", cfg.input.datetime_columns.join(" + "));
    if let Some(tz) = &cfg.timezone {
        println!("timezone:    {} -> {}", tz.from, tz.to);
    }
    let policy = cfg.resample.policy();
    println!(
        "resample:    {} closed={} label={}",
        policy.interval,
        policy.closed_edge(),
        policy.label_edge()
    );
    println!("aggregation: {}", cfg.resample.aggregation);
    if let Some(cutoff) = &cfg.cutoff {
        println!("cutoff:      {cutoff:?}");
    }
    println!("precision:   {}", cfg.precision);
    println!("output:      {}", cfg.output.path.display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Run {
            config,
            input,
            output,
        } => {
            let mut cfg = load_config_path(&config)?;
            if let Some(input) = input {
                cfg.input.path = input;
            }
            if let Some(output) = output {
                cfg.output.path = output;
            }

            match run_pipeline(&cfg) {
                Ok(()) => {}
                Err(e @ Error::SourceNotFound(_)) => {
                    error!(error = %e, "cannot read source");
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Cmd::Check { config } => {
            let cfg = load_config_path(&config)?;
            print_plan(&cfg);
        }
    }

    Ok(())
}
