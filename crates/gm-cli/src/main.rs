//! gwmarg CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use gm_core::{MarginalLikelihood, SampleTable};
use gm_likelihood::PostprocessOptions;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

mod run;

#[derive(Parser)]
#[command(name = "gwmarg")]
#[command(about = "gwmarg - distance- and phase-marginalized GW likelihood")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the marginalized log-likelihood at one or more points
    Lnlike {
        /// Run configuration (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Intrinsic parameters: one JSON object or an array of objects
        #[arg(short, long)]
        params: PathBuf,

        /// Also report the distance-marginalized log-likelihood on the phase grid.
        #[arg(long)]
        phi_grid: bool,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Add phi_ref and d_luminosity draws to posterior samples
    Postprocess {
        /// Run configuration (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Sample table (JSON with `columns` and `rows`)
        #[arg(short, long)]
        samples: PathBuf,

        /// Base seed. Drawn at random when omitted.
        #[arg(long)]
        seed: Option<u64>,

        /// Keep an existing d_luminosity column instead of redrawing it.
        #[arg(long)]
        keep_distance: bool,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto, 1 = serial).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// List the sampled (intrinsic) parameter names
    Params {
        /// Run configuration (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print version information
    Version,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParamsInput {
    One(BTreeMap<String, f64>),
    Many(Vec<BTreeMap<String, f64>>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Lnlike { input, params, phi_grid, output, threads } => {
            cmd_lnlike(&input, &params, phi_grid, output.as_ref(), threads)
        }
        Commands::Postprocess { input, samples, seed, keep_distance, output, threads } => {
            cmd_postprocess(&input, &samples, seed, keep_distance, output.as_ref(), threads)
        }
        Commands::Params { input } => cmd_params(&input),
        Commands::Version => {
            println!("gwmarg {}", gm_core::VERSION);
            Ok(())
        }
    }
}

fn configure_threads(threads: usize) {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

fn load_likelihood(input: &PathBuf) -> Result<gm_likelihood::MarginalizedDistancePhaseLikelihood> {
    tracing::info!(path = %input.display(), "loading run config");
    run::read_run_config(input)?.build()
}

fn cmd_lnlike(
    input: &PathBuf,
    params: &PathBuf,
    phi_grid: bool,
    output: Option<&PathBuf>,
    threads: usize,
) -> Result<()> {
    configure_threads(threads);
    let like = load_likelihood(input)?;
    let points = match serde_json::from_str::<ParamsInput>(&std::fs::read_to_string(params)?)? {
        ParamsInput::One(p) => vec![p],
        ParamsInput::Many(ps) => ps,
    };
    tracing::info!(points = points.len(), "evaluating");

    let lnlike = points
        .par_iter()
        .map(|p| like.lnlike_map(p))
        .collect::<gm_core::Result<Vec<f64>>>()?;

    let mut output_json = serde_json::json!({
        "params": like.params(),
        "n_phi": like.grid().n_phi(),
        "lnlike": lnlike,
    });
    if phi_grid {
        let grids = points
            .par_iter()
            .map(|p| like.lnlike_dist_marg_on_phi_grid(&like.intrinsic(p)?))
            .collect::<gm_core::Result<Vec<Vec<f64>>>>()?;
        output_json["phi"] = serde_json::json!(like.grid().phi());
        output_json["lnlike_on_phi_grid"] = serde_json::json!(grids);
    }

    write_json(output, output_json)
}

fn cmd_postprocess(
    input: &PathBuf,
    samples: &PathBuf,
    seed: Option<u64>,
    keep_distance: bool,
    output: Option<&PathBuf>,
    threads: usize,
) -> Result<()> {
    configure_threads(threads);
    let like = load_likelihood(input)?;
    let table: SampleTable = serde_json::from_str(&std::fs::read_to_string(samples)?)?;
    tracing::info!(samples = table.n_rows(), "postprocessing");

    let options = PostprocessOptions { overwrite_distance: !keep_distance, seed, parallel: threads != 1 };
    let report = like.postprocess_samples(&table, &options)?;
    if !report.failures.is_empty() {
        tracing::warn!(failures = report.failures.len(), "some samples could not be resampled");
    }

    write_json(output, serde_json::to_value(&report)?)
}

fn cmd_params(input: &PathBuf) -> Result<()> {
    let like = load_likelihood(input)?;
    write_json(None, serde_json::json!({ "params": like.params() }))
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
