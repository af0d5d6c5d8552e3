// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use clap::Parser;
use pcs_handoff_sim::config::Config;
use pcs_handoff_sim::output::Output;
use pcs_handoff_sim::simulation::Simulation;
use pcs_handoff_sim::user_config::{QueuePolicy, UserConfig};

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    /// Scenario configuration.
    #[arg(long, short, default_value_t = String::from("conf.json"))]
    conf: String,
    /// Create a template for the scenario configuration.
    #[arg(long, short)]
    template: bool,
    /// Initial seed to initialize the pseudo-random number generators
    #[arg(long, default_value_t = 0)]
    seed_init: u64,
    /// Final seed to initialize the pseudo-random number generators
    #[arg(long, default_value_t = 10)]
    seed_end: u64,
    /// Number of parallel workers
    #[arg(long, default_value_t = std::thread::available_parallelism().map(|x| x.get()).unwrap_or(1))]
    concurrency: usize,
    /// Name of the path where to save the metrics collected.
    #[arg(long, default_value_t = String::from("data/"))]
    output_path: String,
    /// Append to the output file.
    #[arg(long, default_value_t = false)]
    append: bool,
    /// Additional fields recorded in the CSV output file.
    #[arg(long, default_value_t = String::from(""))]
    additional_fields: String,
    /// Header of additional fields recorded in the CSV output file.
    #[arg(long, default_value_t = String::from(""))]
    additional_header: String,
}

/// Log the mean and standard error across seeds of the main metrics.
fn log_summary(user_config: &UserConfig, outputs: &[Output]) {
    let blocking: average::MeanWithError = outputs
        .iter()
        .map(|x| x.stats.new_blocking_probability)
        .collect();
    let dropping: average::MeanWithError = outputs
        .iter()
        .map(|x| x.stats.handoff_dropping_probability)
        .collect();
    let utilization: average::MeanWithError = outputs
        .iter()
        .map(|x| x.stats.mean_utilization)
        .collect();
    log::info!(
        "{} runs: new call blocking {:.5} ± {:.5}, handoff dropping {:.5} ± {:.5}, utilization {:.5} ± {:.5}",
        outputs.len(),
        blocking.mean(),
        blocking.error(),
        dropping.mean(),
        dropping.error(),
        utilization.mean(),
        utilization.error()
    );
    if user_config.policy == QueuePolicy::TwoClass {
        let urgent: average::MeanWithError = outputs
            .iter()
            .map(|x| x.stats.urgent_dropping_probability)
            .collect();
        let regular: average::MeanWithError = outputs
            .iter()
            .map(|x| x.stats.regular_dropping_probability)
            .collect();
        log::info!(
            "urgent handoff dropping {:.5} ± {:.5}, regular handoff dropping {:.5} ± {:.5}",
            urgent.mean(),
            urgent.error(),
            regular.mean(),
            regular.error()
        );
    }
    if user_config.queue_size == 0 && user_config.policy != QueuePolicy::TwoClass {
        log::info!(
            "Erlang-B blocking for {} channels and {} Erlangs: {:.5}",
            user_config.channels,
            user_config.offered_load(),
            pcs_handoff_sim::erlang::erlang_b(user_config.channels, user_config.offered_load())
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    // If requested, save a template configuration file and quit.
    let conf_path = std::path::Path::new(&args.conf);
    if args.template {
        if conf_path.exists() {
            log::warn!("File {:#?} exists and will not be overwritten", conf_path);
        } else {
            std::fs::write(
                conf_path,
                serde_json::to_string_pretty(&UserConfig::default())?,
            )?;
        }
        return Ok(());
    }

    // Check command-line arguments.
    anyhow::ensure!(
        args.additional_fields.matches(',').count() == args.additional_header.matches(',').count(),
        "--additional_fields and --additional_header have a different number of commas"
    );
    anyhow::ensure!(args.concurrency > 0, "vanishing concurrency");

    // Read the user's configuration file.
    anyhow::ensure!(
        conf_path.exists(),
        "Configuration file {:#?} does not exist",
        conf_path
    );
    let conf_file = std::fs::File::open(conf_path)?;
    let reader = std::io::BufReader::new(conf_file);
    let user_config: UserConfig = serde_json::from_reader(reader)?;
    user_config.valid()?;

    // Create the configurations of all the experiments
    let configurations = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
    for seed in args.seed_init..args.seed_end {
        configurations
            .lock()
            .map_err(|err| anyhow::anyhow!("{}", err))?
            .push(Config::new(seed, user_config.clone()));
    }

    let num_configurations = args.seed_end.saturating_sub(args.seed_init) as usize;
    if num_configurations == 0 {
        return Ok(());
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for i in 0..std::cmp::min(args.concurrency, num_configurations) {
        let tx = tx.clone();
        let configurations = configurations.clone();
        tokio::spawn(async move {
            log::info!("spawned worker #{}", i);
            loop {
                let config = match configurations.lock() {
                    Ok(mut configurations) => configurations.pop(),
                    Err(_) => None,
                };
                let config = match config {
                    Some(config) => config,
                    None => break,
                };
                match Simulation::new(config) {
                    Ok(mut sim) => {
                        if tx.send(sim.run()).is_err() {
                            break;
                        }
                    }
                    Err(err) => log::error!("error when running simulation: {}", err),
                };
            }
            log::info!("terminated worker #{}", i);
        });
    }
    drop(tx);

    // wait until all the simulations have been done
    let mut outputs = vec![];
    while let Some(output) = rx.recv().await {
        outputs.push(output);
    }
    anyhow::ensure!(!outputs.is_empty(), "no simulation completed");
    log_summary(&user_config, &outputs);

    // save output to files
    pcs_handoff_sim::output::save_outputs(
        outputs,
        &args.output_path,
        args.append,
        &Config::header(),
        &args.additional_header,
        &args.additional_fields,
    )
}
