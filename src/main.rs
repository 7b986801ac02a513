use anyhow::Context;
use clap::Parser;
use image_adjuster::cli::{Args, Command};
use image_adjuster::config::Config;
use image_adjuster::session::Session;
use image_adjuster::stretch::ContrastLimits;
use image_adjuster::{analysis, codec, prompt, report};
#[cfg(feature = "server")]
use image_adjuster::server;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, stdout is reserved for prompts and JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::from(&args);
    tracing::debug!(
        "image-adjuster v{} using {} luminance",
        env!("CARGO_PKG_VERSION"),
        config.luminance.as_str()
    );

    match args.command {
        Command::Analyze {
            images,
            charts,
            json,
        } => analyze(&images, &config, charts, json),
        Command::Adjust { min, max, images } => adjust(&images, min, max, &config),
        Command::Finish { manifest } => {
            let session = Session::load_manifest(&manifest)?;
            let log = session.finish()?;
            Session::discard_manifest(&manifest)?;
            println!("{}", log.display());
            Ok(())
        }
        Command::Revert { manifest } => {
            let session = Session::load_manifest(&manifest)?;
            session.revert()?;
            Session::discard_manifest(&manifest)?;
            tracing::info!("Reverted {} image(s)", session.entries.len());
            Ok(())
        }
        Command::Run { images, charts } => {
            let stdin = io::stdin();
            let mut prompter = prompt::Prompter::new(BufReader::new(stdin.lock()), io::stdout());
            prompt::run_interactive(&images, &config, charts, &mut prompter)?;
            Ok(())
        }
        #[cfg(feature = "server")]
        Command::Serve {
            host,
            port,
            max_file_size,
        } => {
            tracing::info!(
                "Starting image-adjuster server v{}",
                env!("CARGO_PKG_VERSION")
            );
            let server_config = server::ServerConfig {
                host,
                port,
                max_file_size,
            };
            tokio::runtime::Runtime::new()
                .context("Failed to start async runtime")?
                .block_on(server::run(config, server_config))
        }
    }
}

fn analyze(images: &[PathBuf], config: &Config, charts: bool, json: bool) -> anyhow::Result<()> {
    let analysis = analysis::analyze_batch(images, config)?;
    let report_path = report::write_report(&analysis, config, &images[0], charts)?;
    tracing::info!("Analysis report saved to: {}", report_path.display());

    for (index, record) in analysis.records.iter().enumerate() {
        for (cutoff_index, &average) in analysis.averages.iter().enumerate() {
            let (low, high) = record.flags(cutoff_index, average);
            if low || high {
                tracing::warn!(
                    "{} (#{}) would be stretched harder than the average at {}",
                    record.file_name(),
                    index + 1,
                    analysis.cutoffs[cutoff_index].label()
                );
            }
        }
    }

    let flagged = analysis.flagged_count();
    if flagged > 0 {
        tracing::info!("{} value(s) lie outside the batch averages", flagged);
    }

    if json {
        let out = serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?;
        println!("{}", out);
    } else {
        println!("{}", report_path.display());
    }
    Ok(())
}

fn adjust(images: &[PathBuf], min: u8, max: u8, config: &Config) -> anyhow::Result<()> {
    let limits = ContrastLimits::try_new(min, max)?;
    for path in images {
        codec::identify(path)?;
    }
    let session = Session::apply(images, limits, config)?;
    let manifest = session.save_manifest()?;
    println!("{}", manifest.display());
    Ok(())
}
