use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use config::{Config, Overrides, UserConfig};
use dep_graph::{ArchiveDownloader, ResolutionContext};
use registry_client::RegistryClient;
use tracing::{error, info, warn};

mod config;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// package specifier, e.g. "express", "lodash@^4.17.0" or "@babel/core@7.24.0"
    spec: String,
    /// registry base URL
    #[arg(long)]
    registry: Option<String>,
    /// attempts per request before giving up
    #[arg(long)]
    max_tries: Option<u32>,
    /// resolve one dependency at a time
    #[arg(long)]
    sequential: bool,
    /// download the archive of every resolved package
    #[arg(long)]
    download: bool,
    /// directory archives are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// already resolved packages as name@version, comma separated
    #[arg(long, value_delimiter = ',')]
    seed: Vec<String>,
    /// skip integrity checks of downloaded archives
    #[arg(long)]
    no_verify: bool,
    /// options as a JSON object, e.g. '{"maxTries": 3}'
    #[arg(long)]
    options: Option<String>,
}

/// Resolve, print the graph as JSON and optionally download. Returns false
/// if anything failed along the way.
async fn run(spec: &str, config: Config) -> anyhow::Result<bool> {
    let registry = RegistryClient::new(config.registry.as_str())
        .context("failed to build registry client")?
        .with_max_tries(config.max_tries);
    let ctx = ResolutionContext::new(registry.clone()).with_fan_out(config.fan_out);

    if !config.seed.is_empty() {
        let seeded = ctx.fill_cache_from_full_names(&config.seed);
        info!("seeded {} of {} packages", seeded, config.seed.len());
    }

    let root = ctx
        .from_specifier(spec)
        .await
        .ok_or_else(|| anyhow!("invalid package specifier '{}'", spec))?;

    let mut ok = true;
    if let Err(e) = ctx.graph().resolve(root.clone()).await {
        error!("resolution of {} failed: {}", root.full_name(), e);
        ok = false;
    }
    info!(
        "resolved {} packages for {}",
        ctx.cache().len(),
        root.full_name()
    );

    let snapshot = ctx.snapshot(&root);
    for package in snapshot.errored() {
        warn!("{} could not be resolved", package.full_name);
        ok = false;
    }
    serde_json::to_writer(std::io::stdout(), &snapshot).context("failed to serialize output")?;
    println!();

    let Some(dir) = config.download_dir else {
        return Ok(ok);
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let downloader = ArchiveDownloader::new(registry, dir)
        .with_verify_integrity(config.verify_integrity)
        .with_concurrency(config.download_concurrency);
    for (node, result) in downloader.download_all(ctx.cache()).await {
        if let Err(e) = result {
            warn!("download of {} failed: {}", node.full_name(), e);
            ok = false;
        }
    }
    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    //logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let user_config = match UserConfig::from_json(args.options.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid --options: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = user_config.merge(Overrides {
        registry: args.registry,
        max_tries: args.max_tries,
        sequential: args.sequential,
        no_verify: args.no_verify,
        download_dir: args.download.then_some(args.out_dir),
        seed: args.seed,
    });

    match run(&args.spec, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
