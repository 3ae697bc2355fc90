use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use clap::Parser;
use eyre::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

use vodforge_core::{
    config::Config,
    core::dispatcher::{self, DispatcherHandle, DispatcherMessage},
    deadpool_diesel, interact,
    model::repository::db::{self, DbPool},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: String,
    #[arg(long)]
    skip_startup_check: bool,
    /// Periodically fail renditions and jobs stuck in a non-terminal
    /// state for longer than the configured threshold.
    #[arg(long)]
    reconcile_stalled: bool,
}

async fn db_setup(dir: &Path) -> Result<DbPool> {
    let db_url = dir.join("vodforge.db").to_string();
    let pool = db::open_db_pool(&db_url)?;
    let conn = pool.get().await?;
    interact!(conn, db::migrate).await??;
    Ok(pool)
}

/// Paths in the config file are relative to the directory it lives in.
fn absolute_to(config_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        config_dir.join(path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1")
    }
    if std::env::var("RUST_SPANTRACE").is_err() {
        std::env::set_var("RUST_SPANTRACE", "1");
    }
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(EnvFilter::from_env("VODFORGE_LOG"))
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = PathBuf::from(args.config);
    let mut config: Config = vodforge_core::config::read_config(&config_path).await?;
    // all paths in config are relative to this
    let config_dir = config_path
        .parent()
        .expect("has read config file, so parent must be a directory");
    config.data_dir = absolute_to(config_dir, &config.data_dir);
    config.scratch_dir = absolute_to(config_dir, &config.scratch_dir);
    config.files_device_root = absolute_to(config_dir, &config.files_device_root);
    config.video_device_root = absolute_to(config_dir, &config.video_device_root);

    if !args.skip_startup_check {
        tracing::info!("Running self check");
        vodforge_core::startup_self_check::run_self_check(config.bin_paths.as_ref())
            .await
            .expect("Self check failed");
        tracing::info!("Self check successful");
    } else {
        tracing::info!("Skipping self check");
    }

    info!("Starting up...");
    std::fs::create_dir_all(&config.data_dir).wrap_err("Error creating data dir")?;
    std::fs::create_dir_all(&config.scratch_dir).wrap_err("Error creating scratch dir")?;
    let pool = db_setup(&config.data_dir).await?;

    let conn = pool.get().await?;
    let backlog = interact!(conn, vodforge_core::model::repository::queue::count_queued_jobs)
        .await??;
    info!("{} transcode jobs waiting in queue", backlog);
    drop(conn);

    if args.reconcile_stalled {
        let stall_after = config
            .reconcile
            .as_ref()
            .map(|r| r.stall_after)
            .unwrap_or_else(|| chrono::Duration::minutes(60));
        let pool = pool.clone();
        tokio::spawn(async move {
            let period = stall_after.to_std().expect("stall_after is positive");
            let mut sweep = tokio::time::interval(period);
            loop {
                sweep.tick().await;
                if let Err(err) = dispatcher::reconcile_stalled(&pool, stall_after).await {
                    tracing::error!("reconciliation sweep failed: {:?}", err);
                }
            }
        });
    }

    let (dispatcher, did_shutdown_recv) = DispatcherHandle::new(pool.clone(), config);
    dispatcher
        .send
        .send(DispatcherMessage::Poll)
        .await
        .wrap_err("dispatcher is gone")?;

    shutdown_signal().await;
    info!("Shutting down...");
    dispatcher
        .send
        .send(DispatcherMessage::Shutdown)
        .await
        .wrap_err("dispatcher is gone")?;
    did_shutdown_recv.await.ok();

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Unable to listen for shutdown signal: {}", err);
            std::process::exit(1);
            // we also shut down in case of error
        }
    }
}
