use crate::{
    admin,
    log::{self, LogFormat},
    store::{DatastoreWatch, FileStore},
};
use anyhow::{bail, Result};
use clap::Parser;
use gbp_policy_controller_index::AugmentorRegistry;
use gbp_policy_controller_renderer::{Controller, ControllerMetrics, RendererManager};
use prometheus_client::registry::Registry;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::{sync::mpsc, time::Duration};
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "gbp-policy-controller",
    about = "Computes and dispatches per-renderer group-based policy"
)]
pub struct Args {
    #[clap(long, default_value = "gbp=info,warn", env = "GBP_POLICY_CONTROLLER_LOG")]
    log_level: String,

    #[clap(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    #[clap(long, default_value = "0.0.0.0:9990")]
    admin_addr: SocketAddr,

    /// A JSON document holding the input collections.
    #[clap(long, env = "GBP_POLICY_CONTROLLER_DATASTORE")]
    datastore: PathBuf,

    /// A JSON document receiving the renderer policies.
    #[clap(long, env = "GBP_POLICY_CONTROLLER_OUTPUT")]
    output: PathBuf,

    #[clap(long, default_value = "1000")]
    poll_interval_ms: u64,

    #[clap(long, default_value = "5000")]
    write_timeout_ms: u64,

    /// Abandons a policy version that is not acknowledged by every renderer within this
    /// timeout. By default, renderers are awaited indefinitely.
    #[clap(long)]
    ack_timeout_ms: Option<u64>,

    #[clap(long, default_value = "1024")]
    event_queue_size: usize,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            admin_addr,
            datastore,
            output,
            poll_interval_ms,
            write_timeout_ms,
            ack_timeout_ms,
            event_queue_size,
        } = self;

        if event_queue_size == 0 {
            bail!("--event-queue-size must be positive");
        }
        if poll_interval_ms == 0 {
            bail!("--poll-interval-ms must be positive");
        }

        log::init(&log_level, log_format)?;

        let mut prom = <Registry>::default();
        let metrics =
            ControllerMetrics::register(prom.sub_registry_with_prefix("renderer_manager"));

        let manager = RendererManager::new(AugmentorRegistry::default(), metrics);
        let (events_tx, events_rx) = mpsc::channel(event_queue_size);
        let (controller, ready) = Controller::new(
            manager,
            FileStore::new(output),
            events_rx,
            Duration::from_millis(write_timeout_ms),
        );
        let controller = controller.with_ack_timeout(ack_timeout_ms.map(Duration::from_millis));

        let (shutdown, drain) = drain::channel();

        let admin = admin::serve(admin_addr, ready, Arc::new(prom), drain.clone());
        tokio::spawn(async move {
            if let Err(error) = admin.await {
                tracing::error!(%error, "Admin server failed");
            }
        });

        let watch = DatastoreWatch::new(datastore, Duration::from_millis(poll_interval_ms));
        tokio::spawn(
            watch
                .run(events_tx, drain.clone())
                .instrument(info_span!("datastore")),
        );

        let controller = tokio::spawn(controller.run(drain));

        // Block the main thread on the shutdown signal. Once it fires, wait for the background
        // tasks to complete before exiting.
        tokio::select! {
            res = shutdown_signal() => res?,
            res = controller => {
                res?;
                bail!("Renderer manager stopped unexpectedly");
            }
        }
        info!("Shutting down");
        shutdown.drain().await;
        Ok(())
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from([
            "gbp-policy-controller",
            "--datastore=/var/lib/gbp/datastore.json",
            "--output=/var/lib/gbp/renderers.json",
        ])
        .unwrap();
        assert_eq!(args.log_format, LogFormat::Plain);
        assert_eq!(args.admin_addr, "0.0.0.0:9990".parse().unwrap());
        assert_eq!(args.poll_interval_ms, 1000);
        assert_eq!(args.write_timeout_ms, 5000);
        assert_eq!(args.ack_timeout_ms, None);
        assert_eq!(args.event_queue_size, 1024);
    }

    #[test]
    fn ack_timeout_and_json_logs() {
        let args = Args::try_parse_from([
            "gbp-policy-controller",
            "--datastore=datastore.json",
            "--output=renderers.json",
            "--log-format=json",
            "--ack-timeout-ms=30000",
        ])
        .unwrap();
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.ack_timeout_ms, Some(30_000));
    }

    #[test]
    fn datastore_is_required() {
        assert!(
            Args::try_parse_from(["gbp-policy-controller", "--output=renderers.json"]).is_err()
        );
    }
}
