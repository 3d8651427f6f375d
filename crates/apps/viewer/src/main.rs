mod feed_client;
mod overlay_task;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viewsync::{MapOptions, MapSession};

use crate::overlay_task::run_overlay_updates;

/// Headless vessel map: mounts the synchronized tile map and point overlay
/// and keeps the overlay fed from the push stream.
#[derive(Parser, Debug)]
#[command(name = "viewer", version)]
struct Args {
    /// Push-stream endpoint.
    #[arg(long, default_value = "ws://127.0.0.1:5005/")]
    feed_url: String,

    /// Container element the map is mounted into.
    #[arg(long, default_value = "map")]
    container: String,

    /// Containers present on the host page.
    #[arg(long, value_delimiter = ',', default_value = "map")]
    host_containers: Vec<String>,

    /// Quiet period before a received batch is shown.
    #[arg(long, default_value_t = 250)]
    debounce_ms: u64,

    /// Point id drawn with the hover fill, as if under the cursor.
    #[arg(long)]
    highlight: Option<u64>,

    /// Log every n-th rendered frame.
    #[arg(long, default_value_t = 1)]
    log_every: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let host: HashSet<String> = args.host_containers.iter().cloned().collect();
    let options = MapOptions::default().with_target(args.container.as_str());
    let mut session = MapSession::mount(&host, options).context("failed to mount map")?;
    if let Some(frame) = session.render_frame() {
        info!(frame = frame.index, zoom = frame.view.zoom, "first frame");
    }

    let (batch_tx, batch_rx) = mpsc::channel(4);
    let (close_tx, close_rx) = oneshot::channel::<()>();
    let feed_url = args.feed_url.clone();
    let feed = tokio::spawn(async move {
        feed_client::listen(&feed_url, batch_tx, async {
            let _ = close_rx.await;
        })
        .await
    });

    let log_every = args.log_every.max(1);
    let highlight = args.highlight;
    let (stop, stats) = run_overlay_updates(
        Duration::from_millis(args.debounce_ms),
        batch_rx,
        &mut session,
        |session, features| {
            // Replacing the content clears a hover whose point is gone.
            session.overlay_mut().layer_mut().set_hovered(highlight);
            let report = session.pump();
            if let Some(frame) = session.render_frame() {
                if frame.index % log_every == 0 {
                    info!(
                        frame = frame.index,
                        features,
                        instances = frame.instances.len(),
                        tiles = session.tile().visible_tiles().len(),
                        sync_passes = report.passes,
                        highlighted = ?session.overlay().layer().hovered(),
                        "overlay frame"
                    );
                }
            }
        },
        async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {err}");
                std::future::pending::<()>().await;
            }
        },
    )
    .await;
    info!(?stop, applied = stats.applied, "shutting down");

    let _ = close_tx.send(());
    let feed_result = feed.await.context("feed task panicked")?;
    session.unmount();
    let feed_stats = feed_result?;
    info!(
        batches = feed_stats.batches,
        dropped = feed_stats.dropped,
        sync = ?session.stats(),
        "viewer stopped"
    );
    Ok(())
}
