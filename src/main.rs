use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use window_gate::clock::{Clock, SystemClock};
use window_gate::config::Args;
use window_gate::state::AppState;
use window_gate::sweeper::sweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "window_gate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // bad limits are fatal here, never on the first request
    let limiter = args.build_limiter()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = Arc::new(
        AppState::new(limiter, Arc::clone(&clock)).with_trust_forwarded_for(args.trust_forwarded_for),
    );

    let sweeper_task = args.sweep_interval().map(|every| {
        tokio::spawn(sweeper(Arc::clone(&state.limiter), Arc::clone(&clock), every))
    });

    let app = window_gate::app(Arc::clone(&state));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "window-gate listening");
    info!(
        limit = args.rate_limit,
        window_ms = args.rate_window_ms,
        trust_forwarded_for = args.trust_forwarded_for,
        "rate limit configured"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(task) = sweeper_task {
        task.abort();
    }
    info!("window-gate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
