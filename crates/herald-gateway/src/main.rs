use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::info;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald_gateway=info,herald_scheduler=info,herald_notify=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    // load config: explicit path > HERALD_CONFIG env > ~/.herald/herald.toml
    let config_path = std::env::var("HERALD_CONFIG").ok();
    let config = herald_core::config::HeraldConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            herald_core::config::HeraldConfig::default()
        });

    // The operating timezone is fixed for the process lifetime; a bad name
    // must fail startup, not shift every reminder.
    let tz = config.scheduler.operating_timezone()?;

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    herald_scheduler::db::init_db(&db)?;
    herald_tracker::db::init_db(&db)?;
    info!("database migrations complete");

    // One store shared by the facade and the engine: the jobs table is the
    // single source of truth for scheduled work.
    let store = herald_scheduler::JobStore::new(rusqlite::Connection::open(&db_path)?)?;
    let tracker = herald_tracker::TrackerManager::new(rusqlite::Connection::open(&db_path)?)?;

    // Facade → engine nudges, engine → dispatcher fired jobs.
    let (cmd_tx, cmd_rx) = mpsc::channel::<herald_scheduler::EngineCommand>(256);
    let (fired_tx, fired_rx) =
        mpsc::channel::<herald_core::event::FiredJob>(config.scheduler.fired_queue_size);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let clock = herald_scheduler::Clock::new(tz);
    let scheduler = herald_scheduler::ReminderManager::new(
        store.clone(),
        clock,
        cmd_tx,
        config.scheduler.misfire_grace_secs,
    );

    let engine = herald_scheduler::TriggerEngine::new(
        store,
        tz,
        fired_tx,
        Duration::from_secs(config.scheduler.resync_interval_secs),
    );
    let engine_task = tokio::spawn(engine.run(cmd_rx, shutdown_rx.clone()));

    let sink: Arc<dyn herald_notify::NotifySink> =
        Arc::new(herald_notify::WebhookSink::new(&config.notify));
    let dispatch_task = tokio::spawn(herald_notify::run_dispatch(
        fired_rx,
        sink,
        config.scheduler.max_in_flight,
        shutdown_rx,
    ));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, scheduler, tracker));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!(%addr, "herald gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the engine and dispatcher once the HTTP side has drained.
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    let _ = dispatch_task.await;
    info!("herald gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
