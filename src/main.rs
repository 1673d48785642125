use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use tilestate::board::GridBoard;
use tilestate::config::{load_config, StoreBackend, TileStateConfig};
use tilestate::game::{Game, GameLoop};
use tilestate::nats::NatsBridge;
use tilestate::sink::{BroadcastSink, EventSink, SinkMessage};
use tilestate::store::{DataStore, InMemoryDataStore, SqliteDataStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tilestate=info".into()),
        )
        .init();

    info!("Tilestate starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => {
            info!("No config file given, using defaults");
            TileStateConfig::default()
        }
    };

    let store: Arc<dyn DataStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryDataStore::new()),
        StoreBackend::Sqlite => {
            info!(path = %config.store.path, "Opening SQLite data store");
            Arc::new(SqliteDataStore::new(&config.store.path)?)
        }
    };

    let sink: Arc<dyn EventSink> = if config.nats.enabled {
        Arc::new(NatsBridge::connect(&config.nats, &config.game.id).await?)
    } else {
        let sink = Arc::new(BroadcastSink::default());
        tokio::spawn(log_messages(sink.subscribe()));
        sink
    };

    let mut builder = Game::builder(config.game.id.clone())
        .data_store(store)
        .sink(sink)
        .elapsed_offset_ms(config.game.elapsed_offset_ms);
    for kind in &config.entities.persistent_types {
        builder = builder.persistent_kind(kind.clone());
    }
    for board in &config.boards {
        let grid = GridBoard::from_ascii(board.name.clone(), &board.map)
            .with_context(|| format!("Invalid map for board '{}'", board.name))?;
        builder = builder.board(Arc::new(grid));
    }
    let game = Arc::new(builder.build()?);
    game.bind_remote_events()?;

    for name in game.board_names() {
        if let Err(e) = game.publish_board_state(&name) {
            warn!(board = %name, error = %e, "Failed to publish board state");
        }
    }

    // The loop owns a blocking thread; Ctrl-C flips the flag it polls
    let running = Arc::new(AtomicBool::new(true));
    let mut game_loop = GameLoop::new(Arc::clone(&game))
        .with_tick_interval(Duration::from_millis(config.game.tick_interval_ms));
    let still_running = Arc::clone(&running);
    let mut handle =
        tokio::task::spawn_blocking(move || game_loop.run(|| still_running.load(Ordering::SeqCst)));

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
            running.store(false, Ordering::SeqCst);
            (&mut handle).await
        }
        result = &mut handle => result,
    };

    let ticks = result.context("Game loop task panicked")??;
    info!(game_id = %game.id(), ticks, "Tilestate stopped");
    Ok(())
}

async fn log_messages(mut rx: broadcast::Receiver<SinkMessage>) {
    loop {
        match rx.recv().await {
            Ok(message) => debug!(?message, "Sink message"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Sink logger lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
