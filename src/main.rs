use std::{thread, time::Duration};

use tracing::{error, info, Level};

use kart_engine::{EngineConfig, RaceEngine};

/// Runs a single player race against the bots and logs the standings
/// once a second until someone takes the final lap.
fn main() {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_thread_names(true)
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Should be able to set global subscriber");

    info!("Starting a bot race");
    let mut engine = match RaceEngine::start(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Could not start the engine: {e}");
            return;
        }
    };

    loop {
        if engine.is_finished() {
            break;
        }

        let state = match engine.state.read() {
            Ok(lock) => lock,
            Err(e) => {
                error!("Race state was poisoned: {:?}", e);
                break;
            }
        };

        info!(
            "{:?} after {} ms",
            state.phase,
            state.elapsed_ms
        );
        let mut standings: Vec<_> = state.karts().iter().collect();
        standings.sort_by_key(|kart| kart.rank);
        for kart in standings {
            info!(
                "  {}. {} (lap {}, item {:?})",
                kart.rank, kart.name, kart.lap, kart.item
            );
        }
        let finished = state.finished;
        drop(state);

        if finished {
            engine.stop();
            break;
        }
        thread::sleep(Duration::from_millis(1000));
    }

    if let Some(Err(e)) = engine.join() {
        info!("Engine failed because: {e}");
    }
    info!("Race done");
}
