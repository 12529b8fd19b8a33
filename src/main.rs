use std::sync::Arc;
use std::thread;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use TrafficLightMini::core::light::{LightError, TrafficLight};

fn main() -> Result<(), LightError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let light = Arc::new(TrafficLight::new());
    light.simulate()?;

    // A renderer would poll the phase; here a watcher just logs every change
    let subscription = light.subscribe();
    let watcher = thread::spawn(move || {
        while let Ok(phase) = subscription.next_phase() {
            info!(%phase, "light changed");
        }
    });

    // Three vehicles arrive at the light and cross on green
    for vehicle in 1..=3 {
        info!(vehicle, phase = %light.current_phase(), "vehicle waiting");
        light.wait_for_green()?;
        info!(vehicle, "vehicle crossing");
    }

    light.shutdown();
    if watcher.join().is_err() {
        error!("phase watcher thread panicked");
    }

    // Append the transition history as NDJSON
    light.dump_transitions("transitions.ndjson")?;
    Ok(())
}
