// src/core/provider/simulated.rs

//! A provider that fabricates a slowly wandering position.
//!
//! Useful for running the server on machines without a GNSS receiver and for
//! exercising clients end to end.

use super::{LocationProvider, LocationSource};
use crate::config::SimulatorConfig;
use crate::core::errors::ProviderError;
use crate::core::events::ProviderSink;
use crate::core::state::LocationFix;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Meters per degree of latitude, close enough for a simulation.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// The moving part of the simulation.
#[derive(Debug, Clone)]
struct Walker {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    bearing: f32,
    speed: f32,
}

impl Walker {
    fn step(&mut self, rng: &mut SmallRng, elapsed_secs: f64) {
        self.bearing = (self.bearing + rng.gen_range(-10.0..10.0)).rem_euclid(360.0);
        self.speed = (self.speed + rng.gen_range(-0.5..0.5)).clamp(0.0, 15.0);
        self.altitude += rng.gen_range(-0.5..0.5);

        let distance = self.speed as f64 * elapsed_secs;
        let bearing = (self.bearing as f64).to_radians();
        self.latitude += distance * bearing.cos() / METERS_PER_DEGREE;
        let lon_scale = METERS_PER_DEGREE * self.latitude.to_radians().cos().max(0.01);
        self.longitude += distance * bearing.sin() / lon_scale;
    }

    fn fix(&self, provider: &str, rng: &mut SmallRng) -> LocationFix {
        LocationFix::new(
            chrono::Utc::now().timestamp_millis(),
            self.latitude,
            self.longitude,
            provider,
        )
        .with_altitude(self.altitude)
        .with_accuracy(rng.gen_range(2.0..8.0))
        .with_bearing(self.bearing)
        .with_speed(self.speed)
    }
}

/// Emits a fix and a satellite count every `SimulatorConfig::interval`.
pub struct SimulatedProvider {
    config: SimulatorConfig,
    running: Mutex<Option<CancellationToken>>,
}

impl SimulatedProvider {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl LocationProvider for SimulatedProvider {
    fn start(&self, source: LocationSource, sink: ProviderSink) -> Result<(), ProviderError> {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!("Simulated provider already running.");
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ProviderError::Unavailable(format!("no async runtime: {e}")))?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let interval = self.config.interval;
        let base_satellites = self.config.satellites;
        let provider_name = source.to_string();
        let mut walker = Walker {
            latitude: self.config.latitude,
            longitude: self.config.longitude,
            altitude: self.config.altitude,
            bearing: 0.0,
            speed: 1.0,
        };

        handle.spawn(async move {
            let mut rng = SmallRng::from_entropy();
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        walker.step(&mut rng, interval.as_secs_f64());
                        let jitter: i64 = rng.gen_range(-1..=1);
                        let satellites = (base_satellites as i64 + jitter).max(0) as u32;
                        if !sink.on_satellite_count(satellites)
                            || !sink.on_fix(walker.fix(&provider_name, &mut rng))
                        {
                            break;
                        }
                    }
                }
            }
            debug!("Simulated provider task finished.");
        });

        info!(
            "Simulated {} provider started (interval {:?}).",
            source, self.config.interval
        );
        *running = Some(cancel);
        Ok(())
    }

    fn stop(&self) {
        if let Some(cancel) = self.running.lock().take() {
            cancel.cancel();
            info!("Simulated provider stopped.");
        }
    }
}
