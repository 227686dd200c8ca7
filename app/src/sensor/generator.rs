use crate::error::DBError;
use crate::models::{reading::ReplaceSummary, Store};
use chrono::Utc;
use irrigo_core::ReadingSample;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, Instrument};

/// Periodically overwrites the sensor readings of every checkpoint with
/// fresh simulated values.
pub struct SensorGenerator {
    store: Arc<dyn Store>,
    interval: Duration,
}

impl std::fmt::Debug for SensorGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorGenerator")
            .field("interval", &self.interval)
            .finish()
    }
}

impl SensorGenerator {
    pub fn new(store: Arc<dyn Store>, interval: Duration) -> Arc<Self> {
        Arc::new(SensorGenerator { store, interval })
    }

    /// Runs a single regeneration pass in one transaction.
    pub async fn run_once(&self) -> Result<ReplaceSummary, DBError> {
        let mut rng = StdRng::from_entropy();
        let mut sampler = move || ReadingSample::generate(&mut rng, Utc::now());
        self.store.regenerate_readings(&mut sampler).await
    }

    /// Starts the generator loop on its own task.
    pub fn spawn(self: Arc<SensorGenerator>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.dispatch_generate_loop(shutdown))
    }

    /// Dispatches the generator loop, the first pass runs immediately.
    /// A failed pass is logged and the loop keeps going.
    /// Returns once `shutdown` flips to true, never in the middle of a pass.
    pub async fn dispatch_generate_loop(
        self: Arc<SensorGenerator>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Start generating sensor data every {:?}", self.interval);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let span = info_span!("sensor_tick");
                    match self.run_once().instrument(span).await {
                        Ok(summary) if summary.checkpoints == 0 => {
                            debug!("No checkpoints, nothing to regenerate")
                        }
                        Ok(summary) => debug!(
                            checkpoints = summary.checkpoints,
                            updated = summary.updated,
                            created = summary.created,
                            "Regenerated sensor data"
                        ),
                        Err(e) => error!("Failed generating sensor data: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Stopped generating sensor data");
    }
}
