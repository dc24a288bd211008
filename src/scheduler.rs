//! ==============================================================================
//! scheduler.rs - the render loop
//! ==============================================================================
//!
//! one tick: read the local hour, resolve the effective mode, render and play
//! it to completion, then pause. the pause starts after the frames finish, so
//! a long sequence stretches the period instead of skipping a tick.
//!
//!     ┌──────────┐   ┌───────────────┐   ┌──────────────┐   ┌───────────┐
//!     │ hour now │ → │ effective mode│ → │ render/play  │ → │ sleep 2s  │ ─┐
//!     └──────────┘   └───────────────┘   └──────────────┘   └───────────┘  │
//!          ▲                                                               │
//!          └───────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use crate::cache::TelemetryCache;
use crate::display::play_frames;
use crate::domain::Mode;
use crate::hal::DisplayDriver;
use crate::mode::ModeController;
use crate::night::render_night;
use crate::render::{render_energy, render_weather, DisplayFrame};

use anyhow::{Context, Result};
use chrono::Timelike;
use std::sync::Arc;
use std::time::Duration;

/// pause between the end of one tick and the start of the next
pub const TICK_INTERVAL: Duration = Duration::from_secs(2);

pub fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

pub struct Scheduler {
    cache: TelemetryCache,
    modes: ModeController,
    display: Arc<dyn DisplayDriver>,
}

impl Scheduler {
    pub fn new(cache: TelemetryCache, modes: ModeController, display: Arc<dyn DisplayDriver>) -> Self {
        Self { cache, modes, display }
    }

    /// render and play one tick for `hour`.
    ///
    /// telemetry that breaks the data contract (missing or non-numeric
    /// required fields) is returned as an error; display errors are only
    /// logged so the loop keeps running.
    pub async fn tick(&self, hour: u32) -> Result<Mode> {
        let mode = self.modes.effective_mode(hour).await;
        tracing::debug!("tick at {:02}h: {} mode", hour, mode);

        let played = match mode {
            Mode::Night => render_night(self.display.as_ref()).await,
            Mode::Weather => {
                let frames = render_weather(&self.cache.snapshot().await)
                    .context("cannot render weather")?;
                self.play(&frames).await
            }
            Mode::Energy => {
                let frames = render_energy(&self.cache.snapshot().await)
                    .context("cannot render energy")?;
                self.play(&frames).await
            }
        };

        if let Err(e) = played {
            tracing::warn!("display error during {} tick: {:#}", mode, e);
        }
        Ok(mode)
    }

    async fn play(&self, frames: &[DisplayFrame]) -> Result<()> {
        let total: Duration = frames.iter().map(DisplayFrame::duration).sum();
        tracing::debug!("playing {} frames ({:?})", frames.len(), total);
        play_frames(self.display.as_ref(), frames).await
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!("render loop started ({:?} between ticks)", TICK_INTERVAL);
        loop {
            self.tick(local_hour()).await?;
            tokio::time::sleep(TICK_INTERVAL).await;
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Rgb, Record};
    use crate::hal::recording::{Call, Recorder};
    use crate::ingress::TelemetryIngress;
    use serde_json::json;

    fn setup() -> (Scheduler, TelemetryCache, ModeController, Arc<Recorder>) {
        let cache = TelemetryCache::new();
        let modes = ModeController::new();
        let recorder = Arc::new(Recorder::default());
        let scheduler = Scheduler::new(cache.clone(), modes.clone(), recorder.clone());
        (scheduler, cache, modes, recorder)
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_then_render_weather() {
        let (scheduler, cache, _, recorder) = setup();
        let ingress = TelemetryIngress::new(cache.clone(), recorder.clone(), false);
        ingress
            .handle_message(
                "weather.sensor",
                br#"{"outdoor_temperature": 68, "rain_rate": 0, "wind_gust": 3}"#,
            )
            .await
            .unwrap();

        let before = recorder.calls().len();
        assert_eq!(scheduler.tick(14).await.unwrap(), Mode::Weather);

        let rendered: Vec<String> = recorder.calls()[before..]
            .iter()
            .filter_map(|c| match c {
                Call::Text(s) | Call::Number(s) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(rendered, ["TEMP", "68"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_without_telemetry() {
        let (scheduler, _, modes, recorder) = setup();
        scheduler.tick(10).await.unwrap();
        modes.select(Mode::Energy).await;
        scheduler.tick(10).await.unwrap();
        assert_eq!(recorder.printed(), ["WAIT", "WAIT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_night_hours_render_night() {
        let (scheduler, cache, modes, recorder) = setup();
        cache.put("energy.load", record(json!({"instantaneous": 1.0}))).await;
        modes.select(Mode::Energy).await;

        assert_eq!(scheduler.tick(23).await.unwrap(), Mode::Night);
        assert!(recorder.printed().is_empty());
        assert!(recorder.calls().contains(&Call::Rainbow(Rgb::OFF)));

        // selection comes back once day hours resume
        assert_eq!(scheduler.tick(7).await.unwrap(), Mode::Energy);
        assert_eq!(recorder.printed()[..2], ["LOAD", "1.000"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_violation_is_error() {
        let (scheduler, cache, _, _) = setup();
        cache.put("weather.sensor", record(json!({"outdoor_temperature": 50}))).await;

        let err = scheduler.tick(12).await.unwrap_err();
        assert!(format!("{:#}", err).contains("rain_rate"), "{:#}", err);
    }
}
