//! ==============================================================================
//! main.rs - rainbow display entry point
//! ==============================================================================
//!
//! purpose:
//!     drives a Rainbow HAT (4-digit 14-segment display, rgb strip, three
//!     touch pads) from weather and energy telemetry published over mqtt.
//!
//! responsibilities:
//!     - load configuration and install logging
//!     - open the display hardware (or the mock driver)
//!     - run the mqtt ingress task (cache writes + receipt blink)
//!     - run the touch handler task (mode selection + pad LEDs)
//!     - run the render loop on the main task
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    rust host (this file)                     │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ mqtt ingress│  │ render loop │  │ touch handler       │  │
//!     │  │ (async)     │  │ (2s pause)  │  │ (button edges)      │  │
//!     │  └──────┬──────┘  └──┬───────┬──┘  └──────────┬──────────┘  │
//!     │         │ put        │ read  │ effective      │ select      │
//!     │         ▼            ▼       ▼                ▼             │
//!     │    ┌─────────────────────┐  ┌──────────────────────┐        │
//!     │    │   TelemetryCache    │  │    ModeController    │        │
//!     │    └─────────────────────┘  └──────────────────────┘        │
//!     └──────────────────────────────┬──────────────────────────────┘
//!                                    │ DisplayDriver
//!                          ┌─────────┴─────────┐
//!                          ▼                   ▼
//!                   ┌─────────────┐     ┌─────────────┐
//!                   │ rppal (pi)  │     │ mock (dev)  │
//!                   └─────────────┘     └─────────────┘
//!
//! button controls:
//!     A - weather (temperature, aqi, wind, rain)
//!     B - energy (load, hourly avg, 24h compare, daily total, peak)
//!     C - night (dim decimal-point sweep)
//!
//! ==============================================================================

mod cache;
mod config;
mod display;
mod domain;
mod hal;
mod ingress;
mod input;
mod mode;
mod night;
mod render;
mod scheduler;
mod segments;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Rainbow HAT Telemetry Display");
    println!("  A: weather | B: energy | C: night");
    println!("===========================================================");

    // step 1: load configuration
    let config = config::DisplayConfig::load_or_default();

    // step 2: logging (RUST_LOG wins over the config file)
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("invalid log level '{}' in config", config.logging.level))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    config.print_summary();

    // step 3: hardware
    let display: Arc<dyn hal::DisplayDriver> =
        Arc::new(hal::Hal::new().context("failed to open display hardware")?);

    // step 4: shared state
    let cache = cache::TelemetryCache::new();
    let modes = mode::ModeController::new();

    // step 5: touch pads -> input handler
    let (button_tx, button_rx) = mpsc::channel(input::EVENT_QUEUE_DEPTH);
    let _touch = hal::listen_touch(button_tx).context("failed to start touch pads")?;
    let handler = input::InputHandler::new(modes.clone(), display.clone());
    tokio::spawn(handler.run(button_rx));

    // step 6: mqtt ingress in background
    tracing::info!("connecting to mqtt broker at {}:{}", config.mqtt.host, config.mqtt.port);
    let ingress = ingress::TelemetryIngress::new(
        cache.clone(),
        display.clone(),
        config.logging.show_payloads,
    );
    let ingress_task = tokio::spawn(ingress.run(config.mqtt.clone()));

    // step 7: render loop; either side failing ends the program
    let scheduler = scheduler::Scheduler::new(cache, modes, display);
    tokio::select! {
        result = scheduler.run() => result.context("render loop stopped"),
        joined = ingress_task => joined
            .context("ingress task panicked")?
            .context("telemetry ingress stopped"),
    }
}
