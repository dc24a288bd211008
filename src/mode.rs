//! ==============================================================================
//! mode.rs - selected vs effective display mode
//! ==============================================================================
//!
//! the buttons set the *selected* mode. each scheduler tick derives the
//! *effective* mode from it and the local hour. the night-hours override is
//! computed, never stored: a weather/energy selection made at night survives
//! and comes back at 07:00 without touching a button.
//!
//! ==============================================================================

use crate::domain::Mode;

use std::sync::Arc;
use tokio::sync::RwLock;

/// first hour (inclusive) of the day display
pub const DAY_START_HOUR: u32 = 7;
/// first hour (inclusive) of the night override
pub const NIGHT_START_HOUR: u32 = 23;

pub fn is_night_hour(hour: u32) -> bool {
    hour < DAY_START_HOUR || hour >= NIGHT_START_HOUR
}

/// mode to render for `selected` at local `hour`
pub fn resolve(selected: Mode, hour: u32) -> Mode {
    if selected == Mode::Night || is_night_hour(hour) {
        Mode::Night
    } else {
        selected
    }
}

#[derive(Clone, Default)]
pub struct ModeController {
    selected: Arc<RwLock<Mode>>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn select(&self, mode: Mode) {
        *self.selected.write().await = mode;
        tracing::info!("mode changed to {}", mode);
    }

    pub async fn selected(&self) -> Mode {
        *self.selected.read().await
    }

    pub async fn effective_mode(&self, hour: u32) -> Mode {
        resolve(self.selected().await, hour)
    }
}
