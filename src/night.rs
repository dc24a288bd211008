//! Night mode: blank display, strip off, one slow sweep of the decimal points.

use crate::display::{play_decimals, DecimalStep};
use crate::domain::Rgb;
use crate::hal::DisplayDriver;
use crate::segments::DIGITS;

use anyhow::Result;
use std::time::Duration;

const BLINK_ON: Duration = Duration::from_millis(100);
/// dark time after the sweep, before the scheduler's own pause
pub const NIGHT_IDLE: Duration = Duration::from_secs(8);

/// each decimal point on for 0.1s, left to right
pub fn blink_pattern() -> Vec<DecimalStep> {
    (0..DIGITS)
        .flat_map(|i| [DecimalStep::on(i, BLINK_ON), DecimalStep::off(i, Duration::ZERO)])
        .collect()
}

pub async fn render_night(display: &dyn DisplayDriver) -> Result<()> {
    display.clear()?;
    display.fill_rainbow(Rgb::OFF)?;
    play_decimals(display, &blink_pattern()).await?;
    tokio::time::sleep(NIGHT_IDLE).await;
    Ok(())
}
