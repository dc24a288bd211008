//! ==============================================================================
//! display.rs - plays frame sequences onto the driver
//! ==============================================================================
//!
//! every hold is a real sleep here: a tick's frames run to completion before
//! the scheduler looks at the mode again.
//!
//! relationships:
//!     - plays: render.rs (DisplayFrame), night.rs / ingress.rs (DecimalStep)
//!     - drives: hal.rs (DisplayDriver)
//!
//! ==============================================================================

use crate::hal::DisplayDriver;
use crate::render::{DisplayFrame, Segment};

use anyhow::Result;
use std::time::Duration;

/// one decimal-point toggle of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalStep {
    pub index: usize,
    pub on: bool,
    pub hold: Duration,
}

impl DecimalStep {
    pub const fn on(index: usize, hold: Duration) -> Self {
        Self { index, on: true, hold }
    }

    pub const fn off(index: usize, hold: Duration) -> Self {
        Self { index, on: false, hold }
    }
}

async fn hold(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

async fn play_titles(display: &dyn DisplayDriver, titles: &[Segment]) -> Result<()> {
    for title in titles {
        display.clear()?;
        display.print_str(&title.text)?;
        display.show()?;
        hold(title.hold).await;
    }
    Ok(())
}

pub async fn play_frame(display: &dyn DisplayDriver, frame: &DisplayFrame) -> Result<()> {
    play_titles(display, &frame.titles).await?;

    for value in &frame.values {
        display.clear()?;
        display.print_number_str(&value.text)?;
        display.show()?;
        hold(value.hold).await;
    }

    if frame.replay_titles {
        play_titles(display, &frame.titles).await?;
    }
    Ok(())
}

pub async fn play_frames(display: &dyn DisplayDriver, frames: &[DisplayFrame]) -> Result<()> {
    for frame in frames {
        play_frame(display, frame).await?;
    }
    Ok(())
}

pub async fn play_decimals(display: &dyn DisplayDriver, steps: &[DecimalStep]) -> Result<()> {
    for step in steps {
        display.set_decimal(step.index, step.on)?;
        display.show()?;
        hold(step.hold).await;
    }
    Ok(())
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::recording::{Call, Recorder};
    use crate::render::{DisplayFrame, TEMP_HOLD};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_frame_call_order_and_timing() {
        let recorder = Recorder::default();
        let frame = DisplayFrame::titled(["1H"]).value("-2").replay();

        let start = Instant::now();
        play_frame(&recorder, &frame).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Clear,
                Call::Text("1H".into()),
                Call::Show,
                Call::Clear,
                Call::Number("-2".into()),
                Call::Show,
                Call::Clear,
                Call::Text("1H".into()),
                Call::Show,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_play_in_sequence() {
        let recorder = Recorder::default();
        let frames = vec![
            DisplayFrame::titled(["RAIN", "RATE"]).value("0.5"),
            DisplayFrame::titled(["TEMP"]).value_held("72", TEMP_HOLD),
            DisplayFrame::bare().value_held("72", Duration::ZERO),
        ];

        let start = Instant::now();
        play_frames(&recorder, &frames).await.unwrap();

        assert_eq!(recorder.printed(), ["RAIN", "RATE", "0.5", "TEMP", "72", "72"]);
        let expected: Duration = frames.iter().map(DisplayFrame::duration).sum();
        assert_eq!(start.elapsed(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decimal_steps() {
        let recorder = Recorder::default();
        let steps = [
            DecimalStep::on(2, Duration::from_millis(100)),
            DecimalStep::off(2, Duration::ZERO),
        ];

        let start = Instant::now();
        play_decimals(&recorder, &steps).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(
            recorder.calls(),
            vec![Call::Decimal(2, true), Call::Show, Call::Decimal(2, false), Call::Show]
        );
    }
}
