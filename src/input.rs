//! ==============================================================================
//! input.rs - touch pads -> mode selection
//! ==============================================================================
//!
//! pad edges arrive from the hal over a bounded channel and are handled on
//! their own task, so a touch never waits on the render loop and the render
//! loop never waits on a touch.
//!
//!     A press -> weather, red LED
//!     B press -> energy,  green LED
//!     C press -> night,   blue LED
//!     any release -> LEDs off
//!
//! ==============================================================================

use crate::domain::{Indicator, Mode};
use crate::hal::DisplayDriver;
use crate::mode::ModeController;

use std::sync::Arc;
use tokio::sync::mpsc;

/// room for a few edges while the handler is busy
pub const EVENT_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    C,
}

impl Button {
    pub fn mode(self) -> Mode {
        match self {
            Button::A => Mode::Weather,
            Button::B => Mode::Energy,
            Button::C => Mode::Night,
        }
    }

    pub fn indicator(self) -> Indicator {
        match self {
            Button::A => Indicator::Red,
            Button::B => Indicator::Green,
            Button::C => Indicator::Blue,
        }
    }

    /// keyboard stand-in for the pads
    #[cfg_attr(feature = "hardware", allow(dead_code))]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "a" | "A" => Some(Button::A),
            "b" | "B" => Some(Button::B),
            "c" | "C" => Some(Button::C),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub edge: Edge,
}

/// hand an edge to the handler without blocking the caller (interrupt thread)
pub fn forward(tx: &mpsc::Sender<ButtonEvent>, event: ButtonEvent) {
    if let Err(e) = tx.try_send(event) {
        tracing::warn!("dropped touch event {:?}: {}", event, e);
    }
}

pub struct InputHandler {
    modes: ModeController,
    display: Arc<dyn DisplayDriver>,
}

impl InputHandler {
    pub fn new(modes: ModeController, display: Arc<dyn DisplayDriver>) -> Self {
        Self { modes, display }
    }

    pub async fn handle(&self, event: ButtonEvent) {
        let indicator = match event.edge {
            Edge::Press => {
                self.modes.select(event.button.mode()).await;
                event.button.indicator()
            }
            Edge::Release => Indicator::Off,
        };

        if let Err(e) = self.display.set_ambient(indicator) {
            tracing::warn!("failed to set touch LEDs: {:#}", e);
        }
    }

    /// runs until every sender is gone
    pub async fn run(self, mut events: mpsc::Receiver<ButtonEvent>) {
        while let Some(event) = events.recv().await {
            tracing::debug!("touch {:?}", event);
            self.handle(event).await;
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::recording::{Call, Recorder};

    fn press(button: Button) -> ButtonEvent {
        ButtonEvent { button, edge: Edge::Press }
    }

    fn release(button: Button) -> ButtonEvent {
        ButtonEvent { button, edge: Edge::Release }
    }

    #[tokio::test]
    async fn test_press_selects_and_lights() {
        let modes = ModeController::new();
        let recorder = Arc::new(Recorder::default());
        let handler = InputHandler::new(modes.clone(), recorder.clone());

        handler.handle(press(Button::B)).await;
        assert_eq!(modes.selected().await, Mode::Energy);

        handler.handle(release(Button::B)).await;
        assert_eq!(modes.selected().await, Mode::Energy);

        handler.handle(press(Button::C)).await;
        assert_eq!(modes.selected().await, Mode::Night);

        assert_eq!(
            recorder.calls(),
            vec![
                Call::Ambient(Indicator::Green),
                Call::Ambient(Indicator::Off),
                Call::Ambient(Indicator::Blue),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let modes = ModeController::new();
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        forward(&tx, press(Button::C));
        forward(&tx, release(Button::C));
        forward(&tx, press(Button::A));
        drop(tx);

        InputHandler::new(modes.clone(), recorder.clone()).run(rx).await;

        assert_eq!(modes.selected().await, Mode::Weather);
        assert_eq!(recorder.calls().last(), Some(&Call::Ambient(Indicator::Red)));
    }

    #[test]
    fn test_forward_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        forward(&tx, press(Button::A));
        forward(&tx, press(Button::B));

        assert_eq!(rx.try_recv().unwrap(), press(Button::A));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(Button::A.mode(), Mode::Weather);
        assert_eq!(Button::B.indicator(), Indicator::Green);
        assert_eq!(Button::from_key("c"), Some(Button::C));
        assert_eq!(Button::from_key("x"), None);
    }
}
