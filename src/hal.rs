//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     provides a unified interface for the Rainbow HAT (4-digit 14-segment
//!     display, 7-pixel RGB strip, three touch pads with LEDs).
//!     abstracts away the difference between running on a real Raspberry Pi
//!     (using `rppal`) and a development machine (using mocks).
//!
//! design philosophy:
//!     - "Compile Anywhere": The host should compile on Windows/Mac/Linux.
//!     - "One Buffer": text, numbers and decimal points all land in one
//!       segment buffer; `show()` is the only thing that touches the bus.
//!     - "Shared": the render loop, the ingress blink and the touch LEDs all
//!       hold the same driver, so every method takes `&self`.
//!
//! relationships:
//!     - used by: display.rs, night.rs, ingress.rs, input.rs, main.rs
//!     - uses: segments.rs (font + buffer layout)
//!     - uses: rppal (on feature="hardware")
//!
//! ==============================================================================

use crate::domain::{Indicator, Rgb};
use crate::input::ButtonEvent;
use crate::segments::SegmentBuffer;

use anyhow::{anyhow, Result};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// number of APA102 pixels on the strip
pub const RAINBOW_PIXELS: usize = 7;

pub trait DisplayDriver: Send + Sync {
    fn clear(&self) -> Result<()>;
    fn print_str(&self, text: &str) -> Result<()>;
    fn print_number_str(&self, text: &str) -> Result<()>;
    fn set_decimal(&self, index: usize, on: bool) -> Result<()>;
    /// set every strip pixel and latch immediately
    fn fill_rainbow(&self, color: Rgb) -> Result<()>;
    /// touch-pad LEDs, latched immediately
    fn set_ambient(&self, indicator: Indicator) -> Result<()>;
    /// push the segment buffer to the display
    fn show(&self) -> Result<()>;
}

pub struct Hal {
    segments: Mutex<SegmentBuffer>,
    backend: Backend,
}

impl Hal {
    pub fn new() -> Result<Self> {
        Ok(Self {
            segments: Mutex::new(SegmentBuffer::default()),
            backend: Backend::open()?,
        })
    }

    fn segments(&self) -> Result<MutexGuard<'_, SegmentBuffer>> {
        self.segments
            .lock()
            .map_err(|_| anyhow!("segment buffer lock poisoned"))
    }
}

impl DisplayDriver for Hal {
    fn clear(&self) -> Result<()> {
        self.segments()?.clear();
        Ok(())
    }

    fn print_str(&self, text: &str) -> Result<()> {
        self.segments()?.print_str(text);
        Ok(())
    }

    fn print_number_str(&self, text: &str) -> Result<()> {
        self.segments()?.print_number_str(text);
        Ok(())
    }

    fn set_decimal(&self, index: usize, on: bool) -> Result<()> {
        self.segments()?.set_decimal(index, on);
        Ok(())
    }

    fn fill_rainbow(&self, color: Rgb) -> Result<()> {
        self.backend.write_rainbow(&[color; RAINBOW_PIXELS])
    }

    fn set_ambient(&self, indicator: Indicator) -> Result<()> {
        self.backend.write_lights(indicator)
    }

    fn show(&self) -> Result<()> {
        // copy out so the bus write happens without the buffer locked
        let ram = self.segments()?.to_ram();
        self.backend.write_segments(&ram)
    }
}

/// red, green, blue LED levels for an indicator
fn light_levels(indicator: Indicator) -> [bool; 3] {
    match indicator {
        Indicator::Off => [false, false, false],
        Indicator::Red => [true, false, false],
        Indicator::Green => [false, true, false],
        Indicator::Blue => [false, false, true],
    }
}

// ==============================================================================================
// MOCK IMPLEMENTATION (For WSL / Non-Hardware Build)
// ==============================================================================================
#[cfg(not(feature = "hardware"))]
struct Backend;

#[cfg(not(feature = "hardware"))]
impl Backend {
    fn open() -> Result<Self> {
        tracing::info!("Using MOCK HAL (No hardware access)");
        Ok(Self)
    }

    fn write_segments(&self, ram: &[u8]) -> Result<()> {
        tracing::debug!("[MOCK HT16K33] RAM: {:02X?}", ram);
        Ok(())
    }

    fn write_rainbow(&self, pixels: &[Rgb]) -> Result<()> {
        tracing::debug!("[MOCK APA102] Pixels: {:?}", pixels);
        Ok(())
    }

    fn write_lights(&self, indicator: Indicator) -> Result<()> {
        tracing::debug!("[MOCK LIGHTS] RGB {:?} ({:?})", light_levels(indicator), indicator);
        Ok(())
    }
}

/// keeps the touch source alive for as long as it is held
#[cfg(not(feature = "hardware"))]
pub struct TouchPads;

/// no pads on a dev machine: lines `a`, `b` or `c` on stdin press and release a pad
#[cfg(not(feature = "hardware"))]
pub fn listen_touch(events: mpsc::Sender<ButtonEvent>) -> Result<TouchPads> {
    use crate::input::{forward, Button, Edge};
    use tokio::io::{AsyncBufReadExt, BufReader};

    tracing::info!("[MOCK TOUCH] type a, b or c and press enter to touch a pad");
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(button) = Button::from_key(line.trim()) else {
                continue;
            };
            for edge in [Edge::Press, Edge::Release] {
                forward(&events, ButtonEvent { button, edge });
            }
        }
    });
    Ok(TouchPads)
}

// ==============================================================================================
// REAL IMPLEMENTATION (For Raspberry Pi)
// ==============================================================================================
#[cfg(feature = "hardware")]
mod pins {
    pub const LED_RED: u8 = 6;
    pub const LED_GREEN: u8 = 19;
    pub const LED_BLUE: u8 = 26;
    pub const TOUCH_A: u8 = 21;
    pub const TOUCH_B: u8 = 20;
    pub const TOUCH_C: u8 = 16;
}

/// HT16K33 commands
#[cfg(feature = "hardware")]
mod ht16k33 {
    pub const ADDR: u16 = 0x70;
    pub const OSCILLATOR_ON: u8 = 0x21;
    pub const DISPLAY_ON: u8 = 0x81;
    pub const BRIGHTNESS: u8 = 0xE0;
    pub const RAM_START: u8 = 0x00;
}

/// APA102 global brightness, 0..=31
#[cfg(feature = "hardware")]
const RAINBOW_BRIGHTNESS: u8 = 7;

#[cfg(feature = "hardware")]
struct Backend {
    i2c: Mutex<rppal::i2c::I2c>,
    spi: Mutex<rppal::spi::Spi>,
    lights: Mutex<[rppal::gpio::OutputPin; 3]>,
}

#[cfg(feature = "hardware")]
fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("hardware lock poisoned")
}

#[cfg(feature = "hardware")]
impl Backend {
    fn open() -> Result<Self> {
        use anyhow::Context;
        use rppal::gpio::Gpio;
        use rppal::i2c::I2c;
        use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

        tracing::info!("Using REAL HARDWARE HAL (rppal)");

        let mut i2c = I2c::new().context("failed to open i2c bus")?;
        i2c.set_slave_address(ht16k33::ADDR)?;
        for command in [
            ht16k33::OSCILLATOR_ON,
            ht16k33::DISPLAY_ON,
            ht16k33::BRIGHTNESS | 0x0F,
        ] {
            i2c.write(&[command]).context("ht16k33 init failed")?;
        }

        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)
            .context("failed to open spi0 for the rainbow strip")?;

        let gpio = Gpio::new().context("failed to open gpio")?;
        let lights = [
            gpio.get(pins::LED_RED)?.into_output_low(),
            gpio.get(pins::LED_GREEN)?.into_output_low(),
            gpio.get(pins::LED_BLUE)?.into_output_low(),
        ];

        Ok(Self {
            i2c: Mutex::new(i2c),
            spi: Mutex::new(spi),
            lights: Mutex::new(lights),
        })
    }

    fn write_segments(&self, ram: &[u8]) -> Result<()> {
        let mut packet = Vec::with_capacity(ram.len() + 1);
        packet.push(ht16k33::RAM_START);
        packet.extend_from_slice(ram);
        self.i2c.lock().map_err(poisoned)?.write(&packet)?;
        Ok(())
    }

    fn write_rainbow(&self, pixels: &[Rgb]) -> Result<()> {
        // start frame, one 4-byte frame per pixel, then enough clocks to latch the tail
        let mut frame = vec![0u8; 4];
        for Rgb(r, g, b) in pixels {
            frame.extend_from_slice(&[0xE0 | RAINBOW_BRIGHTNESS, *b, *g, *r]);
        }
        frame.extend(std::iter::repeat(0u8).take(pixels.len().div_ceil(16) + 4));
        self.spi.lock().map_err(poisoned)?.write(&frame)?;
        Ok(())
    }

    fn write_lights(&self, indicator: Indicator) -> Result<()> {
        let mut lights = self.lights.lock().map_err(poisoned)?;
        for (pin, on) in lights.iter_mut().zip(light_levels(indicator)) {
            if on {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        Ok(())
    }
}

/// keeps the touch interrupts registered for as long as it is held
#[cfg(feature = "hardware")]
pub struct TouchPads {
    _pins: Vec<rppal::gpio::InputPin>,
}

/// pads pull high at rest; touching one pulls it low
#[cfg(feature = "hardware")]
pub fn listen_touch(events: mpsc::Sender<ButtonEvent>) -> Result<TouchPads> {
    use crate::input::{forward, Button, Edge};
    use anyhow::Context;
    use rppal::gpio::{Event, Gpio, Trigger};

    let gpio = Gpio::new().context("failed to open gpio")?;
    let mut held = Vec::new();
    for (button, bcm) in [
        (Button::A, pins::TOUCH_A),
        (Button::B, pins::TOUCH_B),
        (Button::C, pins::TOUCH_C),
    ] {
        let mut pin = gpio.get(bcm)?.into_input_pullup();
        let tx = events.clone();
        pin.set_async_interrupt(Trigger::Both, None, move |event: Event| {
            let edge = match event.trigger {
                Trigger::FallingEdge => Edge::Press,
                _ => Edge::Release,
            };
            forward(&tx, ButtonEvent { button, edge });
        })
        .with_context(|| format!("failed to watch touch pad {:?}", button))?;
        held.push(pin);
    }
    Ok(TouchPads { _pins: held })
}

// ==============================================================================
// test double
// ==============================================================================

/// records every driver call in order
#[cfg(test)]
pub mod recording {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Clear,
        Text(String),
        Number(String),
        Decimal(usize, bool),
        Rainbow(Rgb),
        Ambient(Indicator),
        Show,
    }

    #[derive(Default)]
    pub struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        /// text and numbers in the order they were printed
        pub fn printed(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Text(s) | Call::Number(s) => Some(s),
                    _ => None,
                })
                .collect()
        }

        fn push(&self, call: Call) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    impl DisplayDriver for Recorder {
        fn clear(&self) -> Result<()> {
            self.push(Call::Clear)
        }
        fn print_str(&self, text: &str) -> Result<()> {
            self.push(Call::Text(text.to_string()))
        }
        fn print_number_str(&self, text: &str) -> Result<()> {
            self.push(Call::Number(text.to_string()))
        }
        fn set_decimal(&self, index: usize, on: bool) -> Result<()> {
            self.push(Call::Decimal(index, on))
        }
        fn fill_rainbow(&self, color: Rgb) -> Result<()> {
            self.push(Call::Rainbow(color))
        }
        fn set_ambient(&self, indicator: Indicator) -> Result<()> {
            self.push(Call::Ambient(indicator))
        }
        fn show(&self) -> Result<()> {
            self.push(Call::Show)
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(all(test, not(feature = "hardware")))]
mod tests {
    use super::*;
    use crate::segments::{glyph, DP};

    #[test]
    fn test_hal_buffers_until_show() {
        let hal = Hal::new().unwrap();
        hal.print_number_str("72.5").unwrap();
        hal.set_decimal(3, true).unwrap();
        assert_eq!(
            hal.segments().unwrap().digits(),
            [0, glyph('7'), glyph('2') | DP, glyph('5') | DP]
        );
        hal.show().unwrap();

        hal.clear().unwrap();
        assert_eq!(hal.segments().unwrap().digits(), [0; 4]);
    }

    #[test]
    fn test_light_levels() {
        assert_eq!(light_levels(Indicator::Off), [false, false, false]);
        assert_eq!(light_levels(Indicator::Green), [false, true, false]);
    }
}
