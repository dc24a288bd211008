use std::fmt;

/// one decoded telemetry message: field name -> scalar
pub type Record = serde_json::Map<String, serde_json::Value>;

// ==============================================================================
// topics
// ==============================================================================

pub const WEATHER_SENSOR: &str = "weather.sensor";
pub const AIRQUALITY_SENSOR: &str = "airquality.sensor";
pub const AIRQUALITY_LAST_HOUR: &str = "airquality.last_hour";
pub const ENERGY_LOAD: &str = "energy.load";
pub const ENERGY_HOURLY: &str = "energy.hourly";
pub const ENERGY_24H_COMPARE: &str = "energy.24h_compare";
pub const ENERGY_DAILY: &str = "energy.daily";
pub const ENERGY_PEAK: &str = "energy.peak";

/// every topic the display subscribes to, weather first then energy
pub const SUBSCRIPTIONS: [&str; 8] = [
    WEATHER_SENSOR,
    AIRQUALITY_SENSOR,
    AIRQUALITY_LAST_HOUR,
    ENERGY_LOAD,
    ENERGY_HOURLY,
    ENERGY_24H_COMPARE,
    ENERGY_DAILY,
    ENERGY_PEAK,
];

/// what the display is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Weather,
    Energy,
    Night,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Weather => "weather",
            Mode::Energy => "energy",
            Mode::Night => "night",
        })
    }
}

/// colour of the three touch-pad LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indicator {
    #[default]
    Off,
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
}
