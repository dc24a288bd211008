//! ==============================================================================
//! render.rs - telemetry -> timed frame sequences
//! ==============================================================================
//!
//! purpose:
//!     turns a cache snapshot into the ordered list of frames one scheduler
//!     tick will play. rendering is pure: holds are data on each segment and
//!     nothing here sleeps or touches the display.
//!
//! frame shape:
//!
//!     titles (0.5s each) -> values (1s each by default) -> [titles again]
//!
//! relationships:
//!     - reads: cache.rs (Snapshot)
//!     - played by: display.rs (play_frames)
//!
//! ==============================================================================

use crate::cache::Snapshot;
use crate::domain::{
    Record, AIRQUALITY_LAST_HOUR, AIRQUALITY_SENSOR, ENERGY_24H_COMPARE, ENERGY_DAILY,
    ENERGY_HOURLY, ENERGY_LOAD, ENERGY_PEAK, WEATHER_SENSOR,
};

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::time::Duration;

pub const TITLE_HOLD: Duration = Duration::from_millis(500);
pub const VALUE_HOLD: Duration = Duration::from_secs(1);
/// temperature is the resting readout and stays up longer
pub const TEMP_HOLD: Duration = Duration::from_secs(2);

const AQI_ALERT: f64 = 100.0;
const GUST_ALERT: f64 = 10.0;

/// one piece of text and how long it stays on the display
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub hold: Duration,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayFrame {
    /// printed as text
    pub titles: Vec<Segment>,
    /// printed as numbers (decimal points use the dp segments)
    pub values: Vec<Segment>,
    /// show the title phase again after the values
    pub replay_titles: bool,
}

impl DisplayFrame {
    pub fn titled<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles
                .into_iter()
                .map(|t| Segment { text: t.into(), hold: TITLE_HOLD })
                .collect(),
            ..Self::default()
        }
    }

    /// a value-only frame, used to put the resting readout back up
    pub fn bare() -> Self {
        Self::default()
    }

    pub fn value(self, text: impl Into<String>) -> Self {
        self.value_held(text, VALUE_HOLD)
    }

    pub fn value_held(mut self, text: impl Into<String>, hold: Duration) -> Self {
        self.values.push(Segment { text: text.into(), hold });
        self
    }

    pub fn replay(mut self) -> Self {
        self.replay_titles = true;
        self
    }

    pub fn duration(&self) -> Duration {
        let titles: Duration = self.titles.iter().map(|s| s.hold).sum();
        let values: Duration = self.values.iter().map(|s| s.hold).sum();
        if self.replay_titles {
            titles * 2 + values
        } else {
            titles + values
        }
    }
}

/// placeholder while the mode's main topic has never arrived
pub fn wait() -> Vec<DisplayFrame> {
    vec![DisplayFrame::titled(["WAIT"])]
}

/// kW/kWh for a 4 digit field: 3 decimals under 10, 2 under 100, else whole
pub fn format_kw(value: f64) -> String {
    if value < 10.0 {
        format!("{:.3}", value)
    } else if value < 100.0 {
        format!("{:.2}", value)
    } else {
        format!("{}", value.trunc() as i64)
    }
}

// ==============================================================================
// field access
// ==============================================================================

/// a numeric field together with the text the feed sent for it
#[derive(Debug, Clone, PartialEq)]
struct Reading {
    value: f64,
    text: String,
}

impl Reading {
    fn zero() -> Self {
        Self { value: 0.0, text: "0".to_string() }
    }
}

/// absent and `null` both read as not sent
fn optional(record: &Record, topic: &str, field: &str) -> Result<Option<Reading>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let value = n
                .as_f64()
                .ok_or_else(|| anyhow!("{}: field '{}' is out of range", topic, field))?;
            Ok(Some(Reading { value, text: n.to_string() }))
        }
        Some(other) => Err(anyhow!(
            "{}: field '{}' is not a number (got {})",
            topic,
            field,
            other
        )),
    }
}

fn required(record: &Record, topic: &str, field: &str) -> Result<Reading> {
    optional(record, topic, field)?
        .ok_or_else(|| anyhow!("{}: missing required field '{}'", topic, field))
}

/// field of a topic that may not have arrived yet; an arrived topic must carry it
fn from_topic(snapshot: &Snapshot, topic: &str, field: &str) -> Result<Option<Reading>> {
    snapshot
        .get(topic)
        .map(|record| required(record, topic, field))
        .transpose()
}

// ==============================================================================
// weather
// ==============================================================================

pub fn render_weather(snapshot: &Snapshot) -> Result<Vec<DisplayFrame>> {
    let Some(weather) = snapshot.get(WEATHER_SENSOR) else {
        return Ok(wait());
    };

    let temp = required(weather, WEATHER_SENSOR, "outdoor_temperature")?;
    let temp_change = optional(weather, WEATHER_SENSOR, "outdoor_temp_change")?
        .unwrap_or_else(Reading::zero);
    let temp_change_24h = optional(weather, WEATHER_SENSOR, "outdoor_24h_temp_change")?
        .unwrap_or_else(Reading::zero);
    let rain_rate = required(weather, WEATHER_SENSOR, "rain_rate")?;
    let wind_gust = required(weather, WEATHER_SENSOR, "wind_gust")?;

    let aqi = from_topic(snapshot, AIRQUALITY_SENSOR, "st_aqi")?.unwrap_or_else(Reading::zero);
    let last_hour_aqi =
        from_topic(snapshot, AIRQUALITY_LAST_HOUR, "st_aqi")?.unwrap_or_else(Reading::zero);

    let mut frames = Vec::new();

    if aqi.value >= AQI_ALERT {
        frames.push(DisplayFrame::titled(["AQI"]).value(aqi.text).value(last_hour_aqi.text));
    }

    if wind_gust.value >= GUST_ALERT {
        frames.push(DisplayFrame::titled(["GUST"]).value(wind_gust.text));
    }

    if rain_rate.value > 0.0 {
        frames.push(DisplayFrame::titled(["RAIN", "RATE"]).value(rain_rate.text));
    }

    frames.push(DisplayFrame::titled(["TEMP"]).value_held(temp.text.clone(), TEMP_HOLD));

    if temp_change.value != 0.0 {
        frames.push(DisplayFrame::titled(["1H"]).value(temp_change.text).replay());
        frames.push(DisplayFrame::bare().value_held(temp.text.clone(), TEMP_HOLD));
    }

    // the trailing readout after the 24h change has no hold: the next tick replaces it
    if temp_change_24h.value != 0.0 {
        frames.push(DisplayFrame::titled(["24H"]).value(temp_change_24h.text).replay());
        frames.push(DisplayFrame::bare().value_held(temp.text, Duration::ZERO));
    }

    Ok(frames)
}

// ==============================================================================
// energy
// ==============================================================================

/// optional statistics shown between load readouts, in display order
const ENERGY_STATS: [(&str, &str, &str); 4] = [
    ("1H", ENERGY_HOURLY, "avg_kw"),
    ("24H", ENERGY_24H_COMPARE, "diff_kw"),
    ("DAY", ENERGY_DAILY, "total_kwh"),
    ("PEAK", ENERGY_PEAK, "peak_kw"),
];

pub fn render_energy(snapshot: &Snapshot) -> Result<Vec<DisplayFrame>> {
    let Some(load) = snapshot.get(ENERGY_LOAD) else {
        return Ok(wait());
    };

    let load = format_kw(required(load, ENERGY_LOAD, "instantaneous")?.value);
    let mut frames = vec![DisplayFrame::titled(["LOAD"]).value(load.clone())];

    for (title, topic, field) in ENERGY_STATS {
        if let Some(stat) = from_topic(snapshot, topic, field)? {
            frames.push(DisplayFrame::titled([title]).value(format_kw(stat.value)));
        }
        frames.push(DisplayFrame::bare().value(load.clone()));
    }

    Ok(frames)
}
