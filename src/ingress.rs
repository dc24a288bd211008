//! ==============================================================================
//! ingress.rs - mqtt messages -> telemetry cache
//! ==============================================================================
//!
//! purpose:
//!     owns the mqtt event loop. every publish on a subscribed topic is decoded
//!     as a json object, stored in the cache (replacing the previous record)
//!     and acknowledged by blinking the rightmost decimal point.
//!
//! failure policy:
//!     - payload that is not a json object: fatal, the task returns the error
//!     - connection errors: logged, the event loop is polled again after a
//!       pause, which makes rumqttc reconnect
//!
//! relationships:
//!     - writes: cache.rs
//!     - drives: hal.rs (acknowledgment blink via display.rs)
//!
//! ==============================================================================

use crate::cache::TelemetryCache;
use crate::config::MqttConfig;
use crate::display::{play_decimals, DecimalStep};
use crate::domain::{Record, SUBSCRIPTIONS};
use crate::hal::DisplayDriver;

use anyhow::{anyhow, Context, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, SubscribeFilter};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_QUEUE_DEPTH: usize = 16;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
/// rightmost decimal point
const ACK_DIGIT: usize = 3;

/// on 0.5s, off 0.25s, on 0.5s, off
pub const ACK_PATTERN: [DecimalStep; 4] = [
    DecimalStep::on(ACK_DIGIT, Duration::from_millis(500)),
    DecimalStep::off(ACK_DIGIT, Duration::from_millis(250)),
    DecimalStep::on(ACK_DIGIT, Duration::from_millis(500)),
    DecimalStep::off(ACK_DIGIT, Duration::ZERO),
];

/// utf-8 json object, nothing else
pub fn decode_record(payload: &[u8]) -> Result<Record> {
    let text = std::str::from_utf8(payload).context("payload is not utf-8")?;
    match serde_json::from_str::<serde_json::Value>(text).context("payload is not json")? {
        serde_json::Value::Object(record) => Ok(record),
        other => Err(anyhow!("payload is not a record: {}", other)),
    }
}

pub struct TelemetryIngress {
    cache: TelemetryCache,
    display: Arc<dyn DisplayDriver>,
    show_payloads: bool,
}

impl TelemetryIngress {
    pub fn new(cache: TelemetryCache, display: Arc<dyn DisplayDriver>, show_payloads: bool) -> Self {
        Self { cache, display, show_payloads }
    }

    /// store one message and blink; a malformed payload is returned as an error
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.show_payloads {
            tracing::info!("{} -> {}", topic, String::from_utf8_lossy(payload));
        }

        let record = decode_record(payload)
            .with_context(|| format!("malformed payload on topic '{}'", topic))?;
        if !self.cache.has(topic).await {
            tracing::info!("first message on {}", topic);
        }
        self.cache.put(topic, record).await;

        if let Err(e) = play_decimals(self.display.as_ref(), &ACK_PATTERN).await {
            tracing::warn!("acknowledgment blink failed: {:#}", e);
        }
        Ok(())
    }

    /// connect, subscribe on every connack, ingest until a fatal payload
    pub async fn run(self, config: MqttConfig) -> Result<()> {
        let mut options = MqttOptions::new(config.client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds));

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_QUEUE_DEPTH);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!("connected to broker ({:?})", ack.code);
                    // re-subscribing here keeps subscriptions across reconnects
                    client
                        .subscribe_many(subscriptions())
                        .await
                        .context("failed to queue subscriptions")?;
                    tracing::info!("subscribed to {} topics", SUBSCRIPTIONS.len());
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_message(&publish.topic, &publish.payload).await?;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("mqtt connection error: {} (retrying in {:?})", e, RECONNECT_DELAY);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

fn subscriptions() -> Vec<SubscribeFilter> {
    SUBSCRIPTIONS
        .iter()
        .map(|topic| SubscribeFilter::new(topic.to_string(), QoS::AtMostOnce))
        .collect()
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::recording::{Call, Recorder};
    use serde_json::json;
    use tokio::time::Instant;

    fn ingress() -> (TelemetryIngress, TelemetryCache, Arc<Recorder>) {
        let cache = TelemetryCache::new();
        let recorder = Arc::new(Recorder::default());
        (TelemetryIngress::new(cache.clone(), recorder.clone(), false), cache, recorder)
    }

    #[test]
    fn test_decode_record() {
        let record = decode_record(br#"{"st_aqi": 42, "label": "ok"}"#).unwrap();
        assert_eq!(record.get("st_aqi"), Some(&json!(42)));
        assert_eq!(record.get("label"), Some(&json!("ok")));
    }

    #[test]
    fn test_decode_rejects_non_records() {
        assert!(decode_record(b"not json").is_err());
        assert!(decode_record(b"[1, 2, 3]").is_err());
        assert!(decode_record(b"17.5").is_err());
        assert!(decode_record(&[0xff, 0xfe]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_is_cached_and_acknowledged() {
        let (ingress, cache, recorder) = ingress();

        let start = Instant::now();
        ingress
            .handle_message("energy.load", br#"{"instantaneous": 3.2}"#)
            .await
            .unwrap();

        let stored = cache.get("energy.load").await.unwrap();
        assert_eq!(stored.get("instantaneous"), Some(&json!(3.2)));

        assert_eq!(start.elapsed(), Duration::from_millis(1250));
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Decimal(3, true),
                Call::Show,
                Call::Decimal(3, false),
                Call::Show,
                Call::Decimal(3, true),
                Call::Show,
                Call::Decimal(3, false),
                Call::Show,
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_is_fatal_and_not_cached() {
        let (ingress, cache, recorder) = ingress();
        cache.put("weather.sensor", Record::new()).await;

        let err = ingress
            .handle_message("weather.sensor", b"{\"outdoor_temperature\": ")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("weather.sensor"), "{}", err);
        // previous record untouched, no blink
        assert!(cache.get("weather.sensor").await.unwrap().is_empty());
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_subscribes_to_every_topic() {
        let filters = subscriptions();
        assert_eq!(filters.len(), 8);
        assert!(filters.iter().all(|f| f.qos == QoS::AtMostOnce));
        assert_eq!(filters[0].path, "weather.sensor");
        assert_eq!(filters[7].path, "energy.peak");
    }
}
