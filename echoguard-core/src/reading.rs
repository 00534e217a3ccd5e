//! Telemetry readings and the ingest schema
//!
//! ## Wire Format
//!
//! Devices post readings as JSON objects, alone or in an array:
//!
//! ```json
//! {
//!   "device_id": "pump_17_3f9a",
//!   "device_type": "pump",
//!   "timestamp": "2024-03-01T12:00:45Z",
//!   "temperature": 61.2,
//!   "vibration": 0.31,
//!   "rpm": null,
//!   "humidity": 40.5,
//!   "label": 0
//! }
//! ```
//!
//! Channels may be absent or null; they become missing cells, never zero.
//! A missing timestamp is stamped with the injected clock. A numeric timestamp
//! is epoch seconds, or epoch milliseconds when its magnitude exceeds 2e10.
//! Unknown fields are rejected instead of silently dropped, and a value of
//! the wrong JSON type is reported against its field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::channels::{CHANNEL_COUNT, CHANNEL_NAMES};
use crate::errors::SchemaError;
use crate::time::{epoch_timestamp, parse_timestamp, TimeSource, Timestamp};

/// One row of channel values in model order; `None` is a missing cell
pub type ChannelRow = [Option<f64>; CHANNEL_COUNT];

/// A row of channel values with no missing cells
pub type Frame = [f64; CHANNEL_COUNT];

/// Sensor channel, in model order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Bearing/housing temperature
    Temperature,
    /// Vibration amplitude
    Vibration,
    /// Shaft speed
    Rpm,
    /// Ambient relative humidity
    Humidity,
}

impl Channel {
    /// All channels in model order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Temperature,
        Channel::Vibration,
        Channel::Rpm,
        Channel::Humidity,
    ];

    /// Position in a `ChannelRow`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name
    pub fn name(self) -> &'static str {
        CHANNEL_NAMES[self.index()]
    }
}

/// Severity label, ordered Normal < PreFailure < Failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Label {
    /// Healthy operation
    #[default]
    Normal = 0,
    /// Inside the degradation ramp before a failure
    PreFailure = 1,
    /// Failure event
    Failure = 2,
}

impl Label {
    /// Numeric code used in artifacts
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Normal),
            1 => Ok(Label::PreFailure),
            2 => Ok(Label::Failure),
            other => Err(format!("label {} is not one of 0, 1, 2", other)),
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.code()
    }
}

/// A validated telemetry reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Device identifier
    pub device_id: String,
    /// Device family (pump, fan, compressor, ...)
    pub device_type: String,
    /// Epoch milliseconds
    pub timestamp: Timestamp,
    /// Channel values in model order
    pub values: ChannelRow,
    /// Raw severity label, if the source provides one
    pub label: Option<Label>,
}

impl Reading {
    /// Value of one channel
    pub fn value(&self, channel: Channel) -> Option<f64> {
        self.values[channel.index()]
    }
}

/// Timestamp as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// ISO-8601 / RFC 3339 text
    Text(String),
    /// Epoch seconds, or milliseconds above 2e10
    Epoch(f64),
}

impl WireTimestamp {
    /// Epoch milliseconds
    pub fn resolve(&self) -> Result<Timestamp, SchemaError> {
        match self {
            WireTimestamp::Text(raw) => parse_timestamp(raw),
            WireTimestamp::Epoch(value) => epoch_timestamp(*value),
        }
    }
}

/// Ingest wire schema, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingPayload {
    /// Required
    pub device_id: Option<String>,
    /// Required
    pub device_type: Option<String>,
    /// Optional; defaults to the clock's "now"
    pub timestamp: Option<WireTimestamp>,
    /// Channel value; null or absent means missing
    pub temperature: Option<f64>,
    /// Channel value; null or absent means missing
    pub vibration: Option<f64>,
    /// Channel value; null or absent means missing
    pub rpm: Option<f64>,
    /// Channel value; null or absent means missing
    pub humidity: Option<f64>,
    /// Optional severity code 0, 1 or 2
    pub label: Option<i64>,
}

const PAYLOAD_FIELDS: [&str; 8] = [
    "device_id",
    "device_type",
    "timestamp",
    "temperature",
    "vibration",
    "rpm",
    "humidity",
    "label",
];

/// Decodes field by field so a wrong-typed value names its field
impl TryFrom<Value> for ReadingPayload {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(SchemaError::Malformed(format!(
                    "reading must be a JSON object, found {}",
                    kind(&other)
                )))
            }
        };

        if let Some(unknown) = fields.keys().find(|k| !PAYLOAD_FIELDS.contains(&k.as_str())) {
            return Err(SchemaError::Malformed(format!(
                "unknown field '{}', expected one of {}",
                unknown,
                PAYLOAD_FIELDS.join(", ")
            )));
        }

        let timestamp = match fields.remove("timestamp") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(WireTimestamp::Text(raw)),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(epoch) => Some(WireTimestamp::Epoch(epoch)),
                None => return Err(SchemaError::InvalidTimestamp { value: n.to_string() }),
            },
            Some(other) => return Err(SchemaError::InvalidTimestamp { value: other.to_string() }),
        };

        Ok(Self {
            device_id: text_field(&mut fields, "device_id")?,
            device_type: text_field(&mut fields, "device_type")?,
            timestamp,
            temperature: number_field(&mut fields, "temperature")?,
            vibration: number_field(&mut fields, "vibration")?,
            rpm: number_field(&mut fields, "rpm")?,
            humidity: number_field(&mut fields, "humidity")?,
            label: integer_field(&mut fields, "label")?,
        })
    }
}

impl ReadingPayload {
    /// Validate into a `Reading`, naming the first violated field
    pub fn validate(self, clock: &dyn TimeSource) -> Result<Reading, SchemaError> {
        let device_id = required_text("device_id", self.device_id)?;
        let device_type = required_text("device_type", self.device_type)?;

        let timestamp = match &self.timestamp {
            Some(wire) => wire.resolve()?,
            None => clock.now(),
        };

        let values = [
            finite("temperature", self.temperature)?,
            finite("vibration", self.vibration)?,
            finite("rpm", self.rpm)?,
            finite("humidity", self.humidity)?,
        ];

        let label = match self.label {
            None => None,
            Some(code) => {
                let code = u8::try_from(code).map_err(|_| SchemaError::InvalidField {
                    field: "label",
                    reason: format!("label {} is not one of 0, 1, 2", code),
                })?;
                Some(Label::try_from(code).map_err(|reason| SchemaError::InvalidField {
                    field: "label",
                    reason,
                })?)
            }
        };

        Ok(Reading {
            device_id,
            device_type,
            timestamp,
            values,
            label,
        })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn wrong_type(field: &'static str, expected: &str, found: &Value) -> SchemaError {
    SchemaError::InvalidField {
        field,
        reason: format!("expected {}, found {}", expected, kind(found)),
    }
}

fn text_field(fields: &mut Map<String, Value>, field: &'static str) -> Result<Option<String>, SchemaError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => Err(wrong_type(field, "a string", &other)),
    }
}

fn number_field(fields: &mut Map<String, Value>, field: &'static str) -> Result<Option<f64>, SchemaError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| wrong_type(field, "a finite number", &Value::Number(n))),
        Some(other) => Err(wrong_type(field, "a number", &other)),
    }
}

fn integer_field(fields: &mut Map<String, Value>, field: &'static str) -> Result<Option<i64>, SchemaError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(code) => Ok(Some(code)),
            None => Err(SchemaError::InvalidField {
                field,
                reason: format!("expected an integer, found {}", n),
            }),
        },
        Some(other) => Err(wrong_type(field, "an integer", &other)),
    }
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, SchemaError> {
    match value {
        None => Err(SchemaError::MissingField(field)),
        Some(text) if text.trim().is_empty() => Err(SchemaError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        }),
        Some(text) => Ok(text),
    }
}

fn finite(field: &'static str, value: Option<f64>) -> Result<Option<f64>, SchemaError> {
    match value {
        Some(v) if !v.is_finite() => Err(SchemaError::InvalidField {
            field,
            reason: format!("{} is not a finite number", v),
        }),
        other => Ok(other),
    }
}

fn decode_json(json: &str) -> Result<Value, SchemaError> {
    serde_json::from_str(json).map_err(|e| SchemaError::Malformed(e.to_string()))
}

/// Parse one reading from JSON text
pub fn parse_reading(json: &str, clock: &dyn TimeSource) -> Result<Reading, SchemaError> {
    ReadingPayload::try_from(decode_json(json)?)?.validate(clock)
}

/// Parse a JSON object or array of objects into readings.
///
/// Fails on the first invalid element and reports its index.
pub fn parse_batch(json: &str, clock: &dyn TimeSource) -> Result<Vec<Reading>, SchemaError> {
    let items = match decode_json(json)? {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => {
            return Err(SchemaError::Malformed(
                "payload must be an object or an array of objects".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            ReadingPayload::try_from(item)
                .and_then(|payload| payload.validate(clock))
                .map_err(|source| SchemaError::InBatch {
                    index,
                    source: Box::new(source),
                })
        })
        .collect()
}
