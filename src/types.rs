/// Number of positional fields carried by a game event payload.
pub const EVENT_FIELD_COUNT: usize = 5;

/// Separator between the fields of a game event payload.
pub const FIELD_DELIMITER: char = '|';

/// Identification of a stream visible on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub name: String,
    /// Content type, e.g. `Markers`.
    pub stream_type: String,
    pub source_id: String,
    pub channel_count: u32,
    pub hostname: String,
}

impl StreamDescriptor {
    /// Descriptor for a single-channel string marker stream.
    pub fn markers(name: &str, source_id: &str) -> Self {
        Self {
            name: name.to_string(),
            stream_type: "Markers".to_string(),
            source_id: source_id.to_string(),
            channel_count: 1,
            hostname: String::new(),
        }
    }
}

/// One sample pulled from an inlet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Content of the first string channel.
    pub payload: String,
    /// Capture time assigned by the transport, in seconds.
    pub timestamp: f64,
}

/// A game event decoded from a `scene|user|event|context|value` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    pub scene_name: String,
    pub user_id: String,
    pub event_type: String,
    pub context: String,
    pub value: String,
}

impl EventRecord {
    /// Split a payload positionally. Missing trailing fields become empty
    /// strings and anything after the fifth field is dropped; this never fails.
    pub fn parse(payload: &str) -> Self {
        let mut parts = payload.split(FIELD_DELIMITER);
        let mut next = || parts.next().unwrap_or_default().to_string();

        EventRecord {
            scene_name: next(),
            user_id: next(),
            event_type: next(),
            context: next(),
            value: next(),
        }
    }

    /// Encode back into the delimited wire form.
    pub fn to_payload(&self) -> String {
        self.fields().join("|")
    }

    pub fn fields(&self) -> [&str; EVENT_FIELD_COUNT] {
        [
            self.scene_name.as_str(),
            self.user_id.as_str(),
            self.event_type.as_str(),
            self.context.as_str(),
            self.value.as_str(),
        ]
    }
}

/// A single persisted CSV row.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRow {
    /// `lsl_timestamp, payload`
    Raw { timestamp: f64, payload: String },
    /// `timestamp_unix, scene_name, user_id, event_type, context, value`
    Event { timestamp: f64, record: EventRecord },
}

impl LogRow {
    fn timestamp(&self) -> f64 {
        match self {
            LogRow::Raw { timestamp, .. } | LogRow::Event { timestamp, .. } => *timestamp,
        }
    }

    /// Cell values in column order.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![format_timestamp(self.timestamp())];
        match self {
            LogRow::Raw { payload, .. } => cells.push(payload.clone()),
            LogRow::Event { record, .. } => {
                cells.extend(record.fields().iter().map(|f| f.to_string()))
            }
        }
        cells
    }
}

/// Shortest round-trip rendering that always keeps a fractional part (`3.0`, `1234.5678`).
pub fn format_timestamp(ts: f64) -> String {
    format!("{:?}", ts)
}
