#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Current notification envelope version.
pub const PROTOCOL_VERSION: u16 = 1;
/// Maximum allowed notification payload bytes.
pub const MAX_EVENT_BYTES: usize = 16 * 1024;

/// Versioned notification envelope. All events use `{ v, t, d }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope<T> {
    pub v: u16,
    pub t: EventType,
    pub d: T,
}

/// Event type identifier with a strict character allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(String);

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventType {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_event_type(&value)?;
        Ok(Self(value))
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.0
    }
}

/// Events pushed to a live connection by the rooms surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomNotification {
    /// The recipient's effective permissions inside a room changed.
    PermissionsChanged { room_id: String },
    /// The recipient's room was suspended by platform moderation.
    RoomSuspended { room_id: String, notice: String },
    /// The recipient's room was terminated by platform moderation.
    RoomTerminated { room_id: String, notice: String },
    /// The server is about to close this connection.
    ConnectionClose,
}

impl RoomNotification {
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PermissionsChanged { .. } => "room.permissions_changed",
            Self::RoomSuspended { .. } => "room.suspended",
            Self::RoomTerminated { .. } => "room.terminated",
            Self::ConnectionClose => "connection.close",
        }
    }
}

/// Wrap a notification in the versioned envelope.
///
/// # Errors
/// Returns [`ProtocolError`] if the event type fails validation (a
/// programming error for the built-in kinds, surfaced rather than paniced).
pub fn envelope_for(
    notification: &RoomNotification,
) -> Result<Envelope<RoomNotification>, ProtocolError> {
    Ok(Envelope {
        v: PROTOCOL_VERSION,
        t: EventType::try_from(notification.event_type().to_owned())?,
        d: notification.clone(),
    })
}

/// Parse and validate an incoming envelope at the network boundary.
///
/// # Errors
/// Returns [`ProtocolError`] if the payload exceeds limits, is malformed
/// JSON, contains an unsupported version, or has an invalid event type.
pub fn parse_envelope(input: &[u8]) -> Result<Envelope<serde_json::Value>, ProtocolError> {
    if input.len() > MAX_EVENT_BYTES {
        return Err(ProtocolError::OversizedPayload {
            max: MAX_EVENT_BYTES,
            actual: input.len(),
        });
    }

    let envelope: Envelope<serde_json::Value> = serde_json::from_slice(input)?;
    if envelope.v != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion {
            expected: PROTOCOL_VERSION,
            actual: envelope.v,
        });
    }

    Ok(envelope)
}

pub(crate) fn validate_event_type(value: &str) -> Result<(), ProtocolError> {
    const MAX_LEN: usize = 64;

    if value.is_empty() || value.len() > MAX_LEN {
        return Err(ProtocolError::InvalidEventType);
    }

    if value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
    {
        return Ok(());
    }

    Err(ProtocolError::InvalidEventType)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("payload exceeds max size: max={max} bytes actual={actual} bytes")]
    OversizedPayload { max: usize, actual: usize },
    #[error("unsupported envelope version: expected={expected} actual={actual}")]
    UnsupportedVersion { expected: u16, actual: u16 },
    #[error("invalid event type")]
    InvalidEventType,
    #[error("invalid json payload")]
    InvalidJson,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(_: serde_json::Error) -> Self {
        Self::InvalidJson
    }
}
