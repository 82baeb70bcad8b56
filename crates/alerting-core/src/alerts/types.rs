//! Alert (v1) entity definitions.
//!
//! An [`Alert`] is identified by a producer-assigned `id` that never changes. Its
//! state (`firing`, `acknowledged`, `timestamp.end`) is mutated only through the
//! methods on this type, and only the reconciliation processor decides when.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::AlertError;

/// Start and end instants of an alert.
///
/// `end` is unset while the alert is firing and set once it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// When the monitored condition started.
    #[serde(rename = "startTime")]
    pub start: DateTime<Utc>,
    /// When the condition resolved, if it has.
    #[serde(rename = "endTime", default, with = "end_time")]
    pub end: Option<DateTime<Utc>>,
}

impl Timestamp {
    /// Creates a timestamp with only a start instant.
    #[must_use]
    pub fn started_at(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }
}

/// Fields of an [`Alert`] that reconciliation compares one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertField {
    Title,
    Message,
    StartTime,
    EndTime,
    Firing,
    Acknowledged,
}

impl AlertField {
    /// Returns the field name used in diagnostics and metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Message => "message",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::Firing => "firing",
            Self::Acknowledged => "acknowledged",
        }
    }
}

impl fmt::Display for AlertField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored condition as reported by a producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Stable identity assigned by the producer.
    pub id: String,
    /// Short human-readable title. Empty when the producer omits it.
    #[serde(default)]
    pub title: String,
    /// Descriptive message. Empty when the producer omits it.
    #[serde(default)]
    pub message: String,
    /// Start and end instants.
    pub timestamp: Timestamp,
    /// Whether the condition is currently active.
    pub firing: bool,
    /// Whether an operator has acknowledged the alert.
    #[serde(default)]
    pub acknowledged: bool,
}

impl Alert {
    /// Creates a new, unacknowledged alert with no end time.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        start: DateTime<Utc>,
        firing: bool,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            timestamp: Timestamp::started_at(start),
            firing,
            acknowledged: false,
        }
    }

    /// Decodes an alert from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Decode`] if the payload is not a valid v1 alert.
    pub fn from_bytes(data: &[u8]) -> Result<Self, AlertError> {
        serde_json::from_slice(data).map_err(AlertError::Decode)
    }

    /// Decodes an alert from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Decode`] if the string is not a valid v1 alert.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(raw: &str) -> Result<Self, AlertError> {
        serde_json::from_str(raw).map_err(AlertError::Decode)
    }

    /// Encodes the alert to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AlertError> {
        serde_json::to_vec(self).map_err(AlertError::Encode)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_firing(&self) -> bool {
        self.firing
    }

    /// Marks the alert resolved at `end`.
    pub fn resolve(&mut self, end: DateTime<Utc>) {
        self.firing = false;
        self.timestamp.end = Some(end);
    }

    /// Marks the alert firing again. Clears any end time.
    pub fn fire(&mut self) {
        self.firing = true;
        self.timestamp.end = None;
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }

    /// Returns `true` if `self` starts strictly after `other`.
    #[must_use]
    pub fn starts_later_than(&self, other: &Self) -> bool {
        self.timestamp.start > other.timestamp.start
    }

    /// Lists the fields whose values differ between `self` and `other`.
    ///
    /// The identity is not compared. The order of the result is fixed.
    #[must_use]
    pub fn differing_fields(&self, other: &Self) -> Vec<AlertField> {
        let mut fields = Vec::new();
        if self.title != other.title {
            fields.push(AlertField::Title);
        }
        if self.message != other.message {
            fields.push(AlertField::Message);
        }
        if self.timestamp.start != other.timestamp.start {
            fields.push(AlertField::StartTime);
        }
        if self.timestamp.end != other.timestamp.end {
            fields.push(AlertField::EndTime);
        }
        if self.firing != other.firing {
            fields.push(AlertField::Firing);
        }
        if self.acknowledged != other.acknowledged {
            fields.push(AlertField::Acknowledged);
        }
        fields
    }

    /// Field-wise equality including the identity.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id && self.differing_fields(other).is_empty()
    }

    /// Fixed-order string form used for content hashing.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let start = self.timestamp.start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = match self.timestamp.end {
            Some(end) => end.to_rfc3339_opts(SecondsFormat::Secs, true),
            None => end_time::UNSET.to_string(),
        };
        format!(
            r#"{{"id": "{}", "title": "{}", "message": "{}", "firing": "{}", "acknowledged": "{}", "timestamp": {{"startTime": "{start}", "endTime": "{end}"}}}}"#,
            self.id, self.title, self.message, self.firing, self.acknowledged,
        )
    }

    /// SHA-256 of [`canonical_string`](Self::canonical_string), hex encoded.
    #[must_use]
    pub fn hash(&self) -> String {
        let digest = Sha256::digest(self.canonical_string().as_bytes());
        hex::encode(digest)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alert {}: {}: {}",
            self.id,
            self.message,
            self.timestamp.start.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Wire encoding for the optional end instant.
///
/// Producers write an unset end as the zero instant; `null` and a missing field
/// are accepted too.
mod end_time {
    use chrono::{DateTime, Datelike, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) const UNSET: &str = "0001-01-01T00:00:00Z";

    pub(super) fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(end) => serializer.serialize_some(end),
            None => serializer.serialize_str(UNSET),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(value.filter(|end| end.year() > 1))
    }
}
