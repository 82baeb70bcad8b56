//! Extended (v2) alert entity.
//!
//! Unlike [`Alert`](super::Alert), the v2 entity keeps its fields private and
//! exposes controlled mutators. Labels and annotations live in ordered maps so the
//! serialized form and content hash do not depend on insertion order.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::AlertError;

/// Severity level of a v2 alert. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Requires immediate attention.
    Critical,
    /// Potential issue.
    Warning,
    /// Informational.
    Info,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl FromStr for Severity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(AlertError::InvalidSeverity(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a v2 alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Active,
    Resolved,
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Resolved => f.write_str("resolved"),
        }
    }
}

/// A follow-up action attached to an alert (ticket, callout, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_create: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub escalation_policy: String,
}

impl Action {
    #[must_use]
    pub fn new(action_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            target: target.into(),
            auto_create: false,
            escalation_policy: String::new(),
        }
    }

    #[must_use]
    pub fn auto_create(mut self) -> Self {
        self.auto_create = true;
        self
    }

    #[must_use]
    pub fn with_escalation_policy(mut self, policy: impl Into<String>) -> Self {
        self.escalation_policy = policy.into();
        self
    }
}

/// Exact v2 wire form. `state` is not part of it.
#[derive(Serialize, Deserialize)]
struct AlertV2Wire {
    id: String,
    source: String,
    received_at: DateTime<Utc>,
    severity: String,
    #[serde(rename = "type")]
    alert_type: String,
    message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
    deduplication_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<Action>,
}

/// Extended alert with routing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertV2 {
    id: String,
    source: String,
    received_at: DateTime<Utc>,
    severity: Severity,
    alert_type: String,
    message: String,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    deduplication_key: String,
    correlation_id: Option<String>,
    actions: Vec<Action>,
    state: AlertState,
}

impl AlertV2 {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        severity: Severity,
        alert_type: impl Into<String>,
        message: impl Into<String>,
        deduplication_key: impl Into<String>,
        received_at: DateTime<Utc>,
        state: AlertState,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            received_at,
            severity,
            alert_type: alert_type.into(),
            message: message.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            deduplication_key: deduplication_key.into(),
            correlation_id: None,
            actions: Vec::new(),
            state,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn alert_type(&self) -> &str {
        &self.alert_type
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    #[must_use]
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    #[must_use]
    pub fn deduplication_key(&self) -> &str {
        &self.deduplication_key
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Sets the severity from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidSeverity`] unless `severity` is `critical`,
    /// `warning` or `info`. The current severity is left untouched on error.
    pub fn set_severity(&mut self, severity: &str) -> Result<(), AlertError> {
        self.severity = severity.parse()?;
        Ok(())
    }

    /// Adds a label. A duplicate key overwrites the previous value.
    pub fn add_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Adds an annotation. A duplicate key overwrites the previous value.
    pub fn add_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Returns a copy with the label added, leaving `self` untouched.
    #[must_use]
    pub fn with_label(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.add_label(key, value);
        next
    }

    /// Returns a copy with the annotation added, leaving `self` untouched.
    #[must_use]
    pub fn with_annotation(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.add_annotation(key, value);
        next
    }

    /// Appends an action. Actions are never removed or reordered.
    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Links this alert to an incident.
    pub fn set_correlation_id(&mut self, correlation_id: impl Into<String>) {
        self.correlation_id = Some(correlation_id.into());
    }

    pub fn resolve(&mut self) {
        self.state = AlertState::Resolved;
    }

    fn to_wire(&self) -> AlertV2Wire {
        AlertV2Wire {
            id: self.id.clone(),
            source: self.source.clone(),
            received_at: self.received_at,
            severity: self.severity.as_str().to_string(),
            alert_type: self.alert_type.clone(),
            message: self.message.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            deduplication_key: self.deduplication_key.clone(),
            correlation_id: self.correlation_id.clone(),
            actions: self.actions.clone(),
        }
    }

    /// Encodes the alert to the v2 JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AlertError> {
        serde_json::to_vec(&self.to_wire()).map_err(AlertError::Encode)
    }

    /// Decodes a v2 alert. The state is not on the wire and starts as active.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Decode`] for malformed JSON and
    /// [`AlertError::InvalidSeverity`] for an unknown severity.
    pub fn from_bytes(data: &[u8]) -> Result<Self, AlertError> {
        let wire: AlertV2Wire = serde_json::from_slice(data).map_err(AlertError::Decode)?;
        Ok(Self {
            severity: wire.severity.parse()?,
            id: wire.id,
            source: wire.source,
            received_at: wire.received_at,
            alert_type: wire.alert_type,
            message: wire.message,
            labels: wire.labels,
            annotations: wire.annotations,
            deduplication_key: wire.deduplication_key,
            correlation_id: wire.correlation_id,
            actions: wire.actions,
            state: AlertState::Active,
        })
    }

    /// SHA-256 over the wire encoding, hex encoded.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::Encode`] if serialization fails.
    pub fn hash(&self) -> Result<String, AlertError> {
        let bytes = self.to_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
