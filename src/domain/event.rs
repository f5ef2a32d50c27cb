use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, MeterId, Phase, TransformerId, TransformerStatus};
use crate::error::{GridError, Result};

/// Kind of field event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    LastGasp,
    VoltageSag,
    PhaseLoss,
    Telemetry,
}

impl EventKind {
    /// Kinds that count as fault evidence in a scoring window
    pub const FAULT_EVIDENCE: [EventKind; 3] =
        [EventKind::LastGasp, EventKind::VoltageSag, EventKind::PhaseLoss];

    /// Reported by a customer meter (AMI) rather than by SCADA
    pub fn is_meter_sourced(self) -> bool {
        !matches!(self, EventKind::Telemetry)
    }

    /// Whether arrival of this kind kicks off a scoring pass
    pub fn triggers_scoring(self) -> bool {
        matches!(self, EventKind::LastGasp | EventKind::VoltageSag)
    }
}

/// Kind-specific event payload.
///
/// The tag doubles as the event kind, so a payload can never disagree with
/// the kind it was filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    LastGasp,
    VoltageSag {
        /// Voltage change in volts; sags are reported as negative deltas
        delta_voltage: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<Phase>,
    },
    PhaseLoss {
        #[serde(default)]
        phases: Vec<Phase>,
    },
    Telemetry {
        /// RMS current at the transformer LT terminals
        current_a: f64,
        status: TransformerStatus,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::LastGasp => EventKind::LastGasp,
            EventPayload::VoltageSag { .. } => EventKind::VoltageSag,
            EventPayload::PhaseLoss { .. } => EventKind::PhaseLoss,
            EventPayload::Telemetry { .. } => EventKind::Telemetry,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            EventPayload::VoltageSag { delta_voltage, .. } if !delta_voltage.is_finite() => Err(
                GridError::validation(format!("delta_voltage must be finite, got {delta_voltage}")),
            ),
            EventPayload::Telemetry { current_a, .. } if !current_a.is_finite() || *current_a < 0.0 => {
                Err(GridError::validation(format!(
                    "current_a must be a non-negative number, got {current_a}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Immutable field fact. Only `processed` flips, once, after pipeline handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_ref: Option<MeterId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformer_ref: Option<TransformerId>,
    pub payload: EventPayload,
    pub processed: bool,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Depth of a voltage sag in volts. A positive delta is a swell and has
    /// no depth.
    pub fn sag_depth(&self) -> Option<f64> {
        match self.payload {
            EventPayload::VoltageSag { delta_voltage, .. } => Some((-delta_voltage).max(0.0)),
            _ => None,
        }
    }
}

/// Inbound event as submitted by a field-protocol adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meter_ref: Option<MeterId>,
    #[serde(default)]
    pub transformer_ref: Option<TransformerId>,
    pub payload: EventPayload,
}

impl NewEvent {
    pub fn from_meter(meter: impl Into<MeterId>, payload: EventPayload) -> Self {
        Self {
            timestamp: None,
            meter_ref: Some(meter.into()),
            transformer_ref: None,
            payload,
        }
    }

    pub fn from_transformer(transformer: impl Into<TransformerId>, payload: EventPayload) -> Self {
        Self {
            timestamp: None,
            meter_ref: None,
            transformer_ref: Some(transformer.into()),
            payload,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_tag() {
        let payload: EventPayload =
            serde_json::from_str(r#"{"kind":"VOLTAGE_SAG","delta_voltage":-18.5,"phase":"Y"}"#)
                .unwrap();
        assert_eq!(payload.kind(), EventKind::VoltageSag);

        let payload: EventPayload = serde_json::from_str(r#"{"kind":"LAST_GASP"}"#).unwrap();
        assert_eq!(payload, EventPayload::LastGasp);
    }

    #[test]
    fn test_missing_payload_field_rejected() {
        let result = serde_json::from_str::<EventPayload>(r#"{"kind":"VOLTAGE_SAG"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<EventPayload>(r#"{"kind":"BROWNOUT"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_validation() {
        let sag = EventPayload::VoltageSag {
            delta_voltage: f64::NAN,
            phase: None,
        };
        assert!(matches!(sag.validate(), Err(GridError::Validation(_))));

        let telemetry = EventPayload::Telemetry {
            current_a: -3.0,
            status: TransformerStatus::Online,
        };
        assert!(telemetry.validate().is_err());

        let telemetry = EventPayload::Telemetry {
            current_a: 96.2,
            status: TransformerStatus::Online,
        };
        assert!(telemetry.validate().is_ok());
    }

    #[test]
    fn test_sag_depth_counts_only_drops() {
        let sag = |delta_voltage| Event {
            id: EventId::new("ev-1"),
            timestamp: Utc::now(),
            meter_ref: Some(MeterId::new("M1")),
            transformer_ref: None,
            payload: EventPayload::VoltageSag {
                delta_voltage,
                phase: None,
            },
            processed: false,
        };
        assert_eq!(sag(-20.0).sag_depth(), Some(20.0));
        assert_eq!(sag(20.0).sag_depth(), Some(0.0));
    }

    #[test]
    fn test_kind_classification() {
        assert!(EventKind::LastGasp.triggers_scoring());
        assert!(EventKind::VoltageSag.triggers_scoring());
        assert!(!EventKind::PhaseLoss.triggers_scoring());
        assert!(!EventKind::Telemetry.is_meter_sourced());
        assert_eq!(EventKind::VoltageSag.to_string(), "VOLTAGE_SAG");
    }
}
