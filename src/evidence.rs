//! Append-only evidence log of field events.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::{Event, EventId, EventKind, NewEvent, TransformerId};
use crate::error::{GridError, Result};

#[derive(Debug, Default)]
struct EventLog {
    events: Vec<Event>,
    index: HashMap<EventId, usize>,
}

/// Event store queryable by transformer and time window.
///
/// Events are never removed; the only mutation is the one-way `processed` flag.
#[derive(Debug, Default)]
pub struct EvidenceStore {
    log: RwLock<EventLog>,
}

impl EvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an event.
    pub fn record(&self, new: NewEvent) -> Result<EventId> {
        let timestamp = new
            .timestamp
            .ok_or_else(|| GridError::validation("event timestamp is required"))?;
        let kind = new.payload.kind();
        if kind.is_meter_sourced() && new.meter_ref.is_none() && new.transformer_ref.is_none() {
            return Err(GridError::validation(format!(
                "{kind} event must reference a meter or a transformer"
            )));
        }
        if kind == EventKind::Telemetry && new.transformer_ref.is_none() {
            return Err(GridError::validation("TELEMETRY event must reference a transformer"));
        }
        new.payload.validate()?;

        let event = Event {
            id: EventId::generate(),
            timestamp,
            meter_ref: new.meter_ref,
            transformer_ref: new.transformer_ref,
            payload: new.payload,
            processed: false,
        };
        let id = event.id.clone();

        let mut log = self.log.write();
        let position = log.events.len();
        log.index.insert(id.clone(), position);
        log.events.push(event);
        Ok(id)
    }

    pub fn get(&self, id: &EventId) -> Option<Event> {
        let log = self.log.read();
        log.index.get(id).map(|&i| log.events[i].clone())
    }

    /// Events for `transformer` of the given kinds in `(since, until]`, oldest
    /// first. Events dated after `until` stay out until the clock reaches them.
    pub fn window(
        &self,
        transformer: &TransformerId,
        kinds: &[EventKind],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Vec<Event> {
        let log = self.log.read();
        let mut events: Vec<Event> = log
            .events
            .iter()
            .filter(|e| e.transformer_ref.as_ref() == Some(transformer))
            .filter(|e| kinds.contains(&e.kind()))
            .filter(|e| e.timestamp > since && e.timestamp <= until)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        events
    }

    /// Idempotent; returns the event as stored.
    pub fn mark_processed(&self, id: &EventId) -> Result<Event> {
        let mut log = self.log.write();
        let position = *log
            .index
            .get(id)
            .ok_or_else(|| GridError::not_found("Event", id))?;
        let event = &mut log.events[position];
        event.processed = true;
        Ok(event.clone())
    }

    /// Most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Event> {
        let log = self.log.read();
        let mut events: Vec<Event> = log.events.clone();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit);
        events
    }

    pub fn len(&self) -> usize {
        self.log.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventPayload, MeterId};
    use chrono::Duration;

    fn gasp(meter: &str, transformer: &str, at: DateTime<Utc>) -> NewEvent {
        let mut new = NewEvent::from_meter(meter, EventPayload::LastGasp).at(at);
        new.transformer_ref = Some(TransformerId::new(transformer));
        new
    }

    #[test]
    fn test_record_requires_timestamp() {
        let store = EvidenceStore::new();
        let new = NewEvent::from_meter("M1", EventPayload::LastGasp);
        assert!(matches!(store.record(new), Err(GridError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_record_requires_a_reference() {
        let store = EvidenceStore::new();
        let new = NewEvent {
            timestamp: Some(Utc::now()),
            meter_ref: None,
            transformer_ref: None,
            payload: EventPayload::LastGasp,
        };
        assert!(matches!(store.record(new), Err(GridError::Validation(_))));

        let telemetry = NewEvent::from_meter(
            "M1",
            EventPayload::Telemetry {
                current_a: 80.0,
                status: Default::default(),
            },
        )
        .at(Utc::now());
        assert!(store.record(telemetry).is_err());

        let telemetry = NewEvent::from_transformer(
            "T1",
            EventPayload::Telemetry {
                current_a: 80.0,
                status: Default::default(),
            },
        )
        .at(Utc::now());
        let id = store.record(telemetry).unwrap();
        assert_eq!(store.get(&id).unwrap().kind(), EventKind::Telemetry);
    }

    #[test]
    fn test_window_is_strict_and_sorted() {
        let store = EvidenceStore::new();
        let now = Utc::now();
        let since = now - Duration::seconds(30);

        store.record(gasp("M1", "T1", now - Duration::seconds(1))).unwrap();
        store.record(gasp("M2", "T1", now - Duration::seconds(20))).unwrap();
        store.record(gasp("M3", "T1", since)).unwrap();
        store.record(gasp("M4", "T1", now - Duration::seconds(45))).unwrap();
        store.record(gasp("M5", "T2", now)).unwrap();
        store
            .record(
                NewEvent::from_meter("M6", EventPayload::PhaseLoss { phases: vec![] })
                    .at(now),
            )
            .unwrap();

        let window = store.window(&TransformerId::new("T1"), &EventKind::FAULT_EVIDENCE, since, now);
        let meters: Vec<_> = window.iter().filter_map(|e| e.meter_ref.clone()).collect();
        assert_eq!(meters, vec![MeterId::new("M2"), MeterId::new("M1")]);

        let only_sags = store.window(&TransformerId::new("T1"), &[EventKind::VoltageSag], since, now);
        assert!(only_sags.is_empty());
    }

    #[test]
    fn test_window_excludes_future_dated_events() {
        let store = EvidenceStore::new();
        let now = Utc::now();
        let since = now - Duration::seconds(30);

        store.record(gasp("M1", "T1", now)).unwrap();
        store.record(gasp("M2", "T1", now + Duration::seconds(1))).unwrap();
        store.record(gasp("M3", "T1", now + Duration::days(1))).unwrap();

        let window = store.window(&TransformerId::new("T1"), &EventKind::FAULT_EVIDENCE, since, now);
        let meters: Vec<_> = window.iter().filter_map(|e| e.meter_ref.clone()).collect();
        assert_eq!(meters, vec![MeterId::new("M1")]);

        let later = now + Duration::days(1);
        let window = store.window(
            &TransformerId::new("T1"),
            &EventKind::FAULT_EVIDENCE,
            later - Duration::seconds(30),
            later,
        );
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].meter_ref, Some(MeterId::new("M3")));
    }

    #[test]
    fn test_mark_processed_is_idempotent() {
        let store = EvidenceStore::new();
        let id = store.record(gasp("M1", "T1", Utc::now())).unwrap();
        assert!(!store.get(&id).unwrap().processed);

        assert!(store.mark_processed(&id).unwrap().processed);
        assert!(store.mark_processed(&id).unwrap().processed);
        assert!(matches!(
            store.mark_processed(&EventId::new("nope")),
            Err(GridError::NotFound { .. })
        ));
    }

    #[test]
    fn test_recent_newest_first() {
        let store = EvidenceStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store.record(gasp(&format!("M{i}"), "T1", now - Duration::seconds(i))).unwrap();
        }
        let recent = store.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].meter_ref, Some(MeterId::new("M0")));
        assert_eq!(recent[1].meter_ref, Some(MeterId::new("M1")));
    }
}
