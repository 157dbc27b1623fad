//! Analytics sink.
//!
//! Product analytics are best-effort. Services hand events to an
//! [`AnalyticsSink`] and never wait on or fail because of it.

use async_trait::async_trait;
use rtr_db::entities::{BattleType, Choice};
use std::sync::Arc;
use tracing::info;

/// Events reported to analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    /// A battle was created.
    BattleCreated {
        battle_id: String,
        battle_type: BattleType,
        has_deadline: bool,
    },
    /// A vote was recorded.
    VoteCast {
        battle_id: String,
        choice: Choice,
        authenticated: bool,
    },
}

impl AnalyticsEvent {
    /// Event name as reported to analytics backends.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BattleCreated { .. } => "battle_created",
            Self::VoteCast { .. } => "vote_cast",
        }
    }
}

/// Receives analytics events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Record an event. Implementations swallow their own failures.
    async fn record(&self, event: AnalyticsEvent);
}

/// Shared analytics sink handle.
pub type AnalyticsSinkService = Arc<dyn AnalyticsSink>;

/// Drops every event.
#[derive(Clone, Default)]
pub struct NoOpAnalyticsSink;

#[async_trait]
impl AnalyticsSink for NoOpAnalyticsSink {
    async fn record(&self, _event: AnalyticsEvent) {}
}

/// Writes events to the `analytics` tracing target.
#[derive(Clone, Default)]
pub struct TracingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for TracingAnalyticsSink {
    async fn record(&self, event: AnalyticsEvent) {
        match &event {
            AnalyticsEvent::BattleCreated {
                battle_id,
                battle_type,
                has_deadline,
            } => info!(
                target: "analytics",
                event = event.name(),
                battle_id = %battle_id,
                battle_type = %battle_type,
                has_deadline = has_deadline,
            ),
            AnalyticsEvent::VoteCast {
                battle_id,
                choice,
                authenticated,
            } => info!(
                target: "analytics",
                event = event.name(),
                battle_id = %battle_id,
                choice = %choice,
                authenticated = authenticated,
            ),
        }
    }
}

/// Hand `event` to `sink` on a background task.
pub fn emit(sink: &AnalyticsSinkService, event: AnalyticsEvent) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        sink.record(event).await;
    });
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects events for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<AnalyticsEvent>>,
    }

    #[async_trait]
    impl AnalyticsSink for RecordingSink {
        async fn record(&self, event: AnalyticsEvent) {
            self.events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn test_event_names() {
        let created = AnalyticsEvent::BattleCreated {
            battle_id: "b1".to_string(),
            battle_type: BattleType::Movie,
            has_deadline: true,
        };
        let voted = AnalyticsEvent::VoteCast {
            battle_id: "b1".to_string(),
            choice: Choice::A,
            authenticated: false,
        };
        assert_eq!(created.name(), "battle_created");
        assert_eq!(voted.name(), "vote_cast");
    }

    #[tokio::test]
    async fn test_emit_delivers_in_background() {
        let recorder = Arc::new(RecordingSink::default());
        let sink: AnalyticsSinkService = recorder.clone();

        emit(
            &sink,
            AnalyticsEvent::VoteCast {
                battle_id: "b1".to_string(),
                choice: Choice::B,
                authenticated: true,
            },
        );
        tokio::task::yield_now().await;

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "vote_cast");
    }

    #[tokio::test]
    async fn test_noop_and_tracing_sinks_accept_events() {
        let event = AnalyticsEvent::BattleCreated {
            battle_id: "b1".to_string(),
            battle_type: BattleType::Custom,
            has_deadline: false,
        };
        NoOpAnalyticsSink.record(event.clone()).await;
        TracingAnalyticsSink.record(event).await;
    }
}
