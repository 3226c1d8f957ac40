use bridge_traits::{ProgressReporter, RemoteProgress};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};

/// Forwards backend progress to the event bus, tagged with the session and
/// the phase it belongs to.
pub struct SessionProgress {
    event_bus: EventBus,
    session_id: String,
    phase: &'static str,
}

impl SessionProgress {
    pub fn new(event_bus: EventBus, session_id: impl Into<String>, phase: &'static str) -> Self {
        Self {
            event_bus,
            session_id: session_id.into(),
            phase,
        }
    }
}

impl ProgressReporter for SessionProgress {
    fn report(&self, progress: RemoteProgress) {
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Progress {
                session_id: self.session_id.clone(),
                phase: self.phase.to_string(),
                progress,
            }))
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_is_tagged() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let reporter = SessionProgress::new(bus, "s1", "full_download");

        reporter.report(RemoteProgress::Transfer {
            transferred: 10,
            total: 100,
        });

        match rx.recv().await.unwrap() {
            CoreEvent::Sync(SyncEvent::Progress {
                session_id, phase, ..
            }) => {
                assert_eq!(session_id, "s1");
                assert_eq!(phase, "full_download");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
