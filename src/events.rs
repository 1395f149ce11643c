use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::DetectedIngredient;
use crate::scanner::ScannerStatus;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScannerEvent {
    StatusChanged {
        status: ScannerStatus,
    },
    Detections {
        ingredients: Vec<DetectedIngredient>,
    },
    OverlayCleared,
    #[serde(rename_all = "camelCase")]
    RecommendationsUpdated {
        total: usize,
        added: usize,
    },
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

/// Fan-out of scanner and recommendation events to whatever renders them.
/// Emitting never fails: events without subscribers are dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScannerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ScannerEvent) {
        let _ = self.sender.send(event);
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ScannerEvent::Notice {
            level,
            message: message.into(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_serialize_with_a_type_tag() {
        let event = ScannerEvent::Notice {
            level: NoticeLevel::Warning,
            message: "Scan failed. Retrying...".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "notice");
        assert_eq!(json["level"], "warning");
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.notify(NoticeLevel::Info, "Camera stopped");

        let mut rx = bus.subscribe();
        bus.emit(ScannerEvent::OverlayCleared);
        assert_eq!(rx.try_recv().unwrap(), ScannerEvent::OverlayCleared);
    }
}
