use serde::Serialize;
use tokio::sync::broadcast;
use crate::models::fixture::Fixture;
use crate::models::news::NewsItem;

/// Pushed to every connected live client.
///
/// Serialized as `{"event": "result", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum LiveEvent {
    /// A result was created or changed, including by placeholder resolution.
    Result(Fixture),
    /// A result was deleted; carries the fixture as it was last stored.
    Remove(Fixture),
    News(NewsItem),
}

impl LiveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Result(_) => "result",
            LiveEvent::Remove(_) => "remove",
            LiveEvent::News(_) => "news",
        }
    }
}

pub type LiveBus = broadcast::Sender<LiveEvent>;

pub fn init_live_bus() -> (LiveBus, broadcast::Receiver<LiveEvent>) {
    broadcast::channel(1024)
}

/// Fire and forget: having no listeners is not an error.
pub fn publish(bus: &LiveBus, event: LiveEvent) {
    let name = event.name();
    match bus.send(event) {
        Ok(receivers) => tracing::debug!(event = name, receivers, "live event published"),
        Err(_) => tracing::trace!(event = name, "live event dropped, no listeners"),
    }
}

pub fn publish_results<'a>(bus: &LiveBus, fixtures: impl IntoIterator<Item = &'a Fixture>) {
    for fixture in fixtures {
        publish(bus, LiveEvent::Result(fixture.clone()));
    }
}
