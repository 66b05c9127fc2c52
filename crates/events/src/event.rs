use serde::Serialize;

/// A domain-agnostic notification event.
///
/// Events are:
/// - **immutable** (treat them as facts about a committed change)
/// - **ephemeral** (never persisted; they exist only long enough to be published)
/// - **self-describing** on the wire (the serialized form carries its own type tag)
pub trait Event: Serialize + Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event type identifier (e.g. "CREATE").
    fn event_type(&self) -> &'static str;
}

/// Serialize an event to its canonical JSON wire form.
pub fn encode<E: Event>(event: &E) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
