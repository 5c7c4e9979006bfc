use std::fmt;

use crate::error::PulseResult;
use crate::event::Event;

use super::topic::Topic;

/// Receives events for the topics it was registered on.
///
/// `notify` runs synchronously inside `Broker::publish` and may publish
/// further events. Implementations must not hold their own locks across such
/// nested publishes.
pub trait Subscriber: Send + Sync {
    /// Handles one event published on `topic`.
    fn notify(&self, topic: &Topic, event: &Event) -> PulseResult<()>;

    /// Name used in logs when delivery fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapts a closure taking only the payload into a `Subscriber`.
pub struct FnSubscriber<F> {
    name: String,
    f: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&Event) + Send + Sync,
{
    /// Wraps `f` under a log-friendly name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn notify(&self, _topic: &Topic, event: &Event) -> PulseResult<()> {
        (self.f)(event);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnSubscriber<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubscriber").field("name", &self.name).finish_non_exhaustive()
    }
}
