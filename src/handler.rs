//! Per-message callbacks for tick-driven consumers.

/// Reacts to inbound messages delivered by [`crate::Connection::dispatch`].
///
/// Returning `Some(reply)` queues `reply` on the same connection.
///
/// # Examples
///
/// ```
/// use tickwire::MessageHandler;
///
/// struct Echo;
///
/// impl MessageHandler for Echo {
///     fn on_message(&mut self, payload: &str) -> Option<String> { Some(payload.to_owned()) }
/// }
///
/// assert_eq!(Echo.on_message("ping"), Some("ping".to_owned()));
/// ```
pub trait MessageHandler {
    /// Handle one inbound message.
    fn on_message(&mut self, payload: &str) -> Option<String>;
}

impl<F> MessageHandler for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn on_message(&mut self, payload: &str) -> Option<String> { self(payload) }
}
