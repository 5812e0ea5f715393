//! Core traits for state machines.

use chrono::{DateTime, Utc};

/// A state machine that processes events.
///
/// Implementations are:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Given the same state, event and time, always returns
///   the same actions
/// - **No I/O**: All I/O is performed by the runner via the returned actions
///
/// # Example
///
/// ```ignore
/// controller.set_time(Utc::now());
/// for action in controller.handle(ControlEvent::Tick) {
///     runner.execute(action).await;
/// }
/// ```
pub trait StateMachine {
    type Event;
    type Action;

    /// Process an event, returning actions to perform.
    fn handle(&mut self, event: Self::Event) -> Vec<Self::Action>;

    /// Set the current wall-clock time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: DateTime<Utc>);

    /// Get the time that was last set via `set_time()`.
    fn now(&self) -> DateTime<Utc>;
}
