/// Outcome of offering a key to a component.
///
/// Components return this to the view that owns them, which decides what
/// an emitted event means in its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
