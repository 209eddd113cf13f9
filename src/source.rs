//! Contracts between the engine and the remote feed.

use crate::error::FetchError;

/// An event delivered by the remote feed.
///
/// The engine only needs the sequence number, which it uses as the poll cursor.
/// Events are cloned once per matching handler.
pub trait Event: Clone + Send + 'static {
    /// Monotonically assigned sequence number of this event.
    fn sequence(&self) -> i64;
}

/// Fetches the next batch of events at or after `cursor`.
///
/// Implementations are called again immediately after a failure, so they must
/// tolerate back-to-back calls. Any closure with the matching signature works:
///
/// ```
/// use botloop::{Event, FetchError, UpdateSource};
///
/// #[derive(Clone)]
/// struct Tick(i64);
///
/// impl Event for Tick {
///     fn sequence(&self) -> i64 {
///         self.0
///     }
/// }
///
/// let source = |cursor: i64| -> Result<Vec<Tick>, FetchError> { Ok(vec![Tick(cursor)]) };
/// assert_eq!(source.fetch(3).unwrap()[0].sequence(), 3);
/// ```
pub trait UpdateSource<E>: Send + Sync {
    /// Returns the events with sequence numbers at or after `cursor`.
    fn fetch(&self, cursor: i64) -> Result<Vec<E>, FetchError>;
}

impl<E, F> UpdateSource<E> for F
where
    F: Fn(i64) -> Result<Vec<E>, FetchError> + Send + Sync,
{
    fn fetch(&self, cursor: i64) -> Result<Vec<E>, FetchError> {
        self(cursor)
    }
}
