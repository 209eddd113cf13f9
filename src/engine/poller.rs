use std::sync::atomic::Ordering;

use crossbeam_channel::Sender;

use crate::source::{Event, UpdateSource};

use super::{Counters, Shared};

/// Fetches batches with an advancing cursor and queues every event.
///
/// Runs until the engine is closed or the dispatch side hangs up. Fetch
/// failures leave the cursor where it is and are retried at once.
pub(super) fn poll_loop<E, S>(source: &S, tx: &Sender<E>, shared: &Shared)
where
    E: Event,
    S: UpdateSource<E> + ?Sized,
{
    let mut cursor = shared.cursor.load(Ordering::Acquire);
    let mut consecutive_failures: u64 = 0;

    tracing::debug!(cursor, "poll loop started");

    'poll: while !shared.is_closed() {
        Counters::bump(&shared.counters.fetches);

        let events = match source.fetch(cursor) {
            Ok(events) => events,
            Err(error) => {
                consecutive_failures += 1;
                Counters::bump(&shared.counters.fetch_failures);
                tracing::warn!(cursor, consecutive_failures, error = %error, "failed to fetch updates, retrying");
                continue;
            }
        };

        if consecutive_failures > 0 {
            tracing::info!(cursor, consecutive_failures, "fetching recovered");
            consecutive_failures = 0;
        }

        for event in events {
            let sequence = event.sequence();
            if sequence >= cursor {
                cursor = sequence.saturating_add(1);
                shared.publish_cursor(cursor);
            }

            if shared.is_closed() {
                break 'poll;
            }
            if tx.send(event).is_err() {
                tracing::debug!(sequence, "dispatch loop is gone, stopping poll loop");
                break 'poll;
            }
            Counters::bump(&shared.counters.events_queued);
        }
    }

    tracing::debug!(cursor, "poll loop stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::error::FetchError;

    #[derive(Debug, Clone, PartialEq)]
    struct Seq(i64);

    impl Event for Seq {
        fn sequence(&self) -> i64 {
            self.0
        }
    }

    type Script = Mutex<VecDeque<Result<Vec<Seq>, FetchError>>>;

    /// Replays scripted results, then closes the engine once the script runs out.
    struct Scripted {
        script: Script,
        cursors: Mutex<Vec<i64>>,
        shared: Arc<Shared>,
    }

    impl UpdateSource<Seq> for Scripted {
        fn fetch(&self, cursor: i64) -> Result<Vec<Seq>, FetchError> {
            self.cursors.lock().unwrap().push(cursor);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                self.shared.closed.store(true, Ordering::Release);
                Ok(Vec::new())
            })
        }
    }

    fn batch(seqs: &[i64]) -> Result<Vec<Seq>, FetchError> {
        Ok(seqs.iter().copied().map(Seq).collect())
    }

    fn run_script(script: Vec<Result<Vec<Seq>, FetchError>>) -> (Vec<Seq>, Vec<i64>, Arc<Shared>) {
        let shared = Arc::new(Shared::new(0));
        let source = Scripted {
            script: Mutex::new(script.into()),
            cursors: Mutex::new(Vec::new()),
            shared: Arc::clone(&shared),
        };
        let (tx, rx) = bounded(0);
        let collector = thread::spawn(move || rx.iter().collect::<Vec<Seq>>());

        poll_loop(&source, &tx, &shared);
        drop(tx);

        let received = collector.join().unwrap();
        let cursors = source.cursors.into_inner().unwrap();
        (received, cursors, shared)
    }

    #[test]
    fn test_cursor_holds_across_failure() {
        let (received, cursors, shared) = run_script(vec![
            batch(&[1, 2, 3]),
            Err(FetchError::network("reset")),
            batch(&[4, 5]),
        ]);

        assert_eq!(received, (1..=5).map(Seq).collect::<Vec<_>>());
        assert_eq!(&cursors[..3], &[0, 4, 4]);
        assert_eq!(shared.counters.fetch_failures.load(Ordering::Relaxed), 1);
        assert_eq!(shared.counters.events_queued.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_stale_events_are_queued_without_rewinding() {
        let (received, cursors, _) = run_script(vec![batch(&[10]), batch(&[7, 11])]);

        assert_eq!(received, vec![Seq(10), Seq(7), Seq(11)]);
        assert_eq!(&cursors[..3], &[0, 11, 12]);
    }

    #[test]
    fn test_repeated_failures_have_no_cap() {
        let mut script: Vec<Result<Vec<Seq>, FetchError>> =
            (0..5).map(|_| Err(FetchError::network("down"))).collect();
        script.push(batch(&[1]));

        let (received, cursors, _) = run_script(script);

        assert_eq!(received, vec![Seq(1)]);
        assert!(cursors[..6].iter().all(|c| *c == 0));
    }

    #[test]
    fn test_closed_engine_never_fetches() {
        let shared = Arc::new(Shared::new(0));
        shared.closed.store(true, Ordering::Release);
        let source = Scripted {
            script: Mutex::new(VecDeque::new()),
            cursors: Mutex::new(Vec::new()),
            shared: Arc::clone(&shared),
        };
        let (tx, _rx) = bounded(1);

        poll_loop(&source, &tx, &shared);

        assert!(source.cursors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stops_when_receiver_is_dropped() {
        let shared = Arc::new(Shared::new(0));
        let source = |cursor: i64| -> Result<Vec<Seq>, FetchError> { Ok(vec![Seq(cursor)]) };
        let (tx, rx) = bounded(0);
        drop(rx);

        poll_loop(&source, &tx, &shared);

        assert_eq!(shared.counters.events_queued.load(Ordering::Relaxed), 0);
        assert_eq!(shared.cursor.load(Ordering::Acquire), 1);
    }
}
