use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::registry::Handler;
use crate::source::Event;

use super::{Counters, Shared};

/// Counts handler actions that are still running.
#[derive(Debug, Default)]
pub(crate) struct ActionTracker {
    running: Mutex<usize>,
    idle: Condvar,
}

impl ActionTracker {
    fn enter(&self) {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn exit(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        *running = running.saturating_sub(1);
        if *running == 0 {
            self.idle.notify_all();
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        while *running > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            running = self
                .idle
                .wait_timeout(running, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

// Leaves the tracker even when the action unwinds.
struct RunningAction(Arc<Shared>);

impl Drop for RunningAction {
    fn drop(&mut self) {
        self.0.actions.exit();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Delivers every queued event to the matching handlers.
///
/// Exits once the queue is closed and drained.
pub(super) fn dispatch_loop<E: Event>(rx: &Receiver<E>, handlers: &[Handler<E>], shared: &Arc<Shared>, prefix: &str) {
    tracing::debug!(handlers = handlers.len(), "dispatch loop started");

    for event in rx {
        Counters::bump(&shared.counters.events_dispatched);
        let sequence = event.sequence();

        for handler in handlers {
            let matched = match panic::catch_unwind(AssertUnwindSafe(|| handler.matches(&event))) {
                Ok(matched) => matched,
                Err(payload) => {
                    Counters::bump(&shared.counters.predicate_panics);
                    tracing::error!(
                        handler = %handler.label(),
                        sequence,
                        panic = panic_message(payload.as_ref()),
                        "handler predicate panicked, treating as no match"
                    );
                    false
                }
            };

            if matched {
                launch(handler, event.clone(), shared, prefix);
            }
        }
    }

    tracing::debug!("dispatch loop stopped");
}

fn launch<E: Event>(handler: &Handler<E>, event: E, shared: &Arc<Shared>, prefix: &str) {
    let action = handler.action();
    let label = handler.label();
    let sequence = event.sequence();

    shared.actions.enter();
    let guard = RunningAction(Arc::clone(shared));
    let thread_label = label.clone();

    let spawned = thread::Builder::new()
        .name(format!("{prefix}-handler"))
        .spawn(move || {
            let guard = guard;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| action(event))) {
                Counters::bump(&guard.0.counters.action_panics);
                tracing::error!(
                    handler = %thread_label,
                    sequence,
                    panic = panic_message(payload.as_ref()),
                    "handler action panicked"
                );
            }
        });

    match spawned {
        Ok(_) => {
            Counters::bump(&shared.counters.actions_launched);
            tracing::trace!(handler = %label, sequence, "handler action launched");
        }
        // The closure, and the guard inside it, were dropped with the error.
        Err(e) => {
            Counters::bump(&shared.counters.launch_failures);
            tracing::error!(handler = %label, sequence, error = %e, "failed to spawn handler action");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crossbeam_channel::{bounded, unbounded};

    use super::*;
    use crate::registry::HandlerRegistry;

    #[derive(Debug, Clone, PartialEq)]
    struct Seq(i64);

    impl Event for Seq {
        fn sequence(&self) -> i64 {
            self.0
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_only_matching_handlers_run_once_per_event() {
        let (hit_tx, hit_rx) = unbounded::<(&'static str, i64)>();
        let mut registry = HandlerRegistry::new();
        let yes_tx = hit_tx.clone();
        registry.register(|_: &Seq| true, move |e: Seq| yes_tx.send(("yes", e.0)).unwrap());
        registry.register(|_: &Seq| false, move |e: Seq| hit_tx.send(("no", e.0)).unwrap());
        let handlers = registry.snapshot();

        let shared = Arc::new(Shared::new(0));
        let (tx, rx) = bounded(8);
        for i in 1..=3 {
            tx.send(Seq(i)).unwrap();
        }
        drop(tx);

        dispatch_loop(&rx, &handlers, &shared, "test");
        assert!(shared.actions.wait_idle(WAIT));

        let mut hits: Vec<_> = hit_rx.try_iter().collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![("yes", 1), ("yes", 2), ("yes", 3)]);
        assert_eq!(shared.counters.actions_launched.load(Ordering::Relaxed), 3);
        assert_eq!(shared.counters.events_dispatched.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_panicking_action_is_contained() {
        let (hit_tx, hit_rx) = unbounded();
        let mut registry = HandlerRegistry::new();
        registry.register_named("boom", |_: &Seq| true, |_: Seq| panic!("handler failure"));
        registry.register(|_: &Seq| true, move |e: Seq| hit_tx.send(e.0).unwrap());
        let handlers = registry.snapshot();

        let shared = Arc::new(Shared::new(0));
        let (tx, rx) = bounded(4);
        tx.send(Seq(1)).unwrap();
        tx.send(Seq(2)).unwrap();
        drop(tx);

        dispatch_loop(&rx, &handlers, &shared, "test");
        assert!(shared.actions.wait_idle(WAIT));

        let mut hits: Vec<i64> = hit_rx.try_iter().collect();
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 2]);
        assert_eq!(shared.counters.action_panics.load(Ordering::Relaxed), 2);
        assert_eq!(shared.actions.in_flight(), 0);
    }

    #[test]
    fn test_panicking_predicate_counts_as_no_match() {
        let (hit_tx, hit_rx) = unbounded();
        let mut registry = HandlerRegistry::new();
        registry.register(|e: &Seq| if e.0 == 1 { panic!("bad predicate") } else { true }, move |e: Seq| {
            hit_tx.send(e.0).unwrap();
        });
        let handlers = registry.snapshot();

        let shared = Arc::new(Shared::new(0));
        let (tx, rx) = bounded(4);
        tx.send(Seq(1)).unwrap();
        tx.send(Seq(2)).unwrap();
        drop(tx);

        dispatch_loop(&rx, &handlers, &shared, "test");
        assert!(shared.actions.wait_idle(WAIT));

        assert_eq!(hit_rx.try_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(shared.counters.predicate_panics.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_slow_action_does_not_block_delivery() {
        let (release_tx, release_rx) = bounded::<()>(0);
        let (hit_tx, hit_rx) = unbounded();
        let mut registry = HandlerRegistry::new();
        registry.register(|e: &Seq| e.0 == 1, move |_: Seq| {
            let _ = release_rx.recv();
        });
        registry.register(|e: &Seq| e.0 == 2, move |e: Seq| hit_tx.send(e.0).unwrap());
        let handlers = registry.snapshot();

        let shared = Arc::new(Shared::new(0));
        let (tx, rx) = bounded(4);
        tx.send(Seq(1)).unwrap();
        tx.send(Seq(2)).unwrap();
        drop(tx);

        dispatch_loop(&rx, &handlers, &shared, "test");

        assert_eq!(hit_rx.recv_timeout(WAIT).unwrap(), 2);
        assert!(shared.actions.in_flight() >= 1);
        drop(release_tx);
        assert!(shared.actions.wait_idle(WAIT));
    }

    #[test]
    fn test_wait_idle_times_out_while_busy() {
        let tracker = ActionTracker::default();
        tracker.enter();
        assert!(!tracker.wait_idle(Duration::from_millis(20)));
        tracker.exit();
        assert!(tracker.wait_idle(Duration::from_millis(20)));
    }
}
