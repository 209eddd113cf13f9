//! Polling and dispatch engine.
//!
//! The engine runs two long-lived threads joined by a bounded channel:
//!
//! - the poll loop calls an [`UpdateSource`] with an advancing cursor and
//!   pushes every fetched event onto the channel;
//! - the dispatch loop drains the channel, evaluates every registered
//!   predicate in registration order and runs each matching action on its
//!   own thread.
//!
//! Fetch failures are logged and retried immediately, without backoff or a
//! retry limit. Handler panics are caught on the handler's thread and never
//! reach either loop.

mod dispatcher;
mod poller;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::bounded;

use crate::error::EngineError;
use crate::registry::{HandlerId, HandlerRegistry};
use crate::source::{Event, UpdateSource};

use dispatcher::ActionTracker;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the queue between the poll loop and the dispatch loop.
    /// Zero makes it a rendezvous channel: the poll loop waits for the
    /// dispatch loop to take each event.
    pub queue_capacity: usize,
    /// Cursor passed to the first fetch.
    pub initial_cursor: i64,
    /// Prefix for the names of every thread the engine spawns.
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 0,
            initial_cursor: 0,
            thread_name_prefix: "botloop".to_string(),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub fetches: u64,
    pub fetch_failures: u64,
    pub events_queued: u64,
    pub events_dispatched: u64,
    pub actions_launched: u64,
    pub action_panics: u64,
    pub launch_failures: u64,
    pub predicate_panics: u64,
    pub actions_in_flight: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub fetches: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub events_queued: AtomicU64,
    pub events_dispatched: AtomicU64,
    pub actions_launched: AtomicU64,
    pub action_panics: AtomicU64,
    pub launch_failures: AtomicU64,
    pub predicate_panics: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared by the loops and the handle.
#[derive(Debug)]
pub(crate) struct Shared {
    closed: AtomicBool,
    cursor: AtomicI64,
    pub counters: Counters,
    pub actions: ActionTracker,
}

impl Shared {
    fn new(initial_cursor: i64) -> Self {
        Self {
            closed: AtomicBool::new(false),
            cursor: AtomicI64::new(initial_cursor),
            counters: Counters::default(),
            actions: ActionTracker::default(),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn publish_cursor(&self, cursor: i64) {
        self.cursor.store(cursor, Ordering::Release);
    }
}

/// Builder for a polling engine.
///
/// Register every handler, then call [`start`](Self::start). Registration is
/// impossible once the engine runs: `start` consumes the builder and freezes
/// the handler list.
///
/// ```
/// use botloop::{Engine, EngineConfig, Event, FetchError};
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
/// let source = |_cursor: i64| -> Result<Vec<Tick>, FetchError> { Ok(Vec::new()) };
/// let mut engine = Engine::new(source, EngineConfig::default());
/// engine.register(|tick: &Tick| tick.0 % 2 == 0, |tick: Tick| println!("even tick {}", tick.0));
///
/// let handle = engine.start().unwrap();
/// handle.shutdown();
/// handle.join();
/// ```
pub struct Engine<E, S> {
    source: S,
    config: EngineConfig,
    registry: HandlerRegistry<E>,
}

impl<E, S> Engine<E, S>
where
    E: Event,
    S: UpdateSource<E> + 'static,
{
    /// Creates an engine with no handlers.
    #[must_use]
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self {
            source,
            config,
            registry: HandlerRegistry::new(),
        }
    }

    /// Registers a handler. Handlers are evaluated in registration order.
    pub fn register<P, A>(&mut self, predicate: P, action: A) -> HandlerId
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        A: Fn(E) + Send + Sync + 'static,
    {
        self.registry.register(predicate, action)
    }

    /// Registers a handler with a name that shows up in logs.
    pub fn register_named<P, A>(&mut self, name: impl Into<String>, predicate: P, action: A) -> HandlerId
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        A: Fn(E) + Send + Sync + 'static,
    {
        self.registry.register_named(name, predicate, action)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Configuration the engine starts with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts the poll and dispatch threads.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawn`] if either loop thread cannot be created.
    pub fn start(self) -> Result<EngineHandle, EngineError> {
        let Self {
            source,
            config,
            registry,
        } = self;

        let handlers = registry.snapshot();
        let shared = Arc::new(Shared::new(config.initial_cursor));
        let (tx, rx) = bounded::<E>(config.queue_capacity);
        let prefix = config.thread_name_prefix;

        tracing::info!(
            handlers = handlers.len(),
            queue_capacity = config.queue_capacity,
            cursor = config.initial_cursor,
            "starting engine"
        );

        let dispatch = {
            let shared = Arc::clone(&shared);
            let prefix = prefix.clone();
            spawn_loop(format!("{prefix}-dispatch"), move || {
                dispatcher::dispatch_loop(&rx, &handlers, &shared, &prefix);
            })?
        };

        // If this spawn fails the closure, and with it the sender, is dropped,
        // which lets the dispatch thread exit on its own.
        let poll = {
            let shared = Arc::clone(&shared);
            spawn_loop(format!("{prefix}-poll"), move || {
                poller::poll_loop(&source, &tx, &shared);
            })?
        };

        Ok(EngineHandle {
            shared,
            poll: Some(poll),
            dispatch: Some(dispatch),
        })
    }

    /// Starts the engine and blocks until both loops end.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawn`] if either loop thread cannot be created.
    pub fn run(self) -> Result<(), EngineError> {
        self.start()?.join();
        Ok(())
    }
}

impl<E, S> fmt::Debug for Engine<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn spawn_loop<F>(name: String, body: F) -> Result<JoinHandle<()>, EngineError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|e| EngineError::Spawn {
            thread: name,
            message: e.to_string(),
        })
}

/// Handle to a running engine.
///
/// Dropping the handle detaches the loops; they keep running.
#[derive(Debug)]
pub struct EngineHandle {
    shared: Arc<Shared>,
    poll: Option<JoinHandle<()>>,
    dispatch: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Closes the queue from the producer side.
    ///
    /// The poll loop issues no further fetches and pushes nothing more; the
    /// dispatch loop drains what is already queued and exits. In-flight
    /// handler actions are not interrupted, and a fetch that is already in
    /// progress is allowed to finish.
    pub fn shutdown(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(cursor = self.cursor(), "engine shutdown requested");
        }
    }

    /// Cursor the poll loop will pass to its next fetch.
    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.shared.cursor.load(Ordering::Acquire)
    }

    /// Returns true once `shutdown` has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_closed()
    }

    /// Returns true while either loop thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        [&self.poll, &self.dispatch]
            .into_iter()
            .flatten()
            .any(|h| !h.is_finished())
    }

    /// Snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let c = &self.shared.counters;
        EngineStats {
            fetches: c.fetches.load(Ordering::Relaxed),
            fetch_failures: c.fetch_failures.load(Ordering::Relaxed),
            events_queued: c.events_queued.load(Ordering::Relaxed),
            events_dispatched: c.events_dispatched.load(Ordering::Relaxed),
            actions_launched: c.actions_launched.load(Ordering::Relaxed),
            action_panics: c.action_panics.load(Ordering::Relaxed),
            launch_failures: c.launch_failures.load(Ordering::Relaxed),
            predicate_panics: c.predicate_panics.load(Ordering::Relaxed),
            actions_in_flight: self.shared.actions.in_flight(),
        }
    }

    /// Waits until no handler action is running, up to `timeout`.
    ///
    /// Returns true if the engine became idle in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.actions.wait_idle(timeout)
    }

    /// Blocks until both loops have exited.
    ///
    /// Without a prior [`shutdown`](Self::shutdown) this only returns if the
    /// dispatch side goes away, so a bot normally blocks here for its lifetime.
    pub fn join(mut self) {
        for (name, handle) in [("poll", self.poll.take()), ("dispatch", self.dispatch.take())] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    tracing::error!(thread = name, "engine loop thread panicked");
                }
            }
        }
    }
}
