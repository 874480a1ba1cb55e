//! Serialized timetable queries.
//!
//! The timetable source is a single stateful session: selecting a direction
//! or day-type for one query changes it for any other query in flight. So
//! one worker task owns the provider and takes queries from a channel, one
//! at a time, in arrival order. Callers only ever hold a
//! [`TimetableQueryCoordinator`], a cheap handle to that channel.
//!
//! Each provider call is bounded by a timeout. After a failure the worker
//! resets the session and retries, so a single bad call doesn't stall
//! everyone queued behind it. A panicking provider counts as a failed call;
//! the worker survives it.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{Direction, Stop};
use crate::timetable::{DepartureQuery, ProviderError, RawDepartures, TimetableProvider};
use crate::window::TimeWindow;

/// Errors from a departure query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// No buses run at this hour; the provider was not asked
    #[error("no service at {hour:02}:xx")]
    PolicyRejected { hour: u8 },

    /// The provider failed, also after a reset and retry
    #[error("timetable provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider didn't answer in time, also after a reset and retry
    #[error("timetable provider timed out after {0:?}")]
    ProviderTimeout(Duration),

    /// The queue worker has stopped
    #[error("timetable queue closed")]
    QueueClosed,
}

impl From<ProviderError> for QueryError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(after) => QueryError::ProviderTimeout(after),
            other => QueryError::ProviderUnavailable(other.to_string()),
        }
    }
}

/// Upcoming departures for the current and the next hour.
///
/// Times are `HH:MM` strings in the order the timetable lists them. Both
/// lists are empty when no bus is left in the window, and also when the stop
/// has no row in the timetable; the two cases are not told apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepartureResult {
    pub current_hour: Vec<String>,
    pub next_hour: Vec<String>,
}

impl DepartureResult {
    /// Keep well-formed times; in the current hour only those at or after
    /// `minute`.
    pub fn from_raw(raw: RawDepartures, minute: u8) -> Self {
        Self {
            current_hour: raw
                .current_hour
                .into_iter()
                .filter(|t| departure_minute(t).is_some_and(|m| m >= minute))
                .collect(),
            next_hour: raw
                .next_hour
                .into_iter()
                .filter(|t| departure_minute(t).is_some())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current_hour.is_empty() && self.next_hour.is_empty()
    }
}

/// The minute of a time that starts with `HH:MM`, or `None` if it doesn't.
fn departure_minute(time: &str) -> Option<u8> {
    match time.as_bytes() {
        [h1, h2, b':', m1, m2, ..]
            if [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit()) =>
        {
            Some((m1 - b'0') * 10 + (m2 - b'0'))
        }
        _ => None,
    }
}

/// Configuration for the query queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound on a single provider call (and on a session reset).
    pub call_timeout: Duration,

    /// Queries that can wait for admission before senders block.
    pub capacity: usize,

    /// Extra attempts after a failed call, each preceded by a reset.
    pub retries: u8,
}

impl QueueConfig {
    /// Set the provider call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of retries.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            capacity: 32,
            retries: 1,
        }
    }
}

/// A queued query and where to send its answer.
struct Job {
    query: DepartureQuery,
    minute: u8,
    reply: oneshot::Sender<Result<DepartureResult, QueryError>>,
}

/// Handle for submitting departure queries to the provider's worker.
///
/// Clones share the same queue. The worker stops once every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct TimetableQueryCoordinator {
    jobs: mpsc::Sender<Job>,
}

impl TimetableQueryCoordinator {
    /// Start a worker that owns `provider` and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<P>(provider: P, config: QueueConfig) -> Self
    where
        P: TimetableProvider + Send + 'static,
    {
        // A zero-capacity channel would panic.
        let (jobs, receiver) = mpsc::channel(config.capacity.max(1));
        let worker = QueueWorker {
            provider,
            jobs: receiver,
            call_timeout: config.call_timeout,
            retries: config.retries,
        };
        tokio::spawn(worker.run());

        Self { jobs }
    }

    /// Next departures from `stop` in `direction` for the given window.
    ///
    /// Fails with [`QueryError::PolicyRejected`] during the night blackout
    /// without touching the queue. Otherwise waits for its turn at the
    /// provider.
    pub async fn query(
        &self,
        stop: Stop,
        direction: Direction,
        window: TimeWindow,
    ) -> Result<DepartureResult, QueryError> {
        if window.is_blackout() {
            debug!(hour = window.hour(), "query in blackout window");
            return Err(QueryError::PolicyRejected {
                hour: window.hour(),
            });
        }

        let (reply, answer) = oneshot::channel();
        let job = Job {
            query: DepartureQuery::new(stop, direction, &window),
            minute: window.minute(),
            reply,
        };

        self.jobs
            .send(job)
            .await
            .map_err(|_| QueryError::QueueClosed)?;

        answer.await.map_err(|_| QueryError::QueueClosed)?
    }
}

const PROVIDER_PANICKED: &str = "provider panicked";

/// Sole owner of the provider session.
struct QueueWorker<P> {
    provider: P,
    jobs: mpsc::Receiver<Job>,
    call_timeout: Duration,
    retries: u8,
}

impl<P: TimetableProvider> QueueWorker<P> {
    async fn run(mut self) {
        info!("timetable queue worker started");

        while let Some(job) = self.jobs.recv().await {
            let Job {
                query,
                minute,
                reply,
            } = job;

            let outcome = self
                .serve(&query)
                .await
                .map(|raw| DepartureResult::from_raw(raw, minute));

            if reply.send(outcome).is_err() {
                debug!(stop = %query.stop, "caller gone before reply");
            }
        }

        info!("timetable queue closed, worker stopping");
    }

    /// Fetch with timeout; on failure reset the session and try again.
    async fn serve(&mut self, query: &DepartureQuery) -> Result<RawDepartures, QueryError> {
        let mut attempt = 0;

        loop {
            let err = match self.attempt(query).await {
                Ok(raw) => {
                    debug!(
                        stop = %query.stop,
                        direction = %query.direction,
                        day_type = %query.day_type,
                        hour = query.hour,
                        current = raw.current_hour.len(),
                        next = raw.next_hour.len(),
                        "timetable fetched"
                    );
                    return Ok(raw);
                }
                Err(e) => e,
            };

            warn!(
                stop = %query.stop,
                attempt,
                error = %err,
                "timetable fetch failed, resetting session"
            );
            self.reset().await;

            if attempt >= self.retries {
                return Err(err.into());
            }
            attempt += 1;
        }
    }

    async fn attempt(&mut self, query: &DepartureQuery) -> Result<RawDepartures, ProviderError> {
        let call = AssertUnwindSafe(self.provider.fetch_departures(query)).catch_unwind();
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ProviderError::Unavailable(PROVIDER_PANICKED.to_string())),
            Err(_) => Err(ProviderError::Timeout(self.call_timeout)),
        }
    }

    /// Reset the session. A failed reset is logged; the next fetch will
    /// surface any lasting problem.
    async fn reset(&mut self) {
        let reset = AssertUnwindSafe(self.provider.reset()).catch_unwind();
        match tokio::time::timeout(self.call_timeout, reset).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "timetable session reset failed"),
            Ok(Err(_)) => warn!("timetable session reset panicked"),
            Err(_) => warn!("timetable session reset timed out"),
        }
    }
}
