//! Host-supplied invocation context: who is calling and when.
//!
//! Attribution and commit time never come from caller arguments. The boundary
//! layer assembles a [`RequestContext`] from an authenticated identity and a
//! [`TimeSource`], then hands it to the entry operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::PinError;
use crate::record::Author;

/// Trusted per-invocation values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    author: Author,
    timestamp: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(author: Author, timestamp: DateTime<Utc>) -> Self {
        Self { author, timestamp }
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Source of commit-time clock readings.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clamps readings of an inner clock so they never go backwards.
///
/// Seeded with the last committed timestamp when a ledger is restored, so a
/// restarted host does not issue readings earlier than its history.
#[derive(Debug)]
pub struct MonotonicTimeSource<T> {
    inner: T,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl<T: TimeSource> MonotonicTimeSource<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    pub fn starting_after(inner: T, floor: Option<DateTime<Utc>>) -> Self {
        Self {
            inner,
            last: Mutex::new(floor),
        }
    }
}

impl<T: TimeSource> TimeSource for MonotonicTimeSource<T> {
    fn now(&self) -> DateTime<Utc> {
        let reading = self.inner.now();
        let mut last = self.last.lock();
        let now = match *last {
            Some(prev) if prev > reading => {
                tracing::debug!(%prev, %reading, "Clock went backwards, holding previous reading");
                prev
            }
            _ => reading,
        };
        *last = Some(now);
        now
    }
}

/// Manually driven clock for tests.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone)]
pub struct MockTimeSource(Arc<Mutex<DateTime<Utc>>>);

#[cfg(any(test, feature = "testing"))]
impl MockTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(start)))
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.0.lock() = to;
    }
}

#[cfg(any(test, feature = "testing"))]
impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Boundary layer that turns an authenticated session into request contexts.
///
/// Identity is optional so a host that failed to authenticate the caller
/// refuses the invocation here, before the ledger is touched.
#[derive(Debug)]
pub struct HostEnvironment<T> {
    identity: Option<Author>,
    clock: T,
}

impl<T: TimeSource> HostEnvironment<T> {
    pub fn new(identity: Option<Author>, clock: T) -> Self {
        Self { identity, clock }
    }

    pub fn context(&self) -> Result<RequestContext, PinError> {
        let author = self.identity.clone().ok_or(PinError::MissingIdentity)?;
        Ok(RequestContext::new(author, self.clock.now()))
    }
}
