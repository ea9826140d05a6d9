//! Validated time spans and the [`Event`] trait.
//!
//! A [`TimeNode`] is the unit a [`TimeNodeChain`](crate::TimeNodeChain) stores.
//! Standalone nodes never carry ordering links; those live in the chain's arena,
//! so an owned `TimeNode` can always be inserted.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{label, Result, TimelineError};

/// Anything with a start, an end, and an optional opaque identifier.
pub trait Event {
    fn id(&self) -> Option<&str>;
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;

    /// Length of the span. Negative only for malformed events.
    fn duration(&self) -> Duration {
        self.end() - self.start()
    }
}

/// A single block of time with `start <= end`.
///
/// Equality and hashing cover `(id, start, end)`, so two nodes describing the
/// same labelled span collapse into one member of an
/// [`EventCollection`](crate::EventCollection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeNode")]
pub struct TimeNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Unvalidated wire form of a [`TimeNode`].
#[derive(Deserialize)]
struct RawTimeNode {
    #[serde(default)]
    id: Option<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeNode> for TimeNode {
    type Error = TimelineError;

    fn try_from(raw: RawTimeNode) -> Result<Self> {
        Self::build(raw.id, raw.start, raw.end)
    }
}

impl TimeNode {
    /// Create an anonymous node.
    ///
    /// # Errors
    /// Returns `TimelineError::MalformedInterval` if `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::build(None, start, end)
    }

    /// Create a node carrying an identifier.
    ///
    /// # Errors
    /// Returns `TimelineError::MalformedInterval` if `start > end`.
    pub fn with_id(id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::build(Some(id.into()), start, end)
    }

    /// Copy any event-like record into a node, validating its bounds.
    pub fn from_event<E: Event + ?Sized>(event: &E) -> Result<Self> {
        Self::build(event.id().map(str::to_string), event.start(), event.end())
    }

    fn build(id: Option<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(TimelineError::MalformedInterval {
                id: label(id.as_deref()),
                start,
                end,
            });
        }
        Ok(Self { id, start, end })
    }

    /// True if the two spans share any instant. Touching spans do not overlap.
    pub fn overlaps(&self, other: &TimeNode) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Same node with both edges pulled inside `[window_start, window_end]`.
    ///
    /// The caller guarantees the node overlaps the window, so the result keeps
    /// `start <= end`.
    pub(crate) fn clipped(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            start: self.start.max(window_start),
            end: self.end.min(window_end),
        }
    }
}

impl Event for TimeNode {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl fmt::Display for TimeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} .. {}]",
            label(self.id.as_deref()),
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}
