//! Error types for timeline-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::chain::NodeId;

/// Errors raised by node construction, chain mutation, and boundary selection.
///
/// None of these are retried internally. A chain that reported an error from
/// [`inverse`](crate::TimeNodeChain::inverse) should be considered corrupt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// A node or event whose start lies after its end.
    #[error("Malformed interval {id}: start {start} is after end {end}")]
    MalformedInterval {
        id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The node to insert is already linked into a chain.
    #[error("Node {id} already has prev/next links and cannot be inserted")]
    AlreadyLinked { id: String },

    /// The handle refers to a node that was overwritten or never existed.
    #[error("Stale node handle: {0:?}")]
    StaleNode(NodeId),

    /// Two adjacent nodes overlap, which the chain invariant forbids.
    #[error("Inconsistent start and end times between nodes {left} and {right}")]
    Inconsistent { left: String, right: String },

    /// A caller-supplied parameter outside the accepted set.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;

/// Render an optional identifier for messages and gap labels.
pub(crate) fn label(id: Option<&str>) -> String {
    id.unwrap_or("?").to_string()
}
