//! Select the events that fall inside a time window.
//!
//! Three policies decide what happens to events crossing the window edges:
//! keep them whole (`inclusive`), drop them (`exclusive`), or keep them cut
//! down to the edges (`truncated`). Selection runs before events reach a
//! [`TimeNodeChain`](crate::TimeNodeChain).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};
use crate::node::{Event, TimeNode};

/// How events overlapping a window edge are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Every event overlapping the window at all.
    #[default]
    Inclusive,
    /// Only events fully contained in the window.
    Exclusive,
    /// Overlapping or contained events, clipped to the window edges.
    Truncated,
}

impl EdgeMode {
    pub const ALL: [EdgeMode; 3] = [EdgeMode::Inclusive, EdgeMode::Exclusive, EdgeMode::Truncated];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeMode::Inclusive => "inclusive",
            EdgeMode::Exclusive => "exclusive",
            EdgeMode::Truncated => "truncated",
        }
    }
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeMode {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        EdgeMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                TimelineError::InvalidParameter(format!(
                    "edge '{}' is not one of inclusive, exclusive, truncated",
                    s
                ))
            })
    }
}

/// Pick the events inside `[window_start, window_end]` according to `mode`.
///
/// The result keeps the input order, so a later event still overwrites an
/// earlier one once the selection is fed to a chain. Truncating keeps every
/// event `Exclusive` would keep, and clips an event spanning both edges on
/// both sides.
///
/// # Errors
/// Returns `TimelineError::InvalidParameter` if the window is inverted and
/// `TimelineError::MalformedInterval` if any event has `start > end`.
pub fn select_window<E: Event>(
    events: &[E],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    mode: EdgeMode,
) -> Result<Vec<TimeNode>> {
    if window_start > window_end {
        return Err(TimelineError::InvalidParameter(format!(
            "window start {} is after window end {}",
            window_start.to_rfc3339(),
            window_end.to_rfc3339()
        )));
    }

    let mut selected = Vec::new();
    for event in events {
        let node = TimeNode::from_event(event)?;
        let overlaps = node.end() > window_start && node.start() < window_end;
        let contained = node.start() >= window_start && node.end() <= window_end;
        match mode {
            EdgeMode::Inclusive if overlaps => selected.push(node),
            EdgeMode::Exclusive if contained => selected.push(node),
            EdgeMode::Truncated if overlaps || contained => {
                selected.push(node.clipped(window_start, window_end))
            }
            _ => {}
        }
    }

    Ok(selected)
}
