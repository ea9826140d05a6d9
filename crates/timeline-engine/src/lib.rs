//! # timeline-engine
//!
//! Consistent timelines from overlapping calendar events.
//!
//! The engine turns a collection of time-bounded events into a single
//! non-overlapping chain (later events overwrite the ones they collide with),
//! computes the free-time gaps inside that chain, and combines groups of events
//! with lazy union/intersection and aggregate durations. It performs no I/O.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use timeline_engine::{Event, TimeNode, TimeNodeChain};
//!
//! let at = |h| Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap();
//! let mut chain = TimeNodeChain::new();
//! chain.insert(TimeNode::with_id("standup", at(9), at(10))?)?;
//! chain.insert(TimeNode::with_id("review", at(11), at(12))?)?;
//!
//! let gaps = chain.inverse()?;
//! assert_eq!(gaps.len(), 1);
//! assert_eq!(gaps.head().unwrap().start(), at(10));
//! # Ok::<(), timeline_engine::TimelineError>(())
//! ```
//!
//! ## Modules
//!
//! - [`node`] — `TimeNode` spans and the `Event` trait
//! - [`chain`] — `TimeNodeChain`: ordered, non-overlapping, overwriting inserts, gaps
//! - [`collection`] — `EventCollection`: lazy union/intersection and total time
//! - [`boundary`] — Window selection with inclusive/exclusive/truncated edges
//! - [`error`] — Error types

pub mod boundary;
pub mod chain;
pub mod collection;
pub mod error;
pub mod node;

pub use boundary::{select_window, EdgeMode};
pub use chain::{NodeId, TimeNodeChain};
pub use collection::EventCollection;
pub use error::TimelineError;
pub use node::{Event, TimeNode};
