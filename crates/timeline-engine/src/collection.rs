//! Lazy, composable sets of events.
//!
//! An [`EventCollection`] wraps a producer closure instead of a materialized
//! set. `union` and `intersection` build new producers over their operands and
//! evaluate nothing until [`events`](EventCollection::events) is called, so a
//! composition always reflects the operands as they are at call time.
//!
//! Operands are borrowed for the collection's lifetime `'a`, which keeps a
//! [`TimeNodeChain`](crate::TimeNodeChain) from being mutated while a
//! composition over it is alive.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use chrono::Duration;

use crate::node::Event;

type Producer<'a, T> = Arc<dyn Fn() -> HashSet<T> + Send + Sync + 'a>;

/// A named, lazily evaluated set of events.
pub struct EventCollection<'a, T> {
    producer: Producer<'a, T>,
    name: String,
}

impl<'a, T> EventCollection<'a, T>
where
    T: Eq + Hash + 'a,
{
    /// Wrap a producer. `name` only shows up in `Display` output.
    pub fn new<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> HashSet<T> + Send + Sync + 'a,
    {
        Self {
            producer: Arc::new(producer),
            name: name.into(),
        }
    }

    /// A collection with no members.
    pub fn empty() -> Self {
        Self::new("EventCollection", HashSet::new)
    }

    /// Snapshot `events` into a fixed collection.
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone + Send + Sync,
    {
        let members: HashSet<T> = events.into_iter().collect();
        Self::new("EventCollection", move || members.clone())
    }

    /// Evaluate the producer. Not cached: every call recomputes the set.
    pub fn events(&self) -> HashSet<T> {
        (self.producer)()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members present in `self`, `other`, or both.
    pub fn union(&self, other: &EventCollection<'a, T>) -> Self {
        let (left, right) = (Arc::clone(&self.producer), Arc::clone(&other.producer));
        Self::new(format!("({} union {})", self, other), move || {
            let mut members = left();
            members.extend(right());
            members
        })
    }

    /// Members present in both `self` and `other`.
    pub fn intersection(&self, other: &EventCollection<'a, T>) -> Self {
        let (left, right) = (Arc::clone(&self.producer), Arc::clone(&other.producer));
        Self::new(format!("({} intersection {})", self, other), move || {
            let right = right();
            left()
                .into_iter()
                .filter(|event| right.contains(event))
                .collect()
        })
    }
}

impl<'a, T> EventCollection<'a, T>
where
    T: Event + Eq + Hash + 'a,
{
    /// Sum of `end - start` over every member, counted independently.
    ///
    /// Members may overlap or touch; no merging happens here, unlike
    /// [`TimeNodeChain::total_time`](crate::TimeNodeChain::total_time).
    pub fn total_time(&self) -> Duration {
        self.events()
            .iter()
            .fold(Duration::zero(), |total, event| total + event.duration())
    }
}

impl<T> Clone for EventCollection<'_, T> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            name: self.name.clone(),
        }
    }
}

impl<T> fmt::Display for EventCollection<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<T> fmt::Debug for EventCollection<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCollection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
