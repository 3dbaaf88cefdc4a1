//! # Lifecycle Events
//!
//! Broadcast channel carrying pipeline lifecycle events (dispatch, routing,
//! dead-lettering, circuit transitions) to any number of observers.

pub mod publisher;

pub use publisher::{EventPublisher, PublishedEvent};
