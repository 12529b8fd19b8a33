//! A traffic light whose phase flips on a randomized interval, observed
//! by other threads through a blocking handoff queue.

pub mod core;
