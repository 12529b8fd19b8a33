pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod light;
pub mod log;
pub mod phase;
pub mod queue;
pub mod shutdown;
