// Stream resolution against the upstream resolver service

pub mod classifier;
mod client;
pub mod errors;
mod types;


pub use classifier::classify;
pub use client::{HttpStreamResolver, StreamResolver};
pub use errors::ResolutionError;
pub use types::{BrokenSourceReport, HealthStatus, StreamResponse};
