pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ApiClient, ApiResponse, AUTH_COOKIE};
pub use types::{EventType, NewEvent, NewTrip, Reaction, RsvpStatus};
