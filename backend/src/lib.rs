pub mod catchers;
pub mod config;
pub mod coordinator;
pub mod cors;
pub mod error;
pub mod hub;
pub mod rate_limiter;
pub mod realtime;
pub mod routes;
pub mod store;
pub mod stores;
pub mod utils;

pub use shared::{models::*, error::*};
pub use shared::events::{ElectionEvent, GroupEvent};
pub use shared::lifecycle::ElectionPhase;
pub use shared::object_id::ObjectId;

#[cfg(test)]
mod tests;
