//! # signal-api
//!
//! Administrative HTTP surface for the signaling broker: room creation,
//! rule changes, closing, and inspection. Mounted by the gateway binary on
//! the same service context so both surfaces see the same rooms.

pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use response::{ApiError, ApiResult};
pub use server::{create_app, run_server};
pub use state::AppState;
