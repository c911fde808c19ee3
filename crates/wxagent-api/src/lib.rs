//! HTTP surface of the weather agent.

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use routes::routes;
pub use state::AppState;
