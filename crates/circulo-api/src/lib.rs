pub mod auth;
pub mod comments;
pub mod error;
pub mod feed;
pub mod follows;
pub mod middleware;
pub mod profile;
pub mod render;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{AppState, AppStateInner, SessionSettings};
