pub mod auth;
pub mod common;
pub mod materials;
pub mod movements;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
