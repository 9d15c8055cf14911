pub mod accounts;
pub mod admin;
pub mod auth;
pub mod data;
pub mod error;
pub mod models;
pub mod responses;
pub mod router;
pub mod state;
pub mod storage;
pub mod templates;
pub mod uploads;

#[cfg(test)]
pub mod test_support;

pub use error::AppError;
pub use state::AppState;
