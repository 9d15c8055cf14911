mod auth;
mod dashboard;
mod pages;

pub use dashboard::dashboard;
pub use pages::{login_page, register_page};
