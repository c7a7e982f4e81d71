pub mod auth;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod progress;
pub mod questions;
