//! Database repository implementations

pub mod account_repository;
pub mod session_repository;

pub use account_repository::SqliteAccountRepository;
pub use session_repository::SqliteSessionRepository;
