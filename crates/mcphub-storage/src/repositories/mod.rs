//! Repository implementations using SQLite.

mod registration_repository;
mod token_repository;

pub use registration_repository::SqliteRegistrationRepository;
pub use token_repository::SqliteTokenRepository;
