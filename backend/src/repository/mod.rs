//! Data access for songs and users. Each repository owns a handle to the pool
//! and is built once at startup, then shared through [`crate::web_server::AppState`].

mod songs;
mod users;

pub use songs::{duplicate_title_message, NewSong, SongsRepository};
pub use users::{NewUser, UserRecord, UsersRepository, DUPLICATE_EMAIL_MESSAGE};

use crate::error::AppError;

/// Maps a unique-index violation to a 409 with `message`, anything else to a storage error.
fn conflict_or_database(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_error) = &e {
        if db_error.is_unique_violation() {
            return AppError::Conflict(message());
        }
    }
    AppError::DatabaseError(e)
}
