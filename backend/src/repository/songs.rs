use common::SongDto;
use uuid::Uuid;

use super::conflict_or_database;
use crate::db::DbPool;
use crate::error::AppError;

const SONG_COLUMNS: &str = "id, title, author, release_year, language, category, duration, created_by";

/// A validated song about to be stored.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub author: String,
    pub release_year: Option<i64>,
    pub language: Option<String>,
    pub category: String,
    pub created_by: String,
}

pub fn duplicate_title_message(title: &str) -> String {
    format!("La canción con el título \"{title}\" ya existe.")
}

#[derive(Clone)]
pub struct SongsRepository {
    db_pool: DbPool,
}

impl SongsRepository {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    pub async fn create(&self, new_song: NewSong) -> Result<SongDto, AppError> {
        let query = format!(
            "INSERT INTO songs ({SONG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {SONG_COLUMNS}"
        );
        sqlx::query_as::<_, SongDto>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(&new_song.title)
            .bind(&new_song.author)
            .bind(new_song.release_year)
            .bind(&new_song.language)
            .bind(&new_song.category)
            .bind(0.0_f64)
            .bind(&new_song.created_by)
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| conflict_or_database(e, || duplicate_title_message(&new_song.title)))
    }

    pub async fn get_all(&self) -> Result<Vec<SongDto>, AppError> {
        let query = format!("SELECT {SONG_COLUMNS} FROM songs");
        let songs = sqlx::query_as::<_, SongDto>(&query)
            .fetch_all(&self.db_pool)
            .await?;
        Ok(songs)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<SongDto>, AppError> {
        let query = format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = $1");
        let song = sqlx::query_as::<_, SongDto>(&query)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(song)
    }

    /// Exact, case-sensitive title lookup.
    pub async fn get_by_title(&self, title: &str) -> Result<Option<SongDto>, AppError> {
        let query = format!("SELECT {SONG_COLUMNS} FROM songs WHERE title = $1");
        let song = sqlx::query_as::<_, SongDto>(&query)
            .bind(title)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(song)
    }

    /// Persists every mutable field of `song`. Returns `None` when the id is gone.
    pub async fn update(&self, song: &SongDto) -> Result<Option<SongDto>, AppError> {
        let query = format!(
            r#"
            UPDATE songs
            SET title = $1, author = $2, release_year = $3, language = $4, category = $5, duration = $6
            WHERE id = $7
            RETURNING {SONG_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SongDto>(&query)
            .bind(&song.title)
            .bind(&song.author)
            .bind(song.release_year)
            .bind(&song.language)
            .bind(&song.category)
            .bind(song.duration)
            .bind(&song.id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| conflict_or_database(e, || duplicate_title_message(&song.title)))
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM songs WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
