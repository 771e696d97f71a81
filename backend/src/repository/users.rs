use common::{Role, UserDto};
use uuid::Uuid;

use super::conflict_or_database;
use crate::db::DbPool;
use crate::error::AppError;

const USER_COLUMNS: &str = "id, name, lastname, email, password_hash, age, role, is_active";

pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email ya registrado";

/// A user row as stored, password hash included.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<i64>,
    pub role: String,
    pub is_active: bool,
}

impl UserRecord {
    pub fn role(&self) -> Result<Role, AppError> {
        self.role.parse().map_err(AppError::InternalServerError)
    }

    pub fn into_dto(self) -> Result<UserDto, AppError> {
        let role = self.role()?;
        Ok(UserDto {
            id: self.id,
            name: self.name,
            lastname: self.lastname,
            email: self.email,
            age: self.age,
            role,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<i64>,
}

#[derive(Clone)]
pub struct UsersRepository {
    db_pool: DbPool,
}

impl UsersRepository {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    /// Stores a new account with the default role and the active flag set.
    pub async fn create(&self, new_user: NewUser) -> Result<UserDto, AppError> {
        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(&new_user.name)
            .bind(&new_user.lastname)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(new_user.age)
            .bind(Role::default().as_str())
            .bind(true)
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| conflict_or_database(e, || DUPLICATE_EMAIL_MESSAGE.to_string()))?
            .into_dto()
    }

    pub async fn get_all(&self) -> Result<Vec<UserDto>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users");
        sqlx::query_as::<_, UserRecord>(&query)
            .fetch_all(&self.db_pool)
            .await?
            .into_iter()
            .map(UserRecord::into_dto)
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    /// Persists the profile fields of `user`; the hash is replaced only when given.
    pub async fn update(
        &self,
        user: &UserDto,
        password_hash: Option<&str>,
    ) -> Result<Option<UserDto>, AppError> {
        let query = format!(
            r#"
            UPDATE users
            SET name = $1, lastname = $2, email = $3, age = $4, role = $5,
                password_hash = COALESCE($6, password_hash)
            WHERE id = $7
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserRecord>(&query)
            .bind(&user.name)
            .bind(&user.lastname)
            .bind(&user.email)
            .bind(user.age)
            .bind(user.role.as_str())
            .bind(password_hash)
            .bind(&user.id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| conflict_or_database(e, || DUPLICATE_EMAIL_MESSAGE.to_string()))?
            .map(UserRecord::into_dto)
            .transpose()
    }

    pub async fn update_status(&self, id: &str, is_active: bool) -> Result<Option<UserDto>, AppError> {
        let query = format!("UPDATE users SET is_active = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, UserRecord>(&query)
            .bind(is_active)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .map(UserRecord::into_dto)
            .transpose()
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
