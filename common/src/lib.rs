use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

#[cfg(not(target_arch = "wasm32"))]
use sqlx::FromRow;

pub mod merge;
pub mod validation;

use validation::{collect, parse_year, validate, validate_age, validate_email, validate_year, ValidationResult};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 200;

// --- Domain DTOs ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct SongDto {
    pub id: String,
    pub title: String,
    pub author: String,
    pub release_year: Option<i64>,
    pub language: Option<String>,
    pub category: String,
    pub duration: f64,
    #[serde(rename = "createdBy")]
    pub created_by: String,
}

/// A user as exposed by the API. The password hash never leaves the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub age: Option<i64>,
    pub role: Role,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

// --- Request contracts ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct CreateSongRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    /// An integer, or a string holding one.
    #[schema(value_type = Option<i64>)]
    pub release_year: Option<Value>,
    pub language: Option<String>,
    pub category: Option<String>,
}

impl Validate for CreateSongRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        collect(&mut errors, "title", validate(self.title.as_deref()));
        collect(&mut errors, "author", validate(self.author.as_deref()));
        collect(&mut errors, "release_year", validate_year(self.release_year.as_ref()));
        collect(&mut errors, "category", validate(self.category.as_deref()));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl CreateSongRequest {
    /// The release year after coercion. Only meaningful once validated.
    pub fn year(&self) -> Option<i64> {
        self.release_year.as_ref().and_then(parse_year)
    }
}

/// Partial song update. Absent fields, and fields sent as `""`, keep their value.
#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct UpdateSongRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub release_year: Option<Value>,
    pub language: Option<String>,
    pub category: Option<String>,
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

fn supplied_year(value: &Option<Value>) -> Option<&Value> {
    value
        .as_ref()
        .filter(|year| !matches!(year, Value::String(text) if text.is_empty()))
}

impl Validate for UpdateSongRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("category", &self.category),
        ] {
            if let Some(text) = supplied(value) {
                collect(&mut errors, field, validate(Some(text)));
            }
        }
        if let Some(year) = supplied_year(&self.release_year) {
            collect(&mut errors, "release_year", validate_year(Some(year)));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateSongRequest {
    /// The supplied fields, keyed by their `SongDto` JSON names.
    pub fn patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("language", &self.language),
            ("category", &self.category),
        ] {
            if let Some(text) = value {
                patch.insert(field.to_string(), Value::String(text.clone()));
            }
        }
        if let Some(year) = supplied_year(&self.release_year).and_then(parse_year) {
            patch.insert("release_year".to_string(), Value::from(year));
        }
        patch
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, value: Option<&str>) {
    let result = validate(value);
    if result.valid && value.is_some_and(|name| name.chars().count() > MAX_NAME_LENGTH) {
        collect(
            errors,
            field,
            ValidationResult::invalid(format!("El campo no puede superar los {MAX_NAME_LENGTH} caracteres")),
        );
        return;
    }
    collect(errors, field, result);
}

fn check_email(errors: &mut ValidationErrors, value: Option<&str>) {
    let result = validate_email(value);
    if result.valid && value.is_some_and(|email| email.len() > MAX_EMAIL_LENGTH) {
        collect(
            errors,
            "email",
            ValidationResult::invalid(format!("El email no puede superar los {MAX_EMAIL_LENGTH} caracteres")),
        );
        return;
    }
    collect(errors, "email", result);
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "name", self.name.as_deref());
        check_name(&mut errors, "lastname", self.lastname.as_deref());
        check_email(&mut errors, self.email.as_deref());
        collect(&mut errors, "password", validate(self.password.as_deref()));
        if let Some(age) = self.age {
            collect(&mut errors, "age", validate_age(age));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Partial user update. `id` names the user; the rest follows the same rules as
/// [`UpdateSongRequest`].
#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct UpdateUserRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
    pub role: Option<Role>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = supplied(&self.name) {
            check_name(&mut errors, "name", Some(name));
        }
        if let Some(lastname) = supplied(&self.lastname) {
            check_name(&mut errors, "lastname", Some(lastname));
        }
        if let Some(email) = supplied(&self.email) {
            check_email(&mut errors, Some(email));
        }
        if let Some(password) = supplied(&self.password) {
            collect(&mut errors, "password", validate(Some(password)));
        }
        if let Some(age) = self.age {
            collect(&mut errors, "age", validate_age(age));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateUserRequest {
    /// The supplied profile fields, keyed by their `UserDto` JSON names.
    /// The password is handled separately since it is stored hashed.
    pub fn patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        for (field, value) in [
            ("name", &self.name),
            ("lastname", &self.lastname),
            ("email", &self.email),
        ] {
            if let Some(text) = value {
                patch.insert(field.to_string(), Value::String(text.clone()));
            }
        }
        if let Some(age) = self.age {
            patch.insert("age".to_string(), Value::from(age));
        }
        if let Some(role) = self.role {
            patch.insert("role".to_string(), Value::String(role.as_str().to_string()));
        }
        patch
    }

    pub fn new_password(&self) -> Option<&str> {
        supplied(&self.password)
    }

    pub fn new_email(&self) -> Option<&str> {
        supplied(&self.email)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        collect(&mut errors, "email", validate_email(Some(&self.email)));
        collect(&mut errors, "password", validate(Some(&self.password)));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, ToSchema)]
pub struct StatusRequest {
    /// New state. When omitted the current state is flipped.
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

// --- Response contracts ---

/// `{ message, payload }`, used by the read endpoints.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Listing<T> {
    pub message: String,
    pub payload: T,
}

/// `{ ok, payload }`, used by the write endpoints.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Envelope<T> {
    pub ok: bool,
    pub payload: T,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct SongPayload {
    pub message: String,
    pub song: SongDto,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct UserPayload {
    pub message: String,
    pub user: UserDto,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct MessagePayload {
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct DeletedResponse {
    pub code: u16,
    pub ok: bool,
    pub payload: MessagePayload,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct LoginResponse {
    pub ok: bool,
    pub message: String,
    pub token: String,
    pub user: SessionUser,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorReport {
    pub total_songs: usize,
    pub release_years: Vec<i64>,
    pub categories: BTreeMap<String, usize>,
    pub average_release_year: Option<i64>,
    pub most_frequent_category: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct SongsReport {
    pub ok: bool,
    pub reporte: BTreeMap<String, AuthorReport>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIndicators {
    pub total_users: usize,
    pub active_users: usize,
    pub inactive_users: usize,
    pub admins: usize,
    pub regular_users: usize,
    pub average_age: Option<i64>,
}
