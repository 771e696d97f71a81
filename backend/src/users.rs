use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bcrypt::{hash, verify};
use common::{
    merge::update_record, CreateUserRequest, Credentials, DeletedResponse, Envelope, Listing,
    LoginResponse, MessagePayload, SessionUser, StatusRequest, UpdateUserRequest, UserDto,
    UserIndicators, UserPayload,
};
use validator::Validate;

use crate::auth::sign_token;
use crate::error::AppError;
use crate::extractors::{ApiJson, AuthUser};
use crate::report::user_indicators;
use crate::repository::{NewUser, DUPLICATE_EMAIL_MESSAGE};
use crate::web_server::AppState;

/// bcrypt work factor for stored passwords.
pub const PASSWORD_HASH_COST: u32 = 10;

pub const INVALID_USER_MESSAGE: &str = "Datos inválidos. Verifica los campos obligatorios.";
pub const INVALID_CREDENTIALS: &str = "Credenciales inválidas";
pub const INACTIVE_USER: &str = "Usuario inactivo";
pub const USER_NOT_FOUND: &str = "Usuario no encontrado";

fn forbidden() -> AppError {
    AppError::Forbidden("No tienes permisos para realizar esta acción".to_string())
}

// --- API Handlers ---

/// ## Register a new user
/// Takes name, lastname, email and password, hashes the password, and stores the user.
#[utoipa::path(
    post,
    path = "/api/users/create",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserPayload),
        (status = 409, description = "User with this email already exists"),
        (status = 422, description = "Invalid data provided"),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<Envelope<UserPayload>>), AppError> {
    // Validate the incoming payload
    payload
        .validate()
        .map_err(|errors| AppError::invalid_fields(INVALID_USER_MESSAGE, errors))?;

    let email = payload.email.clone().unwrap_or_default();
    tracing::info!("Registering user with email: {}", &email);

    // Check if user already exists
    if state.users.get_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
    }

    // Hash the password
    let password = payload.password.as_deref().unwrap_or_default();
    let password_hash = hash(password, PASSWORD_HASH_COST)?;

    let user = state
        .users
        .create(NewUser {
            name: payload.name.clone().unwrap_or_default(),
            lastname: payload.lastname.clone().unwrap_or_default(),
            email,
            password_hash,
            age: payload.age,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            ok: true,
            payload: UserPayload {
                message: format!("Usuario {} creado exitosamente", user.name),
                user,
            },
        }),
    ))
}

/// ## Login an existing user
/// Takes email and password, verifies them, and returns a JWT if successful.
/// Unknown emails and wrong passwords share one answer; inactive accounts get their own.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials or inactive user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.validate().is_err() {
        return Err(AppError::BadRequest(
            "Email y contraseña son requeridos".to_string(),
        ));
    }

    tracing::info!("Logging in user with email: {}", &payload.email);
    let user = state
        .users
        .get_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !user.is_active {
        tracing::warn!("Login attempt on inactive account {}", user.id);
        return Err(AppError::Unauthorized(INACTIVE_USER.to_string()));
    }

    if !verify(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let session = AuthUser {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role()?,
    };
    let token = sign_token(&session, &state.app_config.jwt)?;

    Ok(Json(LoginResponse {
        ok: true,
        message: "Login exitoso".to_string(),
        token,
        user: SessionUser {
            id: session.id,
            name: session.name,
            email: session.email,
            role: session.role,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/all",
    tag = "users",
    responses(
        (status = 200, description = "`{ message, payload }` with every user", body = [UserDto]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_all_users(State(state): State<AppState>) -> Result<Json<Listing<Vec<UserDto>>>, AppError> {
    tracing::info!("Fetching all users");
    let users = state.users.get_all().await?;
    Ok(Json(Listing {
        message: "OK".to_string(),
        payload: users,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/user/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "`{ message, payload }` with the user", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Listing<UserDto>>, AppError> {
    tracing::info!("Fetching user with id: {}", id);
    let user = state
        .users
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?
        .into_dto()?;
    Ok(Json(Listing {
        message: "OK".to_string(),
        payload: user,
    }))
}

/// ## Update a user profile
/// Users may edit themselves; admins may edit anyone and are the only ones allowed to change roles.
#[utoipa::path(
    patch,
    path = "/api/users/update",
    tag = "users",
    request_body = UpdateUserRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User updated", body = UserPayload),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not allowed to edit this user or its role"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Missing id or invalid fields"),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<Envelope<UserPayload>>, AppError> {
    let Some(id) = payload.id.clone().filter(|id| !id.is_empty()) else {
        return Err(AppError::invalid_fields(
            "El id es obligatorio para actualizar el usuario",
            Default::default(),
        ));
    };
    payload
        .validate()
        .map_err(|errors| AppError::invalid_fields(INVALID_USER_MESSAGE, errors))?;

    tracing::info!("User {} updating user {}", caller.id, id);
    let current = state
        .users
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?
        .into_dto()?;

    if !caller.can_act_on(&current.id) {
        return Err(forbidden());
    }
    if payload.role.is_some_and(|role| role != current.role) && !caller.is_admin() {
        return Err(AppError::Forbidden(
            "Solo un administrador puede cambiar el rol".to_string(),
        ));
    }

    if let Some(email) = payload.new_email().filter(|email| *email != current.email) {
        if state.users.get_by_email(email).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
        }
    }

    let password_hash = payload
        .new_password()
        .map(|password| hash(password, PASSWORD_HASH_COST))
        .transpose()?;

    let updated: UserDto = update_record(&current, &payload.patch())?;
    let saved = state
        .users
        .update(&updated, password_hash.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(Envelope {
        ok: true,
        payload: UserPayload {
            message: format!("Usuario {} actualizado exitosamente", saved.name),
            user: saved,
        },
    }))
}

/// ## Activate or deactivate a user
/// Admin only. Without a body the current state is flipped.
#[utoipa::path(
    patch,
    path = "/api/users/status/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = StatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Status updated", body = UserPayload),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    payload: Option<ApiJson<StatusRequest>>,
) -> Result<Json<Envelope<UserPayload>>, AppError> {
    if !caller.is_admin() {
        return Err(forbidden());
    }

    let current = state
        .users
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    let is_active = payload
        .and_then(|ApiJson(request)| request.is_active)
        .unwrap_or(!current.is_active);
    tracing::info!("Admin {} setting user {} active={}", caller.id, id, is_active);

    let user = state
        .users
        .update_status(&id, is_active)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(Envelope {
        ok: true,
        payload: UserPayload {
            message: "Estado del usuario actualizado".to_string(),
            user,
        },
    }))
}

#[utoipa::path(
    delete,
    path = "/api/users/delete/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User deleted", body = DeletedResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not allowed to delete this user"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let user = state
        .users
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    if !caller.can_act_on(&user.id) {
        return Err(forbidden());
    }

    tracing::info!("User {} deleting user {}", caller.id, id);
    if !state.users.delete(&id).await? {
        return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
    }

    Ok(Json(DeletedResponse {
        code: 200,
        ok: true,
        payload: MessagePayload {
            message: format!("El usuario {} ha sido borrado con exito", user.name),
        },
    }))
}

/// ## User indicators
/// Totals by state and role, plus the floored average age. Admin only.
#[utoipa::path(
    get,
    path = "/api/users/indicators/users",
    tag = "users",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Indicators", body = UserIndicators),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_user_indicators(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Envelope<UserIndicators>>, AppError> {
    if !caller.is_admin() {
        return Err(forbidden());
    }

    let users = state.users.get_all().await?;
    Ok(Json(Envelope {
        ok: true,
        payload: user_indicators(&users),
    }))
}
