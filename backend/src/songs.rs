use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::{
    merge::update_record, CreateSongRequest, DeletedResponse, Envelope, Listing, MessagePayload,
    SongDto, SongPayload, SongsReport, UpdateSongRequest,
};
use validator::Validate;

use crate::error::AppError;
use crate::extractors::{ApiJson, AuthUser};
use crate::report::songs_by_author;
use crate::repository::{duplicate_title_message, NewSong};
use crate::web_server::AppState;

pub const INVALID_SONG_MESSAGE: &str = "Completar los campos correctamente";
pub const SONG_NOT_FOUND: &str = "Cancion no encontrada";

// --- API Handlers ---

/// ## List every song
#[utoipa::path(
    get,
    path = "/api/songs/all",
    tag = "songs",
    responses(
        (status = 200, description = "`{ message, payload }` with every song", body = [SongDto]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_all_songs(State(state): State<AppState>) -> Result<Json<Listing<Vec<SongDto>>>, AppError> {
    tracing::info!("Fetching all songs");
    let songs = state.songs.get_all().await?;
    Ok(Json(Listing {
        message: "OK - Lista de canciones:".to_string(),
        payload: songs,
    }))
}

#[utoipa::path(
    get,
    path = "/api/songs/song/{id}",
    tag = "songs",
    params(("id" = String, Path, description = "Song id")),
    responses(
        (status = 200, description = "`{ message, payload }` with the song", body = SongDto),
        (status = 404, description = "Song not found")
    )
)]
pub async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Listing<SongDto>>, AppError> {
    tracing::info!("Fetching song with id: {}", id);
    let song = state
        .songs
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(SONG_NOT_FOUND.to_string()))?;
    Ok(Json(Listing {
        message: "OK".to_string(),
        payload: song,
    }))
}

/// ## Create a song
/// The authenticated caller becomes its creator.
#[utoipa::path(
    post,
    path = "/api/songs/create",
    tag = "songs",
    request_body = CreateSongRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Song created", body = SongPayload),
        (status = 401, description = "Authentication required"),
        (status = 409, description = "A song with this title already exists"),
        (status = 422, description = "Invalid fields"),
    )
)]
pub async fn create_song(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateSongRequest>,
) -> Result<(StatusCode, Json<Envelope<SongPayload>>), AppError> {
    payload
        .validate()
        .map_err(|errors| AppError::invalid_fields(INVALID_SONG_MESSAGE, errors))?;

    let new_song = NewSong {
        title: payload.title.clone().unwrap_or_default(),
        author: payload.author.clone().unwrap_or_default(),
        release_year: payload.year(),
        language: payload.language.clone(),
        category: payload.category.clone().unwrap_or_default(),
        created_by: user.id.clone(),
    };

    // Read-then-write: two concurrent creators can both pass this check; the
    // unique index turns the loser into a 409 as well.
    if state.songs.get_by_title(&new_song.title).await?.is_some() {
        return Err(AppError::Conflict(duplicate_title_message(&new_song.title)));
    }

    tracing::info!("Creating song '{}' for user {}", new_song.title, user.id);
    let song = state.songs.create(new_song).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            ok: true,
            payload: SongPayload {
                message: format!("La canción: {} fue creada exitosamente", song.title),
                song,
            },
        }),
    ))
}

/// ## Update a song
/// Only the fields present in the body change. Restricted to the creator or an admin.
#[utoipa::path(
    patch,
    path = "/api/songs/update",
    tag = "songs",
    request_body = UpdateSongRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Song updated", body = SongPayload),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller is neither the creator nor an admin"),
        (status = 404, description = "Song not found"),
        (status = 409, description = "Another song already has this title"),
        (status = 422, description = "Missing id or invalid fields"),
    )
)]
pub async fn update_song(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpdateSongRequest>,
) -> Result<Json<Envelope<SongPayload>>, AppError> {
    let Some(id) = payload.id.clone().filter(|id| !id.is_empty()) else {
        return Err(AppError::invalid_fields(
            "El id es obligatorio para actualizar la cancion",
            Default::default(),
        ));
    };
    payload
        .validate()
        .map_err(|errors| AppError::invalid_fields(INVALID_SONG_MESSAGE, errors))?;

    tracing::info!("Updating song with id: {}", id);
    let song = state
        .songs
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Canción no encontrada".to_string()))?;

    if !user.can_act_on(&song.created_by) {
        tracing::warn!("User {} may not update song {}", user.id, id);
        return Err(AppError::Forbidden(
            "No tienes permisos para actualizar esta canción".to_string(),
        ));
    }

    let updated: SongDto = update_record(&song, &payload.patch())?;
    if updated.title != song.title {
        if let Some(other) = state.songs.get_by_title(&updated.title).await? {
            if other.id != song.id {
                return Err(AppError::Conflict(duplicate_title_message(&updated.title)));
            }
        }
    }

    let saved = state
        .songs
        .update(&updated)
        .await?
        .ok_or_else(|| AppError::NotFound("Canción no encontrada".to_string()))?;

    Ok(Json(Envelope {
        ok: true,
        payload: SongPayload {
            message: format!("La canción: {} fue actualizada exitosamente", saved.title),
            song: saved,
        },
    }))
}

#[utoipa::path(
    delete,
    path = "/api/songs/delete/{id}",
    tag = "songs",
    params(("id" = String, Path, description = "Song id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Song deleted", body = DeletedResponse),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Song not found")
    )
)]
pub async fn delete_song(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    tracing::info!("User {} deleting song with id: {}", user.id, id);
    let song = state
        .songs
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("La cancion no existe".to_string()))?;

    if !state.songs.delete(&id).await? {
        return Err(AppError::NotFound("La cancion no existe".to_string()));
    }

    Ok(Json(DeletedResponse {
        code: 200,
        ok: true,
        payload: MessagePayload {
            message: format!("La cancion :{} ha sido borrada con exito", song.title),
        },
    }))
}

/// ## Songs grouped by author
/// Per author: song count, release years, category counts, floored average year
/// and the most frequent category.
#[utoipa::path(
    get,
    path = "/api/songs/report/songs-by-author",
    tag = "songs",
    responses(
        (status = 200, description = "Report keyed by author", body = SongsReport),
        (status = 404, description = "There are no songs")
    )
)]
pub async fn songs_report_by_author(State(state): State<AppState>) -> Result<Json<SongsReport>, AppError> {
    let songs = state.songs.get_all().await?;
    if songs.is_empty() {
        return Err(AppError::NoData("No hay canciones disponibles.".to_string()));
    }

    Ok(Json(SongsReport {
        ok: true,
        reporte: songs_by_author(&songs),
    }))
}
