use crate::calendar::{MonthView, YearMonth, render_month};
use crate::cloud::{self, SaveOutcome};
use crate::errors::AppError;
use crate::models::{
    CalendarQuery, ClearAllRequest, CloudResponse, CommentRequest, DateKey, EmojiRequest,
    EmojiResponse, Mood, MoodRecord, MoodStore, SelectRequest, SelectionResponse, SetMoodRequest,
    StatusResponse, TokenRequest,
};
use crate::state::{AppState, STATUS_NOT_CONNECTED, STATUS_REMOTE_DISABLED, Session};
use crate::storage::{self, persist_moods};
use crate::ui::{PageContext, render_index};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct EmojiForm {
    #[serde(default)]
    pub emoji: String,
    pub mood: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct GotoForm {
    pub year: i32,
    pub month: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub confirm: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub token: String,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let token_configured = storage::load_token(&state.config.token_path).await.is_some();
    let session = state.data.lock().await;
    let view = render_month(
        session.view.current,
        &session.store,
        &session.selection,
        today(),
    );
    let selected = session.selection.active();
    let selected_comment = selected
        .and_then(|key| session.store.get(&key))
        .map(|record| record.comment.as_str())
        .unwrap_or("");

    Html(render_index(&PageContext {
        view: &view,
        status: &session.status,
        notice: session.notice.as_deref(),
        selected: selected.map(|key| key.to_string()),
        selected_comment,
        token_configured,
        remote_configured: state.sync.is_some(),
    }))
}

pub async fn select_day(
    State(state): State<AppState>,
    Form(form): Form<SelectForm>,
) -> Result<Redirect, AppError> {
    apply_select(&state, &form.date).await?;
    Ok(Redirect::to("/"))
}

pub async fn pick_emoji(
    State(state): State<AppState>,
    Form(form): Form<EmojiForm>,
) -> Result<Redirect, AppError> {
    let mood = match form.mood.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(label) => Some(label.parse::<Mood>().map_err(AppError::bad_request)?),
    };
    remember_rejection(&state, apply_emoji(&state, &form.emoji, mood).await).await?;
    Ok(Redirect::to("/"))
}

pub async fn save_comment(
    State(state): State<AppState>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let active = state.data.lock().await.selection.active();
    let result = match active {
        Some(key) => apply_comment(&state, &key, form.comment).await.map(|_| ()),
        None => Err(AppError::bad_request("select a day first")),
    };
    remember_rejection(&state, result).await?;
    Ok(Redirect::to("/"))
}

pub async fn nav_prev(State(state): State<AppState>) -> Redirect {
    state.data.lock().await.view.prev();
    Redirect::to("/")
}

pub async fn nav_next(State(state): State<AppState>) -> Redirect {
    state.data.lock().await.view.next();
    Redirect::to("/")
}

pub async fn nav_goto(State(state): State<AppState>, Form(form): Form<GotoForm>) -> Redirect {
    state.data.lock().await.view.goto(form.year, form.month);
    Redirect::to("/")
}

pub async fn clear_all(
    State(state): State<AppState>,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect, AppError> {
    let confirmed = form.confirm.as_deref() == Some("yes");
    remember_rejection(&state, apply_clear_all(&state, confirmed).await).await?;
    Ok(Redirect::to("/"))
}

pub async fn set_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Redirect, AppError> {
    remember_rejection(&state, apply_set_token(&state, &form.token).await).await?;
    Ok(Redirect::to("/"))
}

pub async fn clear_token(State(state): State<AppState>) -> Result<Redirect, AppError> {
    apply_clear_token(&state).await?;
    Ok(Redirect::to("/"))
}

pub async fn cloud_save(State(state): State<AppState>) -> Redirect {
    cloud::save_remote(&state).await;
    Redirect::to("/")
}

pub async fn cloud_load(State(state): State<AppState>) -> Redirect {
    cloud::load_remote(&state).await;
    Redirect::to("/")
}

pub async fn download(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = state.data.lock().await;
    let body = serde_json::to_string_pretty(&session.store)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8"),
            (header::CONTENT_DISPOSITION, r#"attachment; filename="moods.json""#),
        ],
        body,
    ))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Json<MonthView> {
    let session = state.data.lock().await;
    let current = session.view.current;
    let ym = match (query.year, query.month) {
        (None, None) => current,
        (year, month) => YearMonth::new(
            year.unwrap_or(current.year),
            month.unwrap_or(i64::from(current.month)),
        ),
    };
    Json(render_month(ym, &session.store, &session.selection, today()))
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let token_configured = storage::load_token(&state.config.token_path).await.is_some();
    let session = state.data.lock().await;
    Json(StatusResponse {
        status: session.status.clone(),
        notice: session.notice.clone(),
        selected: session.selection.active().map(|key| key.to_string()),
        year: session.view.current.year,
        month: session.view.current.month,
        token_configured,
        remote_configured: state.sync.is_some(),
    })
}

pub async fn get_moods(State(state): State<AppState>) -> Json<MoodStore> {
    Json(state.data.lock().await.store.clone())
}

pub async fn put_mood(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<SetMoodRequest>,
) -> Result<Json<MoodRecord>, AppError> {
    let key: DateKey = key.parse()?;
    let emoji = payload
        .emoji
        .map(|emoji| emoji.trim().to_string())
        .filter(|emoji| !emoji.is_empty())
        .or_else(|| payload.mood.map(|mood| mood.emoji().to_string()))
        .ok_or_else(|| AppError::bad_request("emoji or mood is required"))?;
    let mood = payload.mood.or_else(|| Mood::from_emoji(&emoji));

    let mut session = state.data.lock().await;
    let mut store = session.store.clone();
    let record = store.set_mood(&key, emoji, mood, payload.comment).clone();
    commit_store(&state, &mut session, store).await?;
    Ok(Json(record))
}

pub async fn delete_mood(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    let key: DateKey = key.parse()?;
    let mut session = state.data.lock().await;
    let mut store = session.store.clone();
    if store.clear_mood(&key).is_some() {
        commit_store(&state, &mut session, store).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_comment(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<MoodRecord>, AppError> {
    let key: DateKey = key.parse()?;
    let record = apply_comment(&state, &key, payload.comment).await?;
    Ok(Json(record))
}

pub async fn api_select(
    State(state): State<AppState>,
    Json(payload): Json<SelectRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    let key = apply_select(&state, &payload.date).await?;
    Ok(Json(SelectionResponse {
        selected: Some(key.to_string()),
    }))
}

pub async fn api_emoji(
    State(state): State<AppState>,
    Json(payload): Json<EmojiRequest>,
) -> Result<Json<EmojiResponse>, AppError> {
    let response = apply_emoji(&state, &payload.emoji, payload.mood).await?;
    Ok(Json(response))
}

pub async fn api_clear_all(
    State(state): State<AppState>,
    Json(payload): Json<ClearAllRequest>,
) -> Result<StatusCode, AppError> {
    apply_clear_all(&state, payload.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_cloud_save(State(state): State<AppState>) -> Json<CloudResponse> {
    let outcome = cloud::save_remote(&state).await;
    if outcome == SaveOutcome::AlreadyInFlight {
        info!("duplicate save request ignored");
    }
    Json(CloudResponse {
        status: state.data.lock().await.status.clone(),
    })
}

pub async fn api_cloud_load(State(state): State<AppState>) -> Json<CloudResponse> {
    Json(CloudResponse {
        status: cloud::load_remote(&state).await,
    })
}

pub async fn api_set_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<CloudResponse>, AppError> {
    apply_set_token(&state, &payload.token).await?;
    Ok(Json(CloudResponse {
        status: state.data.lock().await.status.clone(),
    }))
}

pub async fn api_clear_token(State(state): State<AppState>) -> Result<Json<CloudResponse>, AppError> {
    apply_clear_token(&state).await?;
    Ok(Json(CloudResponse {
        status: state.data.lock().await.status.clone(),
    }))
}

async fn apply_select(state: &AppState, date: &str) -> Result<DateKey, AppError> {
    let key: DateKey = date.parse()?;
    let mut session = state.data.lock().await;
    session.selection.select_day(key);
    session.notice = None;
    Ok(key)
}

async fn apply_emoji(
    state: &AppState,
    emoji: &str,
    mood: Option<Mood>,
) -> Result<EmojiResponse, AppError> {
    let mut session = state.data.lock().await;
    let mut store = session.store.clone();
    let outcome = session.selection.pick_emoji(&mut store, emoji, mood)?;
    commit_store(state, &mut session, store).await?;

    let key = outcome.key();
    Ok(EmojiResponse {
        date: key.to_string(),
        record: session.store.get(&key).cloned(),
    })
}

async fn apply_comment(
    state: &AppState,
    key: &DateKey,
    comment: String,
) -> Result<MoodRecord, AppError> {
    let mut session = state.data.lock().await;
    let mut store = session.store.clone();
    let record = store.set_comment(key, comment)?.clone();
    commit_store(state, &mut session, store).await?;
    Ok(record)
}

async fn apply_clear_all(state: &AppState, confirmed: bool) -> Result<(), AppError> {
    if !confirmed {
        return Err(AppError::bad_request(
            "clearing every mood needs explicit confirmation",
        ));
    }
    let mut session = state.data.lock().await;
    storage::remove_moods(&state.config.data_path).await?;
    session.store.clear();
    session.notice = None;
    info!("all moods cleared");
    Ok(())
}

async fn apply_set_token(state: &AppState, token: &str) -> Result<(), AppError> {
    storage::save_token(&state.config.token_path, token).await?;
    state.set_status("Token saved").await;
    Ok(())
}

async fn apply_clear_token(state: &AppState) -> Result<(), AppError> {
    storage::clear_token(&state.config.token_path).await?;
    let status = if state.sync.is_some() {
        STATUS_NOT_CONNECTED
    } else {
        STATUS_REMOTE_DISABLED
    };
    state.set_status(status).await;
    Ok(())
}

/// Writes the edited copy to disk and only then swaps it into the session.
async fn commit_store(
    state: &AppState,
    session: &mut Session,
    store: MoodStore,
) -> Result<(), AppError> {
    persist_moods(&state.config.data_path, &store).await?;
    session.store = store;
    session.notice = None;
    Ok(())
}

/// The page shows user mistakes inline; anything else is still an error response.
async fn remember_rejection(
    state: &AppState,
    result: Result<impl Sized, AppError>,
) -> Result<(), AppError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.status == StatusCode::BAD_REQUEST => {
            state.set_notice(Some(err.message)).await;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
