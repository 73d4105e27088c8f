//! Wizard session endpoints
//!
//! Each call applies one transition under the registry lock and returns the
//! resulting [`SessionView`], including any playback commands the page must
//! run. The terminal answer releases the lock while the store write runs.

use audioform_common::events::FormEvent;
use audioform_common::time;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::ApiError;
use crate::audio::{Clip, PlaybackCommand};
use crate::wizard::{FormSession, PersonalFields, SessionView};
use crate::AppState;

/// Page the browser navigates to after a stored submission
pub const THANK_YOU_PATH: &str = "/thank-you";

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Tenant route the visitor opened
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// `true` means the visitor answered "unemployed"
    pub employment_status: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaybackFailure {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub session_id: Uuid,
    pub submission_id: i64,
    pub redirect: &'static str,
    pub commands: Vec<PlaybackCommand>,
}

fn step_changed(state: &AppState, session: &FormSession) {
    state.events.emit_lossy(FormEvent::StepChanged {
        session_id: session.id(),
        step: session.step().to_string(),
        timestamp: time::now(),
    });
}

/// POST /api/sessions
///
/// Unknown tenant paths resolve to the default company.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> (StatusCode, Json<SessionView>) {
    let tenant = state
        .tenants
        .get(&request.path)
        .unwrap_or_else(|| state.tenants.default_tenant());
    let now = time::now();
    let session = FormSession::new(tenant.company.clone(), now);
    let view = session.view(Vec::new());

    info!("Session {} started for {} ({})", session.id(), tenant.company, tenant.path);
    state.events.emit_lossy(FormEvent::SessionStarted {
        session_id: session.id(),
        company: tenant.company.clone(),
        timestamp: now,
    });
    state.sessions.insert(session, now).await;

    (StatusCode::CREATED, Json(view))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .map(|session| Json(session.view(Vec::new())))
        .ok_or(ApiError::SessionNotFound(id))
}

/// POST /api/sessions/:id/start
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(id, time::now(), |session| {
            let commands = session.start()?;
            step_changed(&state, session);
            Ok(session.view(commands))
        })
        .await?;
    Ok(Json(view))
}

/// PUT /api/sessions/:id/fields
pub async fn update_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<PersonalFields>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(id, time::now(), |session| {
            session.update_fields(fields)?;
            Ok(session.view(Vec::new()))
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/continue
pub async fn continue_to_employment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(id, time::now(), |session| {
            let commands = session.continue_to_employment()?;
            step_changed(&state, session);
            Ok(session.view(commands))
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/answer
///
/// On success the session is discarded and the page is sent to the
/// confirmation route. On failure the session stays on the employment step
/// with the banner set, and the 502 body carries the restored view.
pub async fn answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnswerRequest>,
) -> Result<Json<SubmittedResponse>, ApiError> {
    let now = time::now();
    let (commands, request) = state
        .sessions
        .update(id, now, |session| {
            session
                .prepare_submission(body.employment_status, now)
                .map_err(ApiError::from)
        })
        .await?;

    match state.gateway.submit(&request).await {
        Ok(stored) => {
            state.sessions.remove(id).await;
            state.events.emit_lossy(FormEvent::SubmissionStored {
                session_id: id,
                company: stored.company.clone(),
                employment_status: stored.employment_status,
                timestamp: time::now(),
            });
            Ok(Json(SubmittedResponse {
                session_id: id,
                submission_id: stored.id,
                redirect: THANK_YOU_PATH,
                commands,
            }))
        }
        Err(e) => {
            let message = e.user_message();
            state.events.emit_lossy(FormEvent::SubmissionFailed {
                session_id: id,
                timestamp: time::now(),
            });
            let restored = state
                .sessions
                .update(id, time::now(), |session| {
                    session.submission_failed(message);
                    Ok(session.view(commands))
                })
                .await
                .ok();
            Err(ApiError::SubmissionFailed {
                message,
                session: restored.map(Box::new),
            })
        }
    }
}

/// POST /api/sessions/:id/audio/:clip/started
pub async fn audio_started(
    State(state): State<AppState>,
    Path((id, clip)): Path<(Uuid, Clip)>,
) -> Result<Json<SessionView>, ApiError> {
    let now = time::now();
    let view = state
        .sessions
        .update(id, now, |session| {
            session.playback_started(clip, now);
            Ok(session.view(Vec::new()))
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/audio/:clip/failed
///
/// The body is optional; `{"reason": "..."}` is logged when present.
pub async fn audio_failed(
    State(state): State<AppState>,
    Path((id, clip)): Path<(Uuid, Clip)>,
    body: Option<Json<PlaybackFailure>>,
) -> Result<Json<SessionView>, ApiError> {
    let failure = body.map(|Json(f)| f).unwrap_or_default();
    let reason = if failure.reason.is_empty() {
        "unknown"
    } else {
        failure.reason.as_str()
    };
    let view = state
        .sessions
        .update(id, time::now(), |session| {
            session.playback_failed(clip, reason);
            Ok(session.view(Vec::new()))
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/audio/:clip/ended
pub async fn audio_ended(
    State(state): State<AppState>,
    Path((id, clip)): Path<(Uuid, Clip)>,
) -> Result<Json<SessionView>, ApiError> {
    let now = time::now();
    let view = state
        .sessions
        .update(id, now, |session| {
            if let Some(secs) = session.audio_ended(clip, now) {
                debug!("Session {}: credited {}s for {} clip", id, secs, clip);
            }
            Ok(session.view(Vec::new()))
        })
        .await?;
    Ok(Json(view))
}

/// POST /api/sessions/:id/audio/:clip/replay
pub async fn audio_replay(
    State(state): State<AppState>,
    Path((id, clip)): Path<(Uuid, Clip)>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(id, time::now(), |session| {
            let commands = session.replay(clip)?;
            Ok(session.view(commands))
        })
        .await?;
    Ok(Json(view))
}

/// DELETE /api/sessions/:id/error
pub async fn dismiss_error(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(id, time::now(), |session| {
            session.dismiss_error();
            Ok(session.view(Vec::new()))
        })
        .await?;
    Ok(Json(view))
}
