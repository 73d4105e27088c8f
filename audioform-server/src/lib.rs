//! audioform-server library
//!
//! Audio-guided intake form: a three-step wizard per visitor, an engagement
//! tracker over two clips, a submission gateway in front of a pluggable store,
//! and a reporting dashboard over stored submissions.

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod audio;
pub mod engagement;
pub mod gateway;
pub mod reporting;
pub mod state;
pub mod store;
pub mod wizard;

pub use state::{AppSettings, AppState, SessionRegistry};

/// Build application router
///
/// Health, pages and the wizard API are public. The reporting API requires
/// the dashboard token when one is configured.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post, put};

    // Protected routes (require dashboard token)
    let protected = Router::new()
        .route("/api/responses", get(api::list_responses))
        .route("/api/responses/export.csv", get(api::export_responses))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let sessions = Router::new()
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/:id", get(api::get_session))
        .route("/api/sessions/:id/start", post(api::start_session))
        .route("/api/sessions/:id/fields", put(api::update_fields))
        .route("/api/sessions/:id/continue", post(api::continue_to_employment))
        .route("/api/sessions/:id/answer", post(api::answer))
        .route("/api/sessions/:id/audio/:clip/started", post(api::audio_started))
        .route("/api/sessions/:id/audio/:clip/failed", post(api::audio_failed))
        .route("/api/sessions/:id/audio/:clip/ended", post(api::audio_ended))
        .route("/api/sessions/:id/audio/:clip/replay", post(api::audio_replay))
        .route("/api/sessions/:id/error", delete(api::dismiss_error));

    let public = Router::new()
        .route("/thank-you", get(api::serve_thank_you))
        .route("/dashboard", get(api::serve_dashboard))
        .route("/static/form.js", get(api::serve_form_js))
        .route("/static/dashboard.js", get(api::serve_dashboard_js))
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes());

    let audio = ServeDir::new(&state.settings.audio_dir);

    Router::new()
        .merge(protected)
        .merge(sessions)
        .merge(public)
        .nest_service("/audio", audio)
        .fallback(api::tenant_fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
