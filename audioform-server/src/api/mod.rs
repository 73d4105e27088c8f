//! HTTP API handlers for audioform

pub mod auth;
pub mod error;
pub mod health;
pub mod pages;
pub mod responses;
pub mod sessions;
pub mod sse;

pub use auth::auth_middleware;
pub use error::ApiError;
pub use health::{get_build_info, health_routes};
pub use pages::{
    serve_dashboard, serve_dashboard_js, serve_form_js, serve_thank_you, tenant_fallback,
};
pub use responses::{export_responses, list_responses};
pub use sessions::{
    answer, audio_ended, audio_failed, audio_replay, audio_started, continue_to_employment,
    create_session, dismiss_error, get_session, start_session, update_fields,
};
pub use sse::event_stream;
