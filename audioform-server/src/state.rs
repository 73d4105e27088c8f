//! Shared service state
//!
//! Live sessions are held only in memory. A session is removed once its
//! submission is stored; sessions left idle past the TTL are evicted the next
//! time a session is created.

use audioform_common::config::TomlConfig;
use audioform_common::events::EventBus;
use audioform_common::TenantTable;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::api::ApiError;
use crate::gateway::SubmissionGateway;
use crate::store::SubmissionStore;
use crate::wizard::FormSession;

/// In-memory session table
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, FormSession>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a new session, evicting idle ones first
    pub async fn insert(&self, session: FormSession, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_activity() < ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle session(s)", evicted);
        }
        sessions.insert(session.id(), session);
    }

    /// Run `f` against one session under the write lock
    pub async fn update<T>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut FormSession) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))?;
        session.touch(now);
        f(session)
    }

    pub async fn get(&self, id: Uuid) -> Option<FormSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<FormSession> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Settings handlers read at request time
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub redirect_delay_secs: u64,
    pub landing_path: String,
    pub dashboard_token: Option<String>,
    pub audio_dir: PathBuf,
}

impl AppSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            redirect_delay_secs: config.redirect_delay_secs,
            landing_path: config.landing_path.clone(),
            dashboard_token: config
                .dashboard_token
                .clone()
                .filter(|token| !token.is_empty()),
            audio_dir: config.audio_dir.clone(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub gateway: Arc<SubmissionGateway>,
    pub store: Arc<dyn SubmissionStore>,
    pub tenants: Arc<TenantTable>,
    pub events: EventBus,
    pub settings: Arc<AppSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        tenants: TenantTable,
        settings: AppSettings,
        submit_timeout: Duration,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(session_ttl)),
            gateway: Arc::new(SubmissionGateway::new(store.clone(), submit_timeout)),
            store,
            tenants: Arc::new(tenants),
            events: EventBus::new(100),
            settings: Arc::new(settings),
        }
    }

    /// State built from a loaded config and an already-opened store
    pub fn from_config(config: &TomlConfig, store: Arc<dyn SubmissionStore>) -> Self {
        Self::new(
            store,
            config.tenant_table(),
            AppSettings::from_config(config),
            config.submit_timeout(),
            config.session_ttl(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        let result = registry.update(id, t0(), |_| Ok(())).await;
        assert!(matches!(result, Err(ApiError::SessionNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted_on_insert() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let old = FormSession::new("HCS", t0());
        let old_id = old.id();
        registry.insert(old, t0()).await;

        let later = t0() + chrono::Duration::seconds(61);
        let fresh = FormSession::new("HCS", later);
        let fresh_id = fresh.id();
        registry.insert(fresh, later).await;

        assert!(registry.get(old_id).await.is_none());
        assert!(registry.get(fresh_id).await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_activity_keeps_session_alive() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let session = FormSession::new("HCS", t0());
        let id = session.id();
        registry.insert(session, t0()).await;

        let touched = t0() + chrono::Duration::seconds(50);
        registry.update(id, touched, |_| Ok(())).await.unwrap();

        let later = t0() + chrono::Duration::seconds(100);
        registry.insert(FormSession::new("HCS", later), later).await;
        assert!(registry.get(id).await.is_some());
    }

    #[test]
    fn test_empty_dashboard_token_disables_auth() {
        let mut config = TomlConfig::default();
        config.dashboard_token = Some(String::new());
        assert!(AppSettings::from_config(&config).dashboard_token.is_none());
    }
}
