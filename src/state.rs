//! Application state: config, backend client, renderer and the session store.
//!
//! Each browser tab gets a session id (uuid v4) carried as a hidden form field.
//! The store is capped at `max_sessions`; the least recently used session is
//! dropped on overflow. A post for an unknown but well-formed id gets a fresh
//! page, since every post carries the full form anyway.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::backend::Backend;
use crate::config::UiConfig;
use crate::error::{Result, UiError};
use crate::highlight::HighlightAdapter;
use crate::page::Page;
use crate::render::Renderer;

pub struct Session {
    pub page: Page,
    last_used: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<UiConfig>,
    pub backend: Backend,
    pub renderer: Renderer,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    clock: Arc<AtomicU64>,
}

impl AppState {
    #[instrument(level = "info", skip_all)]
    pub fn new(config: UiConfig) -> Result<Self> {
        let backend = Backend::from_config(&config)?;
        info!(
            target: "qgen_ui",
            backend_url = %backend.base_url,
            catalog_route = config.catalog_route.segment(),
            max_sessions = config.max_sessions,
            "Backend client ready"
        );
        Ok(Self {
            config: Arc::new(config),
            backend,
            renderer: Renderer::new(HighlightAdapter::default()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn sentinel(&self) -> &str {
        &self.config.key_sentinel
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register a new, empty session and return its id.
    pub async fn open_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        self.insert_capped(&mut sessions, id.clone());
        id
    }

    fn insert_capped(&self, sessions: &mut HashMap<String, Session>, id: String) {
        let cap = self.config.max_sessions.max(1);
        while sessions.len() >= cap {
            let Some(oldest) = sessions.iter().min_by_key(|(_, s)| s.last_used).map(|(k, _)| k.clone()) else {
                break;
            };
            sessions.remove(&oldest);
            debug!(target: "qgen_ui", session = %oldest, "Evicted least recently used session");
        }
        sessions.insert(id, Session { page: Page::default(), last_used: self.tick() });
    }

    /// Run `f` against the session's page under the write lock. Never await
    /// inside `f`.
    pub async fn with_page<R>(&self, id: &str, f: impl FnOnce(&mut Page) -> R) -> Result<R> {
        if Uuid::parse_str(id).is_err() {
            return Err(UiError::Setup("Session expired. Reload the page.".into()));
        }
        let now = self.tick();
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(id) {
            self.insert_capped(&mut sessions, id.to_string());
        }
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| UiError::Setup("Session expired. Reload the page.".into()))?;
        session.last_used = now;
        Ok(f(&mut session.page))
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(max_sessions: usize) -> AppState {
        AppState::new(UiConfig { max_sessions, ..UiConfig::default() }).unwrap()
    }

    #[tokio::test]
    async fn least_recently_used_session_is_evicted() {
        let s = state(2);
        let a = s.open_session().await;
        let b = s.open_session().await;
        // Touch `a` so `b` becomes the oldest.
        s.with_page(&a, |p| p.form.topic = "Arrays".into()).await.unwrap();
        let _c = s.open_session().await;

        assert_eq!(s.live_sessions().await, 2);
        assert_eq!(s.with_page(&a, |p| p.form.topic.clone()).await.unwrap(), "Arrays");
        // `b` is gone; touching it yields a fresh page.
        assert_eq!(s.with_page(&b, |p| p.form.topic.clone()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn malformed_session_id_is_rejected() {
        let s = state(10);
        let err = s.with_page("not-a-uuid", |_| ()).await.unwrap_err();
        assert!(matches!(err, UiError::Setup(_)));
        assert_eq!(s.live_sessions().await, 0);
    }
}
