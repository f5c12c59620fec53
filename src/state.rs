//! Application state: session store, prompts, limits and the optional completion service.
//!
//! Sessions live only in memory. Each one is replaced wholesale on every
//! transition; the lock is never held across a remote call. Sessions idle for
//! longer than `TestLimits::session_ttl_secs` are evicted by a background sweep.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{load_agent_config_from_env, AgentConfig, Prompts, TestLimits};
use crate::llm::CompletionService;
use crate::openai::OpenAI;
use crate::session::TestSession;

/// How often the background sweep looks for idle sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A stored session plus the last time anyone read or wrote it.
#[derive(Clone, Debug)]
pub struct SessionEntry {
    pub session: TestSession,
    pub touched: Instant,
}

impl SessionEntry {
    fn new(session: TestSession) -> Self {
        Self { session, touched: Instant::now() }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    pub llm: Option<Arc<dyn CompletionService>>,
    pub prompts: Prompts,
    pub limits: TestLimits,
}

impl AppState {
    /// Build state from env: load config and init the OpenAI client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        info!(
            target: "mocktest_backend",
            min_questions = cfg.limits.min_questions,
            max_questions = cfg.limits.max_questions,
            session_ttl_secs = cfg.limits.session_ttl_secs,
            "Test limits"
        );

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "mocktest_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "mocktest_backend", "OpenAI disabled (no OPENAI_API_KEY). Test generation and descriptive grading unavailable.");
        }

        Self::with_service(cfg, openai.map(|oa| Arc::new(oa) as Arc<dyn CompletionService>))
    }

    pub fn with_service(cfg: AgentConfig, llm: Option<Arc<dyn CompletionService>>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            llm,
            prompts: cfg.prompts,
            limits: cfg.limits,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.limits.session_ttl_secs)
    }

    /// Open a fresh session in `Configuring`.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> TestSession {
        let session = TestSession::new(Uuid::new_v4().to_string());
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), SessionEntry::new(session.clone()));
        session
    }

    /// Read a session and mark it as used.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: &str) -> Option<TestSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.touched = Instant::now();
        Some(entry.session.clone())
    }

    /// Store `next` unless the stored session moved past `version` (another
    /// transition, a reset or a removal). Returns whether the write happened.
    #[instrument(level = "debug", skip(self, next), fields(id = %next.id))]
    pub async fn store_if_current(&self, version: u64, next: TestSession) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&next.id) {
            Some(current) if current.session.version == version => {
                sessions.insert(next.id.clone(), SessionEntry::new(next));
                true
            }
            _ => false,
        }
    }

    /// Apply `f` to the stored session under the write lock.
    pub async fn update_session<F>(&self, id: &str, f: F) -> Option<TestSession>
    where
        F: FnOnce(TestSession) -> TestSession,
    {
        let mut sessions = self.sessions.write().await;
        let current = sessions.remove(id)?;
        let next = f(current.session);
        sessions.insert(id.to_string(), SessionEntry::new(next.clone()));
        Some(next)
    }

    pub async fn remove_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Drop every session idle for at least `ttl`. Returns how many were evicted.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.touched.elapsed() < ttl);
        before - sessions.len()
    }

    /// Run `evict_idle` with the configured TTL every `SWEEP_INTERVAL`.
    pub fn spawn_session_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        let ttl = self.session_ttl();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let evicted = state.evict_idle(ttl).await;
                if evicted > 0 {
                    info!(target: "mocktest_backend", evicted, "Idle sessions evicted");
                } else {
                    debug!(target: "mocktest_backend", "Session sweep found nothing idle");
                }
            }
        })
    }

    pub fn completion_service(&self) -> Option<&dyn CompletionService> {
        self.llm.as_deref()
    }
}
