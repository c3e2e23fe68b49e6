use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::auth::{CredentialStore, SessionSigner};
use crate::generative::ContentGenerator;
use crate::store::StoreProxy;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    proxy: StoreProxy,
    generator: Arc<dyn ContentGenerator>,
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<SessionSigner>,
}

impl AppState {
    pub fn new(
        proxy: StoreProxy,
        generator: Arc<dyn ContentGenerator>,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<SessionSigner>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            proxy,
            generator,
            credentials,
            sessions,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn proxy(&self) -> &StoreProxy {
        &self.proxy
    }

    pub fn generator(&self) -> &dyn ContentGenerator {
        self.generator.as_ref()
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.credentials)
    }

    pub fn sessions(&self) -> &SessionSigner {
        self.sessions.as_ref()
    }
}
