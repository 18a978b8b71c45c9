use crate::settings::Settings;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Server-side context for one authenticated browser. Holds the working copy
/// of the display settings so concurrent sessions never share mutable state.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub settings: Settings,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    idle_ttl: Option<TimeDelta>,
}

impl SessionStore {
    /// `idle_ttl_minutes == 0` keeps sessions until logout.
    pub fn new(idle_ttl_minutes: u64) -> Self {
        let idle_ttl = (idle_ttl_minutes > 0)
            .then(|| TimeDelta::try_minutes(idle_ttl_minutes as i64))
            .flatten();
        Self::with_ttl(idle_ttl)
    }

    pub fn with_ttl(idle_ttl: Option<TimeDelta>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn create(&self, settings: Settings) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_seen: now,
            settings,
        };

        let mut sessions = self.sessions.write().await;
        self.prune_expired(&mut sessions, now);
        sessions.insert(session.id.clone(), session.clone());
        info!("Session started ({} active)", sessions.len());

        session
    }

    /// Look up a live session and mark it as seen.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        self.prune_expired(&mut sessions, now);

        let session = sessions.get_mut(id)?;
        session.last_seen = now;
        Some(session.clone())
    }

    /// Whether `id` names a live session. Does not count as activity.
    pub async fn contains(&self, id: &str) -> bool {
        let sessions = self.sessions.read().await;
        match (sessions.get(id), self.idle_ttl) {
            (Some(session), Some(ttl)) => Utc::now() - session.last_seen <= ttl,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub async fn update_settings(&self, id: &str, settings: Settings) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        session.settings = settings;
        session.last_seen = Utc::now();
        Some(session.clone())
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            info!("Session ended ({} active)", sessions.len());
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn prune_expired(&self, sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) {
        let Some(ttl) = self.idle_ttl else {
            return;
        };

        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_seen <= ttl);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} idle sessions", pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ThemeMode;

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new(0);
        let first = store.create(Settings::default()).await;
        let second = store.create(Settings::default()).await;
        assert_ne!(first.id, second.id);

        let dark = Settings {
            theme_mode: ThemeMode::Dark,
            ..Settings::default()
        };
        store.update_settings(&first.id, dark).await.unwrap();

        assert_eq!(
            store.get(&first.id).await.unwrap().settings.theme_mode,
            ThemeMode::Dark
        );
        assert_eq!(
            store.get(&second.id).await.unwrap().settings.theme_mode,
            ThemeMode::Light
        );
    }

    #[tokio::test]
    async fn test_remove_session() {
        let store = SessionStore::new(0);
        let session = store.create(Settings::default()).await;

        assert!(store.remove(&session.id).await);
        assert!(!store.remove(&session.id).await);
        assert!(store.get(&session.id).await.is_none());
        assert!(!store.contains(&session.id).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::with_ttl(TimeDelta::try_milliseconds(20));
        let session = store.create(Settings::default()).await;
        assert!(store.get(&session.id).await.is_some());
        assert!(store.contains(&session.id).await);

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert!(!store.contains(&session.id).await);
        assert!(store.get(&session.id).await.is_none());
        assert_eq!(store.len().await, 0);
    }
}
