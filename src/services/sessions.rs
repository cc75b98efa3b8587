//! Anonymous visitor sessions holding a per-session visit counter

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use redis::Client;
use uuid::Uuid;

use crate::{
    config::SessionsConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
enum SessionStore {
    Redis(Client),
    Memory(Arc<Mutex<MemorySessions>>),
}

struct MemoryVisit {
    count: i64,
    last_seen: Instant,
}

/// In-process sessions, expired after `ttl` and capped at `capacity` entries
struct MemorySessions {
    visits: HashMap<String, MemoryVisit>,
    ttl: Duration,
    capacity: usize,
}

impl MemorySessions {
    fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            visits: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn record(&mut self, session_id: &str, now: Instant) -> i64 {
        let ttl = self.ttl;
        let live = |visit: &MemoryVisit| now.duration_since(visit.last_seen) < ttl;

        if let Some(visit) = self.visits.get_mut(session_id) {
            if live(visit) {
                visit.count += 1;
                visit.last_seen = now;
                return visit.count;
            }
        }
        self.visits.remove(session_id);

        if self.visits.len() >= self.capacity {
            self.visits.retain(|_, visit| live(visit));
        }
        while self.visits.len() >= self.capacity {
            let oldest = self
                .visits
                .iter()
                .min_by_key(|(_, visit)| visit.last_seen)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => self.visits.remove(&key),
                None => break,
            };
        }

        self.visits.insert(
            session_id.to_string(),
            MemoryVisit {
                count: 1,
                last_seen: now,
            },
        );
        1
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.visits.len()
    }
}

#[derive(Clone)]
pub struct SessionsService {
    store: SessionStore,
    cookie_name: String,
    ttl_seconds: u64,
}

impl SessionsService {
    /// Connect to Redis when a URL is configured, otherwise keep sessions in memory
    pub async fn new(config: &SessionsConfig) -> AppResult<Self> {
        let store = match config.redis_url.as_deref() {
            Some(url) => {
                let client = Client::open(url).map_err(|e| {
                    AppError::Internal(format!("Failed to create Redis client: {}", e))
                })?;

                let mut conn = client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;
                redis::cmd("PING")
                    .query_async::<_, String>(&mut conn)
                    .await
                    .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

                tracing::info!("Sessions stored in Redis");
                SessionStore::Redis(client)
            }
            None => {
                tracing::info!(
                    capacity = config.max_memory_sessions,
                    "Sessions stored in memory"
                );
                SessionStore::Memory(Arc::new(Mutex::new(MemorySessions::new(
                    Duration::from_secs(config.ttl_seconds),
                    config.max_memory_sessions,
                ))))
            }
        };

        Ok(Self {
            store,
            cookie_name: config.cookie_name.clone(),
            ttl_seconds: config.ttl_seconds,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Fresh random session key
    pub fn new_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Increment and return the visit count of a session
    pub async fn record_visit(&self, session_id: &str) -> AppResult<i64> {
        match &self.store {
            SessionStore::Redis(client) => {
                let mut conn = client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))?;

                let key = format!("session:{}:num_visits", session_id);
                let (count,): (i64,) = redis::pipe()
                    .atomic()
                    .incr(&key, 1)
                    .expire(&key, self.ttl_seconds as i64)
                    .ignore()
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to update session in Redis: {}", e)))?;
                Ok(count)
            }
            SessionStore::Memory(visits) => {
                let mut visits = visits
                    .lock()
                    .map_err(|_| AppError::Internal("Session store poisoned".to_string()))?;
                Ok(visits.record(session_id, Instant::now()))
            }
        }
    }
}
