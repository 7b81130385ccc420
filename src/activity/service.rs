use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use super::{
    config::ActivityConfig,
    source::{synthetic_year, ContributionSource, ContributionsApi},
    ActivityError, ContributionData, DayRecord,
};

static GLOBAL_ACTIVITY_SERVICE: OnceLock<ActivityService> = OnceLock::new();

/// Install the process-wide service. Later calls are ignored.
pub fn init(config: ActivityConfig) -> Result<(), ActivityError> {
    let service = ActivityService::new(ContributionsApi::new(&config)?, config);
    if GLOBAL_ACTIVITY_SERVICE.set(service).is_err() {
        log::warn!("activity service already initialised");
    }
    Ok(())
}

pub fn global() -> Option<&'static ActivityService> {
    GLOBAL_ACTIVITY_SERVICE.get()
}

/// Live results per identity, kept for a fixed TTL.
pub struct ContributionCache {
    ttl: Duration,
    entries: DashMap<String, (Instant, Vec<DayRecord>)>,
}

impl ContributionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, username: &str) -> Option<Vec<DayRecord>> {
        if let Some(entry) = self.entries.get(username) {
            let (stored_at, days) = &*entry;
            if stored_at.elapsed() < self.ttl {
                return Some(days.clone());
            }
        }
        self.entries
            .remove_if(username, |_, (stored_at, _)| stored_at.elapsed() >= self.ttl);
        None
    }

    /// Also drops every expired entry so one-off identities don't pile up.
    pub fn insert(&self, username: &str, days: Vec<DayRecord>) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries
            .retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        self.entries
            .insert(username.to_string(), (Instant::now(), days));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct ActivityService<S = ContributionsApi> {
    source: S,
    config: ActivityConfig,
    cache: ContributionCache,
    rng: Mutex<StdRng>,
}

impl<S: ContributionSource> ActivityService<S> {
    pub fn new(source: S, config: ActivityConfig) -> Self {
        Self::with_rng(source, config, StdRng::from_entropy())
    }

    /// Same as [`ActivityService::new`] but with a fixed random source for the fallback.
    pub fn with_rng(source: S, config: ActivityConfig, rng: StdRng) -> Self {
        Self {
            cache: ContributionCache::new(config.cache_ttl),
            source,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &ActivityConfig {
        &self.config
    }

    pub async fn load(&self, username: &str) -> ContributionData {
        self.load_at(username, Utc::now().date_naive()).await
    }

    /// Load a year of activity for `username`; `today` anchors any fallback data.
    pub async fn load_at(&self, username: &str, today: NaiveDate) -> ContributionData {
        let username = username.trim();
        if let Some(days) = self.cache.get(username) {
            return ContributionData::Live(days);
        }
        match self.fetch(username).await {
            Ok(days) => {
                self.cache.insert(username, days.clone());
                ContributionData::Live(days)
            }
            Err(e) if self.config.fallback => {
                log::warn!("contributions for {username:?} unavailable, using sample data: {e}");
                ContributionData::Fallback(self.synthetic(today))
            }
            Err(e) => {
                log::warn!("contributions for {username:?} unavailable: {e}");
                ContributionData::Unavailable
            }
        }
    }

    async fn fetch(&self, username: &str) -> Result<Vec<DayRecord>, ActivityError> {
        if username.is_empty() {
            return Err(ActivityError::Empty);
        }
        if !is_valid_identity(username) {
            return Err(ActivityError::Malformed(format!(
                "{username:?} isn't a valid identity"
            )));
        }
        let days = self.source.fetch(username).await?;
        if days.is_empty() {
            return Err(ActivityError::Empty);
        }
        Ok(days)
    }

    fn synthetic(&self, today: NaiveDate) -> Vec<DayRecord> {
        match self.rng.lock() {
            Ok(mut rng) => synthetic_year(today, &mut *rng),
            Err(poisoned) => synthetic_year(today, &mut *poisoned.into_inner()),
        }
    }
}

/// GitHub logins: ASCII letters, digits and hyphens, at most 39 chars.
fn is_valid_identity(username: &str) -> bool {
    username.len() <= 39
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
