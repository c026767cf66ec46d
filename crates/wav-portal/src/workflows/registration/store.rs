use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::service::RegistrationError;
use super::wizard::RegistrationWizard;

pub const DEFAULT_WIZARD_TTL: Duration = Duration::from_secs(60 * 60);

/// Handle the client uses to address its own registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub Uuid);

impl RegistrationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub type SharedWizard = Arc<Mutex<RegistrationWizard>>;

#[derive(Debug)]
struct StoredWizard {
    wizard: SharedWizard,
    touched_at: Instant,
}

impl StoredWizard {
    fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.touched_at) >= ttl
    }
}

/// Live registration attempts. Each wizard sits behind its own lock so attempts never
/// contend with each other. Attempts left idle for longer than the TTL are dropped.
#[derive(Debug, Clone)]
pub struct WizardStore {
    ttl: Duration,
    wizards: Arc<Mutex<HashMap<RegistrationId, StoredWizard>>>,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_WIZARD_TTL)
    }
}

impl WizardStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            wizards: Arc::default(),
        }
    }

    pub fn create(&self) -> Result<(RegistrationId, SharedWizard), RegistrationError> {
        let now = Instant::now();
        let id = RegistrationId::generate();
        let wizard = Arc::new(Mutex::new(RegistrationWizard::new()));

        let mut map = self.map()?;
        let before = map.len();
        map.retain(|_, stored| !stored.is_stale(now, self.ttl));
        let evicted = before - map.len();
        if evicted > 0 {
            debug!(evicted, "dropped idle registration attempts");
        }
        map.insert(
            id,
            StoredWizard {
                wizard: Arc::clone(&wizard),
                touched_at: now,
            },
        );
        Ok((id, wizard))
    }

    /// Looks up a live attempt and marks it as active.
    pub fn get(&self, id: &RegistrationId) -> Result<SharedWizard, RegistrationError> {
        let now = Instant::now();
        let mut map = self.map()?;
        let stale = match map.get(id) {
            Some(stored) => stored.is_stale(now, self.ttl),
            None => return Err(RegistrationError::NotFound),
        };
        if stale {
            map.remove(id);
            return Err(RegistrationError::NotFound);
        }

        let stored = map.get_mut(id).ok_or(RegistrationError::NotFound)?;
        stored.touched_at = now;
        Ok(Arc::clone(&stored.wizard))
    }

    pub fn remove(&self, id: &RegistrationId) -> Result<(), RegistrationError> {
        self.map()?.remove(id);
        Ok(())
    }

    pub fn len(&self) -> Result<usize, RegistrationError> {
        Ok(self.map()?.len())
    }

    fn map(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<RegistrationId, StoredWizard>>, RegistrationError> {
        self.wizards
            .lock()
            .map_err(|_| RegistrationError::StatePoisoned)
    }
}

pub fn lock_wizard(
    wizard: &SharedWizard,
) -> Result<MutexGuard<'_, RegistrationWizard>, RegistrationError> {
    wizard.lock().map_err(|_| RegistrationError::StatePoisoned)
}
