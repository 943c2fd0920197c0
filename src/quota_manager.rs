use anyhow::Result;
use chrono::{Datelike, NaiveDate, Utc};
use std::sync::Arc;

use crate::log_quota_event;
use crate::models::{QuotaStatus, RemainingQuota, ServiceMode, ServiceState};
use crate::storage::Storage;

/// Owns the process-wide [`ServiceState`] and gatekeeps every provider call.
///
/// Counters reset lazily: each quota check compares the current calendar
/// day/month against the stored reset dates and rewrites the counters when
/// the window has rolled over. No timers are involved. State is persisted
/// after every mutation (last-writer-wins; there is one logical writer).
pub struct QuotaManager {
    state: ServiceState,
    storage: Arc<dyn Storage>,
}

impl QuotaManager {
    /// Load persisted state, or initialize fresh state with the configured
    /// quotas when none has been saved yet.
    pub async fn load_or_init(
        storage: Arc<dyn Storage>,
        daily_quota: u32,
        monthly_quota: u32,
    ) -> Result<Self> {
        let state = match storage.load_state().await? {
            Some(state) => state,
            None => {
                let state = ServiceState::new(daily_quota, monthly_quota, Utc::now().date_naive());
                storage.save_state(&state).await?;
                state
            }
        };
        Ok(Self { state, storage })
    }

    /// Construct from an already-loaded state (tests, explicit wiring).
    pub fn with_state(storage: Arc<dyn Storage>, state: ServiceState) -> Self {
        Self { state, storage }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn mode(&self) -> ServiceMode {
        self.state.mode
    }

    /// Switch the service mode and persist the change.
    pub async fn set_mode(&mut self, mode: ServiceMode) -> Result<()> {
        crate::log_system_event!(mode_switch, from = self.state.mode, to = mode);
        self.state.mode = mode;
        self.storage.save_state(&self.state).await
    }

    /// Set or clear the provider API key and persist the change.
    pub async fn set_api_key(&mut self, api_key: Option<String>) -> Result<()> {
        self.state.api_key = api_key;
        self.storage.save_state(&self.state).await
    }

    /// Gate check against today's calendar date.
    pub async fn check_quota(&mut self) -> Result<QuotaStatus> {
        self.check_quota_at(Utc::now().date_naive()).await
    }

    /// Gate check with an injected date. Performs the lazy window reset
    /// before comparing counters against the quotas.
    pub async fn check_quota_at(&mut self, today: NaiveDate) -> Result<QuotaStatus> {
        let mut dirty = false;

        if today != self.state.last_reset {
            self.state.used_quota = 0;
            self.state.last_reset = today;
            dirty = true;
            log_quota_event!(reset, window = "daily", date = today);
        }

        if (today.month(), today.year())
            != (self.state.last_monthly_reset.month(), self.state.last_monthly_reset.year())
        {
            self.state.used_monthly_quota = 0;
            self.state.last_monthly_reset = today;
            dirty = true;
            log_quota_event!(reset, window = "monthly", date = today);
        }

        if dirty {
            self.storage.save_state(&self.state).await?;
        }

        let status = if self.state.used_quota >= self.state.daily_quota {
            QuotaStatus {
                can_use: false,
                reason: Some(format!(
                    "daily quota exhausted ({}/{})",
                    self.state.used_quota, self.state.daily_quota
                )),
            }
        } else if self.state.used_monthly_quota >= self.state.monthly_quota {
            QuotaStatus {
                can_use: false,
                reason: Some(format!(
                    "monthly quota exhausted ({}/{})",
                    self.state.used_monthly_quota, self.state.monthly_quota
                )),
            }
        } else {
            QuotaStatus { can_use: true, reason: None }
        };

        if let Some(reason) = &status.reason {
            log_quota_event!(denied, reason);
        }
        Ok(status)
    }

    /// Count one successful provider call and persist the counters.
    pub async fn increment_usage(&mut self) -> Result<()> {
        self.state.used_quota += 1;
        self.state.used_monthly_quota += 1;
        log_quota_event!(
            increment,
            daily_used = self.state.used_quota,
            monthly_used = self.state.used_monthly_quota
        );
        self.storage.save_state(&self.state).await
    }

    /// Remaining calls in the current windows.
    pub fn get_remaining(&self) -> RemainingQuota {
        RemainingQuota {
            daily: self.state.daily_quota.saturating_sub(self.state.used_quota),
            monthly: self
                .state
                .monthly_quota
                .saturating_sub(self.state.used_monthly_quota),
        }
    }
}
