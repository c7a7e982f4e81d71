//! Paid plan lifecycle: activation, live entitlement, expiry.

use chrono::{DateTime, Duration, Utc};
use lectern_config::SubscriptionConfig;
use tracing::info;

use crate::entities::{Account, PlanTier};
use crate::types::{LearningError, LearningResult};

#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    expiry_warning_days: i64,
}

impl SubscriptionManager {
    pub fn new(config: &SubscriptionConfig) -> Self {
        Self {
            expiry_warning_days: config.expiry_warning_days.max(0),
        }
    }

    pub fn expiry_warning_days(&self) -> i64 {
        self.expiry_warning_days
    }

    /// Open a new entitlement window starting now.
    pub fn activate(
        &self,
        account: &mut Account,
        plan: PlanTier,
        duration_days: i64,
        auto_renew: bool,
        now: DateTime<Utc>,
    ) -> LearningResult<()> {
        if duration_days <= 0 {
            return Err(LearningError::invalid(format!(
                "subscription duration must be positive, got {duration_days} days"
            )));
        }

        let end = Duration::try_days(duration_days)
            .and_then(|span| now.checked_add_signed(span))
            .ok_or_else(|| LearningError::invalid("subscription duration is too long"))?;

        let subscription = &mut account.subscription;
        subscription.plan = Some(plan);
        subscription.start_date = Some(now);
        subscription.end_date = Some(end);
        subscription.active = true;
        subscription.auto_renew = auto_renew;
        subscription.expiry_notified = false;

        info!(
            account_id = account.id,
            plan = plan.as_str(),
            ends_at = %end,
            "subscription activated"
        );
        Ok(())
    }

    pub fn is_entitled(&self, account: &Account, at: DateTime<Utc>) -> bool {
        account.subscription.is_entitled(at)
    }

    pub fn days_remaining(&self, account: &Account, at: DateTime<Utc>) -> i64 {
        account.subscription.days_remaining(at)
    }

    /// Clear the active flag. Safe to call repeatedly.
    pub fn expire(&self, account: &mut Account) {
        account.subscription.active = false;
    }

    /// Clear a stale active flag whose window has closed. Returns whether anything changed.
    pub fn sweep_expired(&self, account: &mut Account, at: DateTime<Utc>) -> bool {
        if account.subscription.active && !account.subscription.is_entitled(at) {
            self.expire(account);
            info!(account_id = account.id, "subscription expired by sweep");
            return true;
        }
        false
    }

    /// Entitled accounts whose window closes within `[at, at + days]`.
    pub fn find_expiring_within<'a, I>(
        &self,
        accounts: I,
        days: i64,
        at: DateTime<Utc>,
    ) -> Vec<&'a Account>
    where
        I: IntoIterator<Item = &'a Account>,
    {
        let horizon = at + Duration::days(days.max(0));
        accounts
            .into_iter()
            .filter(|account| account.subscription.is_entitled(at))
            .filter(|account| {
                matches!(account.subscription.end_date, Some(end) if end >= at && end <= horizon)
            })
            .collect()
    }

    pub fn find_active<'a, I>(&self, accounts: I, at: DateTime<Utc>) -> Vec<&'a Account>
    where
        I: IntoIterator<Item = &'a Account>,
    {
        accounts
            .into_iter()
            .filter(|account| account.subscription.is_entitled(at))
            .collect()
    }
}
