use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::LearningError;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Standard,
    Premium,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Basic => "basic",
            PlanTier::Standard => "standard",
            PlanTier::Premium => "premium",
        }
    }

    /// Entitlement length used when a payment event does not carry one.
    pub fn default_duration_days(&self) -> i64 {
        match self {
            PlanTier::Basic => 30,
            PlanTier::Standard => 90,
            PlanTier::Premium => 365,
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(PlanTier::Basic),
            "standard" => Ok(PlanTier::Standard),
            "premium" => Ok(PlanTier::Premium),
            other => Err(LearningError::invalid(format!("unknown plan '{other}'"))),
        }
    }
}

/// Paid entitlement window embedded in an account.
///
/// The stored `active` flag may be stale between expiry and the next write;
/// [`Subscription::state`] is the live answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub plan: Option<PlanTier>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub auto_renew: bool,
    /// Set once the expiry warning for the current window has been appended
    #[serde(default)]
    pub expiry_notified: bool,
}

/// Entitlement evaluated at a specific instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementState {
    /// Never activated, or explicitly expired
    Inactive,
    /// Flag set and the window is still open
    Entitled { ends_at: DateTime<Utc> },
    /// Flag still set but the window has closed; awaiting a sweep or write
    Lapsed { ended_at: DateTime<Utc> },
}

impl Subscription {
    pub fn state(&self, at: DateTime<Utc>) -> EntitlementState {
        match (self.active, self.end_date) {
            (true, Some(end)) if end > at => EntitlementState::Entitled { ends_at: end },
            (true, Some(end)) => EntitlementState::Lapsed { ended_at: end },
            _ => EntitlementState::Inactive,
        }
    }

    pub fn is_entitled(&self, at: DateTime<Utc>) -> bool {
        matches!(self.state(at), EntitlementState::Entitled { .. })
    }

    /// Whole calendar days left, rounded up. Zero when not entitled.
    pub fn days_remaining(&self, at: DateTime<Utc>) -> i64 {
        match self.state(at) {
            EntitlementState::Entitled { ends_at } => {
                let millis = (ends_at - at).num_milliseconds();
                ((millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY).max(0)
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap()
    }

    fn active_until(end: DateTime<Utc>) -> Subscription {
        Subscription {
            plan: Some(PlanTier::Standard),
            start_date: Some(end - Duration::days(90)),
            end_date: Some(end),
            active: true,
            auto_renew: false,
            expiry_notified: false,
        }
    }

    #[test]
    fn test_days_remaining_rounds_up_partial_days() {
        let sub = active_until(now() + Duration::hours(36));
        assert_eq!(sub.days_remaining(now()), 2);

        let sub = active_until(now() + Duration::hours(48));
        assert_eq!(sub.days_remaining(now()), 2);

        let sub = active_until(now() + Duration::seconds(1));
        assert_eq!(sub.days_remaining(now()), 1);
    }

    #[test]
    fn test_stale_flag_is_not_entitlement() {
        let sub = active_until(now() - Duration::seconds(1));
        assert!(sub.active);
        assert!(!sub.is_entitled(now()));
        assert_eq!(sub.days_remaining(now()), 0);
        assert!(matches!(sub.state(now()), EntitlementState::Lapsed { .. }));
    }

    #[test]
    fn test_end_equal_to_now_is_not_entitled() {
        let sub = active_until(now());
        assert!(!sub.is_entitled(now()));
    }

    #[test]
    fn test_default_subscription_inactive() {
        let sub = Subscription::default();
        assert_eq!(sub.state(now()), EntitlementState::Inactive);
        assert_eq!(sub.days_remaining(now()), 0);
    }

    #[test]
    fn test_plan_defaults() {
        assert_eq!(PlanTier::Basic.default_duration_days(), 30);
        assert_eq!("Premium".parse::<PlanTier>().unwrap(), PlanTier::Premium);
        assert!("gold".parse::<PlanTier>().is_err());
    }
}
