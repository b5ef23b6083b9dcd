use serde_json::json;

use crate::error::{AppError, QuotaStatus};
use crate::profile_store::{Plan, Profile, ProfileStore};

/// Admission check. Pro accounts are unlimited regardless of counters;
/// every other tier must have `required` tokens left.
pub fn check_quota(profile: &Profile, required: i64) -> bool {
    if profile.plan == Plan::Pro {
        return true;
    }
    profile.tokens_total - profile.tokens_used >= required
}

pub fn tokens_remaining(profile: &Profile) -> i64 {
    (profile.tokens_total - profile.tokens_used).max(0)
}

/// Fetch the caller's profile and enforce admission for `required`
/// tokens. A missing profile row is treated as an empty balance rather
/// than an error, matching how unprovisioned accounts behave elsewhere.
pub async fn admit(
    store: &ProfileStore,
    user_id: &str,
    required: i64,
    rejection_message: &str,
) -> Result<Profile, AppError> {
    let profile = store
        .get_profile(user_id)
        .await
        .map_err(|e| AppError::Message(format!("Profile lookup failed: {e}")))?;

    match profile {
        Some(profile) if check_quota(&profile, required) => Ok(profile),
        Some(profile) => Err(AppError::QuotaExceeded(QuotaStatus {
            error: rejection_message.to_string(),
            plan: profile.plan.as_str().to_string(),
            tokens_used: profile.tokens_used,
            tokens_total: profile.tokens_total,
            tokens_required: (required > 1).then_some(required),
            upgrade_required: true,
        })),
        None => Err(AppError::QuotaExceeded(QuotaStatus {
            error: rejection_message.to_string(),
            plan: Plan::Free.as_str().to_string(),
            tokens_used: 0,
            tokens_total: 0,
            tokens_required: (required > 1).then_some(required),
            upgrade_required: true,
        })),
    }
}

/// Read-modify-write deduction against the remote store. There is no
/// isolation between the read and the write; concurrent requests can
/// both observe the same balance. Failure is a warning, never an error
/// surfaced to the caller.
pub async fn deduct(store: &ProfileStore, user_id: &str, amount: i64) {
    let current = match store.get_profile(user_id).await {
        Ok(Some(profile)) => profile.tokens_used,
        Ok(None) => {
            tracing::warn!(user_id, "token deduction skipped: profile missing");
            return;
        }
        Err(e) => {
            tracing::warn!(user_id, error = %e, "token deduction skipped: profile read failed");
            return;
        }
    };
    let changes = json!({
        "tokens_used": current + amount,
        "updated_at": "now()",
    });
    if let Err(e) = store.patch_profile(user_id, changes).await {
        tracing::warn!(user_id, amount, error = %e, "token deduction write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(plan: Plan, total: i64, used: i64) -> Profile {
        let mut p = Profile::with_free_defaults("u-1".into(), None);
        p.plan = plan;
        p.tokens_total = total;
        p.tokens_used = used;
        p
    }

    #[test]
    fn metered_plan_admits_iff_balance_covers_requirement() {
        assert!(check_quota(&profile(Plan::Free, 3, 2), 1));
        assert!(!check_quota(&profile(Plan::Free, 3, 3), 1));
        assert!(check_quota(&profile(Plan::Starter, 10, 7), 3));
        assert!(!check_quota(&profile(Plan::Starter, 10, 8), 3));
    }

    #[test]
    fn pro_plan_is_unlimited_regardless_of_counters() {
        assert!(check_quota(&profile(Plan::Pro, 0, 0), 1));
        assert!(check_quota(&profile(Plan::Pro, 3, 999), 50));
    }

    #[test]
    fn remaining_never_goes_negative() {
        assert_eq!(tokens_remaining(&profile(Plan::Free, 3, 5)), 0);
        assert_eq!(tokens_remaining(&profile(Plan::Free, 3, 1)), 2);
    }
}
