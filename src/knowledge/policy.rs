//! Role-based access policy for confidential knowledge
//!
//! A fixed table mapping caller roles to permitted confidentiality tiers.
//! Unknown roles get no tiers: when authorization is ambiguous, access is
//! denied.

use serde::{Deserialize, Serialize};

/// Confidentiality tier attached to secure knowledge records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Restricted,
    Confidential,
    Secret,
}

/// Fixed role-to-tier authorization table
pub struct AccessPolicy;

impl AccessPolicy {
    /// Tiers a role is cleared for; empty for unknown roles
    pub fn permitted_tiers(role: &str) -> &'static [Tier] {
        match role.to_ascii_lowercase().as_str() {
            "board" | "legal" => &[Tier::Restricted, Tier::Confidential, Tier::Secret],
            "finance" => &[Tier::Restricted, Tier::Confidential],
            "management" => &[Tier::Restricted],
            _ => &[],
        }
    }

    /// Whether a role may see records of the given tier
    pub fn may_access(role: &str, tier: Tier) -> bool {
        Self::permitted_tiers(role).contains(&tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_and_legal_see_everything() {
        for role in ["board", "legal"] {
            assert!(AccessPolicy::may_access(role, Tier::Restricted));
            assert!(AccessPolicy::may_access(role, Tier::Confidential));
            assert!(AccessPolicy::may_access(role, Tier::Secret));
        }
    }

    #[test]
    fn test_finance_stops_at_confidential() {
        assert!(AccessPolicy::may_access("finance", Tier::Restricted));
        assert!(AccessPolicy::may_access("finance", Tier::Confidential));
        assert!(!AccessPolicy::may_access("finance", Tier::Secret));
    }

    #[test]
    fn test_management_sees_restricted_only() {
        assert_eq!(AccessPolicy::permitted_tiers("management"), &[Tier::Restricted]);
    }

    #[test]
    fn test_unknown_roles_fail_closed() {
        assert!(AccessPolicy::permitted_tiers("general").is_empty());
        assert!(AccessPolicy::permitted_tiers("").is_empty());
        assert!(AccessPolicy::permitted_tiers("intern").is_empty());
    }

    #[test]
    fn test_role_matching_is_case_insensitive() {
        assert!(AccessPolicy::may_access("Finance", Tier::Confidential));
        assert!(AccessPolicy::may_access("BOARD", Tier::Secret));
    }
}
