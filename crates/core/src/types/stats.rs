//! Platform statistics.

use serde::{Deserialize, Serialize};

use super::user::User;

/// Totals returned by `getStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub paid_users: u64,
    #[serde(default)]
    pub free_users: u64,
    #[serde(default)]
    pub total_content: u64,
    #[serde(default)]
    pub free_content: u64,
    #[serde(default)]
    pub paid_content: u64,
}

/// Counters shown above the users table, computed from the fetched list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserCounts {
    pub total: usize,
    pub paid: usize,
    pub active: usize,
}

impl UserCounts {
    /// Count a freshly fetched user list.
    #[must_use]
    pub fn from_users(users: &[User]) -> Self {
        Self {
            total: users.len(),
            paid: users.iter().filter(|u| u.is_paid).count(),
            active: users.iter().filter(|u| u.is_active).count(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::UserId;

    fn user(id: &str, is_paid: bool, is_active: bool) -> User {
        User {
            user_id: UserId::new(id),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            auth_provider: "email".to_string(),
            is_paid,
            is_active,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_user_counts() {
        let users = vec![user("a", true, true), user("b", true, true), user("c", false, true)];
        assert_eq!(
            UserCounts::from_users(&users),
            UserCounts {
                total: 3,
                paid: 2,
                active: 3
            }
        );
        assert_eq!(UserCounts::from_users(&[]), UserCounts::default());
    }

    #[test]
    fn test_stats_camel_case() {
        let stats: PlatformStats = serde_json::from_str(
            r#"{"totalUsers":5,"paidUsers":2,"freeUsers":3,"totalContent":4,"freeContent":1,"paidContent":3}"#,
        )
        .unwrap();
        assert_eq!(stats.free_users, 3);
        assert_eq!(stats.paid_content, 3);
    }
}
