//! Learner accounts as listed in the admin panel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A learner account (`getAllUsers`).
///
/// The client never treats this as authoritative. The list is fetched whole
/// on every users view and replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    /// How the account signs in (`email`, `google`, ...).
    #[serde(default)]
    pub auth_provider: String,
    pub is_paid: bool,
    pub is_active: bool,
    /// Creation timestamp as sent by the backend (usually RFC 3339).
    #[serde(default)]
    pub created_at: String,
}

impl User {
    /// Case-insensitive substring match on email or name.
    ///
    /// `query` must already be lowercased. An empty query matches everyone.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        query.is_empty()
            || self.email.to_lowercase().contains(query)
            || self.name.to_lowercase().contains(query)
    }

    /// Current value of a status flag.
    #[must_use]
    pub const fn flag(&self, field: StatusField) -> bool {
        match field {
            StatusField::IsPaid => self.is_paid,
            StatusField::IsActive => self.is_active,
        }
    }

    /// Creation date formatted as `YYYY/M/D`, or the raw value when it does
    /// not parse.
    #[must_use]
    pub fn created_date(&self) -> String {
        self.parsed_created_at().map_or_else(
            || self.created_at.clone(),
            |dt| dt.format("%Y/%-m/%-d").to_string(),
        )
    }

    /// Creation timestamp formatted as `YYYY/M/D HH:MM:SS`.
    #[must_use]
    pub fn created_datetime(&self) -> String {
        self.parsed_created_at().map_or_else(
            || self.created_at.clone(),
            |dt| dt.format("%Y/%-m/%-d %H:%M:%S").to_string(),
        )
    }

    fn parsed_created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Account flag editable through `updateUserStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    /// Paid subscription flag.
    IsPaid,
    /// Account enabled flag.
    IsActive,
}

impl StatusField {
    /// Wire value (`is_paid` / `is_active`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IsPaid => "is_paid",
            Self::IsActive => "is_active",
        }
    }

    /// Field name used in prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IsPaid => "付費狀態",
            Self::IsActive => "帳號狀態",
        }
    }

    /// Display text for a value of this flag.
    #[must_use]
    pub const fn value_label(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::IsPaid, true) => "付費",
            (Self::IsPaid, false) => "免費",
            (Self::IsActive, true) => "啟用",
            (Self::IsActive, false) => "停用",
        }
    }

    /// Badge CSS modifier for a value of this flag.
    #[must_use]
    pub const fn badge_class(self, value: bool) -> &'static str {
        match (self, value) {
            (_, true) => "success",
            (Self::IsPaid, false) => "warning",
            (Self::IsActive, false) => "danger",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            user_id: UserId::new("u1"),
            email: "Alice@Example.com".to_string(),
            name: "Alice Chen".to_string(),
            auth_provider: "google".to_string(),
            is_paid: false,
            is_active: true,
            created_at: "2024-03-05T08:09:10.000Z".to_string(),
        }
    }

    #[test]
    fn test_matches_email_or_name() {
        let user = sample();
        assert!(user.matches(""));
        assert!(user.matches("alice@"));
        assert!(user.matches("chen"));
        assert!(!user.matches("bob"));
    }

    #[test]
    fn test_created_date_formats() {
        let user = sample();
        assert_eq!(user.created_date(), "2024/3/5");
        assert_eq!(user.created_datetime(), "2024/3/5 08:09:10");

        let raw = User {
            created_at: "yesterday".to_string(),
            ..sample()
        };
        assert_eq!(raw.created_date(), "yesterday");
    }

    #[test]
    fn test_status_field_labels() {
        assert_eq!(StatusField::IsPaid.value_label(true), "付費");
        assert_eq!(StatusField::IsActive.value_label(false), "停用");
        assert_eq!(StatusField::IsActive.badge_class(false), "danger");
        assert_eq!(
            serde_json::to_string(&StatusField::IsPaid).unwrap(),
            "\"is_paid\""
        );
    }

    #[test]
    fn test_flag() {
        let user = sample();
        assert!(!user.flag(StatusField::IsPaid));
        assert!(user.flag(StatusField::IsActive));
    }
}
