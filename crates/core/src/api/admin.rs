//! Admin actions: users, content, permissions and stats.
//!
//! Permission and release-date writes are full replacements. The backend
//! overwrites the user's whole set with what is sent; nothing is diffed.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, instrument};

use super::{ApiClient, ApiError, TokenOnly};
use crate::types::{
    ContentDraft, ContentId, ContentItem, ContentTypeUpdate, PermissionRecord,
    PermissionUpdate, PlatformStats, ReleaseDateEntry, Session, SessionToken, StatusField, User,
    UserId,
};

/// Everything a permissions-editor save writes back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionSave {
    /// One row per rendered checkbox.
    pub permissions: Vec<PermissionUpdate>,
    /// One row per rendered date input; `None` clears the date.
    pub release_dates: Vec<ReleaseDateEntry>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForUser<'a> {
    token: &'a SessionToken,
    user_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionsBody<'a> {
    token: &'a SessionToken,
    user_id: &'a UserId,
    permissions: &'a [PermissionUpdate],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseDatesBody<'a> {
    token: &'a SessionToken,
    user_id: &'a UserId,
    release_dates: &'a [ReleaseDateEntry],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    token: &'a SessionToken,
    user_id: &'a UserId,
    field: StatusField,
    value: bool,
}

#[derive(Serialize)]
struct ContentBody<'a> {
    token: &'a SessionToken,
    #[serde(flatten)]
    draft: &'a ContentDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_id: Option<&'a ContentId>,
}

#[derive(Serialize)]
struct ContentRef<'a> {
    token: &'a SessionToken,
    content_id: &'a ContentId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypesBody<'a> {
    token: &'a SessionToken,
    content_types: &'a [ContentTypeUpdate],
}

impl ApiClient {
    /// `adminLogin`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for wrong credentials or a non-admin
    /// account, or a transport error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn admin_login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Session, ApiError> {
        let credentials = Credentials {
            email,
            password: password.expose_secret(),
        };
        Ok(self.call_ok("adminLogin", &credentials).await?.data_as()?)
    }

    /// `getAllUsers`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip_all)]
    pub async fn get_all_users(&self, token: &SessionToken) -> Result<Vec<User>, ApiError> {
        Ok(self
            .call_ok("getAllUsers", &TokenOnly { token })
            .await?
            .data_field("users")?)
    }

    /// `getAllContent`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip_all)]
    pub async fn get_all_content(&self, token: &SessionToken) -> Result<Vec<ContentItem>, ApiError> {
        Ok(self
            .call_ok("getAllContent", &TokenOnly { token })
            .await?
            .data_field("content")?)
    }

    /// `getUserPermissions`: one record per content item.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token))]
    pub async fn get_user_permissions(
        &self,
        token: &SessionToken,
        user_id: &UserId,
    ) -> Result<Vec<PermissionRecord>, ApiError> {
        Ok(self
            .call_ok("getUserPermissions", &ForUser { token, user_id })
            .await?
            .data_field("permissions")?)
    }

    /// `getUserReleaseDate`: the user's scheduled release dates.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token))]
    pub async fn get_user_release_dates(
        &self,
        token: &SessionToken,
        user_id: &UserId,
    ) -> Result<Vec<ReleaseDateEntry>, ApiError> {
        Ok(self
            .call_ok("getUserReleaseDate", &ForUser { token, user_id })
            .await?
            .data_field("releaseDates")?)
    }

    /// Load the permissions editor: access records with release dates merged
    /// in by `content_id`.
    ///
    /// # Errors
    ///
    /// Fails if either backend call fails.
    pub async fn load_permission_records(
        &self,
        token: &SessionToken,
        user_id: &UserId,
    ) -> Result<Vec<PermissionRecord>, ApiError> {
        let records = self.get_user_permissions(token, user_id).await?;
        let dates = self.get_user_release_dates(token, user_id).await?;
        Ok(merge_release_dates(records, dates))
    }

    /// `updateUserPermissions`: replace the user's whole access set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token, permissions), fields(rows = permissions.len()))]
    pub async fn update_user_permissions(
        &self,
        token: &SessionToken,
        user_id: &UserId,
        permissions: &[PermissionUpdate],
    ) -> Result<(), ApiError> {
        let body = PermissionsBody {
            token,
            user_id,
            permissions,
        };
        self.call_ok("updateUserPermissions", &body).await?;
        Ok(())
    }

    /// `updateUserReleaseDate`: replace the user's whole release-date set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token, release_dates), fields(rows = release_dates.len()))]
    pub async fn update_user_release_dates(
        &self,
        token: &SessionToken,
        user_id: &UserId,
        release_dates: &[ReleaseDateEntry],
    ) -> Result<(), ApiError> {
        let body = ReleaseDatesBody {
            token,
            user_id,
            release_dates,
        };
        self.call_ok("updateUserReleaseDate", &body).await?;
        Ok(())
    }

    /// Save the permissions editor: access first, then release dates.
    ///
    /// Stops at the first failure, so a rejected access write leaves the
    /// dates untouched.
    ///
    /// # Errors
    ///
    /// Returns the first failing call's error.
    pub async fn save_permissions(
        &self,
        token: &SessionToken,
        user_id: &UserId,
        save: &PermissionSave,
    ) -> Result<(), ApiError> {
        self.update_user_permissions(token, user_id, &save.permissions)
            .await?;
        self.update_user_release_dates(token, user_id, &save.release_dates)
            .await?;
        info!(user_id = %user_id, "Permissions replaced");
        Ok(())
    }

    /// `updateUserStatus`: set `is_paid` or `is_active`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token))]
    pub async fn update_user_status(
        &self,
        token: &SessionToken,
        user_id: &UserId,
        field: StatusField,
        value: bool,
    ) -> Result<(), ApiError> {
        let body = StatusBody {
            token,
            user_id,
            field,
            value,
        };
        self.call_ok("updateUserStatus", &body).await?;
        Ok(())
    }

    /// `deleteUser`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token))]
    pub async fn delete_user(&self, token: &SessionToken, user_id: &UserId) -> Result<(), ApiError> {
        self.call_ok("deleteUser", &ForUser { token, user_id })
            .await?;
        info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// `addContent`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token, draft), fields(title = %draft.title))]
    pub async fn add_content(&self, token: &SessionToken, draft: &ContentDraft) -> Result<(), ApiError> {
        let body = ContentBody {
            token,
            draft,
            content_id: None,
        };
        self.call_ok("addContent", &body).await?;
        Ok(())
    }

    /// `updateContent`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token, draft))]
    pub async fn update_content(
        &self,
        token: &SessionToken,
        content_id: &ContentId,
        draft: &ContentDraft,
    ) -> Result<(), ApiError> {
        let body = ContentBody {
            token,
            draft,
            content_id: Some(content_id),
        };
        self.call_ok("updateContent", &body).await?;
        Ok(())
    }

    /// `deleteContent`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token))]
    pub async fn delete_content(
        &self,
        token: &SessionToken,
        content_id: &ContentId,
    ) -> Result<(), ApiError> {
        self.call_ok("deleteContent", &ContentRef { token, content_id })
            .await?;
        info!(content_id = %content_id, "Content deleted");
        Ok(())
    }

    /// `updateContentTypes`: replace the type of every listed item.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip(self, token, content_types), fields(rows = content_types.len()))]
    pub async fn update_content_types(
        &self,
        token: &SessionToken,
        content_types: &[ContentTypeUpdate],
    ) -> Result<(), ApiError> {
        let body = ContentTypesBody {
            token,
            content_types,
        };
        self.call_ok("updateContentTypes", &body).await?;
        Ok(())
    }

    /// `getStats`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or a transport error.
    #[instrument(skip_all)]
    pub async fn get_stats(&self, token: &SessionToken) -> Result<PlatformStats, ApiError> {
        Ok(self
            .call_ok("getStats", &TokenOnly { token })
            .await?
            .data_as()?)
    }
}

/// Overlay release dates onto access records by `content_id`.
///
/// Records without a matching entry keep whatever date they came with.
fn merge_release_dates(
    mut records: Vec<PermissionRecord>,
    dates: Vec<ReleaseDateEntry>,
) -> Vec<PermissionRecord> {
    let by_id: HashMap<ContentId, _> = dates
        .into_iter()
        .map(|entry| (entry.content_id, entry.release_date))
        .collect();

    for record in &mut records {
        if let Some(date) = by_id.get(&record.content_id) {
            record.release_date = *date;
        }
    }
    records
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::api::tests::stub_backend;
    use crate::types::ContentType;

    fn record(id: &str, date: Option<NaiveDate>) -> PermissionRecord {
        PermissionRecord {
            content_id: ContentId::new(id),
            title: id.to_string(),
            content_type: ContentType::Paid,
            has_access: false,
            release_date: date,
        }
    }

    #[test]
    fn test_merge_release_dates() {
        let june = NaiveDate::from_ymd_opt(2025, 6, 1);
        let merged = merge_release_dates(
            vec![record("C1", None), record("C2", june), record("C3", None)],
            vec![
                ReleaseDateEntry {
                    content_id: ContentId::new("C1"),
                    release_date: june,
                },
                ReleaseDateEntry {
                    content_id: ContentId::new("C2"),
                    release_date: None,
                },
                ReleaseDateEntry {
                    content_id: ContentId::new("C9"),
                    release_date: june,
                },
            ],
        );

        let dates: Vec<_> = merged.iter().map(|r| r.release_date).collect();
        assert_eq!(dates, vec![june, None, None]);
    }

    #[tokio::test]
    async fn test_update_user_status_body() {
        let (client, stub) = stub_backend(StatusCode::OK, json!({"status": "success"})).await;
        client
            .update_user_status(
                &SessionToken::new("t"),
                &UserId::new("U1"),
                StatusField::IsPaid,
                false,
            )
            .await
            .unwrap();

        assert_eq!(
            stub.bodies(),
            vec![json!({
                "action": "updateUserStatus",
                "token": "t",
                "userId": "U1",
                "field": "is_paid",
                "value": false
            })]
        );
    }

    #[tokio::test]
    async fn test_save_permissions_sends_full_sets() {
        let (client, stub) = stub_backend(StatusCode::OK, json!({"status": "success"})).await;
        let save = PermissionSave {
            permissions: vec![
                PermissionUpdate {
                    content_id: ContentId::new("C1"),
                    has_access: true,
                },
                PermissionUpdate {
                    content_id: ContentId::new("C2"),
                    has_access: false,
                },
            ],
            release_dates: vec![
                ReleaseDateEntry {
                    content_id: ContentId::new("C1"),
                    release_date: NaiveDate::from_ymd_opt(2025, 3, 1),
                },
                ReleaseDateEntry {
                    content_id: ContentId::new("C2"),
                    release_date: None,
                },
            ],
        };

        client
            .save_permissions(&SessionToken::new("t"), &UserId::new("U1"), &save)
            .await
            .unwrap();

        assert_eq!(
            stub.bodies(),
            vec![
                json!({
                    "action": "updateUserPermissions",
                    "token": "t",
                    "userId": "U1",
                    "permissions": [
                        {"content_id": "C1", "has_access": true},
                        {"content_id": "C2", "has_access": false}
                    ]
                }),
                json!({
                    "action": "updateUserReleaseDate",
                    "token": "t",
                    "userId": "U1",
                    "releaseDates": [
                        {"content_id": "C1", "release_date": "2025-03-01"},
                        {"content_id": "C2", "release_date": null}
                    ]
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_save_permissions_stops_on_rejection() {
        let (client, stub) =
            stub_backend(StatusCode::OK, json!({"status": "error", "message": "nope"})).await;

        let err = client
            .save_permissions(
                &SessionToken::new("t"),
                &UserId::new("U1"),
                &PermissionSave::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.rejection_message(), Some("nope"));
        assert_eq!(stub.bodies().len(), 1);
    }

    #[tokio::test]
    async fn test_content_bodies() {
        let (client, stub) = stub_backend(StatusCode::OK, json!({"status": "success"})).await;
        let draft = ContentDraft {
            title: "Intro".to_string(),
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            content_type: ContentType::Vip,
            description: String::new(),
        };
        let token = SessionToken::new("t");

        client.add_content(&token, &draft).await.unwrap();
        client
            .update_content(&token, &ContentId::new("C7"), &draft)
            .await
            .unwrap();
        client
            .delete_content(&token, &ContentId::new("C7"))
            .await
            .unwrap();

        let bodies = stub.bodies();
        assert_eq!(bodies[0]["action"], "addContent");
        assert!(bodies[0].get("content_id").is_none());
        assert_eq!(bodies[0]["content_type"], "vip");
        assert_eq!(bodies[1]["content_id"], "C7");
        assert_eq!(bodies[1]["title"], "Intro");
        assert_eq!(
            bodies[2],
            json!({"action": "deleteContent", "token": "t", "content_id": "C7"})
        );
    }

    #[tokio::test]
    async fn test_get_stats() {
        let (client, _stub) = stub_backend(
            StatusCode::OK,
            json!({"status": "success", "data": {
                "totalUsers": 3, "paidUsers": 2, "freeUsers": 1,
                "totalContent": 5, "freeContent": 2, "paidContent": 3
            }}),
        )
        .await;

        let stats = client.get_stats(&SessionToken::new("t")).await.unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.paid_content, 3);
    }
}
