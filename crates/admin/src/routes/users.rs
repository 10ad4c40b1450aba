//! Users view: table, local counts, search and the detail modal.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::{
    Session, StatusField, User, UserCounts, UserId,
    api::ApiError,
    view::{AdminView, Selection},
};
use serde::Deserialize;
use tracing::instrument;

use super::{ConfirmForm, ConfirmTemplate, Page, failure_text, id_path, is_confirmed, render};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{
    Flash,
    session::{load_selection, push_flash, store_selection},
};
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub q: Option<String>,
}

/// Status toggle form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub field: StatusField,
    pub value: bool,
    pub confirmed: Option<String>,
}

/// A status badge.
#[derive(Debug, Clone)]
pub struct Badge {
    pub label: &'static str,
    pub class: &'static str,
}

impl Badge {
    fn status(field: StatusField, value: bool) -> Self {
        Self {
            label: field.value_label(value),
            class: field.badge_class(value),
        }
    }
}

/// User row for the table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub auth_provider: String,
    pub paid: Badge,
    pub active: Badge,
    pub created: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            auth_provider: user.auth_provider.clone(),
            paid: Badge::status(StatusField::IsPaid, user.is_paid),
            active: Badge::status(StatusField::IsActive, user.is_active),
            created: user.created_date(),
        }
    }
}

/// A toggle button in the detail modal; posts the negated value.
#[derive(Debug, Clone)]
pub struct StatusToggle {
    pub field: &'static str,
    pub value: bool,
    pub label: String,
}

impl StatusToggle {
    fn for_user(user: &User, field: StatusField) -> Self {
        let value = !user.flag(field);
        Self {
            field: field.as_str(),
            value,
            label: format!("設為{}", field.value_label(value)),
        }
    }
}

/// Detail modal contents.
#[derive(Debug, Clone)]
pub struct UserDetail {
    pub row: UserRow,
    pub created: String,
    pub toggles: Vec<StatusToggle>,
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            row: UserRow::from(user),
            created: user.created_datetime(),
            toggles: vec![
                StatusToggle::for_user(user, StatusField::IsPaid),
                StatusToggle::for_user(user, StatusField::IsActive),
            ],
        }
    }
}

/// Users page template.
#[derive(Template)]
#[template(path = "users.html")]
pub struct UsersTemplate {
    pub page: Page,
    pub rows: Vec<UserRow>,
    pub counts: UserCounts,
    pub query: String,
    pub load_error: Option<String>,
    pub detail: Option<UserDetail>,
}

/// Fetched users, or the inline failure text.
async fn fetch_users(state: &AppState, admin: &Session) -> std::result::Result<Vec<User>, String> {
    state.api().get_all_users(&admin.token).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to load users");
        load_failure_text(&e)
    })
}

fn load_failure_text(err: &ApiError) -> String {
    failure_text("載入失敗", err)
}

/// Lowercased, trimmed search needle.
fn normalize_query(q: Option<&str>) -> String {
    q.unwrap_or_default().trim().to_lowercase()
}

async fn render_users(
    state: &AppState,
    store: &tower_sessions::Session,
    admin: &Session,
    query: Option<&str>,
    open: Option<&UserId>,
) -> Result<Response> {
    let page = Page::enter(store, admin, AdminView::Users).await?;
    let needle = normalize_query(query);

    let (users, load_error) = match fetch_users(state, admin).await {
        Ok(users) => (users, None),
        Err(message) => (Vec::new(), Some(message)),
    };

    let detail = match open {
        Some(user_id) if load_error.is_none() => {
            let user = users
                .iter()
                .find(|u| &u.user_id == user_id)
                .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
            Some(UserDetail::from(user))
        }
        _ => None,
    };

    let template = UsersTemplate {
        page,
        counts: UserCounts::from_users(&users),
        rows: users
            .iter()
            .filter(|u| u.matches(&needle))
            .map(UserRow::from)
            .collect(),
        query: query.unwrap_or_default().to_string(),
        load_error,
        detail,
    };
    Ok(render(&template)?.into_response())
}

/// Users table.
#[instrument(skip(admin, state, store))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Query(query): Query<UsersQuery>,
) -> Result<Response> {
    render_users(&state, &store, &admin, query.q.as_deref(), None).await
}

/// Users table with the detail modal open.
#[instrument(skip(admin, state, store))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(id): Path<String>,
) -> Result<Response> {
    let user_id = UserId::new(id);
    store_selection(&store, &Selection::with_user(user_id.clone())).await?;
    render_users(&state, &store, &admin, None, Some(&user_id)).await
}

/// Close the detail modal.
#[instrument(skip(_admin, store))]
pub async fn close(
    RequireAdmin(_admin): RequireAdmin,
    store: tower_sessions::Session,
    Path(_id): Path<String>,
) -> Result<Redirect> {
    let selection = load_selection(&store).await?.close_user();
    store_selection(&store, &selection).await?;
    Ok(Redirect::to("/users"))
}

/// Find one user for a confirmation prompt.
///
/// A failed backend call comes back as a response: the users view with the
/// failure flashed.
async fn find_user(
    state: &AppState,
    store: &tower_sessions::Session,
    admin: &Session,
    user_id: &UserId,
    prefix: &str,
) -> Result<std::result::Result<User, Response>> {
    match state.api().get_all_users(&admin.token).await {
        Ok(users) => users
            .into_iter()
            .find(|u| &u.user_id == user_id)
            .map(Ok)
            .ok_or_else(|| AppError::NotFound(format!("user {user_id}"))),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to load user for confirmation");
            push_flash(store, Flash::error(failure_text(prefix, &e))).await?;
            Ok(Err(Redirect::to("/users").into_response()))
        }
    }
}

fn status_confirm_message(email: &str, field: StatusField, value: bool) -> String {
    format!(
        "確定要將 {email} 的{}改為「{}」嗎？",
        field.label(),
        field.value_label(value)
    )
}

fn delete_confirm_message(user: &User) -> String {
    format!(
        "確定要刪除用戶 {} ({}) 嗎？\n\n此操作無法復原！",
        user.email, user.name
    )
}

/// Set `is_paid` or `is_active`.
#[instrument(skip(admin, state, store, form), fields(field = form.field.as_str(), value = form.value))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let user_id = UserId::new(id);

    if !is_confirmed(form.confirmed.as_deref()) {
        let user = match find_user(&state, &store, &admin, &user_id, "更新失敗").await? {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let template = ConfirmTemplate {
            page: Page::enter(&store, &admin, AdminView::Users).await?,
            message: status_confirm_message(&user.email, form.field, form.value),
            action: format!("{}/status", id_path("/users", &user_id)),
            fields: vec![
                ("field".to_string(), form.field.as_str().to_string()),
                ("value".to_string(), form.value.to_string()),
            ],
            cancel_href: id_path("/users", &user_id),
        };
        return Ok(render(&template)?.into_response());
    }

    match state
        .api()
        .update_user_status(&admin.token, &user_id, form.field, form.value)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = %user_id, "User status updated");
            push_flash(&store, Flash::success(format!("{}更新成功！", form.field.label()))).await?;
            let selection = load_selection(&store).await?.close_user();
            store_selection(&store, &selection).await?;
            Ok(Redirect::to("/users").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update user status");
            push_flash(&store, Flash::error(failure_text("更新失敗", &e))).await?;
            Ok(Redirect::to(&id_path("/users", &user_id)).into_response())
        }
    }
}

/// Delete a user.
#[instrument(skip(admin, state, store, form))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Result<Response> {
    let user_id = UserId::new(id);

    if !is_confirmed(form.confirmed.as_deref()) {
        let user = match find_user(&state, &store, &admin, &user_id, "刪除失敗").await? {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let template = ConfirmTemplate {
            page: Page::enter(&store, &admin, AdminView::Users).await?,
            message: delete_confirm_message(&user),
            action: format!("{}/delete", id_path("/users", &user_id)),
            fields: Vec::new(),
            cancel_href: id_path("/users", &user_id),
        };
        return Ok(render(&template)?.into_response());
    }

    match state.api().delete_user(&admin.token, &user_id).await {
        Ok(()) => {
            push_flash(&store, Flash::success("用戶刪除成功！")).await?;
            let selection = load_selection(&store).await?.close_user();
            store_selection(&store, &selection).await?;
            Ok(Redirect::to("/users").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete user");
            push_flash(&store, Flash::error(failure_text("刪除失敗", &e))).await?;
            Ok(Redirect::to(&id_path("/users", &user_id)).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(is_paid: bool, is_active: bool) -> User {
        User {
            user_id: UserId::new("U1"),
            email: "amy@example.com".to_string(),
            name: "Amy".to_string(),
            auth_provider: "email".to_string(),
            is_paid,
            is_active,
            created_at: "2024-03-05T08:09:10.000Z".to_string(),
        }
    }

    #[test]
    fn test_toggles_post_negated_values() {
        let detail = UserDetail::from(&user(true, false));
        let toggles: Vec<_> = detail
            .toggles
            .iter()
            .map(|t| (t.field, t.value, t.label.as_str()))
            .collect();
        assert_eq!(
            toggles,
            vec![("is_paid", false, "設為免費"), ("is_active", true, "設為啟用")]
        );
    }

    #[test]
    fn test_row_badges() {
        let row = UserRow::from(&user(false, true));
        assert_eq!((row.paid.label, row.paid.class), ("免費", "warning"));
        assert_eq!((row.active.label, row.active.class), ("啟用", "success"));
        assert_eq!(row.created, "2024/3/5");
    }

    #[test]
    fn test_confirm_messages() {
        assert_eq!(
            status_confirm_message("amy@example.com", StatusField::IsPaid, true),
            "確定要將 amy@example.com 的付費狀態改為「付費」嗎？"
        );
        assert_eq!(
            status_confirm_message("amy@example.com", StatusField::IsActive, false),
            "確定要將 amy@example.com 的帳號狀態改為「停用」嗎？"
        );
        assert_eq!(
            delete_confirm_message(&user(true, true)),
            "確定要刪除用戶 amy@example.com (Amy) 嗎？\n\n此操作無法復原！"
        );
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query(Some("  AMY ")), "amy");
        assert_eq!(normalize_query(None), "");
    }
}
