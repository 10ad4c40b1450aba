//! Permissions view: per-user access, release dates and content types.

pub mod sheet;

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::{
    Session, UserId,
    editor::{EditorEvent, EditorPhase},
    parse_lenient_date,
    view::{AdminView, Selection},
};
use tracing::instrument;

use self::sheet::{PermissionSheet, SheetOp, SheetSubmission, UserHeader};
use super::{
    ConfirmTemplate, Page,
    content::{TypeOption, type_options},
    failure_text, id_path, render,
};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{
    Flash,
    session::{keys, load_phase, load_selection, push_flash, store_phase, store_selection},
};
use crate::state::AppState;

const TYPES_CONFIRM_MESSAGE: &str = "確定要更新影片類型嗎？這將影響所有用戶對這些影片的存取權限。";

/// One editor row as rendered.
#[derive(Debug, Clone)]
pub struct RowView {
    pub content_id: String,
    pub title: String,
    pub type_label: &'static str,
    pub type_class: &'static str,
    pub original_type: &'static str,
    pub type_options: Vec<TypeOption>,
    pub has_access: bool,
    pub release_date: String,
}

/// The open editor.
#[derive(Debug, Clone)]
pub struct EditorView {
    pub user_id: String,
    pub user: UserHeader,
    pub phase: &'static str,
    pub edited: bool,
    pub load_error: Option<String>,
    pub batch_date: String,
    pub rows: Vec<RowView>,
}

impl EditorView {
    fn new(user_id: &UserId, user: UserHeader, phase: &EditorPhase, sheet: &PermissionSheet) -> Self {
        Self {
            user_id: user_id.to_string(),
            user,
            phase: phase.name(),
            edited: phase.has_unsaved_edits(),
            load_error: phase.load_error().map(str::to_string),
            batch_date: String::new(),
            rows: sheet
                .rows
                .iter()
                .map(|row| RowView {
                    content_id: row.content_id.to_string(),
                    title: row.title.clone(),
                    type_label: row.original_type.label(),
                    type_class: row.original_type.badge_class(),
                    original_type: row.original_type.as_str(),
                    type_options: type_options(row.content_type),
                    has_access: row.has_access,
                    release_date: row
                        .release_date
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    fn with_batch_date(mut self, batch_date: String) -> Self {
        self.batch_date = batch_date;
        self
    }
}

/// Permissions page template. No editor means the placeholder.
#[derive(Template)]
#[template(path = "permissions.html")]
pub struct PermissionsTemplate {
    pub page: Page,
    pub editor: Option<EditorView>,
}

async fn render_editor(
    store: &tower_sessions::Session,
    admin: &Session,
    editor: Option<EditorView>,
    inline: Option<Flash>,
) -> Result<Response> {
    let mut page = Page::enter(store, admin, AdminView::Permissions).await?;
    if let Some(flash) = inline {
        page = page.with_flash(flash);
    }
    let template = PermissionsTemplate { page, editor };
    Ok(render(&template)?.into_response())
}

/// Placeholder, or the editor for the selected user.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    store: tower_sessions::Session,
) -> Result<Response> {
    if let Some(user_id) = load_selection(&store).await?.selected_permission_user() {
        return Ok(Redirect::to(&id_path("/permissions", &user_id)).into_response());
    }
    render_editor(&store, &admin, None, None).await
}

/// Open (or reload) the editor for a user.
#[instrument(skip(admin, state, store))]
pub async fn open(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(user_id): Path<String>,
) -> Result<Response> {
    let user_id = UserId::new(user_id);

    let user = match state.api().get_all_users(&admin.token).await {
        Ok(users) => {
            let user = users
                .iter()
                .find(|u| u.user_id == user_id)
                .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;
            Some(UserHeader::from(user))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load users for the permissions header");
            None
        }
    };

    // Only a known (or unverifiable) user becomes the selection.
    store_selection(&store, &Selection::with_permission_user(user_id.clone())).await?;
    let phase = load_phase(&store, keys::PERMISSIONS_EDITOR)
        .await?
        .apply(EditorEvent::Open)?;

    let loaded = match &user {
        Some(_) => state
            .api()
            .load_permission_records(&admin.token, &user_id)
            .await
            .map(|records| PermissionSheet::from_records(&records))
            .map_err(|e| {
                tracing::warn!(error = %e, user_id = %user_id, "Failed to load permissions");
                failure_text("載入失敗", &e)
            }),
        None => Err("載入失敗".to_string()),
    };

    let (phase, sheet) = match loaded {
        Ok(sheet) => (phase.apply(EditorEvent::LoadSucceeded)?, sheet),
        Err(message) => (
            phase.apply(EditorEvent::LoadFailed(message))?,
            PermissionSheet::default(),
        ),
    };
    store_phase(&store, keys::PERMISSIONS_EDITOR, &phase).await?;

    let editor = EditorView::new(&user_id, user.unwrap_or_default(), &phase, &sheet);
    render_editor(&store, &admin, Some(editor), None).await
}

/// Local operations, save, and save types.
#[instrument(skip(admin, state, store, pairs))]
pub async fn submit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(user_id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let user_id = UserId::new(user_id);
    let mut submission =
        SheetSubmission::parse(&pairs).map_err(|e| AppError::BadRequest(e.to_string()))?;
    tracing::debug!(op = ?submission.op, rows = submission.sheet.rows.len(), "Permissions submit");

    store_selection(&store, &Selection::with_permission_user(user_id.clone())).await?;

    // The form carries every row, so a lost phase resumes as loaded
    let phase = match load_phase(&store, keys::PERMISSIONS_EDITOR).await? {
        phase @ EditorPhase::Loaded { .. } => phase,
        _ => EditorPhase::Loaded { edited: false },
    };

    match submission.op {
        SheetOp::SelectAll | SheetOp::DeselectAll | SheetOp::BatchDate | SheetOp::ClearDates => {
            let mut inline = None;
            match submission.op {
                SheetOp::SelectAll => submission.sheet.set_all_access(true),
                SheetOp::DeselectAll => submission.sheet.set_all_access(false),
                SheetOp::ClearDates => submission.sheet.set_all_dates(None),
                _ => match parse_lenient_date(&submission.batch_date) {
                    Some(date) => submission.sheet.set_all_dates(Some(date)),
                    None => inline = Some(Flash::info("請先選擇日期")),
                },
            }

            let phase = phase.apply(EditorEvent::Edit)?;
            store_phase(&store, keys::PERMISSIONS_EDITOR, &phase).await?;

            let editor = EditorView::new(&user_id, submission.user, &phase, &submission.sheet)
                .with_batch_date(submission.batch_date);
            render_editor(&store, &admin, Some(editor), inline).await
        }
        SheetOp::Save => save_access(&state, &store, &admin, &user_id, phase, submission).await,
        SheetOp::SaveTypes => {
            save_types(&state, &store, &admin, &user_id, phase, submission).await
        }
    }
}

/// Write the whole checkbox state, then the whole date state.
async fn save_access(
    state: &AppState,
    store: &tower_sessions::Session,
    admin: &Session,
    user_id: &UserId,
    phase: EditorPhase,
    submission: SheetSubmission,
) -> Result<Response> {
    let phase = phase.apply(EditorEvent::Save)?;
    store_phase(store, keys::PERMISSIONS_EDITOR, &phase).await?;

    let save = submission.sheet.to_save();
    match state.api().save_permissions(&admin.token, user_id, &save).await {
        Ok(()) => {
            let phase = phase.apply(EditorEvent::SaveSucceeded { keep_open: true })?;
            store_phase(store, keys::PERMISSIONS_EDITOR, &phase).await?;
            push_flash(store, Flash::success("權限更新成功！")).await?;
            Ok(Redirect::to(&id_path("/permissions", &user_id)).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to save permissions");
            let phase = phase.apply(EditorEvent::SaveFailed)?;
            store_phase(store, keys::PERMISSIONS_EDITOR, &phase).await?;

            let editor = EditorView::new(user_id, submission.user, &phase, &submission.sheet)
                .with_batch_date(submission.batch_date);
            let flash = Flash::error(failure_text("權限更新失敗", &e));
            render_editor(store, admin, Some(editor), Some(flash)).await
        }
    }
}

/// Write every row's content type, after confirmation.
async fn save_types(
    state: &AppState,
    store: &tower_sessions::Session,
    admin: &Session,
    user_id: &UserId,
    phase: EditorPhase,
    submission: SheetSubmission,
) -> Result<Response> {
    if !submission.sheet.types_changed() {
        let editor = EditorView::new(user_id, submission.user, &phase, &submission.sheet)
            .with_batch_date(submission.batch_date);
        let flash = Flash::info("沒有變更需要儲存");
        return render_editor(store, admin, Some(editor), Some(flash)).await;
    }

    if !submission.confirmed {
        let template = ConfirmTemplate {
            page: Page::enter(store, admin, AdminView::Permissions).await?,
            message: TYPES_CONFIRM_MESSAGE.to_string(),
            action: id_path("/permissions", user_id),
            fields: submission.to_pairs("save_types"),
            cancel_href: id_path("/permissions", user_id),
        };
        return Ok(render(&template)?.into_response());
    }

    let phase = phase.apply(EditorEvent::Save)?;
    store_phase(store, keys::PERMISSIONS_EDITOR, &phase).await?;

    let updates = submission.sheet.type_updates();
    match state.api().update_content_types(&admin.token, &updates).await {
        Ok(()) => {
            let phase = phase.apply(EditorEvent::SaveSucceeded { keep_open: true })?;
            store_phase(store, keys::PERMISSIONS_EDITOR, &phase).await?;
            push_flash(store, Flash::success("影片類型更新成功！")).await?;
            Ok(Redirect::to(&id_path("/permissions", &user_id)).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update content types");
            let phase = phase.apply(EditorEvent::SaveFailed)?;
            store_phase(store, keys::PERMISSIONS_EDITOR, &phase).await?;

            let editor = EditorView::new(user_id, submission.user, &phase, &submission.sheet)
                .with_batch_date(submission.batch_date);
            let flash = Flash::error(failure_text("更新失敗", &e));
            render_editor(store, admin, Some(editor), Some(flash)).await
        }
    }
}

/// Close the editor and show the placeholder.
#[instrument(skip_all)]
pub async fn close(
    RequireAdmin(_admin): RequireAdmin,
    store: tower_sessions::Session,
) -> Result<Redirect> {
    let phase = load_phase(&store, keys::PERMISSIONS_EDITOR)
        .await?
        .apply(EditorEvent::Close)?;
    store_phase(&store, keys::PERMISSIONS_EDITOR, &phase).await?;

    let selection = load_selection(&store).await?.close_permissions();
    store_selection(&store, &selection).await?;
    Ok(Redirect::to("/permissions"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use eduplatform_core::{ContentId, ContentType, PermissionRecord};

    fn sheet() -> PermissionSheet {
        PermissionSheet::from_records(&[
            PermissionRecord {
                content_id: ContentId::new("C1"),
                title: "Intro".to_string(),
                content_type: ContentType::Free,
                has_access: true,
                release_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            },
            PermissionRecord {
                content_id: ContentId::new("C3"),
                title: "Masterclass".to_string(),
                content_type: ContentType::Vip,
                has_access: false,
                release_date: None,
            },
        ])
    }

    #[test]
    fn test_editor_view_rows() {
        let editor = EditorView::new(
            &UserId::new("U1"),
            UserHeader::default(),
            &EditorPhase::Loaded { edited: true },
            &sheet(),
        );
        assert!(editor.edited);
        assert_eq!(editor.phase, "loaded");
        assert_eq!(editor.rows[0].release_date, "2025-01-31");
        assert_eq!(editor.rows[1].release_date, "");
        assert_eq!(
            (editor.rows[1].type_label, editor.rows[1].type_class),
            ("VIP", "warning")
        );
    }

    #[test]
    fn test_template_renders_placeholder_and_editor() {
        let page = Page {
            admin_user: crate::routes::AdminUserView {
                name: "Admin".to_string(),
                email: String::new(),
            },
            nav: eduplatform_core::view::switch_view(AdminView::Permissions).nav,
            flash: None,
        };

        let html = PermissionsTemplate {
            page: page.clone(),
            editor: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("permission-placeholder"));

        let editor = EditorView::new(
            &UserId::new("U1"),
            UserHeader {
                email: "amy@example.com".to_string(),
                name: "Amy".to_string(),
                is_paid: false,
            },
            &EditorPhase::Loaded { edited: false },
            &sheet(),
        );
        let html = PermissionsTemplate {
            page,
            editor: Some(editor),
        }
        .render()
        .unwrap();
        assert!(html.contains("免費用戶"));
        assert!(html.contains(r#"name="access" value="C1" checked"#));
        assert!(html.contains(r#"name="access" value="C3">"#));
        assert!(html.contains(r#"name="date.C1" value="2025-01-31""#));
    }

    #[test]
    fn test_form_action_encodes_user_id() {
        let page = Page {
            admin_user: crate::routes::AdminUserView {
                name: "Admin".to_string(),
                email: String::new(),
            },
            nav: eduplatform_core::view::switch_view(AdminView::Permissions).nav,
            flash: None,
        };
        let editor = EditorView::new(
            &UserId::new("a b/c"),
            UserHeader::default(),
            &EditorPhase::Loaded { edited: false },
            &sheet(),
        );
        let html = PermissionsTemplate {
            page,
            editor: Some(editor),
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"action="/permissions/a%20b%2Fc""#));
        assert!(!html.contains("/permissions/a b/c"));
    }
}
