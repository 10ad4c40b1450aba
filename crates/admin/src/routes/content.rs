//! Content view: table, editor (create / edit) and delete.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::{
    ContentDraft, ContentId, ContentItem, ContentType, Session,
    editor::{EditorEvent, EditorPhase},
    video::VideoLink,
    view::{AdminView, ContentTarget, Selection},
};
use serde::Deserialize;
use tracing::instrument;

use super::{ConfirmForm, ConfirmTemplate, Page, failure_text, id_path, is_confirmed, render};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{
    Flash,
    session::{keys, load_phase, load_selection, push_flash, store_phase, store_selection},
};
use crate::state::AppState;

/// Content editor form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub description: String,
}

impl From<&ContentItem> for ContentForm {
    fn from(item: &ContentItem) -> Self {
        Self {
            title: item.title.clone(),
            url: item.url.clone(),
            content_type: item.content_type,
            description: item.description.clone().unwrap_or_default(),
        }
    }
}

impl Default for ContentForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            url: String::new(),
            content_type: ContentType::Free,
            description: String::new(),
        }
    }
}

impl ContentForm {
    /// Check the title and video link.
    fn validate(&self) -> std::result::Result<ContentDraft, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("請輸入標題".to_string());
        }
        let link = VideoLink::parse(&self.url).map_err(|e| e.to_string())?;

        Ok(ContentDraft {
            title: title.to_string(),
            url: link.as_str().to_string(),
            content_type: self.content_type,
            description: self.description.trim().to_string(),
        })
    }
}

/// Content row for the table.
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub content_id: String,
    pub title: String,
    pub url: String,
    pub type_label: &'static str,
    pub type_class: &'static str,
    pub access: String,
}

impl ContentRow {
    fn new(item: &ContentItem, total_users: Option<usize>) -> Self {
        let access = total_users.map_or_else(
            || "-".to_string(),
            |total| format!("{} / {total}", item.access_count.unwrap_or(0)),
        );
        Self {
            content_id: item.content_id.to_string(),
            title: item.title.clone(),
            url: item.url.clone(),
            type_label: item.content_type.label(),
            type_class: item.content_type.badge_class(),
            access,
        }
    }
}

/// One `<option>` of the content-type select.
#[derive(Debug, Clone)]
pub struct TypeOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Options for a content-type select with `current` selected.
#[must_use]
pub fn type_options(current: ContentType) -> Vec<TypeOption> {
    ContentType::ALL
        .iter()
        .map(|&ty| TypeOption {
            value: ty.as_str(),
            label: ty.label(),
            selected: ty == current,
        })
        .collect()
}

/// The open editor.
#[derive(Debug, Clone)]
pub struct EditorView {
    pub heading: &'static str,
    pub action: String,
    pub phase: &'static str,
    pub form: ContentForm,
    pub type_options: Vec<TypeOption>,
    pub load_error: Option<String>,
    pub error: Option<String>,
}

impl EditorView {
    fn new(target: &ContentTarget, phase: &EditorPhase, form: ContentForm) -> Self {
        let (heading, action) = match target {
            ContentTarget::Create => ("新增內容", "/content".to_string()),
            ContentTarget::Edit(id) => ("編輯內容", id_path("/content", id)),
        };
        Self {
            heading,
            action,
            phase: phase.name(),
            type_options: type_options(form.content_type),
            form,
            load_error: phase.load_error().map(str::to_string),
            error: None,
        }
    }

    fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Content page template.
#[derive(Template)]
#[template(path = "content.html")]
pub struct ContentTemplate {
    pub page: Page,
    pub rows: Vec<ContentRow>,
    pub load_error: Option<String>,
    pub editor: Option<EditorView>,
}

/// Content table data.
struct Table {
    items: Vec<ContentItem>,
    rows: Vec<ContentRow>,
    load_error: Option<String>,
}

/// Load the content list and the user total for the access column.
async fn load_table(state: &AppState, admin: &Session) -> Table {
    let items = match state.api().get_all_content(&admin.token).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load content");
            return Table {
                items: Vec::new(),
                rows: Vec::new(),
                load_error: Some(failure_text("載入失敗", &e)),
            };
        }
    };

    let total_users = match state.api().get_all_users(&admin.token).await {
        Ok(users) => Some(users.len()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load users for access counts");
            None
        }
    };

    Table {
        rows: items
            .iter()
            .map(|item| ContentRow::new(item, total_users))
            .collect(),
        items,
        load_error: None,
    }
}

async fn render_content(
    store: &tower_sessions::Session,
    admin: &Session,
    table: Table,
    editor: Option<EditorView>,
) -> Result<Response> {
    let template = ContentTemplate {
        page: Page::enter(store, admin, AdminView::Content).await?,
        rows: table.rows,
        load_error: table.load_error,
        editor,
    };
    Ok(render(&template)?.into_response())
}

/// Content table.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
) -> Result<Response> {
    let table = load_table(&state, &admin).await;
    render_content(&store, &admin, table, None).await
}

/// Open the editor for a new item.
#[instrument(skip_all)]
pub async fn new(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
) -> Result<Response> {
    let target = ContentTarget::Create;
    store_selection(&store, &Selection::with_content(target.clone())).await?;

    // Nothing to fetch for a blank form
    let phase = EditorPhase::Closed
        .apply(EditorEvent::Open)?
        .apply(EditorEvent::LoadSucceeded)?;
    store_phase(&store, keys::CONTENT_EDITOR, &phase).await?;

    let table = load_table(&state, &admin).await;
    let editor = EditorView::new(&target, &phase, ContentForm::default());
    render_content(&store, &admin, table, Some(editor)).await
}

/// Open the editor for an existing item.
#[instrument(skip(admin, state, store))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(id): Path<String>,
) -> Result<Response> {
    let content_id = ContentId::new(id);
    let target = ContentTarget::Edit(content_id.clone());
    store_selection(&store, &Selection::with_content(target.clone())).await?;

    let phase = load_phase(&store, keys::CONTENT_EDITOR)
        .await?
        .apply(EditorEvent::Open)?;
    let table = load_table(&state, &admin).await;

    let (phase, form) = if let Some(message) = &table.load_error {
        (
            phase.apply(EditorEvent::LoadFailed(message.clone()))?,
            ContentForm::default(),
        )
    } else {
        let item = table
            .items
            .iter()
            .find(|item| item.content_id == content_id)
            .ok_or_else(|| AppError::NotFound(format!("content {content_id}")))?;
        (
            phase.apply(EditorEvent::LoadSucceeded)?,
            ContentForm::from(item),
        )
    };
    store_phase(&store, keys::CONTENT_EDITOR, &phase).await?;

    let editor = EditorView::new(&target, &phase, form);
    render_content(&store, &admin, table, Some(editor)).await
}

/// Add a new item.
#[instrument(skip(admin, state, store, form))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Form(form): Form<ContentForm>,
) -> Result<Response> {
    save(&state, &store, &admin, ContentTarget::Create, form).await
}

/// Update an existing item.
#[instrument(skip(admin, state, store, form))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(id): Path<String>,
    Form(form): Form<ContentForm>,
) -> Result<Response> {
    let target = ContentTarget::Edit(ContentId::new(id));
    save(&state, &store, &admin, target, form).await
}

/// Validate, write, then close the editor or re-render it with the
/// submitted values.
async fn save(
    state: &AppState,
    store: &tower_sessions::Session,
    admin: &Session,
    target: ContentTarget,
    form: ContentForm,
) -> Result<Response> {
    store_selection(store, &Selection::with_content(target.clone())).await?;

    // The submitted form carries everything, so a lost phase resumes as loaded
    let phase = match load_phase(store, keys::CONTENT_EDITOR).await? {
        phase @ EditorPhase::Loaded { .. } => phase,
        _ => EditorPhase::Loaded { edited: false },
    };
    let phase = phase.apply(EditorEvent::Edit)?;

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(message) => {
            store_phase(store, keys::CONTENT_EDITOR, &phase).await?;
            let table = load_table(state, admin).await;
            let editor = EditorView::new(&target, &phase, form).with_error(message);
            let response = render_content(store, admin, table, Some(editor)).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, response).into_response());
        }
    };

    let phase = phase.apply(EditorEvent::Save)?;
    store_phase(store, keys::CONTENT_EDITOR, &phase).await?;

    let result = match target.content_id() {
        None => state.api().add_content(&admin.token, &draft).await,
        Some(content_id) => state.api().update_content(&admin.token, content_id, &draft).await,
    };

    match result {
        Ok(()) => {
            let phase = phase.apply(EditorEvent::SaveSucceeded { keep_open: false })?;
            store_phase(store, keys::CONTENT_EDITOR, &phase).await?;
            let selection = load_selection(store).await?.close_content();
            store_selection(store, &selection).await?;

            let message = match target {
                ContentTarget::Create => "內容新增成功！",
                ContentTarget::Edit(_) => "內容更新成功！",
            };
            tracing::info!(title = %draft.title, "Content saved");
            push_flash(store, Flash::success(message)).await?;
            Ok(Redirect::to("/content").into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save content");
            let phase = phase.apply(EditorEvent::SaveFailed)?;
            store_phase(store, keys::CONTENT_EDITOR, &phase).await?;

            let table = load_table(state, admin).await;
            let editor =
                EditorView::new(&target, &phase, form).with_error(failure_text("儲存失敗", &e));
            render_content(store, admin, table, Some(editor)).await
        }
    }
}

/// Close the editor.
#[instrument(skip_all)]
pub async fn close(
    RequireAdmin(_admin): RequireAdmin,
    store: tower_sessions::Session,
) -> Result<Redirect> {
    let phase = load_phase(&store, keys::CONTENT_EDITOR)
        .await?
        .apply(EditorEvent::Close)?;
    store_phase(&store, keys::CONTENT_EDITOR, &phase).await?;

    let selection = load_selection(&store).await?.close_content();
    store_selection(&store, &selection).await?;
    Ok(Redirect::to("/content"))
}

fn delete_confirm_message(title: &str) -> String {
    format!("確定要刪除內容「{title}」嗎？\n\n此操作無法復原！")
}

/// Delete an item.
#[instrument(skip(admin, state, store, form))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Result<Response> {
    let content_id = ContentId::new(id);

    if !is_confirmed(form.confirmed.as_deref()) {
        let items = match state.api().get_all_content(&admin.token).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load content for confirmation");
                push_flash(&store, Flash::error(failure_text("刪除失敗", &e))).await?;
                return Ok(Redirect::to("/content").into_response());
            }
        };
        let item = items
            .into_iter()
            .find(|item| item.content_id == content_id)
            .ok_or_else(|| AppError::NotFound(format!("content {content_id}")))?;

        let template = ConfirmTemplate {
            page: Page::enter(&store, &admin, AdminView::Content).await?,
            message: delete_confirm_message(&item.title),
            action: format!("{}/delete", id_path("/content", &content_id)),
            fields: Vec::new(),
            cancel_href: "/content".to_string(),
        };
        return Ok(render(&template)?.into_response());
    }

    match state.api().delete_content(&admin.token, &content_id).await {
        Ok(()) => {
            let selection = load_selection(&store).await?;
            if selection.editing_content().and_then(ContentTarget::content_id) == Some(&content_id)
            {
                store_selection(&store, &selection.close_content()).await?;
                store_phase(&store, keys::CONTENT_EDITOR, &EditorPhase::Closed).await?;
            }
            push_flash(&store, Flash::success("內容刪除成功！")).await?;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete content");
            push_flash(&store, Flash::error(failure_text("刪除失敗", &e))).await?;
        }
    }
    Ok(Redirect::to("/content").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(title: &str, url: &str) -> ContentForm {
        ContentForm {
            title: title.to_string(),
            url: url.to_string(),
            content_type: ContentType::Vip,
            description: " Week 1 ".to_string(),
        }
    }

    #[test]
    fn test_validate_requires_title() {
        let err = form("  ", "https://youtu.be/dQw4w9WgXcQ").validate().unwrap_err();
        assert_eq!(err, "請輸入標題");
    }

    #[test]
    fn test_validate_rejects_unknown_links() {
        let err = form("Intro", "https://example.com/video.mp4")
            .validate()
            .unwrap_err();
        assert_eq!(err, "不支援的影片網址格式");
    }

    #[test]
    fn test_validate_builds_trimmed_draft() {
        let draft = form(" Intro ", " https://vimeo.com/76979871 ")
            .validate()
            .unwrap();
        assert_eq!(draft.title, "Intro");
        assert_eq!(draft.url, "https://vimeo.com/76979871");
        assert_eq!(draft.description, "Week 1");
        assert_eq!(draft.content_type, ContentType::Vip);
    }

    #[test]
    fn test_access_column() {
        let item = ContentItem {
            content_id: ContentId::new("C1"),
            title: "Intro".to_string(),
            url: String::new(),
            content_type: ContentType::Paid,
            description: None,
            access_count: Some(2),
        };
        assert_eq!(ContentRow::new(&item, Some(3)).access, "2 / 3");
        assert_eq!(ContentRow::new(&item, None).access, "-");
    }

    #[test]
    fn test_editor_targets() {
        let phase = EditorPhase::Loaded { edited: false };
        let create = EditorView::new(&ContentTarget::Create, &phase, ContentForm::default());
        assert_eq!((create.heading, create.action.as_str()), ("新增內容", "/content"));

        let edit = EditorView::new(
            &ContentTarget::Edit(ContentId::new("C7")),
            &phase,
            form("Intro", ""),
        );
        assert_eq!(edit.action, "/content/C7");
        let selected: Vec<_> = edit
            .type_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec!["vip"]);
    }

    #[test]
    fn test_delete_confirm_message() {
        assert_eq!(
            delete_confirm_message("Intro"),
            "確定要刪除內容「Intro」嗎？\n\n此操作無法復原！"
        );
    }
}
