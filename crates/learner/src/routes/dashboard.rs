//! Signed-in views: the content grid with its video player, and About.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use eduplatform_core::{
    ContentId, LearnerContent,
    api::ApiError,
    video::player_src,
    view::{LearnerView, NavEntry, switch_view},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb, clear_sentry_user};
use crate::filters;
use crate::middleware::{RequireLearner, clear_current_session};
use crate::state::AppState;

/// Shown in the player modal for locked content.
pub const LOCK_MESSAGE: &str = "🔒 此內容需付費解鎖，請聯繫管理員開通權限";

/// Seconds before an expired session is sent back to login.
pub const EXPIRED_REDIRECT_SECONDS: u8 = 2;

/// Query parameters of the dashboard.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Content to open in the player modal.
    pub open: Option<String>,
}

/// One card of the content grid.
#[derive(Debug, Clone)]
pub struct CardView {
    pub content_id: String,
    pub title: String,
    pub thumbnail: String,
    pub type_label: &'static str,
    pub status_class: &'static str,
    pub status_label: &'static str,
    pub open_href: String,
}

impl From<&LearnerContent> for CardView {
    fn from(item: &LearnerContent) -> Self {
        Self {
            content_id: item.content_id.to_string(),
            title: item.title.clone(),
            thumbnail: item.thumbnail.clone().unwrap_or_default(),
            type_label: item.content_type.label(),
            status_class: item.status_class(),
            status_label: item.status_label(),
            open_href: format!(
                "/dashboard?open={}",
                urlencoding::encode(item.content_id.as_str())
            ),
        }
    }
}

/// The player modal.
#[derive(Debug, Clone)]
pub struct VideoModal {
    pub title: String,
    pub unlocked: bool,
    /// Empty for locked content.
    pub player_src: String,
    pub lock_message: &'static str,
}

impl From<&LearnerContent> for VideoModal {
    fn from(item: &LearnerContent) -> Self {
        Self {
            title: item.title.clone(),
            unlocked: item.is_unlocked,
            player_src: if item.is_unlocked {
                player_src(&item.url)
            } else {
                String::new()
            },
            lock_message: LOCK_MESSAGE,
        }
    }
}

/// Inline failure panel shown in place of the grid.
#[derive(Debug, Clone)]
pub struct FailurePanel {
    pub headline: &'static str,
    pub detail: String,
    /// Set when the session expired: redirect to login after this many
    /// seconds.
    pub redirect_seconds: Option<u8>,
}

impl FailurePanel {
    /// Panel for a failed `getContent` call.
    #[must_use]
    pub fn for_error(err: &ApiError) -> Self {
        match err {
            ApiError::Rejected { .. } => Self {
                headline: "😕 無法載入內容",
                detail: err.display_message("請稍後再試").to_string(),
                redirect_seconds: err
                    .is_session_expired()
                    .then_some(EXPIRED_REDIRECT_SECONDS),
            },
            _ => Self {
                headline: "❌ 載入失敗",
                detail: "請檢查網路連線".to_string(),
                redirect_seconds: None,
            },
        }
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user_name: Option<String>,
    pub nav: Vec<NavEntry>,
    pub cards: Vec<CardView>,
    pub failure: Option<FailurePanel>,
    pub modal: Option<VideoModal>,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub user_name: Option<String>,
    pub nav: Vec<NavEntry>,
}

/// Display the content grid, with the player open when `?open=` is set.
///
/// Content is re-fetched on every visit. An expired session is cleared
/// immediately and the page sends the learner back to login.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    store: tower_sessions::Session,
    RequireLearner(session): RequireLearner,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let switch = switch_view(LearnerView::Dashboard);
    let mut page = DashboardTemplate {
        user_name: Some(session.display_name("").to_string()),
        nav: switch.nav,
        cards: Vec::new(),
        failure: None,
        modal: None,
    };

    match state.api().get_content(&session.token).await {
        Ok(items) => {
            page.cards = items.iter().map(CardView::from).collect();
            page.modal = query
                .open
                .map(ContentId::from)
                .and_then(|id| items.iter().find(|item| item.content_id == id))
                .map(|item| {
                    add_breadcrumb(
                        "content",
                        "Opened content",
                        Some(&[("content_id", item.content_id.as_str())]),
                    );
                    VideoModal::from(item)
                });
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load content");
            if e.is_session_expired() {
                clear_current_session(&store).await?;
                clear_sentry_user();
            }
            page.failure = Some(FailurePanel::for_error(&e));
        }
    }

    Ok(page.into_response())
}

/// Display the About view.
pub async fn about(RequireLearner(session): RequireLearner) -> impl IntoResponse {
    AboutTemplate {
        user_name: Some(session.display_name("").to_string()),
        nav: switch_view(LearnerView::About).nav,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use eduplatform_core::{ContentType, ErrorKind};

    fn item(id: &str, content_type: ContentType, unlocked: bool) -> LearnerContent {
        LearnerContent {
            content_id: ContentId::new(id),
            title: format!("Lesson {id}"),
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            thumbnail: None,
            content_type,
            is_unlocked: unlocked,
        }
    }

    #[test]
    fn test_locked_vip_modal_has_empty_player() {
        let modal = VideoModal::from(&item("V1", ContentType::Vip, false));
        assert!(!modal.unlocked);
        assert!(modal.player_src.is_empty());

        let html = DashboardTemplate {
            user_name: Some("小明".to_string()),
            nav: switch_view(LearnerView::Dashboard).nav,
            cards: Vec::new(),
            failure: None,
            modal: Some(modal),
        }
        .render()
        .unwrap();
        assert!(html.contains(LOCK_MESSAGE));
        assert!(html.contains("src=\"\""));
    }

    #[test]
    fn test_unlocked_modal_uses_embed_url() {
        let modal = VideoModal::from(&item("F1", ContentType::Free, true));
        assert_eq!(modal.player_src, "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn test_card_badges_follow_unlock_flag() {
        let cards: Vec<CardView> = [
            item("A", ContentType::Free, true),
            item("B", ContentType::Paid, false),
        ]
        .iter()
        .map(CardView::from)
        .collect();

        assert_eq!(cards[0].status_class, "unlocked");
        assert_eq!(cards[0].status_label, "已解鎖");
        assert_eq!(cards[1].status_class, "locked");
        assert_eq!(cards[1].status_label, "需付費");
        assert_eq!(cards[1].open_href, "/dashboard?open=B");
    }

    #[test]
    fn test_failure_panel_kinds() {
        let expired = FailurePanel::for_error(&ApiError::Rejected {
            kind: ErrorKind::SessionExpired,
            message: "Session expired".to_string(),
        });
        assert_eq!(expired.headline, "😕 無法載入內容");
        assert_eq!(expired.detail, "Session expired");
        assert_eq!(expired.redirect_seconds, Some(EXPIRED_REDIRECT_SECONDS));

        let rejected = FailurePanel::for_error(&ApiError::Rejected {
            kind: ErrorKind::Rejected,
            message: String::new(),
        });
        assert_eq!(rejected.detail, "請稍後再試");
        assert_eq!(rejected.redirect_seconds, None);
    }

    #[test]
    fn test_expired_panel_renders_refresh() {
        let html = DashboardTemplate {
            user_name: Some("小明".to_string()),
            nav: switch_view(LearnerView::Dashboard).nav,
            cards: Vec::new(),
            failure: Some(FailurePanel::for_error(&ApiError::Rejected {
                kind: ErrorKind::SessionExpired,
                message: "Session expired".to_string(),
            })),
            modal: None,
        }
        .render()
        .unwrap();

        assert!(html.contains("http-equiv=\"refresh\""));
        assert!(html.contains("2;url=/auth/login"));
        assert!(html.contains("重試"));
    }
}
