//! Stats view.

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use eduplatform_core::{PlatformStats, view::AdminView};
use tracing::instrument;

use super::{Page, render};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// One stat card.
#[derive(Debug, Clone)]
pub struct StatCard {
    pub label: &'static str,
    pub value: String,
}

/// Cards in display order; every value is `-` when the stats did not load.
#[must_use]
pub fn stat_cards(stats: Option<&PlatformStats>) -> Vec<StatCard> {
    let card = |label, pick: fn(&PlatformStats) -> u64| StatCard {
        label,
        value: stats.map_or_else(|| "-".to_string(), |s| pick(s).to_string()),
    };
    vec![
        card("總用戶數", |s| s.total_users),
        card("付費用戶", |s| s.paid_users),
        card("免費用戶", |s| s.free_users),
        card("總內容數", |s| s.total_content),
        card("免費內容", |s| s.free_content),
        card("付費內容", |s| s.paid_content),
    ]
}

/// Stats page template.
#[derive(Template)]
#[template(path = "stats.html")]
pub struct StatsTemplate {
    pub page: Page,
    pub cards: Vec<StatCard>,
}

/// Platform totals.
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    store: tower_sessions::Session,
) -> Result<Response> {
    let page = Page::enter(&store, &admin, AdminView::Stats).await?;

    let stats = match state.api().get_stats(&admin.token).await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load stats");
            None
        }
    };

    let template = StatsTemplate {
        page,
        cards: stat_cards(stats.as_ref()),
    };
    Ok(render(&template)?.into_response())
}
