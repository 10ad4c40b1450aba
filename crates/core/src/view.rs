//! Named views, navigation markers and the admin's selection slots.
//!
//! Both apps have a fixed set of views with exactly one active at a time.
//! Switching views is a pure transition; the returned [`ViewSwitch`] tells
//! the caller which backend collection to reload.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ContentId, UserId};

/// Error for a view name that does not exist in the app.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown view: {0}")]
pub struct UnknownView(pub String);

/// Backend collection refreshed when a view is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    LearnerContent,
    Users,
    Content,
    Stats,
}

/// Behaviour shared by the learner and admin view sets.
pub trait AppView: Copy + Eq + Sized + 'static {
    /// Every view, in navigation order.
    const ALL: &'static [Self];

    /// Route segment / `data-view` name.
    fn name(self) -> &'static str;

    /// Navigation label.
    fn label(self) -> &'static str;

    /// Collection to reload when this view is entered, if any.
    fn reloads(self) -> Option<Collection>;
}

/// Views of the learner app once signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerView {
    Dashboard,
    About,
}

impl AppView for LearnerView {
    const ALL: &'static [Self] = &[Self::Dashboard, Self::About];

    fn name(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::About => "about",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "我的課程",
            Self::About => "關於我們",
        }
    }

    fn reloads(self) -> Option<Collection> {
        match self {
            Self::Dashboard => Some(Collection::LearnerContent),
            Self::About => None,
        }
    }
}

/// Views of the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminView {
    Users,
    Content,
    Permissions,
    Stats,
}

impl AppView for AdminView {
    const ALL: &'static [Self] = &[Self::Users, Self::Content, Self::Permissions, Self::Stats];

    fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Content => "content",
            Self::Permissions => "permissions",
            Self::Stats => "stats",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Users => "用戶管理",
            Self::Content => "內容管理",
            Self::Permissions => "權限設定",
            Self::Stats => "統計資料",
        }
    }

    fn reloads(self) -> Option<Collection> {
        match self {
            Self::Users => Some(Collection::Users),
            Self::Content => Some(Collection::Content),
            Self::Stats => Some(Collection::Stats),
            Self::Permissions => None,
        }
    }
}

macro_rules! impl_view_parsing {
    ($view:ty) => {
        impl FromStr for $view {
            type Err = UnknownView;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as AppView>::ALL
                    .iter()
                    .copied()
                    .find(|view| view.name() == s)
                    .ok_or_else(|| UnknownView(s.to_owned()))
            }
        }

        impl fmt::Display for $view {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

impl_view_parsing!(LearnerView);
impl_view_parsing!(AdminView);

/// One navigation link with its active marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub name: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Result of entering a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSwitch<V> {
    pub active: V,
    pub nav: Vec<NavEntry>,
    pub reload: Option<Collection>,
}

/// Activate `target`, deactivate every other view and nav marker.
#[must_use]
pub fn switch_view<V: AppView>(target: V) -> ViewSwitch<V> {
    ViewSwitch {
        active: target,
        nav: V::ALL
            .iter()
            .map(|&view| NavEntry {
                name: view.name(),
                label: view.label(),
                active: view == target,
            })
            .collect(),
        reload: target.reloads(),
    }
}

/// Which entity pending admin actions target.
///
/// The three slots are mutually exclusive: selecting one clears the others,
/// and closing the owning modal or editor clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    selected_user: Option<UserId>,
    #[serde(default)]
    selected_permission_user: Option<UserId>,
    #[serde(default)]
    editing_content: Option<ContentTarget>,
}

/// Target of the content editor: a new item, or an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "content_id")]
pub enum ContentTarget {
    Create,
    Edit(ContentId),
}

impl ContentTarget {
    /// The id being edited, `None` when creating.
    #[must_use]
    pub const fn content_id(&self) -> Option<&ContentId> {
        match self {
            Self::Create => None,
            Self::Edit(id) => Some(id),
        }
    }
}

impl Selection {
    /// Open the user-detail modal for `user_id`.
    #[must_use]
    pub fn with_user(user_id: UserId) -> Self {
        Self {
            selected_user: Some(user_id),
            ..Self::default()
        }
    }

    /// Open the permissions editor for `user_id`.
    #[must_use]
    pub fn with_permission_user(user_id: UserId) -> Self {
        Self {
            selected_permission_user: Some(user_id),
            ..Self::default()
        }
    }

    /// Open the content editor.
    #[must_use]
    pub fn with_content(target: ContentTarget) -> Self {
        Self {
            editing_content: Some(target),
            ..Self::default()
        }
    }

    /// Close the user-detail modal. Other slots are untouched.
    #[must_use]
    pub fn close_user(self) -> Self {
        Self {
            selected_user: None,
            ..self
        }
    }

    /// Close the permissions editor.
    #[must_use]
    pub fn close_permissions(self) -> Self {
        Self {
            selected_permission_user: None,
            ..self
        }
    }

    /// Close the content editor.
    #[must_use]
    pub fn close_content(self) -> Self {
        Self {
            editing_content: None,
            ..self
        }
    }

    #[must_use]
    pub const fn selected_user(&self) -> Option<&UserId> {
        self.selected_user.as_ref()
    }

    #[must_use]
    pub const fn selected_permission_user(&self) -> Option<&UserId> {
        self.selected_permission_user.as_ref()
    }

    #[must_use]
    pub const fn editing_content(&self) -> Option<&ContentTarget> {
        self.editing_content.as_ref()
    }

    /// Number of occupied slots (never more than one).
    #[must_use]
    pub fn occupied(&self) -> usize {
        usize::from(self.selected_user.is_some())
            + usize::from(self.selected_permission_user.is_some())
            + usize::from(self.editing_content.is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_view_marks_exactly_one() {
        for &view in AdminView::ALL {
            let switch = switch_view(view);
            assert_eq!(switch.nav.iter().filter(|e| e.active).count(), 1);
            let active = switch.nav.iter().find(|e| e.active).unwrap();
            assert_eq!(active.name, view.name());
        }
    }

    #[test]
    fn test_reload_targets() {
        assert_eq!(switch_view(AdminView::Users).reload, Some(Collection::Users));
        assert_eq!(switch_view(AdminView::Content).reload, Some(Collection::Content));
        assert_eq!(switch_view(AdminView::Stats).reload, Some(Collection::Stats));
        assert_eq!(switch_view(AdminView::Permissions).reload, None);
        assert_eq!(switch_view(LearnerView::About).reload, None);
        assert_eq!(
            switch_view(LearnerView::Dashboard).reload,
            Some(Collection::LearnerContent)
        );
    }

    #[test]
    fn test_parse_view_names() {
        assert_eq!("stats".parse::<AdminView>().unwrap(), AdminView::Stats);
        assert_eq!("about".parse::<LearnerView>().unwrap(), LearnerView::About);
        assert_eq!(
            "orders".parse::<AdminView>(),
            Err(UnknownView("orders".to_string()))
        );
    }

    #[test]
    fn test_selection_slots_are_exclusive() {
        let user = UserId::new("u1");
        let selection = Selection::with_user(user.clone());
        assert_eq!(selection.selected_user(), Some(&user));

        let selection = Selection::with_permission_user(user.clone());
        assert_eq!(selection.selected_user(), None);
        assert_eq!(selection.selected_permission_user(), Some(&user));
        assert_eq!(selection.occupied(), 1);

        let selection = Selection::with_content(ContentTarget::Create);
        assert_eq!(selection.selected_permission_user(), None);
        assert_eq!(selection.occupied(), 1);
    }

    #[test]
    fn test_close_clears_only_its_slot() {
        let selection = Selection::with_user(UserId::new("u1")).close_permissions();
        assert!(selection.selected_user().is_some());
        assert_eq!(selection.close_user(), Selection::default());
    }

    #[test]
    fn test_selection_serde_roundtrip() {
        let selection = Selection::with_content(ContentTarget::Edit(ContentId::new("C7")));
        let json = serde_json::to_string(&selection).unwrap();
        let back: Selection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, selection);
        assert_eq!(
            back.editing_content().and_then(ContentTarget::content_id),
            Some(&ContentId::new("C7"))
        );
    }
}
