//! The permissions editor as submitted by the browser.
//!
//! Every rendered row travels with each POST, so local operations (select
//! all, batch dates) rewrite the sheet and re-render it without a backend
//! call, and a save always sends every row.
//!
//! Field layout, in document order:
//!
//! ```text
//! op=save                       operation (see SheetOp)
//! batch_date=2025-06-01         batch release date input
//! user_email / user_name / user_paid
//! row=C1                        one per rendered row, in order
//! title.C1 / original_type.C1 / type.C1 / date.C1
//! access=C1                     only for checked rows
//! confirmed=true                set by the confirmation step
//! ```

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use eduplatform_core::{
    ContentId, ContentType, ContentTypeUpdate, PermissionRecord, PermissionUpdate,
    ReleaseDateEntry, User, api::PermissionSave, parse_lenient_date,
};
use thiserror::Error;

/// Errors for a malformed editor submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    #[error("missing operation")]
    MissingOp,

    #[error("unknown operation: {0}")]
    UnknownOp(String),

    #[error("invalid content type {value:?} for {content_id}")]
    InvalidType { content_id: String, value: String },
}

/// What the submit button asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetOp {
    SelectAll,
    DeselectAll,
    BatchDate,
    ClearDates,
    Save,
    SaveTypes,
}

impl FromStr for SheetOp {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select_all" => Ok(Self::SelectAll),
            "deselect_all" => Ok(Self::DeselectAll),
            "batch_date" => Ok(Self::BatchDate),
            "clear_dates" => Ok(Self::ClearDates),
            "save" => Ok(Self::Save),
            "save_types" => Ok(Self::SaveTypes),
            other => Err(SheetError::UnknownOp(other.to_owned())),
        }
    }
}

/// Header of the editor: who is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserHeader {
    pub email: String,
    pub name: String,
    pub is_paid: bool,
}

impl UserHeader {
    #[must_use]
    pub const fn paid_label(&self) -> &'static str {
        if self.is_paid { "付費用戶" } else { "免費用戶" }
    }
}

impl From<&User> for UserHeader {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
            is_paid: user.is_paid,
        }
    }
}

/// One content row of the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub content_id: ContentId,
    pub title: String,
    /// Type as loaded; the select may differ.
    pub original_type: ContentType,
    pub content_type: ContentType,
    pub has_access: bool,
    pub release_date: Option<NaiveDate>,
}

impl From<&PermissionRecord> for SheetRow {
    fn from(record: &PermissionRecord) -> Self {
        Self {
            content_id: record.content_id.clone(),
            title: record.title.clone(),
            original_type: record.content_type,
            content_type: record.content_type,
            has_access: record.has_access,
            release_date: record.release_date,
        }
    }
}

/// Every row of the editor, in rendered order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionSheet {
    pub rows: Vec<SheetRow>,
}

impl PermissionSheet {
    #[must_use]
    pub fn from_records(records: &[PermissionRecord]) -> Self {
        Self {
            rows: records.iter().map(SheetRow::from).collect(),
        }
    }

    /// Tick or untick every checkbox.
    pub fn set_all_access(&mut self, has_access: bool) {
        for row in &mut self.rows {
            row.has_access = has_access;
        }
    }

    /// Set every row's release date; `None` clears them all.
    pub fn set_all_dates(&mut self, date: Option<NaiveDate>) {
        for row in &mut self.rows {
            row.release_date = date;
        }
    }

    /// Full-replacement payload: every row, checked or not, dated or not.
    #[must_use]
    pub fn to_save(&self) -> PermissionSave {
        PermissionSave {
            permissions: self
                .rows
                .iter()
                .map(|row| PermissionUpdate {
                    content_id: row.content_id.clone(),
                    has_access: row.has_access,
                })
                .collect(),
            release_dates: self
                .rows
                .iter()
                .map(|row| ReleaseDateEntry {
                    content_id: row.content_id.clone(),
                    release_date: row.release_date,
                })
                .collect(),
        }
    }

    /// Whether any type select differs from the loaded type.
    #[must_use]
    pub fn types_changed(&self) -> bool {
        self.rows.iter().any(|row| row.content_type != row.original_type)
    }

    /// Type payload: every row, changed or not.
    #[must_use]
    pub fn type_updates(&self) -> Vec<ContentTypeUpdate> {
        self.rows
            .iter()
            .map(|row| ContentTypeUpdate {
                content_id: row.content_id.clone(),
                content_type: row.content_type,
            })
            .collect()
    }
}

/// Per-row fields of a submission, before parsing.
#[derive(Debug, Clone, Copy, Default)]
struct RowFields<'a> {
    title: Option<&'a str>,
    original_type: Option<&'a str>,
    content_type: Option<&'a str>,
    date: Option<&'a str>,
}

impl<'a> RowFields<'a> {
    fn set(&mut self, field: &str, value: &'a str) {
        match field {
            "title" => self.title = Some(value),
            "original_type" => self.original_type = Some(value),
            "type" => self.content_type = Some(value),
            "date" => self.date = Some(value),
            _ => {}
        }
    }
}

fn parse_type(content_id: &str, raw: Option<&str>) -> Result<Option<ContentType>, SheetError> {
    raw.map(|value| {
        value.parse::<ContentType>().map_err(|_| SheetError::InvalidType {
            content_id: content_id.to_owned(),
            value: value.to_owned(),
        })
    })
    .transpose()
}

/// A parsed editor POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSubmission {
    pub op: SheetOp,
    /// Raw batch date input; empty when not chosen.
    pub batch_date: String,
    pub user: UserHeader,
    pub sheet: PermissionSheet,
    pub confirmed: bool,
}

impl SheetSubmission {
    /// Parse urlencoded pairs, keeping row order.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError`] for a missing or unknown operation, or a type
    /// select with a value outside the known content types.
    pub fn parse(pairs: &[(String, String)]) -> Result<Self, SheetError> {
        let mut op = None;
        let mut batch_date = String::new();
        let mut user = UserHeader::default();
        let mut confirmed = false;
        let mut order: Vec<&str> = Vec::new();
        let mut fields: HashMap<&str, RowFields<'_>> = HashMap::new();
        let mut access: HashSet<&str> = HashSet::new();

        for (key, value) in pairs {
            match key.as_str() {
                "op" => op = Some(value.parse::<SheetOp>()?),
                "batch_date" => batch_date.clone_from(value),
                "user_email" => user.email.clone_from(value),
                "user_name" => user.name.clone_from(value),
                "user_paid" => user.is_paid = value == "true",
                "confirmed" => confirmed = value == "true",
                "row" => order.push(value),
                "access" => {
                    access.insert(value);
                }
                other => {
                    if let Some((field, id)) = other.split_once('.') {
                        fields.entry(id).or_default().set(field, value);
                    }
                }
            }
        }

        let mut rows = Vec::with_capacity(order.len());
        for id in order {
            let raw = fields.get(id).copied().unwrap_or_default();
            let original_type = parse_type(id, raw.original_type)?.unwrap_or_default();
            let content_type = parse_type(id, raw.content_type)?.unwrap_or(original_type);
            rows.push(SheetRow {
                content_id: ContentId::new(id),
                title: raw.title.unwrap_or_default().to_owned(),
                original_type,
                content_type,
                has_access: access.contains(id),
                release_date: raw.date.and_then(parse_lenient_date),
            });
        }

        Ok(Self {
            op: op.ok_or(SheetError::MissingOp)?,
            batch_date,
            user,
            sheet: PermissionSheet { rows },
            confirmed,
        })
    }

    /// Form fields that reproduce this submission, for the confirmation step.
    #[must_use]
    pub fn to_pairs(&self, op: &str) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("op".to_string(), op.to_string()),
            ("batch_date".to_string(), self.batch_date.clone()),
            ("user_email".to_string(), self.user.email.clone()),
            ("user_name".to_string(), self.user.name.clone()),
            ("user_paid".to_string(), self.user.is_paid.to_string()),
        ];
        for row in &self.sheet.rows {
            let id = row.content_id.as_str();
            pairs.push(("row".to_string(), id.to_string()));
            pairs.push((format!("title.{id}"), row.title.clone()));
            pairs.push((
                format!("original_type.{id}"),
                row.original_type.as_str().to_string(),
            ));
            pairs.push((format!("type.{id}"), row.content_type.as_str().to_string()));
            pairs.push((
                format!("date.{id}"),
                row.release_date.map(|d| d.to_string()).unwrap_or_default(),
            ));
            if row.has_access {
                pairs.push(("access".to_string(), id.to_string()));
            }
        }
        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn submission() -> SheetSubmission {
        SheetSubmission::parse(&pairs(&[
            ("op", "save"),
            ("batch_date", ""),
            ("user_email", "amy@example.com"),
            ("user_name", "Amy"),
            ("user_paid", "true"),
            ("row", "C2"),
            ("title.C2", "Deep dive"),
            ("original_type.C2", "paid"),
            ("type.C2", "paid"),
            ("date.C2", "2025-03-01"),
            ("row", "C1"),
            ("title.C1", "Intro"),
            ("original_type.C1", "free"),
            ("type.C1", "free"),
            ("date.C1", ""),
            ("access", "C1"),
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_keeps_row_order_and_state() {
        let sub = submission();
        assert_eq!(sub.op, SheetOp::Save);
        assert!(!sub.confirmed);
        assert_eq!(sub.user.paid_label(), "付費用戶");

        let ids: Vec<_> = sub.sheet.rows.iter().map(|r| r.content_id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "C1"]);

        let c2 = &sub.sheet.rows[0];
        assert!(!c2.has_access);
        assert_eq!(c2.release_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        let c1 = &sub.sheet.rows[1];
        assert!(c1.has_access);
        assert_eq!(c1.release_date, None);
        assert_eq!(c1.title, "Intro");
    }

    #[test]
    fn test_save_includes_every_row() {
        let save = submission().sheet.to_save();
        assert_eq!(
            save.permissions,
            vec![
                PermissionUpdate {
                    content_id: ContentId::new("C2"),
                    has_access: false,
                },
                PermissionUpdate {
                    content_id: ContentId::new("C1"),
                    has_access: true,
                },
            ]
        );
        assert_eq!(save.release_dates.len(), 2);
        assert_eq!(save.release_dates[1].release_date, None);
    }

    #[test]
    fn test_local_operations() {
        let mut sheet = submission().sheet;
        sheet.set_all_access(true);
        assert!(sheet.rows.iter().all(|r| r.has_access));
        sheet.set_all_access(false);
        assert!(sheet.rows.iter().all(|r| !r.has_access));

        let june = NaiveDate::from_ymd_opt(2025, 6, 1);
        sheet.set_all_dates(june);
        assert!(sheet.rows.iter().all(|r| r.release_date == june));
        sheet.set_all_dates(None);
        assert!(sheet.rows.iter().all(|r| r.release_date.is_none()));
    }

    #[test]
    fn test_types_changed() {
        let mut sheet = submission().sheet;
        assert!(!sheet.types_changed());
        assert_eq!(sheet.type_updates().len(), 2);

        sheet.rows[1].content_type = ContentType::Vip;
        assert!(sheet.types_changed());
        let updates = sheet.type_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].content_type, ContentType::Vip);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            SheetSubmission::parse(&pairs(&[("row", "C1")])).unwrap_err(),
            SheetError::MissingOp
        );
        assert_eq!(
            SheetSubmission::parse(&pairs(&[("op", "drop_all")])).unwrap_err(),
            SheetError::UnknownOp("drop_all".to_string())
        );
        assert!(matches!(
            SheetSubmission::parse(&pairs(&[("op", "save"), ("row", "C1"), ("type.C1", "gold")])),
            Err(SheetError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_pairs_reproduce_the_submission() {
        let sub = submission();
        let mut again = SheetSubmission::parse(&sub.to_pairs("save_types")).unwrap();
        assert_eq!(again.op, SheetOp::SaveTypes);
        again.op = SheetOp::Save;
        assert_eq!(again, sub);
    }

    #[test]
    fn test_from_records() {
        let records = vec![PermissionRecord {
            content_id: ContentId::new("C9"),
            title: "VIP".to_string(),
            content_type: ContentType::Vip,
            has_access: true,
            release_date: None,
        }];
        let sheet = PermissionSheet::from_records(&records);
        assert_eq!(sheet.rows[0].original_type, ContentType::Vip);
        assert!(!sheet.types_changed());
    }
}
