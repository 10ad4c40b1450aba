//! Per-user content access records.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::content::ContentType;
use super::id::ContentId;

/// Access of one user to one content item (`getUserPermissions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub content_id: ContentId,
    pub title: String,
    pub content_type: ContentType,
    pub has_access: bool,
    /// Date from which the content becomes visible to the user.
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
}

/// One row of an `updateUserPermissions` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionUpdate {
    pub content_id: ContentId,
    pub has_access: bool,
}

/// One row of `getUserReleaseDate` / `updateUserReleaseDate`.
///
/// `None` clears the schedule and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDateEntry {
    pub content_id: ContentId,
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
}

/// UTC offset of the backend's calendar (Asia/Taipei).
pub const BACKEND_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Parse `YYYY-MM-DD`, also accepting a full timestamp or an empty string.
///
/// A timestamp with an offset (`2025-01-31T16:00:00Z`) is read as a date on
/// the backend's calendar; one without is cut to its first ten characters.
/// Unparseable values become `None` rather than failing the whole list.
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        let backend = FixedOffset::east_opt(BACKEND_UTC_OFFSET_SECS)?;
        return Some(stamp.with_timezone(&backend).date_naive());
    }
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_lenient_date))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_release_date_shapes() {
        let records: Vec<PermissionRecord> = serde_json::from_str(
            r#"[
                {"content_id":"C1","title":"A","content_type":"free","has_access":true,"release_date":"2025-01-31"},
                {"content_id":"C2","title":"B","content_type":"vip","has_access":false,"release_date":"2025-02-01T00:00:00.000Z"},
                {"content_id":"C3","title":"C","content_type":"paid","has_access":false,"release_date":""},
                {"content_id":"C4","title":"D","content_type":"paid","has_access":true,"release_date":null},
                {"content_id":"C5","title":"E","content_type":"paid","has_access":true}
            ]"#,
        )
        .unwrap();

        let dates: Vec<_> = records.iter().map(|r| r.release_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 31),
                NaiveDate::from_ymd_opt(2025, 2, 1),
                None,
                None,
                None,
            ]
        );
    }

    #[test]
    fn test_timestamps_land_on_backend_calendar() {
        // Midnight in Taipei, as serialized in UTC.
        assert_eq!(
            parse_lenient_date("2025-01-31T16:00:00Z"),
            NaiveDate::from_ymd_opt(2025, 2, 1)
        );
        assert_eq!(
            parse_lenient_date("2025-01-31T16:00:00.000+08:00"),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(
            parse_lenient_date("2025-01-31T23:30:00"),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(parse_lenient_date(" 2025-06-01 "), NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(parse_lenient_date("soon"), None);
    }

    #[test]
    fn test_release_date_entry_serializes_null() {
        let entry = ReleaseDateEntry {
            content_id: ContentId::new("C1"),
            release_date: None,
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"content_id":"C1","release_date":null}"#
        );

        let dated = ReleaseDateEntry {
            release_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            ..entry
        };
        assert_eq!(
            serde_json::to_string(&dated).unwrap(),
            r#"{"content_id":"C1","release_date":"2025-06-01"}"#
        );
    }
}
