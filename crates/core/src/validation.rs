//! Client-side checks for the learner login and registration forms.
//!
//! These checks are advisory. They only stop obviously malformed input before
//! a backend call; the backend still decides (duplicate email, wrong password).

use crate::types::Email;

/// Minimum password length, in UTF-16 code units.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Minimum display-name length after trimming, in UTF-16 code units.
pub const MIN_NAME_CHARS: usize = 2;

/// Inline error messages shown under each field.
pub mod messages {
    pub const EMAIL: &str = "請輸入有效的 Email 地址";
    pub const PASSWORD: &str = "密碼至少需要 6 個字元";
    pub const NAME: &str = "姓名至少需要 2 個字元";
}

/// Whether `email` is shaped like `local@domain.tld`.
#[must_use]
pub fn validate_email(email: &str) -> bool {
    Email::parse(email).is_ok()
}

/// Whether `password` is long enough.
#[must_use]
pub fn validate_password(password: &str) -> bool {
    utf16_len(password) >= MIN_PASSWORD_CHARS
}

/// Whether `name` is long enough once surrounding whitespace is removed.
#[must_use]
pub fn validate_name(name: &str) -> bool {
    utf16_len(name.trim()) >= MIN_NAME_CHARS
}

/// Length as the browser form counts it: astral characters such as emoji
/// count twice.
fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Outcome of checking a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Not checked (the field is not part of this form).
    #[default]
    Unchecked,
    /// Passed.
    Valid,
    /// Failed with an inline message.
    Invalid(&'static str),
}

impl FieldState {
    fn check(ok: bool, message: &'static str) -> Self {
        if ok { Self::Valid } else { Self::Invalid(message) }
    }

    /// CSS class for the surrounding form group.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            Self::Unchecked => "",
            Self::Valid => "success",
            Self::Invalid(_) => "error",
        }
    }

    /// Inline message, if the field failed.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Invalid(message) => Some(message),
            _ => None,
        }
    }

    /// Whether the field failed.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Per-field result of a form check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub name: FieldState,
    pub email: FieldState,
    pub password: FieldState,
}

impl ValidationReport {
    /// Whether every checked field passed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !(self.name.is_invalid() || self.email.is_invalid() || self.password.is_invalid())
    }
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Name exactly as typed; the backend owns normalisation.
    pub name: String,
    pub email: Email,
}

/// Check the login form. Every field is checked so all errors show at once.
///
/// # Errors
///
/// Returns the per-field report when any field fails.
pub fn check_login(email: &str, password: &str) -> Result<Email, ValidationReport> {
    let report = ValidationReport {
        name: FieldState::Unchecked,
        email: FieldState::check(validate_email(email), messages::EMAIL),
        password: FieldState::check(validate_password(password), messages::PASSWORD),
    };

    match Email::parse(email) {
        Ok(parsed) if report.is_valid() => Ok(parsed),
        _ => Err(report),
    }
}

/// Check the registration form.
///
/// # Errors
///
/// Returns the per-field report when any field fails.
pub fn check_registration(
    name: &str,
    email: &str,
    password: &str,
) -> Result<Registration, ValidationReport> {
    let report = ValidationReport {
        name: FieldState::check(validate_name(name), messages::NAME),
        email: FieldState::check(validate_email(email), messages::EMAIL),
        password: FieldState::check(validate_password(password), messages::PASSWORD),
    };

    match Email::parse(email) {
        Ok(parsed) if report.is_valid() => Ok(Registration {
            name: name.to_owned(),
            email: parsed,
        }),
        _ => Err(report),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_counts_utf16_units() {
        assert!(!validate_password("12345"));
        assert!(validate_password("123456"));
        // Six CJK characters are six characters, not eighteen bytes.
        assert!(validate_password("密碼密碼密碼"));
        assert!(!validate_password("密碼密碼密"));
        // Emoji sit outside the BMP and count as two units each.
        assert!(validate_password("🔒🔒🔒"));
        assert!(!validate_password("🔒🔒"));
    }

    #[test]
    fn test_name_is_trimmed() {
        assert!(!validate_name("  a  "));
        assert!(validate_name(" ab "));
        assert!(validate_name("小明"));
        assert!(!validate_name(""));
        assert!(validate_name(" 🎓 "));
    }

    #[test]
    fn test_check_login_reports_every_field() {
        let report = check_login("not-an-email", "123").unwrap_err();
        assert_eq!(report.email, FieldState::Invalid(messages::EMAIL));
        assert_eq!(report.password, FieldState::Invalid(messages::PASSWORD));
        assert_eq!(report.name, FieldState::Unchecked);

        let report = check_login("user@example.com", "123").unwrap_err();
        assert_eq!(report.email, FieldState::Valid);
        assert!(report.password.is_invalid());
    }

    #[test]
    fn test_check_login_ok() {
        let email = check_login("user@example.com", "secret1").unwrap();
        assert_eq!(email.as_str(), "user@example.com");
    }

    #[test]
    fn test_check_registration() {
        let reg = check_registration(" 小明 ", "ming@example.com", "secret1").unwrap();
        assert_eq!(reg.name, " 小明 ");

        let report = check_registration("x", "ming@example.com", "secret1").unwrap_err();
        assert_eq!(report.name.message(), Some(messages::NAME));
        assert_eq!(report.email.class(), "success");
        assert!(!report.is_valid());
    }
}
