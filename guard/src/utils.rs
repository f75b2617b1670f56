//! Utility functions for the guarded flows.

/// Canonical form of an account identifier.
///
/// Failure counters are keyed by this value, so `User@Example.com` and
/// `user@example.com ` share one counter.
///
/// # Examples
///
/// ```
/// use bulwark_guard::utils::normalize_account;
///
/// assert_eq!(normalize_account("  User@Example.COM "), "user@example.com");
/// ```
#[must_use]
pub fn normalize_account(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Validate email address format.
///
/// This performs basic RFC 5322 validation:
/// - Must contain exactly one `@`
/// - Must have non-empty local and domain parts
/// - Length must be between 3 and 255 characters
///
/// # Examples
///
/// ```
/// use bulwark_guard::utils::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("user+tag@subdomain.example.com"));
/// assert!(!is_valid_email("invalid"));
/// assert!(!is_valid_email("@example.com"));
/// assert!(!is_valid_email("user@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    let valid_local_chars =
        |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    if !local.chars().all(valid_local_chars) || !domain.chars().all(valid_domain_chars) {
        return false;
    }

    // Domain labels between dots must be non-empty
    domain.split('.').all(|label| !label.is_empty())
}

/// Check a password against inclusive character-count bounds.
#[must_use]
pub fn password_within_bounds(password: &str, min: usize, max: usize) -> bool {
    let len = password.chars().count();
    len >= min && len <= max
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user+tag@example.com"));
        assert!(is_valid_email("user_name@subdomain.example.com"));
        assert!(is_valid_email("user-name@example.co.uk"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn test_email_length_limits() {
        assert!(is_valid_email("a@b.c"));

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(!is_valid_email(&long_email));
    }

    #[test]
    fn test_normalize_account() {
        assert_eq!(normalize_account("Alice@Example.com"), "alice@example.com");
        assert_eq!(normalize_account("\tbob@example.com\n"), "bob@example.com");
    }

    #[test]
    fn test_password_bounds_count_characters() {
        assert!(password_within_bounds("12345678", 8, 128));
        assert!(!password_within_bounds("1234567", 8, 128));
        // Four characters, nine bytes
        assert!(!password_within_bounds("ééé€", 8, 128));
        assert!(!password_within_bounds(&"x".repeat(129), 8, 128));
    }
}
