use once_cell::sync::Lazy;
use regex::Regex;

const MAX_ADDRESS_LENGTH: usize = 256;
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_DOMAIN_LABEL_LENGTH: usize = 63;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[-!#$%&'*+/0-9=?A-Z^_a-z`{|}~](\.?[-!#$%&'*+/0-9=?A-Z^_a-z`{|}~])*@[a-zA-Z0-9](-*\.?[a-zA-Z0-9])*\.[a-zA-Z](-?[a-zA-Z0-9])+$",
    )
    .unwrap()
});

/// Structural and length check of an email address.
///
/// A blank value passes only when the column is not required.
pub fn is_valid_email(email: &str, required: bool) -> bool {
    if email.is_empty() {
        return !required;
    }
    if email.len() > MAX_ADDRESS_LENGTH {
        return false;
    }
    if !EMAIL_REGEX.is_match(email) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.len() > MAX_LOCAL_PART_LENGTH {
        return false;
    }
    domain
        .split('.')
        .all(|label| label.len() <= MAX_DOMAIN_LABEL_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_addresses() {
        assert!(is_valid_email("test@test.com", true));
        assert!(is_valid_email("first.last+tag@mail.example.org", true));
        assert!(is_valid_email("TEST@TEST.COM", true));
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(!is_valid_email("test@test", true));
        assert!(!is_valid_email("test.com", false));
        assert!(!is_valid_email("a..b@test.com", false));
        assert!(!is_valid_email("test@test.c", false));
        assert!(!is_valid_email("@test.com", false));
    }

    #[test]
    fn test_blank_depends_on_required() {
        assert!(is_valid_email("", false));
        assert!(!is_valid_email("", true));
    }

    #[test]
    fn test_length_limits() {
        let long_local = format!("{}@test.com", "a".repeat(65));
        assert!(!is_valid_email(&long_local, false));

        let long_label = format!("user@{}.com", "a".repeat(64));
        assert!(!is_valid_email(&long_label, false));

        let max_label = format!("user@{}.com", "a".repeat(63));
        assert!(is_valid_email(&max_label, false));

        let long_address = format!("user@{}.com", vec!["a".repeat(60); 5].join("."));
        assert!(long_address.len() > MAX_ADDRESS_LENGTH);
        assert!(!is_valid_email(&long_address, false));
    }
}
