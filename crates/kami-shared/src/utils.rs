//! Utility functions

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let keep = local.chars().take(if local.chars().count() <= 2 { 1 } else { 2 }).collect::<String>();
        format!("{}***{}", keep, domain)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "al***@example.com");
        assert_eq!(mask_email("al@example.com"), "a***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }
}
