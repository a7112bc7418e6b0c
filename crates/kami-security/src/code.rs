//! Activation-code and e-mail verification-code generation

use std::sync::LazyLock;

use kami_shared::constants::VERIFICATION_CODE_LENGTH;
use rand::Rng;
use regex::Regex;

/// Uppercase alphanumerics without 0/O/1/I, which are easy to misread.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUPS: usize = 4;
const GROUP_LEN: usize = 4;

static ACTIVATION_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-HJ-NP-Z2-9]{4}(?:-[A-HJ-NP-Z2-9]{4}){3}$")
        .expect("activation code pattern is a valid regex")
});

/// Returns a code shaped like `ABCD-EFGH-JKLM-NPQR`.
pub fn generate_activation_code() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(GROUPS * (GROUP_LEN + 1));
    for group in 0..GROUPS {
        if group > 0 {
            code.push('-');
        }
        for _ in 0..GROUP_LEN {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }
    }
    code
}

pub fn normalize_activation_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn is_well_formed_activation_code(code: &str) -> bool {
    ACTIVATION_CODE_RE.is_match(code)
}

/// Six random decimal digits.
pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    (0..VERIFICATION_CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..200 {
            let code = generate_activation_code();
            assert_eq!(code.len(), 19);
            assert!(is_well_formed_activation_code(&code), "{code}");
        }
    }

    #[test]
    fn test_generated_codes_are_distinct() {
        let codes: HashSet<String> = (0..500).map(|_| generate_activation_code()).collect();
        assert_eq!(codes.len(), 500);
    }

    #[test]
    fn test_malformed_codes() {
        assert!(!is_well_formed_activation_code(""));
        assert!(!is_well_formed_activation_code("ABCD-EFGH-JKLM"));
        assert!(!is_well_formed_activation_code("abcd-efgh-jklm-npqr"));
        assert!(!is_well_formed_activation_code("ABCD-EFGH-JKLM-NPQ0"));
        assert!(is_well_formed_activation_code(&normalize_activation_code(" abcd-efgh-jklm-npqr ")));
    }

    #[test]
    fn test_verification_code_shape() {
        let code = generate_verification_code();
        assert_eq!(code.len(), VERIFICATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
