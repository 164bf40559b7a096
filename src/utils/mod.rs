//! Utility functions and helpers.

pub mod http;

use sha2::{Digest, Sha256};

/// Sanitized names longer than this are shortened.
const MAX_STEM_BYTES: usize = 200;

/// Bytes of the sanitized name kept in front of the hash suffix.
const KEPT_STEM_BYTES: usize = 180;

/// Turn an arbitrary string into a file stem that cannot leave its directory.
///
/// ASCII alphanumerics and `- _ . , ( )` are kept as is. Every other byte of
/// the UTF-8 encoding, and a leading `.`, becomes `%XX`. Since `%` itself is
/// always escaped, two different inputs only share a stem after shortening,
/// and shortened stems end in `~` plus 16 hex chars of the input's SHA-256.
pub fn sanitize_file_stem(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }

    let mut stem = String::with_capacity(raw.len());
    for (i, byte) in raw.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_' | b',' | b'(' | b')')
            || (byte == b'.' && i > 0);
        if keep {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }

    if stem.len() > MAX_STEM_BYTES {
        let mut cut = KEPT_STEM_BYTES;
        // never split a %XX escape
        if let Some(pos) = stem[cut - 2..cut].find('%') {
            cut = cut - 2 + pos;
        }
        stem.truncate(cut);
        let digest = Sha256::digest(raw.as_bytes());
        stem.push('~');
        stem.push_str(&hex::encode(&digest[..8]));
    }

    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_titles() {
        assert_eq!(sanitize_file_stem("Paris"), "Paris");
        assert_eq!(sanitize_file_stem("St._Louis"), "St._Louis");
        assert_eq!(
            sanitize_file_stem("Springfield,_Illinois_(city)"),
            "Springfield,_Illinois_(city)"
        );
    }

    #[test]
    fn escapes_path_separators_and_traversal() {
        assert_eq!(sanitize_file_stem("AC/DC"), "AC%2FDC");
        assert_eq!(sanitize_file_stem("..\\x"), "%2E.%5Cx");
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "%2E.%2F..%2Fetc%2Fpasswd");
        assert!(!sanitize_file_stem("/abs").contains('/'));
    }

    #[test]
    fn escapes_spaces_and_unicode_bytes() {
        assert_eq!(sanitize_file_stem("New York"), "New%20York");
        assert_eq!(sanitize_file_stem("São_Paulo"), "S%C3%A3o_Paulo");
    }

    #[test]
    fn escapes_percent_so_encoded_titles_stay_distinct() {
        assert_ne!(
            sanitize_file_stem("S%C3%A3o_Paulo"),
            sanitize_file_stem("São_Paulo")
        );
        assert_eq!(sanitize_file_stem("100%"), "100%25");
    }

    #[test]
    fn empty_input_has_a_name() {
        assert_eq!(sanitize_file_stem(""), "%");
    }

    #[test]
    fn long_names_are_shortened_with_hash() {
        let long = "ж".repeat(150);
        let stem = sanitize_file_stem(&long);
        assert!(stem.len() <= KEPT_STEM_BYTES + 17);
        let (kept, hash) = stem.rsplit_once('~').unwrap();
        assert_eq!(hash.len(), 16);
        // every escape in the kept part is complete
        assert_eq!(kept.len() % 3, 0);
        assert!(kept.starts_with("%D0%B6"));
    }

    #[test]
    fn shortening_is_deterministic_and_distinguishes_inputs() {
        let a = format!("{}a", "x".repeat(300));
        let b = format!("{}b", "x".repeat(300));
        assert_eq!(sanitize_file_stem(&a), sanitize_file_stem(&a));
        assert_ne!(sanitize_file_stem(&a), sanitize_file_stem(&b));
    }
}
