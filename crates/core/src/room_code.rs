//! Human-shareable room codes.
//!
//! A room code is exactly six characters drawn from `A-Z0-9`. Codes are
//! generated at random; uniqueness is checked against the store by the
//! caller and finally enforced by the `uq_planning_sessions_room_code`
//! constraint.

use rand::Rng;

/// Length of every room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Characters a room code may contain.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// How many random codes to try before giving up on finding a free one.
pub const MAX_ROOM_CODE_ATTEMPTS: usize = 16;

/// Generate a random room code.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Returns `true` if `code` is a well-formed, already-normalised room code.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}

/// Normalise user input (trim, uppercase) into a room code.
///
/// Returns `None` if the result is not a well-formed code.
pub fn normalize_room_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    is_valid_room_code(&code).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..200 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(is_valid_room_code(&code), "generated invalid code {code}");
        }
    }

    #[test]
    fn lowercase_input_is_normalised() {
        assert_eq!(normalize_room_code(" ab12cd ").as_deref(), Some("AB12CD"));
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!(normalize_room_code("").is_none());
        assert!(normalize_room_code("ABC").is_none());
        assert!(normalize_room_code("ABCDEFG").is_none());
        assert!(normalize_room_code("AB-12C").is_none());
        assert!(normalize_room_code("ÄB12CD").is_none());
    }

    #[test]
    fn validity_requires_uppercase() {
        assert!(is_valid_room_code("Q7Z0K2"));
        assert!(!is_valid_room_code("q7z0k2"));
    }
}
