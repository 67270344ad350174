//! Random 128-bit generator (spec §4.2): a v4 UUID in canonical
//! `8-4-4-4-12` hex form.

use uuid::Uuid;

/// Stateless — uniqueness is probabilistic and the spec explicitly does
/// not require a collision check for this strategy.
pub struct RandomGenerator;

impl RandomGenerator {
    /// Generate a new random id.
    pub fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Validation is a strict hex/hyphen pattern match, case-insensitive
/// (spec §4.2): `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub fn is_valid(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, b) in bytes.iter().enumerate() {
        let is_hyphen_pos = matches!(i, 8 | 13 | 18 | 23);
        if is_hyphen_pos {
            if *b != b'-' {
                return false;
            }
        } else if !b.is_ascii_hexdigit() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let g = RandomGenerator;
        let a = g.generate();
        let b = g.generate();
        assert!(is_valid(&a));
        assert!(is_valid(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn validation_is_case_insensitive() {
        assert!(is_valid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_valid("550E8400-E29B-41D4-A716-446655440000"));
        assert!(!is_valid("550e8400e29b41d4a716446655440000"));
        assert!(!is_valid("not-a-uuid"));
    }
}
