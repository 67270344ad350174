//! Time-ordered short id generator (spec §4.2).
//!
//! Layout: `<letter><base36 millis><base36 per-process counter><hex
//! random><hex fingerprint>`, total length ≥ 25. The per-process counter is
//! shared across every type in the process so that ids minted in the same
//! millisecond still sort by allocation order.

use once_cell::sync::Lazy;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static PROCESS_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));
static PROCESS_FINGERPRINT: Lazy<String> = Lazy::new(|| format!("{:x}", std::process::id()));

/// Generates time-ordered ids prefixed with a fixed letter chosen at
/// construction (e.g. one letter per entity type would also work, but the
/// engine uses a single shared prefix for all types).
pub struct TimeOrderedGenerator {
    prefix: char,
}

impl TimeOrderedGenerator {
    /// Build a generator with the given prefix letter.
    pub fn new(prefix: char) -> Self {
        Self { prefix }
    }

    /// Produce a new id.
    pub fn generate(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let seq = PROCESS_COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut rand_bytes = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut rand_bytes);
        let random_segment: String = rand_bytes.iter().map(|b| format!("{b:02x}")).collect();

        let mut id = String::new();
        id.push(self.prefix);
        id.push_str(&to_base36(millis));
        id.push_str(&to_base36(seq));
        id.push_str(&random_segment);
        id.push_str(&PROCESS_FINGERPRINT);

        // Pad the random segment if the fixed-width pieces above ever came
        // in shorter than expected, so every id meets the length floor.
        while id.len() < 25 {
            id.push('0');
        }
        id
    }
}

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap()
}

/// Validation is a prefix+charset check (spec §4.2): a lowercase letter
/// followed by lowercase-alphanumeric (base-36) characters, total length
/// at least 25.
pub fn is_valid(id: &str) -> bool {
    if id.len() < 25 {
        return false;
    }
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_meet_length_floor_and_validate() {
        let g = TimeOrderedGenerator::new('e');
        let id = g.generate();
        assert!(id.len() >= 25);
        assert!(is_valid(&id));
    }

    #[test]
    fn successive_ids_are_distinct() {
        let g = TimeOrderedGenerator::new('e');
        let a = g.generate();
        let b = g.generate();
        assert_ne!(a, b);
    }

    #[test]
    fn validation_rejects_short_or_uppercase() {
        assert!(!is_valid("short"));
        assert!(!is_valid("Eabcdefghijklmnopqrstuvwx"));
    }
}
