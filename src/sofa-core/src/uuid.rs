//! Random hexadecimal document identifiers.

use rand::Rng;

pub const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Length of identifiers produced by [`new_id`]
pub const DEFAULT_ID_LEN: usize = 32;

/// Random string of `len` lowercase hex digits
pub fn random_hex(len: usize) -> String {
    random_hex_with(&mut rand::thread_rng(), len)
}

pub fn random_hex_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
        .collect()
}

/// Fresh identifier for a new document. Collisions are not detected.
pub fn new_id() -> String {
    random_hex(DEFAULT_ID_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_new_id_shape() {
        let id = new_id();
        assert_eq!(id.len(), DEFAULT_ID_LEN);
        assert!(id.bytes().all(|b| HEX_DIGITS.contains(&b)));
    }

    #[test]
    fn test_random_hex_lengths() {
        assert_eq!(random_hex(0), "");
        for len in [1, 7, 16, 64] {
            let s = random_hex(len);
            assert_eq!(s.len(), len);
            assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_no_trivial_collisions() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = random_hex_with(&mut StdRng::seed_from_u64(42), 32);
        let b = random_hex_with(&mut StdRng::seed_from_u64(42), 32);
        assert_eq!(a, b);

        let c = random_hex_with(&mut StdRng::seed_from_u64(43), 32);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uses_whole_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let seen: HashSet<char> = random_hex_with(&mut rng, 4096).chars().collect();
        assert_eq!(seen.len(), 16);
    }
}
