//! Deterministic identifier derivation.
//!
//! Room and user ids are derived from seed strings with a small additive hash
//! that only borrows the UUID v4 layout. It is reproducible, not random, and
//! not meant to be collision resistant: every slot is a multiple of the sum of
//! the seed's code units, so seeds with equal sums mod 256 share an id.

use uuid::Uuid;

/// Hash a seed string into 16 bytes with the version and variant bits set.
///
/// The seed is consumed as UTF-16 code units so ids match those produced by
/// the web client for the same seed.
pub fn hash_seed(seed: &str) -> [u8; 16] {
    let mut hash = [0u8; 16];

    for unit in seed.encode_utf16() {
        let code = u32::from(unit);
        for (slot, byte) in hash.iter_mut().enumerate() {
            let step = code * (slot as u32 + 1) * 31;
            *byte = ((u32::from(*byte) + step) % 256) as u8;
        }
    }

    hash[6] = (hash[6] & 0x0f) | 0x40;
    hash[8] = (hash[8] & 0x3f) | 0x80;
    hash
}

/// Render `hash_seed(seed)` as a lowercase `8-4-4-4-12` identifier.
pub fn string_to_uuid(seed: &str) -> String {
    Uuid::from_bytes(hash_seed(seed)).hyphenated().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_only_carries_marker_bits() {
        let bytes = hash_seed("");
        let mut expected = [0u8; 16];
        expected[6] = 0x40;
        expected[8] = 0x80;
        assert_eq!(bytes, expected);
        assert_eq!(
            string_to_uuid(""),
            "00000000-0000-4000-8000-000000000000"
        );
    }

    #[test]
    fn single_character_matches_hand_computed_bytes() {
        // 'a' = 97; slot j gets 97 * (j + 1) * 31 mod 256.
        let bytes = hash_seed("a");
        let raw: Vec<u8> = (0..16u32).map(|j| ((97 * (j + 1) * 31) % 256) as u8).collect();

        for (slot, value) in bytes.iter().enumerate() {
            match slot {
                6 => assert_eq!(*value, (raw[6] & 0x0f) | 0x40),
                8 => assert_eq!(*value, (raw[8] & 0x3f) | 0x80),
                _ => assert_eq!(*value, raw[slot]),
            }
        }
        // 97 * 31 = 3007 = 0xbbf -> 0xbf
        assert_eq!(bytes[0], 0xbf);
        assert!(string_to_uuid("a").starts_with("bf"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = "room-agent-42-1700000000000";
        assert_eq!(string_to_uuid(seed), string_to_uuid(seed));
        assert_ne!(string_to_uuid(seed), string_to_uuid("room-agent-43-1700000000000"));
    }

    #[test]
    fn seeds_with_equal_code_unit_sums_collide() {
        assert_eq!(hash_seed("ab"), hash_seed("ba"));
        assert_eq!(hash_seed("room-1-19"), hash_seed("room-1-28"));
        assert_ne!(hash_seed("room-1-19"), hash_seed("room-1-20"));
    }

    #[test]
    fn identifiers_carry_version_and_variant_bits() {
        for seed in ["x", "agent-42", "room-abc-123", "ünïcødé ✓", "a much longer seed string"] {
            let bytes = hash_seed(seed);
            assert_eq!(bytes[6] >> 4, 0x4, "version nibble for {seed}");
            assert_eq!(bytes[8] >> 6, 0b10, "variant bits for {seed}");
        }
    }

    #[test]
    fn formatted_identifier_shape() {
        let id = string_to_uuid("agent-42");
        let groups: Vec<&str> = id.split('-').collect();
        assert_eq!(
            groups.iter().map(|g| g.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
        assert!(id.chars().all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(&id[14..15], "4");
    }

    #[test]
    fn astral_characters_hash_as_surrogate_pairs() {
        // U+1F3B5 encodes as the pair D83C DFB5.
        let direct = hash_seed("\u{1F3B5}");
        let mut manual = [0u8; 16];
        for unit in [0xD83Cu32, 0xDFB5] {
            for (slot, byte) in manual.iter_mut().enumerate() {
                *byte = ((u32::from(*byte) + unit * (slot as u32 + 1) * 31) % 256) as u8;
            }
        }
        manual[6] = (manual[6] & 0x0f) | 0x40;
        manual[8] = (manual[8] & 0x3f) | 0x80;
        assert_eq!(direct, manual);
    }
}
