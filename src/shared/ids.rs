use getrandom::getrandom;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RUN_SUFFIX_SPACE: u32 = 36 * 36 * 36 * 36;

fn base36_encode_u64(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while value > 0 {
        chars.push(BASE36_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    chars.iter().rev().collect()
}

fn base36_encode_fixed_u32(mut value: u32, width: usize) -> String {
    let mut chars = vec!['0'; width];
    for idx in (0..width).rev() {
        chars[idx] = BASE36_ALPHABET[(value % 36) as usize] as char;
        value /= 36;
    }
    chars.into_iter().collect()
}

/// Compact identifier used to correlate the log events of one workflow run.
pub fn generate_run_id(now_millis: i64) -> String {
    let timestamp = u64::try_from(now_millis).unwrap_or(0);
    let mut bytes = [0_u8; 4];
    // Entropy failure degrades to a zero suffix.
    let sample = match getrandom(&mut bytes) {
        Ok(()) => u32::from_le_bytes(bytes) % RUN_SUFFIX_SPACE,
        Err(_) => 0,
    };
    format!(
        "vf-{}-{}",
        base36_encode_u64(timestamp),
        base36_encode_fixed_u32(sample, 4)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_encoding_matches_known_values() {
        assert_eq!(base36_encode_u64(0), "0");
        assert_eq!(base36_encode_u64(35), "z");
        assert_eq!(base36_encode_u64(36), "10");
        assert_eq!(base36_encode_fixed_u32(1, 4), "0001");
    }

    #[test]
    fn run_ids_carry_prefix_timestamp_and_fixed_suffix() {
        let run_id = generate_run_id(36);
        let parts = run_id.split('-').collect::<Vec<_>>();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "vf");
        assert_eq!(parts[1], "10");
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|ch| ch.is_ascii_alphanumeric()));
    }
}
