const IEC_UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with binary (IEC) prefixes and one decimal digit,
/// e.g. `512.0MiB`. PiB is the largest unit, bigger values keep growing the
/// mantissa.
pub fn format_iec(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < IEC_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.1}{}", IEC_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB: u64 = 1024;

    #[test]
    fn bytes_below_one_kib() {
        assert_eq!(format_iec(0), "0.0B");
        assert_eq!(format_iec(1), "1.0B");
        assert_eq!(format_iec(1023), "1023.0B");
    }

    #[test]
    fn known_values() {
        assert_eq!(format_iec(1536), "1.5KiB");
        assert_eq!(format_iec(512 * KIB.pow(2)), "512.0MiB");
        assert_eq!(format_iec(KIB.pow(4)), "1.0TiB");
        assert_eq!(format_iec(3 * KIB.pow(3) + 300 * KIB.pow(2)), "3.3GiB");
    }

    #[test]
    fn each_tier_uses_its_unit() {
        for (k, unit) in IEC_UNITS.iter().enumerate().skip(1) {
            let lower = KIB.pow(k as u32);
            let upper = lower * KIB - 1;
            assert!(format_iec(lower).ends_with(unit), "{k}: {}", format_iec(lower));
            assert!(format_iec(upper).ends_with(unit), "{k}: {}", format_iec(upper));
            assert!(format_iec(lower).starts_with("1.0"));
        }
    }

    #[test]
    fn pib_is_the_ceiling() {
        assert_eq!(format_iec(KIB.pow(6)), "1024.0PiB");
        assert_eq!(format_iec(u64::MAX), "16384.0PiB");
    }
}
