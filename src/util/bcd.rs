//! Packed binary-coded decimal, one digit per nibble.

/// Packed BCD of a value in 0..=99
pub const fn dec_to_bcd(x: u8) -> u8 {
    ((x / 10) << 4) | (x % 10)
}

/// Value of a packed BCD byte
pub const fn bcd_to_dec(x: u8) -> u8 {
    (x >> 4) * 10 + (x & 0x0F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(dec_to_bcd(0), 0x00);
        assert_eq!(dec_to_bcd(59), 0x59);
        assert_eq!(dec_to_bcd(99), 0x99);
        assert_eq!(bcd_to_dec(0x42), 42);
    }

    proptest! {
        #[test]
        fn round_trip(x in 0u8..=99) {
            prop_assert_eq!(bcd_to_dec(dec_to_bcd(x)), x);
        }

        #[test]
        fn nibbles_are_decimal_digits(x in 0u8..=99) {
            let bcd = dec_to_bcd(x);
            prop_assert!(bcd >> 4 <= 9 && bcd & 0x0F <= 9);
        }
    }
}
