use std::ops::RangeInclusive;

/// Contains some helper methods to manipulate bits of an instruction word,
/// the index (`bit_idx`) goes from lsb to msb (right to left).
pub trait Bits: Copy {
    fn get_bit(self, bit_idx: u8) -> bool;

    fn set_bit(&mut self, bit_idx: u8, value: bool);

    /// Extracts `bits_range` and moves it down to bit 0.
    #[must_use]
    fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self;

    /// Returns a sign-extended copy of the lowest `number_of_bits` bits.
    #[must_use]
    fn sign_extended(self, number_of_bits: u8) -> Self;
}

impl Bits for u32 {
    fn get_bit(self, bit_idx: u8) -> bool {
        debug_assert!(bit_idx < 32);
        (self >> bit_idx) & 1 == 1
    }

    fn set_bit(&mut self, bit_idx: u8, value: bool) {
        debug_assert!(bit_idx < 32);
        let mask = 1 << bit_idx;
        if value {
            *self |= mask;
        } else {
            *self &= !mask;
        }
    }

    fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self {
        let start = u32::from(*bits_range.start());
        let end = u32::from(*bits_range.end());
        debug_assert!(start <= end && end < 32);

        let length = end - start + 1;
        // A full-width range would overflow the mask computation below.
        let mask = if length == 32 {
            Self::MAX
        } else {
            (1 << length) - 1
        };

        (self >> start) & mask
    }

    fn sign_extended(self, number_of_bits: u8) -> Self {
        debug_assert!((1..=32).contains(&number_of_bits));

        // Move the sign bit up to bit 31, then let the arithmetic shift
        // replicate it on the way back down.
        let spare = 32 - u32::from(number_of_bits);
        (((self << spare) as i32) >> spare) as Self
    }
}
