//! Pixel to EMU conversion.

/// English Metric Units per pixel at 96 DPI.
pub const EMU_PER_PX: i64 = 9_525;

/// Convert a pixel length to EMU.
pub fn px_to_emu(px: i64) -> i64 {
    px * EMU_PER_PX
}

/// Convert a pixel length to EMU, or `None` if the result overflows.
pub fn checked_px_to_emu(px: i64) -> Option<i64> {
    px.checked_mul(EMU_PER_PX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_to_emu() {
        assert_eq!(px_to_emu(0), 0);
        assert_eq!(px_to_emu(1), 9_525);
        assert_eq!(px_to_emu(96), 914_400);
        assert_eq!(px_to_emu(-3), -28_575);
    }

    #[test]
    fn test_checked_px_to_emu() {
        assert_eq!(checked_px_to_emu(96), Some(914_400));
        assert_eq!(checked_px_to_emu(i64::MAX / EMU_PER_PX), Some(i64::MAX / EMU_PER_PX * EMU_PER_PX));
        assert_eq!(checked_px_to_emu(i64::MAX / EMU_PER_PX + 1), None);
        assert_eq!(checked_px_to_emu(i64::MIN), None);
    }
}
