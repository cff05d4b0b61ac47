//! Saturating arithmetic for the per-tick DAC path.
//!
//! On `thumbv7em` (Cortex-M4/M7 with the DSP extension) these compile to a
//! single `SSAT`. Elsewhere (host tests, Cortex-M0) the portable fallback
//! is used.

/// Saturate an `i32` to the signed 16-bit CV range.
///
/// Maps to ARM `SSAT #16`.
#[inline(always)]
pub fn saturate16(val: i32) -> i16 {
    #[cfg(all(target_arch = "arm", target_feature = "dsp"))]
    {
        let out: i32;
        unsafe {
            core::arch::asm!(
                "ssat {out}, #16, {val}",
                out = out(reg) out,
                val = in(reg) val,
            );
        }
        out as i16
    }
    #[cfg(not(all(target_arch = "arm", target_feature = "dsp")))]
    {
        val.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

/// Scale a CV value by an oscillator sample: `(value * sample) >> 15`,
/// saturated to 16 bits.
///
/// Maps to `MUL` + `SSAT #16, asr #15`.
#[inline(always)]
pub fn scale_q15(value: i32, sample: i32) -> i16 {
    let product = value.wrapping_mul(sample);
    #[cfg(all(target_arch = "arm", target_feature = "dsp"))]
    {
        let out: i32;
        unsafe {
            core::arch::asm!(
                "ssat {out}, #16, {val}, asr #15",
                out = out(reg) out,
                val = in(reg) product,
            );
        }
        out as i16
    }
    #[cfg(not(all(target_arch = "arm", target_feature = "dsp")))]
    {
        saturate16(product >> 15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate16_clamps() {
        assert_eq!(saturate16(0), 0);
        assert_eq!(saturate16(40_000), 32767);
        assert_eq!(saturate16(-40_000), -32768);
        assert_eq!(saturate16(-1234), -1234);
    }

    #[test]
    fn scale_q15_multiplies_by_unit_fraction() {
        assert_eq!(scale_q15(10_000, 32768), 10_000);
        assert_eq!(scale_q15(10_000, 16384), 5_000);
        assert_eq!(scale_q15(10_000, -32768), -10_000);
        assert_eq!(scale_q15(32767, 0), 0);
        // -32768 * -32768 >> 15 overflows 16 bits
        assert_eq!(scale_q15(-32768, -32768), 32767);
    }
}
