use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Charge drawn by a constant `load` over `elapsed` ticks.
///
/// Saturates at [`Fixed64::MAX`] instead of panicking on overflow.
#[inline]
pub fn energy_over(load: Fixed64, elapsed: Ticks) -> Fixed64 {
    let ticks = Fixed64::checked_from_num(elapsed).unwrap_or(Fixed64::MAX);
    load.saturating_mul(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_over_one_tick_is_load() {
        let load = f64_to_fixed64(50.0);
        assert_eq!(energy_over(load, 1), load);
    }

    #[test]
    fn energy_over_scales_with_elapsed() {
        let load = f64_to_fixed64(2.5);
        assert_eq!(fixed64_to_f64(energy_over(load, 4)), 10.0);
    }

    #[test]
    fn energy_over_zero_ticks_is_zero() {
        assert_eq!(energy_over(f64_to_fixed64(100.0), 0), Fixed64::ZERO);
    }

    #[test]
    fn energy_over_saturates() {
        assert_eq!(energy_over(Fixed64::MAX, 3), Fixed64::MAX);
        assert_eq!(energy_over(f64_to_fixed64(1.0), u64::MAX), Fixed64::MAX);
    }
}
