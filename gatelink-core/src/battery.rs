//! Battery Voltage to Charge-Level Conversion
//!
//! ## Motivation
//!
//! The sensors run from a single lithium cell whose discharge curve is
//! anything but linear: it plateaus around 3.7 V for most of the usable
//! capacity and falls off a cliff below ~3.2 V. A measured voltage is
//! mapped to a percentage through a fixed 11-point lookup table with
//! linear interpolation between breakpoints, the same approach used for
//! any curve too irregular for a closed-form fit.
//!
//! The interpolation is done in scaled integer arithmetic and converted to
//! float only at the very end, so results are identical on parts with and
//! without an FPU.
//!
//! ## Table Invariant
//!
//! Both columns of the table must be strictly increasing. This is a
//! compile-time property of the constant below and is asserted by a test
//! rather than checked at runtime.

/// Charge percentage below which a battery counts as empty
pub const EMPTY_THRESHOLD_PERCENT: u8 = 15;

/// (percent, millivolts) breakpoints for a single-cell Li-ion battery
///
/// Spans the conventional empty-cell to full-cell voltage range of an
/// 18650-class cell. Strictly increasing in both columns.
const BATTERY_CURVE: [(u8, u16); 11] = [
    (0, 3000),
    (10, 3200),
    (20, 3400),
    (30, 3560),
    (40, 3680),
    (50, 3800),
    (60, 3880),
    (70, 3960),
    (80, 4040),
    (90, 4120),
    (100, 4200),
];

/// Integer linear rescale of `x` from [in_min, in_max] to [out_min, out_max]
const fn rescale(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Convert a battery voltage to a charge percentage in [0, 100]
///
/// Voltages at or below the first breakpoint clamp to its percentage,
/// voltages at or above the last clamp symmetrically. Between breakpoints
/// the percentage is linearly interpolated with `fractional_digits`
/// digits of precision (interpolation happens at scale 10^digits in
/// integer space, so e.g. `fractional_digits = 0` truncates the same way
/// on every target).
pub fn voltage_to_percent_with_digits(millivolts: u16, fractional_digits: u8) -> f32 {
    let (first_percent, first_mv) = BATTERY_CURVE[0];
    if millivolts <= first_mv {
        return first_percent as f32;
    }

    let (last_percent, last_mv) = BATTERY_CURVE[BATTERY_CURVE.len() - 1];
    if millivolts >= last_mv {
        return last_percent as f32;
    }

    let scale = 10i64.pow(fractional_digits as u32);
    for window in BATTERY_CURVE.windows(2) {
        let (lo_percent, lo_mv) = window[0];
        let (hi_percent, hi_mv) = window[1];

        if millivolts > lo_mv && millivolts <= hi_mv {
            let scaled = rescale(
                millivolts as i64,
                lo_mv as i64,
                hi_mv as i64,
                lo_percent as i64 * scale,
                hi_percent as i64 * scale,
            );
            return scaled as f32 / scale as f32;
        }
    }

    // Unreachable while the table invariant holds
    debug_assert!(false, "battery curve has a gap");
    0.0
}

/// Convert a battery voltage to a percentage with two fractional digits
pub fn voltage_to_percent(millivolts: u16) -> f32 {
    voltage_to_percent_with_digits(millivolts, 2)
}

/// True when the charge level falls below [`EMPTY_THRESHOLD_PERCENT`]
pub fn is_empty(millivolts: u16) -> bool {
    voltage_to_percent_with_digits(millivolts, 0) < EMPTY_THRESHOLD_PERCENT as f32
}
