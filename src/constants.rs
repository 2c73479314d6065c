//! Digitizer and detection constants shared across the analysis helpers.

/// DAC conversion factor in [mV/count]: 14-bit digitizer over a 2 V range.
pub const DAC_CONVERSION: f64 = 2000.0 / 16384.0;

/// Sampling time in [ns].
pub const SAMPLING_TIME: f64 = 2.0;

/// Fixed level for the time-over-threshold measurement in [mV].
pub const TOT_THRESHOLD: f64 = 120.0;

/// Relative time-over-threshold level as a fraction of the event amplitude.
pub const RELATIVE_TOT_FRACTION: f64 = 0.15;

/// Noise floor in [mV]; events whose signal spread stays below it are
/// treated as empty and dropped.
pub const NOISE_FLOOR: f64 = 50.0;

/// Number of digitizer channels: 0-7 PMTs, 8-9 tiles before the dump,
/// 10-11 tiles after the dump.
pub const NUM_CHANNELS: usize = 12;
