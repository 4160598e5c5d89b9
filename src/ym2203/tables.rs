//! Pitch tables
//!
//! Both tables are calibrated for the 4 MHz master clock of the FM shield.

/// Number of keys in an octave
pub const KEY_NUM: usize = 12;

/// Highest octave a note can be placed in
pub const MAX_PITCH_OCTAVE: u8 = 8;

/// FM F-numbers for C..B (block 0 based)
pub const FM_PITCH_TABLE: [u16; KEY_NUM] = [
    617, 654, 693, 734, 778, 824, 873, 925, 980, 1038, 1100, 1165,
];

/// SSG tone periods for C..B, twice the octave-1 period so the
/// per-octave halving can round
pub const SSG_PITCH_TABLE: [u16; KEY_NUM] = [
    7645, 7215, 6810, 6428, 6067, 5727, 5405, 5102, 4816, 4545, 4290, 4050,
];

/// FM frequency register pair `(high, low)` for `octave` and `key`.
///
/// High byte = block in bits 5-3, F-number bits 10-8 in bits 2-0.
/// `key` must be below [`KEY_NUM`].
pub fn fm_frequency(octave: u8, key: usize) -> (u8, u8) {
    let fnum = FM_PITCH_TABLE[key];
    let high = ((octave & 0x07) << 3) | ((fnum >> 8) as u8 & 0x07);
    let low = (fnum & 0x00FF) as u8;
    (high, low)
}

/// SSG tone period for `octave` and `key`.
///
/// Octave 0 uses the raw table value; higher octaves shift by `octave - 1`
/// and then halve with the dropped bit added back. `key` must be below
/// [`KEY_NUM`].
pub fn ssg_period(octave: u8, key: usize) -> u16 {
    let mut period = SSG_PITCH_TABLE[key];
    if octave > 0 {
        period = period.checked_shr((octave - 1) as u32).unwrap_or(0);
        period = (period >> 1) + (period & 0x0001);
    }
    period
}
