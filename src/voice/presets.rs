//! Built-in voice bank
//!
//! 64 slots selectable with `@n` in MML. Slot 0 and a handful of
//! General-MIDI-numbered slots carry patches; the rest hold an all-zero
//! voice (no operators keyed) until the host fills them.

use super::{Voice, VoiceMatrix};

/// Number of slots in a [`VoiceBank`]
pub const VOICE_BANK_SIZE: usize = 64;

const DEFAULT_VOICE: VoiceMatrix = [
    [34, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 24, 0, 8, 11, 12, 0, 0, 0, 0],
    [31, 15, 17, 12, 2, 17, 0, 0, 0, 0],
    [31, 24, 0, 8, 11, 19, 0, 0, 0, 0],
    [31, 19, 17, 12, 2, 0, 0, 0, 0, 0],
];

const PIANO: VoiceMatrix = [
    [44, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 5, 0, 0, 0, 23, 1, 1, 3, 0],
    [20, 10, 3, 7, 8, 0, 1, 1, 3, 0],
    [31, 3, 0, 0, 0, 25, 1, 1, 7, 0],
    [31, 12, 3, 7, 10, 2, 1, 1, 7, 0],
];

const TRUMPET: VoiceMatrix = [
    [58, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [13, 6, 0, 8, 1, 25, 2, 2, 3, 0],
    [15, 8, 0, 8, 1, 32, 1, 6, 7, 0],
    [21, 7, 0, 8, 2, 42, 0, 2, 3, 0],
    [18, 4, 0, 8, 2, 0, 1, 2, 0, 0],
];

const STRINGS_1: VoiceMatrix = [
    [58, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [25, 10, 0, 5, 1, 29, 1, 1, 1, 0],
    [25, 11, 0, 8, 5, 15, 1, 5, 1, 0],
    [28, 13, 0, 6, 2, 45, 1, 1, 0, 0],
    [14, 4, 0, 6, 0, 0, 1, 1, 0, 0],
];

const STRINGS_2: VoiceMatrix = [
    [2, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [21, 7, 0, 7, 3, 37, 1, 1, 3, 0],
    [20, 11, 0, 12, 3, 15, 1, 5, 7, 0],
    [16, 8, 0, 12, 3, 45, 1, 1, 0, 0],
    [14, 5, 0, 12, 1, 0, 1, 1, 0, 0],
];

const ELECTRIC_PIANO: VoiceMatrix = [
    [52, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [22, 5, 0, 3, 5, 30, 0, 2, 3, 0],
    [16, 8, 8, 7, 2, 0, 1, 2, 3, 0],
    [20, 5, 0, 3, 5, 34, 0, 4, 7, 0],
    [17, 8, 7, 7, 2, 0, 1, 2, 7, 0],
];

const ELECTRIC_BASS_1: VoiceMatrix = [
    [42, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 8, 0, 0, 3, 34, 0, 0, 3, 0],
    [31, 14, 6, 9, 2, 42, 0, 8, 0, 0],
    [31, 16, 3, 0, 2, 20, 0, 0, 7, 0],
    [31, 12, 5, 8, 2, 0, 0, 1, 0, 0],
];

const ELECTRIC_BASS_2: VoiceMatrix = [
    [56, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 8, 0, 6, 10, 38, 1, 1, 3, 0],
    [28, 18, 5, 6, 13, 47, 1, 10, 7, 0],
    [31, 7, 7, 6, 8, 23, 2, 0, 2, 0],
    [28, 9, 6, 6, 1, 0, 2, 0, 0, 0],
];

const CLARINET: VoiceMatrix = [
    [59, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 7, 0, 5, 0, 40, 1, 2, 0, 0],
    [20, 10, 0, 11, 5, 50, 1, 3, 0, 0],
    [20, 10, 0, 6, 10, 40, 1, 4, 0, 0],
    [20, 15, 0, 7, 0, 0, 1, 1, 0, 0],
];

const ZITAR: VoiceMatrix = [
    [48, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [18, 5, 3, 1, 2, 30, 1, 3, 7, 0],
    [31, 5, 4, 1, 1, 28, 1, 2, 0, 0],
    [31, 5, 3, 3, 2, 35, 1, 1, 0, 0],
    [31, 10, 2, 5, 4, 0, 0, 1, 3, 0],
];

const CLAVINET: VoiceMatrix = [
    [50, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 15, 8, 6, 2, 35, 0, 12, 3, 0],
    [31, 6, 2, 6, 2, 32, 0, 3, 0, 0],
    [31, 6, 2, 6, 1, 32, 0, 1, 7, 0],
    [31, 6, 6, 7, 4, 0, 0, 2, 0, 0],
];

const HARPSICHORD: VoiceMatrix = [
    [42, 15, 0, 0, 0, 0, 0, 0, 0, 0],
    [31, 13, 0, 15, 10, 30, 1, 0, 3, 0],
    [31, 11, 2, 0, 3, 32, 1, 7, 3, 0],
    [31, 2, 0, 0, 1, 30, 0, 0, 7, 0],
    [31, 6, 6, 7, 1, 0, 1, 4, 7, 0],
];

/// Slot number and data of every non-default preset
const PRESETS: [(usize, &VoiceMatrix); 11] = [
    (13, &PIANO),
    (23, &TRUMPET),
    (24, &STRINGS_1),
    (25, &STRINGS_2),
    (27, &ELECTRIC_PIANO),
    (30, &ELECTRIC_BASS_1),
    (31, &ELECTRIC_BASS_2),
    (39, &CLARINET),
    (44, &ZITAR),
    (45, &CLAVINET),
    (46, &HARPSICHORD),
];

/// Voices addressable by `@n`
#[derive(Debug, Clone)]
pub struct VoiceBank {
    slots: [Voice; VOICE_BANK_SIZE],
}

impl VoiceBank {
    /// Bank with the built-in presets loaded
    pub fn new() -> Self {
        let mut slots = [Voice::default(); VOICE_BANK_SIZE];
        slots[0] = Voice::from_matrix(&DEFAULT_VOICE);
        for (slot, matrix) in PRESETS {
            slots[slot] = Voice::from_matrix(matrix);
        }
        VoiceBank { slots }
    }

    /// Voice in `slot`, if the slot exists
    pub fn get(&self, slot: usize) -> Option<&Voice> {
        self.slots.get(slot)
    }

    /// Replace the voice in `slot`; returns false if the slot does not exist
    pub fn set(&mut self, slot: usize, voice: Voice) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = voice;
                true
            }
            None => false,
        }
    }
}

impl Default for VoiceBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slots() {
        let bank = VoiceBank::new();
        assert_eq!(bank.get(0), Some(&Voice::from_matrix(&DEFAULT_VOICE)));
        assert_eq!(bank.get(0).unwrap().operator_mask, 0x0F);
        assert_eq!(bank.get(1), Some(&Voice::default()));
        assert_eq!(bank.get(63).unwrap().operator_mask, 0);
        assert_eq!(bank.get(64), None);
    }

    #[test]
    fn test_preset_slots() {
        let bank = VoiceBank::new();
        let piano = bank.get(13).unwrap();
        assert_eq!(piano.algorithm, 4);
        assert_eq!(piano.feedback, 5);
        assert_eq!(piano.operator(3).dt, 7);

        let bass = bank.get(31).unwrap();
        assert_eq!(bass.algorithm, 0);
        assert_eq!(bass.operator(1).ml, 10);
    }

    #[test]
    fn test_replace_slot() {
        let mut bank = VoiceBank::new();
        let voice = Voice::new(7, 0, 0x0F);
        assert!(bank.set(5, voice));
        assert_eq!(bank.get(5), Some(&voice));
        assert!(!bank.set(64, voice));
    }
}
