//! FM voice (timbre) parameters
//!
//! A [`Voice`] describes one 4-operator FM patch: connection algorithm,
//! operator-1 feedback, which operators take part in key-on, and the envelope
//! and frequency parameters of every operator. Values are stored as given; the
//! chip driver masks them to their register widths when the voice is applied.

pub mod presets;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub use presets::{VoiceBank, VOICE_BANK_SIZE};

/// Number of operators in an FM voice
pub const OPERATOR_NUM: usize = 4;

/// 5x10 integer voice layout.
///
/// Row 0 = `[feedback << 3 | algorithm, operator mask, ...]`, rows 1-4 =
/// operators 1-4 as `[AR, DR, SR, RR, SL, TL, KS, ML, DT, -]`. Unused cells
/// (LFO settings on OPN-family chips that have them) are ignored.
pub type VoiceMatrix = [[i16; 10]; 5];

bitflags! {
    /// Operator selection used for key-on and carrier sets
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OperatorMask: u8 {
        /// Operator 1
        const OP1 = 0x01;
        /// Operator 2
        const OP2 = 0x02;
        /// Operator 3
        const OP3 = 0x04;
        /// Operator 4
        const OP4 = 0x08;
    }
}

impl OperatorMask {
    /// Mask bit of operator index `op` (0-3)
    pub fn of(op: usize) -> Self {
        OperatorMask::from_bits_truncate(1 << op)
    }

    /// Operators whose output is audible for `algorithm`
    pub fn carriers(algorithm: u8) -> Self {
        let mut mask = OperatorMask::OP4;
        if algorithm >= 4 {
            mask |= OperatorMask::OP2;
        }
        if algorithm >= 5 {
            mask |= OperatorMask::OP3;
        }
        if algorithm == 7 {
            mask |= OperatorMask::OP1;
        }
        mask
    }
}

/// Parameters of one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperatorParams {
    /// Attack rate (0-31)
    pub ar: u8,
    /// Decay rate (0-31)
    pub dr: u8,
    /// Sustain rate (0-31)
    pub sr: u8,
    /// Release rate (0-15)
    pub rr: u8,
    /// Sustain level (0-15)
    pub sl: u8,
    /// Total level (0-127, attenuation)
    pub tl: u8,
    /// Key scale (0-3)
    pub ks: u8,
    /// Frequency multiple (0-15)
    pub ml: u8,
    /// Detune (signed)
    pub dt: i8,
}

impl OperatorParams {
    /// Detune as written to the chip: non-negative values pass through,
    /// negative values become `4 - dt`.
    pub fn detune_bits(&self) -> u8 {
        if self.dt >= 0 {
            self.dt as u8
        } else {
            (4 - self.dt as i16) as u8
        }
    }

    /// Detune/multiple register byte
    pub fn detune_multiple(&self) -> u8 {
        ((self.detune_bits() & 0x07) << 4) | (self.ml & 0x0F)
    }

    /// Key scale/attack rate register byte
    pub fn key_scale_attack(&self) -> u8 {
        ((self.ks & 0x03) << 6) | (self.ar & 0x1F)
    }

    /// Sustain level/release rate register byte
    pub fn sustain_release(&self) -> u8 {
        ((self.sl & 0x0F) << 4) | (self.rr & 0x0F)
    }
}

/// One FM voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Connection algorithm (0-7)
    pub algorithm: u8,
    /// Operator 1 self-feedback (0-7)
    pub feedback: u8,
    /// Operators keyed on by note-on (bit 0 = operator 1)
    #[serde(default = "all_operators")]
    pub operator_mask: u8,
    /// Operators 1-4
    pub operators: [OperatorParams; OPERATOR_NUM],
}

fn all_operators() -> u8 {
    OperatorMask::all().bits()
}

impl Default for Voice {
    fn default() -> Self {
        Voice {
            algorithm: 0,
            feedback: 0,
            operator_mask: 0,
            operators: [OperatorParams::default(); OPERATOR_NUM],
        }
    }
}

impl Voice {
    /// Create a voice with all operator parameters zeroed
    pub fn new(algorithm: u8, feedback: u8, operator_mask: u8) -> Self {
        Voice {
            algorithm,
            feedback,
            operator_mask,
            ..Voice::default()
        }
    }

    /// Build a voice from the 5x10 matrix layout
    pub fn from_matrix(matrix: &VoiceMatrix) -> Self {
        let mut voice = Voice::new(
            (matrix[0][0] & 0x07) as u8,
            ((matrix[0][0] >> 3) & 0x07) as u8,
            (matrix[0][1] & 0x0F) as u8,
        );
        for (op, row) in matrix[1..].iter().enumerate() {
            voice.operators[op] = OperatorParams {
                ar: row[0] as u8,
                dr: row[1] as u8,
                sr: row[2] as u8,
                rr: row[3] as u8,
                sl: row[4] as u8,
                tl: row[5] as u8,
                ks: row[6] as u8,
                ml: row[7] as u8,
                dt: row[8] as i8,
            };
        }
        voice
    }

    /// Inverse of [`Voice::from_matrix`] for in-range values
    pub fn to_matrix(&self) -> VoiceMatrix {
        let mut matrix = [[0i16; 10]; 5];
        matrix[0][0] = (((self.feedback & 0x07) << 3) | (self.algorithm & 0x07)) as i16;
        matrix[0][1] = (self.operator_mask & 0x0F) as i16;
        for (op, params) in self.operators.iter().enumerate() {
            matrix[op + 1] = [
                params.ar as i16,
                params.dr as i16,
                params.sr as i16,
                params.rr as i16,
                params.sl as i16,
                params.tl as i16,
                params.ks as i16,
                params.ml as i16,
                params.dt as i16,
                0,
            ];
        }
        matrix
    }

    /// Parameters of operator `op` (0-3)
    pub fn operator(&self, op: usize) -> &OperatorParams {
        &self.operators[op]
    }

    /// Operators keyed on by note-on
    pub fn key_on_mask(&self) -> OperatorMask {
        OperatorMask::from_bits_truncate(self.operator_mask)
    }

    /// Carrier operators for this voice's algorithm
    pub fn carriers(&self) -> OperatorMask {
        OperatorMask::carriers(self.algorithm)
    }

    /// Feedback/algorithm register byte
    pub fn feedback_algorithm(&self) -> u8 {
        ((self.feedback & 0x07) << 3) | (self.algorithm & 0x07)
    }

    fn set_each(&mut self, values: [u8; OPERATOR_NUM], field: fn(&mut OperatorParams) -> &mut u8) {
        for (params, value) in self.operators.iter_mut().zip(values) {
            *field(params) = value;
        }
    }

    /// Set attack rates of operators 1-4
    pub fn set_ar(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.ar);
    }

    /// Set decay rates of operators 1-4
    pub fn set_dr(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.dr);
    }

    /// Set sustain rates of operators 1-4
    pub fn set_sr(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.sr);
    }

    /// Set release rates of operators 1-4
    pub fn set_rr(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.rr);
    }

    /// Set sustain levels of operators 1-4
    pub fn set_sl(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.sl);
    }

    /// Set total levels of operators 1-4
    pub fn set_tl(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.tl);
    }

    /// Set key scales of operators 1-4
    pub fn set_ks(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.ks);
    }

    /// Set multiples of operators 1-4
    pub fn set_ml(&mut self, op1: u8, op2: u8, op3: u8, op4: u8) {
        self.set_each([op1, op2, op3, op4], |p| &mut p.ml);
    }

    /// Set detunes of operators 1-4
    pub fn set_dt(&mut self, op1: i8, op2: i8, op3: i8, op4: i8) {
        for (params, value) in self.operators.iter_mut().zip([op1, op2, op3, op4]) {
            params.dt = value;
        }
    }
}

impl From<&VoiceMatrix> for Voice {
    fn from(matrix: &VoiceMatrix) -> Self {
        Voice::from_matrix(matrix)
    }
}
