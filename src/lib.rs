//! YM2203 (OPN) driver and MML sequencer
//!
//! Drives the three FM and three SSG channels of a Yamaha YM2203 through a
//! byte-wide bus, and plays six-channel music written in MML (Music Macro
//! Language) from a periodic tick.
//!
//! # Features
//! - Register-level driver with per-register-class settle times
//! - Soft mirror of the write-only SSG mixer register
//! - 4-operator FM voices, 5x10 matrix import/export, 64-slot preset bank
//! - Interrupt-style sequencer: one token scan per note, gate/step countdowns
//! - Host tick thread and lock-guarded shared player
//! - JSON song files and CSV register traces
//!
//! # Crate feature flags
//! - `realtime` (default): host thread standing in for the hardware tick timer
//!
//! # Quick start
//! ```
//! use ym2203_mml::{ManualTicks, MmlPlayer, PlayerConfig, RecordingBus};
//!
//! let mut player =
//!     MmlPlayer::new(RecordingBus::new(), ManualTicks::new(), PlayerConfig::default());
//! player.begin();
//! player.set_note(3, "O5L8CDE");
//! player.play();
//! while player.is_playing() {
//!     player.on_tick();
//! }
//! assert!(player.take_errors().is_empty());
//! ```

#![warn(missing_docs)]

pub mod mml; // MML tokens and lexer
pub mod sequencer; // Playback engine
pub mod song; // Song files
pub mod timer; // Tick source
pub mod trace; // Register-write export
pub mod voice; // FM voice model
pub mod ym2203; // Chip interface

use mml::MmlError;

/// Error types for the driver, the sequencer and song handling
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed MML phrase
    #[error("MML error: {0}")]
    Mml(#[from] MmlError),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON song or configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Trace export failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for fallible operations
pub type Result<T> = std::result::Result<T, Error>;

// Public API exports
pub use mml::{Command, MmlErrorKind};
pub use sequencer::{ChannelState, MmlPlayer, PlayerConfig, SharedPlayer};
pub use song::Song;
pub use timer::{ManualTicks, TickPeriod, TickSource, TimerConfig};
#[cfg(feature = "realtime")]
pub use timer::{ThreadTicks, TickThread};
pub use voice::{OperatorParams, Voice, VoiceBank, VoiceMatrix};
pub use ym2203::{ChipBus, RecordingBus, Ym2203};
