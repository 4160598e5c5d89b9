//! Player handle shared between the tick context and the foreground
//!
//! On the board, the tick handler is an interrupt and foreground calls mask
//! it while they touch channel state or the bus. Here the same exclusion is a
//! mutex: every method below takes the lock for exactly one player call, so
//! a tick can never land between two halves of a register write or in the
//! middle of `play()` resetting the channels.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use super::MmlPlayer;
use crate::timer::TickSource;
use crate::voice::Voice;
use crate::ym2203::bus::ChipBus;

#[cfg(feature = "realtime")]
use crate::timer::{ThreadTicks, TickThread};

/// Poll interval of [`SharedPlayer::play_and_wait`]
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Cloneable, lock-guarded [`MmlPlayer`]
pub struct SharedPlayer<B: ChipBus, T: TickSource> {
    inner: Arc<Mutex<MmlPlayer<B, T>>>,
}

impl<B: ChipBus, T: TickSource> Clone for SharedPlayer<B, T> {
    fn clone(&self) -> Self {
        SharedPlayer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ChipBus, T: TickSource> SharedPlayer<B, T> {
    /// Wrap a player
    pub fn new(player: MmlPlayer<B, T>) -> Self {
        SharedPlayer {
            inner: Arc::new(Mutex::new(player)),
        }
    }

    /// Lock the player for a sequence of calls that must not see a tick in between
    pub fn lock(&self) -> MutexGuard<'_, MmlPlayer<B, T>> {
        self.inner.lock()
    }

    /// Tick handler entry point
    pub fn on_tick(&self) {
        self.inner.lock().on_tick();
    }

    /// See [`MmlPlayer::begin`]
    pub fn begin(&self) {
        self.inner.lock().begin();
    }

    /// See [`MmlPlayer::play`]
    pub fn play(&self) {
        self.inner.lock().play();
    }

    /// Play and block until every channel has ended or [`SharedPlayer::stop`] is called.
    ///
    /// Something else must be delivering ticks, or this never returns.
    pub fn play_and_wait(&self) {
        self.play();
        while self.is_playing() {
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// See [`MmlPlayer::stop`]
    pub fn stop(&self) {
        self.inner.lock().stop();
    }

    /// See [`MmlPlayer::is_playing`]
    pub fn is_playing(&self) -> bool {
        self.inner.lock().is_playing()
    }

    /// See [`MmlPlayer::set_tempo`]
    pub fn set_tempo(&self, bpm: u16) {
        self.inner.lock().set_tempo(bpm);
    }

    /// See [`MmlPlayer::set_note`]
    pub fn set_note(&self, ch: usize, phrase: impl Into<Arc<str>>) {
        self.inner.lock().set_note(ch, phrase);
    }

    /// See [`MmlPlayer::set_volume`]
    pub fn set_volume(&self, ch: usize, volume: u8) {
        self.inner.lock().set_volume(ch, volume);
    }

    /// See [`MmlPlayer::set_envelope`]
    pub fn set_envelope(&self, ch: usize, shape: u8, interval: u16) {
        self.inner.lock().set_envelope(ch, shape, interval);
    }

    /// See [`MmlPlayer::set_tone_noise`]
    pub fn set_tone_noise(&self, ch: usize, mode: u8) {
        self.inner.lock().set_tone_noise(ch, mode);
    }

    /// See [`MmlPlayer::set_gate_time`]
    pub fn set_gate_time(&self, ch: usize, gate_time: u8) {
        self.inner.lock().set_gate_time(ch, gate_time);
    }

    /// See [`MmlPlayer::set_timbre`]
    pub fn set_timbre(&self, ch: usize, voice: &Voice) {
        self.inner.lock().set_timbre(ch, voice);
    }
}

#[cfg(feature = "realtime")]
impl<B: ChipBus + 'static> SharedPlayer<B, ThreadTicks> {
    /// Start a host thread that delivers ticks at the programmed tempo
    pub fn spawn_ticker(&self) -> TickThread {
        let ticks = self.inner.lock().ticks().clone();
        let player = self.clone();
        TickThread::spawn(&ticks, move || player.on_tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::PlayerConfig;
    use crate::timer::ManualTicks;
    use crate::ym2203::bus::RecordingBus;
    use crate::ym2203::SSG_CH_A;

    #[test]
    fn test_play_and_wait_with_tick_thread() {
        let shared = SharedPlayer::new(MmlPlayer::new(
            RecordingBus::new(),
            ManualTicks::new(),
            PlayerConfig::default(),
        ));
        shared.begin();
        shared.set_note(SSG_CH_A, "L32C");

        let ticker = shared.clone();
        let handle = thread::spawn(move || {
            while !ticker.is_playing() {
                thread::yield_now();
            }
            while ticker.is_playing() {
                ticker.on_tick();
            }
        });

        shared.play_and_wait();
        handle.join().unwrap();
        assert!(!shared.is_playing());
        // One 32nd note: 3 * 8 ticks plus the priming tick
        assert_eq!(shared.lock().tick_count(), 25);
    }

    #[cfg(feature = "realtime")]
    #[test]
    fn test_spawned_ticker_finishes_phrase() {
        let shared = SharedPlayer::new(MmlPlayer::new(
            RecordingBus::new(),
            ThreadTicks::new(),
            PlayerConfig::default(),
        ));
        shared.begin();
        shared.set_tempo(300);
        shared.set_note(SSG_CH_A, "L32CD");

        let mut ticker = shared.spawn_ticker();
        shared.play_and_wait();
        ticker.stop();

        let mut player = shared.lock();
        assert!(player.take_errors().is_empty());
        assert!(player.channel(SSG_CH_A).unwrap().is_ended());
        assert_eq!(player.chip().mixer_value(), 0x3F);
    }
}
