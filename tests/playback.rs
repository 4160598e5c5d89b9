use ym2203_mml::mml::MmlErrorKind;
use ym2203_mml::timer::ManualTicks;
use ym2203_mml::ym2203::{FM_CH1, FM_CH2, FM_CH3, SSG_CH_A, SSG_CH_B, SSG_CH_C};
use ym2203_mml::{MmlPlayer, PlayerConfig, RecordingBus, Voice, VoiceMatrix};

type Player = MmlPlayer<RecordingBus, ManualTicks>;

const KEY_ON: u8 = 0x28;

fn player() -> Player {
    let mut player =
        MmlPlayer::new(RecordingBus::new(), ManualTicks::new(), PlayerConfig::default());
    player.begin();
    player.chip_mut().bus_mut().clear_log();
    player
}

fn organ() -> Voice {
    let mut voice = Voice::new(7, 0, 0x0F);
    voice.set_ar(31, 31, 31, 31);
    voice.set_tl(10, 20, 30, 40);
    voice.set_ml(1, 1, 1, 1);
    voice
}

fn run_to_end(player: &mut Player) -> u64 {
    let start = player.tick_count();
    while player.is_playing() {
        player.on_tick();
    }
    player.tick_count() - start
}

fn key_ons(player: &Player) -> usize {
    player
        .chip()
        .bus()
        .writes_to(KEY_ON)
        .filter(|w| w.value & 0xF0 != 0)
        .count()
}

#[test]
fn fm_note_without_voice_counts_but_stays_silent() {
    let mut player = player();
    player.set_note(FM_CH1, "L4C");
    player.play();
    player.on_tick();

    let state = player.channel(FM_CH1).unwrap();
    assert_eq!(state.step_counter(), 192);
    assert_eq!(state.gate_counter(), 24 * 7);
    assert_eq!(key_ons(&player), 0);
    // Pitch is still programmed
    assert_eq!(player.chip().bus().writes_to(0xA4).count(), 1);
}

#[test]
fn tied_notes_share_one_key_on() {
    let mut player = player();
    player.set_timbre(FM_CH1, &organ());
    player.chip_mut().bus_mut().clear_log();
    player.set_note(FM_CH1, "O4C&C");
    player.play();
    run_to_end(&mut player);

    assert!(player.take_errors().is_empty());
    assert_eq!(player.chip().bus().writes_to(0xA4).count(), 1);
    assert_eq!(player.chip().bus().writes_to(0xA0).count(), 1);
    assert_eq!(key_ons(&player), 1);
}

#[test]
fn dotted_sixteenth() {
    let mut player = player();
    player.set_note(SSG_CH_A, "L16C.D");
    player.play();
    player.on_tick();

    let state = player.channel(SSG_CH_A).unwrap();
    assert_eq!(state.step_counter(), 72);
    assert_eq!(state.gate_counter(), 63);
}

#[test]
fn six_channels_stop_together() {
    let mut player = player();
    for ch in [FM_CH1, FM_CH2, FM_CH3, SSG_CH_A, SSG_CH_B, SSG_CH_C] {
        player.set_note(ch, "C");
    }
    player.play();
    assert_eq!(run_to_end(&mut player), 193);
    assert!((0..6).all(|ch| player.channel(ch).unwrap().is_ended()));
    assert_eq!(player.chip().mixer_value(), 0x3F);
}

#[test]
fn volume_scales_carriers_only() {
    let mut player = player();
    let mut voice = organ();
    voice.algorithm = 4;
    player.set_timbre(FM_CH2, &voice);
    player.chip_mut().bus_mut().clear_log();

    player.set_volume(FM_CH2, 13);
    let writes: Vec<(u8, u8)> = player
        .chip()
        .bus()
        .writes()
        .iter()
        .map(|w| (w.address, w.value))
        .collect();
    // Operator 4 then operator 2, each +6 attenuation
    assert_eq!(writes, vec![(0x4D, 46), (0x49, 26)]);
}

#[test]
fn note_off_twice_is_harmless() {
    let mut player = player();
    let chip = player.chip_mut();
    chip.note_on(SSG_CH_B);
    assert_eq!(chip.mixer_value(), 0x3D);
    chip.note_off(SSG_CH_B);
    chip.note_off(SSG_CH_B);
    assert_eq!(chip.mixer_value(), 0x3F);
    assert_eq!(chip.bus().register(0x07), 0x3F);
}

#[test]
fn matrix_round_trip() {
    let matrix: VoiceMatrix = [
        [0x2C, 0x0F, 0, 0, 0, 0, 0, 0, 0, 0],
        [31, 18, 0, 6, 2, 36, 0, 10, 3, 0],
        [31, 14, 4, 6, 2, 45, 0, 0, -3, 0],
        [31, 10, 4, 6, 2, 18, 1, 1, 0, 0],
        [31, 10, 3, 6, 2, 0, 0, 1, 2, 0],
    ];
    let voice = Voice::from_matrix(&matrix);
    assert_eq!(voice.algorithm, 4);
    assert_eq!(voice.feedback, 5);
    assert_eq!(voice.operator(1).dt, -3);
    assert_eq!(voice.to_matrix(), matrix);
}

#[test]
fn pitch_overflow_ends_only_that_channel() {
    let mut player = player();
    player.set_note(SSG_CH_A, "O8B#");
    player.set_note(SSG_CH_B, "L8CC");
    player.play();
    player.on_tick();

    let errors = player.take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].channel, SSG_CH_A);
    assert_eq!(errors[0].position, 2);
    assert_eq!(errors[0].command, '#');
    assert_eq!(errors[0].kind, MmlErrorKind::PitchTooHigh);
    assert!(player.channel(SSG_CH_A).unwrap().is_ended());
    assert!(!player.channel(SSG_CH_B).unwrap().is_ended());

    run_to_end(&mut player);
    assert!(player.take_errors().is_empty());
}

#[test]
fn new_phrase_waits_for_play() {
    let mut player = player();
    player.set_note(SSG_CH_C, "L8CDE");
    player.play();
    player.on_tick();
    player.set_note(SSG_CH_C, "R");

    let state = player.channel(SSG_CH_C).unwrap();
    assert_eq!(state.active_phrase(), "L8CDE");
    assert_eq!(state.phrase(), "R");

    run_to_end(&mut player);
    player.play();
    assert_eq!(player.channel(SSG_CH_C).unwrap().active_phrase(), "R");
}

#[test]
fn bank_voice_select() {
    let mut player = player();
    player.set_note(FM_CH3, "@13C");
    player.play();
    player.on_tick();
    assert!(player.chip().voice(FM_CH3).is_some());
    assert_eq!(key_ons(&player), 1);
}
