use std::env;
use std::process;
use std::time::Instant;

use anyhow::{bail, Context};
use log::{info, warn};

use ym2203_mml::timer::ManualTicks;
use ym2203_mml::{trace, MmlPlayer, RecordingBus, Song};
#[cfg(feature = "realtime")]
use ym2203_mml::{SharedPlayer, ThreadTicks};

const USAGE: &str = "\
Usage:
  ym2203-mml [--realtime] [--trace <out.csv>] [--log-level <level>] <song.json>

Flags:
  --realtime           Deliver ticks at the song tempo from a host thread
  --trace <out.csv>    Write every register write as CSV
  --log-level <level>  error, warn, info, debug or trace (default warn)
  -h, --help           Show this help

Examples:
  ym2203-mml demos/jingle_bells.json
  ym2203-mml --realtime --trace bells.csv demos/jingle_bells.json
";

struct Options {
    song_path: String,
    realtime: bool,
    trace_path: Option<String>,
    log_level: String,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut song_path = None;
    let mut realtime = false;
    let mut trace_path = None;
    let mut log_level = "warn".to_string();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--realtime" => realtime = true,
            "--trace" => match args.next() {
                Some(path) => trace_path = Some(path),
                None => bail!("--trace requires an output path"),
            },
            "--log-level" => match args.next() {
                Some(level) => log_level = level,
                None => bail!("--log-level requires a level"),
            },
            "--help" | "-h" => {
                print!("{}", USAGE);
                process::exit(0);
            }
            _ if arg.starts_with("--trace=") => {
                trace_path = Some(arg["--trace=".len()..].to_string());
            }
            _ if arg.starts_with("--log-level=") => {
                log_level = arg["--log-level=".len()..].to_string();
            }
            _ if arg.starts_with('-') => bail!("Unknown flag: {}", arg),
            _ => {
                if song_path.replace(arg).is_some() {
                    bail!("only one song file may be given");
                }
            }
        }
    }

    let Some(song_path) = song_path else {
        eprint!("{}", USAGE);
        process::exit(2);
    };
    Ok(Options {
        song_path,
        realtime,
        trace_path,
        log_level,
    })
}

struct Summary {
    ticks: u64,
    errors: usize,
    bus: RecordingBus,
}

/// Tick each step to completion as fast as possible
fn render(song: &Song) -> Summary {
    let mut player = MmlPlayer::new(RecordingBus::new(), ManualTicks::new(), song.player_config());
    player.begin();
    song.setup(&mut player);

    let mut errors = 0;
    let mut step = 0;
    while song.load_step(&mut player, step) {
        player.play();
        while player.is_playing() {
            player.on_tick();
        }
        for err in player.take_errors() {
            warn!("step {}: {}", step, err);
            errors += 1;
        }
        step += 1;
    }

    let ticks = player.tick_count();
    Summary {
        ticks,
        errors,
        bus: player.chip().bus().clone(),
    }
}

/// Play each step against the host clock
#[cfg(feature = "realtime")]
fn play_realtime(song: &Song) -> Summary {
    let shared = SharedPlayer::new(MmlPlayer::new(
        RecordingBus::with_realtime_delays(),
        ThreadTicks::new(),
        song.player_config(),
    ));
    shared.begin();
    song.setup(&mut *shared.lock());

    let mut ticker = shared.spawn_ticker();
    let mut errors = 0;
    let mut step = 0;
    loop {
        if !song.load_step(&mut *shared.lock(), step) {
            break;
        }
        info!("step {} of {}", step + 1, song.play_order().len());
        shared.play_and_wait();
        let step_errors = shared.lock().take_errors();
        for err in step_errors {
            warn!("step {}: {}", step, err);
            errors += 1;
        }
        step += 1;
    }
    ticker.stop();

    let player = shared.lock();
    Summary {
        ticks: player.tick_count(),
        errors,
        bus: player.chip().bus().clone(),
    }
}

#[cfg(not(feature = "realtime"))]
fn play_realtime(song: &Song) -> Summary {
    eprintln!("--realtime requires the \"realtime\" feature; rendering instead.");
    render(song)
}

fn run() -> anyhow::Result<()> {
    let options = parse_args()?;
    let env = env_logger::Env::default().default_filter_or(&options.log_level);
    env_logger::Builder::from_env(env).init();

    let song = Song::load(&options.song_path)
        .with_context(|| format!("loading {}", options.song_path))?;

    println!("YM2203 MML Player");
    println!("=================\n");
    println!("Song:   {}", song.title.as_deref().unwrap_or(&options.song_path));
    println!("Tempo:  {} bpm", song.tempo);
    println!("Steps:  {}\n", song.play_order().len());

    let started = Instant::now();
    let summary = if options.realtime {
        play_realtime(&song)
    } else {
        render(&song)
    };
    let elapsed = started.elapsed();

    println!("=== Playback Statistics ===");
    println!("Duration:          {:.2} seconds", elapsed.as_secs_f32());
    println!("Ticks:             {}", summary.ticks);
    println!("Register writes:   {}", summary.bus.writes().len());
    println!("Simulated bus:     {} us", summary.bus.elapsed_us());
    println!("MML errors:        {}", summary.errors);

    if let Some(path) = &options.trace_path {
        trace::save_csv(path, summary.bus.writes())
            .with_context(|| format!("writing trace {}", path))?;
        println!("Trace written to {}", path);
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
