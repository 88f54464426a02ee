//! Hover Racer - headless runner
//!
//! Drives a time-attack race with a simple autopilot, submits the time to the
//! local leaderboard, stores the replay and plays it back.
//!
//! # Usage
//!
//! ```bash
//! hover-racer                                   # generated ring track
//! hover-racer --layout city.json --collision collision.png --height height.png
//! RUST_LOG=debug hover-racer --laps 1
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::Parser;
    use glam::Vec3;

    use hover_racer::consts::FRAME_MS;
    use hover_racer::platform::{DirStore, ManualTime, TimeSource};
    use hover_racer::race::{RaceDirector, RaceEvent, RaceMode, RaceStep};
    use hover_racer::sim::{ShipInput, SimEvent, VehicleSimulation};
    use hover_racer::track::{RingTrack, Track, TrackLayout, project_rounded};
    use hover_racer::{Leaderboard, LocalLeaderboard, Settings, format_time};

    #[derive(Parser)]
    #[command(name = "hover-racer")]
    #[command(author, version, about = "Headless hover racer: autopilot time attack and replay")]
    struct Args {
        /// Track layout JSON (requires --collision and --height)
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Collision/checkpoint map image
        #[arg(long)]
        collision: Option<PathBuf>,

        /// Height map image
        #[arg(long)]
        height: Option<PathBuf>,

        /// Directory for settings, leaderboard and replays
        #[arg(long, default_value = "hover-racer-data")]
        data: PathBuf,

        /// Override the number of laps
        #[arg(long)]
        laps: Option<u32>,

        /// Give up after this many minutes of race time
        #[arg(long, default_value = "10")]
        timeout_minutes: u32,

        /// Skip replay playback
        #[arg(long)]
        no_playback: bool,
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();
        let track = load_track(&args)?;
        let mut store = DirStore::open(&args.data)
            .with_context(|| format!("opening data directory {}", args.data.display()))?;

        let mut settings = Settings::load(&store);
        if let Some(laps) = args.laps {
            settings.total_laps = laps;
        }
        let max_ticks = (args.timeout_minutes as f32 * 60_000.0 / FRAME_MS) as u64;

        let time = ManualTime::new();
        let mut race = RaceDirector::new(
            track.clone(),
            settings.ship_tuning(),
            settings.race_config(),
            RaceMode::TimeAttack,
            time.clone(),
        );
        race.start();
        drive(&mut race, &time, max_ticks, |race| autopilot(race.ship(), race.track()));

        let track_id = &track.layout.id;
        let mode = RaceMode::TimeAttack.as_str();
        match race.score() {
            Some(score) => {
                println!("Finished {} in {}", track_id, format_time(score));
                for (i, lap) in race.progress().lap_times().iter().enumerate() {
                    println!("  lap {}: {}", i + 1, format_time(*lap));
                }

                let mut leaderboard = LocalLeaderboard::load(&store);
                match leaderboard.submit(track_id, mode, &settings.player_name, score) {
                    Some(rank) => println!("Leaderboard rank #{rank}"),
                    None => println!("Not fast enough for the leaderboard"),
                }
                leaderboard.save(&mut store)?;
                race.save_replay(&mut store)?;
            }
            None => println!("No time set: {}", race.result().as_str()),
        }

        if args.no_playback {
            return Ok(());
        }

        let mut playback = RaceDirector::new(
            track,
            settings.ship_tuning(),
            settings.race_config(),
            RaceMode::Replay,
            time.clone(),
        );
        if let Err(e) = playback.load_replay(&store) {
            log::warn!("No replay to play back: {e}");
            return Ok(());
        }
        playback.start();
        drive(&mut playback, &time, max_ticks, |_| ShipInput::default());
        println!(
            "Replay of {} frames ended: {}",
            playback.replay().len(),
            playback.result().as_str()
        );
        Ok(())
    }

    fn load_track(args: &Args) -> Result<Track> {
        match (&args.layout, &args.collision, &args.height) {
            (None, None, None) => Ok(RingTrack::default().build()),
            (Some(layout), Some(collision), Some(height)) => {
                let json = std::fs::read_to_string(layout)
                    .with_context(|| format!("reading {}", layout.display()))?;
                let layout: TrackLayout = serde_json::from_str(&json)
                    .with_context(|| format!("parsing {}", layout.display()))?;
                let track = Track::load(layout, collision, height);
                if !track.is_loaded() {
                    bail!("track maps failed to load");
                }
                Ok(track)
            }
            _ => bail!("--layout, --collision and --height go together"),
        }
    }

    /// Run a race at a fixed 60 FPS until it closes or times out
    fn drive<S: TimeSource>(
        race: &mut RaceDirector<S>,
        time: &ManualTime,
        max_ticks: u64,
        mut pilot: impl FnMut(&RaceDirector<S>) -> ShipInput,
    ) {
        for _ in 0..max_ticks {
            if !race.is_active() {
                return;
            }
            let input = if race.step() == RaceStep::Racing {
                pilot(race)
            } else {
                ShipInput::default()
            };
            time.advance(FRAME_MS as f64);
            race.update(&input);

            for event in race.ship_mut().drain_events() {
                match event {
                    SimEvent::Boost => log::debug!("Boost"),
                    SimEvent::WallHit { side, speed_ratio } => {
                        log::debug!("Wall hit, pushed {side:?} at {:.0}%", speed_ratio * 100.0)
                    }
                    SimEvent::Falling => log::info!("Falling!"),
                    SimEvent::Destroyed => log::info!("Destroyed"),
                }
            }
            for event in race.drain_events() {
                match event {
                    RaceEvent::Countdown(n) => log::info!("{n}"),
                    RaceEvent::Go => log::info!("Go!"),
                    RaceEvent::Checkpoint(id) => log::debug!("Checkpoint {id}"),
                    RaceEvent::LapCompleted { lap, time: lap_time } => {
                        log::info!("Lap {lap} time {}", format_time(lap_time))
                    }
                    RaceEvent::FinalLap => log::info!("Final lap"),
                    RaceEvent::Ended { result, time: end_time } => {
                        log::info!("{} at {}", result.as_str(), format_time(end_time))
                    }
                    RaceEvent::Closed => {}
                }
            }
        }
        log::warn!("Gave up after {max_ticks} ticks");
        race.end(hover_racer::RaceResult::None);
    }

    /// Steer toward whichever side of the road ahead is more open
    fn autopilot(ship: &VehicleSimulation, track: &Track) -> ShipInput {
        let map = &track.collision;
        let ratio = track.layout.pixel_ratio;
        let openness = |offset: Vec3| {
            let p = ship.position() + ship.orientation() * offset;
            let (x, y) = project_rounded(map, p, ratio);
            map.sample_point(x, y).r
        };

        let reach = 16.0 / ratio;
        let left = openness(Vec3::new(reach, 0.0, reach * 1.5));
        let right = openness(Vec3::new(-reach, 0.0, reach * 1.5));
        ShipInput {
            forward: true,
            left: left > right,
            right: right > left,
            ..Default::default()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    hover_racer::platform::init_logging();
    log::info!("Hover Racer (headless) starting...");
    if let Err(e) = headless::run() {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser front end links the library and drives it per frame
}
