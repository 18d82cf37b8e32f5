use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
    thread::sleep,
    time::Duration,
};

use chunksync_lib::{
    AudioOutput, Channel, DecodingFetcher, OfflineOutput, Player, PlayerError, ProgramConfig,
    RodioOutput,
};
use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::{controls, logging, ui};

/// Virtual-clock step used by `--offline` runs.
const OFFLINE_STEP: f64 = 0.25;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub fn run(args: &ArgMatches, log_buffer: Arc<Mutex<VecDeque<String>>>) -> Result<i32, PlayerError> {
    if args.subcommand_matches("print-config").is_some() {
        let json = serde_json::to_string_pretty(&ProgramConfig::default())
            .map_err(|err| PlayerError::InvalidConfig(err.to_string()))?;
        println!("{}", json);
        return Ok(0);
    }

    info!("Starting chunksync");
    let config_path = args
        .get_one::<String>("CONFIG")
        .ok_or_else(|| PlayerError::InvalidConfig("no program description given".to_string()))?;
    let config = load_config(config_path, args)?;
    let quiet = args.get_flag("quiet");
    let title = format!("chunksync - {}", config_path);

    if args.get_flag("offline") {
        let output = OfflineOutput::new();
        let player = build_player(config, Arc::new(output.clone()), args, quiet)?;
        return run_offline(&player, &output, quiet);
    }

    let player = build_player(config, Arc::new(RodioOutput::new()), args, quiet)?;
    run_interactive(&player, &title, quiet, log_buffer)
}

/// Read the program description and apply command-line overrides.
fn load_config(path: &str, args: &ArgMatches) -> Result<ProgramConfig, PlayerError> {
    let mut config = ProgramConfig::from_json_file(path)?;

    if let Some(src) = args.get_one::<String>("src") {
        config.src = src.clone();
    }
    if args.get_flag("loop") {
        config.looping = true;
    }
    if let Some(gain) = args.get_one::<String>("GAIN") {
        let gain = gain
            .parse::<f32>()
            .map_err(|_| PlayerError::InvalidConfig(format!("invalid gain {:?}", gain)))?;
        config.volume = gain / 100.0;
    }

    Ok(config)
}

fn build_player(
    config: ProgramConfig,
    output: Arc<dyn AudioOutput>,
    args: &ArgMatches,
    quiet: bool,
) -> Result<Player, PlayerError> {
    let player = Player::new(config, output, Arc::new(DecodingFetcher::new()))?;

    for setting in args.get_many::<String>("track-volume").into_iter().flatten() {
        let (track_index, volume) = parse_track_setting(setting)?;
        player.set_track_volume(track_index, volume)?;
    }
    for setting in args.get_many::<String>("track-pan").into_iter().flatten() {
        let (track_index, pan) = parse_track_setting(setting)?;
        player.set_track_pan(track_index, pan)?;
    }
    if let Some(seek) = args.get_one::<String>("seek") {
        let time = seek
            .parse::<f64>()
            .map_err(|_| PlayerError::InvalidConfig(format!("invalid seek time {:?}", seek)))?;
        player.set_current_time(time)?;
    }

    for channel in [
        Channel::Play,
        Channel::Pause,
        Channel::ChunkChange,
        Channel::Ended,
    ] {
        player.subscribe(channel, move |time| {
            info!("{} at {:.3}s", channel, time);
        });
    }
    if !quiet {
        for channel in [Channel::ChunkChange, Channel::Ended] {
            player.subscribe(channel, move |time| println!("{} {:.3}", channel, time));
        }
    }

    Ok(player)
}

/// Parse `INDEX=VALUE`.
fn parse_track_setting(setting: &str) -> Result<(usize, f32), PlayerError> {
    let invalid = || PlayerError::InvalidConfig(format!("expected INDEX=VALUE, got {:?}", setting));
    let (index, value) = setting.split_once('=').ok_or_else(invalid)?;
    let index = index.trim().parse::<usize>().map_err(|_| invalid())?;
    let value = value.trim().parse::<f32>().map_err(|_| invalid())?;
    Ok((index, value))
}

/// Play to the end against the virtual clock, as fast as chunks load.
fn run_offline(player: &Player, output: &OfflineOutput, quiet: bool) -> Result<i32, PlayerError> {
    if !quiet {
        println!(
            "program {} tracks x {} chunks, volume {:.2}, loop {}",
            player.program().track_count,
            player.program().chunk_count,
            player.volume(),
            if player.is_looping() { "on" } else { "off" }
        );
    }
    let passes = if player.is_looping() { 2.0 } else { 1.0 };
    let budget = player.duration() * passes + player.program().chunk_duration;
    let mut elapsed = 0.0;

    player.play()?;
    while !player.is_ended() && elapsed < budget {
        if !player.wait_for_audio(LOAD_TIMEOUT) {
            if player.is_ended() {
                break;
            }
            error!("timed out waiting for chunk {}", player.current_chunk());
            return Ok(1);
        }
        output.advance(OFFLINE_STEP);
        elapsed += OFFLINE_STEP;
    }
    player.pause();

    info!("offline run finished at {:.3}s", player.current_time());
    Ok(0)
}

fn run_interactive(
    player: &Player,
    title: &str,
    quiet: bool,
    log_buffer: Arc<Mutex<VecDeque<String>>>,
) -> Result<i32, PlayerError> {
    player.play()?;

    let _raw_mode = if quiet { None } else { RawModeGuard::enable().ok() };
    let mut terminal = if !quiet {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
        let backend = CrosstermBackend::new(stdout);
        Terminal::new(backend).ok()
    } else {
        None
    };

    // UI / input loop.
    while !player.is_ended() {
        match terminal.as_mut() {
            Some(term) => {
                let status = controls::status_text(controls::StatusArgs::from_player(player));
                let log_lines = logging::snapshot(&log_buffer);
                ui::draw_status(term, title, &status, &log_lines);
                if !controls::handle_key_event(player) {
                    break;
                }
            }
            None => sleep(Duration::from_millis(100)),
        }

        sleep(Duration::from_millis(50));
    }

    if let Some(mut term) = terminal {
        let _ = term.show_cursor();
        let stdout = term.backend_mut();
        let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    }

    Ok(0)
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::{load_config, parse_track_setting};
    use crate::cli::args::build_cli;

    fn load_with(json: &str, flags: &[&str]) -> chunksync_lib::ProgramConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program.json");
        std::fs::write(&path, json).unwrap();
        let path = path.to_string_lossy().to_string();

        let mut argv = vec!["chunksync", path.as_str()];
        argv.extend_from_slice(flags);
        let args = build_cli().try_get_matches_from(argv).unwrap();
        load_config(&path, &args).unwrap()
    }

    #[test]
    fn program_volume_is_kept_without_a_gain_flag() {
        let config = load_with(r#"{"volume": 0.5, "loop": true}"#, &["--offline"]);
        assert_eq!(config.volume, 0.5);
        assert!(config.looping);
    }

    #[test]
    fn gain_flag_overrides_program_volume() {
        let config = load_with(r#"{"volume": 0.5}"#, &["--gain", "80"]);
        assert!((config.volume - 0.8).abs() < 1e-6);
        assert!(!config.looping);
    }

    #[test]
    fn track_settings_parse() {
        assert_eq!(parse_track_setting("2=0.75").unwrap(), (2, 0.75));
        assert_eq!(parse_track_setting(" 0 = -1 ").unwrap(), (0, -1.0));
        assert!(parse_track_setting("0.5").is_err());
        assert!(parse_track_setting("x=1").is_err());
    }
}
