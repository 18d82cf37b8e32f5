use std::time::Duration;

use chunksync_lib::constants::{CACHE_WINDOW_AHEAD, CACHE_WINDOW_BEHIND};
use chunksync_lib::Player;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::error;

const SEEK_STEP: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;

pub struct StatusSnapshot {
    pub text: String,
    /// Position inside the current chunk, 0.0-1.0.
    pub chunk_ratio: f64,
    pub chunk_label: String,
    /// One cell per chunk around the current one.
    pub cache_map: String,
}

/// Load state of one chunk near the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkCell {
    Missing,
    Loading,
    Ready,
}

pub struct StatusArgs {
    pub time: f64,
    pub duration: f64,
    pub playing: bool,
    pub chunk: usize,
    pub chunk_count: usize,
    pub chunk_duration: f64,
    pub volume: f32,
    pub looping: bool,
    /// First chunk index covered by `cells`.
    pub window_start: usize,
    pub cells: Vec<ChunkCell>,
}

impl StatusArgs {
    pub fn from_player(player: &Player) -> Self {
        let program = player.program();
        let chunk = player.current_chunk();
        let window_start = chunk.saturating_sub(CACHE_WINDOW_BEHIND);
        let window_end = (chunk + CACHE_WINDOW_AHEAD + 1).min(program.chunk_count);
        let cells = (window_start..window_end)
            .map(|index| {
                if player.is_chunk_ready(index) {
                    ChunkCell::Ready
                } else if player.is_chunk_loaded(index) {
                    ChunkCell::Loading
                } else {
                    ChunkCell::Missing
                }
            })
            .collect();

        Self {
            time: player.current_time(),
            duration: player.duration(),
            playing: player.is_playing(),
            chunk,
            chunk_count: program.chunk_count,
            chunk_duration: program.chunk_duration,
            volume: player.volume(),
            looping: player.is_looping(),
            window_start,
            cells,
        }
    }
}

pub fn status_text(args: StatusArgs) -> StatusSnapshot {
    let state = if args.playing { "▶ Playing" } else { "⏸ Paused" };
    let current = format_time(args.time * 1000.0);
    let total = format_time(args.duration * 1000.0);
    let percent = if args.duration > 0.0 {
        (args.time / args.duration * 100.0).min(100.0)
    } else {
        0.0
    };
    let chunk = (args.chunk + 1).min(args.chunk_count);
    let looping = if args.looping { "on" } else { "off" };
    let text = format!(
        "{}   {} / {}   ({:>5.1}%)\nChunk {} of {} | volume: {:.0}% | loop: {}",
        state,
        current,
        total,
        percent,
        chunk,
        args.chunk_count,
        args.volume * 100.0,
        looping
    );

    let chunk_ratio = if args.chunk >= args.chunk_count || args.chunk_duration <= 0.0 {
        1.0
    } else {
        let offset = args.time - args.chunk as f64 * args.chunk_duration;
        (offset / args.chunk_duration).clamp(0.0, 1.0)
    };
    let chunk_label = format!("chunk {}/{}", chunk, args.chunk_count);

    let cache_map = args
        .cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            if args.window_start + i == args.chunk {
                '▶'
            } else {
                match cell {
                    ChunkCell::Ready => '█',
                    ChunkCell::Loading => '▒',
                    ChunkCell::Missing => '·',
                }
            }
        })
        .collect::<String>();
    let cache_map = format!("chunks {}+ {}", args.window_start + 1, cache_map);

    StatusSnapshot {
        text,
        chunk_ratio,
        chunk_label,
        cache_map,
    }
}

/// Poll for one key press and apply it. Returns `false` when the user quits.
pub fn handle_key_event(player: &Player) -> bool {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return true;
            }
            match key.code {
                KeyCode::Char('q') => {
                    player.pause();
                    return false;
                }
                KeyCode::Char(' ') => {
                    if player.is_playing() {
                        player.pause();
                    } else if let Err(err) = player.play() {
                        error!("failed to resume playback: {}", err);
                    }
                }
                KeyCode::Left => seek_by(player, -SEEK_STEP),
                KeyCode::Right => seek_by(player, SEEK_STEP),
                KeyCode::Char('-') => {
                    player.set_volume(player.volume() - VOLUME_STEP);
                }
                KeyCode::Char('=') | KeyCode::Char('+') => {
                    player.set_volume(player.volume() + VOLUME_STEP);
                }
                KeyCode::Char('l') | KeyCode::Char('L') => {
                    player.set_loop(!player.is_looping());
                }
                _ => {}
            }
        }
    }

    true
}

fn seek_by(player: &Player, delta: f64) {
    let target = (player.current_time() + delta).clamp(0.0, player.duration());
    if let Err(err) = player.set_current_time(target) {
        error!("seek failed: {}", err);
    }
}

fn format_time(time: f64) -> String {
    let seconds = (time / 1000.0).ceil() as u32;
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    let hours = minutes / 60;
    let minutes = minutes % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::{format_time, status_text, ChunkCell, StatusArgs};

    fn args(time: f64, chunk: usize, chunk_count: usize) -> StatusArgs {
        StatusArgs {
            time,
            duration: chunk_count as f64 * 10.0,
            playing: true,
            chunk,
            chunk_count,
            chunk_duration: 10.0,
            volume: 0.8,
            looping: false,
            window_start: 0,
            cells: Vec::new(),
        }
    }

    #[test]
    fn status_shows_position_and_mix() {
        let status = status_text(args(75.0, 7, 30));
        assert!(status.text.contains("00:01:15 / 00:05:00"));
        assert!(status.text.contains("25.0%"));
        assert!(status.text.contains("Chunk 8 of 30"));
        assert!(status.text.contains("volume: 80%"));
        assert_eq!(status.chunk_ratio, 0.5);
        assert_eq!(status.chunk_label, "chunk 8/30");
    }

    #[test]
    fn ended_program_reports_the_last_chunk() {
        let status = status_text(StatusArgs {
            playing: false,
            looping: true,
            ..args(30.0, 3, 3)
        });
        assert!(status.text.contains("Chunk 3 of 3"));
        assert!(status.text.contains("loop: on"));
        assert_eq!(status.chunk_ratio, 1.0);
    }

    #[test]
    fn cache_map_marks_the_playhead_and_load_state() {
        let status = status_text(StatusArgs {
            window_start: 3,
            cells: vec![
                ChunkCell::Missing,
                ChunkCell::Ready,
                ChunkCell::Ready,
                ChunkCell::Loading,
            ],
            ..args(52.0, 5, 30)
        });
        assert_eq!(status.cache_map, "chunks 4+ ·█▶▒");
    }

    #[test]
    fn time_rounds_up_to_whole_seconds() {
        assert_eq!(format_time(3_600_500.0), "01:00:01");
    }
}
