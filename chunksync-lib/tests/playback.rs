use std::sync::{Arc, Mutex};
use std::time::Duration;

use chunksync_lib::{
    ChunkBuffer, ChunkFetcher, FetchError, OfflineOutput, Player, PlayerError, PlayerState,
    ProgramConfig,
};

const WAIT: Duration = Duration::from_secs(5);

fn config(track_count: usize, chunk_count: usize, looping: bool) -> ProgramConfig {
    ProgramConfig {
        track_count,
        chunk_count,
        chunk_duration: 10.0,
        looping,
        ..ProgramConfig::default()
    }
}

fn silent_fetcher(seconds: f64) -> Arc<dyn ChunkFetcher> {
    Arc::new(move |_url: &str| Ok::<_, FetchError>(ChunkBuffer::silence(100, 1, seconds)))
}

fn player(config: ProgramConfig) -> (Player, OfflineOutput) {
    let output = OfflineOutput::new();
    let player = Player::new(config, Arc::new(output.clone()), silent_fetcher(10.0)).unwrap();
    (player, output)
}

fn record(player: &Player, name: &str) -> Arc<Mutex<Vec<f64>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    player
        .add_event(name, move |time| sink.lock().unwrap().push(time))
        .unwrap();
    seen
}

#[test]
fn chunks_advance_then_end_once() {
    let (player, output) = player(config(2, 3, false));
    let changes = record(&player, "chunkchange");
    let ended = record(&player, "ended");

    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));
    assert_eq!(output.active_voices().len(), 2);

    output.advance(10.0);
    assert_eq!(player.current_chunk(), 1);
    assert_eq!(*changes.lock().unwrap(), vec![10.0]);

    assert!(player.wait_for_audio(WAIT));
    output.advance(10.0);
    assert_eq!(player.current_chunk(), 2);

    assert!(player.wait_for_audio(WAIT));
    output.advance(10.0);

    assert_eq!(*ended.lock().unwrap(), vec![30.0]);
    assert!(player.is_paused());
    assert!(player.is_ended());
    assert_eq!(player.current_time(), 30.0);

    output.advance(10.0);
    assert_eq!(ended.lock().unwrap().len(), 1);
    assert_eq!(changes.lock().unwrap().len(), 2);
}

#[test]
fn looping_wraps_to_the_first_chunk() {
    let (player, output) = player(config(2, 3, true));
    let changes = record(&player, "chunkchange");
    let ended = record(&player, "ended");

    player.play().unwrap();
    for _ in 0..3 {
        assert!(player.wait_for_audio(WAIT));
        output.advance(10.0);
    }

    assert_eq!(player.current_chunk(), 0);
    assert!(player.is_playing());
    assert!(ended.lock().unwrap().is_empty());
    assert_eq!(*changes.lock().unwrap(), vec![10.0, 20.0, 0.0]);
    assert!(player.wait_for_audio(WAIT));
    assert_eq!(player.current_time(), 0.0);
}

#[test]
fn time_is_continuous_across_a_chunk_boundary() {
    let (player, output) = player(config(1, 3, false));
    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));

    output.advance(4.0);
    assert_eq!(player.current_time(), 4.0);
    output.advance(6.0);
    assert_eq!(player.current_time(), 10.0);
    assert!(player.wait_for_audio(WAIT));
    assert_eq!(player.current_time(), 10.0);
    output.advance(0.5);
    assert_eq!(player.current_time(), 10.5);
}

#[test]
fn pause_then_play_resumes_at_the_paused_offset() {
    let (player, output) = player(config(2, 3, false));
    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));

    output.advance(3.0);
    player.pause();
    assert_eq!(player.state(), PlayerState::Idle);
    assert_eq!(player.current_time(), 3.0);
    assert!(output.active_voices().is_empty());

    output.advance(5.0);
    assert_eq!(player.current_time(), 3.0);

    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));
    assert_eq!(player.current_time(), 3.0);

    let voices = output.active_voices();
    assert_eq!(voices.len(), 2);
    assert!(voices.iter().all(|voice| voice.offset == 3.0));
    assert_eq!(voices[0].start_at, voices[1].start_at);

    output.advance(1.0);
    assert_eq!(player.current_time(), 4.0);
}

#[test]
fn seek_while_paused_reads_back_exactly() {
    let (player, _output) = player(config(2, 5, false));
    for target in [17.3, 0.0, 9.99, 42.125] {
        player.set_current_time(target).unwrap();
        assert_eq!(player.current_time(), target);
    }
    assert_eq!(player.current_chunk(), 4);
    assert_eq!(player.fetch_requests(), 0);
}

#[test]
fn seek_is_clamped_and_rejects_non_finite_targets() {
    let (player, _output) = player(config(1, 3, false));
    player.set_current_time(-4.0).unwrap();
    assert_eq!(player.current_time(), 0.0);

    assert!(matches!(
        player.set_current_time(f64::NAN),
        Err(PlayerError::InvalidSeek(_))
    ));
    assert!(matches!(
        player.set_current_time(f64::INFINITY),
        Err(PlayerError::InvalidSeek(_))
    ));

    player.set_current_time(99.0).unwrap();
    assert!(player.is_ended());
    assert_eq!(player.current_time(), 30.0);
    player.play().unwrap();
    assert!(player.is_ended());

    player.set_current_time(5.0).unwrap();
    assert_eq!(player.state(), PlayerState::Idle);
}

#[test]
fn seek_while_playing_restarts_at_the_target() {
    let (player, output) = player(config(2, 4, false));
    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));
    output.advance(2.0);

    player.set_current_time(25.0).unwrap();
    assert_eq!(player.current_time(), 25.0);
    assert!(player.wait_for_audio(WAIT));
    assert_eq!(player.current_chunk(), 2);

    let voices = output.active_voices();
    assert_eq!(voices.len(), 2);
    assert!(voices.iter().all(|voice| voice.offset == 5.0));

    output.advance(1.0);
    assert_eq!(player.current_time(), 26.0);
}

#[test]
fn seek_to_the_end_while_playing_ends_playback() {
    let (player, output) = player(config(1, 2, false));
    let ended = record(&player, "ended");
    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));

    player.set_current_time(20.0).unwrap();
    assert!(player.is_ended());
    assert!(output.active_voices().is_empty());
    assert_eq!(*ended.lock().unwrap(), vec![20.0]);
}

#[test]
fn redundant_transport_calls_are_no_ops() {
    let (player, _output) = player(config(1, 2, false));
    let plays = record(&player, "play");
    let pauses = record(&player, "pause");

    player.pause();
    player.play().unwrap();
    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));
    player.pause();
    player.pause();

    assert_eq!(plays.lock().unwrap().len(), 1);
    assert_eq!(pauses.lock().unwrap().len(), 1);
}

#[test]
fn output_failure_leaves_the_player_idle() {
    let output = OfflineOutput::new();
    output.fail_resume(Some("no device"));
    let player = Player::new(config(2, 2, false), Arc::new(output.clone()), silent_fetcher(10.0))
        .unwrap();

    assert_eq!(
        player.play(),
        Err(PlayerError::OutputUnavailable("no device".to_string()))
    );
    assert_eq!(player.state(), PlayerState::Idle);
    assert_eq!(player.fetch_requests(), 0);

    output.fail_resume(None);
    player.play().unwrap();
    assert!(player.is_playing());
    assert!(output.is_resumed());
}

#[test]
fn timeupdate_fires_while_playing_only() {
    let output = OfflineOutput::new();
    let player = Player::new(
        ProgramConfig {
            timeupdate_hz: 100.0,
            ..config(1, 2, false)
        },
        Arc::new(output.clone()),
        silent_fetcher(10.0),
    )
    .unwrap();
    let updates = record(&player, "timeupdate");

    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));
    output.advance(1.5);
    std::thread::sleep(Duration::from_millis(150));
    assert!(!updates.lock().unwrap().is_empty());
    assert!(updates.lock().unwrap().iter().any(|time| *time == 1.5));

    player.pause();
    std::thread::sleep(Duration::from_millis(30));
    let after_pause = updates.lock().unwrap().len();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(updates.lock().unwrap().len(), after_pause);
}

#[test]
fn event_names_are_validated_and_removable() {
    let (player, _output) = player(config(1, 2, false));
    assert!(matches!(
        player.add_event("seeked", |_| {}),
        Err(PlayerError::UnknownEvent(_))
    ));

    let hits = Arc::new(Mutex::new(0));
    let counter = hits.clone();
    let id = player
        .add_event("play", move |_| *counter.lock().unwrap() += 1)
        .unwrap();
    assert_eq!(player.remove_event("play", id), Ok(true));
    assert_eq!(player.remove_event("play", id), Ok(false));

    player.play().unwrap();
    assert_eq!(*hits.lock().unwrap(), 0);
}

#[test]
fn initial_position_comes_from_config() {
    let output = OfflineOutput::new();
    let player = Player::new(
        ProgramConfig {
            current_time: 12.0,
            ..config(2, 3, false)
        },
        Arc::new(output.clone()),
        silent_fetcher(10.0),
    )
    .unwrap();

    assert_eq!(player.current_chunk(), 1);
    assert_eq!(player.current_time(), 12.0);

    player.play().unwrap();
    assert!(player.wait_for_audio(WAIT));
    assert!(output.active_voices().iter().all(|voice| voice.offset == 2.0));
}
