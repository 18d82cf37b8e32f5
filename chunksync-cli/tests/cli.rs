use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_chunk(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (8_000.0 * seconds) as usize;
    for frame in 0..frames {
        let sample = ((frame as f32 * 0.05).sin() * 8_000.0) as i16;
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn chunksync() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("chunksync"))
}

#[test]
fn print_config_outputs_a_default_program() {
    chunksync()
        .arg("print-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"track_count\""))
        .stdout(predicate::str::contains("\"loop\": false"))
        .stdout(predicate::str::contains("{track}-chunk-{chunk}"));
}

#[test]
fn missing_config_file_fails() {
    chunksync()
        .args(["/definitely/not/here/program.json", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn invalid_program_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("program.json");
    std::fs::write(&config, r#"{"track_count": 0, "chunk_count": 2}"#).unwrap();

    chunksync()
        .arg(&config)
        .arg("--offline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("track_count"));
}

/// Write 2x2 half-second chunks and a program over them with `extra` merged in.
fn write_program(dir: &Path, extra: serde_json::Value) -> std::path::PathBuf {
    for track in 0..2 {
        for chunk in 0..2 {
            write_chunk(
                &dir.join(format!("track-{}-chunk-{}.wav", track, chunk)),
                0.5,
            );
        }
    }

    let pattern = dir.join("track-{track}-chunk-{chunk}.wav");
    let mut json = serde_json::json!({
        "track_count": 2,
        "chunk_count": 2,
        "chunk_duration": 0.5,
        "src": pattern.to_string_lossy(),
    });
    if let (Some(program), Some(extra)) = (json.as_object_mut(), extra.as_object()) {
        program.extend(extra.clone());
    }

    let config = dir.join("program.json");
    std::fs::write(&config, json.to_string()).unwrap();
    config
}

#[test]
fn offline_run_plays_every_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_program(dir.path(), serde_json::json!({ "volume": 0.25 }));

    chunksync()
        .arg(&config)
        .args(["--offline", "--gain", "50", "--track-pan", "1=-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("volume 0.50, loop off"))
        .stdout(predicate::str::contains("chunkchange 0.500"))
        .stdout(predicate::str::contains("ended 1.000"));
}

#[test]
fn program_settings_apply_without_flags() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_program(
        dir.path(),
        serde_json::json!({ "volume": 0.5, "loop": true, "track_volumes": [0.5, 0.25] }),
    );

    chunksync()
        .arg(&config)
        .arg("--offline")
        .assert()
        .success()
        .stdout(predicate::str::contains("volume 0.50, loop on"))
        .stdout(predicate::str::contains("chunkchange 0.500"))
        .stdout(predicate::str::contains("chunkchange 0.000"))
        .stdout(predicate::str::contains("ended").not());
}

#[test]
fn offline_run_with_bad_track_setting_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("program.json");
    std::fs::write(&config, r#"{"track_count": 1, "chunk_count": 1}"#).unwrap();

    chunksync()
        .arg(&config)
        .args(["--offline", "--track-volume", "3=0.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("track index 3"));
}
