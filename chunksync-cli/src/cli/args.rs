//! CLI argument definitions for `chunksync`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("chunksync")
        .version("0.1")
        .about("Play chunked multi-track audio programs")
        .arg_required_else_help(true)
        .subcommand_negates_reqs(true)
        .arg(
            Arg::new("CONFIG")
                .help("Path to a JSON program description")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("src")
                .long("src")
                .value_name("SOURCE")
                .help("Chunk source: a base URL, or a pattern with {track} and {chunk}"),
        )
        .arg(
            Arg::new("seek")
                .long("seek")
                .short('s')
                .value_name("TIME")
                .help("Seek to the given time in seconds before playing"),
        )
        .arg(
            Arg::new("GAIN")
                .long("gain")
                .short('g')
                .value_name("GAIN")
                .help("The playback gain in percent; overrides the program's volume"),
        )
        .arg(
            Arg::new("loop")
                .long("loop")
                .short('l')
                .action(ArgAction::SetTrue)
                .help("Wrap to the start when the program ends"),
        )
        .arg(
            Arg::new("track-volume")
                .long("track-volume")
                .value_name("INDEX=VALUE")
                .action(ArgAction::Append)
                .help("Set one track's volume (0.0-1.0); repeatable"),
        )
        .arg(
            Arg::new("track-pan")
                .long("track-pan")
                .value_name("INDEX=VALUE")
                .action(ArgAction::Append)
                .help("Set one track's pan (-1.0-1.0); repeatable"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .action(ArgAction::SetTrue)
                .help("Run against a virtual clock instead of the sound card"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Suppress all console output"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Show debug output"),
        )
        .subcommand(
            Command::new("print-config").about("Print a default program description as JSON"),
        )
}
