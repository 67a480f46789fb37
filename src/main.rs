mod engine;

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::engine::config::PlayerConfig;
use crate::engine::engine::AudioEngine;
use crate::engine::error::PlayerError;
use crate::engine::output::cpal_backend::CpalBackend;
use crate::engine::output::AudioBackend;

const USAGE: &str = "\
Plays an audio file.
Usage: raw_audio_player <audio-file>
The file must contain raw audio data:
  * With Signed 16-bit PCM encoding,
  * In Little-endian byte order,
  * Has one channel, and
  * Has sample rate of 44100 Hz.
";

#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Raw S16LE mono 44100 Hz audio file
    #[arg(allow_hyphen_values = true)]
    audio_file: PathBuf,
}

impl Cli {
    /// Takes the single argument as a path, whatever it looks like.
    ///
    /// The argument is placed after `--` so names such as `-h`, `-song.raw`
    /// or `--` itself are never read as options.
    fn from_path_arg(program: OsString, arg: OsString) -> Self {
        Cli::try_parse_from([program, OsString::from("--"), arg.clone()])
            .unwrap_or_else(|_| Cli { audio_file: PathBuf::from(arg) })
    }
}

fn main() -> ExitCode {
    init_tracing();
    run(
        std::env::args_os(),
        CpalBackend::new(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )
}

/// Runs the player for a full argument list (program name included).
///
/// Anything other than exactly one argument prints the usage text to `out`
/// and succeeds. Playback errors go to `err` and fail.
fn run<B: AudioBackend>(
    args: impl IntoIterator<Item = OsString>,
    backend: B,
    out: &mut impl Write,
    err: &mut impl Write,
) -> ExitCode {
    let args: Vec<OsString> = args.into_iter().collect();
    let [program, arg] = match <[OsString; 2]>::try_from(args) {
        Ok(pair) => pair,
        Err(_) => {
            let _ = write!(out, "{USAGE}");
            let _ = out.flush();
            return ExitCode::SUCCESS;
        }
    };
    let cli = Cli::from_path_arg(program, arg);

    let engine = AudioEngine::new(backend, PlayerConfig::default());
    match engine.play(&cli.audio_file) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if let PlayerError::Backend { code, .. } = &e {
                debug!(code = code.raw(), "audio backend failure");
            }
            let _ = writeln!(err, "{e}");
            let _ = err.flush();
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    // Only errors by default so stderr carries the single diagnostic line.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
