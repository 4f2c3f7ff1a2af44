//! ringmix CLI: play WAV files together or mix them down offline.
//!
//! Usage:
//!   rm-cli a.wav b.wav
//!   rm-cli a.wav b.wav --wav mix.wav --seconds 10
//!   rm-cli a.wav --config mixer.toml --volume 0.5

use clap::Parser;
use rm_master::{
    decode_wav, frames_to_wav, AudioChunk, CpalDevice, Frame, MemoryDevice, Mixer, MixerConfig,
    SoundDevice, SoundHandle,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{fs, process};

/// Longest offline render when `--seconds` is not given.
const MAX_RENDER_SECONDS: f64 = 300.0;

/// Distance between play and write cursor of the offline ring.
const OFFLINE_COMMIT_GAP: Duration = Duration::from_millis(15);

#[derive(Parser, Debug)]
#[command(name = "rm-cli", about = "Play WAV files through the ringmix mixer")]
struct Args {
    /// WAV files, all played at the same time
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Render offline into this WAV file instead of playing
    #[arg(long, value_name = "FILE")]
    wav: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long, value_parser = parse_seconds)]
    seconds: Option<f64>,

    /// Master volume, 0 to 1
    #[arg(long, default_value_t = 1.0)]
    volume: f32,

    /// Mixer configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output sample rate, overrides the configuration file
    #[arg(long)]
    sample_rate: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let config = load_config(&args);
    log::debug!("mixer config: {:?}", config);

    match &args.wav {
        Some(out) => render_to_wav(&args, config, out),
        None => play_audio(&args, config),
    }
}

/// Accept a finite, non-negative number of seconds.
fn parse_seconds(s: &str) -> Result<f64, String> {
    let seconds: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(format!("expected a non-negative number of seconds, got {}", s))
    }
}

fn fail(msg: String) -> ! {
    eprintln!("{}", msg);
    process::exit(1);
}

fn load_config(args: &Args) -> MixerConfig {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).unwrap_or_else(|e| {
                fail(format!("Failed to read {}: {}", path.display(), e))
            });
            toml::from_str(&text).unwrap_or_else(|e| {
                fail(format!("Invalid config {}: {}", path.display(), e))
            })
        }
        None => MixerConfig::default(),
    };
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    config
}

/// Decode every file, print its chunks and convert it to the mixer's rate.
fn load_sounds<D>(mixer: &Mixer<D>, files: &[PathBuf]) -> Vec<AudioChunk>
where
    D: SoundDevice + 'static,
{
    files
        .iter()
        .map(|path| {
            let data = fs::read(path)
                .unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path.display(), e)));
            let chunks = decode_wav(&data)
                .unwrap_or_else(|e| fail(format!("Failed to decode {}: {}", path.display(), e)));

            println!("{}", path.display());
            for (i, chunk) in chunks.iter().enumerate() {
                println!("  chunk {}: {}", i, chunk);
            }

            mixer
                .load(&chunks)
                .unwrap_or_else(|e| fail(format!("Cannot play {}: {}", path.display(), e)))
        })
        .collect()
}

fn play_all<D>(mixer: &Mixer<D>, sounds: Vec<AudioChunk>) -> Vec<SoundHandle>
where
    D: SoundDevice + 'static,
{
    sounds.into_iter().map(|audio| mixer.play_audio(audio)).collect()
}

fn play_audio(args: &Args, config: MixerConfig) {
    let mut mixer = Mixer::new(CpalDevice::new(), config)
        .unwrap_or_else(|e| fail(format!("Failed to open audio device: {}", e)));
    mixer.set_master_volume(args.volume);

    let sounds = load_sounds(&mixer, &args.files);
    let handles = play_all(&mixer, sounds);
    let longest = handles.iter().map(|h| h.length()).max().unwrap_or_default();

    mixer
        .start()
        .unwrap_or_else(|e| fail(format!("Failed to start mixer: {}", e)));
    println!("Playing...");
    println!();

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs_f64(s));
    while mixer.is_running()
        && handles.iter().any(|h| h.playing())
        && deadline.map_or(true, |d| Instant::now() < d)
    {
        let position = handles.iter().map(|h| h.position()).max().unwrap_or_default();
        print!(
            "\r{:>7.2}s / {:.2}s",
            position.as_secs_f64(),
            longest.as_secs_f64()
        );
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(50));
    }

    // Let the committed part of the ring play out.
    std::thread::sleep(mixer.config().look_ahead);

    match mixer.stop() {
        Ok(()) => println!("\rDone.                  "),
        Err(e) => fail(format!("\rPlayback failed: {}", e)),
    }
}

fn render_to_wav(args: &Args, config: MixerConfig, path: &Path) {
    let rate = config.sample_rate as usize;
    let tick_bytes = frame_bytes(config.tick_interval, rate);
    let gap_bytes = frame_bytes(OFFLINE_COMMIT_GAP, rate);
    let max_bytes = frame_bytes(
        Duration::from_secs_f64(args.seconds.unwrap_or(MAX_RENDER_SECONDS)),
        rate,
    );

    // Two seconds of ring, like a hardware device.
    let device = MemoryDevice::new(rate * 4 * 2, gap_bytes);
    let ring = device.clone();
    let mut mixer = Mixer::new(device, config)
        .unwrap_or_else(|e| fail(format!("Failed to set up mixer: {}", e)));
    mixer.set_master_volume(args.volume);

    let sounds = load_sounds(&mixer, &args.files);
    let handles = play_all(&mixer, sounds);

    println!("Rendering to {} at {} Hz...", path.display(), rate);
    mixer
        .start_polled()
        .unwrap_or_else(|e| fail(format!("Failed to start mixer: {}", e)));

    let mut captured = Vec::new();
    while captured.len() < max_bytes && handles.iter().any(|h| h.playing()) {
        captured.extend(ring.advance(tick_bytes));
        mixer
            .poll()
            .unwrap_or_else(|e| fail(format!("Render failed: {}", e)));
    }
    // The committed region still holds the tail of the mix.
    captured.extend(ring.advance(gap_bytes));
    captured.truncate(max_bytes);

    if let Err(e) = mixer.close() {
        fail(format!("Render failed: {}", e));
    }

    let frames = Frame::decode_all(&captured);
    let wav = frames_to_wav(&frames, rate as u32);
    println!("Rendered {} frames ({} bytes)", frames.len(), wav.len());

    fs::write(path, &wav)
        .unwrap_or_else(|e| fail(format!("Failed to write {}: {}", path.display(), e)));
    println!("Done.");
}

/// Whole-frame byte count of `duration` at `rate`, at least one frame.
fn frame_bytes(duration: Duration, rate: usize) -> usize {
    let frames = (duration.as_secs_f64() * rate as f64).round() as usize;
    frames.max(1) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_must_be_finite_and_non_negative() {
        assert_eq!(parse_seconds("2.5"), Ok(2.5));
        assert_eq!(parse_seconds("0"), Ok(0.0));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("NaN").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn rejected_seconds_fail_argument_parsing() {
        assert!(Args::try_parse_from(["rm-cli", "a.wav", "--seconds", "-3"]).is_err());
        let args = Args::try_parse_from(["rm-cli", "a.wav", "--seconds", "3"]).unwrap();
        assert_eq!(args.seconds, Some(3.0));
    }
}
