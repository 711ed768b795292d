//! `spectrice` — the WAV-based command-line front end around the
//! [`spectrice`] engine crate. Everything here is a collaborator the core
//! deliberately stays agnostic to: RIFF/WAV I/O, PCM<->float conversion,
//! argument parsing, loop-point extraction, preset files, and progress
//! reporting.

mod smpl;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use spectrice::{FreezeConfig, FreezeSession, WindowKind};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "spectrice")]
#[command(version)]
#[command(about = "Freezes the spectral character of a sample around a freeze point, for building seamless loops")]
struct Cli {
    /// Input WAV file
    input: PathBuf,
    /// Output WAV file
    output: PathBuf,

    /// STFT block size (power of two, 16..=65536)
    #[arg(long = "blocksize", default_value_t = 8192)]
    blocksize: usize,

    /// Hops per block (power of two, >= 2)
    #[arg(long = "nhops", default_value_t = 8)]
    nhops: usize,

    /// Window shape: sine, hann, hamming, blackman, nuttall
    #[arg(long = "window", default_value = "hann")]
    window: String,

    /// Samples of crossfade before the freeze peak
    #[arg(long = "freezexfade")]
    freezexfade: Option<usize>,

    /// Freeze-peak sample position
    #[arg(long = "freezepoint")]
    freezepoint: Option<usize>,

    /// Freeze strength in [0,1]
    #[arg(long = "freezefactor", default_value_t = 1.0)]
    freezefactor: f32,

    /// Disable amplitude freezing
    #[arg(long = "nofreezeamp")]
    nofreezeamp: bool,

    /// Enable phase-step freezing
    #[arg(long = "freezephase")]
    freezephase: bool,

    /// Precaptured amplitude reference: a sample position, or `n` for the
    /// first block of the input itself
    #[arg(long = "snapshot")]
    snapshot: Option<String>,

    /// Snapshot gain, linear or e.g. `-3dB`
    #[arg(long = "snapshotgain", default_value = "0dB")]
    snapshotgain: String,

    /// Output sample format: default, pcm8, pcm16, pcm24, float32
    #[arg(long = "format", default_value = "default")]
    format: String,

    /// Load a FreezeConfig preset (JSON); CLI flags still override it
    #[arg(long = "preset-load")]
    preset_load: Option<PathBuf>,

    /// Save the resolved FreezeConfig as a JSON preset
    #[arg(long = "preset-save")]
    preset_save: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (samples, channels, sample_rate, bits_per_sample, sample_format) =
        read_wav(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;

    let config = resolve_config(&cli, channels)?;

    if let Some(path) = &cli.preset_save {
        let json = serde_json::to_string_pretty(&config).context("serializing preset")?;
        std::fs::write(path, json).with_context(|| format!("writing preset {}", path.display()))?;
    }

    let snapshot_gain = parse_gain(&cli.snapshotgain)?;
    let snapshot_block = resolve_snapshot(&cli, &samples, channels, config.block_size, snapshot_gain)?;

    let n = config.block_size;
    let c = channels as usize;

    // §4.E.4: the engine expects N priming samples per channel before any
    // output is emitted. Use the stream's own first block for that, rather
    // than silence, so the ring starts from real signal.
    let priming_len = n * c;
    let mut priming = vec![0.0f32; priming_len];
    let primed = samples.len().min(priming_len);
    priming[..primed].copy_from_slice(&samples[..primed]);

    let mut session =
        FreezeSession::init(config.clone(), Some(&priming), snapshot_block.as_deref())
            .context("initialising freeze session")?;

    let out_format = resolve_output_format(&cli.format, bits_per_sample, sample_format)?;
    let out_spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: out_format.0,
        sample_format: out_format.1,
    };
    let mut writer = WavWriter::create(&cli.output, out_spec)
        .with_context(|| format!("creating {}", cli.output.display()))?;

    let remaining = &samples[primed..];
    let remaining_frames = remaining.len() / c;
    let total_blocks = (remaining_frames + n - 1) / n;
    let mut last_report = Instant::now();

    for block in 0..total_blocks.max(1) {
        let start = block * n * c;
        let mut input_block = vec![0.0f32; n * c];
        let avail = (remaining.len().saturating_sub(start)).min(n * c);
        input_block[..avail].copy_from_slice(&remaining[start..start + avail]);

        let mut output_block = vec![0.0f32; n * c];
        session.process(&input_block, Some(&mut output_block));
        write_block(&mut writer, &output_block, out_format)?;

        if last_report.elapsed() >= Duration::from_millis(100) || block + 1 == total_blocks {
            eprint!("\rblock {}/{}", block + 1, total_blocks);
            last_report = Instant::now();
        }
    }
    eprintln!();

    writer.finalize().context("finalising output WAV")?;
    session.destroy();
    Ok(())
}

fn resolve_config(cli: &Cli, channels: u16) -> Result<FreezeConfig> {
    let mut config = if let Some(path) = &cli.preset_load {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading preset {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parsing preset {}", path.display()))?
    } else {
        FreezeConfig {
            channels: u8::try_from(channels).context("too many channels (max 255)")?,
            block_size: cli.blocksize,
            hop_count: cli.nhops,
            window: parse_window(&cli.window)?,
            freeze_start: 0,
            freeze_peak: 0,
            freeze_factor: cli.freezefactor,
            freeze_amp: !cli.nofreezeamp,
            freeze_phase: cli.freezephase,
        }
    };

    match (cli.freezepoint, cli.freezexfade) {
        (Some(point), Some(xfade)) => {
            config.freeze_peak = point;
            config.freeze_start = point.saturating_sub(xfade);
        }
        (Some(point), None) => {
            config.freeze_peak = point;
            config.freeze_start = config.freeze_start.min(point);
        }
        (None, _) => {
            if let Some(loop_region) = smpl::read_first_loop(&cli.input) {
                let loop_len = loop_region.end.saturating_sub(loop_region.start) as usize;
                let xfade = cli.freezexfade.unwrap_or(loop_len);
                config.freeze_peak = loop_region.end as usize;
                config.freeze_start = config.freeze_peak.saturating_sub(xfade);
            }
        }
    }

    if config.freeze_peak < config.block_size {
        config.freeze_peak = config.block_size;
    }
    if config.freeze_start < config.block_size {
        config.freeze_start = config.block_size;
    }
    if config.freeze_start > config.freeze_peak {
        config.freeze_start = config.freeze_peak;
    }

    Ok(config)
}

fn parse_window(s: &str) -> Result<WindowKind> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "sine" => WindowKind::Sine,
        "hann" => WindowKind::Hann,
        "hamming" => WindowKind::Hamming,
        "blackman" => WindowKind::Blackman,
        "nuttall" => WindowKind::Nuttall,
        other => bail!("unknown window kind `{}` (expected sine, hann, hamming, blackman, nuttall)", other),
    })
}

fn parse_gain(s: &str) -> Result<f32> {
    let trimmed = s.trim();
    if let Some(db) = trimmed.strip_suffix("dB").or_else(|| trimmed.strip_suffix("db")) {
        let db: f32 = db.trim().parse().with_context(|| format!("parsing gain `{}`", s))?;
        Ok(10f32.powf(db / 20.0))
    } else {
        trimmed.parse().with_context(|| format!("parsing gain `{}`", s))
    }
}

fn resolve_snapshot(
    cli: &Cli,
    samples: &[f32],
    channels: u16,
    block_size: usize,
    gain: f32,
) -> Result<Option<Vec<f32>>> {
    let Some(spec) = &cli.snapshot else { return Ok(None) };
    let c = channels as usize;
    let start_frame = if spec == "n" {
        0
    } else {
        spec.parse::<usize>().with_context(|| format!("parsing snapshot position `{}`", spec))?
    };
    let start = start_frame * c;
    let needed = block_size * c;
    let mut block = vec![0.0f32; needed];
    let avail = samples.len().saturating_sub(start).min(needed);
    if avail > 0 {
        block[..avail].copy_from_slice(&samples[start..start + avail]);
    }
    for v in block.iter_mut() {
        *v *= gain;
    }
    Ok(Some(block))
}

fn read_wav(path: &PathBuf) -> Result<(Vec<f32>, u16, u32, u16, SampleFormat)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = decode_samples(reader, spec)?;
    Ok((samples, spec.channels, spec.sample_rate, spec.bits_per_sample, spec.sample_format))
}

fn decode_samples(mut reader: WavReader<BufReader<File>>, spec: WavSpec) -> Result<Vec<f32>> {
    match spec.sample_format {
        SampleFormat::Float => {
            reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>().context("reading float samples")
        }
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            let bias = if spec.bits_per_sample == 8 { 128 } else { 0 };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v - bias) as f32 / max))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("reading integer samples")
        }
    }
}

fn resolve_output_format(
    format: &str,
    input_bits: u16,
    input_format: SampleFormat,
) -> Result<(u16, SampleFormat)> {
    Ok(match format {
        "default" => (input_bits, input_format),
        "pcm8" => (8, SampleFormat::Int),
        "pcm16" => (16, SampleFormat::Int),
        "pcm24" => (24, SampleFormat::Int),
        "float32" => (32, SampleFormat::Float),
        other => bail!("unknown output format `{}`", other),
    })
}

fn write_block(
    writer: &mut WavWriter<BufWriter<File>>,
    samples: &[f32],
    format: (u16, SampleFormat),
) -> Result<()> {
    let (bits, sample_format) = format;
    match sample_format {
        SampleFormat::Float => {
            for &s in samples {
                writer.write_sample(s)?;
            }
        }
        SampleFormat::Int => {
            let max = (1i64 << (bits - 1)) as f32 - 1.0;
            // hound stores 8-bit PCM as unsigned, offset-binary samples
            // (128 = silence); every other width is signed two's complement.
            if bits == 8 {
                for &s in samples {
                    let clamped = s.clamp(-1.0, 1.0);
                    let signed = (clamped * max) as i32;
                    writer.write_sample(signed + 128)?;
                }
            } else {
                for &s in samples {
                    let clamped = s.clamp(-1.0, 1.0);
                    writer.write_sample((clamped * max) as i32)?;
                }
            }
        }
    }
    Ok(())
}
