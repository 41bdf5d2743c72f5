use anyhow::{Context, Result, bail};
use assert_no_alloc::assert_no_alloc;
use hound::{SampleFormat, WavReader};
use log::{debug, info};
use std::path::Path;

use crate::audio::writer::{AudioBlock, BlockWriter};
use crate::eq::{ChainSettings, Equalizer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderReport {
    pub frames: u64,
    pub sample_rate: u32,
    pub input_channels: u16,
    pub input_peak: f32,
    pub output_peak: f32,
}

/// Runs `input` through a freshly prepared [`Equalizer`] and writes a stereo
/// float WAV to `output`. Mono input is fed to both channels.
pub fn render_file(
    input: &Path,
    output: &Path,
    settings: ChainSettings,
    block_size: usize,
) -> Result<RenderReport> {
    if block_size == 0 {
        bail!("block size must be non-zero");
    }

    let reader = WavReader::open(input)
        .with_context(|| format!("Failed to open WAV file {}", input.display()))?;
    let spec = reader.spec();
    let channels = spec.channels;
    if !(1..=2).contains(&channels) {
        bail!("only mono and stereo input is supported, got {channels} channels");
    }

    let samples = read_samples(reader)?;
    debug!(
        "Loaded {} frames at {} Hz from {}",
        samples.len() / channels as usize,
        spec.sample_rate,
        input.display()
    );

    let (mut eq, _handle) = Equalizer::new(settings);
    eq.prepare(spec.sample_rate as f32, block_size)?;

    let writer = BlockWriter::new(output, spec.sample_rate)?;
    let tx = writer.sender();
    info!("Writing {}", writer.path().display());

    let mut left = vec![0.0f32; block_size];
    let mut right = vec![0.0f32; block_size];
    let mut input_peak = 0.0f32;
    let mut output_peak = 0.0f32;

    for chunk in samples.chunks(block_size * channels as usize) {
        let frames = chunk.len() / channels as usize;
        let (l, r) = (&mut left[..frames], &mut right[..frames]);
        deinterleave(chunk, channels, l, r);
        input_peak = input_peak.max(peak(l)).max(peak(r));

        assert_no_alloc(|| eq.process_block(l, r));

        output_peak = output_peak.max(peak(l)).max(peak(r));
        let block: AudioBlock = l.iter().zip(r.iter()).flat_map(|(&a, &b)| [a, b]).collect();
        tx.send(block).context("Writer thread stopped early")?;
    }

    drop(tx);
    let frames = writer.finish()?;
    info!(
        "Rendered {frames} frames: peak {:.1} dBFS in, {:.1} dBFS out",
        to_db(input_peak),
        to_db(output_peak)
    );

    Ok(RenderReport {
        frames,
        sample_rate: spec.sample_rate,
        input_channels: channels,
        input_peak,
        output_peak,
    })
}

fn read_samples(reader: WavReader<std::io::BufReader<std::fs::File>>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    if spec.sample_format == SampleFormat::Float {
        reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float samples")
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / max_val))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read integer samples")
    }
}

fn deinterleave(chunk: &[f32], channels: u16, left: &mut [f32], right: &mut [f32]) {
    if channels == 1 {
        left.copy_from_slice(chunk);
        right.copy_from_slice(chunk);
        return;
    }

    for ((frame, l), r) in chunk.chunks_exact(2).zip(left.iter_mut()).zip(right.iter_mut()) {
        *l = frame[0];
        *r = frame[1];
    }
}

fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0f32, |m, &x| m.max(x.abs()))
}

fn to_db(level: f32) -> f32 {
    20.0 * level.max(1e-10).log10()
}
