use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{Receiver, Sender, bounded};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{error, info};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;

/// Interleaved stereo frames.
pub type AudioBlock = Vec<f32>;
const BLOCK_CHANNEL_CAPACITY: usize = 32;

/// Streams processed blocks to a 32-bit float stereo WAV on its own thread.
pub struct BlockWriter {
    tx: Sender<AudioBlock>,
    handle: thread::JoinHandle<Result<u64>>,
    path: PathBuf,
}

impl BlockWriter {
    /// Creates the output file up front so open errors surface here rather
    /// than on the writer thread.
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create output directory")?;
        }

        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file {}", path.display()))?;

        let (tx, rx) = bounded::<AudioBlock>(BLOCK_CHANNEL_CAPACITY);
        let path = path.to_path_buf();
        let thread_path = path.clone();
        let handle = thread::spawn(move || run_writer_thread(writer, &thread_path, rx));

        Ok(Self { tx, handle, path })
    }

    /// Returns a clone of the sender for sending audio blocks.
    pub fn sender(&self) -> Sender<AudioBlock> {
        self.tx.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the channel and waits for the file to be finalized.
    /// Returns the number of frames written.
    pub fn finish(self) -> Result<u64> {
        drop(self.tx);
        self.handle
            .join()
            .map_err(|e| anyhow!("Writer thread panicked (join failed): {e:?}"))?
    }
}

fn run_writer_thread(
    mut writer: WavWriter<BufWriter<File>>,
    path: &Path,
    rx: Receiver<AudioBlock>,
) -> Result<u64> {
    let mut samples = 0u64;

    for block in rx {
        for &sample in &block {
            if let Err(e) = writer.write_sample(sample) {
                error!("Failed to write sample to {}: {e}", path.display());
                return Err(e).context("Failed to write sample");
            }
        }
        samples += block.len() as u64;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    info!("Rendered audio saved: {}", path.display());

    Ok(samples / 2)
}

/// `<dir>/eq_<stem>_<timestamp>.wav`, used when no output path is given.
pub fn timestamped_output(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("render");
    dir.join(format!(
        "eq_{stem}_{}.wav",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}
