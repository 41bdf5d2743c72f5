use anyhow::{Result, bail};
use clap::Parser;
use eqchain::audio::{render_file, timestamped_output};
use eqchain::eq::design::design;
use eqchain::eq::{ChainSettings, MonoChain, Slope, parameter_layout};
use eqchain::settings::Settings;
use log::info;
use std::path::{Path, PathBuf};

#[cfg(debug_assertions)]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

/// ISO octave centres plus the band edges.
const RESPONSE_FREQUENCIES: [f32; 12] = [
    20.0, 31.5, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16_000.0, 20_000.0,
];

#[derive(Parser, Debug)]
#[command(name = "eqchain")]
#[command(author = "OpenSauce")]
#[command(version)]
#[command(about = "A stereo low cut / peak / high cut equalizer for WAV files.")]
struct Args {
    #[arg(help = "WAV file to process")]
    input: Option<PathBuf>,
    #[arg(short, long, help = "Output WAV path (default: timestamped file in the output dir)")]
    output: Option<PathBuf>,
    #[arg(long, env = "EQCHAIN_OUTPUT_DIR", help = "Directory for timestamped renders")]
    output_dir: Option<String>,
    #[arg(long, env = "EQCHAIN_BLOCK_SIZE", help = "Frames per processing block")]
    block_size: Option<usize>,

    #[arg(long, env = "EQCHAIN_LOW_CUT", help = "Low cut frequency in Hz")]
    low_cut: Option<f32>,
    #[arg(long, value_enum, help = "Low cut slope")]
    low_cut_slope: Option<Slope>,
    #[arg(long, env = "EQCHAIN_HIGH_CUT", help = "High cut frequency in Hz")]
    high_cut: Option<f32>,
    #[arg(long, value_enum, help = "High cut slope")]
    high_cut_slope: Option<Slope>,
    #[arg(long, env = "EQCHAIN_PEAK_FREQ", help = "Peak centre frequency in Hz")]
    peak_freq: Option<f32>,
    #[arg(long, env = "EQCHAIN_PEAK_GAIN", allow_hyphen_values = true, help = "Peak gain in dB")]
    peak_gain: Option<f32>,
    #[arg(long, env = "EQCHAIN_PEAK_Q", help = "Peak quality")]
    peak_q: Option<f32>,

    #[arg(long, help = "Print the magnitude response instead of (or before) rendering")]
    response: bool,
    #[arg(long, default_value_t = 48_000.0, help = "Sample rate used for --response")]
    sample_rate: f32,
    #[arg(long, help = "Store the resulting settings as the new defaults")]
    save: bool,
    #[arg(long, help = "List the exposed parameters with their ranges and defaults")]
    list_params: bool,
}

impl Args {
    fn apply_overrides(&self, settings: &mut Settings) {
        let eq = &mut settings.eq;
        if let Some(v) = self.low_cut {
            eq.low_cut_freq = v;
        }
        if let Some(v) = self.low_cut_slope {
            eq.low_cut_slope = v;
        }
        if let Some(v) = self.high_cut {
            eq.high_cut_freq = v;
        }
        if let Some(v) = self.high_cut_slope {
            eq.high_cut_slope = v;
        }
        if let Some(v) = self.peak_freq {
            eq.peak_freq = v;
        }
        if let Some(v) = self.peak_gain {
            eq.peak_gain_db = v;
        }
        if let Some(v) = self.peak_q {
            eq.peak_quality = v;
        }
        *eq = eq.clamped();

        if let Some(size) = self.block_size {
            settings.render.block_size = size;
        }
        if let Some(dir) = &self.output_dir {
            settings.render.output_dir.clone_from(dir);
        }
    }
}

fn print_response(settings: &ChainSettings, sample_rate: f32) -> Result<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        bail!("sample rate must be positive, got {sample_rate}");
    }

    let mut chain = MonoChain::new();
    chain.apply(&design(settings, sample_rate), settings);

    println!("Response at {sample_rate} Hz:");
    for freq in RESPONSE_FREQUENCIES {
        if freq >= sample_rate / 2.0 {
            break;
        }
        println!("{freq:>8.1} Hz  {:>7.2} dB", chain.magnitude_db(freq, sample_rate));
    }
    Ok(())
}

fn print_parameters() {
    for spec in parameter_layout() {
        let range = spec.range;
        match spec.choices {
            Some(choices) => println!(
                "{:<14} {} (default {})",
                spec.name(),
                choices.join(" | "),
                choices.get(spec.default as usize).unwrap_or(&"?")
            ),
            None => println!(
                "{:<14} {} .. {} step {} skew {} (default {})",
                spec.name(),
                range.min,
                range.max,
                range.step,
                range.skew,
                spec.default
            ),
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    info!("eqchain v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {:?}", args);

    let mut settings = Settings::load()?;
    args.apply_overrides(&mut settings);
    info!("{settings}");

    if args.save {
        settings.save()?;
    }

    if args.list_params {
        print_parameters();
    }
    if args.response {
        print_response(&settings.eq, args.sample_rate)?;
    }

    let Some(input) = &args.input else {
        if args.response || args.save || args.list_params {
            return Ok(());
        }
        bail!("no input file given (pass a WAV path, or --response to inspect settings)");
    };

    let output = args.output.clone().unwrap_or_else(|| {
        timestamped_output(Path::new(&settings.render.output_dir), input)
    });
    info!("Rendering {} -> {}", input.display(), output.display());

    let report = render_file(input, &output, settings.eq, settings.render.block_size)?;
    info!(
        "Done: {} frames at {} Hz ({} input channel(s))",
        report.frames, report.sample_rate, report.input_channels
    );

    Ok(())
}
