//! # CLI Module
//!
//! Command-line interface for the motion detector.
//!
//! ## Usage
//! ```bash
//! # Compare two snapshots (exit 0 = no motion, 1 = motion, 2 = error)
//! frame-motion compare prev.jpg curr.jpg
//!
//! # Cheaper: quarter-scale decode, every second pixel
//! frame-motion compare prev.jpg curr.jpg --mode quarter -s 2
//!
//! # File-size pre-screen only, 5% threshold
//! frame-motion compare prev.jpg curr.jpg -f
//!
//! # Size check, then quarter scale, then full resolution
//! frame-motion cascade prev.jpg curr.jpg
//!
//! # Every consecutive pair in a directory
//! frame-motion batch /var/spool/snapshots --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use frame_motion::core::batch::{BatchReport, BatchRunner, FrameFilter};
use frame_motion::core::params::{ChannelMode, DecodeMode, MotionParameters, Smoothing};
use frame_motion::core::pipeline::{
    Cascade, CascadeResult, ComparisonResult, Decision, MotionDetector,
};
use frame_motion::error::Result;
use frame_motion::events::{BatchEvent, Event, EventChannel, PipelineEvent};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;

/// Two-frame motion detection for surveillance snapshots
#[derive(Parser, Debug)]
#[command(name = "frame-motion")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two frames
    Compare {
        first: PathBuf,
        second: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        report: ReportArgs,

        /// Print load and compute timings
        #[arg(long)]
        benchmark: bool,
    },

    /// File-size gate, then reduced-fidelity, then full-resolution comparison
    Cascade {
        first: PathBuf,
        second: PathBuf,

        /// File-size change (%) that lets the cascade continue
        #[arg(long, default_value = "5.0")]
        size_threshold: f64,

        /// Decode mode of the middle stage
        #[arg(long, default_value = "quarter")]
        reduced_mode: Mode,

        /// Sampling stride of the middle stage
        #[arg(long, default_value = "2", allow_negative_numbers = true)]
        reduced_stride: i64,

        /// Per-pixel sensitivity (0-255)
        #[arg(short = 't', long, default_value = "25", allow_negative_numbers = true)]
        threshold: i64,

        /// Percentage of changed pixels that counts as motion
        #[arg(short = 'm', long, default_value = "1.0", allow_negative_numbers = true)]
        motion_threshold: f64,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Compare every consecutive pair of frames in a directory
    Batch {
        directory: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,

        #[command(flatten)]
        report: ReportArgs,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,
    },
}

/// Flags that map onto `MotionParameters`
#[derive(Args, Debug, Clone)]
struct DetectionArgs {
    /// Per-pixel sensitivity (0-255); a pixel changes when the difference
    /// is strictly greater
    #[arg(short = 't', long, default_value = "25", allow_negative_numbers = true)]
    threshold: i64,

    /// Sample every Nth pixel on each axis
    #[arg(short = 's', long, default_value = "1", allow_negative_numbers = true)]
    stride: i64,

    /// Percentage of changed pixels that counts as motion
    #[arg(short = 'm', long, default_value = "1.0", allow_negative_numbers = true)]
    motion_threshold: f64,

    /// Compare file sizes only, with an optional threshold percentage
    #[arg(short = 'f', long, num_args = 0..=1, default_missing_value = "5.0")]
    file_size: Option<f64>,

    /// Treat a pixel as changed if any channel changed
    #[arg(long)]
    per_channel: bool,

    /// Smooth both frames before comparing
    #[arg(short = 'b', long)]
    blur: bool,

    /// Smoothing kernel used with --blur
    #[arg(long, default_value = "gaussian")]
    blur_kernel: BlurKernel,

    /// Decode fidelity
    #[arg(long, default_value = "full")]
    mode: Mode,

    /// Shortcut for --mode dc
    #[arg(short = 'd', long)]
    dc: bool,

    /// DC-only decode; fail instead of falling back on incompatible JPEGs
    #[arg(long)]
    dc_strict: bool,
}

impl DetectionArgs {
    fn parameters(&self) -> MotionParameters {
        let decode_mode = if self.dc || self.dc_strict {
            DecodeMode::DcOnly
        } else {
            self.mode.into()
        };
        let smoothing = if self.blur {
            self.blur_kernel.into()
        } else {
            Smoothing::Off
        };
        let channel_mode = if self.per_channel {
            ChannelMode::PerChannel
        } else {
            ChannelMode::FusedLuminance
        };

        let mut builder = MotionParameters::builder()
            .pixel_threshold(self.threshold)
            .spatial_stride(self.stride)
            .motion_percent_threshold(self.motion_threshold)
            .channel_mode(channel_mode)
            .smoothing(smoothing)
            .decode_mode(decode_mode)
            .strict_dc(self.dc_strict);
        if let Some(percent) = self.file_size {
            builder = builder
                .file_size_only(true)
                .file_size_threshold_percent(percent);
        }
        builder.build()
    }
}

#[derive(Args, Debug, Clone)]
struct ReportArgs {
    /// Output format
    #[arg(short, long, default_value = "minimal")]
    output: OutputFormat,

    /// Print parameters and details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Full,
    Half,
    Quarter,
    Eighth,
    /// DC coefficients only (baseline JPEG)
    Dc,
}

impl From<Mode> for DecodeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Full => DecodeMode::Full,
            Mode::Half => DecodeMode::Half,
            Mode::Quarter => DecodeMode::Quarter,
            Mode::Eighth => DecodeMode::Eighth,
            Mode::Dc => DecodeMode::DcOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BlurKernel {
    /// [1 2 1; 2 4 2; 1 2 1] / 16
    Gaussian,
    /// Uniform 3x3 average
    Box,
}

impl From<BlurKernel> for Smoothing {
    fn from(kernel: BlurKernel) -> Self {
        match kernel {
            BlurKernel::Gaussian => Smoothing::Gaussian,
            BlurKernel::Box => Smoothing::Box,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Motion percentage only
    Minimal,
}

/// Run the CLI and return the process exit code
pub fn run() -> u8 {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Commands::Compare { report, .. }
        | Commands::Cascade { report, .. }
        | Commands::Batch { report, .. } => report.verbose,
    };
    frame_motion::init_tracing_with_default(if verbose { "debug" } else { "error" });

    let outcome = match cli.command {
        Commands::Compare {
            first,
            second,
            detection,
            report,
            benchmark,
        } => Ok(run_compare(&first, &second, &detection.parameters(), &report, benchmark)),
        Commands::Cascade {
            first,
            second,
            size_threshold,
            reduced_mode,
            reduced_stride,
            threshold,
            motion_threshold,
            report,
        } => {
            let stage = |mode: DecodeMode, stride: i64| {
                MotionParameters::builder()
                    .decode_mode(mode)
                    .spatial_stride(stride)
                    .pixel_threshold(threshold)
                    .motion_percent_threshold(motion_threshold)
                    .build()
            };
            let cascade = Cascade::standard(
                size_threshold,
                stage(reduced_mode.into(), reduced_stride),
                stage(DecodeMode::Full, 1),
            );
            Ok(run_cascade(&first, &second, &cascade, &report))
        }
        Commands::Batch {
            directory,
            detection,
            report,
            recursive,
            include_hidden,
        } => run_batch(
            &directory,
            detection.parameters(),
            &report,
            recursive,
            include_hidden,
        ),
    };

    match outcome {
        Ok(code) => code,
        Err(error) => {
            Term::stderr()
                .write_line(&format!("{} {}", style("Error:").red().bold(), error))
                .ok();
            Decision::Error.exit_code()
        }
    }
}

fn run_compare(
    first: &Path,
    second: &Path,
    params: &MotionParameters,
    report: &ReportArgs,
    benchmark: bool,
) -> u8 {
    let term = Term::stderr();
    if report.verbose {
        print_parameters(&term, first, second, params);
    }

    let result = MotionDetector::default().run(first, second, params);

    match report.output {
        OutputFormat::Pretty => print_pretty_result(&term, &result),
        OutputFormat::Json => print_json(&result),
        OutputFormat::Minimal => print_minimal_result(&result),
    }
    if report.verbose && !matches!(report.output, OutputFormat::Pretty) {
        print_pretty_result(&term, &result);
    }
    if benchmark {
        print_benchmark(&term, &result);
    }

    result.exit_code()
}

fn run_cascade(first: &Path, second: &Path, cascade: &Cascade, report: &ReportArgs) -> u8 {
    let term = Term::stderr();
    let (sender, receiver) = EventChannel::new();
    let verbose = report.verbose;

    // Stage announcements go to stderr so stdout stays parseable
    let event_thread = thread::spawn(move || {
        let term = Term::stderr();
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::StageStarted {
                    stage,
                    total_stages,
                    description,
                }) if verbose => {
                    term.write_line(&format!(
                        "{} {}",
                        style(format!("[{}/{}]", stage, total_stages)).dim(),
                        description
                    ))
                    .ok();
                }
                Event::Pipeline(PipelineEvent::StageFinished {
                    decision,
                    motion_percent,
                    ..
                }) if verbose => {
                    term.write_line(&format!(
                        "      {} {}",
                        format_percent(motion_percent),
                        decision
                    ))
                    .ok();
                }
                _ => {}
            }
        }
    });

    let result = cascade.run_with_events(&MotionDetector::default(), first, second, &sender);
    drop(sender);
    event_thread.join().ok();

    match report.output {
        OutputFormat::Pretty => print_pretty_cascade(&term, &result),
        OutputFormat::Json => print_json(&result),
        OutputFormat::Minimal => match result.final_result() {
            Some(last) => print_minimal_result(last),
            None => println!("{}", format_percent(None)),
        },
    }

    result.decision().exit_code()
}

fn run_batch(
    directory: &Path,
    params: MotionParameters,
    report: &ReportArgs,
    recursive: bool,
    include_hidden: bool,
) -> Result<u8> {
    let term = Term::stderr();
    let runner = BatchRunner::new(MotionDetector::default(), params)
        .filter(FrameFilter::new().with_hidden(include_hidden))
        .recursive(recursive);

    let (sender, receiver) = EventChannel::new();
    let progress = if matches!(report.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Batch(BatchEvent::Started { total_pairs, .. }) => {
                    pb.set_length(total_pairs as u64);
                }
                Event::Batch(BatchEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    pb.set_message(
                        p.current_path
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                            .to_string(),
                    );
                }
                Event::Batch(BatchEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let outcome = runner.run_with_events(directory, &sender);
    drop(sender);
    event_thread.join().ok();
    let batch = outcome?;

    match report.output {
        OutputFormat::Pretty => print_pretty_batch(&term, &batch, report.verbose),
        OutputFormat::Json => print_json(&batch),
        OutputFormat::Minimal => print_minimal_batch(&batch),
    }

    Ok(batch.exit_code())
}

fn print_parameters(term: &Term, first: &Path, second: &Path, params: &MotionParameters) {
    term.write_line(&format!(
        "{} {}",
        style("frame-motion").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line(&format!("  First:  {}", first.display())).ok();
    term.write_line(&format!("  Second: {}", second.display())).ok();

    if params.file_size_only {
        term.write_line(&format!(
            "  File-size mode, threshold {:.2}%",
            params.file_size_threshold_percent
        ))
        .ok();
        return;
    }

    term.write_line(&format!(
        "  Decode: {}{}",
        params.decode_mode,
        if params.strict_dc { " (strict)" } else { "" }
    ))
    .ok();
    term.write_line(&format!(
        "  Pixel threshold {}, stride {}, motion threshold {:.2}%",
        params.pixel_threshold, params.spatial_stride, params.motion_percent_threshold
    ))
    .ok();
    term.write_line(&format!(
        "  Channels: {}, smoothing: {}",
        params.channel_mode, params.smoothing
    ))
    .ok();
}

fn print_pretty_result(term: &Term, result: &ComparisonResult) {
    let verdict = match result.decision {
        Decision::NoMotion => style(format!("✓ {}", result.decision)).green().bold(),
        Decision::Motion => style(format!("● {}", result.decision)).yellow().bold(),
        Decision::Error => style(format!("✗ {}", result.decision)).red().bold(),
    };
    term.write_line(&format!("{}  {}", verdict, format_percent(result.motion_percent)))
        .ok();

    if let Some(message) = &result.error_message {
        term.write_line(&format!("  {}", style(message).red())).ok();
    }

    let diagnostics = &result.diagnostics;
    if let Some(sizes) = &diagnostics.size_comparison {
        term.write_line(&format!(
            "  Sizes: {} vs {} bytes (content ~{} vs ~{})",
            sizes.size_a, sizes.size_b, sizes.content_a, sizes.content_b
        ))
        .ok();
    }
    if let Some(shape) = diagnostics.compared_shape {
        term.write_line(&format!(
            "  Compared {} ({} of {} sampled pixels changed)",
            shape, diagnostics.pixels_changed, diagnostics.pixels_sampled
        ))
        .ok();
    }
    if diagnostics.dc_fallback {
        term.write_line(&format!(
            "  {}",
            style("DC-only decode unavailable, used full decode").dim()
        ))
        .ok();
    }
}

fn print_benchmark(term: &Term, result: &ComparisonResult) {
    let diagnostics = &result.diagnostics;
    term.write_line(&format!("{}", style("Benchmark").bold().underlined()))
        .ok();
    term.write_line(&format!("  Load:    {:>9.2} ms", diagnostics.load_ms))
        .ok();
    term.write_line(&format!("  Compute: {:>9.2} ms", diagnostics.compute_ms))
        .ok();
    term.write_line(&format!("  Total:   {:>9.2} ms", diagnostics.total_ms))
        .ok();
    if let Some(speed) = diagnostics.megapixels_per_second() {
        term.write_line(&format!("  Speed:   {:>9.2} MP/s", speed)).ok();
    }
}

fn print_pretty_cascade(term: &Term, result: &CascadeResult) {
    for (index, stage) in result.stages.iter().enumerate() {
        term.write_line(&format!(
            "{} {}",
            style(format!("Stage {}/{}:", index + 1, result.total_stages)).bold(),
            if stage.parameters.file_size_only {
                "file size".to_string()
            } else {
                stage.parameters.decode_mode.to_string()
            }
        ))
        .ok();
        print_pretty_result(term, stage);
    }
    if result.stopped_early() {
        term.write_line(&format!(
            "{}",
            style("Remaining stages skipped").dim()
        ))
        .ok();
    }
}

fn print_pretty_batch(term: &Term, report: &BatchReport, verbose: bool) {
    term.write_line(&format!(
        "{} {} pairs compared in {:.1}s",
        style("✓").green().bold(),
        style(report.pairs.len()).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} with motion, {} errors",
        style(report.motion_count).yellow(),
        style(report.error_count).red()
    ))
    .ok();
    term.write_line("").ok();

    for pair in &report.pairs {
        if pair.result.decision == Decision::NoMotion && !verbose {
            continue;
        }
        term.write_line(&format!(
            "  {} → {}  {}  {}",
            pair.first.display(),
            pair.second.display(),
            format_percent(pair.result.motion_percent),
            pair.result.decision
        ))
        .ok();
    }
}

fn print_minimal_result(result: &ComparisonResult) {
    println!("{}", format_percent(result.motion_percent));
}

fn print_minimal_batch(report: &BatchReport) {
    for pair in &report.pairs {
        println!(
            "{}\t{}\t{}",
            pair.first.display(),
            pair.second.display(),
            format_percent(pair.result.motion_percent)
        );
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            Term::stderr()
                .write_line(&format!("{} {}", style("Error:").red().bold(), e))
                .ok();
        }
    }
}

fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{:.2}%", p),
        None => "ERROR".to_string(),
    }
}
