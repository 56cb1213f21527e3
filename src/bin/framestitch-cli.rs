use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framestitch::{
    FfmpegLogLevel, FrameFormat, FrameRetention, KeyframeExtractor, OpenCvStitcher,
    OperationType, PanoramaOptions, PanoramaStitcher, Pipeline, ProgressCallback, ProgressInfo,
    StitchMode,
};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framestitch panorama input.mp4 --out panorama.exr --every 5\n  framestitch panorama input.mp4 --frames-dir /tmp/frames --purge-frames --progress\n  framestitch extract input.mp4 --out frames --every 10 --ext png\n  framestitch stitch frames/*.jpg --out panorama.exr\n  framestitch completions zsh > _framestitch";

#[derive(Debug, Parser)]
#[command(
    name = "framestitch",
    version,
    about = "Stitch periodic video frames into a panorama",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting an existing output file.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Frame sampling flags shared by `panorama` and `extract`.
#[derive(Debug, Args, Clone)]
struct SamplingArgs {
    /// Keep every Nth decoded frame.
    #[arg(long, default_value_t = 5)]
    every: u64,
    /// Frame image extension (jpg, png, bmp).
    #[arg(long, default_value = "jpg")]
    ext: String,
    /// JPEG quality for sampled frames (1-100).
    #[arg(long, default_value_t = 95)]
    quality: u8,
}

/// Panorama output flags shared by `panorama` and `stitch`.
#[derive(Debug, Args, Clone)]
struct PanoramaArgs {
    /// Output panorama path; use a float-capable format such as .exr.
    #[arg(long, default_value = "panorama.exr")]
    out: PathBuf,
    /// Output width in pixels.
    #[arg(long, default_value_t = 1024)]
    width: u32,
    /// Output height in pixels.
    #[arg(long, default_value_t = 512)]
    height: u32,
    /// Stitcher warping mode (panorama, scans).
    #[arg(long, default_value = "panorama")]
    mode: String,
    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract keyframes from a video and stitch them into a panorama.
    #[command(
        about = "Build a panorama from a video",
        after_help = "Examples:\n  framestitch panorama input.mp4\n  framestitch panorama input.mp4 --out pano.exr --every 10 --purge-frames"
    )]
    Panorama {
        /// Input video path.
        input: PathBuf,
        #[command(flatten)]
        sampling: SamplingArgs,
        #[command(flatten)]
        output: PanoramaArgs,
        /// Directory that receives the sampled frames.
        #[arg(long, default_value = "extracted_frames")]
        frames_dir: PathBuf,
        /// Delete the sampled frames once the run finishes.
        #[arg(long)]
        purge_frames: bool,
    },

    /// Extract keyframes only.
    #[command(
        about = "Save every Nth frame of a video",
        after_help = "Examples:\n  framestitch extract input.mp4 --out frames --every 10"
    )]
    Extract {
        /// Input video path.
        input: PathBuf,
        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        sampling: SamplingArgs,
    },

    /// Stitch existing image files into a panorama.
    #[command(
        about = "Stitch images into a panorama",
        after_help = "Examples:\n  framestitch stitch a.jpg b.jpg c.jpg --out panorama.exr"
    )]
    Stitch {
        /// Input images, in order.
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        output: PanoramaArgs,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_frame_format(value: &str) -> Option<FrameFormat> {
    FrameFormat::from_extension(value)
}

fn parse_stitch_mode(value: &str) -> Option<StitchMode> {
    match value.to_ascii_lowercase().as_str() {
        "panorama" | "pano" => Some(StitchMode::Panorama),
        "scans" | "scan" => Some(StitchMode::Scans),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Forwards pipeline progress to an indicatif bar.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let label = match info.operation {
            OperationType::FrameExtraction => "extracting frames",
            OperationType::ImageLoading => "loading frames",
            OperationType::Stitching => "stitching",
            _ => "working",
        };
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(label);
    }
}

fn build_options(
    global: &GlobalOptions,
    sampling: Option<&SamplingArgs>,
    output: Option<&PanoramaArgs>,
) -> Result<(PanoramaOptions, Option<Arc<TerminalProgress>>), Box<dyn std::error::Error>> {
    let mut options = PanoramaOptions::new();

    if let Some(sampling) = sampling {
        if sampling.every == 0 {
            return Err("--every must be greater than 0".into());
        }
        let format = parse_frame_format(&sampling.ext)
            .ok_or(format!("unsupported --ext: {}", sampling.ext))?;
        options = options
            .with_frame_interval(sampling.every)
            .with_frame_format(format)
            .with_jpeg_quality(sampling.quality);
    }

    if let Some(output) = output {
        if output.width == 0 || output.height == 0 {
            return Err("--width and --height must be greater than 0".into());
        }
        options = options.with_output_size(output.width, output.height);
    }

    let progress = if global.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        options = options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    Ok((options, progress))
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        framestitch::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn engine_for(output: &PanoramaArgs) -> Result<OpenCvStitcher, Box<dyn std::error::Error>> {
    let mode =
        parse_stitch_mode(&output.mode).ok_or(format!("unsupported --mode: {}", output.mode))?;
    Ok(OpenCvStitcher::with_mode(mode))
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Panorama {
            input,
            sampling,
            output,
            frames_dir,
            purge_frames,
        } => {
            ensure_writable_path(&output.out, cli.global.overwrite)?;
            let engine = engine_for(&output)?;
            let (options, progress) = build_options(&cli.global, Some(&sampling), Some(&output))?;
            let retention = if purge_frames {
                FrameRetention::Purge
            } else {
                FrameRetention::Retain
            };
            let options = options
                .with_frames_directory(&frames_dir)
                .with_frame_retention(retention);

            if cli.global.verbose {
                eprintln!("{options:?}");
            }

            let mut pipeline = Pipeline::new(engine, options);
            let result = pipeline.run(&input, &output.out);
            if let Some(progress) = progress {
                progress.bar.finish_and_clear();
            }
            let report = result.inspect_err(|_| {
                if cli.global.verbose {
                    eprintln!("stopped during {:?}", pipeline.stage());
                }
            })?;

            if output.json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "output": report.output.display().to_string(),
                    "width": report.width,
                    "height": report.height,
                    "keyframes": report.keyframes.len(),
                    "frames_directory": frames_dir.display().to_string(),
                    "frames_purged": report.frames_purged,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                if cli.global.verbose {
                    for path in &report.keyframes {
                        eprintln!("keyframe {}", path.display());
                    }
                }
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Panoramic HDR image saved as {} ({}x{}, {} keyframe(s))",
                        report.output.display(),
                        report.width,
                        report.height,
                        report.keyframes.len(),
                    )
                    .green()
                );
            }
        }
        Commands::Extract {
            input,
            out,
            sampling,
        } => {
            let (options, progress) = build_options(&cli.global, Some(&sampling), None)?;
            let result = KeyframeExtractor::from_options(&options).extract(&input, &out);
            if let Some(progress) = progress {
                progress.bar.finish_and_clear();
            }
            let paths = result?;

            for path in &paths {
                println!("{}", path.display());
            }
            eprintln!(
                "{} {}",
                "success:".green().bold(),
                format!("Extracted {} frame(s) to {}", paths.len(), out.display()).green()
            );
        }
        Commands::Stitch { images, output } => {
            ensure_writable_path(&output.out, cli.global.overwrite)?;
            let engine = engine_for(&output)?;
            let (options, progress) = build_options(&cli.global, None, Some(&output))?;

            let result = PanoramaStitcher::new(engine, &options).stitch_files(&images);
            if let Some(progress) = progress {
                progress.bar.finish_and_clear();
            }
            let panorama = result?;
            let (width, height) = panorama.dimensions();
            DynamicImage::ImageRgb32F(framestitch::to_normalized_float(&panorama))
                .save(&output.out)?;

            if output.json {
                let payload = json!({
                    "inputs": images.len(),
                    "output": output.out.display().to_string(),
                    "width": width,
                    "height": height,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "saved".green().bold(), output.out.display());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framestitch", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
