use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use glob::glob;
use log::{debug, info};
use sensordump_core::decode::LengthPolicy;
use sensordump_core::{ConversionConfig, ConvertError, OutputFormat, Report, Severity};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SENSORDUMP_BUILD_COMMIT"),
    " ",
    env!("SENSORDUMP_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "sensordump")]
#[command(version = VERSION)]
#[command(
    about = "Offline converter for sensor-log dumps (point clouds, height maps).",
    long_about = None,
    after_help = "Examples:\n  sensordump ply dump.txt -o cloud.ply\n  sensordump lidar scan.msgpack -o frames/ --snapshots\n  sensordump heightmap maps.msgpack -o maps/ --format png --format npz\n  sensordump merge frames/ -o merged.ply --preview\n  sensordump overlay clouds/ -o overlay.png"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a free-text numeric dump into one point-cloud file.
    #[command(after_help = "Examples:\n  sensordump ply dump.txt -o cloud.ply\n  sensordump ply 'dumps/*.txt' -o cloud.xyz --format xyz")]
    Ply {
        /// Text file (or glob matching exactly one file)
        input: PathBuf,

        /// Output point-cloud file
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Output format (ply, pcd, xyz, pts); repeat for several
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<OutputFormat>,

        /// What to do with a trailing incomplete triple
        #[arg(long, value_enum)]
        length_policy: Option<PolicyArg>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Convert a MessagePack lidar log into per-frame point clouds.
    Lidar {
        /// MessagePack file (or glob matching exactly one file)
        input: PathBuf,

        /// Output directory
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Output format (pcd, ply, xyz, pts, png); defaults to pcd and ply
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<OutputFormat>,

        /// What to do with frames whose point count is not a multiple of 4
        #[arg(long, value_enum)]
        length_policy: Option<PolicyArg>,

        /// Also write every frame as snapshots/frame_NNNN.json
        #[arg(long)]
        snapshots: bool,

        #[command(flatten)]
        canvas: CanvasArgs,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Convert MessagePack height-map frames into images and/or archives.
    Heightmap {
        /// MessagePack file (or glob matching exactly one file)
        input: PathBuf,

        /// Output directory
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Output format (png, npz, hdf5); defaults to png
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<OutputFormat>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Merge a directory of per-frame JSON files into one point cloud.
    Merge {
        /// Directory of *.json frame files
        input: PathBuf,

        /// Output point-cloud file
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Output format (ply, pcd, xyz, pts); defaults to ply
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<OutputFormat>,

        /// Also render a top-down PNG next to the output
        #[arg(long)]
        preview: bool,

        #[command(flatten)]
        canvas: CanvasArgs,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Render every PLY file of a directory and composite the renders.
    Overlay {
        /// Directory of *.ply files
        input: PathBuf,

        /// Output PNG for the composite
        #[arg(short = 'o', long)]
        output: PathBuf,

        #[command(flatten)]
        canvas: CanvasArgs,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Write the conversion report (JSON) to this path
    #[arg(long, conflicts_with = "stdout")]
    report: Option<PathBuf>,

    /// Print the conversion report (JSON) to stdout
    #[arg(long)]
    stdout: bool,

    /// Pretty-print the JSON report
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON report (default)
    #[arg(long)]
    compact: bool,

    /// Print every diagnostic to stderr
    #[arg(long)]
    list_diagnostics: bool,

    /// Suppress non-error output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Exit with code 1 if any warning diagnostic was raised
    #[arg(long)]
    strict: bool,

    /// Log progress (repeat for per-frame detail)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
struct CanvasArgs {
    /// Render width in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Render height in pixels
    #[arg(long, default_value_t = 768)]
    height: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Truncate,
    SkipFrame,
}

impl From<PolicyArg> for LengthPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Truncate => LengthPolicy::Truncate,
            PolicyArg::SkipFrame => LengthPolicy::SkipFrame,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputKind {
    File,
    Dir,
}

type Converter = fn(&ConversionConfig) -> Result<Report, ConvertError>;

struct Job {
    name: &'static str,
    kind: InputKind,
    convert: Converter,
    config: ConversionConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (job, common) = build_job(cli.command);
    init_logging(&common);

    match run_job(job, &common) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(err.code)
        }
    }
}

fn init_logging(common: &CommonArgs) {
    let level = if common.quiet {
        "error"
    } else {
        match common.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn build_job(command: Commands) -> (Job, CommonArgs) {
    match command {
        Commands::Ply {
            input,
            output,
            formats,
            length_policy,
            common,
        } => {
            let mut config = ConversionConfig::new(input, output).with_formats(formats);
            config.options.length_policy = length_policy.map(Into::into);
            (
                Job {
                    name: "text",
                    kind: InputKind::File,
                    convert: sensordump_core::convert_text_dump,
                    config,
                },
                common,
            )
        }
        Commands::Lidar {
            input,
            output,
            formats,
            length_policy,
            snapshots,
            canvas,
            common,
        } => {
            let mut config = ConversionConfig::new(input, output).with_formats(formats);
            config.options.length_policy = length_policy.map(Into::into);
            config.options.snapshots = snapshots;
            apply_canvas(&mut config, &canvas);
            (
                Job {
                    name: "lidar",
                    kind: InputKind::File,
                    convert: sensordump_core::convert_lidar_log,
                    config,
                },
                common,
            )
        }
        Commands::Heightmap {
            input,
            output,
            formats,
            common,
        } => (
            Job {
                name: "heightmap",
                kind: InputKind::File,
                convert: sensordump_core::convert_height_maps,
                config: ConversionConfig::new(input, output).with_formats(formats),
            },
            common,
        ),
        Commands::Merge {
            input,
            output,
            formats,
            preview,
            canvas,
            common,
        } => {
            let mut config = ConversionConfig::new(input, output).with_formats(formats);
            config.options.preview = preview;
            apply_canvas(&mut config, &canvas);
            (
                Job {
                    name: "merge",
                    kind: InputKind::Dir,
                    convert: sensordump_core::merge_json_frames,
                    config,
                },
                common,
            )
        }
        Commands::Overlay {
            input,
            output,
            canvas,
            common,
        } => {
            let mut config = ConversionConfig::new(input, output);
            apply_canvas(&mut config, &canvas);
            (
                Job {
                    name: "overlay",
                    kind: InputKind::Dir,
                    convert: sensordump_core::overlay_ply_renders,
                    config,
                },
                common,
            )
        }
    }
}

fn apply_canvas(config: &mut ConversionConfig, canvas: &CanvasArgs) {
    config.options.canvas.width = canvas.width;
    config.options.canvas.height = canvas.height;
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
    code: u8,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
            code: 2,
        }
    }

    fn strict(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            code: 1,
            ..Self::new(message, hint)
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn run_job(mut job: Job, common: &CommonArgs) -> Result<(), CliError> {
    let resolved = resolve_input_path(&job.config.input, job.kind)?;
    validate_input(&resolved, job.kind)?;
    if let Some(report_path) = common.report.as_ref() {
        ensure_distinct(&resolved, report_path)?;
    }
    if job.kind == InputKind::File && job.config.output.is_file() {
        ensure_distinct(&resolved, &job.config.output)?;
    }
    job.config.input = resolved;
    debug!("{} conversion: {:?}", job.name, job.config);

    let report = (job.convert)(&job.config).map_err(|err| convert_error(job.name, err))?;

    if let Some(report_path) = common.report.as_ref() {
        let json = serialize_report(&report, common.pretty)?;
        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        fs::write(report_path, json)
            .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
        info!("report written -> {}", report_path.display());
    }
    if common.stdout {
        println!("{}", serialize_report(&report, common.pretty)?);
    }
    if common.list_diagnostics {
        print_diagnostics(&report);
    }

    if !common.quiet {
        print_summary(&report, &job.config.output);
    }
    if common.strict && report.has_warnings() {
        let warnings = report
            .diagnostics
            .iter()
            .filter(|entry| entry.severity == Severity::Warning)
            .count();
        return Err(CliError::strict(
            format!("{warnings} warning diagnostic(s) raised"),
            Some("use --list-diagnostics to inspect".to_string()),
        ));
    }
    Ok(())
}

fn convert_error(name: &str, err: ConvertError) -> CliError {
    let hint = match &err {
        ConvertError::MissingInput(_) => Some("check the input path".to_string()),
        ConvertError::UnsupportedFormat { .. } => {
            Some(format!("run `sensordump {name} --help` for the supported formats"))
        }
        _ => None,
    };
    CliError::new(format!("{name} conversion failed: {err}"), hint)
}

fn print_summary(report: &Report, output: &Path) {
    let (converted, skipped) = report
        .frames_summary
        .as_ref()
        .map(|summary| (summary.frames_converted, summary.frames_skipped))
        .unwrap_or((0, 0));
    eprintln!(
        "OK: {} frame(s) converted, {} skipped, {} file(s) written -> {}",
        converted,
        skipped,
        report.outputs.len(),
        output.display()
    );
    let warnings = report
        .diagnostics
        .iter()
        .filter(|entry| entry.severity == Severity::Warning)
        .count();
    if warnings > 0 {
        eprintln!("warnings: {warnings}");
    }
}

fn print_diagnostics(report: &Report) {
    if report.diagnostics.is_empty() {
        eprintln!("Diagnostics: none");
        return;
    }
    eprintln!("Diagnostics:");
    for entry in &report.diagnostics {
        let frame = entry
            .frame
            .map(|index| format!(" frame {index}"))
            .unwrap_or_default();
        eprintln!(
            "- [{}] {}{}: {}",
            entry.severity.as_str(),
            entry.id,
            frame,
            entry.message
        );
    }
}

fn serialize_report(report: &Report, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn ensure_distinct(input: &Path, target: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Ok(parent_abs) = fs::canonicalize(parent) else {
        return Ok(());
    };
    let Some(file_name) = target.file_name() else {
        return Err(CliError::new(
            format!("invalid output path: {}", target.display()),
            None,
        ));
    };
    if parent_abs.join(file_name) == input_abs {
        return Err(CliError::new(
            format!("output path must differ from input: {}", target.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn validate_input(input: &Path, kind: InputKind) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input not found: {}", input.display()),
            Some(kind_hint(kind).to_string()),
        ));
    }
    match kind {
        InputKind::File if !input.is_file() => Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some(kind_hint(kind).to_string()),
        )),
        InputKind::Dir if !input.is_dir() => Err(CliError::new(
            format!("input is not a directory: {}", input.display()),
            Some(kind_hint(kind).to_string()),
        )),
        _ => Ok(()),
    }
}

fn kind_hint(kind: InputKind) -> &'static str {
    match kind {
        InputKind::File => "pass a single input file",
        InputKind::Dir => "pass a directory of frame files",
    }
}

fn resolve_input_path(input: &Path, kind: InputKind) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        let wanted = match kind {
            InputKind::File => path.is_file(),
            InputKind::Dir => path.is_dir(),
        };
        if wanted {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no inputs match pattern '{}'", pattern),
            Some(format!("check the path or quote the pattern; {}", kind_hint(kind))),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple inputs match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single input, or run once per input".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
