use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xxhash_rust::xxh3::xxh3_64;

use fconv_core::{FileRecord, FormatHandler};
use fconv_handlers::{all_handlers, find_handler, handler_by_name, HANDLER_NAMES};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "fconv",
    about = "Convert raw pixel samples and page archives between formats",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the formats each handler reads and writes
    Formats {
        /// Only list this handler's formats
        #[arg(long)]
        handler: Option<String>,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert files in a single hop
    ///
    /// All inputs are converted in one call; if any file fails, nothing is
    /// written.
    Convert {
        /// Internal key of the input format (e.g. rgb, rgba, png, cbz)
        #[arg(long)]
        from: String,
        /// Internal key of the output format
        #[arg(long)]
        to: String,
        /// Use this handler instead of the first one that declares the pair
        #[arg(long)]
        handler: Option<String>,
        /// Directory the outputs are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Input files, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    // A second init (e.g. under a test harness) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}

/// The named handler, or every bundled handler, initialized.
fn load_handlers(name: Option<&str>) -> anyhow::Result<Vec<Box<dyn FormatHandler>>> {
    match name {
        Some(name) => {
            let mut handler = handler_by_name(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown handler '{}'. Valid options: {}",
                    name,
                    HANDLER_NAMES.join(", ")
                )
            })?;
            handler.init()?;
            Ok(vec![handler])
        }
        None => Ok(all_handlers()?),
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

/// Resolve an output file name under `dir`, refusing names that would
/// escape it (absolute paths, `..`). Archive entries may carry such names.
fn output_path(dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || name.is_empty() {
        anyhow::bail!("refusing to write output '{}' outside {:?}", name, dir);
    }
    Ok(dir.join(relative))
}

fn read_input(path: &Path) -> anyhow::Result<FileRecord> {
    let bytes = fs::read(path).with_context(|| format!("reading input file {:?}", path))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("input path {:?} has no file name", path))?;
    Ok(FileRecord::new(name, bytes))
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_formats(handler: Option<&str>, json: bool) -> anyhow::Result<()> {
    let handlers = load_handlers(handler)?;

    if json {
        let mut listing = serde_json::Map::new();
        for h in &handlers {
            listing.insert(
                h.name().to_string(),
                serde_json::to_value(h.supported_formats())?,
            );
        }
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for handler in &handlers {
        println!("=== handler: {} ===", handler.name());
        println!(
            "  {:<8}  {:<6}  {:<4}  {:<4}  {:<8}  {:<30}  {}",
            "internal", "ext", "from", "to", "lossless", "mime", "name"
        );
        println!("  {}", "-".repeat(90));
        for f in handler.supported_formats() {
            let lossless = match f.lossless {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            };
            println!(
                "  {:<8}  {:<6}  {:<4}  {:<4}  {:<8}  {:<30}  {}",
                f.internal,
                f.extension,
                if f.from { "yes" } else { "no" },
                if f.to { "yes" } else { "no" },
                lossless,
                f.mime,
                f.name
            );
        }
        println!();
    }
    Ok(())
}

fn run_convert(
    from: &str,
    to: &str,
    handler: Option<&str>,
    output_dir: PathBuf,
    inputs: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let handlers = load_handlers(handler)?;
    let resolved = find_handler(&handlers, from, to).ok_or_else(|| {
        anyhow::anyhow!("no handler converts '{}' to '{}' in a single step", from, to)
    })?;
    info!(handler = resolved.handler.name(), from, to, "resolved handler");

    let files = inputs
        .iter()
        .map(|path| read_input(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let t0 = Instant::now();
    let outputs = resolved
        .handler
        .do_convert(&files, resolved.input, resolved.output)
        .with_context(|| format!("converting {} -> {} with '{}'", from, to, resolved.handler.name()))?;
    let elapsed = t0.elapsed();

    // Check every name before touching the filesystem so a bad or repeated
    // entry leaves nothing half-written.
    let targets = outputs
        .iter()
        .map(|file| output_path(&output_dir, &file.name))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut seen = HashSet::new();
    for target in &targets {
        if !seen.insert(target) {
            anyhow::bail!("duplicate output {:?}; refusing to overwrite it within one run", target);
        }
    }

    for (file, target) in outputs.iter().zip(&targets) {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {:?}", parent))?;
        }
        fs::write(target, &file.bytes).with_context(|| format!("writing output file {:?}", target))?;
        debug!(path = %target.display(), "wrote output");
        println!(
            "  {:<40}  {:>10}  xxh3={:016x}",
            file.name,
            human_bytes(file.len() as u64),
            xxh3_64(&file.bytes)
        );
    }

    eprintln!("  handler     : {}", resolved.handler.name());
    eprintln!("  inputs      : {}", files.len());
    eprintln!("  outputs     : {}", outputs.len());
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Formats { handler, json } => run_formats(handler.as_deref(), json),
        Commands::Convert {
            from,
            to,
            handler,
            output_dir,
            inputs,
        } => run_convert(&from, &to, handler.as_deref(), output_dir, inputs),
    }
}
