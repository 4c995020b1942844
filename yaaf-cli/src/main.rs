//! Reference CLI for YAAF archives: `create`, `list-all`, `list-dir`,
//! `extract-archive`, `extract-file`, `stat`, `check`. Directory walking
//! and path canonicalization are this binary's job, not the core library's
//! — the library only ever sees a flat list of (name, mtime, byte source)
//! entries.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context};
use chrono::{Datelike, TimeZone, Timelike};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use yaaf_codecs::{codec_by_flags, Lz4Codec};
use yaaf_core::{ArchiveReader, ArchiveWriter, EntryInput, Error as YaafError, PackedDateTime};

#[derive(Parser)]
#[command(
    name = "yaaf",
    about = "Yet Another Archive Format — create, inspect, and randomly extract YAAF archives",
    version
)]
struct Cli {
    /// Suppress informational output; only errors are printed.
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Print per-entry progress as it happens.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new archive from one or more files/directories
    Create {
        /// Destination archive file
        archive: PathBuf,
        /// Files or directories to add
        paths: Vec<PathBuf>,
        /// Recurse into subdirectories (default: only the top level of each
        /// given directory)
        #[arg(short, long)]
        recursive: bool,
        /// Overwrite the destination archive if it already exists
        #[arg(long)]
        overwrite: bool,
    },
    /// List every entry in the archive
    ListAll {
        archive: PathBuf,
    },
    /// List entries directly inside `prefix` ("." for the top level)
    ListDir {
        archive: PathBuf,
        prefix: String,
    },
    /// Extract every entry into a destination directory
    ExtractArchive {
        archive: PathBuf,
        dest: PathBuf,
        /// Overwrite files that already exist at the destination
        #[arg(long)]
        overwrite: bool,
    },
    /// Extract a single named entry to a destination path
    ExtractFile {
        archive: PathBuf,
        name: String,
        dest: PathBuf,
        /// Overwrite the destination file if it already exists
        #[arg(long)]
        overwrite: bool,
    },
    /// Print metadata for one entry
    Stat {
        archive: PathBuf,
        name: String,
    },
    /// Verify every block and file hash in the archive
    Check {
        archive: PathBuf,
    },
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{v:.2} {}", UNITS[unit])
    }
}

fn packed_mtime_of(path: &Path) -> anyhow::Result<PackedDateTime> {
    let meta = fs::metadata(path).with_context(|| format!("stat {path:?}"))?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let dt: chrono::DateTime<chrono::Utc> = modified.into();
    let year = dt.year().clamp(2000, 2127) as u16;
    Ok(PackedDateTime::new(
        year,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
    )?)
}

/// Walk `root` (a file or directory) and return `(filesystem path, archive
/// name)` pairs. A bare file becomes a single top-level entry named after
/// its file name; a directory contributes `<dirname>/<relative path>` for
/// each file found, recursing only when `recursive` is set (spec.md §6.6
/// leaves the walking strategy to this external collaborator).
fn collect_paths(root: &Path, recursive: bool) -> anyhow::Result<Vec<(PathBuf, String)>> {
    if root.is_file() {
        let name = root
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("path {root:?} has no file name"))?
            .to_string_lossy()
            .into_owned();
        return Ok(vec![(root.to_path_buf(), name)]);
    }
    if !root.is_dir() {
        bail!("{root:?} is neither a regular file nor a directory");
    }

    let base_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut out = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("walking {root:?}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir entries are always under root")
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        out.push((entry.path().to_path_buf(), format!("{base_name}/{rel}")));
    }
    Ok(out)
}

// ── Subcommand implementations ──────────────────────────────────────────

fn run_create(archive: PathBuf, paths: Vec<PathBuf>, recursive: bool, overwrite: bool) -> anyhow::Result<()> {
    if paths.is_empty() {
        bail!("no input files or directories given");
    }
    if archive.exists() && !overwrite {
        bail!("{archive:?} already exists (pass --overwrite to replace it)");
    }

    let mut walked = Vec::new();
    for p in &paths {
        walked.extend(collect_paths(p, recursive)?);
    }
    if walked.is_empty() {
        bail!("no files found under the given paths");
    }
    info!(count = walked.len(), "found entries to archive");

    let mut entries: Vec<EntryInput<'_>> = Vec::with_capacity(walked.len());
    for (fs_path, name) in &walked {
        let meta = fs::metadata(fs_path).with_context(|| format!("stat {fs_path:?}"))?;
        if meta.len() == 0 {
            warn!(name = %name, "skipping zero-byte file (format does not represent empty entries)");
            continue;
        }
        let last_mod = match packed_mtime_of(fs_path) {
            Ok(dt) => dt,
            Err(err) if err.downcast_ref::<YaafError>().is_some() => {
                warn!(name = %name, %err, "skipping file whose modification time does not fit the archive's packed date-time field");
                continue;
            }
            Err(err) => return Err(err),
        };
        let file = File::open(fs_path).with_context(|| format!("opening {fs_path:?}"))?;
        debug!(name = %name, size = meta.len(), "queued entry");
        entries.push(EntryInput::new(name.clone(), last_mod, meta.len(), file));
    }
    if entries.is_empty() {
        bail!("every discovered file was skipped (empty, or mtime out of range)");
    }

    let out = File::create(&archive).with_context(|| format!("creating {archive:?}"))?;
    let written = ArchiveWriter::new(out, Box::new(Lz4Codec)).write_all(entries)?;
    info!(entries = written, archive = %archive.display(), "archive created");
    Ok(())
}

fn run_list_all(archive: PathBuf) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("opening {archive:?}"))?;
    for name in reader.list_all() {
        println!("{name}");
    }
    Ok(())
}

fn run_list_dir(archive: PathBuf, prefix: String) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("opening {archive:?}"))?;
    for name in reader.list_dir(&prefix) {
        println!("{name}");
    }
    Ok(())
}

fn extract_one(reader: &ArchiveReader, name: &str, dest: &Path, overwrite: bool) -> anyhow::Result<()> {
    if dest.exists() && !overwrite {
        bail!("{dest:?} already exists (pass --overwrite to replace it)");
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
    }
    let info = reader.stat(name)?;
    let codec = codec_by_flags(info.flags)?;
    let mut stream = reader.open_entry(name, codec)?;

    let mut out = File::create(dest).with_context(|| format!("creating {dest:?}"))?;
    let mut buf = vec![0u8; yaaf_core::BLOCK_SIZE as usize];
    loop {
        let n = stream.read(Some(&mut buf), buf.len())?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
    }
    out.flush()?;

    let mtime = &info.last_modification;
    let ft = filetime::FileTime::from_unix_time(
        chrono::Utc
            .with_ymd_and_hms(
                mtime.year as i32,
                mtime.month as u32,
                mtime.day as u32,
                mtime.hour as u32,
                mtime.min as u32,
                mtime.sec as u32,
            )
            .single()
            .map(|dt| dt.timestamp())
            .unwrap_or(0),
        0,
    );
    let _ = filetime::set_file_mtime(dest, ft);
    Ok(())
}

fn run_extract_archive(archive: PathBuf, dest: PathBuf, overwrite: bool) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("opening {archive:?}"))?;
    fs::create_dir_all(&dest).with_context(|| format!("creating {dest:?}"))?;

    let names: Vec<String> = reader.list_all().into_iter().map(String::from).collect();
    for name in &names {
        let out_path = dest.join(name.replace('/', std::path::MAIN_SEPARATOR_STR));
        extract_one(&reader, name, &out_path, overwrite)
            .with_context(|| format!("extracting {name:?}"))?;
        info!(name = %name, "extracted");
    }
    info!(count = names.len(), dest = %dest.display(), "archive extracted");
    Ok(())
}

fn run_extract_file(archive: PathBuf, name: String, dest: PathBuf, overwrite: bool) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("opening {archive:?}"))?;
    extract_one(&reader, &name, &dest, overwrite)?;
    info!(name = %name, dest = %dest.display(), "extracted");
    Ok(())
}

fn run_stat(archive: PathBuf, name: String) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("opening {archive:?}"))?;
    let info = reader.stat(&name)?;
    println!("name               : {}", info.name);
    println!(
        "last modification  : {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        info.last_modification.year,
        info.last_modification.month,
        info.last_modification.day,
        info.last_modification.hour,
        info.last_modification.min,
        info.last_modification.sec
    );
    println!("size (uncompressed): {}", human_bytes(info.size_uncompressed));
    println!("size (compressed)  : {}", human_bytes(info.size_compressed));
    println!("extra bytes        : {}", info.extra.len());
    Ok(())
}

fn run_check(archive: PathBuf) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("opening {archive:?}"))?;
    let names = reader.list_all();
    if names.is_empty() {
        info!("archive has no entries; nothing to verify");
        return Ok(());
    }

    let mut checked = 0;
    for name in &names {
        let flags = reader.stat(name)?.flags;
        let codec = codec_by_flags(flags)?;
        reader.check_entry(name, codec.as_ref())?;
        checked += 1;
        debug!(name = %name, "verified");
    }
    info!(checked, "all entries verified OK");
    Ok(())
}

// ── Entry point ──────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .without_time()
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Create {
            archive,
            paths,
            recursive,
            overwrite,
        } => run_create(archive, paths, recursive, overwrite),
        Commands::ListAll { archive } => run_list_all(archive),
        Commands::ListDir { archive, prefix } => run_list_dir(archive, prefix),
        Commands::ExtractArchive {
            archive,
            dest,
            overwrite,
        } => run_extract_archive(archive, dest, overwrite),
        Commands::ExtractFile {
            archive,
            name,
            dest,
            overwrite,
        } => run_extract_file(archive, name, dest, overwrite),
        Commands::Stat { archive, name } => run_stat(archive, name),
        Commands::Check { archive } => run_check(archive),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
