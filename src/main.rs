use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gphotos_sync_rs::cli::{self, Command};
use gphotos_sync_rs::config::{IndexConfig, PendingConfig};
use gphotos_sync_rs::filesystem::{process_profile, FilesystemProfile};
use gphotos_sync_rs::indexer::{self, LibraryExport};
use gphotos_sync_rs::state::{SyncStateDb, DB_FILE_NAME};

/// Open the store for a read/update command, or report that there is none.
fn open_existing(root: &Path) -> anyhow::Result<Option<SyncStateDb>> {
    let db_path = root.join(DB_FILE_NAME);
    if !db_path.exists() {
        println!("No state database found at {}", db_path.display());
        println!("Run an index first to create the database.");
        return Ok(None);
    }
    Ok(Some(SyncStateDb::open(root, false)?))
}

/// Run the probe command.
fn run_probe(args: cli::ProbeArgs) -> anyhow::Result<()> {
    let root = args.root.root_folder();
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }
    let profile = FilesystemProfile::probe(&root);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }
    println!("Filesystem profile for {}", root.display());
    println!();
    println!("  Kind:             {}", profile.filesystem_kind);
    println!("  POSIX-like names: {}", profile.is_posix_like);
    println!("  Unicode names:    {}", profile.supports_unicode_names);
    println!("  Case sensitive:   {}", profile.is_case_sensitive);
    println!("  Symlinks:         {}", profile.supports_symlinks);
    println!("  Max name length:  {}", profile.max_name_length);
    println!("  Max path length:  {}", profile.max_path_length);
    Ok(())
}

/// Run the index command.
fn run_index(config: IndexConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.root)
        .with_context(|| format!("Failed to create {}", config.root.display()))?;
    let text = std::fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    let export = LibraryExport::from_json(&text)
        .with_context(|| format!("Failed to parse {}", config.input.display()))?;

    let profile = process_profile(&config.root);
    let db = SyncStateDb::open(&config.root, config.reset_index)?;
    let previous = db.get_scan_date()?;

    let mut report =
        indexer::index_descriptors(&db, export.media_items, profile, &config.options)?;
    if !export.albums.is_empty() {
        report.albums = indexer::index_albums(&db, export.albums, profile)?;
    }

    if let Some(newest) = report.newest {
        if previous.map_or(true, |prev| newest > prev) {
            db.set_scan_date(newest)?;
        }
    }
    db.persist()?;
    let summary = db.summary()?;
    db.close()?;

    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} new, {} updated, {} skipped, {} albums",
        report.new,
        report.updated,
        report.skipped,
        report.albums
    );
    tracing::info!(
        "  {} tracked, {} pending download",
        summary.total,
        summary.pending
    );
    Ok(())
}

/// Run the status command.
fn run_status(args: cli::RootArgs) -> anyhow::Result<()> {
    let root = args.root_folder();
    let Some(db) = open_existing(&root)? else {
        return Ok(());
    };
    let summary = db.summary()?;

    println!("State Database: {}", db.path().display());
    println!();
    println!("Files:");
    println!("  Total:      {}", summary.total);
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Pending:    {}", summary.pending);
    println!("Albums:       {}", summary.albums);
    println!();
    match summary.last_index {
        Some(date) => println!("Last index:   {}", date.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last index:   never"),
    }
    db.close()?;
    Ok(())
}

/// Run the pending command.
fn run_pending(config: PendingConfig) -> anyhow::Result<()> {
    let Some(db) = open_existing(&config.root)? else {
        return Ok(());
    };
    let mut count = 0u64;
    for media in db.search_files(&config.id_pattern, config.since, config.until, true) {
        let media = media?;
        println!(
            "{}\t{}",
            media.remote_id,
            Path::new(&media.relative_folder)
                .join(&media.file_name)
                .display()
        );
        count += 1;
    }
    tracing::info!("{} files pending download", count);
    db.close()?;
    Ok(())
}

/// Run the mark-downloaded command.
fn run_mark_downloaded(args: cli::MarkDownloadedArgs) -> anyhow::Result<()> {
    let root = args.root.root_folder();
    let Some(db) = open_existing(&root)? else {
        return Ok(());
    };
    let mut marked = 0;
    for id in &args.ids {
        marked += db.set_downloaded(id, true)?;
    }
    db.persist()?;
    db.close()?;
    println!("Marked {} of {} files as downloaded", marked, args.ids.len());
    Ok(())
}

/// Run the album-files command.
fn run_album_files(args: cli::AlbumFilesArgs) -> anyhow::Result<()> {
    let root = args.root.root_folder();
    let Some(db) = open_existing(&root)? else {
        return Ok(());
    };
    for entry in db.list_album_files(&args.album) {
        let entry = entry?;
        let end = entry
            .album_end_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}",
            entry.album_name,
            end,
            Path::new(&entry.path).join(&entry.file_name).display()
        );
    }
    db.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    match cli.command {
        Command::Probe(args) => run_probe(args),
        Command::Index(args) => run_index(IndexConfig::from_args(args)?),
        Command::Status(args) => run_status(args),
        Command::Pending(args) => run_pending(PendingConfig::from_args(args)?),
        Command::MarkDownloaded(args) => run_mark_downloaded(args),
        Command::AlbumFiles(args) => run_album_files(args),
    }
}
