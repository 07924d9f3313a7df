use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "gphotos-sync-rs",
    about = "Index a Google Photos library into a local sync state database"
)]
pub struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe the filesystem under the sync root and print its capabilities
    Probe(ProbeArgs),
    /// Index a media listing exported from the remote library
    Index(IndexArgs),
    /// Show index counts and the incremental watermark
    Status(RootArgs),
    /// List files that have not been downloaded yet
    Pending(PendingArgs),
    /// Mark files as downloaded
    MarkDownloaded(MarkDownloadedArgs),
    /// List the files that belong in album folders
    AlbumFiles(AlbumFilesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Root folder of the local library (holds gphotos.sqlite)
    #[arg(short = 'r', long, env = "GPHOTOS_ROOT")]
    pub root: String,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Print the profile as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// JSON file holding `mediaItems` (and optionally `albums`)
    #[arg(short = 'i', long)]
    pub input: String,

    /// Drop the existing index and start over
    #[arg(long)]
    pub reset_index: bool,

    /// Lower-case local file names
    #[arg(long)]
    pub lowercase: bool,

    /// Date folder layout (`%Y`, `%m`, `%d`), or `none`
    #[arg(long, default_value = "%Y/%m")]
    pub folder_layout: String,
}

#[derive(Args, Debug)]
pub struct PendingArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Only files modified or created on/after this date (UTC ISO date, or interval like 30d / 6w)
    #[arg(long)]
    pub since: Option<String>,

    /// Only files modified or created on/before this date
    #[arg(long)]
    pub until: Option<String>,

    /// RemoteId pattern (`%` matches anything)
    #[arg(long, default_value = "%")]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct MarkDownloadedArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Remote ids to mark
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AlbumFilesArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// AlbumId pattern (`%` matches every album)
    #[arg(long, default_value = "%")]
    pub album: String,
}
