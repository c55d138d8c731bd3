use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "coffer",
    about = "Embedded persistent key-value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Working directory holding the store files.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Store instance id.
    #[arg(long, global = true, default_value_t = 0)]
    pub instance: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read the value for a key (set value or its default)
    Get(GetArgs),
    /// Assign a value to a key
    Set(SetArgs),
    /// Remove the explicitly set value for a key
    Remove(RemoveArgs),
    /// List keys with explicitly set values
    Keys(KeysArgs),
    /// Write a new snapshot and rotate older ones
    Flush(FlushArgs),
    /// Show the snapshot ring
    Snapshots(SnapshotsArgs),
    /// Replace the live data with a stored snapshot
    Restore(RestoreArgs),
    /// Reset one key, or all keys, back to defaults
    Reset(ResetArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    pub value: String,
    /// Value type the text is parsed as.
    #[arg(long, default_value = "str")]
    pub kind: ValueKind,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum ValueKind {
    Null,
    Bool,
    I32,
    U32,
    I64,
    U64,
    F64,
    Str,
}

#[derive(Args)]
pub struct RemoveArgs {
    pub key: String,
}

#[derive(Args)]
pub struct KeysArgs {}

#[derive(Args)]
pub struct FlushArgs {}

#[derive(Args)]
pub struct SnapshotsArgs {}

#[derive(Args)]
pub struct RestoreArgs {
    /// Snapshot index; 0 is the most recent.
    pub snapshot: usize,
}

#[derive(Args)]
pub struct ResetArgs {
    /// Key to reset; resets everything when omitted.
    pub key: Option<String>,
}
