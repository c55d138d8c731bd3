use std::path::Path;

use colored::Colorize;

use coffer::{InstanceId, Kvs, KvsBuilder, SnapshotId, Value};

use crate::cli::*;

/// Exit code for fatal construction or corruption failures, kept distinct
/// so supervising harnesses can tell them from operational errors.
const EXIT_CORRUPT: i32 = 101;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut kvs = open(&cli.dir, cli.instance);
    match cli.command {
        Command::Get(args) => cmd_get(&kvs, args),
        Command::Set(args) => cmd_set(&mut kvs, args),
        Command::Remove(args) => cmd_remove(&mut kvs, args),
        Command::Keys(_) => cmd_keys(&kvs),
        Command::Flush(_) => cmd_flush(&mut kvs),
        Command::Snapshots(_) => cmd_snapshots(&kvs),
        Command::Restore(args) => cmd_restore(&mut kvs, args),
        Command::Reset(args) => cmd_reset(&mut kvs, args),
    }
}

fn open(dir: &Path, instance: u64) -> Kvs {
    match KvsBuilder::new(InstanceId(instance)).dir(dir).build() {
        Ok(kvs) => kvs,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            std::process::exit(EXIT_CORRUPT);
        }
    }
}

fn cmd_get(kvs: &Kvs, args: GetArgs) -> anyhow::Result<()> {
    let value = kvs.get_value(&args.key)?;
    println!("{} = {}", args.key.bold(), render(&value));
    Ok(())
}

// Each invocation is its own process; mutating commands flush before
// returning.
fn cmd_set(kvs: &mut Kvs, args: SetArgs) -> anyhow::Result<()> {
    let value = parse_value(&args.kind, &args.value)?;
    kvs.set_value(args.key.clone(), value)?;
    kvs.flush()?;
    println!("{} set {}", "✓".green(), args.key.bold());
    Ok(())
}

fn cmd_remove(kvs: &mut Kvs, args: RemoveArgs) -> anyhow::Result<()> {
    kvs.remove_key(&args.key)?;
    kvs.flush()?;
    println!("{} removed {}", "✓".green(), args.key.bold());
    Ok(())
}

fn cmd_keys(kvs: &Kvs) -> anyhow::Result<()> {
    let keys = kvs.get_all_keys();
    if keys.is_empty() {
        println!("No keys set.");
    }
    for key in keys {
        println!("{key}");
    }
    Ok(())
}

fn cmd_flush(kvs: &mut Kvs) -> anyhow::Result<()> {
    kvs.flush()?;
    println!(
        "{} flushed ({}/{} snapshots)",
        "✓".green(),
        kvs.snapshot_count(),
        kvs.snapshot_max_count()
    );
    Ok(())
}

fn cmd_snapshots(kvs: &Kvs) -> anyhow::Result<()> {
    let count = kvs.snapshot_count();
    println!(
        "{count} of {} snapshot(s) present",
        kvs.snapshot_max_count()
    );
    for idx in 0..count {
        let snapshot_id = SnapshotId(idx);
        let marker = if idx == 0 { "current" } else { "older" };
        println!(
            "  {} {} ({})",
            format!("#{idx}").yellow(),
            kvs.kvs_filename(snapshot_id).display(),
            marker.dimmed()
        );
    }
    Ok(())
}

fn cmd_restore(kvs: &mut Kvs, args: RestoreArgs) -> anyhow::Result<()> {
    kvs.snapshot_restore(SnapshotId(args.snapshot))?;
    kvs.flush()?;
    println!("{} restored snapshot {}", "✓".green(), args.snapshot);
    Ok(())
}

fn cmd_reset(kvs: &mut Kvs, args: ResetArgs) -> anyhow::Result<()> {
    match args.key {
        Some(key) => {
            kvs.reset_key(&key)?;
            println!("{} reset {}", "✓".green(), key.bold());
        }
        None => {
            kvs.reset()?;
            println!("{} reset all keys", "✓".green());
        }
    }
    kvs.flush()?;
    Ok(())
}

fn parse_value(kind: &ValueKind, text: &str) -> anyhow::Result<Value> {
    Ok(match kind {
        ValueKind::Null => Value::Null,
        ValueKind::Bool => Value::Bool(text.parse()?),
        ValueKind::I32 => Value::I32(text.parse()?),
        ValueKind::U32 => Value::U32(text.parse()?),
        ValueKind::I64 => Value::I64(text.parse()?),
        ValueKind::U64 => Value::U64(text.parse()?),
        ValueKind::F64 => Value::F64(text.parse()?),
        ValueKind::Str => Value::from(text),
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".dimmed().to_string(),
        Value::Bool(b) => b.to_string().cyan().to_string(),
        Value::I32(n) => n.to_string().cyan().to_string(),
        Value::U32(n) => n.to_string().cyan().to_string(),
        Value::I64(n) => n.to_string().cyan().to_string(),
        Value::U64(n) => n.to_string().cyan().to_string(),
        Value::F64(n) => n.to_string().cyan().to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(|v| render(v)).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{k}: {}", render(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
