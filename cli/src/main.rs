//! ledgerindex CLI — inspect index store and checkpoint state.
//!
//! Usage:
//! ```bash
//! ledgerindex info
//! ledgerindex dbs
//! ledgerindex checkpoint /var/lib/ledgerindex/checkpoint
//! ledgerindex stats /var/lib/ledgerindex/index
//! ```

use std::env;
use std::process;

use anyhow::Context;

use ledgerindex_core::checkpoint::{CheckpointStore, FileCheckpointStore};
use ledgerindex_engine::EngineBuilder;
use ledgerindex_store::{IndexDb, IndexStore, ScanMode, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "info" => cmd_info(),
        "dbs" => cmd_dbs(),
        "checkpoint" => cmd_checkpoint(args.get(2)).await?,
        "stats" => cmd_stats(args.get(2))?,
        "version" | "--version" | "-V" => {
            println!("ledgerindex {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
    Ok(())
}

fn print_usage() {
    println!("ledgerindex {}", env!("CARGO_PKG_VERSION"));
    println!("Checkpointed secondary-index engine for ledger transaction attributes\n");
    println!("USAGE:");
    println!("    ledgerindex <COMMAND> [ARGS]\n");
    println!("COMMANDS:");
    println!("    info                Show LedgerIndex configuration defaults");
    println!("    dbs                 List the index sub-databases");
    println!("    checkpoint <PATH>   Print the checkpoint persisted at PATH");
    println!("    stats <PATH>        Count entries per sub-database of the store at PATH");
    println!("    version             Print version");
    println!("    help                Print this help");
}

fn cmd_info() {
    let defaults = EngineBuilder::new().build_config();
    println!("LedgerIndex v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default confirmation lag: {} blocks", defaults.confirmation_lag);
    println!("  Default batch size: {} block(s)/transaction", defaults.batch_size);
    println!("  Default poll interval: {} ms", defaults.poll_interval_ms);
    println!("  Storage backend: RocksDB ({} sub-databases)", IndexDb::ALL.len());
}

fn cmd_dbs() {
    for db in IndexDb::ALL {
        println!("{:<20} {:?}", db.name(), db.kind());
    }
}

async fn cmd_checkpoint(path: Option<&String>) -> anyhow::Result<()> {
    let path = path.context("usage: ledgerindex checkpoint <PATH>")?;
    let store = FileCheckpointStore::new(path);
    match store.load().await? {
        Some(height) => println!("{height}"),
        None => println!("(no checkpoint)"),
    }
    Ok(())
}

fn cmd_stats(path: Option<&String>) -> anyhow::Result<()> {
    let path = path.context("usage: ledgerindex stats <PATH>")?;
    let store = IndexStore::open(StoreConfig::new(path))
        .with_context(|| format!("opening index store at {path}"))?;

    let read = store.begin_read();
    for db in IndexDb::ALL {
        let mut count: u64 = 0;
        for entry in read.scan(db, &[], ScanMode::RangeFrom)? {
            entry?;
            count += 1;
        }
        println!("{:<20} {count}", db.name());
    }
    Ok(())
}
