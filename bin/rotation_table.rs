// Prayer Rotation - Redistribution table tool
//
// Offline companion to the engine: shows which elder meets their own family
// at which cycle position and derives a table to check in. Rerun whenever
// the directory or roster changes.

use anyhow::{Context, Result};
use clap::Parser;
use envconfig::Envconfig;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use prayer_rotation::{
    cycle_overview, derive_table, find_conflicts, logging, Config, PoolSet, RedistributionTable,
};

#[derive(Parser)]
#[command(name = "rotation-table", version, about = "Analyse conflicts and derive a redistribution table")]
struct Args {
    /// Write the derived table as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init(None)?;

    let args = Args::parse();
    let config = Config::init_from_env()?;

    let directory = config.load_directory()?;
    let roster = config.load_roster()?;
    roster.validate_against(&directory)?;

    let pools = PoolSet::partition(directory.families(), roster.pool_count())?;
    let band = pools.balance_band();

    println!("📊 Pool analysis");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Families: {}   Pools: {}   Band: {}-{}", pools.total(), pools.len(), band.min, band.max);
    println!("Pool sizes: {:?}", pools.sizes());

    println!("\n🏠 Elder families");
    for elder in roster.elders() {
        match pools.home_pool(&elder.family) {
            Some(pool) => println!("   {:<20} pool {}", elder.name, pool),
            None => println!("   {:<20} NOT IN DIRECTORY", elder.name),
        }
    }

    // ========================================================================
    // CONFLICTS PER CYCLE POSITION
    // ========================================================================

    let conflicts = find_conflicts(&roster, &pools);
    let overview = cycle_overview(&roster, &pools);

    println!("\n🔄 Cycle positions");
    for (cycle_position, slots) in overview.iter().enumerate() {
        println!("\n   Position {} (weeks {}, {}, ...)", cycle_position, cycle_position + 1, cycle_position + 1 + pools.len());
        for slot in slots {
            let marker = if slot.conflicted { "  ⚠️  own family filtered" } else { "" };
            println!(
                "      {:<20} pool {}  {:>2} families{}",
                slot.elder, slot.pool, slot.filtered_size, marker
            );
        }
    }

    println!("\n⚠️  {} conflict(s) across one cycle", conflicts.len());

    // ========================================================================
    // DERIVED TABLE
    // ========================================================================

    let derived = derive_table(&roster, &pools)?;

    println!("\n📋 Derived redistribution table");
    for entry in derived.entries() {
        println!(
            "   position {}: {:<20} → {}",
            entry.cycle_position, entry.owner, entry.receiver
        );
    }

    let configured: RedistributionTable = config.load_table()?;
    let missing = configured.missing(&conflicts);
    let stale = configured.stale(&conflicts);

    println!("\n🔍 Configured table");
    if missing.is_empty() && stale.is_empty() {
        println!("   ✅ Covers every conflict");
    }
    for gap in &missing {
        println!("   ❌ Missing: {} at position {}", gap.owner, gap.cycle_position);
    }
    for entry in &stale {
        println!("   ⚠️  Stale: {} at position {}", entry.owner, entry.cycle_position);
    }

    if let Some(path) = args.output {
        fs::write(&path, derived.to_json()?)
            .with_context(|| format!("Failed to write table: {}", path.display()))?;
        info!(path = %path.display(), entries = derived.len(), "wrote redistribution table");
    }

    Ok(())
}
