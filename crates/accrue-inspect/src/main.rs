//! accrue-inspect: read-only view of a reward accumulator store.
//!
//! ```text
//! accrue-inspect                 list every accumulator
//! accrue-inspect <name>          one accumulator and its positions
//! accrue-inspect <name> <index>  one position and what it is owed
//! ```
//!
//! The store is located through the config file named by `ACCRUE_CONFIG`
//! and opened read-only; a missing or unmigrated database is an error.
//! Output is JSON on stdout.

mod config;

use accrue_accum::{AccumulatorObject, Position, PositionOptions};
use accrue_store::SqliteStore;
use accrue_types::{Decimal, RewardVector};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::InspectConfig;

/// A position together with its computed entitlement.
#[derive(Debug, Serialize)]
struct PositionView {
    index: String,
    num_shares: Decimal,
    accum_value_per_share: RewardVector,
    unclaimed_rewards_total: RewardVector,
    owed: RewardVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<PositionOptions>,
}

/// An accumulator and every open position.
#[derive(Debug, Serialize)]
struct AccumulatorView {
    #[serde(flatten)]
    accumulator: AccumulatorObject,
    outstanding: RewardVector,
    positions: Vec<PositionView>,
}

fn position_view(
    accum: &AccumulatorObject,
    index: String,
    position: Position,
) -> anyhow::Result<PositionView> {
    let owed = accum.get_total_rewards(&position)?;
    Ok(PositionView {
        index,
        num_shares: position.num_shares,
        accum_value_per_share: position.accum_value_per_share,
        unclaimed_rewards_total: position.unclaimed_rewards_total,
        owed,
        options: position.options,
    })
}

fn accumulator_view(store: &SqliteStore, name: &str) -> anyhow::Result<AccumulatorView> {
    let accumulator = AccumulatorObject::load(store, name)?;
    let mut outstanding = RewardVector::new();
    let mut positions = Vec::new();
    for (index, position) in accumulator.positions(store)? {
        let view = position_view(&accumulator, index, position)?;
        outstanding = outstanding.add(&view.owed)?;
        positions.push(view);
    }
    debug!(
        accumulator = %name,
        positions = positions.len(),
        "accumulator loaded"
    );
    Ok(AccumulatorView {
        accumulator,
        outstanding,
        positions,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn usage() {
    eprintln!("usage: accrue-inspect [<accumulator> [<index>]]");
    eprintln!("  config file: ${}", config::CONFIG_ENV);
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") || args.len() > 2 {
        usage();
        return Ok(());
    }

    let config = InspectConfig::load()?;

    // RUST_LOG wins over the config file.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log.level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = config.store.db_path() else {
        anyhow::bail!("no store path configured (see ${})", config::CONFIG_ENV);
    };
    let store = SqliteStore::open_read_only(&path)?;
    info!(path = %path.display(), "inspecting store");

    match args.as_slice() {
        [] => print_json(&accrue_accum::list_accumulators(&store)?),
        [name] => print_json(&accumulator_view(&store, name)?),
        [name, index] => {
            let accum = AccumulatorObject::load(&store, name)?;
            let position = accum.get_position(&store, index)?;
            print_json(&position_view(&accum, index.clone(), position)?)
        }
        _ => {
            usage();
            Ok(())
        }
    }
}
