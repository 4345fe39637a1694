use std::path::Path;

use anyhow::Context;
use scorestack_core::StageTable;
use scorestack_fanout::{DeploymentGraph, FanOut};
use tracing::info;

pub mod list;
pub mod synth;
pub mod validate;

/// Stage table at `path`, or the built-in one.
fn load(path: Option<&str>) -> anyhow::Result<StageTable> {
    info!(source = path.unwrap_or("built-in"), "loading stage table");
    match path {
        Some(path) => StageTable::from_file(Path::new(path)).with_context(|| format!("loading {path}")),
        None => Ok(StageTable::builtin()?),
    }
}

fn graph(path: Option<&str>) -> anyhow::Result<DeploymentGraph> {
    let table = load(path)?;
    Ok(FanOut::run(&table)?)
}
