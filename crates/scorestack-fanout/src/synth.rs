//! Template synthesis: one JSON template per stack plus a manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use scorestack_core::PipelineMeta;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{FanOutError, FanOutResult};
use crate::graph::DeploymentGraph;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub pipeline: PipelineMeta,
    pub groups: Vec<GroupManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupManifest {
    pub name: String,
    pub stage: String,
    pub environment: String,
    pub deployment_order: Vec<String>,
    pub stacks: BTreeMap<String, StackManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackManifest {
    pub template: String,
    pub sha256: String,
    pub resources: usize,
    pub dependencies: Vec<String>,
}

const TEMPLATE_EXTENSION: &str = ".template.json";

pub fn template_file(stack_id: &str) -> String {
    format!("{stack_id}{TEMPLATE_EXTENSION}")
}

/// Write every template of `graph` and the manifest into `out_dir`.
pub fn synthesize(graph: &DeploymentGraph, out_dir: &Path) -> FanOutResult<Manifest> {
    fs::create_dir_all(out_dir).map_err(|source| FanOutError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    clear_templates(out_dir)?;

    let mut groups = Vec::with_capacity(graph.groups.len());
    for group in &graph.groups {
        let order = group.deployment_order()?;
        let mut stacks = BTreeMap::new();
        for stack in &order {
            let rendered = stack.to_template_string()?;
            let file = template_file(&stack.id);
            write(&out_dir.join(&file), &rendered)?;
            let sha256 = hex::encode(Sha256::digest(rendered.as_bytes()));
            debug!(stack = %stack.id, sha256 = %sha256, "wrote template");
            stacks.insert(
                stack.id.clone(),
                StackManifest {
                    template: file,
                    sha256,
                    resources: stack.resources().len(),
                    dependencies: stack.dependencies().iter().cloned().collect(),
                },
            );
        }
        groups.push(GroupManifest {
            name: group.name(),
            stage: group.target.stage_name.clone(),
            environment: order
                .first()
                .map(|s| s.env.uri())
                .unwrap_or_else(|| format!("aws://{}/{}", group.target.account_id, group.target.region)),
            deployment_order: order.iter().map(|s| s.id.clone()).collect(),
            stacks,
        });
    }

    let manifest = Manifest {
        pipeline: graph.pipeline.clone(),
        groups,
    };
    write(&out_dir.join(MANIFEST_FILE), &serde_json::to_string_pretty(&manifest)?)?;
    info!(
        out_dir = %out_dir.display(),
        stacks = graph.stack_count(),
        "synthesized deployment graph"
    );
    Ok(manifest)
}

/// Remove templates left by an earlier run so the directory matches the manifest.
fn clear_templates(out_dir: &Path) -> FanOutResult<()> {
    let io_err = |source| FanOutError::Io {
        path: out_dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(out_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_template = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(TEMPLATE_EXTENSION));
        if is_template && path.is_file() {
            fs::remove_file(&path).map_err(|source| FanOutError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "removed stale template");
        }
    }
    Ok(())
}

fn write(path: &Path, content: &str) -> FanOutResult<()> {
    fs::write(path, content).map_err(|source| FanOutError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_file_name() {
        assert_eq!(template_file("Network-Devo-eu-west-1"), "Network-Devo-eu-west-1.template.json");
    }
}
