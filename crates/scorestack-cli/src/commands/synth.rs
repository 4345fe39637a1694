use std::path::Path;

use scorestack_fanout::synthesize;

pub fn synth(config: Option<&str>, out: &str) -> anyhow::Result<()> {
    let graph = super::graph(config)?;
    let manifest = synthesize(&graph, Path::new(out))?;
    let stacks: usize = manifest.groups.iter().map(|g| g.stacks.len()).sum();
    println!(
        "✓ Synthesized {} stacks in {} groups to {}",
        stacks,
        manifest.groups.len(),
        out
    );
    Ok(())
}
