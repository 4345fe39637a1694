use anyhow::Context;

pub fn validate(config: Option<&str>) -> anyhow::Result<()> {
    let graph = super::graph(config)?;
    for group in &graph.groups {
        for stack in &group.stacks {
            stack
                .to_template()
                .with_context(|| format!("rendering {}", stack.id))?;
        }
    }
    println!("✓ {} groups, {} stacks valid", graph.groups.len(), graph.stack_count());
    Ok(())
}
