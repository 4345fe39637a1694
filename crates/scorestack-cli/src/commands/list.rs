pub fn list(config: Option<&str>) -> anyhow::Result<()> {
    let graph = super::graph(config)?;
    println!("pipeline {} ({}/{})", graph.pipeline.name, graph.pipeline.account_id, graph.pipeline.region);
    for group in &graph.groups {
        let ticketed = group.alarms.iter().filter(|a| a.is_ticketed()).count();
        println!(
            "\n{}  account {}  alarms {} ({} ticketed)",
            group.name(),
            group.target.account_id,
            group.alarms.len(),
            ticketed
        );
        for stack in group.deployment_order()? {
            let deps: Vec<&str> = stack.dependencies().iter().map(String::as_str).collect();
            if deps.is_empty() {
                println!("  {}", stack.id);
            } else {
                println!("  {}  <- {}", stack.id, deps.join(", "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_builtin_table() {
        list(None).unwrap();
    }

    #[test]
    fn list_reports_missing_config() {
        assert!(list(Some("/nonexistent/stages.toml")).is_err());
    }
}
