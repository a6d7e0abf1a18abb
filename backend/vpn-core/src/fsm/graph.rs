use super::states::{StateId, StateRegistry};

use std::fmt::Write as _;
use std::path::Path;

pub const GRAPH_FILE_NAME: &str = "fsm.graph";

/// Renders the transition table as a Mermaid flowchart with `current` highlighted.
pub fn render(registry: &StateRegistry, current: StateId) -> String {
    let mut graph = String::from("graph TD\n");
    for (from, transition) in registry.iter() {
        let _ = writeln!(
            graph,
            "{from}({from}) -->|{description}| {to}",
            from = from.name(),
            description = transition.description,
            to = transition.to.name(),
        );
    }
    let _ = writeln!(graph, "\nstyle {} fill:cyan", current.name());
    graph
}

pub fn write(dir: &Path, registry: &StateRegistry, current: StateId) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(GRAPH_FILE_NAME), render(registry, current))
}
