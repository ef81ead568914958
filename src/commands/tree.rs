use anyhow::Result;
use depmon::{PackageIdentity, PackageInfo, TransitiveDependencies};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub async fn run(solution_path: &Path) -> Result<()> {
    let (session, solution) = super::load(solution_path)?;
    let report = depmon::audit(&session, solution.entries, &solution.contexts).await?;

    for walk in &report.projects {
        println!("{}", walk.project);

        if walk.top_level.is_empty() && walk.inherited.is_empty() {
            println!("    (no dependencies)");
            println!();
            continue;
        }

        let children = children_by_parent(walk);
        let mut visited = HashSet::new();

        let mut roots: Vec<&Arc<PackageInfo>> = walk.top_level.iter().collect();
        roots.sort_by(|a, b| a.id().cmp(b.id()));
        let root_count = roots.len();
        for (index, root) in roots.into_iter().enumerate() {
            let is_last = index == root_count - 1 && walk.inherited.is_empty();
            print_node(root, "", is_last, &children, &mut visited);
        }

        let mut inherited: Vec<&Arc<PackageInfo>> = walk.inherited.values().collect();
        inherited.sort_by(|a, b| a.id().cmp(b.id()));
        let inherited_count = inherited.len();
        for (index, node) in inherited.into_iter().enumerate() {
            let connector = if index == inherited_count - 1 {
                "└── "
            } else {
                "├── "
            };
            println!("{}{} (inherited)", connector, display(node));
        }

        println!();
    }

    Ok(())
}

/// Child adjacency derived from the walk's parent pointers.
fn children_by_parent(
    walk: &TransitiveDependencies,
) -> HashMap<PackageIdentity, Vec<&Arc<PackageInfo>>> {
    let mut children: HashMap<PackageIdentity, Vec<&Arc<PackageInfo>>> = HashMap::new();
    for (child, parents) in walk.transitive.iter() {
        for parent in parents {
            children
                .entry(parent.identity().clone())
                .or_default()
                .push(child);
        }
    }
    for list in children.values_mut() {
        list.sort_by(|a, b| a.id().cmp(b.id()));
    }
    children
}

fn display(node: &Arc<PackageInfo>) -> String {
    match node.issue_summary() {
        Some(summary) => format!("{} ({})", node.identity(), summary),
        None => node.identity().to_string(),
    }
}

fn print_node(
    node: &Arc<PackageInfo>,
    prefix: &str,
    is_last: bool,
    children: &HashMap<PackageIdentity, Vec<&Arc<PackageInfo>>>,
    visited: &mut HashSet<PackageIdentity>,
) {
    let connector = if is_last { "└── " } else { "├── " };
    let label = display(node);

    let deps = children.get(node.identity());
    let has_children = deps.is_some_and(|d| !d.is_empty());

    if !visited.insert(node.identity().clone()) {
        if has_children {
            println!("{}{}{} (already shown)", prefix, connector, label);
        } else {
            println!("{}{}{}", prefix, connector, label);
        }
        return;
    }

    println!("{}{}{}", prefix, connector, label);

    if let Some(deps) = deps {
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        for (index, child) in deps.iter().enumerate() {
            print_node(
                *child,
                &child_prefix,
                index == deps.len() - 1,
                children,
                visited,
            );
        }
    }
}
