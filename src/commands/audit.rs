use anyhow::Result;
use depmon::{AuditReport, PackageInfo, TransitiveDependencies};
use std::path::Path;
use std::sync::Arc;

pub async fn run(solution_path: &Path, all: bool) -> Result<()> {
    let (session, solution) = super::load(solution_path)?;

    println!(
        "Auditing {} reference entries across {} projects...",
        solution.entries.len(),
        solution.contexts.len()
    );
    println!();

    let report = depmon::audit(&session, solution.entries, &solution.contexts).await?;

    print_references(&report, all);
    print_transitive(&report);

    let flagged = report.flagged().count();
    println!();
    if flagged == 0 {
        println!("✓ No issues in {} references", report.references.len());
    } else {
        println!(
            "✗ {} of {} references flagged",
            flagged,
            report.references.len()
        );
    }

    Ok(())
}

fn print_references(report: &AuditReport, all: bool) {
    for reference in &report.references {
        let declared = format!("{} {}", reference.reference().id, reference.reference().range);

        let Some(info) = reference.resolved() else {
            println!("? {} (no matching version in any registry)", declared);
            continue;
        };

        match info.issue_summary() {
            Some(summary) => {
                println!("✗ {} -> {} ({})", declared, info.version(), summary);
                print_issue_details(info, "    ");
            }
            None if all => println!("✓ {} -> {}", declared, info.version()),
            None => {}
        }
    }
}

fn print_issue_details(info: &Arc<PackageInfo>, indent: &str) {
    if info.is_outdated() {
        println!("{}latest: {}", indent, info.catalog().newest());
    }
    if let Some(deprecation) = info.deprecation() {
        if let Some(message) = &deprecation.message {
            println!("{}deprecated: {}", indent, message);
        }
        if let Some(alternate) = &deprecation.alternate {
            println!("{}alternate: {}", indent, alternate.id);
        }
    }
    for vulnerability in info.vulnerabilities() {
        println!(
            "{}advisory ({}): {}",
            indent, vulnerability.severity, vulnerability.advisory_url
        );
    }
}

fn print_transitive(report: &AuditReport) {
    let mut header_printed = false;

    for walk in &report.projects {
        let flagged: Vec<_> = walk
            .transitive
            .iter()
            .filter(|(node, _)| node.has_issues())
            .collect();
        let flagged_inherited: Vec<_> = walk
            .inherited
            .values()
            .filter(|node| node.has_issues())
            .collect();

        if flagged.is_empty() && flagged_inherited.is_empty() {
            continue;
        }
        if !header_printed {
            println!();
            println!("Transitive issues:");
            header_printed = true;
        }
        println!("  {}:", walk.project);

        for (node, parents) in flagged {
            let summary = node.issue_summary().unwrap_or_default();
            let mut via: Vec<String> = parents.iter().map(|p| p.identity().to_string()).collect();
            via.sort();
            print!(
                "    ✗ {} ({}) via {}",
                node.identity(),
                summary,
                via.join(", ")
            );
            print_annotations(walk, node);
            println!();
        }

        for node in flagged_inherited {
            let summary = node.issue_summary().unwrap_or_default();
            println!("    ✗ {} ({}) inherited from central versions", node.identity(), summary);
        }
    }
}

fn print_annotations(walk: &TransitiveDependencies, node: &Arc<PackageInfo>) {
    if let Some(annotations) = walk.annotations_for(node.identity()) {
        if annotations.pinned {
            print!(" [pinned]");
        }
        if let Some(justification) = &annotations.mitigation {
            print!(" [mitigated: {}]", justification);
        }
    }
}
