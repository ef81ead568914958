use anyhow::{bail, Result};
use depmon::version::parse_lenient;
use depmon::PackageId;
use std::path::Path;

pub async fn run(solution_path: &Path, package: &str, version: Option<&str>) -> Result<()> {
    let (session, solution) = super::load(solution_path)?;
    let central_file = solution.central_file.clone();
    let report = depmon::audit(&session, solution.entries, &solution.contexts).await?;

    let id = PackageId::new(package);
    let matching: Vec<_> = report
        .references
        .iter()
        .filter(|r| r.reference().id == id)
        .collect();

    if matching.is_empty() {
        bail!("no reference to '{}' found in the solution", package);
    }

    let mut updates = Vec::new();
    for reference in matching {
        let target = match version {
            Some(text) => parse_lenient(text)?,
            None => match depmon::latest_matching(reference) {
                Some(latest) => latest,
                None => {
                    println!(
                        "  {} {} is already up to date",
                        reference.reference().id,
                        reference.reference().range
                    );
                    continue;
                }
            },
        };
        updates.extend(depmon::plan_update(
            reference,
            &target,
            central_file.as_ref(),
        ));
    }

    if updates.is_empty() {
        println!();
        println!("Nothing to update.");
        return Ok(());
    }

    println!();
    println!("Would apply {} edit(s):", updates.len());
    for update in &updates {
        println!("  {}", update);
    }
    println!();
    println!("No files were modified. Apply the edits with your manifest tooling.");

    Ok(())
}
