use std::path::Path;

use docbot_types::model::DiffReport;

/// Resolve `from`/`to` run IDs against the snapshot history (defaulting to
/// the two most recent runs) and print a human-readable diff.
pub fn run(docbot_dir: &Path, from: Option<String>, to: Option<String>) -> anyhow::Result<()> {
    let snapshots = docbot_state::list_snapshots(docbot_dir);
    if snapshots.len() < 2 && (from.is_none() || to.is_none()) {
        anyhow::bail!("need at least two snapshots to diff (found {})", snapshots.len());
    }

    let to_snapshot = match &to {
        Some(id) => snapshots.iter().find(|s| &s.run_id == id).cloned(),
        None => snapshots.first().cloned(),
    }
    .ok_or_else(|| anyhow::anyhow!("run ID not found in history"))?;

    let from_snapshot = match &from {
        Some(id) => snapshots.iter().find(|s| &s.run_id == id).cloned(),
        None => snapshots.iter().find(|s| s.run_id != to_snapshot.run_id).cloned(),
    }
    .ok_or_else(|| anyhow::anyhow!("run ID not found in history"))?;

    let report = docbot_state::compute_diff(&from_snapshot, &to_snapshot);
    print_report(&report);
    Ok(())
}

fn print_report(report: &DiffReport) {
    println!("Diff: {} -> {}\n", report.from_run_id, report.to_run_id);

    if report.added_scopes.is_empty() && report.removed_scopes.is_empty() && report.modified_scopes.is_empty() {
        println!("No changes.");
    } else {
        for scope in &report.added_scopes {
            println!("  + scope {scope}");
        }
        for scope in &report.removed_scopes {
            println!("  - scope {scope}");
        }
        for modified in &report.modified_scopes {
            println!("  ~ scope {}", modified.scope_id);
        }
    }

    println!(
        "\nFiles: {:+}  Lines: {:+}",
        report.stats_delta.file_count_delta, report.stats_delta.loc_delta
    );
}
