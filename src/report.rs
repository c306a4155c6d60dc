use std::io::{self, Write};

use hrflow_core::catalog::ActionCatalog;
use hrflow_core::types::{SimulationResult, SimulationStep, StepStatus};
use hrflow_graph::{GraphStore, ValidationReport};

pub fn print_workflow(store: &GraphStore) {
    println!("{} ({})", store.name(), store.workflow_id());
    println!();
    println!("Nodes ({}):", store.nodes().len());
    for node in store.nodes() {
        println!(
            "  {:<44} {:<10} {:<24} ({:.0}, {:.0})",
            node.id,
            node.kind().as_str(),
            node.label(),
            node.position.x,
            node.position.y
        );
    }
    println!();
    println!("Edges ({}):", store.edges().len());
    for edge in store.edges() {
        println!("  {:<44} {} -> {}", edge.id, edge.source, edge.target);
    }
}

pub fn print_validation(report: &ValidationReport) {
    // Nothing sensible to do if stdout is gone
    let _ = write_validation(&mut io::stdout().lock(), report);
}

pub fn write_validation(out: &mut impl Write, report: &ValidationReport) -> io::Result<()> {
    if report.is_clean() {
        writeln!(out, "  [OK] Workflow is valid")?;
        return Ok(());
    }
    for error in &report.errors {
        writeln!(out, "  [!!] {}", error)?;
    }
    for warning in &report.warnings {
        writeln!(out, "  [??] {}", warning)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "  {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    )
}

/// Findings shown before a simulation starts. Warnings never block; errors
/// block unless `force` is set.
pub fn preflight(
    out: &mut impl Write,
    report: &ValidationReport,
    force: bool,
) -> anyhow::Result<()> {
    if !report.is_clean() {
        write_validation(out, report)?;
        writeln!(out)?;
    }
    if !report.is_valid() && !force {
        anyhow::bail!(
            "workflow has {} validation errors (use --skip-validation to run anyway)",
            report.errors.len()
        );
    }
    Ok(())
}

pub fn print_step(step: &SimulationStep) {
    let icon = match step.status {
        StepStatus::Completed => "[OK]",
        StepStatus::Failed => "[!!]",
        StepStatus::Warning => "[??]",
        StepStatus::Pending => "[..]",
    };
    println!(
        "  {} {:>3}. {}  {}",
        icon,
        step.step,
        step.timestamp.format("%H:%M:%S"),
        step.action
    );
}

pub fn print_summary(result: &SimulationResult) {
    println!();
    println!(
        "  {} steps, success rate {}, duration {}",
        result.summary.total_steps, result.summary.success_rate, result.summary.duration
    );
}

pub fn print_actions(catalog: &ActionCatalog) {
    for action in catalog.list() {
        println!("  {:<20} {}", action.id, action.label);
        if !action.description.is_empty() {
            println!("  {:<20} {}", "", action.description);
        }
        if !action.params.is_empty() {
            println!("  {:<20} params: {}", "", action.params.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(errors: &[&str], warnings: &[&str]) -> ValidationReport {
        ValidationReport {
            errors: errors.iter().map(|e| e.to_string()).collect(),
            warnings: warnings.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn run(report: &ValidationReport, force: bool) -> (anyhow::Result<()>, String) {
        let mut out = Vec::new();
        let result = preflight(&mut out, report, force);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_preflight_shows_warnings_and_continues() {
        let (result, text) = run(
            &report(&[], &["Node \"Review\" has no outgoing connections"]),
            false,
        );
        assert!(result.is_ok());
        assert!(text.contains("[??] Node \"Review\" has no outgoing connections"));
        assert!(text.contains("0 errors, 1 warnings"));
    }

    #[test]
    fn test_preflight_blocks_on_errors() {
        let (result, text) = run(
            &report(&["Workflow must have an End node"], &["Possible cycle"]),
            false,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("1 validation errors"));
        assert!(text.contains("[!!] Workflow must have an End node"));
        assert!(text.contains("[??] Possible cycle"));
    }

    #[test]
    fn test_preflight_forced_still_reports() {
        let (result, text) = run(&report(&["Workflow must have a Start node"], &[]), true);
        assert!(result.is_ok());
        assert!(text.contains("[!!] Workflow must have a Start node"));
    }

    #[test]
    fn test_preflight_clean_is_silent() {
        let (result, text) = run(&report(&[], &[]), false);
        assert!(result.is_ok());
        assert!(text.is_empty());
    }
}
