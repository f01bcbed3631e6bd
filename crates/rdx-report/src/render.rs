use rdx_validate::{AggregateReport, ArmSummary, ErrorTaxonomy, EvalReport};

use crate::model::ValidationReport;

fn gate_line(name: &str, ok: bool, details: Option<&str>) -> String {
    let marker = if ok { "PASS" } else { "FAIL" };
    match details {
        Some(details) => format!("- {name}: {marker} ({details})"),
        None => format!("- {name}: {marker}"),
    }
}

fn taxonomy_lines(out: &mut Vec<String>, taxonomy: &ErrorTaxonomy, limit: usize) {
    for entry in taxonomy.top(limit) {
        out.push(format!("  - {}: {}", entry.label, entry.count));
    }
}

pub fn render_validation(report: &ValidationReport) -> String {
    let stats = &report.stats;
    let gates = &report.gates;
    let mut out = vec![
        "Dataset Validation Report".to_string(),
        "=========================".to_string(),
        format!("Tasks: {}", stats.total_tasks),
        format!("Families: {}", stats.families),
        format!("Tasks with errors: {}", stats.tasks_with_errors),
        String::new(),
        "Gate Results".to_string(),
        "------------".to_string(),
        gate_line("Pipeline stability", gates.gate_pipeline_stability, None),
        gate_line("Determinism", gates.gate_determinism, None),
        gate_line("Data quality", gates.gate_data_quality, None),
    ];
    let cmp = if gates.gate_iron_purity { ">=" } else { "<" };
    let purity = format!("{:.3} {cmp} {:.3}", stats.purity_ratio, report.purity_threshold);
    out.push(gate_line("Iron purity", gates.gate_iron_purity, Some(&purity)));
    out.push(gate_line("Split hygiene", gates.gate_split_hygiene, None));
    out.push(String::new());

    if stats.behavior_checked > 0 {
        out.push(format!(
            "Behavior checks: {}/{} passed (not gated)",
            stats.behavior_pass_count, stats.behavior_checked
        ));
        out.push(String::new());
    }

    if !report.taxonomy.is_empty() {
        out.push("Top failure classes:".to_string());
        taxonomy_lines(&mut out, &report.taxonomy, 5);
        out.push(String::new());
    }

    if !report.split_errors.is_empty() {
        out.push("Split leakage issues:".to_string());
        out.extend(report.split_errors.iter().map(|e| format!("- {e}")));
        out.push(String::new());
    }

    let mut failing = report.failing_tasks().peekable();
    if failing.peek().is_some() {
        out.push("Per-task failures:".to_string());
        for task in failing {
            out.push(format!("- {} ({}/{})", task.id, task.split_label(), task.family));
            out.extend(task.errors.iter().map(|e| format!("    * {e}")));
        }
    } else {
        out.push("All tasks passed per-task checks.".to_string());
    }

    let mut warned = report.warned_tasks().peekable();
    if warned.peek().is_some() {
        out.push(String::new());
        out.push("Per-task warnings:".to_string());
        for task in warned {
            out.push(format!("- {} ({}/{})", task.id, task.split_label(), task.family));
            out.extend(task.warnings.iter().map(|w| format!("    * {w}")));
        }
    }

    out.push(String::new());
    let overall = if gates.all_pass { "PASS" } else { "FAIL" };
    out.push(format!("Overall: {overall}"));
    out.join("\n") + "\n"
}

fn render_arm(out: &mut Vec<String>, data: &ArmSummary) {
    let n = data.total;
    out.push(format!("{}:", data.arm.as_str().to_uppercase()));
    out.push(format!("- total: {n}"));
    out.push(format!("- transform pass: {}/{n}", data.transform_pass));
    out.push(format!("- compile@1: {}/{n} = {:.3}", data.compile_pass, data.compile_at_1));
    out.push(format!("- test@1: {}/{n} = {:.3}", data.test_pass, data.test_at_1));
    out.push("- per_family:".to_string());
    for (family, counts) in &data.per_family {
        out.push(format!(
            "  - {family}: compile {}/{}, test {}/{}",
            counts.compile, counts.total, counts.test, counts.total
        ));
    }

    let phases = &data.failure_phase_counts;
    if phases.transform + phases.compile + phases.test > 0 {
        out.push(format!(
            "- failure phase counts: transform={}, compile={}, test={}",
            phases.transform, phases.compile, phases.test
        ));
    }
    if !data.failure_taxonomy.is_empty() {
        out.push("- top failure classes:".to_string());
        taxonomy_lines(out, &data.failure_taxonomy, 5);
    }
    let by_family: Vec<String> = data
        .per_family_failure_taxonomy
        .iter()
        .filter(|(_, taxonomy)| !taxonomy.is_empty())
        .map(|(family, taxonomy)| {
            let rendered: Vec<String> = taxonomy
                .top(3)
                .iter()
                .map(|e| format!("{}={}", e.label, e.count))
                .collect();
            format!("  - {family}: {}", rendered.join(", "))
        })
        .collect();
    if !by_family.is_empty() {
        out.push("- top failure classes by family:".to_string());
        out.extend(by_family);
    }
    out.push(String::new());
}

pub fn render_evaluation(report: &EvalReport) -> String {
    let mut out = Vec::new();
    for arm in report.arms() {
        render_arm(&mut out, arm);
    }
    out.join("\n") + "\n"
}

pub fn render_aggregate(agg: &AggregateReport) -> String {
    let mut out = vec![format!("Reports aggregated: {}", agg.num_reports)];
    let arms = [
        ("RUST", &agg.summary.rust, &agg.error_taxonomy.rust),
        ("IRON", &agg.summary.iron, &agg.error_taxonomy.iron),
    ];
    for (name, s, taxonomy) in arms {
        out.push(String::new());
        out.push(name.to_string());
        out.push(format!(
            "- compile@1 mean±std: {:.3} ± {:.3}",
            s.compile_at_1.mean, s.compile_at_1.std
        ));
        out.push(format!("- test@1 mean±std: {:.3} ± {:.3}", s.test_at_1.mean, s.test_at_1.std));
        out.push(format!(
            "- transform mean±std: {:.3} ± {:.3}",
            s.transform_rate.mean, s.transform_rate.std
        ));
        out.push("- top failure classes:".to_string());
        taxonomy_lines(&mut out, taxonomy, 5);
    }

    let d = &agg.delta_iron_minus_rust;
    out.push(String::new());
    out.push("IRON - RUST".to_string());
    out.push(format!("- compile@1 mean delta: {:+.3}", d.compile_at_1_mean));
    out.push(format!("- test@1 mean delta: {:+.3}", d.test_at_1_mean));
    out.join("\n") + "\n"
}
