use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::summary::{ArmSummary, ErrorTaxonomy, EvalReport};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

/// Mean and population standard deviation; empty input gives zeros.
pub fn mean_std(values: &[f64]) -> MeanStd {
    if values.is_empty() {
        return MeanStd::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() == 1 {
        return MeanStd { mean, std: 0.0 };
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    MeanStd {
        mean,
        std: variance.sqrt(),
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ArmAggregate {
    pub compile_at_1: MeanStd,
    pub test_at_1: MeanStd,
    pub transform_rate: MeanStd,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FamilyAggregate {
    pub compile: MeanStd,
    pub test: MeanStd,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PerArm<T> {
    pub rust: T,
    pub iron: T,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ArmDelta {
    pub compile_at_1_mean: f64,
    pub test_at_1_mean: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateReport {
    pub num_reports: usize,
    pub summary: PerArm<ArmAggregate>,
    pub per_family: PerArm<BTreeMap<String, FamilyAggregate>>,
    pub error_taxonomy: PerArm<ErrorTaxonomy>,
    pub delta_iron_minus_rust: ArmDelta,
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn aggregate_arm<'a>(
    arms: impl Iterator<Item = &'a ArmSummary> + Clone,
) -> (ArmAggregate, BTreeMap<String, FamilyAggregate>, ErrorTaxonomy) {
    let collect = |f: fn(&ArmSummary) -> f64| arms.clone().map(f).collect::<Vec<_>>();
    let summary = ArmAggregate {
        compile_at_1: mean_std(&collect(|a| a.compile_at_1)),
        test_at_1: mean_std(&collect(|a| a.test_at_1)),
        transform_rate: mean_std(&collect(ArmSummary::transform_rate)),
    };

    let mut family_rates: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for arm in arms.clone() {
        for (family, counts) in &arm.per_family {
            let (compile, test) = family_rates.entry(family.clone()).or_default();
            compile.push(rate(counts.compile, counts.total));
            test.push(rate(counts.test, counts.total));
        }
    }
    let per_family = family_rates
        .into_iter()
        .map(|(family, (compile, test))| {
            let agg = FamilyAggregate {
                compile: mean_std(&compile),
                test: mean_std(&test),
            };
            (family, agg)
        })
        .collect();

    // Stored labels may come from an older classifier; re-derive them from the rows.
    let taxonomy = ErrorTaxonomy::from_labels(
        arms.flat_map(|a| a.rows.iter())
            .filter_map(|row| row.failure_class())
            .map(|(_, label)| label),
    );

    (summary, per_family, taxonomy)
}

/// Combine evaluation reports (typically one per seed).
pub fn aggregate_reports(reports: &[EvalReport]) -> AggregateReport {
    let (rust, rust_family, rust_taxonomy) = aggregate_arm(reports.iter().map(|r| &r.rust));
    let (iron, iron_family, iron_taxonomy) = aggregate_arm(reports.iter().map(|r| &r.iron));
    let delta = ArmDelta {
        compile_at_1_mean: iron.compile_at_1.mean - rust.compile_at_1.mean,
        test_at_1_mean: iron.test_at_1.mean - rust.test_at_1.mean,
    };
    AggregateReport {
        num_reports: reports.len(),
        summary: PerArm { rust, iron },
        per_family: PerArm {
            rust: rust_family,
            iron: iron_family,
        },
        error_taxonomy: PerArm {
            rust: rust_taxonomy,
            iron: iron_taxonomy,
        },
        delta_iron_minus_rust: delta,
    }
}
