use std::io::Write;

use anyhow::Result;
use mga_core::{Diagnostic, MgaRun, SampleTable};

/// Write the sample table as CSV: one row per sample, one column per variable
pub fn write_csv<W: Write>(table: &SampleTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["sample".to_string(), "objective".to_string(), "total_cost".to_string()];
    header.extend(table.columns.iter().cloned());
    csv.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![
            row.sample.clone(),
            row.objective_value.to_string(),
            row.total_cost.to_string(),
        ];
        // Absent values stay empty rather than zero
        record.extend(row.values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn print_pretty(run: &MgaRun) {
    let baseline = run.samples.baseline();
    println!("Global optimum cost: {:.4}", baseline.objective_value);
    println!("Cost ceiling:        {:.4}", run.ceiling);
    println!();

    for sample in &run.samples {
        println!("Sample: {}", sample.id);
        println!("  objective  {:12.4}", sample.objective_value);
        println!("  total cost {:12.4}", sample.total_cost);
        for (id, value) in &sample.values {
            println!("  {:30} {:12.4}", id, value);
        }
        println!();
    }

    let spread = run.samples.spread();
    if !spread.is_empty() {
        println!("Spread across alternatives:");
        println!("  {:30} {:>12} {:>12} {:>12}", "variable", "optimum", "min", "max");
        for (id, s) in &spread {
            let baseline = s.baseline.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
            println!("  {:30} {:>12} {:12.4} {:12.4}", id, baseline, s.min, s.max);
        }
        println!();
    }

    if !run.diagnostics.is_empty() {
        println!("Diagnostics:");
        for d in &run.diagnostics {
            println!("  {}", describe(d));
        }
    }
}

pub fn describe(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::NoMatchingVariables { target, .. } => {
            format!("warning: '{}' matches no investment variables; sample is any feasible point", target)
        }
        Diagnostic::SolveFailed(failure) => format!("failed: {}", failure),
        Diagnostic::CostCeilingExceeded {
            target,
            total_cost,
            ceiling,
            ..
        } => format!(
            "failed: '{}' returned cost {:.4} above the ceiling {:.4}",
            target, total_cost, ceiling
        ),
        Diagnostic::Cancelled { target, .. } => format!("cancelled: '{}'", target),
    }
}
