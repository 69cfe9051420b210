use labflag_core::classify::FlagStatus;
use labflag_core::parsing::header::MappingReport;
use labflag_core::AnalysisResult;

pub fn print_mapping(report: &MappingReport) {
    println!("Column mapping:");
    for line in report.lines() {
        println!("  {line}");
    }
    if !report.missing.is_empty() {
        let missing: Vec<&str> = report.missing.iter().map(|f| f.as_str()).collect();
        println!("  Not found: {}", missing.join(", "));
    }
    println!();
}

pub fn print(result: &AnalysisResult, ruleset: &str) {
    print_mapping(&result.mapping);

    let t = &result.tally;
    println!("Rows: {} read, {} cleaned", t.rows_read, t.cleaned);
    if t.blank_rows > 0 {
        println!("  {} blank row(s) skipped", t.blank_rows);
    }
    if t.duplicate_rows > 0 {
        println!("  {} duplicate row(s) dropped", t.duplicate_rows);
    }
    if t.invalid_dates > 0 {
        println!("  {} unparseable date(s) left empty", t.invalid_dates);
    }
    if t.rejected > 0 {
        println!("  {} row(s) rejected:", t.rejected);
        for r in &result.rejections {
            println!("    row {}: {}", r.row, r.reason);
        }
    }
    println!();

    println!("=== Flagged against {} ===\n", ruleset);
    if result.flagged.is_empty() {
        println!("  No values outside reference ranges.\n");
    } else {
        let width = result
            .flagged
            .iter()
            .map(|f| f.record.patient_id.len())
            .max()
            .unwrap_or(10);
        for f in &result.flagged {
            let units = f.record.units.as_deref().unwrap_or("");
            println!(
                "  row {:<4} {:<width$}  {:<6} {} {}  -> {}",
                f.record.row,
                f.record.patient_id,
                f.record.test_code,
                f.record.value,
                units,
                f.flag.status,
                width = width
            );
            println!("    {}", f.flag.reason);
        }
        println!();
    }

    let unknown: usize = result
        .flags
        .iter()
        .filter(|f| f.status == FlagStatus::UnknownTest)
        .count();
    if unknown > 0 {
        println!("  {unknown} record(s) without an applicable range\n");
    }

    println!("=== Summary ===\n");
    let rows: Vec<_> = result.summary.iter().chain(result.overall.as_ref()).collect();
    let label_width = rows.iter().map(|r| r.label().len()).max().unwrap_or(0).max(5);
    println!(
        "  {:<lw$}  {:>6}  {:>10}  {:>10}  {:>10}  {:>8}  {:>7}",
        "Group",
        "Count",
        "Mean",
        "Min",
        "Max",
        "Abnormal",
        "Rate",
        lw = label_width
    );
    println!("  {}", "-".repeat(label_width + 63));
    for row in rows {
        println!(
            "  {:<lw$}  {:>6}  {:>10}  {:>10}  {:>10}  {:>8}  {:>6.1}%",
            row.label(),
            row.count,
            row.mean_value.round_dp(2).normalize().to_string(),
            row.min_value.to_string(),
            row.max_value.to_string(),
            row.abnormal_count,
            row.abnormal_rate * 100.0,
            lw = label_width
        );
    }
    println!();
}
