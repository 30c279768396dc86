use crate::domain::model::{Aggregate, SortOrder, SummaryRow, Totals};

/// Percent of `part` in `whole`, rounded to two decimals; 0 for an empty
/// whole.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

pub fn totals(aggregate: &Aggregate) -> Totals {
    let counts = aggregate.totals();
    let total = counts.total();

    Totals {
        total,
        success: counts.success,
        failed: counts.failed,
        success_percent: percent(counts.success, total),
        failed_percent: percent(counts.failed, total),
    }
}

pub fn summary_rows(aggregate: &Aggregate, order: SortOrder) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = aggregate
        .groups()
        .map(|(key, counts)| SummaryRow {
            client_name: key.client_name.clone(),
            client_code: key.client_code.clone(),
            dimensions: key.dimensions.clone(),
            success: counts.success,
            failed: counts.failed,
            total: counts.total(),
            success_percent: percent(counts.success, counts.total()),
        })
        .collect();

    sort_rows(&mut rows, order);
    rows
}

/// Stable: rows with equal success % keep their group-key order.
pub fn sort_rows(rows: &mut [SummaryRow], order: SortOrder) {
    match order {
        SortOrder::None => {}
        SortOrder::Ascending => {
            rows.sort_by(|a, b| a.success_percent.total_cmp(&b.success_percent))
        }
        SortOrder::Descending => {
            rows.sort_by(|a, b| b.success_percent.total_cmp(&a.success_percent))
        }
    }
}
