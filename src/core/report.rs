use crate::domain::model::{AnalysisResult, HeatBand, SummaryRow};
use crate::utils::error::{EtlError, Result};
use crate::core::summary;
use crate::domain::schema::UNKNOWN_CLIENT_NAME;
use chrono::{DateTime, Local};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub const REPORT_FILE_NAME: &str = "report.html";
pub const ARCHIVE_FILE_NAME: &str = "pipe_analysis.zip";
pub const UPLOAD_KEY: &str = "pipe_summary/summary.json";

/// `PIPE Analysis (2025-06-01-2025-06-02).csv`
pub fn summary_file_name(labels: &[String]) -> String {
    format!("PIPE Analysis ({}).csv", labels.join("-"))
}

fn table_headers(result: &AnalysisResult) -> Vec<String> {
    let mut headers = vec!["client_name".to_string(), "client_code".to_string()];
    headers.extend(result.dimension_columns.iter().cloned());
    headers.extend(
        ["success", "failed", "Total Txn", "Success %"]
            .iter()
            .map(|h| h.to_string()),
    );
    headers
}

fn row_cells(row: &SummaryRow) -> Vec<String> {
    let mut cells = vec![row.client_name.clone(), row.client_code.clone()];
    cells.extend(row.dimensions.iter().cloned());
    cells.push(row.success.to_string());
    cells.push(row.failed.to_string());
    cells.push(row.total.to_string());
    cells.push(format!("{:.2}", row.success_percent));
    cells
}

pub fn render_csv(result: &AnalysisResult) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table_headers(result))?;
    for row in &result.rows {
        writer.write_record(row_cells(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Summary as a document map keyed by `SummaryRow::document_id`.
///
/// The id leaves out the client name, so rows with the same code and
/// dimensions but different names (e.g. a blank name on some rows) end up in
/// one document with summed counts.
pub fn render_documents(result: &AnalysisResult) -> Result<Vec<u8>> {
    let mut documents: BTreeMap<String, SummaryRow> = BTreeMap::new();

    for row in &result.rows {
        let id = row.document_id();
        match documents.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(row.clone());
            }
            Entry::Occupied(mut entry) => {
                tracing::warn!(
                    "⚠️ '{}' and '{}' share document id {}, merging their counts",
                    entry.get().client_name,
                    row.client_name,
                    entry.key()
                );
                let merged = entry.get_mut();
                if merged.client_name == UNKNOWN_CLIENT_NAME {
                    merged.client_name = row.client_name.clone();
                }
                merged.success += row.success;
                merged.failed += row.failed;
                merged.total = merged.success + merged.failed;
                merged.success_percent = summary::percent(merged.success, merged.total);
            }
        }
    }

    Ok(serde_json::to_vec_pretty(&documents)?)
}

pub fn render_html(result: &AnalysisResult, generated_at: DateTime<Local>) -> String {
    let totals = &result.totals;
    let mut html = String::new();

    html.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n",
        "<title>PG Analysis</title>\n<style>\n",
        "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\n",
        ".metrics{display:flex;gap:1rem;margin-bottom:1.5rem}\n",
        ".metric{flex:1;border:1px solid #ddd;border-radius:6px;padding:.75rem}\n",
        ".metric .value{font-size:1.6rem;font-weight:600}\n",
        "table{border-collapse:collapse;width:100%}\n",
        "th,td{border-bottom:1px solid #eee;padding:.35rem .6rem;text-align:left}\n",
        "td.num{text-align:right}\n",
        "td.pct{color:white;font-weight:bold;text-align:right}\n",
        ".bar{height:.6rem;background:#2ecc71}\n",
        ".bar-track{width:8rem;background:#e74c3c}\n",
        "caption,.note{color:#666;font-size:.85rem;text-align:left;padding:.5rem 0}\n",
        "</style>\n</head>\n<body>\n",
        "<h1>Client Code-wise PG &amp; Payment Mode Analysis</h1>\n",
    ));

    html.push_str(&format!(
        "<p class=\"note\">Dates: {}</p>\n",
        escape_html(&result.labels.join(", "))
    ));

    html.push_str("<div class=\"metrics\">\n");
    for (label, value) in [
        ("Total Transactions", group_thousands(totals.total)),
        ("Success Count", group_thousands(totals.success)),
        ("Failed Count", group_thousands(totals.failed)),
        ("Success %", format!("{:.2} %", totals.success_percent)),
        ("Failed %", format!("{:.2} %", totals.failed_percent)),
    ] {
        html.push_str(&format!(
            "<div class=\"metric\"><div>{}</div><div class=\"value\">{}</div></div>\n",
            label, value
        ));
    }
    html.push_str("</div>\n");

    if result.rows.is_empty() {
        html.push_str("<p class=\"note\">No 'success' or 'failed' transactions.</p>\n");
    } else {
        html.push_str("<table>\n<thead><tr>");
        for header in table_headers(result) {
            html.push_str(&format!("<th>{}</th>", escape_html(&header)));
        }
        html.push_str("<th>Chart</th></tr></thead>\n<tbody>\n");

        for row in &result.rows {
            html.push_str(&render_row(row));
        }
        html.push_str("</tbody>\n");

        let loaded: Vec<String> = result
            .sources
            .iter()
            .map(|s| format!("{} ({:.2}s)", escape_html(&s.label), s.load_seconds))
            .collect();
        html.push_str(&format!(
            "<caption>Loaded files: {}</caption>\n</table>\n",
            loaded.join(", ")
        ));
    }

    let aggregate = &result.aggregate;
    if aggregate.unrecognized > 0 || aggregate.skipped > 0 {
        html.push_str(&format!(
            "<p class=\"note\">{} rows with other statuses and {} malformed rows were left out.</p>\n",
            group_thousands(aggregate.unrecognized),
            group_thousands(aggregate.skipped)
        ));
    }

    html.push_str(&format!(
        "<p class=\"note\">Generated {}</p>\n</body>\n</html>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    html
}

fn render_row(row: &SummaryRow) -> String {
    let mut tr = String::from("<tr>");
    tr.push_str(&format!("<td>{}</td>", escape_html(&row.client_name)));
    tr.push_str(&format!("<td>{}</td>", escape_html(&row.client_code)));
    for dimension in &row.dimensions {
        tr.push_str(&format!("<td>{}</td>", escape_html(dimension)));
    }
    for count in [row.success, row.failed, row.total] {
        tr.push_str(&format!("<td class=\"num\">{}</td>", group_thousands(count)));
    }
    tr.push_str(&format!(
        "<td class=\"pct\" style=\"background-color:{}\">{:.2}</td>",
        HeatBand::for_percent(row.success_percent).color(),
        row.success_percent
    ));
    tr.push_str(&format!(
        "<td><div class=\"bar-track\"><div class=\"bar\" style=\"width:{:.2}%\"></div></div></td>",
        row.success_percent
    ));
    tr.push_str("</tr>\n");
    tr
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 1234567 -> "1,234,567"
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
