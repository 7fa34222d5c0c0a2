use etf_blend_core::HoldingRow;

use super::file;

/// Load holdings rows from a CSV or JSON file, chosen by extension.
///
/// CSV needs a header row with `etf_symbol,stock_symbol,weight` and an
/// optional `actual_weight` column; JSON is an array of the same rows.
pub fn read_holdings(path: &str) -> Result<Vec<HoldingRow>, Box<dyn std::error::Error>> {
    let canonical = file::resolve_path(path)?;
    match file::extension(&canonical).as_deref() {
        Some("csv") => {
            let mut reader = csv::Reader::from_path(&canonical)
                .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
            let mut rows = Vec::new();
            for (line, record) in reader.deserialize::<HoldingRow>().enumerate() {
                let row = record.map_err(|e| {
                    format!("Bad holdings row {} in '{}': {}", line + 2, canonical.display(), e)
                })?;
                rows.push(row);
            }
            tracing::debug!(rows = rows.len(), path = %canonical.display(), "loaded holdings csv");
            Ok(rows)
        }
        _ => {
            let rows: Vec<HoldingRow> = file::read_json(path)?;
            tracing::debug!(rows = rows.len(), path = %canonical.display(), "loaded holdings json");
            Ok(rows)
        }
    }
}
