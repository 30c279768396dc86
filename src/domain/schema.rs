use crate::domain::model::{GroupKey, PaymentStatus};
use crate::utils::error::{EtlError, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_CLIENT_NAME: &str = "Unknown";

/// Explicit column layout of the payment CSV. Resolved once against the
/// header row; data rows are then read by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub client_column: String,
    pub status_column: String,
    /// Optional display name; rows fall back to "Unknown" when the column is
    /// absent or the cell is blank.
    pub client_name_column: Option<String>,
    pub dimension_columns: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            client_column: "client_code".to_string(),
            status_column: "status".to_string(),
            client_name_column: Some("client_name".to_string()),
            dimension_columns: vec!["pg_pay_mode".to_string(), "payment_mode".to_string()],
        }
    }
}

impl Schema {
    pub fn client_only(client_column: impl Into<String>, status_column: impl Into<String>) -> Self {
        Self {
            client_column: client_column.into(),
            status_column: status_column.into(),
            client_name_column: None,
            dimension_columns: Vec::new(),
        }
    }

    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.client_column.as_str()];
        columns.extend(self.dimension_columns.iter().map(String::as_str));
        columns.push(self.status_column.as_str());
        columns
    }

    /// Maps every required column to its position in `headers`. All absent
    /// columns are reported together.
    pub fn resolve(&self, headers: &StringRecord) -> Result<ResolvedSchema> {
        let names: Vec<&str> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if i == 0 {
                    h.trim_start_matches('\u{feff}')
                } else {
                    h
                }
            })
            .collect();
        let position = |column: &str| names.iter().position(|name| *name == column);

        let missing: Vec<String> = self
            .required_columns()
            .into_iter()
            .filter(|column| position(*column).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingColumns { columns: missing });
        }

        let client = position(self.client_column.as_str()).unwrap_or_default();
        let status = position(self.status_column.as_str()).unwrap_or_default();
        let dimensions = self
            .dimension_columns
            .iter()
            .map(|column| position(column.as_str()).unwrap_or_default())
            .collect();
        let client_name = self.client_name_column.as_deref().and_then(position);

        if client_name.is_none() {
            if let Some(column) = &self.client_name_column {
                tracing::warn!("⚠️ '{}' column not found. Defaulting to '{}'", column, UNKNOWN_CLIENT_NAME);
            }
        }

        Ok(ResolvedSchema {
            client,
            status,
            client_name,
            dimensions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    client: usize,
    status: usize,
    client_name: Option<usize>,
    dimensions: Vec<usize>,
}

impl ResolvedSchema {
    /// Pulls the group key and normalized status out of one data row.
    /// The error string names what is wrong with the row.
    pub fn extract(&self, record: &StringRecord) -> std::result::Result<(GroupKey, PaymentStatus), String> {
        let field = |index: usize| {
            record
                .get(index)
                .map(str::trim)
                .ok_or_else(|| format!("row has {} fields, column {} is missing", record.len(), index + 1))
        };

        let client_code = field(self.client)?;
        if client_code.is_empty() {
            return Err("client identifier is empty".to_string());
        }
        let status = PaymentStatus::normalize(field(self.status)?);

        let dimensions = self
            .dimensions
            .iter()
            .map(|&index| field(index).map(str::to_string))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let client_name = self
            .client_name
            .and_then(|index| record.get(index))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_CLIENT_NAME);

        Ok((
            GroupKey {
                client_name: client_name.to_string(),
                client_code: client_code.to_string(),
                dimensions,
            },
            status,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn test_resolve_reports_all_missing_columns() {
        let schema = Schema::default();
        let err = schema.resolve(&headers(&["client_code", "amount"])).unwrap_err();

        match err {
            EtlError::MissingColumns { columns } => {
                assert_eq!(columns, vec!["pg_pay_mode", "payment_mode", "status"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_ignores_bom_and_padding() {
        let schema = Schema::client_only("client", "status");
        let resolved = schema.resolve(&headers(&["\u{feff}client", " status "])).unwrap();

        let (key, status) = resolved.extract(&headers(&["A", "Success"])).unwrap();
        assert_eq!(key, GroupKey::client("A"));
        assert_eq!(status, PaymentStatus::Success);
    }

    #[test]
    fn test_extract_defaults_blank_client_name() {
        let schema = Schema::default();
        let resolved = schema
            .resolve(&headers(&[
                "client_name",
                "client_code",
                "pg_pay_mode",
                "payment_mode",
                "status",
            ]))
            .unwrap();

        let (key, _) = resolved
            .extract(&headers(&["", "C1", " PAYU ", "UPI", "failed"]))
            .unwrap();
        assert_eq!(key.client_name, UNKNOWN_CLIENT_NAME);
        assert_eq!(key.dimensions, vec!["PAYU", "UPI"]);
    }

    #[test]
    fn test_extract_rejects_short_rows_and_empty_clients() {
        let schema = Schema::client_only("client", "status");
        let resolved = schema.resolve(&headers(&["client", "status"])).unwrap();

        assert!(resolved.extract(&headers(&["A"])).is_err());
        assert!(resolved.extract(&headers(&["  ", "success"])).is_err());
    }
}
