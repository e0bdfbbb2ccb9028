//! Wire types for the Sheets values API.

use serde::{Deserialize, Serialize};

/// A block of cell values, used both as the `values.get` response and the
/// `values.update` request body. Cells arrive as their formatted (string)
/// rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    /// Absent entirely when the requested range holds no values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    /// Request body for writing a grid of values.
    pub fn body(values: &[Vec<String>]) -> Self {
        Self {
            range: None,
            major_dimension: None,
            values: values.to_vec(),
        }
    }
}

/// Response of `values.update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    pub spreadsheet_id: Option<String>,
    pub updated_range: Option<String>,
    pub updated_rows: Option<u32>,
    pub updated_columns: Option<u32>,
    #[serde(default)]
    pub updated_cells: u32,
}

/// Error envelope returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub status: String,
}
