use crate::domain::model::TableMetadata;
use crate::domain::ports::AthenaApi;
use crate::utils::error::Result;
use std::collections::HashSet;

/// Columns every Cost and Usage Report table carries.
pub const CUR_MINIMAL_REQUIRED_COLUMNS: &[&str] = &[
    "bill_bill_type",
    "bill_billing_entity",
    "bill_billing_period_end_date",
    "bill_billing_period_start_date",
    "bill_invoice_id",
    "bill_payer_account_id",
    "identity_line_item_id",
    "identity_time_interval",
    "line_item_availability_zone",
    "line_item_legal_entity",
    "line_item_line_item_description",
    "line_item_line_item_type",
    "line_item_operation",
    "line_item_product_code",
    "line_item_resource_id",
    "line_item_unblended_cost",
    "line_item_usage_account_id",
    "line_item_usage_amount",
    "line_item_usage_end_date",
    "line_item_usage_start_date",
    "line_item_usage_type",
    "pricing_term",
    "pricing_unit",
    "product_servicecode",
];

/// Required columns absent from `table`.
pub fn missing_cur_columns(table: &TableMetadata) -> Vec<&'static str> {
    let columns: HashSet<String> = table.column_names().map(str::to_lowercase).collect();
    CUR_MINIMAL_REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !columns.contains(*col))
        .collect()
}

pub fn table_is_cur(table: &TableMetadata) -> bool {
    missing_cur_columns(table).is_empty()
}

pub struct CurDetector<'a, A: AthenaApi> {
    athena: &'a A,
    database: String,
}

impl<'a, A: AthenaApi> CurDetector<'a, A> {
    pub fn new(athena: &'a A, database: impl Into<String>) -> Self {
        Self {
            athena,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Looks the table up in Athena; unknown tables are not CUR.
    pub async fn is_cur(&self, name: &str) -> Result<bool> {
        match self.athena.get_table_metadata(&self.database, name).await? {
            Some(table) => {
                let missing = missing_cur_columns(&table);
                if !missing.is_empty() {
                    tracing::debug!("{} is not cur, missing columns {:?}", name, missing);
                }
                Ok(missing.is_empty())
            }
            None => {
                tracing::debug!("{} not found in {}, not cur", name, self.database);
                Ok(false)
            }
        }
    }
}
