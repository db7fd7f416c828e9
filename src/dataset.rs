//! Monthly transaction dataset, indexed once for forecasting.
//!
//! Expected CSV columns:
//!   anonymous_uu_id, transaction_month (YYYYMM), sales_amount
//!
//! Indexing fixes the two dataset-wide inputs of feature derivation: the
//! earliest year across all merchants, and one integer code per merchant.
//! Codes follow the lexicographic order of merchant ids among merchants that
//! keep at least one feature row, matching how the training table is coded
//! after incomplete rows are dropped.

use crate::error::{ForecastError, Result};
use crate::feature_deriver::{FeatureDeriver, FeaturedRecord, MIN_HISTORY};
use crate::types::period::Period;
use crate::types::transaction::TransactionRecord;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// A row of the raw monthly export.
#[derive(Debug, Clone, Deserialize)]
struct RawTransactionRow {
    anonymous_uu_id: String,
    transaction_month: String,
    sales_amount: f64,
}

/// All merchants' monthly history, sorted by merchant then period.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<TransactionRecord>,
    earliest_year: i32,
    merchant_index: BTreeMap<String, i64>,
}

impl Dataset {
    /// Index a set of records. Order of the input does not matter.
    pub fn from_records(mut records: Vec<TransactionRecord>) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| !r.sales_amount.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "non-finite sales_amount for merchant {} at {}",
                bad.merchant_id, bad.period
            )));
        }

        let earliest_year = records
            .iter()
            .map(|r| r.period.year())
            .min()
            .ok_or_else(|| ForecastError::InvalidInput("dataset has no records".to_string()))?;

        records.sort_by(|a, b| {
            a.merchant_id
                .cmp(&b.merchant_id)
                .then(a.period.cmp(&b.period))
        });

        let mut merchant_index = BTreeMap::new();
        for rows in records.chunk_by(|a, b| a.merchant_id == b.merchant_id) {
            if rows.len() >= MIN_HISTORY {
                let code = merchant_index.len() as i64;
                merchant_index.insert(rows[0].merchant_id.clone(), code);
            }
        }

        Ok(Self {
            records,
            earliest_year,
            merchant_index,
        })
    }

    /// Load from a CSV reader.
    pub fn load_csv<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (line_num, result) in csv_reader.deserialize().enumerate() {
            let row: RawTransactionRow = result
                .with_context(|| format!("CSV parse error at line {}", line_num + 2))?;
            let period = Period::parse(&row.transaction_month)
                .with_context(|| format!("CSV parse error at line {}", line_num + 2))?;
            if !row.sales_amount.is_finite() {
                anyhow::bail!(
                    "CSV parse error at line {}: non-finite sales_amount {}",
                    line_num + 2,
                    row.sales_amount
                );
            }
            records.push(TransactionRecord::new(row.anonymous_uu_id, period, row.sales_amount));
        }

        Ok(Self::from_records(records)?)
    }

    /// Load from a CSV file path.
    pub fn load_csv_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open '{}'", path.display()))?;
        let dataset = Self::load_csv(file)?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            merchants = dataset.merchant_count(),
            indexed_merchants = dataset.indexed_merchant_count(),
            earliest_year = dataset.earliest_year,
            "Transaction history loaded"
        );

        Ok(dataset)
    }

    /// Earliest calendar year across every merchant.
    pub fn earliest_year(&self) -> i32 {
        self.earliest_year
    }

    /// Feature deriver bound to this dataset's earliest year.
    pub fn deriver(&self) -> FeatureDeriver {
        FeatureDeriver::new(self.earliest_year)
    }

    /// One merchant's records in ascending period order; empty if unknown.
    pub fn merchant_history(&self, merchant_id: &str) -> &[TransactionRecord] {
        let start = self
            .records
            .partition_point(|r| r.merchant_id.as_str() < merchant_id);
        let len = self.records[start..].partition_point(|r| r.merchant_id == merchant_id);
        &self.records[start..start + len]
    }

    pub fn contains(&self, merchant_id: &str) -> bool {
        !self.merchant_history(merchant_id).is_empty()
    }

    /// Model code for a merchant, if it has enough history to be coded.
    pub fn merchant_index(&self, merchant_id: &str) -> Option<i64> {
        self.merchant_index.get(merchant_id).copied()
    }

    /// Distinct merchant ids in sorted order.
    pub fn merchant_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.records
            .chunk_by(|a, b| a.merchant_id == b.merchant_id)
            .map(|rows| rows[0].merchant_id.as_str())
    }

    pub fn merchant_count(&self) -> usize {
        self.merchant_ids().count()
    }

    pub fn indexed_merchant_count(&self) -> usize {
        self.merchant_index.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The full feature table the model is trained on.
    pub fn training_rows(&self) -> Result<Vec<FeaturedRecord>> {
        let deriver = self.deriver();
        let mut rows = Vec::new();
        for (merchant_id, &code) in &self.merchant_index {
            rows.extend(deriver.derive(code, self.merchant_history(merchant_id))?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
anonymous_uu_id,transaction_month,sales_amount
b-merchant,202202,200.0
b-merchant,202201,100.0
b-merchant,202203,300.0
b-merchant,202204,400.0
a-merchant,202112,10.0
a-merchant,202201,20.0
a-merchant,202202,30.0
a-merchant,202203,40.0
a-merchant,202204,50.0
short,202301,5.0
short,202302,6.0
";

    #[test]
    fn test_load_csv_sorts_and_indexes() {
        let dataset = Dataset::load_csv(SAMPLE.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 11);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.earliest_year(), 2021);
        assert_eq!(
            dataset.merchant_ids().collect::<Vec<_>>(),
            vec!["a-merchant", "b-merchant", "short"]
        );

        let b = dataset.merchant_history("b-merchant");
        let sales: Vec<f64> = b.iter().map(|r| r.sales_amount).collect();
        assert_eq!(sales, vec![100.0, 200.0, 300.0, 400.0]);
    }

    #[test]
    fn test_merchant_codes_skip_short_histories() {
        let dataset = Dataset::load_csv(SAMPLE.as_bytes()).unwrap();

        assert_eq!(dataset.merchant_index("a-merchant"), Some(0));
        assert_eq!(dataset.merchant_index("b-merchant"), Some(1));
        assert_eq!(dataset.merchant_index("short"), None);
        assert!(dataset.contains("short"));
        assert_eq!(dataset.indexed_merchant_count(), 2);
    }

    #[test]
    fn test_unknown_merchant_has_no_history() {
        let dataset = Dataset::load_csv(SAMPLE.as_bytes()).unwrap();
        assert!(dataset.merchant_history("zzz").is_empty());
        assert!(dataset.merchant_history("0").is_empty());
        assert!(!dataset.contains("missing"));
    }

    #[test]
    fn test_training_rows_drop_incomplete_windows() {
        let dataset = Dataset::load_csv(SAMPLE.as_bytes()).unwrap();
        let rows = dataset.training_rows().unwrap();

        // a-merchant: 5 months -> 2 rows, b-merchant: 4 months -> 1 row
        assert_eq!(rows.len(), 3);
        let b_row = rows.iter().find(|r| r.record.merchant_id == "b-merchant").unwrap();
        assert_eq!(b_row.features.merchant_index, 1);
        assert_eq!(b_row.features.month_index, 12 + 4);
        assert_eq!(b_row.features.sales_lag_1, 300.0);
    }

    #[test]
    fn test_malformed_rows_report_line() {
        let csv = "anonymous_uu_id,transaction_month,sales_amount\nm,2023xx,1.0\n";
        let err = Dataset::load_csv(csv.as_bytes()).err().unwrap();
        assert!(err.to_string().contains("line 2"));

        let csv = "anonymous_uu_id,transaction_month,sales_amount\nm,202301,abc\n";
        assert!(Dataset::load_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_non_finite_sales_are_rejected() {
        for value in ["NaN", "inf", "-inf"] {
            let csv = format!(
                "anonymous_uu_id,transaction_month,sales_amount\nm,202301,1.0\nm,202302,{}\n",
                value
            );
            let err = Dataset::load_csv(csv.as_bytes()).err().unwrap();
            assert!(err.to_string().contains("line 3"), "{}: {}", value, err);
        }

        let records = vec![
            TransactionRecord::new("m", Period::new(2023, 1).unwrap(), 1.0),
            TransactionRecord::new("m", Period::new(2023, 2).unwrap(), f64::NAN),
        ];
        let err = Dataset::from_records(records).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let err = Dataset::from_records(Vec::new()).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
