//! CSV-backed data access: one directory per estate, one file per period.
//!
//! This is the boundary where raw tabular data becomes typed records. Column
//! access is by configured header name only; a malformed file surfaces as a
//! connection failure and the engine skips the unit.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use fieldtally_engine::gateway::{EmployeeDirectory, GatewayError, RecordGateway};
use fieldtally_engine::model::{Division, RawRecord};
use fieldtally_engine::PeriodKey;

use crate::config::{ColumnMapping, DataConfig};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Record gateway
// ---------------------------------------------------------------------------

/// Reads `<data.dir>/<estate_id>/<YYYY-MM>.csv` partitions for one estate.
pub struct CsvGateway {
    estate_dir: PathBuf,
    columns: ColumnMapping,
    measurements: BTreeMap<String, String>,
    division_names: BTreeMap<String, String>,
}

impl CsvGateway {
    pub fn new(data: &DataConfig, estate_id: &str) -> Self {
        Self {
            estate_dir: data.dir.join(estate_id),
            columns: data.columns.clone(),
            measurements: data.measurements.clone(),
            division_names: data.divisions.clone(),
        }
    }

    fn period_path(&self, period: PeriodKey) -> PathBuf {
        self.estate_dir.join(format!("{period}.csv"))
    }

    /// Parse one period partition. A missing file is zero activity, not an
    /// error; anything unreadable or malformed is a connection failure.
    fn read_period(&self, period: PeriodKey) -> Result<Vec<RawRecord>, GatewayError> {
        let path = self.period_path(period);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)
            .map_err(|e| GatewayError::Connection(format!("cannot read {}: {e}", path.display())))?;
        parse_records(&data, &self.columns, &self.measurements)
            .map_err(|msg| GatewayError::Connection(format!("{}: {msg}", path.display())))
    }
}

impl RecordGateway for CsvGateway {
    fn fetch_records(
        &self,
        period: PeriodKey,
        division_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>, GatewayError> {
        let records = self.read_period(period)?;
        Ok(records
            .into_iter()
            .filter(|r| {
                r.division_id == division_id
                    && r.transaction_date >= start
                    && r.transaction_date <= end
            })
            .collect())
    }

    fn divisions_with_activity(
        &self,
        period: PeriodKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Division>, GatewayError> {
        let records = self.read_period(period)?;
        let mut ids: Vec<String> = records
            .into_iter()
            .filter(|r| r.transaction_date >= start && r.transaction_date <= end)
            .map(|r| r.division_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids
            .into_iter()
            .map(|id| {
                let name = self.division_names.get(&id).cloned().unwrap_or_else(|| id.clone());
                Division { id, name }
            })
            .collect())
    }

    fn test_connection(&self) -> bool {
        self.estate_dir.is_dir()
    }
}

/// Build typed records from CSV text using the configured column names.
fn parse_records(
    data: &str,
    columns: &ColumnMapping,
    measurements: &BTreeMap<String, String>,
) -> Result<Vec<RawRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, String> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| format!("missing column '{name}'"))
    };

    let record_id_idx = idx(&columns.record_id)?;
    let employee_idx = idx(&columns.employee_id)?;
    let tag_idx = idx(&columns.tag)?;
    let transaction_idx = idx(&columns.transaction_number)?;
    let date_idx = idx(&columns.date)?;
    let status_idx = idx(&columns.status)?;
    let field_idx = idx(&columns.field_id)?;
    let division_idx = idx(&columns.division_id)?;

    let mut measurement_idx: Vec<(&str, usize)> = Vec::new();
    for (field, column) in measurements {
        measurement_idx.push((field.as_str(), idx(column)?));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| e.to_string())?;
        let get = |i: usize| row.get(i).unwrap_or("").trim();

        let record_id: i64 = get(record_id_idx)
            .parse()
            .map_err(|_| format!("bad record id '{}'", get(record_id_idx)))?;

        let date_str = get(date_idx);
        let transaction_date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
            .map_err(|_| format!("record {record_id}: bad date '{date_str}'"))?;

        // Empty measurement cells are absent values, coerced to zero later.
        let mut values = BTreeMap::new();
        for (field, i) in &measurement_idx {
            let raw = get(*i);
            if raw.is_empty() {
                continue;
            }
            let value: i64 = raw
                .parse()
                .map_err(|_| format!("record {record_id}: bad count '{raw}' for {field}"))?;
            values.insert(field.to_string(), value);
        }

        records.push(RawRecord {
            record_id,
            employee_id: get(employee_idx).to_string(),
            record_tag: get(tag_idx).to_string(),
            transaction_number: get(transaction_idx).to_string(),
            transaction_date,
            transaction_status: get(status_idx).to_string(),
            field_id: get(field_idx).to_string(),
            division_id: get(division_idx).to_string(),
            measurements: values,
        });
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Employee directory
// ---------------------------------------------------------------------------

/// Employee directory loaded once from an `id,name` CSV.
pub struct CsvDirectory {
    names: HashMap<String, String>,
}

impl CsvDirectory {
    pub fn empty() -> Self {
        Self { names: HashMap::new() }
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());

        let mut names = HashMap::new();
        for row in reader.records() {
            let row = row.map_err(|e| e.to_string())?;
            let id = row.get(0).unwrap_or("").trim();
            let name = row.get(1).unwrap_or("").trim();
            if !id.is_empty() && !name.is_empty() {
                names.insert(id.to_string(), name.to_string());
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl EmployeeDirectory for CsvDirectory {
    fn lookup_name(&self, employee_id: &str) -> Option<String> {
        self.names.get(employee_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
