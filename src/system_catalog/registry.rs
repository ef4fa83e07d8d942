use anyhow::Result;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use polars::prelude::*;
use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::instrument::{ErrorStore, SharedErrorStore};
use crate::position::PositionToken;
use crate::row::{ColumnMask, FieldValue, OutputRow};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColType {
    Integer,
    /// 64-bit, unsigned semantics
    BigInt,
    Varchar(usize),
    Timestamp,
}

impl ColType {
    /// Column type as declared to the host engine.
    pub fn sql_type(&self) -> String {
        match self {
            ColType::Integer => "int(11)".to_string(),
            ColType::BigInt => "bigint(20)".to_string(),
            ColType::Varchar(n) => format!("varchar({})", n),
            ColType::Timestamp => "timestamp".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub coltype: ColType,
}

/// Iteration contract between the host query engine and a performance table.
///
/// A scan is `init`, then `next` until `EndOfData`, calling `read_row_values`
/// after each successful step. `position` captures the current row so that a
/// later `seek_and_fetch` can fetch it again.
pub trait PerfTable: Send {
    fn share(&self) -> &'static TableShare;
    fn init(&mut self, scan: bool) -> TableResult<()>;
    fn next(&mut self) -> TableResult<()>;
    fn seek_and_fetch(&mut self, token: &PositionToken) -> TableResult<()>;
    fn reset_position(&mut self);
    fn position(&self) -> PositionToken;
    fn row_count(&self) -> u64;
    fn truncate(&mut self) -> TableResult<()>;
    fn read_row_values(
        &self,
        out: &mut OutputRow,
        fields: &[usize],
        read_set: &ColumnMask,
        read_all: bool,
    ) -> TableResult<()>;
}

/// Static description of a performance table.
pub struct TableShare {
    pub schema: &'static str,
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub truncatable: bool,
    pub create: fn(SharedErrorStore) -> Box<dyn PerfTable>,
    pub delete_all_rows: fn(&ErrorStore) -> TableResult<()>,
    pub row_count: fn(&ErrorStore) -> u64,
}

impl TableShare {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl std::fmt::Debug for TableShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableShare")
            .field("schema", &self.schema)
            .field("name", &self.name)
            .field("columns", &self.columns.len())
            .field("truncatable", &self.truncatable)
            .finish()
    }
}

static REGISTRY: OnceCell<Mutex<Vec<&'static TableShare>>> = OnceCell::new();

fn registry() -> &'static Mutex<Vec<&'static TableShare>> {
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

pub fn register(share: &'static TableShare) {
    let mut reg = registry().lock();
    if reg.iter().any(|s| std::ptr::eq(*s, share)) { return; }
    debug!(target: "perfschema::registry", "register {}", share.qualified_name());
    reg.push(share);
}

pub fn ensure_registered() {
    if !registry().lock().is_empty() { return; }
    super::performance_schema::register_defaults();
}

pub fn all() -> Vec<&'static TableShare> {
    ensure_registered();
    registry().lock().clone()
}

pub fn find(schema: &str, name: &str) -> Option<&'static TableShare> {
    ensure_registered();
    registry()
        .lock()
        .iter()
        .copied()
        .find(|t| t.schema.eq_ignore_ascii_case(schema) && t.name.eq_ignore_ascii_case(name))
}

/// Resolve an identifier like `performance_schema.events_errors_summary_global_by_error`,
/// a quoted or `/`-separated path, or a bare table name.
pub fn lookup_from_str(input: &str) -> Option<&'static TableShare> {
    // Normalize: trim, strip alias after whitespace, strip quotes and semicolon
    let mut base = input.trim().to_string();
    if let Some(idx) = base.find(|c: char| c.is_whitespace()) { base.truncate(idx); }
    if base.ends_with(';') { base.pop(); }
    if base.len() >= 2 && ((base.starts_with('"') && base.ends_with('"')) || (base.starts_with('`') && base.ends_with('`'))) {
        base = base[1..base.len() - 1].to_string();
    }
    let dotted = base.replace(['\\', '/'], ".").to_lowercase();
    let parts: Vec<&str> = dotted.split('.').filter(|p| !p.is_empty()).collect();
    let hit = match parts.as_slice() {
        [] => None,
        [name] => find("performance_schema", name),
        [.., schema, name] => find(schema, name),
    };
    if hit.is_none() {
        crate::tprintln!("registry lookup miss: '{}' -> {:?}", input, parts);
    }
    hit
}

/// Empty frame with the declared columns.
pub fn build_empty(cols: &[ColumnDef]) -> Result<DataFrame> {
    let columns: Vec<Column> = cols
        .iter()
        .map(|c| to_series(c, Vec::new()).map(|s| s.into()))
        .collect::<Result<_>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Run a full scan and collect every row into a frame.
pub fn scan_to_frame(table: &mut dyn PerfTable) -> Result<DataFrame> {
    let cols = table.share().columns;
    let fields: Vec<usize> = (0..cols.len()).collect();
    let mut values: Vec<Vec<FieldValue>> = vec![Vec::new(); cols.len()];
    let mut out = OutputRow::new(cols.len());

    table.init(true)?;
    table.reset_position();
    loop {
        match table.next() {
            Ok(()) => {}
            Err(TableError::EndOfData) => break,
            Err(e) => return Err(e.into()),
        }
        match table.read_row_values(&mut out, &fields, &ColumnMask::all(), true) {
            Ok(()) => {}
            Err(TableError::RowUnavailable) => continue,
            Err(e) => return Err(e.into()),
        }
        for (i, col) in values.iter_mut().enumerate() {
            col.push(out.value(i).cloned().unwrap_or(FieldValue::Null));
        }
    }
    debug!(target: "perfschema::registry", "scan_to_frame: {} rows from {}", values.first().map_or(0, Vec::len), table.share().qualified_name());

    let columns: Vec<Column> = cols
        .iter()
        .zip(values)
        .map(|(c, v)| to_series(c, v).map(|s| s.into()))
        .collect::<Result<_>>()?;
    Ok(DataFrame::new(columns)?)
}

fn to_series(c: &ColumnDef, vals: Vec<FieldValue>) -> Result<Series> {
    let name: PlSmallStr = c.name.into();
    let s = match c.coltype {
        ColType::Integer => {
            let v: Vec<Option<i64>> = vals.iter().map(|v| match v {
                FieldValue::Int(i) => Some(*i),
                FieldValue::UInt(u) => i64::try_from(*u).ok(),
                _ => None,
            }).collect();
            Series::new(name, v)
        }
        ColType::BigInt => {
            let v: Vec<Option<u64>> = vals.iter().map(|v| match v {
                FieldValue::UInt(u) => Some(*u),
                FieldValue::Int(i) => u64::try_from(*i).ok(),
                _ => None,
            }).collect();
            Series::new(name, v)
        }
        ColType::Varchar(_) => {
            let v: Vec<Option<String>> = vals.into_iter().map(|v| match v {
                FieldValue::Str(s) => Some(s),
                _ => None,
            }).collect();
            Series::new(name, v)
        }
        ColType::Timestamp => {
            let v: Vec<Option<i64>> = vals.iter().map(|v| match v {
                FieldValue::Timestamp(ts) => Some(ts.timestamp_micros()),
                _ => None,
            }).collect();
            Series::new(name, v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(s)
}
