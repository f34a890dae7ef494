// MF-Structure Group Table
//
// One accumulator row per distinct grouping key, in first-seen order. The
// table is built from the full row set, updated in place scan by scan,
// then finalized by resolving averages.

use std::collections::HashMap;
use std::cmp::Ordering;

use log::debug;

use crate::query::executor::predicate::CompiledPredicate;
use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};
use crate::query::parser::ast::{AggregateKind, AggregateSpec, ScanId, Specification};
use super::GroupLookup;

/// Key for the group table - values of the grouping attributes, in order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    values: Vec<DataValue>,
}

impl GroupKey {
    /// Create a new group key from values
    pub fn new(values: Vec<DataValue>) -> Self {
        GroupKey { values }
    }

    /// Extract a group key from a row based on column names
    pub fn from_row(row: &Row, columns: &[String]) -> QueryResult<Self> {
        let mut values = Vec::with_capacity(columns.len());
        for col in columns {
            match row.get(col) {
                Some(val) => values.push(val.clone()),
                None => return Err(QueryError::FieldMissing(col.clone())),
            }
        }
        Ok(GroupKey::new(values))
    }

    /// Field-for-field comparison against a row's grouping attributes
    fn matches_row(&self, row: &Row, columns: &[String]) -> bool {
        self.values
            .iter()
            .zip(columns)
            .all(|(value, col)| row.get(col) == Some(value))
    }

    pub fn values(&self) -> &[DataValue] {
        &self.values
    }
}

/// Starting value of an aggregate field before any row contributes
pub fn identity_value(kind: AggregateKind) -> Option<DataValue> {
    match kind {
        AggregateKind::Sum | AggregateKind::Count => Some(DataValue::Integer(0)),
        AggregateKind::Min => Some(DataValue::Float(f64::INFINITY)),
        AggregateKind::Max => Some(DataValue::Float(f64::NEG_INFINITY)),
        // Filled in by the resolver, absent until then
        AggregateKind::Avg => None,
    }
}

/// One row of the MF-structure
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorRow {
    key: GroupKey,
    fields: Row,
}

impl AccumulatorRow {
    fn new(key: GroupKey, grouping_attributes: &[String], aggregates: &[AggregateSpec]) -> Self {
        let mut fields = Row::new();
        for (col, value) in grouping_attributes.iter().zip(key.values()) {
            fields.set(col.clone(), value.clone());
        }
        for agg in aggregates {
            if let Some(seed) = identity_value(agg.kind) {
                fields.set(agg.name.clone(), seed);
            }
        }
        AccumulatorRow { key, fields }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn fields(&self) -> &Row {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&DataValue> {
        self.fields.get(field)
    }

    /// Fold one input row into every aggregate of the current scan
    fn update(&mut self, row: &Row, aggregates: &[&AggregateSpec]) {
        for agg in aggregates {
            let base = agg.base_attribute.as_deref().and_then(|attr| row.get(attr));
            let Some(current) = self.fields.get_mut(&agg.name) else {
                continue;
            };

            match agg.kind {
                AggregateKind::Count => {
                    if let DataValue::Integer(count) = current {
                        *count += 1;
                    }
                }
                AggregateKind::Sum => {
                    if let Some(sum) = base.filter(|v| v.is_numeric()).and_then(|v| current.add(v)) {
                        *current = sum;
                    }
                }
                AggregateKind::Min => {
                    if let Some(value) = base.filter(|v| v.is_numeric()) {
                        if let Some(Ordering::Greater) = (*current).partial_cmp(value) {
                            *current = value.clone();
                        }
                    }
                }
                AggregateKind::Max => {
                    if let Some(value) = base.filter(|v| v.is_numeric()) {
                        if let Some(Ordering::Less) = (*current).partial_cmp(value) {
                            *current = value.clone();
                        }
                    }
                }
                AggregateKind::Avg => {}
            }
        }
    }
}

/// Per-scan counters, reported in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub scan_id: ScanId,
    /// Input rows that passed the scan's predicate
    pub rows_matched: usize,
    /// Accumulator updates performed
    pub updates: usize,
}

/// The ordered collection of accumulator rows
#[derive(Debug, Clone)]
pub struct GroupTable {
    grouping_attributes: Vec<String>,
    rows: Vec<AccumulatorRow>,
    lookup: GroupLookup,
    index: HashMap<GroupKey, usize>,
}

impl GroupTable {
    /// Allocate one accumulator per distinct grouping key, in first-seen
    /// order. A row missing a grouping attribute aborts the build.
    pub fn build(rows: &[Row], spec: &Specification, lookup: GroupLookup) -> QueryResult<Self> {
        let mut table = GroupTable {
            grouping_attributes: spec.grouping_attributes.clone(),
            rows: Vec::new(),
            lookup,
            index: HashMap::new(),
        };

        for (row_idx, row) in rows.iter().enumerate() {
            let key = GroupKey::from_row(row, &spec.grouping_attributes).map_err(|err| match err {
                QueryError::FieldMissing(col) => {
                    QueryError::FieldMissing(format!("{} (input row {})", col, row_idx + 1))
                }
                other => other,
            })?;
            if table.index.contains_key(&key) {
                continue;
            }
            table.index.insert(key.clone(), table.rows.len());
            table
                .rows
                .push(AccumulatorRow::new(key, &spec.grouping_attributes, &spec.aggregates));
        }

        debug!("Built group table with {} groups from {} rows", table.rows.len(), rows.len());
        Ok(table)
    }

    /// Run one scan: every row passing the predicate updates the scan's
    /// aggregates on its matching accumulator, in source order.
    pub fn apply_scan(
        &mut self,
        predicate: &CompiledPredicate,
        rows: &[Row],
        spec: &Specification,
    ) -> QueryResult<ScanStats> {
        let scan_id = predicate.scan_id();
        let aggregates: Vec<&AggregateSpec> = spec.aggregates_for_scan(scan_id).collect();
        let mut stats = ScanStats {
            scan_id,
            rows_matched: 0,
            updates: 0,
        };

        for row in rows {
            if !predicate.evaluate(row) {
                continue;
            }
            stats.rows_matched += 1;

            for idx in self.matching_groups(row) {
                self.rows[idx].update(row, &aggregates);
                stats.updates += 1;
            }
        }

        debug!(
            "Scan {} ({}): {} rows matched, {} accumulator updates",
            scan_id,
            predicate.text(),
            stats.rows_matched,
            stats.updates
        );
        Ok(stats)
    }

    /// Indices of accumulators whose key equals the row's grouping values.
    /// A row lacking a grouping attribute matches nothing.
    fn matching_groups(&self, row: &Row) -> Vec<usize> {
        match self.lookup {
            GroupLookup::Linear => self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, acc)| acc.key.matches_row(row, &self.grouping_attributes))
                .map(|(idx, _)| idx)
                .collect(),
            GroupLookup::Hashed => GroupKey::from_row(row, &self.grouping_attributes)
                .ok()
                .and_then(|key| self.index.get(&key).copied())
                .into_iter()
                .collect(),
        }
    }

    /// Compute every `avg_<scan>_<base>` as `sum_<scan>_<base> / count_<scan>`.
    /// A zero count leaves the average absent.
    pub fn resolve_averages(&mut self, spec: &Specification) {
        let averages: Vec<(&str, String, String)> = spec
            .aggregates
            .iter()
            .filter(|agg| agg.kind == AggregateKind::Avg)
            .filter_map(|agg| {
                let base = agg.base_attribute.as_deref()?;
                Some((
                    agg.name.as_str(),
                    AggregateSpec::sum_name(agg.scan_id, base),
                    AggregateSpec::count_name(agg.scan_id),
                ))
            })
            .collect();

        for acc in &mut self.rows {
            for (avg_name, sum_name, count_name) in &averages {
                let count = match acc.fields.get(count_name) {
                    Some(DataValue::Integer(count)) if *count > 0 => *count,
                    _ => continue,
                };
                if let Some(sum) = acc.fields.get(sum_name).and_then(DataValue::as_f64) {
                    acc.fields
                        .set(avg_name.to_string(), DataValue::Float(sum / count as f64));
                }
            }
        }
    }

    /// Drop accumulators that fail the filter
    pub fn retain<F>(&mut self, mut keep: F) -> QueryResult<usize>
    where
        F: FnMut(&Row) -> QueryResult<bool>,
    {
        let before = self.rows.len();
        let mut kept = Vec::with_capacity(before);
        for acc in self.rows.drain(..) {
            if keep(&acc.fields)? {
                kept.push(acc);
            }
        }
        self.rows = kept;
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, acc)| (acc.key.clone(), idx))
            .collect();
        Ok(before - self.rows.len())
    }

    pub fn rows(&self) -> &[AccumulatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consume the table, yielding accumulator fields in table order
    pub fn into_rows(self) -> Vec<Row> {
        self.rows.into_iter().map(|acc| acc.fields).collect()
    }
}
