//! Merges one country's observed and predicted records into the chart table and
//! the per-year indicator table.
//!
//! Everything here is a pure function of its inputs: the same records and the
//! same selection always produce equal tables, with fields in the same order.

use log::debug;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::{BTreeMap, HashMap};

use crate::catalog::{Catalog, ModelId};
use crate::data::{ObservedRecord, PredictionRecord, finite};
use crate::selection::{FilterSelection, TimeWindow};
use crate::store::CountrySeries;

pub const PRIMARY_FIELD: &str = "primary";

/// Column of a merged row. Ordering is the legend order: primary, predictions, the rest.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    /// Observed growth rate or level, whichever mode is active
    Primary,
    /// A model's prediction of the primary metric
    Prediction(ModelId),
    /// Composition or overlay indicator, named by its code
    Indicator(String),
}

impl FieldKey {
    pub fn name(&self) -> String {
        match self {
            FieldKey::Primary => PRIMARY_FIELD.to_string(),
            FieldKey::Prediction(model) => format!("{}_pred_{}", PRIMARY_FIELD, model.key()),
            FieldKey::Indicator(code) => code.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergedRow {
    pub year: i32,
    pub fields: BTreeMap<FieldKey, f64>,
}

impl MergedRow {
    pub fn get(&self, key: &FieldKey) -> Option<f64> {
        self.fields.get(key).copied()
    }

    /// Lookup by derived field name, e.g. `primary_pred_linear`
    pub fn get_named(&self, name: &str) -> Option<f64> {
        self.fields.iter().find(|(k, _)| k.name() == name).map(|(_, v)| *v)
    }
}

/// Flat object: `{"year": 2021, "primary": 2.2e13, "primary_pred_linear": 2.25e13}`
impl Serialize for MergedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("year", &self.year)?;
        for (key, value) in &self.fields {
            map.serialize_entry(&key.name(), value)?;
        }
        map.end()
    }
}

/// Every catalog indicator for one year; `None` where nothing was observed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndicatorYearRow {
    pub year: i32,
    pub values: BTreeMap<&'static str, Option<f64>>,
}

impl IndicatorYearRow {
    pub fn value(&self, code: &str) -> Option<f64> {
        self.values.get(code).copied().flatten()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Aggregation {
    pub merged: Vec<MergedRow>,
    pub indicator_years: Vec<IndicatorYearRow>,
}

pub fn aggregate(series: &CountrySeries, selection: &FilterSelection, catalog: &Catalog) -> Aggregation {
    Aggregation {
        merged: merge_rows(&series.observed, &series.predictions, selection, catalog),
        indicator_years: indicator_years(&series.observed, catalog),
    }
}

/// Maps each wanted indicator code to the field it fills.
///
/// Precedence when codes collide: primary, then composition, then overlay.
/// Composition and overlay both name the field by the code, so a shared code is written once.
fn resolve_fields<'a>(selection: &'a FilterSelection) -> HashMap<&'a str, FieldKey> {
    let mut wanted = HashMap::new();
    for code in &selection.overlays {
        wanted.insert(code.as_str(), FieldKey::Indicator(code.clone()));
    }
    for code in selection.composition.map(|c| c.codes()).unwrap_or_default() {
        wanted.insert(*code, FieldKey::Indicator(code.to_string()));
    }
    wanted.insert(selection.metric_mode.code(), FieldKey::Primary);
    wanted
}

/// Builds the chart table: one row per year that has at least one selected value,
/// ascending, truncated to the selection's time window.
pub fn merge_rows(
    observed: &[ObservedRecord],
    predictions: &[PredictionRecord],
    selection: &FilterSelection,
    catalog: &Catalog,
) -> Vec<MergedRow> {
    let wanted = resolve_fields(selection);
    let primary_code = selection.metric_mode.code();
    let mut years: BTreeMap<i32, BTreeMap<FieldKey, f64>> = BTreeMap::new();
    let mut unknown = 0usize;

    for record in observed {
        let Some(value) = finite(record.value) else { continue };
        let Some(field) = wanted.get(record.indicator_code.as_str()) else { continue };
        if !catalog.contains(&record.indicator_code) {
            unknown += 1;
            continue;
        }
        years.entry(record.year).or_default().insert(field.clone(), value);
    }

    if catalog.contains(primary_code) {
        for model in &selection.models {
            let matching = predictions
                .iter()
                .filter(|p| p.model == *model && p.indicator_code == primary_code);
            for pred in matching {
                let Some(value) = finite(pred.predicted_value) else { continue };
                years
                    .entry(pred.year)
                    .or_default()
                    .insert(FieldKey::Prediction(*model), value);
            }
        }
    }

    if unknown > 0 {
        debug!("dropped {} observed records without catalog entry", unknown);
    }

    let rows = years
        .into_iter()
        .map(|(year, fields)| MergedRow { year, fields })
        .collect();
    apply_window(rows, selection.time_window)
}

/// Keeps the trailing `n` years, anchored at the latest year present in `rows`
/// (which must be sorted ascending).
pub fn apply_window(mut rows: Vec<MergedRow>, window: TimeWindow) -> Vec<MergedRow> {
    let TimeWindow::LastYears(n) = window else { return rows };
    let Some(max_year) = rows.last().map(|r| r.year) else { return rows };
    // a zero-year window still shows the anchor year
    let first = i64::from(max_year) - i64::from(n.max(1)) + 1;
    rows.retain(|r| i64::from(r.year) >= first);
    rows
}

/// Dense per-year table of every catalog indicator, independent of the selection.
pub fn indicator_years(observed: &[ObservedRecord], catalog: &Catalog) -> Vec<IndicatorYearRow> {
    let mut years: BTreeMap<i32, BTreeMap<&'static str, Option<f64>>> = BTreeMap::new();

    for record in observed {
        let Some(indicator) = catalog.get(&record.indicator_code) else { continue };
        years
            .entry(record.year)
            .or_insert_with(|| catalog.codes().map(|c| (c, None)).collect())
            .insert(indicator.code, finite(record.value));
    }

    years
        .into_iter()
        .map(|(year, values)| IndicatorYearRow { year, values })
        .collect()
}
