use async_trait::async_trait;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use serde_json::from_slice;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::catalog::ModelId;
use crate::csv_reader::parse_predictions;

pub type CountryId = u32;

/// A country as listed in countries.json
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub iso_code: String,
}

/// One observed value. `value: None` means "not observed", which is not zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservedRecord {
    pub country_id: CountryId,
    #[serde(rename = "indicator")]
    pub indicator_code: String,
    pub year: i32,
    #[serde(default, deserialize_with = "finite_or_none")]
    pub value: Option<f64>,
}

/// One model output row. Key: (country_id, model, indicator_code, year)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub country_id: CountryId,
    pub model: ModelId,
    pub indicator_code: String,
    pub year: i32,
    pub predicted_value: Option<f64>,
    pub actual_value: Option<f64>,
    pub is_test: bool,
    pub is_forecast: bool,
}

/// Non-finite numbers are treated as absent
pub fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn finite_or_none<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(finite(Option::<f64>::deserialize(d)?))
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("predictions line {line}: {reason}")]
    Csv { line: usize, reason: String },
}

/// Remote query capability behind the series store
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn list_countries(&self) -> Result<Vec<Country>, SourceError>;
    async fn list_observed(&self, country: CountryId) -> Result<Vec<ObservedRecord>, SourceError>;
    async fn list_predictions(&self, country: CountryId) -> Result<Vec<PredictionRecord>, SourceError>;
}

/// Serves countries.json, time_series.json and predictions.csv from one directory
pub struct FileSource {
    base: PathBuf,
    latency: Duration,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self { base: base.as_ref().to_path_buf(), latency: Duration::ZERO }
    }

    /// Delay every query by `latency` plus up to 50% random jitter
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn read(&self, filename: &str) -> Result<(PathBuf, Vec<u8>), SourceError> {
        if !self.latency.is_zero() {
            let max_jitter = self.latency.as_millis() as u64 / 2;
            let jitter = rng().random_range(0..=max_jitter);
            tokio::time::sleep(self.latency + Duration::from_millis(jitter)).await;
        }
        let path = self.base.join(filename);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| SourceError::Io { path: path.clone(), source })?;
        Ok((path, bytes))
    }
}

#[async_trait]
impl SeriesSource for FileSource {
    async fn list_countries(&self) -> Result<Vec<Country>, SourceError> {
        let (path, bytes) = self.read("countries.json").await?;
        let mut list: Vec<Country> =
            from_slice(&bytes).map_err(|source| SourceError::Json { path, source })?;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn list_observed(&self, country: CountryId) -> Result<Vec<ObservedRecord>, SourceError> {
        let (path, bytes) = self.read("time_series.json").await?;
        let rows: Vec<ObservedRecord> =
            from_slice(&bytes).map_err(|source| SourceError::Json { path, source })?;
        let mut rows: Vec<_> = rows.into_iter().filter(|r| r.country_id == country).collect();
        rows.sort_by_key(|r| r.year);
        Ok(rows)
    }

    async fn list_predictions(&self, country: CountryId) -> Result<Vec<PredictionRecord>, SourceError> {
        let (_, bytes) = self.read("predictions.csv").await?;
        let mut rows = parse_predictions(bytes.as_slice())?;
        rows.retain(|r| r.country_id == country);
        rows.sort_by_key(|r| r.year);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("countries.json"),
            r#"[{"id":2,"name":"China","iso_code":"CHN"},{"id":1,"name":"USA","iso_code":"USA"}]"#,
        )
        .unwrap();
        fs::write(
            dir.join("time_series.json"),
            r#"[
                {"country_id":1,"indicator":"gdp","year":2021,"value":2.2e13},
                {"country_id":1,"indicator":"gdp","year":2020,"value":2.1e13},
                {"country_id":2,"indicator":"gdp","year":2020,"value":1.4e13},
                {"country_id":1,"indicator":"inflation","year":2020,"value":null},
                {"country_id":1,"indicator":"fdi","year":2020}
            ]"#,
        )
        .unwrap();
        fs::write(
            dir.join("predictions.csv"),
            "country_id,model,indicator,year,actual_value,predicted_value,is_test,is_forecast\n\
             1,linear,gdp,2021,2.2e13,2.25e13,1,0\n\
             2,hybrid,gdp,2021,,1.5e13,0,1\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_file_source_filters_by_country() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let source = FileSource::new(dir.path());

        let countries = source.list_countries().await.unwrap();
        assert_eq!(countries[0].name, "China");

        let observed = source.list_observed(1).await.unwrap();
        assert_eq!(observed.len(), 4);
        assert_eq!(observed[0].year, 2020);
        assert!(observed.iter().all(|r| r.country_id == 1));
        assert_eq!(observed.iter().filter(|r| r.value.is_none()).count(), 2);

        let preds = source.list_predictions(2).await.unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].model, ModelId::Hybrid);
        assert!(preds[0].is_forecast);
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path());
        let err = source.list_observed(1).await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_bundled_dataset_loads() {
        let source = FileSource::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"));
        let countries = source.list_countries().await.unwrap();
        assert_eq!(countries.len(), 5);
        let usa = countries.iter().find(|c| c.iso_code == "USA").unwrap();

        let observed = source.list_observed(usa.id).await.unwrap();
        assert!(observed.iter().any(|r| r.indicator_code == "gdp"));
        let preds = source.list_predictions(usa.id).await.unwrap();
        assert!(preds.iter().any(|p| p.is_forecast && p.actual_value.is_none()));
    }

    #[test]
    fn test_non_finite_values_are_absent() {
        assert_eq!(finite(Some(f64::NAN)), None);
        assert_eq!(finite(Some(f64::INFINITY)), None);
        assert_eq!(finite(Some(1.5)), Some(1.5));
    }
}
