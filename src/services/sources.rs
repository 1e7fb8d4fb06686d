// Metadata cache record sources
// Each cache answers with JSON rows in one of two field-naming schemas;
// rows are converted to `SourceRecord` before any matching happens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

use crate::models::SourceRecord;

/// A metadata cache that can be asked for records of one library folder
#[async_trait]
pub trait RecordSource: Send + Sync {
    fn name(&self) -> &str;

    /// Records for the library/root folder pair, in the source's native order.
    ///
    /// Sources may return more rows than asked for; the matcher filters.
    async fn fetch_records(&self, library_name: &str, root_folder: &str)
        -> Result<Vec<SourceRecord>>;
}

// === Raw schemas ===

/// Rows from the image-choices cache (`LibraryName`, `Rootfolder`, `Type`, ...)
#[derive(Debug, Deserialize)]
pub struct ImageChoiceRow {
    #[serde(rename = "LibraryName", deserialize_with = "lenient_key")]
    pub library_name: String,
    #[serde(rename = "Rootfolder", deserialize_with = "lenient_key")]
    pub root_folder: String,
    #[serde(rename = "Type", default, deserialize_with = "lenient_text")]
    pub record_type: String,
    #[serde(rename = "Title", default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tmdbid: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tvdbid: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub imdbid: Option<String>,
    #[serde(rename = "Year", alias = "year", default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
}

/// Rows from the media-server library exports (`library_name`, `root_foldername`, ...)
#[derive(Debug, Deserialize)]
pub struct LibraryExportRow {
    #[serde(deserialize_with = "lenient_key")]
    pub library_name: String,
    #[serde(deserialize_with = "lenient_key")]
    pub root_foldername: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub library_type: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tmdbid: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tvdbid: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub imdbid: Option<String>,
    #[serde(alias = "Year", default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
}

/// Either known schema; callers never need to know which one a source speaks
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawRecord {
    ImageChoice(ImageChoiceRow),
    LibraryExport(LibraryExportRow),
}

impl From<ImageChoiceRow> for SourceRecord {
    fn from(row: ImageChoiceRow) -> Self {
        Self {
            library_name: row.library_name,
            root_folder: row.root_folder,
            title: row.title,
            record_type: row.record_type,
            tmdb_id: row.tmdbid,
            tvdb_id: row.tvdbid,
            imdb_id: row.imdbid,
            year: row.year,
        }
    }
}

impl From<LibraryExportRow> for SourceRecord {
    fn from(row: LibraryExportRow) -> Self {
        Self {
            library_name: row.library_name,
            root_folder: row.root_foldername,
            title: row.title,
            record_type: row.library_type,
            tmdb_id: row.tmdbid,
            tvdb_id: row.tvdbid,
            imdb_id: row.imdbid,
            year: row.year,
        }
    }
}

impl From<RawRecord> for SourceRecord {
    fn from(raw: RawRecord) -> Self {
        match raw {
            RawRecord::ImageChoice(row) => row.into(),
            RawRecord::LibraryExport(row) => row.into(),
        }
    }
}

/// Normalize raw JSON rows, skipping rows that match neither schema
pub fn normalize_records(values: Vec<Value>) -> Vec<SourceRecord> {
    let total = values.len();
    let records: Vec<SourceRecord> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawRecord>(value) {
            Ok(raw) => Some(raw.into()),
            Err(e) => {
                tracing::debug!("Skipping record in unknown schema: {}", e);
                None
            }
        })
        .collect();

    if records.len() < total {
        tracing::debug!("Normalized {} of {} records", records.len(), total);
    }
    records
}

// === Lenient field decoding ===

/// Matching keys are compared exactly, so they are kept verbatim
fn lenient_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Ids arrive as strings, numbers, blanks or null
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(int), _) => Some(int.to_string()),
            (None, Some(float)) if float.fract() == 0.0 && float > 0.0 => {
                Some(format!("{}", float as u64))
            }
            _ => None,
        },
        _ => None,
    })
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// === HTTP-backed source ===

/// A record endpoint answering `GET url?library_name=..&root_folder=..` with a JSON array
pub struct HttpRecordSource {
    name: String,
    url: String,
    client: Client,
}

impl HttpRecordSource {
    pub fn new(name: &str, url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for record source")?;

        Ok(Self {
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn request_url(&self, library_name: &str, root_folder: &str) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}library_name={}&root_folder={}",
            self.url,
            separator,
            urlencoding::encode(library_name),
            urlencoding::encode(root_folder)
        )
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_records(
        &self,
        library_name: &str,
        root_folder: &str,
    ) -> Result<Vec<SourceRecord>> {
        let url = self.request_url(library_name, root_folder);

        let values: Vec<Value> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query record source {}", self.name))?
            .error_for_status()
            .with_context(|| format!("Record source {} returned an error status", self.name))?
            .json()
            .await
            .with_context(|| format!("Failed to parse records from {}", self.name))?;

        Ok(normalize_records(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_image_choice_schema() {
        let records = normalize_records(vec![json!({
            "LibraryName": "4K",
            "Rootfolder": "Man-Thing (2005) {tmdb-18882}",
            "Type": "Movie",
            "Title": "Man-Thing",
            "tmdbid": "18882",
            "tvdbid": "",
            "imdbid": null
        })]);

        assert_eq!(
            records,
            vec![SourceRecord {
                library_name: "4K".to_string(),
                root_folder: "Man-Thing (2005) {tmdb-18882}".to_string(),
                title: "Man-Thing".to_string(),
                record_type: "Movie".to_string(),
                tmdb_id: Some("18882".to_string()),
                tvdb_id: None,
                imdb_id: None,
                year: None,
            }]
        );
    }

    #[test]
    fn test_normalize_library_export_schema() {
        let records = normalize_records(vec![json!({
            "library_name": "TV Shows",
            "root_foldername": "Show Name (2020) {tvdb-456}",
            "library_type": "show",
            "title": "Show Name",
            "tmdbid": 1234,
            "tvdbid": 456.0,
            "imdbid": "tt0000456",
            "year": "2020"
        })]);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.library_name, "TV Shows");
        assert_eq!(record.root_folder, "Show Name (2020) {tvdb-456}");
        assert_eq!(record.record_type, "show");
        assert_eq!(record.tmdb_id.as_deref(), Some("1234"));
        assert_eq!(record.tvdb_id.as_deref(), Some("456"));
        assert_eq!(record.imdb_id.as_deref(), Some("tt0000456"));
        assert_eq!(record.year, Some(2020));
    }

    #[test]
    fn test_normalize_mixed_batch_keeps_order_and_skips_unknown() {
        let records = normalize_records(vec![
            json!({"library_name": "TV", "root_foldername": "B", "library_type": "season"}),
            json!({"name": "no schema"}),
            json!({"LibraryName": "TV", "Rootfolder": "A", "Type": "Show"}),
            json!("not an object"),
        ]);

        let folders: Vec<&str> = records.iter().map(|r| r.root_folder.as_str()).collect();
        assert_eq!(folders, vec!["B", "A"]);
    }

    #[test]
    fn test_null_text_fields_become_empty() {
        let records = normalize_records(vec![json!({
            "LibraryName": "TV",
            "Rootfolder": "Show",
            "Type": null,
            "Title": null
        })]);
        assert_eq!(records[0].record_type, "");
        assert_eq!(records[0].title, "");
    }

    #[test]
    fn test_matching_keys_are_not_trimmed() {
        let records = normalize_records(vec![
            json!({"LibraryName": "4K", "Rootfolder": "Heat (1995) ", "Type": " Movie "}),
            json!({"library_name": " TV", "root_foldername": "Show", "library_type": "show"}),
        ]);

        assert_eq!(records[0].root_folder, "Heat (1995) ");
        assert_eq!(records[0].record_type, "Movie");
        assert_eq!(records[1].library_name, " TV");
        assert!(crate::services::matcher::select_record(&records, "4K", "Heat (1995)").is_none());
        assert!(crate::services::matcher::select_record(&records, "TV", "Show").is_none());
    }

    #[tokio::test]
    async fn test_request_url_encodes_query() {
        let source =
            HttpRecordSource::new("plex", "http://cache.local/records/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            source.request_url("TV Shows", "Show (2020) {tvdb-1}"),
            "http://cache.local/records?library_name=TV%20Shows&root_folder=Show%20%282020%29%20%7Btvdb-1%7D"
        );

        let source =
            HttpRecordSource::new("plex", "http://cache.local/q?kind=all", Duration::from_secs(1))
                .unwrap();
        assert!(source
            .request_url("4K", "X")
            .starts_with("http://cache.local/q?kind=all&library_name=4K"));
    }
}
