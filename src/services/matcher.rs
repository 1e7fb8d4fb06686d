// Multi-source record matching
// Sources are tried one after another in priority order; the first source
// that yields a record wins and later sources are never consulted.

use std::sync::Arc;

use super::sources::RecordSource;
use crate::models::SourceRecord;

/// The record that matched, and which source it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMatch {
    pub source: String,
    pub record: SourceRecord,
}

pub struct MultiSourceMatcher {
    sources: Vec<Arc<dyn RecordSource>>,
}

impl MultiSourceMatcher {
    /// `sources` must already be in priority order
    pub fn new(sources: Vec<Arc<dyn RecordSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Look the folder up in each source until one matches.
    ///
    /// Lookup failures count as a miss at that source. Without both a library
    /// name and a root folder nothing can match.
    pub async fn find_match(
        &self,
        library_name: Option<&str>,
        root_folder: Option<&str>,
    ) -> Option<SourceMatch> {
        let (Some(library_name), Some(root_folder)) = (library_name, root_folder) else {
            return None;
        };

        for source in &self.sources {
            let records = match source.fetch_records(library_name, root_folder).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        "Record source {} failed for '{}/{}': {:#}",
                        source.name(),
                        library_name,
                        root_folder,
                        e
                    );
                    continue;
                }
            };

            match select_record(&records, library_name, root_folder) {
                Some(record) => {
                    tracing::debug!(
                        "Matched '{}/{}' in {} (type '{}')",
                        library_name,
                        root_folder,
                        source.name(),
                        record.record_type
                    );
                    return Some(SourceMatch {
                        source: source.name().to_string(),
                        record: record.clone(),
                    });
                }
                None => {
                    tracing::debug!(
                        "No match for '{}/{}' in {} ({} records)",
                        library_name,
                        root_folder,
                        source.name(),
                        records.len()
                    );
                }
            }
        }

        None
    }
}

/// Pick the best record for a library folder from one source.
///
/// Filters on exact library name, then exact root folder, then prefers a
/// show/movie record, a season record, a background record, and finally the
/// first remaining record in source order.
pub fn select_record<'a>(
    records: &'a [SourceRecord],
    library_name: &str,
    root_folder: &str,
) -> Option<&'a SourceRecord> {
    let candidates: Vec<&SourceRecord> = records
        .iter()
        .filter(|r| r.library_name == library_name)
        .filter(|r| r.root_folder == root_folder)
        .collect();

    candidates
        .iter()
        .find(|r| is_container_type(&r.record_type))
        .or_else(|| candidates.iter().find(|r| is_season_type(&r.record_type)))
        .or_else(|| candidates.iter().find(|r| is_background_type(&r.record_type)))
        .or_else(|| candidates.first())
        .copied()
}

fn normalized_type(record_type: &str) -> String {
    record_type.trim().to_lowercase()
}

/// A whole show or movie, not one of its artworks
pub fn is_container_type(record_type: &str) -> bool {
    matches!(
        normalized_type(record_type).as_str(),
        "show" | "movie" | "series"
    )
}

pub fn is_season_type(record_type: &str) -> bool {
    let t = normalized_type(record_type);
    t.contains("season") && !t.contains("episode")
}

pub fn is_background_type(record_type: &str) -> bool {
    normalized_type(record_type).contains("background")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        name: &'static str,
        records: Vec<SourceRecord>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(name: &'static str, records: Vec<SourceRecord>) -> Arc<Self> {
            Arc::new(Self {
                name,
                records,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RecordSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_records(&self, _: &str, _: &str) -> Result<Vec<SourceRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RecordSource for FailingSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch_records(&self, _: &str, _: &str) -> Result<Vec<SourceRecord>> {
            Err(anyhow!("connection refused"))
        }
    }

    fn record(library: &str, folder: &str, record_type: &str, title: &str) -> SourceRecord {
        SourceRecord {
            library_name: library.to_string(),
            root_folder: folder.to_string(),
            title: title.to_string(),
            record_type: record_type.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_prefers_container_record() {
        let records = vec![
            record("TV", "Show (2020)", "Episode", "Show | S01E01"),
            record("TV", "Show (2020)", "Season", "Show | Season01"),
            record("TV", "Show (2020)", "Show", "Show"),
        ];
        let best = select_record(&records, "TV", "Show (2020)").unwrap();
        assert_eq!(best.record_type, "Show");
    }

    #[test]
    fn test_select_priority_chain() {
        let season_over_background = vec![
            record("TV", "Show", "Show Background", "Show"),
            record("TV", "Show", "Season Episode", "Show | S01E01"),
            record("TV", "Show", "season", "Show | Season01"),
        ];
        let best = select_record(&season_over_background, "TV", "Show").unwrap();
        assert_eq!(best.record_type, "season");

        let background_over_first = vec![
            record("4K", "Heat (1995)", "Title Card", "a"),
            record("4K", "Heat (1995)", "Movie Background", "b"),
        ];
        let best = select_record(&background_over_first, "4K", "Heat (1995)").unwrap();
        assert_eq!(best.title, "b");

        let first_remaining = vec![
            record("4K", "Heat (1995)", "Logo", "first"),
            record("4K", "Heat (1995)", "Other", "second"),
        ];
        let best = select_record(&first_remaining, "4K", "Heat (1995)").unwrap();
        assert_eq!(best.title, "first");
    }

    #[test]
    fn test_select_requires_exact_library_and_folder() {
        let records = vec![
            record("4k", "Heat (1995)", "Movie", "wrong library case"),
            record("4K", "Heat (1995) ", "Movie", "wrong folder"),
        ];
        assert!(select_record(&records, "4K", "Heat (1995)").is_none());
        assert!(select_record(&[], "4K", "Heat (1995)").is_none());
    }

    #[test]
    fn test_type_classification() {
        assert!(is_container_type(" Movie "));
        assert!(is_container_type("SERIES"));
        assert!(!is_container_type("Movie Background"));
        assert!(is_season_type("Season Poster"));
        assert!(!is_season_type("Season Episode"));
        assert!(is_background_type("Show Background"));
    }

    #[tokio::test]
    async fn test_first_matching_source_wins() {
        let first = StaticSource::new(
            "image_choices",
            vec![record("TV", "Show (2020)", "Show", "From A")],
        );
        let second = StaticSource::new("plex_export", {
            let mut r = record("TV", "Show (2020)", "show", "From B");
            r.tvdb_id = Some("999".to_string());
            vec![r]
        });

        let sources: Vec<Arc<dyn RecordSource>> = vec![first.clone(), second.clone()];
        let matcher = MultiSourceMatcher::new(sources);
        let found = matcher
            .find_match(Some("TV"), Some("Show (2020)"))
            .await
            .unwrap();

        assert_eq!(found.source, "image_choices");
        assert_eq!(found.record.title, "From A");
        assert_eq!(found.record.tvdb_id, None);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_and_miss_advance_to_next_source() {
        let miss = StaticSource::new("image_choices", vec![record("TV", "Other", "Show", "x")]);
        let hit = StaticSource::new("other_export", vec![record("TV", "Show", "show", "Show")]);

        let sources: Vec<Arc<dyn RecordSource>> = vec![Arc::new(FailingSource), miss.clone(), hit];
        let matcher = MultiSourceMatcher::new(sources);
        let found = matcher.find_match(Some("TV"), Some("Show")).await.unwrap();

        assert_eq!(found.source, "other_export");
        assert_eq!(miss.calls.load(Ordering::SeqCst), 1);
        assert_eq!(matcher.source_names(), vec!["broken", "image_choices", "other_export"]);
    }

    #[tokio::test]
    async fn test_all_sources_exhausted() {
        let sources: Vec<Arc<dyn RecordSource>> =
            vec![Arc::new(FailingSource), Arc::new(FailingSource)];
        let matcher = MultiSourceMatcher::new(sources);
        assert!(matcher.find_match(Some("TV"), Some("Show")).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_lookup_keys_skip_sources() {
        let source = StaticSource::new("image_choices", vec![record("TV", "Show", "Show", "x")]);
        let sources: Vec<Arc<dyn RecordSource>> = vec![source.clone()];
        let matcher = MultiSourceMatcher::new(sources);

        assert!(matcher.find_match(Some("TV"), None).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
