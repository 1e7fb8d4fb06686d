// Provider search and preferences endpoints
// The art providers themselves live behind the search endpoint; this module
// only builds the query and decodes the per-provider candidate lists.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::models::{AssetIdentity, AssetType, Candidate, LanguagePreferences, MediaType};

/// Search query sent to the provider search endpoint.
///
/// Missing fields are sent as null; the endpoint decides how to degrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderQuery {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub tmdb_id: Option<String>,
    pub tvdb_id: Option<String>,
    pub imdb_id: Option<String>,
    pub media_type: MediaType,
    pub asset_type: AssetType,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

impl From<&AssetIdentity> for ProviderQuery {
    fn from(identity: &AssetIdentity) -> Self {
        Self {
            title: identity.title.clone(),
            year: identity.year,
            tmdb_id: identity.provider_ids.tmdb.clone(),
            tvdb_id: identity.provider_ids.tvdb.clone(),
            imdb_id: identity.provider_ids.imdb.clone(),
            media_type: identity.media_type,
            asset_type: identity.asset_type,
            season_number: identity.season_number,
            episode_number: identity.episode_number,
        }
    }
}

pub struct ProviderSearchClient {
    client: Client,
    search_url: String,
}

impl ProviderSearchClient {
    pub fn new(search_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for provider search")?;

        Ok(Self {
            client,
            search_url: search_url.to_string(),
        })
    }

    /// Fetch candidates for an identity, keyed by provider name
    pub async fn search(&self, identity: &AssetIdentity) -> Result<BTreeMap<String, Vec<Candidate>>> {
        let query = ProviderQuery::from(identity);

        let response: HashMap<String, Vec<Candidate>> = self
            .client
            .post(&self.search_url)
            .json(&query)
            .send()
            .await
            .context("Failed to query provider search")?
            .error_for_status()
            .context("Provider search returned an error status")?
            .json()
            .await
            .context("Failed to parse provider search response")?;

        Ok(label_candidates(response))
    }
}

/// Sort providers by name and stamp the provider onto candidates that lack one
fn label_candidates(response: HashMap<String, Vec<Candidate>>) -> BTreeMap<String, Vec<Candidate>> {
    response
        .into_iter()
        .map(|(provider, mut candidates)| {
            for candidate in &mut candidates {
                if candidate.source_provider.trim().is_empty() {
                    candidate.source_provider = provider.clone();
                }
            }
            (provider, candidates)
        })
        .collect()
}

/// Language preferences from the preferences endpoint, or the configured fallback
pub struct PreferencesStore {
    client: Client,
    url: Option<String>,
    fallback: LanguagePreferences,
}

impl PreferencesStore {
    pub fn new(url: Option<String>, fallback: LanguagePreferences, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for preferences")?;

        Ok(Self {
            client,
            url,
            fallback,
        })
    }

    /// Current preferences; endpoint failures fall back to the configured defaults
    pub async fn load(&self) -> LanguagePreferences {
        let Some(url) = &self.url else {
            return self.fallback.clone();
        };

        match self.fetch(url).await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!("Failed to load preferences, using configured defaults: {:#}", e);
                self.fallback.clone()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<LanguagePreferences> {
        let prefs = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to query preferences endpoint")?
            .error_for_status()
            .context("Preferences endpoint returned an error status")?
            .json()
            .await
            .context("Failed to parse preferences response")?;

        Ok(prefs)
    }
}
