// Asset identity resolution
// Combines what the path says with the matched cache record (if any).

use crate::models::{AssetIdentity, AssetType, MediaType, ProviderIds, SourceRecord};
use crate::parser::{extract_season_episode, ParsedPath, PathParser};

use super::matcher::{MultiSourceMatcher, SourceMatch};

/// Library name tokens that mark a TV library, localized variants included
pub const DEFAULT_TV_LIBRARY_TOKENS: &[&str] = &[
    "tv", "show", "shows", "series", "serie", "serien", "séries", "seriale", "sorozatok",
    "tvshows",
];

const TV_RECORD_TOKENS: &[&str] = &[
    "tv", "tvshow", "tvshows", "show", "shows", "series", "season", "seasons", "episode",
    "episodes",
];
const MOVIE_RECORD_TOKENS: &[&str] = &["movie", "movies", "film", "films"];
const TV_HINT_KEYWORDS: &[&str] = &["show", "season", "episode", "series"];

#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub path: String,
    pub asset_type: Option<AssetType>,
    /// Caller-supplied type label, e.g. the gallery the user came from
    pub type_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: AssetIdentity,
    pub matched: Option<SourceMatch>,
}

pub struct IdentityService {
    parser: PathParser,
    matcher: MultiSourceMatcher,
    tv_library_tokens: Vec<String>,
}

impl IdentityService {
    pub fn new(parser: PathParser, matcher: MultiSourceMatcher, tv_library_tokens: Vec<String>) -> Self {
        Self {
            parser,
            matcher,
            tv_library_tokens: tv_library_tokens
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn matcher(&self) -> &MultiSourceMatcher {
        &self.matcher
    }

    /// Parse the path, look the folder up in the caches and merge the two.
    ///
    /// Always produces an identity; a total lookup failure leaves only the
    /// path-derived fields.
    pub async fn resolve(&self, request: &ResolveRequest) -> Resolution {
        let parsed = self.parser.parse(&request.path, request.asset_type);

        let matched = self
            .matcher
            .find_match(parsed.library_name.as_deref(), parsed.folder_name.as_deref())
            .await;

        let identity = merge_identity(
            &parsed,
            matched.as_ref().map(|m| &m.record),
            request.type_hint.as_deref(),
            &self.tv_library_tokens,
        );

        Resolution { identity, matched }
    }
}

/// Merge path-derived fields with a matched record.
///
/// Record ids and title win over folder tags, except that season and title
/// card records carry a composite title that is never used for display.
pub fn merge_identity(
    parsed: &ParsedPath,
    record: Option<&SourceRecord>,
    type_hint: Option<&str>,
    tv_library_tokens: &[String],
) -> AssetIdentity {
    let asset_type = parsed.asset_type;

    let provider_ids = ProviderIds {
        tmdb: record
            .and_then(|r| r.tmdb_id.clone())
            .or_else(|| parsed.provider_ids.tmdb.clone()),
        tvdb: record
            .and_then(|r| r.tvdb_id.clone())
            .or_else(|| parsed.provider_ids.tvdb.clone()),
        imdb: record
            .and_then(|r| r.imdb_id.clone())
            .or_else(|| parsed.provider_ids.imdb.clone()),
    };

    let record_title = record
        .map(|r| r.title.trim())
        .filter(|t| !t.is_empty());

    let title = if asset_type.is_episodic() {
        parsed.title.clone()
    } else {
        record_title.map(str::to_string).or_else(|| parsed.title.clone())
    };

    let (season_number, episode_number) = if asset_type.is_episodic() {
        let numbers = extract_season_episode(record_title, &parsed.path);
        let episode = if asset_type == AssetType::Titlecard {
            numbers.episode
        } else {
            None
        };
        (numbers.season, episode)
    } else {
        (None, None)
    };

    let media_type = record
        .and_then(|r| media_type_from_record(&r.record_type))
        .unwrap_or_else(|| {
            guess_media_type(asset_type, type_hint, parsed.library_name.as_deref(), tv_library_tokens)
        });

    AssetIdentity {
        provider_ids,
        title,
        year: parsed.year.or_else(|| record.and_then(|r| r.year)),
        folder_name: parsed.folder_name.clone(),
        library_name: parsed.library_name.clone(),
        media_type,
        asset_type,
        season_number,
        episode_number,
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Movie or TV when the record type says so unambiguously
pub fn media_type_from_record(record_type: &str) -> Option<MediaType> {
    let mut movie = false;
    let mut tv = false;
    for token in tokens(record_type) {
        movie |= MOVIE_RECORD_TOKENS.contains(&token.as_str());
        tv |= TV_RECORD_TOKENS.contains(&token.as_str());
    }

    match (movie, tv) {
        (true, false) => Some(MediaType::Movie),
        (false, true) => Some(MediaType::Tv),
        _ => None,
    }
}

fn guess_media_type(
    asset_type: AssetType,
    type_hint: Option<&str>,
    library_name: Option<&str>,
    tv_library_tokens: &[String],
) -> MediaType {
    if asset_type.is_episodic() {
        return MediaType::Tv;
    }

    if let Some(hint) = type_hint {
        let hint = hint.to_lowercase();
        if TV_HINT_KEYWORDS.iter().any(|k| hint.contains(k)) {
            return MediaType::Tv;
        }
    }

    if let Some(library) = library_name {
        if tokens(library).any(|t| tv_library_tokens.iter().any(|tv| *tv == t)) {
            return MediaType::Tv;
        }
    }

    MediaType::Movie
}
