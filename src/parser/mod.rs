// Asset path parsing
// Reconstructs library, media folder, title/year, provider ids and
// season/episode markers from an artwork path like
// "4K/Man-Thing (2005) {tmdb-18882}/poster.jpg"

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{AssetType, ProviderIds};

// Markers
static RE_SEASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)season\s*(\d{1,4})").unwrap());
static RE_SEASON_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,4})e(\d{1,4})").unwrap());
static RE_YEAR_IN_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d{4}\)").unwrap());
static RE_SHOW_ID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\{\[\(](?:tmdb|tvdb)(?:id)?-[^\}\]\)]+[\}\]\)]").unwrap()
});

// Tag stripping passes, applied in this order
static RE_CURLY_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static RE_SQUARE_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static RE_PROVIDER_PAREN_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((?:tmdb|tvdb|imdb)(?:id)?-[^)]*\)").unwrap());
static RE_HYPHENATED_PAREN_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\w+-\w+\)").unwrap());
static RE_SPACE_COLLAPSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// Title / year
static RE_TITLE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((\d{4})\)\s*$").unwrap());
static RE_BARE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?(\d{4})\)?").unwrap());

// Provider ids, inside any of {}, [] or ()
static RE_TMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\{\[\(]tmdb(?:id)?-(\d+)[\}\]\)]").unwrap());
static RE_TVDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\{\[\(]tvdb(?:id)?-(\d+)[\}\]\)]").unwrap());
static RE_IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\{\[\(]imdb(?:id)?-(tt\d+)[\}\]\)]").unwrap());

/// Conventional library folder tokens ("4K", "TV Shows", "Movies", ...)
pub const DEFAULT_LIBRARY_FOLDERS: &[&str] = &[
    "4k", "uhd", "tv", "tvshows", "movies", "movie", "series", "shows", "anime", "kids",
];

/// Everything that can be read off the path alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// Path with separators normalized to '/'
    pub path: String,
    pub library_name: Option<String>,
    pub asset_type: AssetType,
    /// Raw media folder segment, tags included (the record `rootFolder`)
    pub folder_name: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub provider_ids: ProviderIds,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonEpisode {
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PathParser {
    library_folders: Vec<String>,
}

impl Default for PathParser {
    fn default() -> Self {
        Self::new(DEFAULT_LIBRARY_FOLDERS.iter().map(|s| s.to_string()).collect())
    }
}

impl PathParser {
    pub fn new(library_folders: Vec<String>) -> Self {
        Self {
            library_folders: library_folders
                .into_iter()
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    /// Parse an asset path. Never fails; anything unresolved stays `None`.
    pub fn parse(&self, path: &str, asset_type_hint: Option<AssetType>) -> ParsedPath {
        let segments = split_segments(path);
        let normalized = segments.join("/");

        let asset_type = asset_type_hint.unwrap_or_else(|| detect_asset_type(&normalized));
        let library_name = self.detect_library_name(&segments);
        let folder_name = locate_folder(&segments, asset_type).map(|i| segments[i].clone());

        let (title, year) = match folder_name.as_deref() {
            Some(folder) => extract_title_year(&strip_tags(folder)),
            None => (None, None),
        };

        let provider_ids = folder_name
            .as_deref()
            .map(extract_provider_ids)
            .unwrap_or_default();

        let numbers = if asset_type.is_episodic() {
            extract_season_episode(None, &normalized)
        } else {
            SeasonEpisode::default()
        };

        ParsedPath {
            path: normalized,
            library_name,
            asset_type,
            folder_name,
            title,
            year,
            provider_ids,
            season_number: numbers.season,
            episode_number: if asset_type == AssetType::Titlecard {
                numbers.episode
            } else {
                None
            },
        }
    }

    /// First segment that looks like a library folder, else the first segment
    fn detect_library_name(&self, segments: &[String]) -> Option<String> {
        // The last segment is the image file itself
        let folders = if segments.len() > 1 {
            &segments[..segments.len() - 1]
        } else {
            segments
        };

        folders
            .iter()
            .find(|segment| self.is_library_folder(segment))
            .or_else(|| segments.first())
            .cloned()
    }

    fn is_library_folder(&self, segment: &str) -> bool {
        if RE_YEAR_IN_PARENS.is_match(segment) || RE_SHOW_ID_TAG.is_match(segment) {
            return false;
        }
        segment
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| self.library_folders.iter().any(|f| f == token))
    }
}

/// Split on either separator convention, dropping empty segments
pub fn split_segments(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Content heuristics: background, then SeasonNN, then SxxEyy (title card)
pub fn detect_asset_type(path: &str) -> AssetType {
    if path.to_lowercase().contains("background") {
        AssetType::Background
    } else if RE_SEASON.is_match(path) {
        AssetType::Season
    } else if RE_SEASON_EPISODE.is_match(path) {
        AssetType::Titlecard
    } else {
        AssetType::Poster
    }
}

fn has_episode_marker(segment: &str) -> bool {
    RE_SEASON.is_match(segment) || RE_SEASON_EPISODE.is_match(segment)
}

/// Index of the media folder segment for the given asset type
pub fn locate_folder(segments: &[String], asset_type: AssetType) -> Option<usize> {
    let found = if asset_type.is_episodic() {
        // Show folder is the nearest ancestor of the last marker that is not a marker itself
        segments
            .iter()
            .rposition(|s| has_episode_marker(s))
            .and_then(|marker| (0..marker).rev().find(|&i| !has_episode_marker(&segments[i])))
    } else {
        segments.iter().rposition(|s| RE_YEAR_IN_PARENS.is_match(s))
    };

    found.or_else(|| segments.iter().position(|s| RE_SHOW_ID_TAG.is_match(s)))
}

/// Remove `{..}`, `[..]`, provider `(..)` and `(word-word)` groups.
///
/// Repeats the passes until nothing changes, so the result is a fixpoint.
pub fn strip_tags(name: &str) -> String {
    let mut current = collapse_whitespace(name);
    loop {
        let stripped = RE_CURLY_GROUP.replace_all(&current, " ");
        let stripped = RE_SQUARE_GROUP.replace_all(&stripped, " ");
        let stripped = RE_PROVIDER_PAREN_GROUP.replace_all(&stripped, " ");
        let stripped = RE_HYPHENATED_PAREN_GROUP.replace_all(&stripped, " ");
        let next = collapse_whitespace(&stripped);

        if next == current {
            return next;
        }
        current = next;
    }
}

fn collapse_whitespace(text: &str) -> String {
    RE_SPACE_COLLAPSE.replace_all(text, " ").trim().to_string()
}

/// `Title (YYYY)`, else a bare year anywhere, else the whole string as title
pub fn extract_title_year(cleaned: &str) -> (Option<String>, Option<i32>) {
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return (None, None);
    }

    if let Some(caps) = RE_TITLE_YEAR.captures(cleaned) {
        let title = caps[1].trim().to_string();
        let year = caps[2].parse().ok();
        return (Some(title), year);
    }

    if let Some(caps) = RE_BARE_YEAR.captures(cleaned) {
        let year = caps[1].parse().ok();
        let remainder = collapse_whitespace(&RE_BARE_YEAR.replace(cleaned, " "));
        let title = if remainder.is_empty() {
            cleaned.to_string()
        } else {
            remainder
        };
        return (Some(title), year);
    }

    (Some(cleaned.to_string()), None)
}

/// Provider id tags in a folder name
pub fn extract_provider_ids(folder: &str) -> ProviderIds {
    ProviderIds {
        tmdb: first_capture(&RE_TMDB_ID, folder),
        tvdb: first_capture(&RE_TVDB_ID, folder),
        imdb: first_capture(&RE_IMDB_ID, folder).map(|id| id.to_lowercase()),
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].to_string())
}

/// Season/episode numbers, preferring a trusted record title over the path.
///
/// Each field falls back to the path independently. Season 0 is a value.
pub fn extract_season_episode(trusted_title: Option<&str>, path: &str) -> SeasonEpisode {
    let from_title = trusted_title.map(season_episode_in).unwrap_or_default();
    let from_path = season_episode_in(path);

    SeasonEpisode {
        season: from_title.season.or(from_path.season),
        episode: from_title.episode.or(from_path.episode),
    }
}

fn season_episode_in(text: &str) -> SeasonEpisode {
    if let Some(caps) = RE_SEASON_EPISODE.captures(text) {
        return SeasonEpisode {
            season: caps[1].parse().ok(),
            episode: caps[2].parse().ok(),
        };
    }

    SeasonEpisode {
        season: RE_SEASON
            .captures(text)
            .and_then(|caps| caps[1].parse().ok()),
        episode: None,
    }
}
