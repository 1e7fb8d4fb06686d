use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Language code used for candidates that carry no language (textless art)
pub const NO_LANGUAGE: &str = "xx";

/// Sentinel that makes a per-asset language list inherit the poster list
pub const INHERIT_POSTER_LANGUAGES: &str = "inherit";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Tv => write!(f, "tv"),
        }
    }
}

/// The artwork slot being replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    #[default]
    Poster,
    Background,
    Season,
    Titlecard,
}

impl AssetType {
    /// Parse a loosely spelled asset type hint ("Title Card", "backdrop", ...)
    pub fn from_hint(hint: &str) -> Option<Self> {
        let normalized: String = hint
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "poster" => Some(AssetType::Poster),
            "background" | "backdrop" | "fanart" => Some(AssetType::Background),
            "season" | "seasonposter" => Some(AssetType::Season),
            "titlecard" | "episode" | "still" => Some(AssetType::Titlecard),
            _ => None,
        }
    }

    /// Season posters and title cards carry season/episode numbers
    pub fn is_episodic(&self) -> bool {
        matches!(self, AssetType::Season | AssetType::Titlecard)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::Poster => write!(f, "poster"),
            AssetType::Background => write!(f, "background"),
            AssetType::Season => write!(f, "season"),
            AssetType::Titlecard => write!(f, "titlecard"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIds {
    pub tmdb: Option<String>,
    pub tvdb: Option<String>,
    pub imdb: Option<String>,
}

/// Resolved description of a media item and the artwork slot being replaced.
///
/// Built fresh for every replace session and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIdentity {
    pub provider_ids: ProviderIds,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub folder_name: Option<String>,
    pub library_name: Option<String>,
    pub media_type: MediaType,
    pub asset_type: AssetType,
    /// Season 0 is "Specials" and is a real value
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
}

/// A row from one of the metadata caches, after normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub library_name: String,
    pub root_folder: String,
    pub title: String,
    /// Free-text classification ("Show", "Season", "Movie Background", ...)
    #[serde(rename = "type")]
    pub record_type: String,
    pub tmdb_id: Option<String>,
    pub tvdb_id: Option<String>,
    pub imdb_id: Option<String>,
    pub year: Option<i32>,
}

/// One replacement image offered by an art provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "source", default)]
    pub source_provider: String,
    pub url: String,
    #[serde(default)]
    pub original_url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Candidate {
    /// Language code used for filtering; absent and blank mean textless
    pub fn language_code(&self) -> String {
        match self.language.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_ascii_lowercase(),
            _ => NO_LANGUAGE.to_string(),
        }
    }
}

/// Concrete ranking preferences for one asset type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub favored_provider: String,
    /// Empty means no language filtering
    #[serde(default)]
    pub language_order: Vec<String>,
}

impl Preferences {
    pub fn new(favored_provider: &str, language_order: &[String]) -> Self {
        Self {
            favored_provider: favored_provider.trim().to_ascii_lowercase(),
            language_order: normalize_languages(language_order.iter().map(String::as_str)),
        }
    }

    /// Trim and lowercase values that arrived from outside
    pub fn normalized(&self) -> Self {
        Self::new(&self.favored_provider, &self.language_order)
    }
}

/// A per-asset language list that may defer to the poster list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLanguageSetting", into = "RawLanguageSetting")]
pub enum LanguageSetting {
    #[default]
    InheritPoster,
    Languages(Vec<String>),
}

/// Accepts `"en, de"`, `["en", "de"]`, `"inherit"` or `["inherit"]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawLanguageSetting {
    Text(String),
    List(Vec<String>),
}

impl From<RawLanguageSetting> for LanguageSetting {
    fn from(raw: RawLanguageSetting) -> Self {
        let languages = raw.into_languages();

        if languages.len() == 1 && languages[0] == INHERIT_POSTER_LANGUAGES {
            LanguageSetting::InheritPoster
        } else {
            LanguageSetting::Languages(languages)
        }
    }
}

impl RawLanguageSetting {
    fn into_languages(self) -> Vec<String> {
        let values: Vec<String> = match self {
            RawLanguageSetting::Text(text) => text.split(',').map(str::to_string).collect(),
            RawLanguageSetting::List(list) => list,
        };
        normalize_languages(values.iter().map(String::as_str))
    }
}

/// A plain language list in either the comma-separated or the array form
fn language_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawLanguageSetting::deserialize(deserializer)?.into_languages())
}

impl From<LanguageSetting> for RawLanguageSetting {
    fn from(setting: LanguageSetting) -> Self {
        match setting {
            LanguageSetting::InheritPoster => {
                RawLanguageSetting::Text(INHERIT_POSTER_LANGUAGES.to_string())
            }
            LanguageSetting::Languages(list) => RawLanguageSetting::List(list),
        }
    }
}

/// Preferences as stored: favored provider plus one language list per asset type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagePreferences {
    pub favored_provider: String,
    #[serde(deserialize_with = "language_list")]
    pub poster: Vec<String>,
    pub background: LanguageSetting,
    pub season: LanguageSetting,
    pub titlecard: LanguageSetting,
}

impl Default for LanguagePreferences {
    fn default() -> Self {
        Self {
            favored_provider: "tmdb".to_string(),
            poster: Vec::new(),
            background: LanguageSetting::InheritPoster,
            season: LanguageSetting::InheritPoster,
            titlecard: LanguageSetting::InheritPoster,
        }
    }
}

impl LanguagePreferences {
    /// Resolve the concrete ranking preferences for an asset type
    pub fn resolve(&self, asset_type: AssetType) -> Preferences {
        let setting = match asset_type {
            AssetType::Poster => None,
            AssetType::Background => Some(&self.background),
            AssetType::Season => Some(&self.season),
            AssetType::Titlecard => Some(&self.titlecard),
        };

        let languages = match setting {
            Some(LanguageSetting::Languages(list)) => list.as_slice(),
            Some(LanguageSetting::InheritPoster) | None => self.poster.as_slice(),
        };

        Preferences::new(&self.favored_provider, languages)
    }
}

fn normalize_languages<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
