// Replacement candidate ranking
// Applies the strict language allow-list per provider and picks the
// provider group shown first.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Candidate, Preferences};

/// Providers tried, in order, when the favored provider has nothing to show
pub const FALLBACK_PROVIDERS: &[&str] = &["fanart", "tmdb", "tvdb"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    #[error("No candidates found")]
    NoCandidatesFound,

    #[error("All candidates were filtered out by language preference ({})", .languages.join(", "))]
    AllCandidatesFilteredByLanguage { languages: Vec<String> },
}

impl RankError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RankError::NoCandidatesFound => "no_candidates_found",
            RankError::AllCandidatesFilteredByLanguage { .. } => {
                "all_candidates_filtered_by_language"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidates {
    pub active_group: String,
    /// Filtered and ordered candidates per provider (possibly empty lists)
    pub groups: BTreeMap<String, Vec<Candidate>>,
}

/// Filter and order candidates per provider, then choose the active group.
///
/// Provider names are compared lowercased. Pure: the same input always gives
/// the same output.
pub fn rank_candidates<I>(results: I, preferences: &Preferences) -> Result<RankedCandidates, RankError>
where
    I: IntoIterator<Item = (String, Vec<Candidate>)>,
{
    let preferences = preferences.normalized();

    let mut groups: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for (provider, candidates) in results {
        groups
            .entry(provider.trim().to_lowercase())
            .or_default()
            .extend(candidates);
    }

    let had_candidates = groups.values().any(|list| !list.is_empty());

    if !preferences.language_order.is_empty() {
        for list in groups.values_mut() {
            apply_language_order(list, &preferences.language_order);
        }
    }

    match select_active_group(&groups, &preferences.favored_provider) {
        Some(active_group) => Ok(RankedCandidates {
            active_group,
            groups,
        }),
        None if had_candidates => Err(RankError::AllCandidatesFilteredByLanguage {
            languages: preferences.language_order,
        }),
        None => Err(RankError::NoCandidatesFound),
    }
}

/// Drop candidates whose language is not listed, then stable-sort by list position
pub fn apply_language_order(candidates: &mut Vec<Candidate>, language_order: &[String]) {
    let position = |candidate: &Candidate| {
        let language = candidate.language_code();
        language_order.iter().position(|l| *l == language)
    };

    candidates.retain(|c| position(c).is_some());
    candidates.sort_by_key(|c| position(c).unwrap_or(usize::MAX));
}

/// Favored provider if non-empty, then the fixed fallback order, then any
/// other non-empty provider by name
fn select_active_group(
    groups: &BTreeMap<String, Vec<Candidate>>,
    favored_provider: &str,
) -> Option<String> {
    let non_empty = |name: &str| groups.get(name).is_some_and(|list| !list.is_empty());

    std::iter::once(favored_provider)
        .chain(FALLBACK_PROVIDERS.iter().copied())
        .find(|&name| non_empty(name))
        .map(str::to_string)
        .or_else(|| {
            groups
                .iter()
                .find(|(_, list)| !list.is_empty())
                .map(|(name, _)| name.clone())
        })
}
