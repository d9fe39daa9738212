//! Category and account matching for parsed transaction hints.
//!
//! External parsers (receipts, voice, bank imports) produce free-text hints;
//! this module resolves them against the owner's own categories and accounts
//! through an ordered list of strategies, returning the first hit. Callers
//! fall back to a default category/account when nothing matches.

use uuid::Uuid;

/// A category or account name offered for matching.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// Id of the underlying row.
    pub id: Uuid,
    /// Display name matched against the hint.
    pub name: String,
}

/// One way of resolving a hint to a candidate. Strategies are tried in
/// order; the first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Case-insensitive whole-name equality.
    Exact,
    /// Case-insensitive containment in either direction.
    Substring,
    /// Fixed keyword table mapping hint words to a category group name.
    KeywordGroup,
}

/// Keyword groups for hints that name a merchant or activity rather than a
/// category. The group name is then matched against the candidate names.
const KEYWORD_GROUPS: &[(&str, &[&str])] = &[
    (
        "food & dining",
        &["coffee", "cafe", "restaurant", "lunch", "dinner", "breakfast", "food"],
    ),
    (
        "transportation",
        &["grab", "taxi", "uber", "bus", "train", "fuel", "petrol", "gas", "parking"],
    ),
    ("groceries", &["grocery", "supermarket", "market"]),
    ("utilities", &["electricity", "water bill", "internet", "phone bill"]),
    ("entertainment", &["netflix", "spotify", "movie", "cinema", "game"]),
    ("housing", &["rent", "mortgage"]),
    ("salary", &["salary", "payroll", "wage"]),
    ("health", &["pharmacy", "hospital", "doctor", "medicine"]),
];

impl MatchStrategy {
    fn apply<'a>(self, hint: &str, candidates: &'a [MatchCandidate]) -> Option<&'a MatchCandidate> {
        let hint = hint.trim().to_lowercase();
        if hint.is_empty() {
            return None;
        }
        match self {
            Self::Exact => candidates.iter().find(|c| c.name.to_lowercase() == hint),
            Self::Substring => candidates.iter().find(|c| {
                let name = c.name.to_lowercase();
                name.contains(&hint) || hint.contains(&name)
            }),
            Self::KeywordGroup => {
                let group = KEYWORD_GROUPS
                    .iter()
                    .find(|(_, keywords)| keywords.iter().any(|k| hint.contains(k)))
                    .map(|(group, _)| *group)?;
                candidates
                    .iter()
                    .find(|c| c.name.to_lowercase().contains(group))
            }
        }
    }
}

fn first_match<'a>(
    hint: &str,
    candidates: &'a [MatchCandidate],
    strategies: &[MatchStrategy],
) -> Option<&'a MatchCandidate> {
    strategies.iter().find_map(|s| s.apply(hint, candidates))
}

/// Resolves a category hint against the owner's categories.
#[must_use]
pub fn match_category<'a>(
    hint: &str,
    candidates: &'a [MatchCandidate],
) -> Option<&'a MatchCandidate> {
    first_match(
        hint,
        candidates,
        &[
            MatchStrategy::Exact,
            MatchStrategy::Substring,
            MatchStrategy::KeywordGroup,
        ],
    )
}

/// Resolves an account hint against the owner's accounts. Account names are
/// user-chosen, so the keyword table does not apply.
#[must_use]
pub fn match_account<'a>(
    hint: &str,
    candidates: &'a [MatchCandidate],
) -> Option<&'a MatchCandidate> {
    first_match(
        hint,
        candidates,
        &[MatchStrategy::Exact, MatchStrategy::Substring],
    )
}
