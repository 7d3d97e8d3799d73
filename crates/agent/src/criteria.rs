use std::collections::HashSet;

use qualcel_core::domain::conversation::UserTurn;
use qualcel_core::domain::criterion::Criterion;
use qualcel_core::domain::selectors::SelectorMap;

/// Trimmed criterion, or `None` when the type or the description is blank.
pub fn normalize(criterion: &Criterion) -> Option<Criterion> {
    criterion.normalized()
}

/// Merges criteria lists in priority order. The first occurrence of each
/// case-insensitive `type::description` key wins; absent lists are skipped.
pub fn merge_criteria_lists<'a, I>(lists: I) -> Vec<Criterion>
where
    I: IntoIterator<Item = Option<&'a [Criterion]>>,
{
    let (merged, _) = lists.into_iter().flatten().flatten().filter_map(normalize).fold(
        (Vec::new(), HashSet::new()),
        |(mut merged, mut seen), criterion| {
            if seen.insert(criterion.dedup_key()) {
                merged.push(criterion);
            }
            (merged, seen)
        },
    );
    merged
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserCriteriaSplit {
    pub structured: Vec<Criterion>,
    pub free_text: Vec<String>,
}

/// Routes `free_text` criteria of the turn into plain text chunks and keeps
/// everything else as structured criteria.
pub fn split_user_criteria(turn: Option<&UserTurn>) -> UserCriteriaSplit {
    let Some(turn) = turn else {
        return UserCriteriaSplit::default();
    };

    let (free, structured): (Vec<Criterion>, Vec<Criterion>) =
        turn.criteria.iter().filter_map(normalize).partition(Criterion::is_free_text);

    UserCriteriaSplit {
        structured,
        free_text: free.into_iter().map(|criterion| criterion.description).collect(),
    }
}

/// One criterion per populated selector, typed with the selector key.
pub fn criteria_from_selectors(selectors: &SelectorMap) -> Vec<Criterion> {
    selectors
        .entries()
        .into_iter()
        .filter_map(|(key, value)| normalize(&Criterion::new(key, value)))
        .collect()
}

/// The turn's console input, trimmed, or `None` when blank.
pub fn collect_console_input(turn: Option<&UserTurn>) -> Option<String> {
    turn.and_then(|turn| turn.console_input.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// What the user typed: console input, else the rendered bubble content.
pub fn user_text(turn: Option<&UserTurn>) -> Option<String> {
    collect_console_input(turn).or_else(|| {
        turn.and_then(|turn| turn.content.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
    })
}
