//! Recipient resolution.

use std::collections::HashSet;

/// Merge build-derived recipients with extra ones, dropping duplicates.
///
/// `base` comes first, then `extra`. The first occurrence of an identifier
/// keeps its position. Identifiers are not validated here; empty strings
/// pass through and are rejected when messengers are built.
#[must_use]
pub fn resolve<B, E>(base: B, extra: Option<E>) -> Vec<String>
where
    B: IntoIterator,
    B::Item: Into<String>,
    E: IntoIterator,
    E::Item: Into<String>,
{
    let mut seen = HashSet::new();

    base.into_iter()
        .map(Into::into)
        .chain(extra.into_iter().flatten().map(Into::into))
        .filter(|recipient| seen.insert(recipient.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_first_occurrence_order() {
        let resolved = resolve(["a", "b", "a"], Some(["c", "b"]));
        assert_eq!(resolved, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_resolve_without_extra() {
        let resolved = resolve(vec!["@alice".to_string()], None::<Vec<String>>);
        assert_eq!(resolved, vec!["@alice"]);
    }

    #[test]
    fn test_resolve_passes_empty_identifiers() {
        let resolved = resolve(["", "x", ""], Some(Vec::<String>::new()));
        assert_eq!(resolved, vec!["", "x"]);
    }
}
