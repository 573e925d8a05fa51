#![forbid(unsafe_code)]

use tf_core::Entity;

/// View filter held next to, and independently of, the raw collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter<C> {
    pub search: String,
    pub category: Option<C>,
}

impl<C> Default for Filter<C> {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
        }
    }
}

impl<C> Filter<C> {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: text.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: C) -> Self {
        self.category = Some(category);
        self
    }
}

/// Filtered, rank-sorted view of `items`. Text matches case-insensitively; an empty
/// search matches everything; the category, when set, must match exactly.
pub fn project<E: Entity>(items: &[E], filter: &Filter<E::Category>) -> Vec<E> {
    let needle = filter.search.to_lowercase();
    let mut view = items
        .iter()
        .filter(|item| filter.category.is_none_or(|category| item.category() == category))
        .filter(|item| needle.is_empty() || item.matches_text(&needle))
        .cloned()
        .collect::<Vec<_>>();
    view.sort_by_key(|item| item.rank());
    view
}
