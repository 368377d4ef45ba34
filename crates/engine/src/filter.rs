//! The filter pipeline: search, then favorites or tags, then sort.
//!
//! Results are index lists into [`Catalog::books`], so callers can keep them
//! next to the catalog without borrowing it.

use std::cmp::Ordering;

use catalog_core::{Book, Catalog, Favorites, FilterState, SortOrder};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filtered {
    /// Books matching the search term only. Tag counts are taken from here.
    pub searched: Vec<usize>,
    /// Final, sorted list.
    pub visible: Vec<usize>,
}

impl Filtered {
    pub fn visible_books<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Book> {
        self.visible
            .iter()
            .filter_map(|idx| catalog.get(*idx))
            .collect()
    }

    pub fn searched_books<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Book> {
        self.searched
            .iter()
            .filter_map(|idx| catalog.get(*idx))
            .collect()
    }
}

pub fn apply(catalog: &Catalog, state: &FilterState, favorites: &Favorites) -> Filtered {
    let books = catalog.books();
    let searched = search(books, &state.search_term);

    let mut visible: Vec<usize> = if state.favorites_mode {
        searched
            .iter()
            .copied()
            .filter(|idx| favorites.contains(&books[*idx].name))
            .collect()
    } else if !state.active_tags.is_empty() {
        searched
            .iter()
            .copied()
            .filter(|idx| {
                books[*idx]
                    .tags
                    .iter()
                    .any(|tag| state.active_tags.contains(tag))
            })
            .collect()
    } else {
        searched.clone()
    };

    sort_books(books, &mut visible, state.sort_order);
    log::debug!(
        "filter: {} searched, {} visible of {}",
        searched.len(),
        visible.len(),
        books.len()
    );

    Filtered { searched, visible }
}

/// Indices of the books whose name, description, tags or year contain `term`,
/// ignoring case. An empty term keeps everything.
pub fn search(books: &[Book], term: &str) -> Vec<usize> {
    let needle = term.to_lowercase();
    books
        .iter()
        .enumerate()
        .filter(|(_, book)| matches_search(book, &needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// `needle` must already be lowercase.
pub fn matches_search(book: &Book, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    book.name.to_lowercase().contains(needle)
        || book.description.to_lowercase().contains(needle)
        || book.joined_tags(" ").to_lowercase().contains(needle)
        || book.release_year.to_lowercase().contains(needle)
}

/// Stable sort of `indices` by `order`. `Relevance` leaves them untouched.
pub fn sort_books(books: &[Book], indices: &mut [usize], order: SortOrder) {
    match order {
        SortOrder::Relevance => {}
        SortOrder::NameAsc => {
            indices.sort_by(|a, b| compare_names(&books[*a].name, &books[*b].name));
        }
        SortOrder::NameDesc => {
            indices.sort_by(|a, b| compare_names(&books[*b].name, &books[*a].name));
        }
        SortOrder::YearNewest => {
            indices.sort_by(|a, b| compare_years(books[*a].year(), books[*b].year(), true));
        }
        SortOrder::YearOldest => {
            indices.sort_by(|a, b| compare_years(books[*a].year(), books[*b].year(), false));
        }
    }
}

pub(crate) fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

// Undated books go last in both directions.
fn compare_years(a: Option<i32>, b: Option<i32>, newest_first: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if newest_first => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
