//! Core domain types for the book catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Marker some data files put in front of tag names (`"#fantasia"`).
pub const TAG_MARKER: char = '#';

pub const DEFAULT_DATA_PATH: &str = "data.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_path: String,
    pub max_visible_tags: usize,
    pub loading_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: DEFAULT_DATA_PATH.to_string(),
            max_visible_tags: 10,
            loading_delay_ms: 300,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.max_visible_tags = self.max_visible_tags.clamp(1, 100);
        self.loading_delay_ms = self.loading_delay_ms.min(2000);
        let data_path = self.data_path.trim();
        self.data_path = if data_path.is_empty() {
            DEFAULT_DATA_PATH.to_string()
        } else {
            data_path.to_string()
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "data_lancamento")]
    pub release_year: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "imagem", default)]
    pub image: String,
    #[serde(default)]
    pub link: String,
}

impl Book {
    pub fn year(&self) -> Option<i32> {
        self.release_year.trim().parse().ok()
    }

    pub fn joined_tags(&self, sep: &str) -> String {
        self.tags.join(sep)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

pub fn normalize_tag(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(TAG_MARKER)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// The full, unfiltered list of books in data-file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub fn new(mut books: Vec<Book>) -> Self {
        for book in &mut books {
            book.tags = book
                .tags
                .iter()
                .map(|tag| normalize_tag(tag))
                .filter(|tag| !tag.is_empty())
                .collect();
        }
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Book> {
        self.books.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.books.iter().any(|book| book.has_tag(tag))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Relevance,
    NameAsc,
    NameDesc,
    YearNewest,
    YearOldest,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Relevance,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
        SortOrder::YearNewest,
        SortOrder::YearOldest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevancia",
            SortOrder::NameAsc => "nome-asc",
            SortOrder::NameDesc => "nome-desc",
            SortOrder::YearNewest => "ano-recente",
            SortOrder::YearOldest => "ano-antigo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "Relevance",
            SortOrder::NameAsc => "Name A-Z",
            SortOrder::NameDesc => "Name Z-A",
            SortOrder::YearNewest => "Newest",
            SortOrder::YearOldest => "Oldest",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortOrder::Relevance => SortOrder::NameAsc,
            SortOrder::NameAsc => SortOrder::NameDesc,
            SortOrder::NameDesc => SortOrder::YearNewest,
            SortOrder::YearNewest => SortOrder::YearOldest,
            SortOrder::YearOldest => SortOrder::Relevance,
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortOrder {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        SortOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == value)
            .ok_or("unknown sort order")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err("unknown theme"),
        }
    }
}

/// Per-session filter inputs. The active tag set and favorites-mode never
/// apply together: turning one on clears the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_term: String,
    pub active_tags: BTreeSet<String>,
    pub favorites_mode: bool,
    pub sort_order: SortOrder,
}

impl FilterState {
    /// Returns whether the tag is active after the toggle.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.active_tags.remove(tag) {
            return false;
        }
        self.active_tags.insert(tag.to_string());
        self.favorites_mode = false;
        true
    }

    pub fn set_favorites_mode(&mut self, on: bool) {
        self.favorites_mode = on;
        if on {
            self.active_tags.clear();
        }
    }

    pub fn has_filters(&self) -> bool {
        !self.search_term.is_empty() || !self.active_tags.is_empty() || self.favorites_mode
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites(BTreeSet<String>);

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Returns whether the book is a favorite after the toggle.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.0.remove(name) {
            false
        } else {
            self.0.insert(name.to_string());
            true
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&String) -> bool) {
        self.0.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl FromIterator<String> for Favorites {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything that survives between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub favorites: Favorites,
    pub filter: FilterState,
    pub theme: Theme,
}

pub trait StateStore {
    fn load_state(&self) -> anyhow::Result<PersistedState>;
    fn save_state(&self, state: &PersistedState) -> anyhow::Result<()>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn load_state(&self) -> anyhow::Result<PersistedState> {
        (**self).load_state()
    }

    fn save_state(&self, state: &PersistedState) -> anyhow::Result<()> {
        (**self).save_state(state)
    }
}
