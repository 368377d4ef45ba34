//! Application orchestration layer for the book catalog.
//!
//! [`AppContext`] holds every piece of session state explicitly; the
//! [`Controller`] is the single entry point that turns an [`Action`] into a
//! state transition, recomputes the visible set, and snapshots the result
//! through a [`StateStore`].

use std::time::Duration;

use anyhow::Context as _;
use catalog_core::{
    Book, Catalog, Favorites, FilterState, PersistedState, Settings, SortOrder, StateStore, Theme,
};
use catalog_engine::{Filtered, RenderedView, TagCount, TagPanel, count_tags, render_cards, tag_panel};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub catalog: Catalog,
    pub filter: FilterState,
    pub favorites: Favorites,
    pub theme: Theme,
    pub details: Option<String>,
    pub tags_expanded: bool,
    pub load_error: Option<String>,
    filtered: Filtered,
    ranking: Vec<TagCount>,
    population: Vec<TagCount>,
}

impl AppContext {
    pub fn new(mut settings: Settings) -> Self {
        settings.normalize();
        Self {
            settings,
            catalog: Catalog::default(),
            filter: FilterState::default(),
            favorites: Favorites::new(),
            theme: Theme::default(),
            details: None,
            tags_expanded: false,
            load_error: None,
            filtered: Filtered::default(),
            ranking: Vec::new(),
            population: Vec::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.ranking = count_tags(catalog.books());
        self.catalog = catalog;
        self.load_error = None;
        self.recompute();
        self
    }

    /// A session whose catalog never arrived: empty and inert.
    pub fn with_load_error(mut self, error: impl Into<String>) -> Self {
        self.catalog = Catalog::default();
        self.ranking.clear();
        self.load_error = Some(error.into());
        self.recompute();
        self
    }

    pub fn is_ready(&self) -> bool {
        self.load_error.is_none()
    }

    pub fn recompute(&mut self) {
        self.filtered = catalog_engine::apply(&self.catalog, &self.filter, &self.favorites);
        self.population = count_tags(self.filtered.searched_books(&self.catalog));
        if let Some(name) = self.details.as_deref()
            && !self.catalog.contains(name)
        {
            self.details = None;
        }
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.filtered.visible
    }

    pub fn visible_books(&self) -> Vec<&Book> {
        self.filtered.visible_books(&self.catalog)
    }

    /// Tag counts over the search-filtered population.
    pub fn tag_counts(&self) -> &[TagCount] {
        &self.population
    }

    pub fn tag_panel(&self) -> TagPanel {
        tag_panel(
            &self.ranking,
            &self.population,
            &self.filter.active_tags,
            self.settings.max_visible_tags,
            self.tags_expanded,
        )
    }

    pub fn render(&self) -> RenderedView {
        render_cards(
            &self.visible_books(),
            &self.filter.search_term,
            &self.favorites,
        )
    }

    pub fn details_book(&self) -> Option<&Book> {
        self.details
            .as_deref()
            .and_then(|name| self.catalog.find(name))
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            favorites: self.favorites.clone(),
            filter: self.filter.clone(),
            theme: self.theme,
        }
    }

    /// Reapplies a saved snapshot. Favorites and tags that no longer exist in
    /// the catalog are dropped; the caller recomputes afterwards.
    pub fn apply_persisted(&mut self, mut state: PersistedState) {
        if self.is_ready() {
            let catalog = &self.catalog;
            state.favorites.retain(|name| catalog.contains(name));
            state.filter.active_tags.retain(|tag| catalog.has_tag(tag));
        }
        if state.filter.favorites_mode {
            state.filter.active_tags.clear();
        }
        self.favorites = state.favorites;
        self.filter = state.filter;
        self.theme = state.theme;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetSearch(String),
    ApplySearch,
    ToggleTag(String),
    ClearFilters,
    SetSort(SortOrder),
    CycleSort,
    ToggleFavorite(String),
    ToggleFavoritesMode,
    ToggleTheme,
    PickRandom,
    OpenDetails(String),
    CloseDetails,
    ToggleMoreTags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub visible_changed: bool,
    /// How long the front end should show its loading indicator before the
    /// final redraw.
    pub loading: Duration,
}

pub struct Controller<S> {
    ctx: AppContext,
    store: S,
    rng: StdRng,
}

impl<S: StateStore> Controller<S> {
    pub fn new(ctx: AppContext, store: S) -> Self {
        Self {
            ctx,
            store,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (AppContext, S) {
        (self.ctx, self.store)
    }

    /// Loads the persisted snapshot and recomputes once every field is back.
    pub fn restore(&mut self) -> anyhow::Result<()> {
        let state = self.store.load_state().context("load persisted state")?;
        log::debug!(
            "restore: {} favorites, {} active tags, sort {}",
            state.favorites.len(),
            state.filter.active_tags.len(),
            state.filter.sort_order
        );
        self.ctx.apply_persisted(state);
        self.ctx.recompute();
        Ok(())
    }

    pub fn dispatch(&mut self, action: Action) -> anyhow::Result<Transition> {
        if !self.ctx.is_ready() {
            log::debug!("ignoring {action:?}: catalog not loaded");
            return Ok(Transition::default());
        }
        log::debug!("dispatch {action:?}");

        let before = self.ctx.filtered.visible.clone();
        let mut refilter = false;
        let mut persist = false;

        match action {
            Action::SetSearch(term) => {
                self.ctx.filter.search_term = term;
                refilter = true;
                persist = true;
            }
            Action::ApplySearch => {
                refilter = true;
            }
            Action::ToggleTag(tag) => {
                if self.ctx.catalog.has_tag(&tag) || self.ctx.filter.active_tags.contains(&tag) {
                    self.ctx.filter.toggle_tag(&tag);
                    refilter = true;
                    persist = true;
                }
            }
            Action::ClearFilters => {
                self.ctx.filter.clear();
                self.ctx.tags_expanded = false;
                refilter = true;
                persist = true;
            }
            Action::SetSort(order) => {
                self.ctx.filter.sort_order = order;
                refilter = true;
                persist = true;
            }
            Action::CycleSort => {
                self.ctx.filter.sort_order = self.ctx.filter.sort_order.next();
                refilter = true;
                persist = true;
            }
            Action::ToggleFavorite(name) => {
                if self.ctx.catalog.contains(&name) {
                    self.ctx.favorites.toggle(&name);
                    refilter = true;
                    persist = true;
                }
            }
            Action::ToggleFavoritesMode => {
                let on = !self.ctx.filter.favorites_mode;
                self.ctx.filter.set_favorites_mode(on);
                refilter = true;
                persist = true;
            }
            Action::ToggleTheme => {
                self.ctx.theme = self.ctx.theme.toggle();
                persist = true;
            }
            Action::PickRandom => {
                let picked = self
                    .ctx
                    .filtered
                    .visible
                    .choose(&mut self.rng)
                    .and_then(|idx| self.ctx.catalog.get(*idx))
                    .map(|book| book.name.clone());
                if picked.is_some() {
                    self.ctx.details = picked;
                }
            }
            Action::OpenDetails(name) => {
                if self.ctx.catalog.contains(&name) {
                    self.ctx.details = Some(name);
                }
            }
            Action::CloseDetails => {
                self.ctx.details = None;
            }
            Action::ToggleMoreTags => {
                self.ctx.tags_expanded = !self.ctx.tags_expanded;
            }
        }

        if refilter {
            self.ctx.recompute();
        }
        if persist {
            self.store
                .save_state(&self.ctx.snapshot())
                .context("persist session state")?;
        }

        let loading = if refilter {
            Duration::from_millis(self.ctx.settings.loading_delay_ms)
        } else {
            Duration::ZERO
        };
        Ok(Transition {
            visible_changed: before != self.ctx.filtered.visible,
            loading,
        })
    }
}
