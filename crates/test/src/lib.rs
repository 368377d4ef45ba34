//! Test helpers and fixtures.

use std::cell::RefCell;

use catalog_core::{Book, Catalog, PersistedState, StateStore};

pub fn make_book(name: &str, year: &str, tags: &[&str]) -> Book {
    Book {
        name: name.to_string(),
        release_year: year.to_string(),
        description: format!("Description of {name}"),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image: format!("img/{}.jpg", name.to_lowercase().replace(' ', "-")),
        link: format!("https://example.org/{}", name.to_lowercase().replace(' ', "-")),
    }
}

/// A small catalog with raw, un-normalized tags as they appear in data files.
pub fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        make_book("O Hobbit", "1937", &["#fantasia", " #aventura"]),
        make_book("Duna", "1965", &["#ficcao", "#aventura"]),
        make_book("Dom Casmurro", "1899", &["#romance", "#classico"]),
        make_book("Neuromancer", "1984", &["#ficcao", "#cyberpunk"]),
        make_book("Orgulho e Preconceito", "1813", &["#romance", "#classico"]),
        make_book("C++ Primer", "2012", &["#tecnico"]),
    ])
}

/// In-memory `StateStore` counting writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<PersistedState>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: RefCell::new(state),
            saves: RefCell::new(0),
        }
    }

    pub fn state(&self) -> PersistedState {
        self.state.borrow().clone()
    }

    pub fn saves(&self) -> usize {
        *self.saves.borrow()
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self) -> anyhow::Result<PersistedState> {
        Ok(self.state.borrow().clone())
    }

    fn save_state(&self, state: &PersistedState) -> anyhow::Result<()> {
        *self.state.borrow_mut() = state.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use catalog_application::{Action, AppContext, Controller};
    use catalog_core::{Settings, SortOrder, Theme};
    use catalog_storage::Storage;

    use super::*;

    fn controller<S: StateStore>(store: S) -> Controller<S> {
        let ctx = AppContext::new(Settings::default()).with_catalog(sample_catalog());
        Controller::new(ctx, store).with_seed(42)
    }

    fn visible<S: StateStore>(c: &Controller<S>) -> Vec<String> {
        c.ctx()
            .visible_books()
            .into_iter()
            .map(|b| b.name.clone())
            .collect()
    }

    #[test]
    fn sample_catalog_tags_are_normalized() {
        let catalog = sample_catalog();
        assert_eq!(catalog.books()[0].tags, vec!["fantasia", "aventura"]);
    }

    #[test]
    fn every_action_persists_through_memory_store() -> anyhow::Result<()> {
        let mut c = controller(MemoryStore::default());
        c.dispatch(Action::SetSearch("a".to_string()))?;
        c.dispatch(Action::ToggleTag("classico".to_string()))?;
        c.dispatch(Action::SetSort(SortOrder::NameAsc))?;
        assert_eq!(c.store().saves(), 3);
        assert_eq!(visible(&c), vec!["Dom Casmurro", "Orgulho e Preconceito"]);
        Ok(())
    }

    #[test]
    fn search_then_tag_counts_reflect_search_population() -> anyhow::Result<()> {
        let mut c = controller(MemoryStore::default());
        c.dispatch(Action::SetSearch("ficcao".to_string()))?;
        let counts = c.ctx().tag_counts();
        let total: usize = counts.iter().map(|t| t.count).sum();
        assert!(total >= c.ctx().visible_books().len());

        let panel = c.ctx().tag_panel();
        assert_eq!(panel.find("aventura").map(|b| b.count), Some(1));
        assert_eq!(panel.find("romance").map(|b| b.disabled), Some(true));
        Ok(())
    }

    #[test]
    fn highlighting_escapes_metacharacters() -> anyhow::Result<()> {
        let mut c = controller(MemoryStore::default());
        c.dispatch(Action::SetSearch("c++".to_string()))?;
        let view = c.ctx().render();
        assert_eq!(view.slide_count(), 1);
        assert!(view.to_html().contains("<h2><mark>C++</mark> Primer</h2>"));
        Ok(())
    }

    #[test]
    fn session_restores_from_sqlite_storage() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let saved_visible = {
            let mut c = controller(&storage);
            c.dispatch(Action::ToggleFavorite("Duna".to_string()))?;
            c.dispatch(Action::ToggleFavorite("Neuromancer".to_string()))?;
            c.dispatch(Action::ToggleFavoritesMode)?;
            c.dispatch(Action::SetSort(SortOrder::YearOldest))?;
            c.dispatch(Action::ToggleTheme)?;
            visible(&c)
        };
        assert_eq!(saved_visible, vec!["Duna", "Neuromancer"]);

        let mut restored = controller(&storage);
        restored.restore()?;
        assert_eq!(visible(&restored), saved_visible);
        assert_eq!(restored.ctx().theme, Theme::Dark);
        assert!(restored.ctx().filter.favorites_mode);
        Ok(())
    }

    #[test]
    fn clearing_filters_resets_persisted_filter_keys() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut c = controller(&storage);
        c.dispatch(Action::ToggleFavorite("Duna".to_string()))?;
        c.dispatch(Action::SetSearch("o".to_string()))?;
        c.dispatch(Action::ToggleTag("romance".to_string()))?;
        c.dispatch(Action::SetSort(SortOrder::NameDesc))?;
        c.dispatch(Action::ClearFilters)?;

        let catalog = sample_catalog();
        let all: Vec<String> = catalog.books().iter().map(|b| b.name.clone()).collect();
        assert_eq!(visible(&c), all);

        assert_eq!(storage.get_item("termoBusca")?.as_deref(), Some(""));
        assert_eq!(storage.get_item("filtrosAtivos")?.as_deref(), Some("[]"));
        assert_eq!(storage.get_item("modoFavoritos")?.as_deref(), Some("false"));
        assert_eq!(storage.get_item("sortOrder")?.as_deref(), Some("relevancia"));
        assert_eq!(storage.get_item("favoritos")?.as_deref(), Some(r#"["Duna"]"#));
        Ok(())
    }

    #[test]
    fn random_pick_is_deterministic_with_seed() -> anyhow::Result<()> {
        let mut a = controller(MemoryStore::default());
        let mut b = controller(MemoryStore::default());
        for _ in 0..5 {
            a.dispatch(Action::PickRandom)?;
            b.dispatch(Action::PickRandom)?;
            assert_eq!(a.ctx().details, b.ctx().details);
            assert!(a.ctx().details_book().is_some());
        }
        Ok(())
    }
}
