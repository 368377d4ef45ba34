//! Sqlite-backed persistence and catalog loading.
//!
//! Session state lives in a flat `local_storage` table of string keys to string
//! values, one key per field, so each value can be read back independently.

use std::path::Path;

use anyhow::Context as _;
use catalog_core::{
    Book, Catalog, Favorites, FilterState, PersistedState, Settings, SortOrder, StateStore, Theme,
};
use rusqlite::{Connection, OptionalExtension as _};
use serde::de::DeserializeOwned;

pub const KEY_FAVORITES: &str = "favoritos";
pub const KEY_SEARCH_TERM: &str = "termoBusca";
pub const KEY_ACTIVE_TAGS: &str = "filtrosAtivos";
pub const KEY_THEME: &str = "theme";
pub const KEY_FAVORITES_MODE: &str = "modoFavoritos";
pub const KEY_SORT_ORDER: &str = "sortOrder";

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                data_path TEXT NOT NULL,
                max_visible_tags INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO settings (id, data_path, max_visible_tags)
            VALUES (1, 'data.json', 10);

            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            "#,
        )?;

        match self.conn.execute(
            "ALTER TABLE settings ADD COLUMN loading_delay_ms INTEGER NOT NULL DEFAULT 300",
            [],
        ) {
            Ok(_) => {}
            Err(err) => {
                let msg = err.to_string();
                if !msg.contains("duplicate column name") {
                    return Err(err).context("add settings.loading_delay_ms column");
                }
            }
        }

        Ok(())
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT data_path, max_visible_tags, loading_delay_ms FROM settings WHERE id = 1",
                [],
                |row| {
                    let data_path: String = row.get(0)?;
                    let max_visible_tags: i64 = row.get(1)?;
                    let loading_delay_ms: i64 = row.get(2)?;
                    Ok((data_path, max_visible_tags, loading_delay_ms))
                },
            )
            .optional()?;

        let defaults = Settings::default();
        let mut settings = match row {
            Some((data_path, max_visible_tags, loading_delay_ms)) => Settings {
                data_path,
                max_visible_tags: usize::try_from(max_visible_tags)
                    .unwrap_or(defaults.max_visible_tags),
                loading_delay_ms: u64::try_from(loading_delay_ms)
                    .unwrap_or(defaults.loading_delay_ms),
            },
            None => defaults,
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();

        self.conn.execute(
            "UPDATE settings SET data_path = ?, max_visible_tags = ?, loading_delay_ms = ? WHERE id = 1",
            (
                &settings.data_path,
                settings.max_visible_tags as i64,
                settings.loading_delay_ms as i64,
            ),
        )?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read storage key {key}"))?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        put_item(&self.conn, key, value)
    }

    pub fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?", [key])
            .with_context(|| format!("remove storage key {key}"))?;
        Ok(())
    }

    /// Missing or malformed values come back as `None`; a bad value only
    /// costs its own field.
    fn get_parsed<T>(
        &self,
        key: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> anyhow::Result<Option<T>> {
        let Some(raw) = self.get_item(key)? else {
            return Ok(None);
        };
        let parsed = parse(&raw);
        if parsed.is_none() {
            log::warn!("ignoring malformed value for storage key {key}: {raw:?}");
        }
        Ok(parsed)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        self.get_parsed(key, |raw| serde_json::from_str(raw).ok())
    }
}

fn put_item(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        r#"
        INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, unixepoch())
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        (key, value),
    )
    .with_context(|| format!("write storage key {key}"))?;
    Ok(())
}

impl StateStore for Storage {
    fn load_state(&self) -> anyhow::Result<PersistedState> {
        let favorites: Favorites = self
            .get_json::<Vec<String>>(KEY_FAVORITES)?
            .unwrap_or_default()
            .into_iter()
            .collect();
        let active_tags = self
            .get_json::<Vec<String>>(KEY_ACTIVE_TAGS)?
            .unwrap_or_default()
            .into_iter()
            .collect();
        let search_term = self.get_item(KEY_SEARCH_TERM)?.unwrap_or_default();
        let favorites_mode = self
            .get_parsed(KEY_FAVORITES_MODE, |raw| raw.trim().parse::<bool>().ok())?
            .unwrap_or(false);
        let sort_order = self
            .get_parsed(KEY_SORT_ORDER, |raw| raw.parse::<SortOrder>().ok())?
            .unwrap_or_default();
        let theme = self
            .get_parsed(KEY_THEME, |raw| raw.parse::<Theme>().ok())?
            .unwrap_or_default();

        Ok(PersistedState {
            favorites,
            filter: FilterState {
                search_term,
                active_tags,
                favorites_mode,
                sort_order,
            },
            theme,
        })
    }

    fn save_state(&self, state: &PersistedState) -> anyhow::Result<()> {
        let favorites: Vec<&String> = state.favorites.iter().collect();
        let active_tags: Vec<&String> = state.filter.active_tags.iter().collect();
        let favorites_json = serde_json::to_string(&favorites)?;
        let active_tags_json = serde_json::to_string(&active_tags)?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin storage transaction")?;
        put_item(&tx, KEY_FAVORITES, &favorites_json)?;
        put_item(&tx, KEY_SEARCH_TERM, &state.filter.search_term)?;
        put_item(&tx, KEY_ACTIVE_TAGS, &active_tags_json)?;
        put_item(&tx, KEY_THEME, state.theme.as_str())?;
        put_item(
            &tx,
            KEY_FAVORITES_MODE,
            if state.filter.favorites_mode { "true" } else { "false" },
        )?;
        put_item(&tx, KEY_SORT_ORDER, state.filter.sort_order.as_str())?;
        tx.commit().context("commit storage transaction")?;
        Ok(())
    }
}

/// Reads the data file and builds a catalog with normalized tags.
pub fn load_catalog(path: impl AsRef<Path>) -> anyhow::Result<Catalog> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read data file {}", path.display()))?;
    let catalog =
        parse_catalog(&raw).with_context(|| format!("parse data file {}", path.display()))?;
    log::info!("loaded {} books from {}", catalog.len(), path.display());
    Ok(catalog)
}

pub fn parse_catalog(raw: &str) -> anyhow::Result<Catalog> {
    let books: Vec<Book> = serde_json::from_str(raw)?;
    Ok(Catalog::new(books))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const DATA: &str = r##"[
        {
            "nome": "Dom Casmurro",
            "data_lancamento": "1899",
            "descricao": "Bentinho e Capitu",
            "tags": ["#romance", " #classico "],
            "imagem": "img/dom.jpg",
            "link": "https://example.org/dom"
        },
        {
            "nome": "Duna",
            "data_lancamento": "1965",
            "descricao": "Arrakis",
            "tags": ["#ficcao"],
            "imagem": "img/duna.jpg",
            "link": "https://example.org/duna"
        }
    ]"##;

    #[test]
    fn settings_roundtrip() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut settings = storage.load_settings()?;
        assert_eq!(settings.data_path, "data.json");
        settings.data_path = "/srv/books.json".to_string();
        settings.max_visible_tags = 5;
        settings.loading_delay_ms = 0;
        storage.save_settings(&settings)?;

        let settings2 = storage.load_settings()?;
        assert_eq!(settings2.data_path, "/srv/books.json");
        assert_eq!(settings2.max_visible_tags, 5);
        assert_eq!(settings2.loading_delay_ms, 0);
        Ok(())
    }

    #[test]
    fn empty_storage_loads_defaults() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        assert_eq!(storage.load_state()?, PersistedState::default());
        Ok(())
    }

    #[test]
    fn state_roundtrip() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut state = PersistedState {
            favorites: ["Duna".to_string(), "Dom Casmurro".to_string()]
                .into_iter()
                .collect(),
            theme: Theme::Dark,
            ..PersistedState::default()
        };
        state.filter.search_term = "capitu".to_string();
        state.filter.sort_order = SortOrder::YearOldest;
        state.filter.toggle_tag("romance");
        storage.save_state(&state)?;

        assert_eq!(storage.load_state()?, state);
        Ok(())
    }

    #[test]
    fn values_use_local_storage_encoding() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut state = PersistedState::default();
        state.favorites.toggle("Duna");
        state.filter.set_favorites_mode(true);
        state.filter.sort_order = SortOrder::YearNewest;
        storage.save_state(&state)?;

        assert_eq!(storage.get_item(KEY_FAVORITES)?.as_deref(), Some(r#"["Duna"]"#));
        assert_eq!(storage.get_item(KEY_ACTIVE_TAGS)?.as_deref(), Some("[]"));
        assert_eq!(storage.get_item(KEY_FAVORITES_MODE)?.as_deref(), Some("true"));
        assert_eq!(storage.get_item(KEY_SORT_ORDER)?.as_deref(), Some("ano-recente"));
        assert_eq!(storage.get_item(KEY_THEME)?.as_deref(), Some("light"));
        assert_eq!(storage.get_item(KEY_SEARCH_TERM)?.as_deref(), Some(""));
        Ok(())
    }

    #[test]
    fn malformed_values_fall_back_per_field() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        storage.set_item(KEY_FAVORITES, r#"["Duna"]"#)?;
        storage.set_item(KEY_ACTIVE_TAGS, "not json")?;
        storage.set_item(KEY_SORT_ORDER, "sideways")?;
        storage.set_item(KEY_THEME, "dark")?;
        storage.set_item(KEY_FAVORITES_MODE, "maybe")?;

        let state = storage.load_state()?;
        assert!(state.favorites.contains("Duna"));
        assert!(state.filter.active_tags.is_empty());
        assert_eq!(state.filter.sort_order, SortOrder::Relevance);
        assert!(!state.filter.favorites_mode);
        assert_eq!(state.theme, Theme::Dark);
        Ok(())
    }

    #[test]
    fn remove_item_deletes_key() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        storage.set_item(KEY_SEARCH_TERM, "abc")?;
        storage.set_item(KEY_SEARCH_TERM, "def")?;
        assert_eq!(storage.get_item(KEY_SEARCH_TERM)?.as_deref(), Some("def"));
        storage.remove_item(KEY_SEARCH_TERM)?;
        assert_eq!(storage.get_item(KEY_SEARCH_TERM)?, None);
        Ok(())
    }

    #[test]
    fn parse_catalog_normalizes_tags() -> anyhow::Result<()> {
        let catalog = parse_catalog(DATA)?;
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.books()[0].tags, vec!["romance", "classico"]);
        assert_eq!(catalog.books()[1].year(), Some(1965));
        Ok(())
    }

    #[test]
    fn parse_catalog_rejects_bad_json() {
        assert!(parse_catalog("{\"nome\": 1}").is_err());
    }

    #[test]
    fn load_catalog_reads_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(DATA.as_bytes())?;
        let catalog = load_catalog(file.path())?;
        assert!(catalog.contains("Duna"));
        Ok(())
    }

    #[test]
    fn load_catalog_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(dir.path().join("missing.json")).unwrap_err();
        assert!(format!("{err:#}").contains("read data file"));
    }

    #[test]
    fn storage_persists_on_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("catalog.db");
        {
            let storage = Storage::open(&path)?;
            storage.set_item(KEY_THEME, "dark")?;
        }
        let storage = Storage::open(&path)?;
        assert_eq!(storage.load_state()?.theme, Theme::Dark);
        Ok(())
    }
}
