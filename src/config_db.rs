use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::{Error, Result};

const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

pub const EXPANSION_THRESHOLD: &str = "expansion_threshold";
pub const RESULT_LIMIT: &str = "result_limit";
pub const TIME_BUDGET_MS: &str = "time_budget_ms";
pub const BATCH_SIZE: &str = "batch_size";
pub const SYNONYMS_FILE: &str = "synonyms_file";

/// Every setting key the search pipeline understands.
pub const KNOWN_SETTINGS: &[&str] = &[
    EXPANSION_THRESHOLD,
    RESULT_LIMIT,
    TIME_BUDGET_MS,
    BATCH_SIZE,
    SYNONYMS_FILE,
];

/// Persistent key/value settings stored in `config.redb`.
pub struct ConfigDb {
    db: Database,
}

impl ConfigDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    pub fn remove_setting(&self, key: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(SETTINGS)?;
            table.remove(key)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }
}

impl std::fmt::Debug for ConfigDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDb").finish_non_exhaustive()
    }
}

/// Typed view over the persisted settings, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub expansion_threshold: usize,
    pub result_limit: usize,
    pub time_budget: Duration,
    pub batch_size: usize,
    pub synonyms_file: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            expansion_threshold: 20,
            result_limit: 100,
            time_budget: Duration::from_millis(250),
            batch_size: 1000,
            synonyms_file: None,
        }
    }
}

impl SearchConfig {
    pub fn load(config_db: &ConfigDb) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in config_db.list_settings()? {
            config.apply(&key, &value)?;
        }
        Ok(config)
    }

    /// Apply one `key = value` pair, validating the value.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            EXPANSION_THRESHOLD => {
                self.expansion_threshold = parse_count(key, value)?;
            }
            RESULT_LIMIT => {
                self.result_limit = parse_positive(key, value)?;
            }
            TIME_BUDGET_MS => {
                let ms = parse_positive(key, value)?;
                self.time_budget = Duration::from_millis(ms as u64);
            }
            BATCH_SIZE => {
                self.batch_size = parse_positive(key, value)?;
            }
            SYNONYMS_FILE => {
                self.synonyms_file = Some(PathBuf::from(value));
            }
            _ => {
                return Err(Error::Config(format!(
                    "unknown setting '{key}' (known: {})",
                    KNOWN_SETTINGS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!("{key} must be a non-negative integer"))
    })
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    match parse_count(key, value)? {
        0 => Err(Error::Config(format!("{key} must be greater than zero"))),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, ConfigDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = ConfigDb::open(&tmp.path().join("config.db")).unwrap();
        (tmp, db)
    }

    #[test]
    fn settings_crud() {
        let (_tmp, db) = test_db();

        assert_eq!(db.get_setting(RESULT_LIMIT).unwrap(), None);

        db.set_setting(RESULT_LIMIT, "25").unwrap();
        assert_eq!(
            db.get_setting(RESULT_LIMIT).unwrap(),
            Some("25".to_string())
        );
        assert_eq!(db.list_settings().unwrap().len(), 1);

        assert!(db.remove_setting(RESULT_LIMIT).unwrap());
        assert!(!db.remove_setting(RESULT_LIMIT).unwrap());
        assert!(db.list_settings().unwrap().is_empty());
    }

    #[test]
    fn empty_db_yields_defaults() {
        let (_tmp, db) = test_db();
        assert_eq!(SearchConfig::load(&db).unwrap(), SearchConfig::default());
    }

    #[test]
    fn stored_settings_override_defaults() {
        let (_tmp, db) = test_db();
        db.set_setting(EXPANSION_THRESHOLD, "5").unwrap();
        db.set_setting(TIME_BUDGET_MS, "40").unwrap();
        db.set_setting(SYNONYMS_FILE, "/etc/thesaurus.json").unwrap();

        let config = SearchConfig::load(&db).unwrap();
        assert_eq!(config.expansion_threshold, 5);
        assert_eq!(config.time_budget, Duration::from_millis(40));
        assert_eq!(
            config.synonyms_file,
            Some(PathBuf::from("/etc/thesaurus.json"))
        );
        assert_eq!(config.result_limit, 100);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = SearchConfig::default();
        assert!(matches!(
            config.apply(RESULT_LIMIT, "0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config.apply(BATCH_SIZE, "lots"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config.apply("colour", "blue"),
            Err(Error::Config(_))
        ));
        // A zero threshold is legal: it disables expansion.
        config.apply(EXPANSION_THRESHOLD, "0").unwrap();
        assert_eq!(config.expansion_threshold, 0);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.db");

        {
            let db = ConfigDb::open(&path).unwrap();
            db.set_setting(BATCH_SIZE, "500").unwrap();
        }

        {
            let db = ConfigDb::open(&path).unwrap();
            let config = SearchConfig::load(&db).unwrap();
            assert_eq!(config.batch_size, 500);
        }
    }
}
