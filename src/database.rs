use crate::types::{StoreSnapshot, WinningCombination};
use crate::utils::ensure_parent_dir;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Durable home of the sync cursor and the known winning combinations.
///
/// `load` never fails: a missing or unreadable store degrades to an empty
/// snapshot with cursor 0. `save` replaces the whole persisted state at once.
pub trait CombinationStore {
    fn load(&self) -> StoreSnapshot;
    fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()>;
}

/// Accepts a persisted entry only if it is a list of exactly six integers
/// that form a valid combination.
pub fn validate_record(raw: &Value) -> Option<WinningCombination> {
    let items = raw.as_array()?;
    let numbers: Vec<Option<i64>> = items.iter().map(Value::as_i64).collect();
    accept_numbers(&numbers)
}

fn accept_numbers(numbers: &[Option<i64>]) -> Option<WinningCombination> {
    let numbers = numbers.iter().copied().collect::<Option<Vec<i64>>>()?;
    WinningCombination::new(&numbers).ok()
}

/// Picks a backend from the file extension: `.db`, `.sqlite` and `.sqlite3`
/// use SQLite, anything else the JSON document.
pub fn open_store(path: &Path) -> Result<Box<dyn CombinationStore>> {
    ensure_parent_dir(path)?;

    let is_sqlite = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    );

    if is_sqlite {
        Ok(Box::new(SqliteStore::open(path)?))
    } else {
        Ok(Box::new(JsonFileStore::new(path)))
    }
}

#[derive(Serialize)]
struct StoreDocument<'a> {
    last_fetched_draw_no: u32,
    combinations: Vec<&'a WinningCombination>,
}

#[derive(Deserialize)]
struct RawStoreDocument {
    #[serde(default)]
    last_fetched_draw_no: u32,
    #[serde(default)]
    combinations: Vec<Value>,
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "combinations".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_document(&self) -> Result<Option<RawStoreDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let document = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(document))
    }
}

impl CombinationStore for JsonFileStore {
    fn load(&self) -> StoreSnapshot {
        let document = match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => {
                info!(
                    "📁 {} is missing or empty, starting a fresh history",
                    self.path.display()
                );
                return StoreSnapshot::default();
            }
            Err(e) => {
                warn!("{:#}; rebuilding the history from scratch", e);
                return StoreSnapshot::default();
            }
        };

        let total = document.combinations.len();
        let combinations: HashSet<WinningCombination> =
            document.combinations.iter().filter_map(validate_record).collect();
        if combinations.len() < total {
            debug!(
                "dropped {} invalid or repeated entries from {}",
                total - combinations.len(),
                self.path.display()
            );
        }

        info!(
            "Loaded {} combinations from {} (last synced draw: {})",
            combinations.len(),
            self.path.display(),
            document.last_fetched_draw_no
        );
        StoreSnapshot::new(document.last_fetched_draw_no, combinations)
    }

    /// Writes to a sibling temp file, syncs it, then renames it over the
    /// store so a crash leaves either the old or the new document.
    fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        let mut combinations: Vec<&WinningCombination> = snapshot.combinations.iter().collect();
        combinations.sort();

        let document = StoreDocument {
            last_fetched_draw_no: snapshot.last_synced_index,
            combinations,
        };
        let data = serde_json::to_vec_pretty(&document)?;

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)
            .with_context(|| format!("failed to create {}", temp_path.display()))?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                temp_path.display(),
                self.path.display()
            )
        })?;
        sync_parent_dir(&self.path)?;

        info!(
            "💾 Saved {} combinations to {} (last synced draw: {})",
            snapshot.combinations.len(),
            self.path.display(),
            snapshot.last_synced_index
        );
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn with_connection(conn: Connection) -> Self {
        Self { conn, path: None }
    }

    fn corrupt_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "combinations".into());
        name.push(".corrupt");
        path.with_file_name(name)
    }

    /// Moves an unreadable database file aside and reconnects to a fresh one
    /// at the same path.
    fn replace_corrupt_file(&mut self) -> Result<bool> {
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };

        let aside = Self::corrupt_path(&path);
        fs::rename(&path, &aside).with_context(|| {
            format!("failed to move {} aside to {}", path.display(), aside.display())
        })?;
        warn!(
            "⚠ {} is not a sqlite database, moved it to {}",
            path.display(),
            aside.display()
        );

        self.conn = Connection::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(true)
    }

    fn write_snapshot(conn: &mut Connection, snapshot: &StoreSnapshot) -> rusqlite::Result<()> {
        Self::create_tables(conn)?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM combinations", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO combinations (n1, n2, n3, n4, n5, n6)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for combination in &snapshot.combinations {
                let n = combination.numbers();
                stmt.execute(params![n[0], n[1], n[2], n[3], n[4], n[5]])?;
            }
        }
        tx.execute(
            "INSERT INTO sync_state (id, last_fetched_draw_no) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_fetched_draw_no = excluded.last_fetched_draw_no",
            [snapshot.last_synced_index],
        )?;
        tx.commit()
    }

    fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_fetched_draw_no INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS combinations (
                n1 INTEGER NOT NULL,
                n2 INTEGER NOT NULL,
                n3 INTEGER NOT NULL,
                n4 INTEGER NOT NULL,
                n5 INTEGER NOT NULL,
                n6 INTEGER NOT NULL,
                PRIMARY KEY (n1, n2, n3, n4, n5, n6)
            )",
            [],
        )?;

        Ok(())
    }

    fn read_snapshot(&self) -> Result<StoreSnapshot> {
        Self::create_tables(&self.conn)?;

        let cursor: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_fetched_draw_no FROM sync_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_synced_index = match cursor {
            Some(value) => u32::try_from(value)
                .with_context(|| format!("invalid last_fetched_draw_no {}", value))?,
            None => 0,
        };

        let mut stmt = self
            .conn
            .prepare("SELECT n1, n2, n3, n4, n5, n6 FROM combinations")?;
        let row_iter = stmt.query_map([], |row| {
            let mut numbers = Vec::with_capacity(6);
            for i in 0..6 {
                numbers.push(row.get::<_, Option<i64>>(i)?);
            }
            Ok(numbers)
        })?;

        let mut combinations = HashSet::new();
        for row in row_iter {
            if let Some(combination) = accept_numbers(&row?) {
                combinations.insert(combination);
            }
        }

        Ok(StoreSnapshot::new(last_synced_index, combinations))
    }
}

impl CombinationStore for SqliteStore {
    fn load(&self) -> StoreSnapshot {
        match self.read_snapshot() {
            Ok(snapshot) => {
                info!(
                    "Loaded {} combinations from sqlite (last synced draw: {})",
                    snapshot.combinations.len(),
                    snapshot.last_synced_index
                );
                snapshot
            }
            Err(e) => {
                warn!(
                    "failed to read sqlite store ({:#}); rebuilding the history from scratch",
                    e
                );
                StoreSnapshot::default()
            }
        }
    }

    /// Replaces cursor and combinations inside one transaction. A file that
    /// is not a sqlite database is moved aside and rebuilt from the snapshot.
    fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        if let Err(e) = Self::write_snapshot(&mut self.conn, snapshot) {
            if !is_not_a_database(&e) || !self.replace_corrupt_file()? {
                return Err(e.into());
            }
            Self::write_snapshot(&mut self.conn, snapshot)?;
        }

        info!(
            "💾 Saved {} combinations to sqlite (last synced draw: {})",
            snapshot.combinations.len(),
            snapshot.last_synced_index
        );
        Ok(())
    }
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::NotADatabase
    )
}
