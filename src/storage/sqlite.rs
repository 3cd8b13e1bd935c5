use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

use crate::calendar::{Calendar, Event};
use crate::storage::store::{CalendarStore, StoreError};

/// SQLite-backed store. Records are kept as JSON next to the columns used for
/// lookups.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let store = Self::new(Connection::open(path)?);
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self::new(Connection::open_in_memory()?);
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS calendars (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sync_enabled INTEGER NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                calendar_id INTEGER NOT NULL,
                remote_import_id TEXT,
                remote_export_id TEXT,
                data TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_import ON events (calendar_id, remote_import_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_export ON events (remote_export_id)",
            [],
        )?;

        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }

    fn query_events<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Event>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut events = Vec::new();
        for row in rows {
            let (id, data) = row?;
            events.push(decode_event(id, &data)?);
        }
        Ok(events)
    }
}

fn decode_event(id: i64, data: &str) -> Result<Event, StoreError> {
    let mut event: Event = serde_json::from_str(data)?;
    event.id = id;
    Ok(event)
}

fn decode_calendar(id: i64, data: &str) -> Result<Calendar, StoreError> {
    let mut calendar: Calendar = serde_json::from_str(data)?;
    calendar.id = id;
    Ok(calendar)
}

impl CalendarStore for SqliteStore {
    fn calendars(&self) -> Result<Vec<Calendar>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id, data FROM calendars ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut calendars = Vec::new();
        for row in rows {
            let (id, data) = row?;
            calendars.push(decode_calendar(id, &data)?);
        }
        Ok(calendars)
    }

    fn calendar(&self, id: i64) -> Result<Option<Calendar>, StoreError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM calendars WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        data.map(|d| decode_calendar(id, &d)).transpose()
    }

    fn insert_calendar(&self, mut calendar: Calendar) -> Result<Calendar, StoreError> {
        let data = serde_json::to_string(&calendar)?;
        self.conn.execute(
            "INSERT INTO calendars (sync_enabled, data) VALUES (?1, ?2)",
            rusqlite::params![calendar.sync_enabled, &data],
        )?;
        calendar.id = self.conn.last_insert_rowid();
        Ok(calendar)
    }

    fn save_calendar(&self, calendar: &Calendar) -> Result<(), StoreError> {
        let data = serde_json::to_string(calendar)?;
        let changed = self.conn.execute(
            "UPDATE calendars SET sync_enabled = ?1, data = ?2 WHERE id = ?3",
            rusqlite::params![calendar.sync_enabled, &data, calendar.id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("calendar {}", calendar.id)));
        }
        Ok(())
    }

    fn event(&self, id: i64) -> Result<Option<Event>, StoreError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM events WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        data.map(|d| decode_event(id, &d)).transpose()
    }

    fn events_for_calendar(&self, calendar_id: i64) -> Result<Vec<Event>, StoreError> {
        self.query_events(
            "SELECT id, data FROM events WHERE calendar_id = ?1 ORDER BY id",
            [calendar_id],
        )
    }

    fn insert_event(&self, mut event: Event) -> Result<Event, StoreError> {
        let data = serde_json::to_string(&event)?;
        self.conn.execute(
            "INSERT INTO events (calendar_id, remote_import_id, remote_export_id, data)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                event.calendar_id,
                &event.remote_import_id,
                &event.remote_export_id,
                &data,
            ],
        )?;
        event.id = self.conn.last_insert_rowid();
        Ok(event)
    }

    fn save_event(&self, event: &Event) -> Result<(), StoreError> {
        let data = serde_json::to_string(event)?;
        let changed = self.conn.execute(
            "UPDATE events
             SET calendar_id = ?1, remote_import_id = ?2, remote_export_id = ?3, data = ?4
             WHERE id = ?5",
            rusqlite::params![
                event.calendar_id,
                &event.remote_import_id,
                &event.remote_export_id,
                &data,
                event.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("event {}", event.id)));
        }
        Ok(())
    }

    fn delete_event(&self, id: i64) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(())
    }

    fn find_by_import_id(&self, calendar_id: i64, remote_id: &str) -> Result<Option<Event>, StoreError> {
        let mut found = self.query_events(
            "SELECT id, data FROM events WHERE calendar_id = ?1 AND remote_import_id = ?2 ORDER BY id LIMIT 1",
            rusqlite::params![calendar_id, remote_id],
        )?;
        Ok(found.pop())
    }

    fn find_by_export_id(&self, remote_id: &str) -> Result<Option<Event>, StoreError> {
        let mut found = self.query_events(
            "SELECT id, data FROM events WHERE remote_export_id = ?1 ORDER BY id LIMIT 1",
            [remote_id],
        )?;
        Ok(found.pop())
    }
}
