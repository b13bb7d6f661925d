use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub const DB_FILE_NAME: &str = "crcalc.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE_NAME)
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(db_path(workspace))?;

    // One row per key, mirroring browser local storage: values are opaque
    // JSON text owned by the store layer.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS local_storage(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn storage_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM local_storage WHERE key = ?",
            [key],
            |r| r.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

pub fn storage_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO local_storage(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, value, now),
    )?;
    Ok(())
}

pub fn storage_remove(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM local_storage WHERE key = ?", [key])?;
    Ok(n > 0)
}

pub fn storage_keys(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT key FROM local_storage ORDER BY key")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() {
        let dir = std::env::temp_dir().join(format!("crcalc-db-{}", uuid::Uuid::new_v4()));
        let conn = open_db(&dir).expect("open db");

        assert_eq!(storage_get(&conn, "k").expect("get"), None);
        storage_set(&conn, "k", "[1]").expect("set");
        storage_set(&conn, "k", "[1,2]").expect("overwrite");
        assert_eq!(storage_get(&conn, "k").expect("get").as_deref(), Some("[1,2]"));
        assert_eq!(storage_keys(&conn).expect("keys"), vec!["k".to_string()]);
        assert!(storage_remove(&conn, "k").expect("remove"));
        assert!(!storage_remove(&conn, "k").expect("remove again"));

        drop(conn);
        let _ = std::fs::remove_dir_all(dir);
    }
}
