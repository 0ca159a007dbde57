// Schema migrations
//
// Each entry is one migration step; the current step count is tracked in
// `PRAGMA user_version`, so re-running the runner is a no-op.

use rusqlite::Connection;

const MIGRATIONS: &[&str] = &[
    // 0001: location and weather tables
    r#"
    CREATE TABLE location (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        geom TEXT
    );
    CREATE TABLE weather (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        date          TEXT NOT NULL UNIQUE,
        temp_max      REAL NOT NULL,
        temp_min      REAL NOT NULL,
        precipitation REAL NOT NULL,
        location_id   INTEGER REFERENCES location(id)
    );
    "#,
    // 0002: lookup index for the date filter and the join
    r#"
    CREATE INDEX idx_weather_date ON weather(date);
    CREATE INDEX idx_weather_location ON weather(location_id);
    "#,
];

/// Apply any pending migrations, returning how many steps ran
pub fn apply(conn: &Connection) -> rusqlite::Result<usize> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let mut applied = 0;

    for (idx, step) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        conn.execute_batch(&format!("BEGIN;\n{}\nCOMMIT;", step))?;
        conn.pragma_update(None, "user_version", (idx + 1) as i64)?;
        applied += 1;
    }

    Ok(applied)
}

/// Latest schema version known to this build
pub fn latest_version() -> usize {
    MIGRATIONS.len()
}
