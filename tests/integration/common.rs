//! Shared fixtures: a small TICKIT schema seeded into SQLite.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tickit_report::db::SqliteClient;

pub const SCHEMA: &str = r#"
CREATE TABLE users (
    userid INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    firstname TEXT,
    lastname TEXT,
    city TEXT,
    state TEXT,
    email TEXT
);
CREATE TABLE venue (
    venueid INTEGER PRIMARY KEY,
    venuename TEXT,
    venuecity TEXT,
    venuestate TEXT,
    venueseats INTEGER
);
CREATE TABLE category (
    catid INTEGER PRIMARY KEY,
    catgroup TEXT,
    catname TEXT,
    catdesc TEXT
);
CREATE TABLE events (
    eventid INTEGER PRIMARY KEY,
    venueid INTEGER,
    catid INTEGER,
    dateid INTEGER,
    eventname TEXT,
    starttime TEXT
);
CREATE TABLE sales (
    saleid INTEGER PRIMARY KEY,
    listid INTEGER,
    sellerid INTEGER,
    buyerid INTEGER,
    eventid INTEGER,
    dateid INTEGER,
    qtysold INTEGER,
    pricepaid REAL,
    commission REAL,
    saletime TEXT
);
"#;

/// Three users in two cities; every other table is empty.
pub const SEED: &str = r#"
INSERT INTO users (userid, username, firstname, lastname, city, state, email) VALUES
    (1, 'JSG99FHE', 'Rafael', 'Taylor', 'Kent', 'WA', 'rafael@example.com'),
    (2, 'PGL08LJI', 'Vladimir', 'Humphrey', 'Murfreesboro', 'SK', NULL),
    (3, 'IFT66TXU', 'Lars', 'Ratliff', 'Kent', 'WA', 'lars@example.com');
"#;

async fn seed(pool: &SqlitePool) {
    sqlx::raw_sql(SCHEMA).execute(pool).await.unwrap();
    sqlx::raw_sql(SEED).execute(pool).await.unwrap();
}

/// Returns a client over a freshly seeded in-memory database.
pub async fn seeded_memory_client() -> SqliteClient {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    seed(&pool).await;
    SqliteClient::from_pool(pool)
}

/// Creates and seeds a database file at `path`.
pub async fn seeded_file(path: &Path) {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    seed(&pool).await;
    pool.close().await;
}
