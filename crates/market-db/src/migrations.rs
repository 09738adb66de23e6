use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                phone       TEXT UNIQUE,
                password    TEXT NOT NULL,
                picture     BLOB NOT NULL DEFAULT x'',
                rating      REAL NOT NULL DEFAULT 0
            );

            CREATE TABLE community (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE
            );

            CREATE TABLE product (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                service     INTEGER NOT NULL DEFAULT 0,
                price       INTEGER NOT NULL,
                upload_date TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_product_user ON product(user_id);

            CREATE TABLE review (
                id          INTEGER PRIMARY KEY,
                rating      INTEGER NOT NULL,
                content     TEXT NOT NULL DEFAULT '',
                reviewer_id INTEGER NOT NULL REFERENCES users(id),
                owner_id    INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_review_owner ON review(owner_id);
            CREATE INDEX idx_review_reviewer ON review(reviewer_id);

            CREATE TABLE user_community (
                user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                community_id INTEGER NOT NULL REFERENCES community(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, community_id)
            );

            CREATE TABLE user_followers (
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                follower_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (user_id, follower_id)
            );

            -- Reviews of deleted users are repointed here. No phone, and the empty
            -- credential never verifies.
            INSERT INTO users (id, name, phone, password) VALUES (0, 'deleted user', NULL, '');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
