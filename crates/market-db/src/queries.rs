use crate::Database;
use crate::models::{
    CommunityRow, CredentialRow, NO_OWNER_ID, ProductFields, ProductRow, ReviewRow, UserFields,
    UserRow, WriteOutcome,
};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::{debug, info};

// Column lists are positional: the row mappers below read them in this order.
const USER_COLUMNS: &str = "id, name, phone, password, picture, rating";
const COMMUNITY_COLUMNS: &str = "id, name";
const PRODUCT_COLUMNS: &str = "id, name, service, price, upload_date, description, user_id";
const REVIEW_COLUMNS: &str = "id, rating, content, reviewer_id, owner_id";

impl Database {
    // -- Users --

    pub fn create_user(&self, fields: &UserFields) -> Result<WriteOutcome<UserRow>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, phone, password, picture) VALUES (?1, ?2, ?3, ?4)",
                params![
                    fields.name,
                    stored_phone(&fields.phone),
                    fields.password,
                    fields.picture
                ],
            );
            if is_constraint_violation(&inserted) {
                return Ok(WriteOutcome::Conflict);
            }
            inserted?;

            let id = conn.last_insert_rowid();
            info!("Created user {}", id);
            Ok(WriteOutcome::Written(UserRow {
                id,
                name: fields.name.clone(),
                phone: fields.phone.clone(),
                password: fields.password.clone(),
                picture: fields.picture.clone(),
                rating: 0.0,
            }))
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Login lookup. The sentinel user never matches.
    pub fn get_credential_by_phone(&self, phone: &str) -> Result<Option<CredentialRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, password FROM users WHERE phone = ?1 AND id <> ?2",
                    params![phone, NO_OWNER_ID],
                    |row| {
                        Ok(CredentialRow {
                            id: row.get(0)?,
                            password: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_credential_by_id(&self, id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let password = conn
                .query_row("SELECT password FROM users WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(password)
        })
    }

    /// Full-row overwrite of every mutable column.
    pub fn update_user(&self, id: i64, fields: &UserFields) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE users SET name = ?2, phone = ?3, password = ?4, picture = ?5, rating = ?6
                 WHERE id = ?1 AND id <> ?7",
                params![
                    id,
                    fields.name,
                    stored_phone(&fields.phone),
                    fields.password,
                    fields.picture,
                    fields.rating,
                    NO_OWNER_ID,
                ],
            );
            if is_constraint_violation(&updated) {
                return Ok(WriteOutcome::Conflict);
            }
            Ok(written_if(updated? > 0))
        })
    }

    /// Repoints the user's reviews (owned and written) to [`NO_OWNER_ID`], then
    /// deletes the user, in one transaction. Products and relation edges go with
    /// the row through `ON DELETE CASCADE`.
    pub fn delete_user(&self, id: i64) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let owned = tx.execute(
                "UPDATE review SET owner_id = ?2 WHERE owner_id = ?1",
                params![id, NO_OWNER_ID],
            )?;
            let written = tx.execute(
                "UPDATE review SET reviewer_id = ?2 WHERE reviewer_id = ?1",
                params![id, NO_OWNER_ID],
            )?;
            let deleted = tx.execute(
                "DELETE FROM users WHERE id = ?1 AND id <> ?2",
                params![id, NO_OWNER_ID],
            )?;

            if deleted == 0 {
                // Dropping the transaction rolls back the repoints.
                return Ok(WriteOutcome::Missing);
            }

            tx.commit()?;
            info!(
                "Deleted user {} ({} owned and {} written reviews repointed)",
                id, owned, written
            );
            Ok(WriteOutcome::Written(()))
        })
    }

    pub fn list_followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE id IN (SELECT follower_id FROM user_followers WHERE user_id = ?1)
                 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `follower_id` starts following `user_id`.
    pub fn follow(&self, user_id: i64, follower_id: i64) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            if !user_exists(conn, user_id)? || !user_exists(conn, follower_id)? {
                return Ok(WriteOutcome::Missing);
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO user_followers (user_id, follower_id) VALUES (?1, ?2)",
                params![user_id, follower_id],
            )?;
            if inserted == 0 {
                return Ok(WriteOutcome::Conflict);
            }

            debug!("User {} now follows {}", follower_id, user_id);
            Ok(WriteOutcome::Written(()))
        })
    }

    // -- Communities --

    /// Seeding helper: there is no HTTP route that creates communities, so
    /// they are loaded through the store (fixtures, admin tooling, tests).
    pub fn create_community(&self, name: &str) -> Result<WriteOutcome<CommunityRow>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute("INSERT INTO community (name) VALUES (?1)", [name]);
            if is_constraint_violation(&inserted) {
                return Ok(WriteOutcome::Conflict);
            }
            inserted?;

            Ok(WriteOutcome::Written(CommunityRow {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
            }))
        })
    }

    pub fn list_communities(&self) -> Result<Vec<CommunityRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COMMUNITY_COLUMNS} FROM community ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_community)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Communities the user has joined, or with `joined = false` the complement.
    pub fn list_user_communities(&self, user_id: i64, joined: bool) -> Result<Vec<CommunityRow>> {
        self.with_conn(|conn| {
            let membership = if joined { "IN" } else { "NOT IN" };
            let sql = format!(
                "SELECT {COMMUNITY_COLUMNS} FROM community
                 WHERE id {membership} (SELECT community_id FROM user_community WHERE user_id = ?1)
                 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_community)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn join_community(&self, user_id: i64, community_id: i64) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            let community_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM community WHERE id = ?1)",
                [community_id],
                |row| row.get(0),
            )?;
            if !community_exists || !user_exists(conn, user_id)? {
                return Ok(WriteOutcome::Missing);
            }

            let inserted = conn.execute(
                "INSERT OR IGNORE INTO user_community (user_id, community_id) VALUES (?1, ?2)",
                params![user_id, community_id],
            )?;
            if inserted == 0 {
                return Ok(WriteOutcome::Conflict);
            }

            debug!("User {} joined community {}", user_id, community_id);
            Ok(WriteOutcome::Written(()))
        })
    }

    // -- Products --

    pub fn create_product(
        &self,
        owner_id: i64,
        fields: &ProductFields,
    ) -> Result<WriteOutcome<ProductRow>> {
        self.with_conn_mut(|conn| {
            if !user_exists(conn, owner_id)? {
                return Ok(WriteOutcome::Missing);
            }

            conn.execute(
                "INSERT INTO product (name, service, price, upload_date, description, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    fields.name,
                    fields.service,
                    fields.price,
                    fields.upload_date,
                    fields.description,
                    owner_id,
                ],
            )?;

            let id = conn.last_insert_rowid();
            info!("Created product {} for user {}", id, owner_id);
            Ok(WriteOutcome::Written(ProductRow {
                id,
                name: fields.name.clone(),
                service: fields.service,
                price: fields.price,
                upload_date: fields.upload_date.clone(),
                description: fields.description.clone(),
                user_id: owner_id,
            }))
        })
    }

    pub fn get_product(&self, id: i64) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?1");
            let row = conn.query_row(&sql, [id], map_product).optional()?;
            Ok(row)
        })
    }

    pub fn get_product_owner(&self, id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row("SELECT user_id FROM product WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(owner)
        })
    }

    pub fn list_user_products(&self, user_id: i64) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE user_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_product)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full-row overwrite; the owner column is left alone.
    pub fn update_product(&self, id: i64, fields: &ProductFields) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE product SET name = ?2, service = ?3, price = ?4, upload_date = ?5, description = ?6
                 WHERE id = ?1",
                params![
                    id,
                    fields.name,
                    fields.service,
                    fields.price,
                    fields.upload_date,
                    fields.description,
                ],
            )?;
            Ok(written_if(updated > 0))
        })
    }

    pub fn delete_product(&self, id: i64) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM product WHERE id = ?1", [id])?;
            if deleted > 0 {
                info!("Deleted product {}", id);
            }
            Ok(written_if(deleted > 0))
        })
    }

    // -- Reviews --

    pub fn create_review(
        &self,
        owner_id: i64,
        reviewer_id: i64,
        rating: i64,
        content: &str,
    ) -> Result<WriteOutcome<ReviewRow>> {
        self.with_conn_mut(|conn| {
            if !user_exists(conn, owner_id)? || !user_exists(conn, reviewer_id)? {
                return Ok(WriteOutcome::Missing);
            }

            conn.execute(
                "INSERT INTO review (rating, content, reviewer_id, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![rating, content, reviewer_id, owner_id],
            )?;

            Ok(WriteOutcome::Written(ReviewRow {
                id: conn.last_insert_rowid(),
                rating,
                content: content.to_string(),
                reviewer_id,
                owner_id,
            }))
        })
    }

    /// Reviews whose owner (the reviewed user) is `owner_id`.
    pub fn list_user_reviews(&self, owner_id: i64) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {REVIEW_COLUMNS} FROM review WHERE owner_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], map_review)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_user).optional()?;
    Ok(row)
}

/// Live users only; the sentinel cannot own new products, reviews or edges.
fn user_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND id <> ?2)",
        params![id, NO_OWNER_ID],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// An empty phone is stored as NULL: it never collides under `UNIQUE` and
/// never matches a login lookup. Reads map NULL back to `""`.
fn stored_phone(phone: &str) -> Option<&str> {
    (!phone.is_empty()).then_some(phone)
}

fn written_if(hit: bool) -> WriteOutcome {
    if hit {
        WriteOutcome::Written(())
    } else {
        WriteOutcome::Missing
    }
}

fn is_constraint_violation<T>(res: &std::result::Result<T, rusqlite::Error>) -> bool {
    matches!(
        res,
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
    )
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        password: row.get(3)?,
        picture: row.get(4)?,
        rating: row.get(5)?,
    })
}

fn map_community(row: &Row<'_>) -> rusqlite::Result<CommunityRow> {
    Ok(CommunityRow {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn map_product(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        name: row.get(1)?,
        service: row.get(2)?,
        price: row.get(3)?,
        upload_date: row.get(4)?,
        description: row.get(5)?,
        user_id: row.get(6)?,
    })
}

fn map_review(row: &Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        id: row.get(0)?,
        rating: row.get(1)?,
        content: row.get(2)?,
        reviewer_id: row.get(3)?,
        owner_id: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_fields(name: &str, phone: &str) -> UserFields {
        UserFields {
            name: name.to_string(),
            phone: phone.to_string(),
            password: "secret".to_string(),
            picture: vec![0xff, 0x00, 0x7f],
            rating: 0.0,
        }
    }

    fn product_fields(name: &str) -> ProductFields {
        ProductFields {
            name: name.to_string(),
            service: true,
            price: 250,
            upload_date: "2024-03-01".to_string(),
            description: "lawn mowing".to_string(),
        }
    }

    fn new_user(db: &Database, name: &str, phone: &str) -> UserRow {
        match db.create_user(&user_fields(name, phone)).unwrap() {
            WriteOutcome::Written(row) => row,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn new_community(db: &Database, name: &str) -> CommunityRow {
        match db.create_community(name).unwrap() {
            WriteOutcome::Written(row) => row,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn user_columns_map_in_select_order() {
        let db = Database::open_in_memory().unwrap();
        let created = new_user(&db, "Alice", "0700000001");

        let fetched = db.get_user(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.picture, vec![0xff, 0x00, 0x7f]);
    }

    #[test]
    fn missing_user_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_user(4242).unwrap().is_none());
    }

    #[test]
    fn duplicate_phone_conflicts() {
        let db = Database::open_in_memory().unwrap();
        new_user(&db, "Alice", "0700000001");
        let outcome = db.create_user(&user_fields("Bob", "0700000001")).unwrap();
        assert_eq!(outcome, WriteOutcome::Conflict);
    }

    #[test]
    fn product_columns_map_in_select_order() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "Alice", "0700000001");
        let created = match db.create_product(owner.id, &product_fields("Mowing")).unwrap() {
            WriteOutcome::Written(row) => row,
            other => panic!("unexpected outcome {:?}", other),
        };

        assert_eq!(db.get_product(created.id).unwrap(), Some(created.clone()));
        assert_eq!(db.list_user_products(owner.id).unwrap(), vec![created.clone()]);
        assert_eq!(db.get_product_owner(created.id).unwrap(), Some(owner.id));
    }

    #[test]
    fn product_for_unknown_owner_is_missing() {
        let db = Database::open_in_memory().unwrap();
        let outcome = db.create_product(99, &product_fields("Mowing")).unwrap();
        assert_eq!(outcome, WriteOutcome::Missing);
    }

    #[test]
    fn update_product_overwrites_every_column() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "Alice", "0700000001");
        let WriteOutcome::Written(product) = db.create_product(owner.id, &product_fields("Mowing")).unwrap() else {
            panic!("product not created");
        };

        let blank = ProductFields {
            name: String::new(),
            service: false,
            price: 0,
            upload_date: "1970-01-01".to_string(),
            description: String::new(),
        };
        assert_eq!(db.update_product(product.id, &blank).unwrap(), WriteOutcome::Written(()));

        let stored = db.get_product(product.id).unwrap().unwrap();
        assert_eq!(stored.name, "");
        assert!(!stored.service);
        assert_eq!(stored.price, 0);
        assert_eq!(stored.description, "");
        assert_eq!(stored.user_id, owner.id);
    }

    #[test]
    fn joined_and_not_joined_partition_communities() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db, "Alice", "0700000001");
        let a = new_community(&db, "Gardening");
        let b = new_community(&db, "Cycling");
        let c = new_community(&db, "Baking");

        assert_eq!(db.join_community(user.id, b.id).unwrap(), WriteOutcome::Written(()));

        let joined = db.list_user_communities(user.id, true).unwrap();
        let not_joined = db.list_user_communities(user.id, false).unwrap();
        assert_eq!(joined, vec![b.clone()]);
        assert_eq!(not_joined, vec![a, c]);
        assert_eq!(joined.len() + not_joined.len(), db.list_communities().unwrap().len());
    }

    #[test]
    fn joining_twice_conflicts_and_unknown_community_is_missing() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db, "Alice", "0700000001");
        let community = new_community(&db, "Gardening");

        assert_eq!(db.join_community(user.id, community.id).unwrap(), WriteOutcome::Written(()));
        assert_eq!(db.join_community(user.id, community.id).unwrap(), WriteOutcome::Conflict);
        assert_eq!(db.join_community(user.id, 77).unwrap(), WriteOutcome::Missing);
    }

    #[test]
    fn followers_are_full_user_rows() {
        let db = Database::open_in_memory().unwrap();
        let alice = new_user(&db, "Alice", "0700000001");
        let bob = new_user(&db, "Bob", "0700000002");
        let carol = new_user(&db, "Carol", "0700000003");

        db.follow(alice.id, bob.id).unwrap();
        db.follow(alice.id, carol.id).unwrap();
        assert_eq!(db.follow(alice.id, bob.id).unwrap(), WriteOutcome::Conflict);

        assert_eq!(db.list_followers(alice.id).unwrap(), vec![bob, carol]);
        assert!(db.list_followers(4242).unwrap().is_empty());
    }

    #[test]
    fn delete_user_repoints_reviews_to_sentinel() {
        let db = Database::open_in_memory().unwrap();
        let alice = new_user(&db, "Alice", "0700000001");
        let bob = new_user(&db, "Bob", "0700000002");

        db.create_review(alice.id, bob.id, 5, "great").unwrap();
        db.create_review(bob.id, alice.id, 3, "fine").unwrap();

        assert_eq!(db.delete_user(alice.id).unwrap(), WriteOutcome::Written(()));
        assert!(db.get_user(alice.id).unwrap().is_none());
        assert!(db.list_user_reviews(alice.id).unwrap().is_empty());

        let orphaned = db.list_user_reviews(NO_OWNER_ID).unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].content, "great");
        assert_eq!(orphaned[0].reviewer_id, bob.id);

        let bobs = db.list_user_reviews(bob.id).unwrap();
        assert_eq!(bobs[0].reviewer_id, NO_OWNER_ID);
    }

    #[test]
    fn delete_missing_user_changes_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.delete_user(4242).unwrap(), WriteOutcome::Missing);
        assert_eq!(db.delete_user(NO_OWNER_ID).unwrap(), WriteOutcome::Missing);
        assert!(db.get_user(NO_OWNER_ID).unwrap().is_some());
    }

    #[test]
    fn failed_delete_rolls_back_review_repoints() {
        let db = Database::open_in_memory().unwrap();
        let alice = new_user(&db, "Alice", "0700000001");
        let bob = new_user(&db, "Bob", "0700000002");
        db.create_review(alice.id, bob.id, 5, "great").unwrap();
        db.create_review(bob.id, alice.id, 3, "fine").unwrap();

        // Both repoints succeed, then the row delete aborts.
        db.with_conn_mut(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER users_no_delete BEFORE DELETE ON users
                 BEGIN SELECT RAISE(ABORT, 'delete blocked'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.delete_user(alice.id).is_err());

        let owned = db.list_user_reviews(alice.id).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].owner_id, alice.id);
        assert_eq!(owned[0].reviewer_id, bob.id);

        let written = db.list_user_reviews(bob.id).unwrap();
        assert_eq!(written[0].reviewer_id, alice.id);
        assert!(db.list_user_reviews(NO_OWNER_ID).unwrap().is_empty());
        assert!(db.get_user(alice.id).unwrap().is_some());
    }

    #[test]
    fn sentinel_cannot_log_in() {
        let db = Database::open_in_memory().unwrap();
        let sentinel = db.get_user(NO_OWNER_ID).unwrap().unwrap();
        assert_eq!(sentinel.phone, "");
        assert!(db.get_credential_by_phone("").unwrap().is_none());
    }

    #[test]
    fn blank_phones_do_not_collide() {
        let db = Database::open_in_memory().unwrap();
        let alice = new_user(&db, "Alice", "0700000001");
        let bob = new_user(&db, "Bob", "0700000002");

        for user in [&alice, &bob] {
            assert_eq!(
                db.update_user(user.id, &user_fields(&user.name, "")).unwrap(),
                WriteOutcome::Written(())
            );
            assert_eq!(db.get_user(user.id).unwrap().unwrap().phone, "");
        }
        assert!(db.get_credential_by_phone("").unwrap().is_none());
    }

    #[test]
    fn update_user_missing_and_conflict() {
        let db = Database::open_in_memory().unwrap();
        let alice = new_user(&db, "Alice", "0700000001");
        new_user(&db, "Bob", "0700000002");

        assert_eq!(db.update_user(4242, &user_fields("X", "0700000009")).unwrap(), WriteOutcome::Missing);
        assert_eq!(
            db.update_user(alice.id, &user_fields("Alice", "0700000002")).unwrap(),
            WriteOutcome::Conflict
        );
    }
}
