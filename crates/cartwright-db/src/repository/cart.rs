//! # Cart Repository
//!
//! Persistent storage for session carts, one row per (session, product).
//!
//! ## Row Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add (new product)  ──► INSERT            quantity = n                 │
//! │  add (existing)     ──► ON CONFLICT ...   quantity = n', updated_at    │
//! │  remove             ──► DELETE one row                                 │
//! │  clear              ──► DELETE all rows for the session                │
//! │  view / remove      ──► UPDATE updated_at (keeps the cart alive)       │
//! │  sweeper            ──► DELETE sessions idle past the cutoff           │
//! │  product deleted    ──► ON DELETE CASCADE                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository stores whatever it is given. Stock rules live in
//! `cartwright-core`, and serialisation per session lives in the API's
//! cart service.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cartwright_core::CartLine;

const LINE_COLUMNS: &str = "product_id, name, unit_price_cents, quantity, added_at, updated_at";

/// Repository for cart line operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Loads every line in a session's cart, ordered by product id.
    pub async fn load(&self, session_id: &str) -> DbResult<Vec<CartLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE session_id = ?1 ORDER BY product_id"
        );

        let lines = sqlx::query_as::<_, CartLine>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Gets a single line, if the session holds that product.
    pub async fn get_line(&self, session_id: &str, product_id: &str) -> DbResult<Option<CartLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE session_id = ?1 AND product_id = ?2"
        );

        let line = sqlx::query_as::<_, CartLine>(&sql)
            .bind(session_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(line)
    }

    /// Inserts or replaces a line.
    ///
    /// An existing row keeps its `added_at`; everything else is overwritten.
    pub async fn upsert_line(&self, session_id: &str, line: &CartLine) -> DbResult<()> {
        debug!(
            session_id = %session_id,
            product_id = %line.product_id,
            quantity = line.quantity,
            "Upserting cart line"
        );

        sqlx::query(
            r#"
            INSERT INTO cart_lines (
                session_id, product_id, name, unit_price_cents,
                quantity, added_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (session_id, product_id) DO UPDATE SET
                name = excluded.name,
                unit_price_cents = excluded.unit_price_cents,
                quantity = excluded.quantity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.unit_price_cents)
        .bind(line.quantity)
        .bind(line.added_at)
        .bind(line.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes one line. Returns whether a row existed.
    pub async fn delete_line(&self, session_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE session_id = ?1 AND product_id = ?2")
            .bind(session_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every line in a session's cart. Returns the number removed.
    pub async fn clear(&self, session_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        debug!(session_id = %session_id, removed = result.rows_affected(), "Cart cleared");
        Ok(result.rows_affected())
    }

    /// Marks every line in a session's cart as used at `at`, so an active
    /// cart is not swept. Returns the number of lines touched.
    pub async fn touch(&self, session_id: &str, at: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("UPDATE cart_lines SET updated_at = ?2 WHERE session_id = ?1")
            .bind(session_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes whole carts whose most recent write is older than `cutoff`.
    ///
    /// A cart with one fresh line survives intact even if its other lines
    /// are old. Returns the number of lines removed.
    pub async fn purge_idle(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_lines
            WHERE session_id IN (
                SELECT session_id FROM cart_lines
                GROUP BY session_id
                HAVING MAX(updated_at) < ?1
            )
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Number of distinct sessions holding at least one line.
    pub async fn session_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT session_id) FROM cart_lines")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use cartwright_core::Product;
    use chrono::Duration;

    const SESSION_A: &str = "6f1c1a52-4a4e-4f7c-9a43-2f0e3c1d9b11";
    const SESSION_B: &str = "0b5e3f0e-93f4-4a6e-8f25-0a3d4c7e2b90";

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, stock) in [("mug", 5), ("tee", 3)] {
            let now = Utc::now();
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    price_cents: 1000,
                    quantity_on_hand: stock,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        db
    }

    fn line(product_id: &str, quantity: i64) -> CartLine {
        let now = Utc::now();
        CartLine {
            product_id: product_id.to_string(),
            name: product_id.to_uppercase(),
            unit_price_cents: 1000,
            quantity,
            added_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_insert_then_update_keeps_added_at() {
        let db = setup().await;
        let carts = db.carts();

        let first = line("mug", 1);
        carts.upsert_line(SESSION_A, &first).await.unwrap();

        let mut second = line("mug", 3);
        second.added_at = first.added_at + Duration::hours(1);
        carts.upsert_line(SESSION_A, &second).await.unwrap();

        let stored = carts.get_line(SESSION_A, "mug").await.unwrap().unwrap();
        assert_eq!(stored.quantity, 3);
        assert_eq!(stored.added_at, first.added_at);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let db = setup().await;
        let carts = db.carts();

        carts.upsert_line(SESSION_A, &line("mug", 2)).await.unwrap();
        carts.upsert_line(SESSION_B, &line("tee", 1)).await.unwrap();

        let a = carts.load(SESSION_A).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].product_id, "mug");
        assert!(carts.get_line(SESSION_B, "mug").await.unwrap().is_none());
        assert_eq!(carts.session_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_by_schema() {
        let db = setup().await;

        let err = db.carts().upsert_line(SESSION_A, &line("mug", 0)).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_product_rejected_by_schema() {
        let db = setup().await;

        let err = db.carts().upsert_line(SESSION_A, &line("ghost", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_line_and_clear() {
        let db = setup().await;
        let carts = db.carts();

        carts.upsert_line(SESSION_A, &line("mug", 2)).await.unwrap();
        carts.upsert_line(SESSION_A, &line("tee", 1)).await.unwrap();

        assert!(carts.delete_line(SESSION_A, "mug").await.unwrap());
        assert!(!carts.delete_line(SESSION_A, "mug").await.unwrap());

        assert_eq!(carts.clear(SESSION_A).await.unwrap(), 1);
        assert_eq!(carts.clear(SESSION_A).await.unwrap(), 0);
        assert!(carts.load(SESSION_A).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_idle_removes_whole_stale_carts_only() {
        let db = setup().await;
        let carts = db.carts();
        let now = Utc::now();

        // Session A: entirely stale
        let mut stale = line("mug", 1);
        stale.updated_at = now - Duration::hours(100);
        carts.upsert_line(SESSION_A, &stale).await.unwrap();

        // Session B: one stale line, one fresh line
        let mut old = line("mug", 1);
        old.updated_at = now - Duration::hours(100);
        carts.upsert_line(SESSION_B, &old).await.unwrap();
        carts.upsert_line(SESSION_B, &line("tee", 1)).await.unwrap();

        let removed = carts.purge_idle(now - Duration::hours(72)).await.unwrap();
        assert_eq!(removed, 1);

        assert!(carts.load(SESSION_A).await.unwrap().is_empty());
        assert_eq!(carts.load(SESSION_B).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_touch_saves_a_cart_from_the_sweep() {
        let db = setup().await;
        let carts = db.carts();
        let now = Utc::now();

        let mut stale = line("mug", 1);
        stale.updated_at = now - Duration::hours(100);
        carts.upsert_line(SESSION_A, &stale).await.unwrap();

        assert_eq!(carts.touch(SESSION_A, now).await.unwrap(), 1);
        assert_eq!(carts.touch(SESSION_B, now).await.unwrap(), 0);

        assert_eq!(carts.purge_idle(now - Duration::hours(72)).await.unwrap(), 0);
        assert_eq!(carts.load(SESSION_A).await.unwrap().len(), 1);
    }
}
