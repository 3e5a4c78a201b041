//! Shared SQL for tables carrying a dense `sort_order` column
//!
//! Rows keep `sort_order` equal to `0..n-1`: inserts append at `n` (done by
//! each repository with `INSERT ... SELECT COUNT(*)`), deletes shift later
//! rows down by one, and reorders rewrite every position in one transaction.

use crate::config::DatabaseDriver;
use crate::db::{with_pool, DbRow, DynDatabasePool};
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Delete a row and close the gap it leaves in the sequence
pub(crate) async fn delete_compacting(
    pool: &DynDatabasePool,
    table: &'static str,
    id: i64,
) -> Result<()> {
    let select = format!("SELECT sort_order FROM {} WHERE id = ?", table);
    let delete = format!("DELETE FROM {} WHERE id = ?", table);
    let shift = format!(
        "UPDATE {} SET sort_order = sort_order - 1 WHERE sort_order > ?",
        table
    );

    with_pool!(pool, conn => {
        let mut tx = conn.begin().await.context("Failed to begin transaction")?;
        let row = sqlx::query(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("Failed to read position in {}", table))?;
        if let Some(row) = row {
            let position = row.i64("sort_order")?;
            sqlx::query(&delete)
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete from {}", table))?;
            sqlx::query(&shift)
                .bind(position)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to compact {}", table))?;
        }
        tx.commit().await.context("Failed to commit delete")?;
    });
    Ok(())
}

/// Rewrite `sort_order` for every `(id, position)` pair atomically.
///
/// The stored ids are re-read under the transaction. When they no longer
/// match the pairs (a row was added or deleted after the caller planned the
/// order) nothing is written and `false` is returned.
pub(crate) async fn apply_order(
    pool: &DynDatabasePool,
    table: &'static str,
    positions: &[(i64, i64)],
) -> Result<bool> {
    let select = match pool.driver() {
        DatabaseDriver::Mysql => format!("SELECT id FROM {} FOR UPDATE", table),
        DatabaseDriver::Sqlite => format!("SELECT id FROM {}", table),
    };
    let update = format!("UPDATE {} SET sort_order = ?, updated_at = ? WHERE id = ?", table);
    let planned: HashSet<i64> = positions.iter().map(|(id, _)| *id).collect();
    let now = chrono::Utc::now();

    with_pool!(pool, conn => {
        let mut tx = conn.begin().await.context("Failed to begin transaction")?;
        let rows = sqlx::query(&select)
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("Failed to read ids of {}", table))?;
        let stored = rows
            .iter()
            .map(|row| row.i64("id"))
            .collect::<Result<HashSet<i64>>>()?;
        if stored != planned || planned.len() != positions.len() {
            tx.rollback().await.context("Failed to roll back reorder")?;
            return Ok(false);
        }

        for (id, position) in positions {
            sqlx::query(&update)
                .bind(*position)
                .bind(now)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to reorder {}", table))?;
        }
        tx.commit().await.context("Failed to commit reorder")?;
    });
    Ok(true)
}

/// Ids in display order
pub(crate) async fn ids_in_order(pool: &DynDatabasePool, table: &'static str) -> Result<Vec<i64>> {
    let sql = format!("SELECT id FROM {} ORDER BY sort_order ASC, id ASC", table);
    with_pool!(pool, conn => {
        let rows = sqlx::query(&sql)
            .fetch_all(conn)
            .await
            .with_context(|| format!("Failed to list ids of {}", table))?;
        rows.iter().map(|row| row.i64("id")).collect()
    })
}
