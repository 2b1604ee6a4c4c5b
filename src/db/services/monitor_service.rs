//! Repository operations for monitor records.
//!
//! Every function is a single-row effect over the shared pool; callers
//! decide how a `sqlx::Error` is rendered (reply text or log line).

use sqlx::SqlitePool;

use crate::db::models::{Monitor, NewMonitor};

pub async fn create_monitor(pool: &SqlitePool, new: NewMonitor) -> Result<Monitor, sqlx::Error> {
    sqlx::query_as::<_, Monitor>(
        "INSERT INTO monitors (user, channel, target, type, port) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&new.user)
    .bind(&new.channel)
    .bind(&new.target)
    .bind(new.monitor_type.as_str())
    .bind(new.port)
    .fetch_one(pool)
    .await
}

/// All monitors of every user, in no particular order. Used by the sweep.
pub async fn list_all_monitors(pool: &SqlitePool) -> Result<Vec<Monitor>, sqlx::Error> {
    sqlx::query_as::<_, Monitor>("SELECT * FROM monitors")
        .fetch_all(pool)
        .await
}

pub async fn list_monitors_for_user(
    pool: &SqlitePool,
    user: &str,
) -> Result<Vec<Monitor>, sqlx::Error> {
    sqlx::query_as::<_, Monitor>("SELECT * FROM monitors WHERE user = ? ORDER BY id")
        .bind(user)
        .fetch_all(pool)
        .await
}

pub async fn list_monitors_for_user_in_channel(
    pool: &SqlitePool,
    user: &str,
    channel: &str,
) -> Result<Vec<Monitor>, sqlx::Error> {
    sqlx::query_as::<_, Monitor>(
        "SELECT * FROM monitors WHERE user = ? AND channel = ? ORDER BY id",
    )
    .bind(user)
    .bind(channel)
    .fetch_all(pool)
    .await
}

/// Deletes a monitor only when both id and owner match. Returns the number
/// of rows affected (0 or 1).
pub async fn delete_monitor(pool: &SqlitePool, id: i64, user: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM monitors WHERE id = ? AND user = ?")
        .bind(id)
        .bind(user)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Last-write-wins update of the persisted health state. Idempotent.
pub async fn set_last_state_failed(
    pool: &SqlitePool,
    id: i64,
    failed: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE monitors SET last_state_failed = ? WHERE id = ?")
        .bind(failed)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::enums::MonitorType;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        pool
    }

    fn new_monitor(user: &str, channel: &str) -> NewMonitor {
        NewMonitor {
            user: user.to_string(),
            channel: channel.to_string(),
            target: "http://example.com".to_string(),
            monitor_type: MonitorType::Http,
            port: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults_to_healthy() {
        let pool = memory_pool().await;
        let monitor = create_monitor(&pool, new_monitor("U1", "C1")).await.unwrap();

        assert_eq!(monitor.user, "U1");
        assert_eq!(monitor.monitor_type, "http");
        assert_eq!(monitor.port, None);
        assert!(!monitor.last_state_failed);
    }

    #[tokio::test]
    async fn port_round_trips_through_the_nullable_column() {
        let pool = memory_pool().await;
        let monitor = create_monitor(
            &pool,
            NewMonitor {
                monitor_type: MonitorType::Port,
                port: Some(65535),
                target: "example.com".to_string(),
                ..new_monitor("U1", "C1")
            },
        )
        .await
        .unwrap();

        assert_eq!(monitor.port, Some(65535));
    }

    #[tokio::test]
    async fn listing_is_scoped_by_user_and_channel() {
        let pool = memory_pool().await;
        create_monitor(&pool, new_monitor("U1", "C1")).await.unwrap();
        create_monitor(&pool, new_monitor("U1", "C2")).await.unwrap();
        create_monitor(&pool, new_monitor("U2", "C1")).await.unwrap();

        assert_eq!(list_all_monitors(&pool).await.unwrap().len(), 3);
        assert_eq!(list_monitors_for_user(&pool, "U1").await.unwrap().len(), 2);
        let in_channel = list_monitors_for_user_in_channel(&pool, "U1", "C1")
            .await
            .unwrap();
        assert_eq!(in_channel.len(), 1);
        assert_eq!(in_channel[0].channel, "C1");
    }

    #[tokio::test]
    async fn delete_requires_matching_owner() {
        let pool = memory_pool().await;
        let monitor = create_monitor(&pool, new_monitor("U1", "C1")).await.unwrap();

        assert_eq!(delete_monitor(&pool, monitor.id, "U2").await.unwrap(), 0);
        assert_eq!(list_monitors_for_user(&pool, "U1").await.unwrap().len(), 1);

        assert_eq!(delete_monitor(&pool, monitor.id, "U1").await.unwrap(), 1);
        assert!(list_monitors_for_user(&pool, "U1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_deletion() {
        let pool = memory_pool().await;
        let first = create_monitor(&pool, new_monitor("U1", "C1")).await.unwrap();
        delete_monitor(&pool, first.id, "U1").await.unwrap();
        let second = create_monitor(&pool, new_monitor("U1", "C1")).await.unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn set_last_state_failed_is_idempotent() {
        let pool = memory_pool().await;
        let monitor = create_monitor(&pool, new_monitor("U1", "C1")).await.unwrap();

        set_last_state_failed(&pool, monitor.id, true).await.unwrap();
        set_last_state_failed(&pool, monitor.id, true).await.unwrap();
        let rows = list_monitors_for_user(&pool, "U1").await.unwrap();
        assert!(rows[0].last_state_failed);

        set_last_state_failed(&pool, monitor.id, false).await.unwrap();
        let rows = list_monitors_for_user(&pool, "U1").await.unwrap();
        assert!(!rows[0].last_state_failed);
    }
}
