use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::Follow};

pub async fn get_follow_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<Option<Follow>, RequestError> {
    let follow = sqlx::query_as::<Sqlite, Follow>(
        r#"
        SELECT id, follower_id, followed_id FROM follows WHERE follower_id = ?1 AND followed_id = ?2
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_optional(pool)
    .await?;
    Ok(follow)
}

/// Returns whether a new row was written; following twice is a no-op.
pub async fn follow_user_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO follows (follower_id, followed_id)
        VALUES (?1, ?2)
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(&mut tx)
    .await?;
    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

/// Removes only the requesting follower's row.
pub async fn unfollow_user_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    followed_id: i64,
) -> Result<bool, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2
        "#,
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(&mut tx)
    .await?;
    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_follows_in_db(pool: &SqlitePool) -> Result<i64, RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM follows")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
