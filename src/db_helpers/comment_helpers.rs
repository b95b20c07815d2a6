use chrono::NaiveDateTime;
use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::Comment};

pub async fn add_comment_to_post_in_db(
    pool: &SqlitePool,
    author_id: i64,
    post_id: i64,
    text: &str,
    created: NaiveDateTime,
) -> Result<i64, RequestError> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO comments (post_id, author_id, text, created)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(author_id)
    .bind(text)
    .bind(created)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(id)
}

pub async fn get_comments_for_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<Comment>, RequestError> {
    let comments = sqlx::query_as::<Sqlite, Comment>(
        r#"
        SELECT comments.id        AS "id",
               comments.post_id   AS "post_id",
               comments.author_id AS "author_id",
               users.username     AS "author_username",
               comments.text      AS "text",
               comments.created   AS "created"
        FROM   comments
            JOIN users
                ON users.id = comments.author_id
        WHERE  comments.post_id = ?1
        ORDER  BY comments.created DESC, comments.id DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}
