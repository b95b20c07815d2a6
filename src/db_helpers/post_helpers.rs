use chrono::NaiveDateTime;
use sqlx::{Sqlite, SqlitePool};

use crate::errors::RequestError;
use crate::models::Post;
use crate::pagination::{Page, Paginator};

const POST_QUERY: &str = r#"
            SELECT posts.id               AS "id",
                   posts.text             AS "text",
                   posts.pub_date         AS "pub_date",
                   posts.image            AS "image",
                   posts.author_id        AS "author_id",
                   users.username         AS "author_username",
                   posts.group_id         AS "group_id",
                   post_groups.title      AS "group_title",
                   post_groups.slug       AS "group_slug"
            FROM   posts
                JOIN users
                    ON users.id = posts.author_id
                LEFT JOIN post_groups
                    ON post_groups.id = posts.group_id
"#;

//? Each filter is skipped when its parameter is NULL
const POST_FILTER: &str = r#"
            WHERE  ( posts.group_id = ?1
                    OR ?1 IS NULL )
                AND ( posts.author_id = ?2
                    OR ?2 IS NULL )
                AND ( posts.author_id IN (SELECT followed_id
                                          FROM   follows
                                          WHERE  follower_id = ?3)
                    OR ?3 IS NULL )
"#;

/// Which posts a listing shows. All filters left empty means every post.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub group_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Posts by authors this user follows.
    pub followed_by: Option<i64>,
}

impl PostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn group(group_id: i64) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    pub fn author(author_id: i64) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn feed(user_id: i64) -> Self {
        Self {
            followed_by: Some(user_id),
            ..Self::default()
        }
    }
}

pub async fn count_posts_in_db(pool: &SqlitePool, filter: PostFilter) -> Result<i64, RequestError> {
    let query = format!("SELECT COUNT(*) FROM posts {POST_FILTER}");
    let count = sqlx::query_scalar::<Sqlite, i64>(&query)
        .bind(filter.group_id)
        .bind(filter.author_id)
        .bind(filter.followed_by)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn list_posts_in_db(
    pool: &SqlitePool,
    filter: PostFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, RequestError> {
    let query = format!(
        "{POST_QUERY} {POST_FILTER} ORDER BY posts.pub_date DESC, posts.id DESC LIMIT ?4 OFFSET ?5"
    );
    let posts = sqlx::query_as::<Sqlite, Post>(&query)
        .bind(filter.group_id)
        .bind(filter.author_id)
        .bind(filter.followed_by)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(posts)
}

/// Counts the filtered set, resolves the requested page against it and
/// fetches only that page's rows.
pub async fn get_posts_page_in_db(
    pool: &SqlitePool,
    filter: PostFilter,
    per_page: i64,
    raw_page: Option<&str>,
) -> Result<Page<Post>, RequestError> {
    let total = count_posts_in_db(pool, filter).await?;
    let window = Paginator::new(total, per_page).get_page(raw_page);
    let posts = list_posts_in_db(pool, filter, window.limit(), window.offset()).await?;
    Ok(window.with_items(posts))
}

pub async fn get_post_in_db(pool: &SqlitePool, id: i64) -> Result<Option<Post>, RequestError> {
    let query = format!("{POST_QUERY} WHERE posts.id = ?1");
    let post = sqlx::query_as::<Sqlite, Post>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(post)
}

pub async fn create_post_in_db(
    pool: &SqlitePool,
    author_id: i64,
    text: &str,
    group_id: Option<i64>,
    image: Option<&str>,
    pub_date: NaiveDateTime,
) -> Result<i64, RequestError> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO posts (text, pub_date, author_id, group_id, image)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id
        "#,
    )
    .bind(text)
    .bind(pub_date)
    .bind(author_id)
    .bind(group_id)
    .bind(image)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(id)
}

/// Overwrites text and group. The author column is rewritten with the
/// editing user as well.
pub async fn update_post_in_db(
    pool: &SqlitePool,
    id: i64,
    author_id: i64,
    text: &str,
    group_id: Option<i64>,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        UPDATE posts SET text = ?1, group_id = ?2, author_id = ?3
        WHERE posts.id = ?4
        "#,
    )
    .bind(text)
    .bind(group_id)
    .bind(author_id)
    .bind(id)
    .execute(&mut tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}
