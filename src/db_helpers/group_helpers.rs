use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::ValidGroup, errors::RequestError, models::Group};

pub async fn list_groups_in_db(pool: &SqlitePool) -> Result<Vec<Group>, RequestError> {
    let groups = sqlx::query_as::<Sqlite, Group>(
        "SELECT id, title, slug, description FROM post_groups ORDER BY title",
    )
    .fetch_all(pool)
    .await?;
    Ok(groups)
}

pub async fn get_group_by_slug_in_db(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Group>, RequestError> {
    let group = sqlx::query_as::<Sqlite, Group>(
        "SELECT id, title, slug, description FROM post_groups WHERE slug = ?1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(group)
}

pub async fn insert_group_in_db(
    pool: &SqlitePool,
    ValidGroup {
        title,
        slug,
        description,
    }: &ValidGroup,
) -> Result<Group, RequestError> {
    let mut tx = pool.begin().await?;
    let group = sqlx::query_as::<Sqlite, Group>(
        r#"
        INSERT INTO post_groups (title, slug, description)
        VALUES (?1, ?2, ?3)
        RETURNING id, title, slug, description
        "#,
    )
    .bind(title)
    .bind(slug)
    .bind(description)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(group)
}
