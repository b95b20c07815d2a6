use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::User};

use super::USER_COLUMNS;

/// `password` must already be hashed.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3) RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<Sqlite, User>(&query)
        .bind(username)
        .bind(email)
        .bind(password)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(user)
}
