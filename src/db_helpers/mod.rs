use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::User};

mod comment_helpers;
mod group_helpers;
mod post_helpers;
mod profile_helpers;
mod user_helpers;

pub use comment_helpers::*;
pub use group_helpers::*;
pub use post_helpers::*;
pub use profile_helpers::*;
pub use user_helpers::*;

const USER_COLUMNS: &str = "id, username, email, password, created_at";

// ----------------- Helper Functions -----------------

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn count_users_in_db(pool: &SqlitePool) -> Result<i64, RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
