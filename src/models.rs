use chrono::NaiveDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post joined with its author and (optional) group, the shape every
/// listing and the detail page render.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

impl Post {
    /// Leading characters of the text, used for page titles.
    pub fn excerpt(&self, chars: usize) -> String {
        self.text.chars().take(chars).collect()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
}
