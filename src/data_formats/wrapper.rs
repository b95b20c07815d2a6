use chrono::{Datelike, Utc};

use crate::authentication::AuthUser;

/// Chrome shared by every page: who is signed in and the footer year.
#[derive(Debug, Clone)]
pub struct Layout {
    pub user: Option<AuthUser>,
    pub year: i32,
}

impl Layout {
    pub fn new(user: Option<AuthUser>) -> Self {
        Layout {
            user,
            year: Utc::now().year(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn wrap_with_user(user: AuthUser) -> Self {
        Self::new(Some(user))
    }
}
