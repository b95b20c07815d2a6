use askama::Template;

use crate::models::{Comment, Group, Post, User};
use crate::pagination::Page;

use super::{FormErrors, Layout};

// ----------------- Listing Pages -----------------

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexPage {
    pub layout: Layout,
    pub page_title: String,
    pub page: Page<Post>,
    pub author_count: i64,
    pub follow_count: i64,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupPage {
    pub layout: Layout,
    pub page_title: String,
    pub group: Group,
    pub page: Page<Post>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfilePage {
    pub layout: Layout,
    pub author: User,
    pub page: Page<Post>,
    pub following: bool,
    /// The viewer is signed in and is not looking at their own profile.
    pub show_follow: bool,
}

#[derive(Template)]
#[template(path = "posts/follow_index.html")]
pub struct FollowPage {
    pub layout: Layout,
    pub page_title: String,
    pub page: Page<Post>,
    pub author_count: i64,
    pub follow_count: i64,
}

// ----------------- Post Pages -----------------

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailPage {
    pub layout: Layout,
    pub page_title: String,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormPage {
    pub layout: Layout,
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub group_id: Option<i64>,
    pub groups: Vec<Group>,
    pub errors: FormErrors,
}

impl PostFormPage {
    /// Loop variables reach template methods by reference.
    pub fn is_selected(&self, id: &i64) -> bool {
        self.group_id == Some(*id)
    }
}

#[derive(Template)]
#[template(path = "posts/create_group.html")]
pub struct GroupFormPage {
    pub layout: Layout,
    pub title: String,
    pub description: String,
    pub errors: FormErrors,
}

// ----------------- Auth Pages -----------------

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginPage {
    pub layout: Layout,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupPage {
    pub layout: Layout,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

// ----------------- Static Pages -----------------

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorPage {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechPage {
    pub layout: Layout,
}

// ----------------- Error Pages -----------------

#[derive(Template)]
#[template(path = "core/403.html")]
pub struct ForbiddenPage {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundPage {
    pub layout: Layout,
    pub path: String,
}

impl NotFoundPage {
    pub fn new(path: Option<String>) -> Self {
        NotFoundPage {
            layout: Layout::anonymous(),
            path: path.unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "core/500.html")]
pub struct ServerErrorPage {
    pub layout: Layout,
}
