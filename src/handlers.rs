use askama::Template;
use axum::{
    extract::{Multipart, Path, Query},
    http::{header::SET_COOKIE, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    authentication::{
        expired_session_cookie, get_jwt_token, hash_password_argon2, session_cookie,
        verify_password_argon2, AuthUser, MaybeUser, RequireUser,
    },
    cache::PageCache,
    data_formats::{
        safe_next, AboutAuthorPage, AboutTechPage, CommentForm, FollowPage, FormErrors,
        GroupForm, GroupFormPage, GroupPage, IndexPage, Layout, LoginForm, LoginPage, LoginQuery,
        PageQuery, PostDetailPage, PostForm, PostFormPage, ProfilePage, SignupForm, SignupPage,
        ValidPost,
    },
    db_helpers::{
        add_comment_to_post_in_db, count_follows_in_db, count_users_in_db, create_post_in_db,
        follow_user_in_db, get_comments_for_post_in_db, get_follow_in_db,
        get_group_by_slug_in_db, get_post_in_db, get_posts_page_in_db, get_user_by_username,
        insert_group_in_db, insert_user, list_groups_in_db, unfollow_user_in_db,
        update_post_in_db, PostFilter,
    },
    errors::{not_found_response, RequestError},
    models::{Group, Post},
    AppState,
};

type HtmlResult = Result<Html<String>, RequestError>;
type ResponseResult = Result<Response, RequestError>;

const INDEX_TITLE: &str = "Latest updates";
const FOLLOW_TITLE: &str = "Authors you follow";
const DETAIL_TITLE_CHARS: usize = 30;

fn render<T: Template>(page: T) -> HtmlResult {
    Ok(Html(page.render()?))
}

/// Ids in paths that are not integers cannot name a row.
fn parse_id(raw: &str) -> Result<i64, RequestError> {
    raw.parse().map_err(|_| RequestError::NotFound)
}

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

fn post_url(id: i64) -> String {
    format!("/posts/{id}/")
}

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Response {
    not_found_response(Some(uri.path().to_owned()))
}

pub async fn about_author(MaybeUser(user): MaybeUser) -> HtmlResult {
    render(AboutAuthorPage {
        layout: Layout::new(user),
    })
}

pub async fn about_tech(MaybeUser(user): MaybeUser) -> HtmlResult {
    render(AboutTechPage {
        layout: Layout::new(user),
    })
}

// ----------------- Listing Handlers -----------------

/// Home page. The rendered HTML is served from the page cache until the
/// entry expires, so new or deleted posts show up late.
pub async fn index(
    Extension(state): Extension<AppState>,
    maybe_user: MaybeUser,
    uri: Uri,
    Query(PageQuery { page }): Query<PageQuery>,
) -> HtmlResult {
    let cache_key = PageCache::key(&uri, maybe_user.get_id());
    if let Some(body) = state.page_cache.get(&cache_key).await {
        debug!(key = %cache_key, "Serving home page from cache");
        return Ok(Html(body));
    }

    let page = get_posts_page_in_db(
        &state.pool,
        PostFilter::all(),
        state.config.posts_per_page,
        page.as_deref(),
    )
    .await?;
    let body = IndexPage {
        layout: Layout::new(maybe_user.0),
        page_title: INDEX_TITLE.to_owned(),
        page,
        author_count: count_users_in_db(&state.pool).await?,
        follow_count: count_follows_in_db(&state.pool).await?,
    }
    .render()?;

    state.page_cache.insert(cache_key, body.clone()).await;
    Ok(Html(body))
}

pub async fn group_posts(
    Extension(state): Extension<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> HtmlResult {
    let group = get_group_by_slug_in_db(&state.pool, &slug)
        .await?
        .ok_or(RequestError::NotFound)?;
    let page = get_posts_page_in_db(
        &state.pool,
        PostFilter::group(group.id),
        state.config.posts_per_page,
        page.as_deref(),
    )
    .await?;
    render(GroupPage {
        layout: Layout::new(user),
        page_title: format!("Posts of group {}", group.slug),
        group,
        page,
    })
}

pub async fn profile(
    Extension(state): Extension<AppState>,
    MaybeUser(user): MaybeUser,
    Path(username): Path<String>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> HtmlResult {
    let author = get_user_by_username(&state.pool, &username)
        .await?
        .ok_or(RequestError::NotFound)?;
    let page = get_posts_page_in_db(
        &state.pool,
        PostFilter::author(author.id),
        state.config.posts_per_page,
        page.as_deref(),
    )
    .await?;

    let (following, show_follow) = match &user {
        Some(viewer) if viewer.id != author.id => (
            get_follow_in_db(&state.pool, viewer.id, author.id)
                .await?
                .is_some(),
            true,
        ),
        _ => (false, false),
    };

    render(ProfilePage {
        layout: Layout::new(user),
        author,
        page,
        following,
        show_follow,
    })
}

pub async fn follow_index(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Query(PageQuery { page }): Query<PageQuery>,
) -> HtmlResult {
    let page = get_posts_page_in_db(
        &state.pool,
        PostFilter::feed(user.id),
        state.config.posts_per_page,
        page.as_deref(),
    )
    .await?;
    render(FollowPage {
        layout: Layout::wrap_with_user(user),
        page_title: FOLLOW_TITLE.to_owned(),
        page,
        author_count: count_users_in_db(&state.pool).await?,
        follow_count: count_follows_in_db(&state.pool).await?,
    })
}

// ----------------- Post Handlers -----------------

pub async fn post_detail(
    Extension(state): Extension<AppState>,
    MaybeUser(user): MaybeUser,
    Path(post_id): Path<String>,
) -> HtmlResult {
    let post = get_post_in_db(&state.pool, parse_id(&post_id)?)
        .await?
        .ok_or(RequestError::NotFound)?;
    let comments = get_comments_for_post_in_db(&state.pool, post.id).await?;
    let can_edit = user.as_ref().map_or(false, |u| u.id == post.author_id);
    render(PostDetailPage {
        layout: Layout::new(user),
        page_title: post.excerpt(DETAIL_TITLE_CHARS),
        post,
        comments,
        can_edit,
    })
}

fn post_form_page(
    user: AuthUser,
    edit_of: Option<i64>,
    text: String,
    group_id: Option<i64>,
    groups: Vec<Group>,
    errors: FormErrors,
) -> PostFormPage {
    let action = match edit_of {
        Some(id) => format!("/posts/{id}/edit/"),
        None => "/create/".to_owned(),
    };
    PostFormPage {
        layout: Layout::wrap_with_user(user),
        is_edit: edit_of.is_some(),
        action,
        text,
        group_id,
        groups,
        errors,
    }
}

/// The chosen group has to be one that exists.
fn check_group_choice(post: ValidPost, groups: &[Group]) -> Result<ValidPost, FormErrors> {
    match post.group {
        Some(id) if !groups.iter().any(|group| group.id == id) => Err(FormErrors::single(
            "group",
            "Select a valid choice. That choice is not one of the available choices.",
        )),
        _ => Ok(post),
    }
}

pub async fn post_create_form(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
) -> HtmlResult {
    let groups = list_groups_in_db(&state.pool).await?;
    render(post_form_page(
        user,
        None,
        String::new(),
        None,
        groups,
        FormErrors::new(),
    ))
}

pub async fn post_create(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    multipart: Multipart,
) -> ResponseResult {
    let form = PostForm::from_multipart(multipart).await?;
    let submitted_text = form.text.clone();
    let submitted_group = form.group.trim().parse::<i64>().ok();
    let groups = list_groups_in_db(&state.pool).await?;

    let post = match form
        .validate()
        .and_then(|post| check_group_choice(post, &groups))
    {
        Ok(post) => post,
        Err(errors) => {
            let page = post_form_page(user, None, submitted_text, submitted_group, groups, errors);
            return Ok(render(page)?.into_response());
        }
    };

    let image = match &post.image {
        Some(upload) => Some(state.media.save(upload).await?),
        None => None,
    };
    let created = create_post_in_db(
        &state.pool,
        user.id,
        &post.text,
        post.group,
        image.as_deref(),
        Utc::now().naive_utc(),
    )
    .await;
    let id = match created {
        Ok(id) => id,
        Err(e) => {
            if let Some(path) = &image {
                state.media.remove(path).await;
            }
            return Err(e);
        }
    };
    info!(post_id = id, author = %user.username, "Post created");

    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

/// Loads the post behind an edit URL; non-authors are bounced to the
/// detail page.
async fn load_own_post(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
) -> Result<Result<Post, Response>, RequestError> {
    let post = get_post_in_db(&state.pool, parse_id(raw_id)?)
        .await?
        .ok_or(RequestError::NotFound)?;
    if post.author_id != user.id {
        debug!(post_id = post.id, user = %user.username, "Edit refused for non-author");
        return Ok(Err(Redirect::to(&post_url(post.id)).into_response()));
    }
    Ok(Ok(post))
}

pub async fn post_edit_form(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
) -> ResponseResult {
    let post = match load_own_post(&state, &user, &post_id).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };
    let groups = list_groups_in_db(&state.pool).await?;
    let page = post_form_page(
        user,
        Some(post.id),
        post.text,
        post.group_id,
        groups,
        FormErrors::new(),
    );
    Ok(render(page)?.into_response())
}

/// Overwrites text and group; an uploaded image is ignored on edit.
pub async fn post_edit(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> ResponseResult {
    let post = match load_own_post(&state, &user, &post_id).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };

    let mut form = PostForm::from_multipart(multipart).await?;
    form.image = None;
    let submitted_text = form.text.clone();
    let submitted_group = form.group.trim().parse::<i64>().ok();
    let groups = list_groups_in_db(&state.pool).await?;

    let valid = match form
        .validate()
        .and_then(|valid| check_group_choice(valid, &groups))
    {
        Ok(valid) => valid,
        Err(errors) => {
            let page = post_form_page(
                user,
                Some(post.id),
                submitted_text,
                submitted_group,
                groups,
                errors,
            );
            return Ok(render(page)?.into_response());
        }
    };

    update_post_in_db(&state.pool, post.id, user.id, &valid.text, valid.group).await?;
    info!(post_id = post.id, author = %user.username, "Post edited");

    Ok(Redirect::to(&post_url(post.id)).into_response())
}

// ----------------- Comment Handlers -----------------

/// Always lands back on the post; an empty comment is silently dropped.
pub async fn add_comment(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> ResponseResult {
    let post = get_post_in_db(&state.pool, parse_id(&post_id)?)
        .await?
        .ok_or(RequestError::NotFound)?;

    match form.validate() {
        Ok(text) => {
            let id = add_comment_to_post_in_db(
                &state.pool,
                user.id,
                post.id,
                &text,
                Utc::now().naive_utc(),
            )
            .await?;
            info!(comment_id = id, post_id = post.id, author = %user.username, "Comment added");
        }
        Err(errors) => debug!(post_id = post.id, ?errors, "Comment rejected"),
    }

    Ok(Redirect::to(&post_url(post.id)).into_response())
}

// ----------------- Profile Handlers -----------------

pub async fn profile_follow(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> ResponseResult {
    let author = get_user_by_username(&state.pool, &username)
        .await?
        .ok_or(RequestError::NotFound)?;
    if author.id != user.id && follow_user_in_db(&state.pool, user.id, author.id).await? {
        info!(follower = %user.username, author = %author.username, "Follow created");
    }
    Ok(Redirect::to("/follow/").into_response())
}

pub async fn profile_unfollow(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> ResponseResult {
    let author = get_user_by_username(&state.pool, &username)
        .await?
        .ok_or(RequestError::NotFound)?;
    if unfollow_user_in_db(&state.pool, user.id, author.id).await? {
        info!(follower = %user.username, author = %author.username, "Follow removed");
    }
    Ok(Redirect::to("/follow/").into_response())
}

// ----------------- Group Handlers -----------------

fn group_form_page(user: AuthUser, form: GroupForm, errors: FormErrors) -> GroupFormPage {
    GroupFormPage {
        layout: Layout::wrap_with_user(user),
        title: form.title,
        description: form.description,
        errors,
    }
}

pub async fn group_create_form(RequireUser(user): RequireUser) -> HtmlResult {
    render(group_form_page(
        user,
        GroupForm::default(),
        FormErrors::new(),
    ))
}

pub async fn group_create(
    Extension(state): Extension<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<GroupForm>,
) -> ResponseResult {
    let taken = FormErrors::single("title", "A group with this slug already exists.");

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(render(group_form_page(user, form, errors))?.into_response()),
    };
    if get_group_by_slug_in_db(&state.pool, &valid.slug)
        .await?
        .is_some()
    {
        return Ok(render(group_form_page(user, form, taken))?.into_response());
    }

    let group = match insert_group_in_db(&state.pool, &valid).await {
        Ok(group) => group,
        Err(e) if e.is_unique_violation() => {
            return Ok(render(group_form_page(user, form, taken))?.into_response())
        }
        Err(e) => return Err(e),
    };
    info!(slug = %group.slug, creator = %user.username, "Group created");

    Ok(Redirect::to(&format!("/group/{}/", group.slug)).into_response())
}

// ----------------- User Handlers -----------------

fn logged_in_redirect(state: &AppState, user_id: i64, target: &str) -> ResponseResult {
    let token = get_jwt_token(user_id, &state.config.jwt_secret, state.config.session_lifetime)
        .map_err(|_| RequestError::ServerError)?;
    let cookie = session_cookie(&token, state.config.session_lifetime);
    Ok(([(SET_COOKIE, cookie)], Redirect::to(target)).into_response())
}

pub async fn signup_form(MaybeUser(user): MaybeUser) -> HtmlResult {
    render(SignupPage {
        layout: Layout::new(user),
        username: String::new(),
        email: String::new(),
        errors: FormErrors::new(),
    })
}

pub async fn signup(
    Extension(state): Extension<AppState>,
    Form(form): Form<SignupForm>,
) -> ResponseResult {
    let signup_page = |form: SignupForm, errors: FormErrors| SignupPage {
        layout: Layout::anonymous(),
        username: form.username,
        email: form.email,
        errors,
    };

    let valid = match form.clone().validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(render(signup_page(form, errors))?.into_response()),
    };

    let hashed = hash_password_argon2(valid.password.clone())
        .await
        .map_err(|_| RequestError::ServerError)?;
    let user = match insert_user(&state.pool, &valid.username, &valid.email, &hashed).await {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => {
            let errors =
                FormErrors::single("username", "A user with that username already exists.");
            return Ok(render(signup_page(valid, errors))?.into_response());
        }
        Err(e) => return Err(e),
    };
    info!(user_id = user.id, username = %user.username, "User registered");

    logged_in_redirect(&state, user.id, "/")
}

pub async fn login_form(
    MaybeUser(user): MaybeUser,
    Query(LoginQuery { next }): Query<LoginQuery>,
) -> HtmlResult {
    render(LoginPage {
        layout: Layout::new(user),
        username: String::new(),
        next: safe_next(next.as_deref()),
        errors: FormErrors::new(),
    })
}

pub async fn login(
    Extension(state): Extension<AppState>,
    Form(form): Form<LoginForm>,
) -> ResponseResult {
    let next = safe_next(Some(&form.next));
    let login_page = |errors: FormErrors| LoginPage {
        layout: Layout::anonymous(),
        username: form.username.clone(),
        next: next.clone(),
        errors,
    };

    if let Err(errors) = form.validate() {
        return Ok(render(login_page(errors))?.into_response());
    }

    let user = match get_user_by_username(&state.pool, form.username.trim()).await? {
        Some(user) => user,
        None => return Ok(render(login_page(LoginForm::invalid_credentials()))?.into_response()),
    };
    let is_password_correct = verify_password_argon2(form.password.clone(), &user.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    if !is_password_correct {
        return Ok(render(login_page(LoginForm::invalid_credentials()))?.into_response());
    }
    info!(user_id = user.id, username = %user.username, "User logged in");

    logged_in_redirect(&state, user.id, &next)
}

pub async fn logout() -> Response {
    ([(SET_COOKIE, expired_session_cookie())], Redirect::to("/")).into_response()
}
