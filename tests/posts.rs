mod common;

use common::*;
use reqwest::{multipart, StatusCode};

#[tokio::test]
async fn test_create_post_stores_author_group_and_image() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;
    let group_id = app.create_group(&leo, "Cats").await;
    let before = app.count("SELECT COUNT(*) FROM posts").await;

    let image = multipart::Part::bytes(SMALL_GIF.to_vec())
        .file_name("small.gif")
        .mime_str("image/gif")
        .unwrap();
    let form = multipart::Form::new()
        .text("text", "A post with a picture")
        .text("group", group_id.to_string())
        .part("image", image);
    let response = app.post_multipart("/create/", form, Some(&leo)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");
    assert_eq!(app.count("SELECT COUNT(*) FROM posts").await, before + 1);

    let (author_id, stored_group, image, text): (i64, Option<i64>, Option<String>, String) =
        sqlx::query_as("SELECT author_id, group_id, image, text FROM posts")
            .fetch_one(&app.state.pool)
            .await
            .unwrap();
    assert_eq!(author_id, leo.id);
    assert_eq!(stored_group, Some(group_id));
    assert_eq!(text, "A post with a picture");
    let image = image.expect("Image path was not stored");
    assert_eq!(image, "posts/small.gif");

    let served = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await.unwrap().as_ref(), SMALL_GIF);
}

#[tokio::test]
async fn test_failed_insert_leaves_no_upload_behind() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;
    sqlx::query(
        "CREATE TRIGGER reject_posts BEFORE INSERT ON posts
         BEGIN SELECT RAISE(ABORT, 'posts are read-only'); END",
    )
    .execute(&app.state.pool)
    .await
    .unwrap();

    let image = multipart::Part::bytes(SMALL_GIF.to_vec())
        .file_name("small.gif")
        .mime_str("image/gif")
        .unwrap();
    let form = multipart::Form::new()
        .text("text", "Never stored")
        .part("image", image);
    let response = app.post_multipart("/create/", form, Some(&leo)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(app.count("SELECT COUNT(*) FROM posts").await, 0);
    let uploads = std::fs::read_dir(app.state.config.media_root.join("posts"))
        .unwrap()
        .count();
    assert_eq!(uploads, 0);
}

#[tokio::test]
async fn test_invalid_post_form_is_rendered_again() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;

    let form = multipart::Form::new().text("text", "   ");
    let response = app.post_multipart("/create/", form, Some(&leo)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("This field is required."));

    let form = multipart::Form::new()
        .text("text", "Valid text")
        .text("group", "4242");
    let response = app.post_multipart("/create/", form, Some(&leo)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Select a valid choice."));
    assert!(html.contains("Valid text"));

    assert_eq!(app.count("SELECT COUNT(*) FROM posts").await, 0);
}

#[tokio::test]
async fn test_anonymous_mutations_redirect_to_login_with_next() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;
    let post_id = app.create_post(&leo, "Protected").await;

    let edit = format!("/posts/{post_id}/edit/");
    let comment = format!("/posts/{post_id}/comment");
    for path in [
        "/create/",
        edit.as_str(),
        "/follow/",
        "/profile/leo/follow",
        "/profile/leo/unfollow",
        "/create/group/",
    ] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "GET {path}");
        assert_eq!(location(&response), login_url(path), "GET {path}");
    }

    for path in ["/create/", edit.as_str(), comment.as_str()] {
        let response = app.post_form(path, &[("text", "sneaky")], None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "POST {path}");
        assert_eq!(location(&response), login_url(path), "POST {path}");
    }

    assert_eq!(app.count("SELECT COUNT(*) FROM posts").await, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM comments").await, 0);
}

#[tokio::test]
async fn test_author_can_edit_post() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;
    let group_id = app.create_group(&leo, "Dogs").await;
    let post_id = app.create_post(&leo, "First draft").await;

    let html = app
        .get_html(&format!("/posts/{post_id}/edit/"), Some(&leo))
        .await;
    assert!(html.contains("First draft"));
    assert!(!html.contains("name=\"image\""));

    let form = multipart::Form::new()
        .text("text", "Final version")
        .text("group", group_id.to_string());
    let response = app
        .post_multipart(&format!("/posts/{post_id}/edit/"), form, Some(&leo))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{post_id}/"));

    let (text, stored_group): (String, Option<i64>) =
        sqlx::query_as("SELECT text, group_id FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_one(&app.state.pool)
            .await
            .unwrap();
    assert_eq!(text, "Final version");
    assert_eq!(stored_group, Some(group_id));

    let html = app
        .get_html(&format!("/posts/{post_id}/edit/"), Some(&leo))
        .await;
    let selected = format!("<option value=\"{group_id}\" selected>Dogs</option>");
    assert!(html.contains(&selected));
}

#[tokio::test]
async fn test_non_author_edit_redirects_to_detail() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;
    let mia = app.signup("mia").await;
    let post_id = app.create_post(&leo, "Leo wrote this").await;
    let detail = format!("/posts/{post_id}/");
    let edit = format!("/posts/{post_id}/edit/");

    let response = app.get(&edit, Some(&mia)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let form = multipart::Form::new().text("text", "Mia was here");
    let response = app.post_multipart(&edit, form, Some(&mia)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let (text, author_id): (String, i64) =
        sqlx::query_as("SELECT text, author_id FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_one(&app.state.pool)
            .await
            .unwrap();
    assert_eq!(text, "Leo wrote this");
    assert_eq!(author_id, leo.id);
}

#[tokio::test]
async fn test_detail_then_foreign_edit_scenario() {
    let app = TestApp::spawn().await;
    let a = app.signup("author_a").await;
    let post_id = app.create_post(&a, "hello").await;

    let html = app.get_html(&format!("/posts/{post_id}/"), None).await;
    assert!(html.contains("hello"));
    assert!(!html.contains("Edit post"));

    let b = app.signup("author_b").await;
    let response = app.get(&format!("/posts/{post_id}/edit/"), Some(&b)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{post_id}/"));
    assert!(!response.text().await.unwrap().contains("<form"));

    let html = app.get_html(&format!("/posts/{post_id}/"), Some(&a)).await;
    assert!(html.contains("Edit post"));
}

#[tokio::test]
async fn test_detail_title_uses_first_thirty_chars() {
    let app = TestApp::spawn().await;
    let leo = app.signup("leo").await;
    let text = "abcdefghijklmnopqrstuvwxyz0123456789";
    let post_id = app.create_post(&leo, text).await;

    let html = app.get_html(&format!("/posts/{post_id}/"), None).await;
    assert!(html.contains("<title>abcdefghijklmnopqrstuvwxyz0123</title>"));
}

#[tokio::test]
async fn test_missing_objects_are_not_found() {
    let app = TestApp::spawn().await;
    for path in [
        "/posts/999/",
        "/posts/not-a-number/",
        "/group/nope/",
        "/profile/nobody/",
        "/unexisting_page/",
    ] {
        let response = app.get(path, None).await;
        assert_eq!(
            response.status(),
            StatusCode::NOT_FOUND,
            "GET {path}"
        );
    }

    let leo = app.signup("leo").await;
    let response = app.get("/posts/999/edit/", Some(&leo)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get("/profile/nobody/follow", Some(&leo)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for path in ["/unexisting_page/", "/posts/999/", "/group/nope/", "/profile/nobody/"] {
        let html = app.get(path, None).await.text().await.unwrap();
        assert!(html.contains(&format!("The page {path} was not found.")), "{path}");
    }
}
