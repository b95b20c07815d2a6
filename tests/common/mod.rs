#![allow(dead_code)]

use std::{net::TcpListener, time::Duration};

use reqwest::{header, multipart, redirect::Policy, Client, Response, StatusCode};
use tempfile::TempDir;
use yatube::{make_router, run_app, AppState, Config};

pub const PASSWORD: &str = "very-secret-pass";

/// 1x1 transparent GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub struct TestApp {
    pub address: String,
    pub state: AppState,
    client: Client,
    _dir: TempDir,
}

/// A signed-in account, carried as a raw `Cookie` header value.
pub struct Session {
    pub username: String,
    pub id: i64,
    pub cookie: String,
}

impl TestApp {
    pub async fn spawn() -> TestApp {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: format!("sqlite://{}", dir.path().join("yatube.db").display()),
            jwt_secret: "integration-secret".into(),
            media_root: dir.path().join("media"),
            posts_per_page: 10,
            index_cache_ttl: Duration::from_secs(300),
            session_lifetime: time::Duration::days(1),
        };
        let state = AppState::new(config).await.expect("Failed to build state");

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(run_app(make_router(state.clone()), listener));

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap();

        TestApp {
            address,
            state,
            client,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    fn with_cookie(
        &self,
        request: reqwest::RequestBuilder,
        session: Option<&Session>,
    ) -> reqwest::RequestBuilder {
        match session {
            Some(session) => request.header(header::COOKIE, &session.cookie),
            None => request,
        }
    }

    pub async fn get(&self, path: &str, session: Option<&Session>) -> Response {
        self.with_cookie(self.client.get(self.url(path)), session)
            .send()
            .await
            .unwrap()
    }

    pub async fn get_html(&self, path: &str, session: Option<&Session>) -> String {
        let response = self.get(path, session).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.unwrap()
    }

    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        session: Option<&Session>,
    ) -> Response {
        self.with_cookie(self.client.post(self.url(path)).form(form), session)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: multipart::Form,
        session: Option<&Session>,
    ) -> Response {
        self.with_cookie(self.client.post(self.url(path)).multipart(form), session)
            .send()
            .await
            .unwrap()
    }

    /// Submits a group form claiming to come from `origin`.
    pub async fn with_origin(&self, path: &str, origin: &str, session: &Session) -> Response {
        self.client
            .post(self.url(path))
            .header(header::ORIGIN, origin)
            .header(header::COOKIE, &session.cookie)
            .form(&[("title", "Origin Check"), ("description", "Posted cross-site")])
            .send()
            .await
            .unwrap()
    }

    pub async fn signup(&self, username: &str) -> Session {
        let email = format!("{username}@example.com");
        let response = self
            .post_form(
                "/auth/signup/",
                &[
                    ("username", username),
                    ("email", &email),
                    ("password", PASSWORD),
                ],
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response).expect("Signup did not set a session");
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.state.pool)
            .await
            .unwrap();
        Session {
            username: username.to_owned(),
            id,
            cookie,
        }
    }

    /// Creates a group through the form and returns its id.
    pub async fn create_group(&self, session: &Session, title: &str) -> i64 {
        let response = self
            .post_form(
                "/create/group/",
                &[("title", title), ("description", "A test group")],
                Some(session),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let slug = location(&response)
            .trim_start_matches("/group/")
            .trim_end_matches('/')
            .to_owned();
        sqlx::query_scalar::<_, i64>("SELECT id FROM post_groups WHERE slug = ?1")
            .bind(slug)
            .fetch_one(&self.state.pool)
            .await
            .unwrap()
    }

    /// Publishes a text-only post through the form and returns its id.
    pub async fn create_post(&self, session: &Session, text: &str) -> i64 {
        let form = multipart::Form::new().text("text", text.to_owned());
        let response = self.post_multipart("/create/", form, Some(session)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        sqlx::query_scalar::<_, i64>("SELECT MAX(id) FROM posts WHERE author_id = ?1")
            .bind(session.id)
            .fetch_one(&self.state.pool)
            .await
            .unwrap()
    }

    /// Inserts posts straight into the store, oldest first.
    pub async fn seed_posts(&self, author_id: i64, group_id: Option<i64>, count: usize) {
        for i in 0..count {
            sqlx::query(
                "INSERT INTO posts (text, pub_date, author_id, group_id)
                 VALUES (?1, datetime('now', ?2), ?3, ?4)",
            )
            .bind(format!("Seeded post {i}"))
            .bind(format!("-{} minutes", count - i))
            .bind(author_id)
            .bind(group_id)
            .execute(&self.state.pool)
            .await
            .unwrap();
        }
    }

    pub async fn count(&self, query: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.state.pool)
            .await
            .unwrap()
    }
}

pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with("yatube_session=") && *pair != "yatube_session=")
        .map(str::to_owned)
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Response is not a redirect")
        .to_str()
        .unwrap()
        .to_owned()
}

pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", next.replace('/', "%2F"))
}

pub fn count_posts_in_html(html: &str) -> usize {
    html.matches("<article class=\"post\">").count()
}
