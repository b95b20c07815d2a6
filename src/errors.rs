use askama::Template;
use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::data_formats::{ForbiddenPage, Layout, NotFoundPage, ServerErrorPage};

pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Not Found")]
    NotFound,
    #[error("Forbidden")]
    Forbidden,
    #[error("Login required to access {next}")]
    LoginRequired { next: String },
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal Server Error")]
    ServerError,
    #[error("Media storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl RequestError {
    /// True when the database rejected a write on a `UNIQUE` constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => {
                e.message().contains("UNIQUE constraint failed")
            }
            _ => false,
        }
    }
}

/// Where an anonymous visitor is sent, with `next` pointing back at the
/// page they asked for.
pub fn login_redirect_target(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("{LOGIN_URL}?{query}"),
        Err(_) => LOGIN_URL.to_string(),
    }
}

pub fn not_found_response(path: Option<String>) -> Response {
    render_error_page(StatusCode::NOT_FOUND, NotFoundPage::new(path))
}

/// Tags 404 responses raised by handlers, which do not know the path.
#[derive(Debug, Clone, Copy)]
struct MissingPage;

/// Re-renders handler 404s with the requested path filled in.
pub async fn not_found_with_path<B>(req: Request<B>, next: Next<B>) -> Response {
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;
    if response.extensions().get::<MissingPage>().is_some() {
        return not_found_response(Some(path));
    }
    response
}

fn render_error_page<T: Template>(status: StatusCode, page: T) -> Response {
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            error!("Failed to render {} page: {}", status, e);
            (status, status.to_string()).into_response()
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        match self {
            RequestError::NotFound => {
                let mut response = not_found_response(None);
                response.extensions_mut().insert(MissingPage);
                response
            }
            RequestError::Forbidden => render_error_page(
                StatusCode::FORBIDDEN,
                ForbiddenPage {
                    layout: Layout::anonymous(),
                },
            ),
            RequestError::LoginRequired { next } => {
                Redirect::to(&login_redirect_target(&next)).into_response()
            }
            RequestError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            other => {
                error!("{}", other);
                render_error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ServerErrorPage {
                        layout: Layout::anonymous(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_keeps_next() {
        assert_eq!(
            login_redirect_target("/create/"),
            "/auth/login/?next=%2Fcreate%2F"
        );
        assert_eq!(
            login_redirect_target("/follow/?page=2"),
            "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2"
        );
    }

    #[test]
    fn test_handler_not_found_is_tagged_for_path() {
        let response = RequestError::NotFound.into_response();
        assert!(response.extensions().get::<MissingPage>().is_some());
        assert!(not_found_response(Some("/x/".into()))
            .extensions()
            .get::<MissingPage>()
            .is_none());
    }

    #[test]
    fn test_statuses() {
        assert_eq!(
            RequestError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RequestError::ServerError.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let redirect = RequestError::LoginRequired {
            next: "/create/".into(),
        }
        .into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
    }
}
