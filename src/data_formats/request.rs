use axum::extract::Multipart;
use serde::Deserialize;

use crate::errors::RequestError;

use super::{FormErrors, NON_FIELD};

const IMAGE_EXTENSIONS: [&str; 6] = ["gif", "jpg", "jpeg", "png", "webp", "bmp"];
const GROUP_TITLE_MAX: usize = 200;
const USERNAME_MAX: usize = 150;
const PASSWORD_MIN: usize = 8;

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

// ----------------- Post Form -----------------

/// A file part of a multipart submission.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Upload {
    fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Raw post form as submitted; every field is still untrusted text.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: Option<Upload>,
}

#[derive(Debug)]
pub struct ValidPost {
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<Upload>,
}

impl PostForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, RequestError> {
        let mut form = PostForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RequestError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "text" => form.text = read_text(field).await?,
                "group" => form.group = read_text(field).await?,
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let content_type = field.content_type().map(str::to_owned);
                    let data = field.bytes().await.map_err(|e| {
                        RequestError::BadRequest(format!("Failed to read field: {}", e))
                    })?;
                    // Browsers send an empty, unnamed part when no file was picked.
                    if !file_name.is_empty() {
                        form.image = Some(Upload {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    pub fn validate(self) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();

        let text = self.text.trim().to_owned();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        if let Some(image) = &self.image {
            if let Err(message) = validate_image(image) {
                errors.add("image", message);
            }
        }

        errors.into_result(ValidPost {
            text,
            group,
            image: self.image,
        })
    }
}

fn validate_image(image: &Upload) -> Result<(), &'static str> {
    if image.data.is_empty() {
        return Err("The submitted file is empty.");
    }
    let is_image_type = image
        .content_type
        .as_deref()
        .map_or(true, |mime| mime.starts_with("image/"));
    let has_image_extension = image
        .extension()
        .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
    if !is_image_type || !has_image_extension {
        return Err("Upload a valid image. The file you uploaded was either not an image or a corrupted image.");
    }
    Ok(())
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, RequestError> {
    field
        .text()
        .await
        .map_err(|e| RequestError::BadRequest(format!("Failed to read field: {}", e)))
}

// ----------------- Comment Form -----------------

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(self) -> Result<String, FormErrors> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(FormErrors::single("text", REQUIRED));
        }
        Ok(text)
    }
}

// ----------------- Group Form -----------------

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct GroupForm {
    pub title: String,
    pub description: String,
}

#[derive(Debug)]
pub struct ValidGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupForm {
    pub fn validate(&self) -> Result<ValidGroup, FormErrors> {
        let mut errors = FormErrors::new();

        let title = self.title.trim().to_owned();
        let slug = slugify(&title);
        if title.is_empty() {
            errors.add("title", REQUIRED);
        } else if title.chars().count() > GROUP_TITLE_MAX {
            errors.add(
                "title",
                "Ensure this value has at most 200 characters.",
            );
        } else if slug.is_empty() {
            errors.add("title", "The title must contain at least one letter or digit.");
        }

        let description = self.description.trim().to_owned();
        if description.is_empty() {
            errors.add("description", REQUIRED);
        }

        errors.into_result(ValidGroup {
            title,
            slug,
            description,
        })
    }
}

/// Lowercases the title and joins its words with single hyphens, dropping
/// punctuation. Non-ASCII letters are kept.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }
    slug
}

// ----------------- User Forms -----------------

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(self) -> Result<SignupForm, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim().to_owned();
        if let Err(message) = validate_username(&username) {
            errors.add("username", message);
        }

        let email = self.email.trim().to_owned();
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        } else if self.password.chars().count() < PASSWORD_MIN {
            errors.add(
                "password",
                "This password is too short. It must contain at least 8 characters.",
            );
        }

        errors.into_result(SignupForm {
            username,
            email,
            password: self.password,
        })
    }
}

fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err(REQUIRED);
    }
    if username.chars().count() > USERNAME_MAX {
        return Err("Ensure this value has at most 150 characters.");
    }
    let allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);
    if !username.chars().all(allowed) {
        return Err("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.");
    }
    Ok(())
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }

    pub fn invalid_credentials() -> FormErrors {
        FormErrors::single(
            NON_FIELD,
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        )
    }
}

/// Only same-site paths are followed after login.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_owned()
        }
        _ => "/".to_owned(),
    }
}
