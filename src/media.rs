use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::{data_formats::Upload, errors::RequestError};

/// Uploaded post images, stored under `<root>/posts/`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

const UPLOAD_DIR: &str = "posts";
const MAX_ATTEMPTS: usize = 16;

impl MediaStore {
    pub async fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        fs::create_dir_all(root.join(UPLOAD_DIR)).await?;
        info!(path = %root.display(), "Media root initialized");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the upload and returns its path relative to the media root,
    /// e.g. `posts/cat.gif`. A taken name gets a random suffix.
    pub async fn save(&self, upload: &Upload) -> Result<String, RequestError> {
        let file_name = sanitize_file_name(&upload.file_name);
        let mut candidate = file_name.clone();
        for _ in 0..MAX_ATTEMPTS {
            let relative = format!("{UPLOAD_DIR}/{candidate}");
            let path = self.root.join(&relative);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&upload.data).await?;
                    file.flush().await?;
                    debug!(path = %relative, size = upload.data.len(), "Stored upload");
                    return Ok(relative);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = with_suffix(&file_name, &random_suffix());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RequestError::Storage(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("Could not find a free name for {file_name}"),
        )))
    }

    /// Deletes a stored upload by its relative path. Failures are logged.
    pub async fn remove(&self, relative: &str) {
        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => debug!(path = %relative, "Removed upload"),
            Err(e) => warn!(path = %relative, "Failed to remove upload: {}", e),
        }
    }
}

/// Keeps only the final path component and a conservative character set.
/// The stem and the extension are cleaned apart so a name written in
/// another script keeps its extension; an empty stem becomes random.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, extension)) => (stem, extension),
        None => (base, ""),
    };

    let stem = clean_component(stem);
    let stem = match stem.trim_start_matches('.') {
        "" => random_suffix(),
        kept => kept.to_owned(),
    };
    match clean_component(extension).to_ascii_lowercase().as_str() {
        "" => stem,
        extension => format!("{stem}.{extension}"),
    }
}

fn clean_component(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{file_name}_{suffix}"),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect()
}
