//! Acquisition and storage of downloaded documents.
//!
//! Documents live in one flat artifact directory, named after the sanitized
//! paper title. The directory is created on first use.

use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::sources::SourceError;
use crate::utils::{
    ensure_success, format_filename, validate_url, HttpClient, ValidationError,
    DOCUMENT_EXTENSION,
};

/// Message reported in place of an empty listing
pub const EMPTY_LISTING: &str = "No downloaded papers found";

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Download failed: {0}")]
    Download(#[from] SourceError),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Stored document names, or the explicit "nothing stored" sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactListing {
    Empty,
    Files(Vec<String>),
}

impl ArtifactListing {
    pub fn names(&self) -> &[String] {
        match self {
            ArtifactListing::Empty => &[],
            ArtifactListing::Files(names) => names,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ArtifactListing::Empty)
    }
}

impl Serialize for ArtifactListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArtifactListing::Empty => serializer.serialize_str(EMPTY_LISTING),
            ArtifactListing::Files(names) => names.serialize(serializer),
        }
    }
}

/// Flat directory of downloaded documents
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    client: HttpClient,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, client: HttpClient) -> Self {
        Self {
            dir: dir.into(),
            client,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))
    }

    /// Download `url` and store it under the name derived from `title`.
    ///
    /// Both inputs are validated before any request is made. Returns the stored
    /// file name, relative to the artifact directory. An existing file with the
    /// same name is replaced.
    pub async fn download(&self, title: &str, url: &str) -> Result<String, StorageError> {
        let url = validate_url(url)?;
        let name = format_filename(title)?;

        tracing::debug!("Downloading {} as {}", url, name);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(SourceError::from)?;
        let bytes = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(SourceError::from)?;

        self.ensure_dir().await?;

        // write aside, then rename over the target
        let target = self.dir.join(&name);
        let part = self.dir.join(format!(
            ".{}.{}-{}.part",
            name,
            std::process::id(),
            PART_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        tokio::fs::write(&part, &bytes)
            .await
            .map_err(|e| StorageError::io(&part, e))?;
        if let Err(e) = tokio::fs::rename(&part, &target).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(StorageError::io(&target, e));
        }

        tracing::info!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(name)
    }

    /// Every stored document, sorted by name
    pub async fn list(&self) -> Result<ArtifactListing, StorageError> {
        self.ensure_dir().await?;

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?
        {
            let path = entry.path();
            let is_document = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION));
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);

            if is_document && is_file {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }

        if names.is_empty() {
            return Ok(ArtifactListing::Empty);
        }
        names.sort();
        Ok(ArtifactListing::Files(names))
    }

    /// Locate a document given as an absolute path, a path relative to the
    /// working directory, or a name relative to the artifact directory.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, StorageError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::EmptyPath.into());
        }

        let given = Path::new(raw);
        let mut candidates = Vec::with_capacity(2);
        if given.is_absolute() {
            candidates.push(given.to_path_buf());
        } else {
            candidates.push(given.to_path_buf());
            candidates.push(self.dir.join(given));
        }

        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| StorageError::NotFound(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::utils::{FORBIDDEN_FILENAME_CHARS, MAX_TITLE_CHARS};

    fn store(dir: &Path) -> ArtifactStore {
        ArtifactStore::new(dir, HttpClient::new(&HttpConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_download_then_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/paper.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 fake")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let store = store(&data_dir);

        let title = "Q: Is <Attention>/All \"You\" Need?";
        let name = store
            .download(title, &format!("{}/paper.pdf", server.url()))
            .await
            .unwrap();

        assert_eq!(name, "Q_ Is _Attention__All _You_ Need_.pdf");
        assert!(!name.contains(FORBIDDEN_FILENAME_CHARS));
        assert_eq!(std::fs::read(data_dir.join(&name)).unwrap(), b"%PDF-1.4 fake");

        let listing = store.list().await.unwrap();
        assert_eq!(listing, ArtifactListing::Files(vec![name]));
    }

    #[tokio::test]
    async fn test_long_title_is_truncated() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/long.pdf")
            .with_status(200)
            .with_body("x")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let name = store
            .download(&"a".repeat(300), &format!("{}/long.pdf", server.url()))
            .await
            .unwrap();

        assert_eq!(name.chars().count(), MAX_TITLE_CHARS + 4);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("never-created");
        let store = store(&data_dir);

        let err = store.download("title", "ftp://example.org/a.pdf").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::InvalidUrl(_))
        ));

        let err = store.download("  ", "https://example.org/a.pdf").await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(ValidationError::EmptyTitle)));

        assert!(!data_dir.exists());
    }

    #[tokio::test]
    async fn test_failed_download_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone.pdf")
            .with_status(404)
            .with_body("not here")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let err = store
            .download("Gone", &format!("{}/gone.pdf", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Download(SourceError::Status { code: 404, .. })
        ));
        assert_eq!(store.list().await.unwrap(), ArtifactListing::Empty);
    }

    #[tokio::test]
    async fn test_empty_listing_is_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let store = store(&data_dir);

        let listing = store.list().await.unwrap();
        assert!(listing.is_empty());
        assert!(data_dir.is_dir());
        assert_eq!(
            serde_json::to_value(&listing).unwrap(),
            serde_json::json!(EMPTY_LISTING)
        );
    }

    #[tokio::test]
    async fn test_listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("A.PDF"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let listing = store(dir.path()).list().await.unwrap();
        assert_eq!(listing.names(), ["A.PDF", "b.pdf"]);
        assert_eq!(
            serde_json::to_value(&listing).unwrap(),
            serde_json::json!(["A.PDF", "b.pdf"])
        );
    }

    #[test]
    fn test_resolve_order() {
        let dir = tempfile::tempdir().unwrap();
        let stored = dir.path().join("stored.pdf");
        std::fs::write(&stored, b"").unwrap();
        let store = store(dir.path());

        assert_eq!(store.resolve("stored.pdf").unwrap(), stored);
        assert_eq!(store.resolve(stored.to_str().unwrap()).unwrap(), stored);
        assert!(matches!(
            store.resolve("missing.pdf"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.resolve(" "),
            Err(StorageError::Validation(ValidationError::EmptyPath))
        ));
    }
}
