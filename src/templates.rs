//! Fixed fallback templates.
//!
//! Two static pages live in the configured template directory: one for
//! unknown hosts and one for missing files.  Each read opens the file,
//! reads it fully and closes it, under a bounded timeout so a stalled
//! filesystem cannot wedge a request.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::TemplatesConfig;
use crate::errors::ProxyError;

/// Template shown when no deployment is bound to the hostname.
const HOST_NOT_FOUND: &str = "404-host_not_found.html";

/// Template shown when a tenant resource is missing.
const FILE_NOT_FOUND: &str = "404-file_not_found.html";

/// Reader for the fixed 404 templates.
pub struct TemplateStore {
    dir: PathBuf,
    read_timeout: Duration,
}

impl TemplateStore {
    pub fn new(config: &TemplatesConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            read_timeout: Duration::from_secs(config.read_timeout),
        }
    }

    /// The "host not found" page.
    pub async fn host_not_found(&self) -> Result<String, ProxyError> {
        self.read(HOST_NOT_FOUND).await
    }

    /// The default "file not found" page.
    pub async fn file_not_found(&self) -> Result<String, ProxyError> {
        self.read(FILE_NOT_FOUND).await
    }

    async fn read(&self, name: &str) -> Result<String, ProxyError> {
        let path = self.dir.join(name);
        let read = tokio::fs::read_to_string(&path);
        match tokio::time::timeout(self.read_timeout, read).await {
            Ok(Ok(contents)) => Ok(contents),
            Ok(Err(err)) => Err(ProxyError::Template {
                message: format!("{}: {err}", path.display()),
            }),
            Err(_) => Err(ProxyError::Template {
                message: format!("{}: read timed out", path.display()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_at(dir: &std::path::Path) -> TemplateStore {
        TemplateStore::new(&TemplatesConfig {
            dir: dir.to_string_lossy().into_owned(),
            read_timeout: 5,
        })
    }

    #[tokio::test]
    async fn reads_both_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(HOST_NOT_FOUND), "<h1>no host</h1>").unwrap();
        std::fs::write(dir.path().join(FILE_NOT_FOUND), "<h1>no file</h1>").unwrap();

        let store = store_at(dir.path());
        assert_eq!(store.host_not_found().await.unwrap(), "<h1>no host</h1>");
        assert_eq!(store.file_not_found().await.unwrap(), "<h1>no file</h1>");
    }

    #[tokio::test]
    async fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(dir.path());
        assert!(matches!(
            store.file_not_found().await,
            Err(ProxyError::Template { .. })
        ));
    }
}
