//! Relational resolver backend.
//!
//! Looks up the most recent successful deployment for a hostname with a
//! single query joining builds, deploys and environments.  Uses
//! `rusqlite` with the `bundled` feature; the synchronous connection
//! sits under a `Mutex` and trait methods are thin wrappers around it.
//!
//! This backend yields `path` only; knowing nothing about custom 404
//! pages, it leaves `custom_404` at its default.

use rusqlite::{Connection, OptionalExtension};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use tracing::debug;

use super::{HostConfig, Resolver};
use crate::errors::ProxyError;

/// Most recent successful deployment for an environment URL.
const RESOLVE_QUERY: &str = "
    SELECT b.path
    FROM environments e
    JOIN deploys d ON d.environment_id = e.id
    JOIN builds b  ON b.id = d.build_id
    WHERE e.url = ?1 AND b.status = 'success'
    ORDER BY d.deployed_at DESC
    LIMIT 1
";

/// Resolver backed by the deployments database.
pub struct DatabaseResolver {
    conn: Mutex<Connection>,
}

impl DatabaseResolver {
    /// Open the database at `path`.
    ///
    /// Passing `":memory:"` creates an in-memory database (useful for
    /// tests).
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lookup(&self, hostname: &str) -> Result<Option<HostConfig>, ProxyError> {
        let conn = self.conn.lock().expect("mutex poisoned");

        let path: Option<String> = conn
            .query_row(RESOLVE_QUERY, [hostname], |row| row.get(0))
            .optional()
            .map_err(|e| ProxyError::Internal(anyhow::anyhow!("deployment query failed: {e}")))?;

        match path {
            Some(path) => {
                debug!(hostname, path, "resolved via database");
                Ok(Some(HostConfig::with_path(path)))
            }
            None => {
                debug!(hostname, "no deployment found in database");
                Ok(None)
            }
        }
    }
}

impl Resolver for DatabaseResolver {
    fn resolve(
        &self,
        hostname: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>> {
        let hostname = hostname.to_string();
        Box::pin(async move { self.lookup(&hostname) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_resolver() -> DatabaseResolver {
        let resolver = DatabaseResolver::new(":memory:").unwrap();
        {
            let conn = resolver.conn.lock().unwrap();
            conn.execute_batch(
                "
                CREATE TABLE builds (
                    id      INTEGER PRIMARY KEY,
                    path    TEXT NOT NULL,
                    status  TEXT NOT NULL
                );
                CREATE TABLE environments (
                    id   INTEGER PRIMARY KEY,
                    url  TEXT NOT NULL
                );
                CREATE TABLE deploys (
                    id              INTEGER PRIMARY KEY,
                    build_id        INTEGER NOT NULL REFERENCES builds(id),
                    environment_id  INTEGER NOT NULL REFERENCES environments(id),
                    deployed_at     TEXT NOT NULL
                );

                INSERT INTO environments (id, url) VALUES (1, 'example.com');
                INSERT INTO builds (id, path, status) VALUES
                    (1, '/old',    'success'),
                    (2, '/newer',  'success'),
                    (3, '/broken', 'failed');
                INSERT INTO deploys (build_id, environment_id, deployed_at) VALUES
                    (1, 1, '2026-01-01T00:00:00Z'),
                    (2, 1, '2026-06-01T00:00:00Z'),
                    (3, 1, '2026-07-01T00:00:00Z');
                ",
            )
            .unwrap();
        }
        resolver
    }

    #[tokio::test]
    async fn returns_most_recent_successful_deploy() {
        let resolver = seeded_resolver();
        let config = resolver.resolve("example.com").await.unwrap().unwrap();
        // The failed build deployed later must be skipped.
        assert_eq!(config.path.as_deref(), Some("/newer"));
        assert!(config.custom_404);
    }

    #[tokio::test]
    async fn unknown_hostname_yields_none() {
        let resolver = seeded_resolver();
        let result = resolver.resolve("nobody.example.net").await.unwrap();
        assert!(result.is_none());
    }
}
