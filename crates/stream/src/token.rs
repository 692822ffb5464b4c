//! Bearer token sources.
//!
//! A token is requested fresh for every connect attempt and never cached
//! by this crate, since tokens expire between reconnects.

use std::path::PathBuf;

use async_trait::async_trait;

/// Supplies a current, non-expired bearer token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self) -> Result<String, TokenError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No credentials are available; the user must sign in again.
    #[error("No authentication token available")]
    Missing,

    /// The token source failed.
    #[error("Token source unavailable: {0}")]
    Unavailable(String),
}

/// A fixed token, for service accounts and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn get_token(&self) -> Result<String, TokenError> {
        if self.0.trim().is_empty() {
            return Err(TokenError::Missing);
        }
        Ok(self.0.clone())
    }
}

/// Reads the token from a file on every call, so an external refresher
/// can rotate it in place.
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenProvider for FileToken {
    async fn get_token(&self) -> Result<String, TokenError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TokenError::Missing
            } else {
                TokenError::Unavailable(format!("{}: {e}", self.path.display()))
            }
        })?;

        let token = raw.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_rejects_blank() {
        assert_eq!(StaticToken::new("abc").get_token().await, Ok("abc".into()));
        assert_eq!(StaticToken::new("  ").get_token().await, Err(TokenError::Missing));
    }

    #[tokio::test]
    async fn file_token_is_reread_on_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let provider = FileToken::new(&path);

        assert_eq!(provider.get_token().await, Err(TokenError::Missing));

        std::fs::write(&path, "first\n").unwrap();
        assert_eq!(provider.get_token().await, Ok("first".into()));

        std::fs::write(&path, "second").unwrap();
        assert_eq!(provider.get_token().await, Ok("second".into()));

        std::fs::write(&path, "\n").unwrap();
        assert_eq!(provider.get_token().await, Err(TokenError::Missing));
    }
}
