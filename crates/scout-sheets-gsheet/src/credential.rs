//! Opaque credential sources.
//!
//! Obtaining and refreshing tokens (service accounts, OAuth flows) is
//! outside this crate. The client only needs something that can hand it a
//! bearer token for the Authorization header.

use std::path::Path;

use crate::error::{GSheetError, GSheetResult};

/// A source of bearer tokens for the spreadsheet service
pub trait CredentialProvider {
    /// A token valid for the next request
    fn bearer_token(&self) -> GSheetResult<String>;
}

/// A fixed bearer token
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token string
    pub fn new<S: Into<String>>(token: S) -> Self {
        StaticToken(token.into())
    }

    /// Read a token from a file, trimming surrounding whitespace
    pub fn from_file<P: AsRef<Path>>(path: P) -> GSheetResult<Self> {
        let token = std::fs::read_to_string(path)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(GSheetError::Credential("token file is empty".into()));
        }
        Ok(StaticToken(token.to_string()))
    }

    /// Read a token from an environment variable
    pub fn from_env(var: &str) -> GSheetResult<Self> {
        std::env::var(var)
            .map(StaticToken)
            .map_err(|_| GSheetError::Credential(format!("environment variable {var} not set")))
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> GSheetResult<String> {
        Ok(self.0.clone())
    }
}
