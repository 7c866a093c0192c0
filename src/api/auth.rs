use super::ApiError;

/// Supplies the bearer credential attached to every request.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String, ApiError>;
}

/// Token handed in up front (CLI flag or environment).
#[derive(Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the credential itself.
        let shown = if self.0.is_some() { "<set>" } else { "<unset>" };
        f.debug_tuple("StaticToken").field(&shown).finish()
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Result<String, ApiError> {
        self.0.clone().ok_or_else(|| {
            ApiError::Auth("no API token configured (use --token or LEADGEN_API_TOKEN)".into())
        })
    }
}
