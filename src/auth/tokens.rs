use crate::foundation::error::{PlacerError, PlacerResult};

/// A session identifier (the `reddit_session` cookie value) for one account.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie(String);

impl SessionCookie {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCookie(..)")
    }
}

/// Opaque bearer token used for placement and tile lookups.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters, for log lines.
    pub fn redacted(&self) -> String {
        let head: String = self.0.chars().take(6).collect();
        format!("{head}…")
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken({})", self.redacted())
    }
}

/// Split the `;`-separated session list given on the command line or in the environment.
pub fn parse_sessions(raw: &str) -> Vec<SessionCookie> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SessionCookie::new)
        .collect()
}

/// Exchanges a session for an access token.
pub trait TokenSource: Send + Sync {
    fn access_token(&self, session: &SessionCookie) -> PlacerResult<AccessToken>;
}

/// Scrapes the access token embedded in the place page.
pub struct RedditTokenSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl RedditTokenSource {
    pub fn new(url: impl Into<String>, user_agent: &str) -> PlacerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PlacerError::transport(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl TokenSource for RedditTokenSource {
    fn access_token(&self, session: &SessionCookie) -> PlacerResult<AccessToken> {
        let body = self
            .client
            .get(&self.url)
            .header(
                reqwest::header::COOKIE,
                format!("reddit_session={}", session.as_str()),
            )
            .send()
            .and_then(|r| r.text())
            .map_err(|e| PlacerError::transport(format!("fetch token page: {e}")))?;
        extract_access_token(&body)
    }
}

/// Pull the `"accessToken":"…"` value out of a page body.
pub fn extract_access_token(body: &str) -> PlacerResult<AccessToken> {
    const MARKER: &str = "\"accessToken\":\"";
    let start = body
        .find(MARKER)
        .map(|i| i + MARKER.len())
        .ok_or_else(|| PlacerError::auth("no access token in page; is the session cookie valid?"))?;
    let rest = &body[start..];
    let end = rest
        .find('"')
        .ok_or_else(|| PlacerError::protocol("unterminated access token in page"))?;
    if end == 0 {
        return Err(PlacerError::auth("empty access token in page"));
    }
    Ok(AccessToken::new(&rest[..end]))
}

#[cfg(test)]
#[path = "../../tests/unit/auth/tokens.rs"]
mod tests;
