// Cookie/session storage shared across one workflow run

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use std::sync::Arc;

/// Session store (cookie jar) shared by every check of a workflow run.
///
/// HTTP checks plug it into their client with
/// `reqwest::Client::builder().cookie_provider(ctx.session().jar())`.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    jar: Arc<Jar>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Record a `Set-Cookie` style string as if received from `url`.
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        self.jar.add_cookie_str(cookie, url);
    }

    /// `Cookie` header value that would be sent to `url`.
    pub fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }

    pub fn shares_jar_with(&self, other: &SessionStore) -> bool {
        Arc::ptr_eq(&self.jar, &other.jar)
    }
}
