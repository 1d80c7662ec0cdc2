//! Route matching logic.
//!
//! # Responsibilities
//! - Match request method
//! - Match request URL against a fixed set (the precache manifest)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - URL matching is exact on the cache key (fragment ignored)
//! - Empty AND matcher = always matches (wildcard)
//! - No regex; set membership is O(1)

use std::collections::HashSet;

use axum::http::Method;
use url::Url;

use crate::fetch::request::{cache_key_for, CacheRequest};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &CacheRequest) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &CacheRequest) -> bool {
        req.method == self.method
    }
}

/// Matches requests whose URL is one of a fixed set.
#[derive(Debug, Clone, Default)]
pub struct UrlSetMatcher {
    urls: HashSet<String>,
}

impl UrlSetMatcher {
    pub fn new<'a>(urls: impl IntoIterator<Item = &'a Url>) -> Self {
        Self {
            urls: urls.into_iter().map(cache_key_for).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl Matcher for UrlSetMatcher {
    fn matches(&self, req: &CacheRequest) -> bool {
        self.urls.contains(&req.cache_key())
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &CacheRequest) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}

/// GET requests for one of the given (precached) URLs.
pub fn precache_matcher<'a>(urls: impl IntoIterator<Item = &'a Url>) -> AndMatcher {
    AndMatcher::new(vec![
        Box::new(MethodMatcher::get()),
        Box::new(UrlSetMatcher::new(urls)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Credentials;

    fn get(url: &str) -> CacheRequest {
        CacheRequest::get(Url::parse(url).unwrap(), Credentials::SameOrigin)
    }

    #[test]
    fn test_method_matcher() {
        let matcher = MethodMatcher::get();
        let mut req = get("http://localhost/index.html");
        assert!(matcher.matches(&req));

        req.method = Method::POST;
        assert!(!matcher.matches(&req));
    }

    #[test]
    fn test_url_set_matcher() {
        let urls = [
            Url::parse("http://localhost/index.html").unwrap(),
            Url::parse("http://localhost/assets/app.js").unwrap(),
        ];
        let matcher = UrlSetMatcher::new(&urls);
        assert_eq!(matcher.len(), 2);

        assert!(matcher.matches(&get("http://localhost/assets/app.js")));
        assert!(matcher.matches(&get("http://localhost/index.html#section")));
        assert!(!matcher.matches(&get("http://localhost/assets/app.js?v=2")));
        assert!(!matcher.matches(&get("http://localhost/api/data")));
    }

    #[test]
    fn test_precache_matcher_requires_get() {
        let urls = [Url::parse("http://localhost/index.html").unwrap()];
        let matcher = precache_matcher(&urls);

        let mut req = get("http://localhost/index.html");
        assert!(matcher.matches(&req));
        req.method = Method::PUT;
        assert!(!matcher.matches(&req));
    }

    #[test]
    fn test_empty_and_matches_everything() {
        assert!(AndMatcher::new(Vec::new()).matches(&get("http://localhost/x")));
    }
}
