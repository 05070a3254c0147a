//! Caller identity
//!
//! The app runs behind a reverse proxy that authenticates users and
//! forwards who they are in request headers. [`IdentityProvider`] is the
//! seam; [`ForwardedHeaders`] is the shipped implementation.

use crate::config::AuthConfig;
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Debug;

pub const EMAIL_HEADER: &str = "x-forwarded-email";
pub const PREFERRED_USERNAME_HEADER: &str = "x-forwarded-preferred-username";
pub const USER_HEADER: &str = "x-forwarded-user";
pub const GROUPS_HEADER: &str = "x-forwarded-groups";

/// Username reported when the proxy forwarded nothing
pub const ANONYMOUS: &str = "anonymous";

/// Who is calling, as returned by `/api/user-info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub groups: Vec<String>,
}

/// Resolves the caller from request headers
#[async_trait]
pub trait IdentityProvider: Send + Sync + Debug {
    async fn identify(&self, headers: &HeaderMap) -> UserInfo;
}

/// Reads reverse-proxy forwarded headers; admins come from configuration
#[derive(Debug, Clone, Default)]
pub struct ForwardedHeaders {
    admin_users: HashSet<String>,
    admin_groups: HashSet<String>,
}

impl ForwardedHeaders {
    #[must_use]
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            admin_users: auth.admin_users.iter().map(|u| u.to_lowercase()).collect(),
            admin_groups: auth.admin_groups.iter().map(|g| g.to_lowercase()).collect(),
        }
    }

    fn is_admin(&self, username: &str, email: Option<&str>, groups: &[String]) -> bool {
        let named = |name: &str| self.admin_users.contains(&name.to_lowercase());
        named(username)
            || email.is_some_and(named)
            || groups
                .iter()
                .any(|group| self.admin_groups.contains(&group.to_lowercase()))
    }
}

#[async_trait]
impl IdentityProvider for ForwardedHeaders {
    async fn identify(&self, headers: &HeaderMap) -> UserInfo {
        let email = header(headers, EMAIL_HEADER);
        let username = header(headers, PREFERRED_USERNAME_HEADER)
            .or_else(|| header(headers, USER_HEADER))
            .or_else(|| email.clone())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        let groups: Vec<String> = header(headers, GROUPS_HEADER)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let is_admin = self.is_admin(&username, email.as_deref(), &groups);

        UserInfo {
            username,
            email,
            is_admin,
            groups,
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn provider() -> ForwardedHeaders {
        ForwardedHeaders::new(&AuthConfig {
            require_admin_for_writes: true,
            admin_users: vec!["Steward@Example.com".to_string()],
            admin_groups: vec!["catalog-admins".to_string()],
        })
    }

    #[tokio::test]
    async fn anonymous_without_headers() {
        let user = provider().identify(&HeaderMap::new()).await;
        assert_eq!(user.username, ANONYMOUS);
        assert_eq!(user.email, None);
        assert!(!user.is_admin);
        assert!(user.groups.is_empty());
    }

    #[tokio::test]
    async fn preferred_username_wins() {
        let user = provider()
            .identify(&headers(&[
                (EMAIL_HEADER, "jo@example.com"),
                (USER_HEADER, "jo-id"),
                (PREFERRED_USERNAME_HEADER, "jo"),
            ]))
            .await;
        assert_eq!(user.username, "jo");
        assert_eq!(user.email.as_deref(), Some("jo@example.com"));
    }

    #[tokio::test]
    async fn admin_by_email_case_insensitive() {
        let user = provider()
            .identify(&headers(&[(EMAIL_HEADER, "steward@example.com")]))
            .await;
        assert_eq!(user.username, "steward@example.com");
        assert!(user.is_admin);
    }

    #[tokio::test]
    async fn admin_by_group() {
        let user = provider()
            .identify(&headers(&[
                (USER_HEADER, "sam"),
                (GROUPS_HEADER, "readers, Catalog-Admins"),
            ]))
            .await;
        assert_eq!(user.groups, vec!["readers".to_string(), "Catalog-Admins".to_string()]);
        assert!(user.is_admin);
    }
}
