//! Request sessions.
//!
//! Authentication happens upstream: an OAuth proxy in front of the server
//! forwards the signed-in user's email and name as request headers. A
//! request carrying an email is authenticated. Admin status comes from a
//! configured allow-list.

use std::collections::HashSet;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::Serialize;

use crate::AppState;
use crate::config::AuthConfig;
use crate::error::ApiError;

/// Emails allowed to write, lowercased.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: HashSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }
}

/// Who is making the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl Session {
    /// Build a session from the proxy headers.
    pub fn from_headers(headers: &HeaderMap, auth: &AuthConfig, admins: &AdminAllowList) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let Some(email) = header(&auth.email_header) else {
            return Self::default();
        };

        Self {
            is_authenticated: true,
            user_name: header(&auth.user_header),
            is_admin: admins.is_admin(&email),
            email: Some(email),
        }
    }

    pub fn require_auth(&self) -> Result<(), ApiError> {
        if self.is_authenticated {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        self.require_auth()?;
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Name recorded in audit fields.
    pub fn author(&self) -> Option<&str> {
        self.email.as_deref().or(self.user_name.as_deref())
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(
            &parts.headers,
            &state.config.auth,
            &state.admins,
        ))
    }
}
