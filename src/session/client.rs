//! Cookie-carrying HTTP session against the EcoTaxa web interface.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, info, instrument};
use url::Url;

use super::error::SessionError;
use super::{CONNECT_TIMEOUT_SECS, DEFAULT_BASE_URL, READ_TIMEOUT_SECS};
use crate::markup;
use crate::user_agent::default_user_agent;

/// Login form and post target.
const LOGIN_PATH: &str = "/login";

/// Landing page checked for the logout link after login.
const HOME_PATH: &str = "/";

/// Connection settings for an [`EcotaxaSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Service root, e.g. `https://ecotaxa.obs-vlfr.fr`.
    pub base_url: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-read timeout in seconds (artifacts can be large).
    pub read_timeout_secs: u64,
    /// Accept invalid TLS certificates.
    pub accept_invalid_certs: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

impl SessionConfig {
    /// Creates a config for the given service root with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Enables or disables TLS certificate verification bypass.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Overrides the connect and read timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }
}

/// One authenticated session with the service.
///
/// The cookie store carries the login across requests, so a single session is
/// created per run and shared by reference with every component. It is never
/// used concurrently.
#[derive(Debug, Clone)]
pub struct EcotaxaSession {
    client: Client,
    base_url: Url,
}

impl EcotaxaSession {
    /// Builds a session (not yet logged in).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] for an unparseable or non-HTTP base
    /// URL and [`SessionError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| SessionError::invalid_url(config.base_url.clone()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(SessionError::invalid_url(config.base_url.clone()));
        }

        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .user_agent(default_user_agent())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(SessionError::ClientBuild)?;

        debug!(base_url = %base_url, insecure = config.accept_invalid_certs, "session client built");
        Ok(Self { client, base_url })
    }

    /// Returns the service root.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a site-absolute path (`/Task/listall`) against the service root.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base_url
            .join(path)
            .map_err(|_| SessionError::invalid_url(format!("{}{path}", self.base_url)))
    }

    /// Issues a GET and returns the response once its status is checked.
    ///
    /// # Errors
    ///
    /// Returns a network, timeout or HTTP status error.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, path: &str) -> Result<Response, SessionError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SessionError::from_reqwest(url.as_str(), e))?;
        check_status(response)
    }

    /// Fetches a page as text.
    ///
    /// # Errors
    ///
    /// Returns a network, timeout or HTTP status error.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_html(&self, path: &str) -> Result<String, SessionError> {
        let response = self.get(path).await?;
        let url = response.url().to_string();
        response
            .text()
            .await
            .map_err(|e| SessionError::from_reqwest(url, e))
    }

    /// Posts URL-encoded form fields and returns the resulting page as text.
    ///
    /// # Errors
    ///
    /// Returns a network, timeout or HTTP status error.
    #[instrument(level = "debug", skip(self, fields))]
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, String)],
    ) -> Result<String, SessionError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url.clone())
            .form(fields)
            .send()
            .await
            .map_err(|e| SessionError::from_reqwest(url.as_str(), e))?;
        let response = check_status(response)?;
        response
            .text()
            .await
            .map_err(|e| SessionError::from_reqwest(url.as_str(), e))
    }

    /// Logs in with the account email and password.
    ///
    /// Fetches the login form for its CSRF token, posts the credentials, then
    /// confirms the session by looking for the logout link on the landing page.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Authentication`] when the landing page shows no
    /// logout link, [`SessionError::MissingMarkup`] when the login form carries
    /// no token, or a transport error.
    #[instrument(skip_all, fields(user = %user))]
    pub async fn login(&self, user: &str, password: &str) -> Result<(), SessionError> {
        let login_url = self.endpoint(LOGIN_PATH)?;
        let form_page = self.get_html(LOGIN_PATH).await?;
        let token = markup::csrf_token(&form_page)
            .ok_or_else(|| SessionError::missing_markup(login_url.as_str(), "CSRF token"))?;

        info!("Attempting log-in");
        let credentials = [
            ("csrf_token", token),
            ("email", user.to_string()),
            ("next", String::new()),
            ("password", password.to_string()),
        ];
        self.post_form(LOGIN_PATH, &credentials).await?;

        let home = self.get_html(HOME_PATH).await?;
        if markup::has_logout_link(&home) {
            info!("Log-in successful");
            Ok(())
        } else {
            Err(SessionError::authentication(user))
        }
    }
}

fn check_status(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SessionError::http_status(
            response.url().as_str(),
            status.as_u16(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_rejects_unparseable_base_url() {
        let result = EcotaxaSession::new(&SessionConfig::new("not a url"));
        assert!(matches!(result, Err(SessionError::InvalidUrl { .. })));
    }

    #[test]
    fn test_session_rejects_non_http_scheme() {
        let result = EcotaxaSession::new(&SessionConfig::new("ftp://ecotaxa.example"));
        assert!(matches!(result, Err(SessionError::InvalidUrl { .. })));
    }

    #[test]
    fn test_endpoint_joins_site_absolute_paths() {
        let session = EcotaxaSession::new(&SessionConfig::new("https://ecotaxa.example")).unwrap();
        assert_eq!(
            session.endpoint("/Task/Show/101").unwrap().as_str(),
            "https://ecotaxa.example/Task/Show/101"
        );
        assert_eq!(
            session
                .endpoint("/Task/Create/TaskExportTxt?projid=5")
                .unwrap()
                .as_str(),
            "https://ecotaxa.example/Task/Create/TaskExportTxt?projid=5"
        );
    }

    #[test]
    fn test_default_config_points_at_public_instance() {
        let config = SessionConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(!config.accept_invalid_certs);
        let config = config.with_accept_invalid_certs(true).with_timeouts(5, 10);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.read_timeout_secs, 10);
    }
}
