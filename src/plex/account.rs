use colored::Colorize;
use error_stack::{IntoReport, Report, ResultExt};
use reqwest::{Client, StatusCode};

use crate::plex::models::{PlexTvErrors, PlexUser, Resource};
use crate::plex::server::PlexServer;
use crate::plex::{build_client, PlexError, PlexResult};

/// plex.tv answers a sign-in without the one-time code with this error code.
const VERIFICATION_CODE_REQUIRED: u32 = 1029;

/// Client for the plex.tv account API.
#[derive(Debug, Clone)]
pub struct PlexTv {
    base_url: String,
    client_identifier: String,
    client: Client,
}

#[derive(Debug)]
pub enum SignIn {
    Authenticated(PlexAccount),
    InvalidCredentials(String),
    VerificationCodeRequired,
}

#[derive(Debug, Clone)]
pub struct PlexAccount {
    pub username: String,
    pub token: String,
    tv: PlexTv,
}

impl PlexTv {
    pub const BASE_URL: &'static str = "https://plex.tv";

    pub fn new(client_identifier: &str) -> PlexResult<Self> {
        Self::with_base_url(Self::BASE_URL, client_identifier)
    }

    pub fn with_base_url(base_url: &str, client_identifier: &str) -> PlexResult<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_identifier: client_identifier.to_string(),
            client: build_client(client_identifier, None)?,
        })
    }

    /// Exchanges username and password (plus an optional one-time code) for an account token.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        verification_code: Option<&str>,
    ) -> PlexResult<SignIn> {
        let mut form = vec![
            ("login", username),
            ("password", password),
            ("rememberMe", "true"),
        ];
        if let Some(code) = verification_code {
            form.push(("verificationCode", code));
        }
        let url = format!("{}/api/v2/users/signin", self.base_url);
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .into_report()
            .attach_printable("Failed to reach plex.tv")
            .change_context(PlexError)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let errors = response
                .json::<PlexTvErrors>()
                .await
                .map(|body| body.errors)
                .unwrap_or_default();
            if errors
                .iter()
                .any(|error| error.code == VERIFICATION_CODE_REQUIRED)
            {
                return Ok(SignIn::VerificationCodeRequired);
            }
            let message = errors
                .into_iter()
                .map(|error| error.message)
                .find(|message| !message.is_empty())
                .unwrap_or_else(|| "Invalid email, username, or password".to_string());
            return Ok(SignIn::InvalidCredentials(message));
        }

        let user = response
            .error_for_status()
            .into_report()
            .change_context(PlexError)?
            .json::<PlexUser>()
            .await
            .into_report()
            .attach_printable("Unexpected sign-in response from plex.tv")
            .change_context(PlexError)?;
        Ok(SignIn::Authenticated(PlexAccount::new(user, self.clone())))
    }

    /// Validates a stored token. Returns `None` when plex.tv rejects it.
    pub async fn account_from_token(&self, token: &str) -> PlexResult<Option<PlexAccount>> {
        let url = format!("{}/api/v2/user", self.base_url);
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header("X-Plex-Token", token)
            .send()
            .await
            .into_report()
            .attach_printable("Failed to reach plex.tv")
            .change_context(PlexError)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let user = response
            .error_for_status()
            .into_report()
            .change_context(PlexError)?
            .json::<PlexUser>()
            .await
            .into_report()
            .attach_printable("Unexpected user response from plex.tv")
            .change_context(PlexError)?;
        Ok(Some(PlexAccount::new(user, self.clone())))
    }
}

impl PlexAccount {
    fn new(user: PlexUser, tv: PlexTv) -> Self {
        Self {
            username: user.username,
            token: user.auth_token,
            tv,
        }
    }

    /// Plex Media Servers connected to this account.
    pub async fn resources(&self) -> PlexResult<Vec<Resource>> {
        let url = format!("{}/api/v2/resources", self.tv.base_url);
        log::debug!("GET {}", url);
        let resources = self
            .tv
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .query(&[("includeHttps", "1"), ("includeRelay", "1")])
            .send()
            .await
            .into_report()
            .attach_printable("Failed to reach plex.tv")
            .change_context(PlexError)?
            .error_for_status()
            .into_report()
            .change_context(PlexError)?
            .json::<Vec<Resource>>()
            .await
            .into_report()
            .attach_printable("Unexpected resources response from plex.tv")
            .change_context(PlexError)?;
        Ok(resources
            .into_iter()
            .filter(Resource::is_media_server)
            .collect())
    }

    /// Tries every connection of `resource` and returns the first server that answers.
    pub async fn connect(&self, resource: &Resource) -> PlexResult<PlexServer> {
        let token = resource.access_token.as_deref().unwrap_or(&self.token);
        for connection in resource.ordered_connections() {
            match PlexServer::connect(
                resource.name.clone(),
                &connection.uri,
                token,
                &self.tv.client_identifier,
            )
            .await
            {
                Ok(server) => {
                    log::debug!("Connected to {} via {}", resource.name, connection.uri);
                    return Ok(server);
                }
                Err(report) => {
                    log::warn!("Connection {} failed: {:?}", connection.uri, report);
                }
            }
        }
        Err(Report::new(PlexError).attach_printable(format!(
            "Unable to connect to {}",
            resource.name.clone().red()
        )))
    }
}
