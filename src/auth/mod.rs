use std::fmt;

use colored::Colorize;
use error_stack::ResultExt;

use crate::config::AuthConfig;
use crate::dialoguer::Dialoguer;
use crate::plex::account::{PlexAccount, PlexTv, SignIn};

#[derive(Debug)]
pub struct AuthError;

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Authentication error")
    }
}

impl std::error::Error for AuthError {}

pub type AuthResult<T> = error_stack::Result<T, AuthError>;

/// Questions asked while logging in.
pub trait LoginPrompt {
    /// Username and password.
    fn credentials(&mut self) -> AuthResult<(String, String)>;

    fn verification_code(&mut self) -> AuthResult<String>;

    /// Asked once the account token has been shown.
    fn proceed(&mut self) -> AuthResult<bool>;
}

pub struct DialoguerPrompt;

impl LoginPrompt for DialoguerPrompt {
    fn credentials(&mut self) -> AuthResult<(String, String)> {
        println!("Please provide your login credentials for your Plex account.");
        let username = Dialoguer::input("Username".to_string()).change_context(AuthError)?;
        let password = Dialoguer::password("Password (will not be echoed)".to_string())
            .change_context(AuthError)?;
        Ok((username, password))
    }

    fn verification_code(&mut self) -> AuthResult<String> {
        Dialoguer::input("Verification code".to_string()).change_context(AuthError)
    }

    fn proceed(&mut self) -> AuthResult<bool> {
        Dialoguer::select_yes_or_no("Do you want to proceed?".to_string(), true)
            .change_context(AuthError)
    }
}

/// Logs into plex.tv with the stored token, the stored credentials or the
/// credentials typed by the user, in that order.
///
/// Returns `None` when the user declines to proceed after a password login.
pub async fn login<P: LoginPrompt>(
    tv: &PlexTv,
    config: &AuthConfig,
    prompt: &mut P,
) -> AuthResult<Option<PlexAccount>> {
    if let Some(token) = &config.server_token {
        match tv.account_from_token(token).await.change_context(AuthError)? {
            Some(account) => {
                log::debug!("Logged in as {} with the stored token", account.username);
                return Ok(Some(account));
            }
            None => {
                println!("{}", "ERROR: Invalid token.".red());
                println!();
            }
        }
    }

    if let (Some(username), Some(password)) = (&config.myplex_username, &config.myplex_password)
    {
        if let Some(account) = sign_in(tv, username, password, prompt).await? {
            return proceed_with(account, prompt);
        }
    }

    loop {
        let (username, password) = prompt.credentials()?;
        if let Some(account) = sign_in(tv, &username, &password, prompt).await? {
            return proceed_with(account, prompt);
        }
    }
}

/// Signs in, asking for the one-time code when the account has two-factor verification.
/// Rejected credentials are reported and yield `None`.
async fn sign_in<P: LoginPrompt>(
    tv: &PlexTv,
    username: &str,
    password: &str,
    prompt: &mut P,
) -> AuthResult<Option<PlexAccount>> {
    let mut code: Option<String> = None;
    loop {
        let result = tv
            .sign_in(username, password, code.as_deref())
            .await
            .change_context(AuthError)?;
        match result {
            SignIn::Authenticated(account) => return Ok(Some(account)),
            SignIn::InvalidCredentials(message) => {
                log::debug!("Sign in rejected: {}", message);
                println!(
                    "{}",
                    "ERROR: Invalid email, username, or password. Please try again.".red()
                );
                println!();
                return Ok(None);
            }
            SignIn::VerificationCodeRequired => {
                if code.is_some() {
                    println!("{}", "ERROR: Invalid verification code.".red());
                }
                code = Some(prompt.verification_code()?);
            }
        }
    }
}

fn proceed_with<P: LoginPrompt>(
    account: PlexAccount,
    prompt: &mut P,
) -> AuthResult<Option<PlexAccount>> {
    println!();
    println!(
        "This is your authentication token that you can save in your configuration file to avoid having to log in every time:"
    );
    println!("{}", account.token.clone().cyan());
    println!();
    Ok(prompt.proceed()?.then_some(account))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Default)]
    struct ScriptedPrompt {
        credentials: Vec<(String, String)>,
        codes: Vec<String>,
        proceed: bool,
        credentials_asked: usize,
    }

    impl LoginPrompt for ScriptedPrompt {
        fn credentials(&mut self) -> AuthResult<(String, String)> {
            self.credentials_asked += 1;
            Ok(self.credentials.remove(0))
        }

        fn verification_code(&mut self) -> AuthResult<String> {
            Ok(self.codes.remove(0))
        }

        fn proceed(&mut self) -> AuthResult<bool> {
            Ok(self.proceed)
        }
    }

    async fn mount_user(mock_server: &MockServer, token: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/api/v2/user"))
            .and(header("X-Plex-Token", token))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "username": "dj", "authToken": token
            })))
            .mount(mock_server)
            .await;
    }

    async fn mount_sign_in(mock_server: &MockServer, body: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/v2/users/signin"))
            .and(body_string_contains(body))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "username": "dj", "authToken": token
            })))
            .mount(mock_server)
            .await;
    }

    async fn mount_rejected_sign_in(mock_server: &MockServer, code: u32) {
        Mock::given(method("POST"))
            .and(path("/api/v2/users/signin"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "errors": [{"code": code, "message": "rejected"}]
            })))
            .mount(mock_server)
            .await;
    }

    fn credentials(username: &str, password: &str) -> AuthConfig {
        AuthConfig {
            myplex_username: Some(username.to_string()),
            myplex_password: Some(password.to_string()),
            server_token: None,
        }
    }

    #[tokio::test]
    async fn test_stored_token_is_used_first() {
        let mock_server = MockServer::start().await;
        mount_user(&mock_server, "stored", 200).await;
        let tv = PlexTv::with_base_url(&mock_server.uri(), "client-1").unwrap();
        let config = AuthConfig {
            server_token: Some("stored".to_string()),
            ..credentials("dj", "pass")
        };

        let mut prompt = ScriptedPrompt::default();
        let account = login(&tv, &config, &mut prompt).await.unwrap().unwrap();
        assert_eq!(account.token, "stored");
        assert_eq!(prompt.credentials_asked, 0);
    }

    #[tokio::test]
    async fn test_invalid_token_falls_back_to_stored_credentials() {
        let mock_server = MockServer::start().await;
        mount_user(&mock_server, "stale", 401).await;
        mount_sign_in(&mock_server, "login=dj", "fresh").await;
        let tv = PlexTv::with_base_url(&mock_server.uri(), "client-1").unwrap();
        let config = AuthConfig {
            server_token: Some("stale".to_string()),
            ..credentials("dj", "pass")
        };

        let mut prompt = ScriptedPrompt {
            proceed: true,
            ..Default::default()
        };
        let account = login(&tv, &config, &mut prompt).await.unwrap().unwrap();
        assert_eq!(account.token, "fresh");
        assert_eq!(prompt.credentials_asked, 0);
    }

    #[tokio::test]
    async fn test_rejected_credentials_prompt_the_user() {
        let mock_server = MockServer::start().await;
        mount_sign_in(&mock_server, "login=typed", "typed-token").await;
        mount_rejected_sign_in(&mock_server, 1001).await;
        let tv = PlexTv::with_base_url(&mock_server.uri(), "client-1").unwrap();

        let mut prompt = ScriptedPrompt {
            credentials: vec![
                ("wrong".to_string(), "pass".to_string()),
                ("typed".to_string(), "pass".to_string()),
            ],
            proceed: true,
            ..Default::default()
        };
        let account = login(&tv, &credentials("dj", "bad"), &mut prompt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.token, "typed-token");
        assert_eq!(prompt.credentials_asked, 2);
    }

    #[tokio::test]
    async fn test_verification_code_is_requested() {
        let mock_server = MockServer::start().await;
        mount_sign_in(&mock_server, "verificationCode=654321", "token-2fa").await;
        mount_rejected_sign_in(&mock_server, 1029).await;
        let tv = PlexTv::with_base_url(&mock_server.uri(), "client-1").unwrap();

        let mut prompt = ScriptedPrompt {
            codes: vec!["654321".to_string()],
            proceed: true,
            ..Default::default()
        };
        let account = login(&tv, &credentials("dj", "pass"), &mut prompt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.token, "token-2fa");
        assert!(prompt.codes.is_empty());
    }

    #[tokio::test]
    async fn test_declining_to_proceed_returns_none() {
        let mock_server = MockServer::start().await;
        mount_sign_in(&mock_server, "login=dj", "fresh").await;
        let tv = PlexTv::with_base_url(&mock_server.uri(), "client-1").unwrap();

        let mut prompt = ScriptedPrompt::default();
        let account = login(&tv, &credentials("dj", "pass"), &mut prompt)
            .await
            .unwrap();
        assert!(account.is_none());
    }
}
