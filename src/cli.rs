use dialoguer::{Input, Password};
use jobboard::error::{ClientError, Result};
use jobboard::{
    ApiClient, AuthService, ClientConfig, FavoriteJobs, Guard, GuardDecision, LoginRedirect,
    MultipartPayload, NotificationCenter, OutboundRequest, RequestBody, Role, TokenStore,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ui::UI;
use crate::{
    Commands, FavoritesCommand, LoginArgs, NotificationsCommand, RequestArgs,
};

/// CLI handler for processing commands
pub struct CliHandler {
    client: Arc<ApiClient>,
    redirect: Arc<LoginRedirect>,
    ui: UI,
}

impl CliHandler {
    /// Load configuration, restore any saved session and build the client
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = match &config_path {
            Some(path) => ClientConfig::load_from(path)?,
            None => ClientConfig::load()?,
        };

        let store = Arc::new(TokenStore::from_config(&config.storage));
        store.initialize();

        let redirect = Arc::new(LoginRedirect::new(config.login_entry_point.clone()));
        let client = Arc::new(ApiClient::new(config, store, redirect.clone())?);

        Ok(Self {
            client,
            redirect,
            ui: UI::new(),
        })
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout(),
            Commands::Status => self.handle_status(),
            Commands::Request(args) => self.handle_request(args).await,
            Commands::Favorites(args) => self.handle_favorites(args.command).await,
            Commands::Notifications(args) => self.handle_notifications(args.command).await,
        }
    }

    /// Print a failed command's error, plus the sign-in hint when the session was lost
    pub fn report_error(&self, error: &ClientError) {
        self.ui.error(&format!("Error: {}", error));
        if let Some(reason) = self.redirect.take_pending() {
            self.ui.warning(&format!(
                "{} Run `jobboard login` to sign in again.",
                reason
            ));
        } else if error.code() == jobboard::ErrorCode::NotAuthenticated {
            self.ui.warning("Run `jobboard login` first.");
        }
    }

    fn auth(&self) -> AuthService {
        AuthService::new(self.client.clone())
    }

    fn require(&self, guard: Guard) -> Result<()> {
        match guard.check(self.client.store()) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::RedirectToLogin => Err(ClientError::not_authenticated()),
            GuardDecision::RedirectHome => {
                let role = match guard {
                    Guard::Role(role) => role.to_string(),
                    Guard::Authenticated => "signed-in".to_string(),
                };
                Err(ClientError::authorization(format!(
                    "This command requires the {} role",
                    role
                )))
            }
        }
    }

    /// Handle login command
    async fn handle_login(&self, args: LoginArgs) -> Result<()> {
        let email = match args.email {
            Some(email) => email,
            None => Input::<String>::new().with_prompt("Email").interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        let claims = self.auth().login(&email, &password).await?;
        self.ui.success(&format!(
            "Signed in as {} ({})",
            claims.email.as_deref().unwrap_or(&email),
            claims.role
        ));
        Ok(())
    }

    /// Handle logout command
    fn handle_logout(&self) -> Result<()> {
        let auth = self.auth();
        let was_signed_in = auth.status().is_authenticated();
        auth.logout();
        if was_signed_in {
            self.ui.success("Signed out.");
        } else {
            self.ui.info("Not signed in.");
        }
        Ok(())
    }

    /// Handle status command
    fn handle_status(&self) -> Result<()> {
        let status = self.auth().status();

        let mut rows = vec![
            ("Version", jobboard::version::format_version_info()),
            ("Server", self.client.config().base_url.clone()),
            (
                "Session",
                self.ui
                    .format_session_state(status.is_authenticated(), status.expired),
            ),
        ];

        if status.is_authenticated() {
            rows.push(("User ID", self.ui.format_user_field(status.subject)));
            rows.push(("Email", self.ui.format_user_field(status.email)));
            rows.push((
                "Role",
                self.ui.format_user_field(status.role.map(|r| r.to_string())),
            ));
            rows.push((
                "Access expires",
                self.ui
                    .format_user_field(status.expires_at.map(|t| t.to_rfc3339())),
            ));
        }

        self.ui.card("Status", rows);
        Ok(())
    }

    /// Handle request command: any method and path through the session pipeline
    async fn handle_request(&self, args: RequestArgs) -> Result<()> {
        if let Some(role) = args.require_role {
            self.require(Guard::Role(Role::from(role)))?;
        }

        let method = Method::from_bytes(args.method.to_uppercase().as_bytes()).map_err(|_| {
            ClientError::invalid_input(format!("Invalid HTTP method: {}", args.method))
        })?;
        let body = build_body(args.json.as_deref(), &args.fields, &args.files).await?;
        let headers = parse_headers(&args.headers)?;

        let request = OutboundRequest::new(method, args.path)
            .with_headers(headers)
            .with_body(body);
        let response = self.client.send(request).await?;
        let value: serde_json::Value = ApiClient::into_result(response)?;

        if value.is_null() {
            self.ui.success("Done (no content).");
        } else {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Ok(())
    }

    async fn handle_favorites(&self, command: FavoritesCommand) -> Result<()> {
        self.require(Guard::Authenticated)?;
        let favorites = FavoriteJobs::new(self.client.clone());

        match command {
            FavoritesCommand::List => {
                let entries = favorites.refresh().await?;
                self.ui.favorites(&entries);
            }
            FavoritesCommand::Toggle { job_id } => {
                favorites.refresh().await?;
                if favorites.toggle(job_id).await? {
                    self.ui.success(&format!("Job #{} added to favorites.", job_id));
                } else {
                    self.ui.success(&format!("Job #{} removed from favorites.", job_id));
                }
            }
        }
        Ok(())
    }

    async fn handle_notifications(&self, command: NotificationsCommand) -> Result<()> {
        self.require(Guard::Authenticated)?;
        let center = Arc::new(NotificationCenter::new(self.client.clone()));

        match command {
            NotificationsCommand::List => {
                let entries = center.refresh().await?;
                self.ui.notifications(&entries);
                self.ui
                    .info(&format!("{} unread", center.unread_count()));
            }
            NotificationsCommand::Read { all: true, .. } => {
                center.refresh().await?;
                let marked = center.mark_all_read().await?;
                self.ui
                    .success(&format!("Marked {} notification(s) as read.", marked));
            }
            NotificationsCommand::Read { id, .. } => {
                let id = id.ok_or_else(|| {
                    ClientError::invalid_input("Pass a notification id or --all")
                })?;
                center.mark_read(id).await?;
                self.ui
                    .success(&format!("Notification #{} marked as read.", id));
            }
            NotificationsCommand::Remove { id } => {
                center.remove(id).await?;
                self.ui.success(&format!("Notification #{} removed.", id));
            }
            NotificationsCommand::Watch { interval } => {
                self.watch_notifications(center, interval).await?;
            }
        }
        Ok(())
    }

    async fn watch_notifications(&self, center: Arc<NotificationCenter>, interval: u64) -> Result<()> {
        if interval == 0 {
            return Err(ClientError::invalid_input("Interval must be at least one second"));
        }
        let period = Duration::from_secs(interval);
        let mut polling = center.spawn_polling(period);
        let mut last_unread = None;

        self.ui
            .info(&format!("Watching notifications every {}s, Ctrl-C to stop.", interval));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    polling.abort();
                    break;
                }
                _ = &mut polling => {
                    self.ui.warning("Session ended, stopped watching.");
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    let unread = center.unread_count();
                    if last_unread != Some(unread) {
                        self.ui.info(&format!("{} unread notification(s)", unread));
                        last_unread = Some(unread);
                    }
                }
            }
        }
        Ok(())
    }
}

async fn build_body(json: Option<&str>, fields: &[String], files: &[String]) -> Result<RequestBody> {
    if let Some(json) = json {
        let value = serde_json::from_str(json)
            .map_err(|e| ClientError::invalid_input(format!("--json is not valid JSON: {}", e)))?;
        return Ok(RequestBody::Json(value));
    }
    if fields.is_empty() && files.is_empty() {
        return Ok(RequestBody::Empty);
    }

    let mut payload = MultipartPayload::new();
    for field in fields {
        let (name, value) = split_pair(field, '=')?;
        payload = payload.text(name, value);
    }
    for file in files {
        let (name, path) = split_pair(file, '=')?;
        payload = payload.attach_path(name, Path::new(path)).await?;
    }
    Ok(RequestBody::Multipart(payload))
}

fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for header in raw {
        let (name, value) = split_pair(header, ':')?;
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::invalid_input(format!("Invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ClientError::invalid_input(format!("Invalid header value for {}", name)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn split_pair(raw: &str, separator: char) -> Result<(&str, &str)> {
    match raw.split_once(separator) {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(ClientError::invalid_input(format!(
            "Expected name{}value, got '{}'",
            separator, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("title=Rust dev", '=').unwrap(), ("title", "Rust dev"));
        assert_eq!(
            split_pair("Accept-Language: vi", ':').unwrap(),
            ("Accept-Language", "vi")
        );
        assert!(split_pair("novalue", '=').is_err());
        assert!(split_pair("=x", '=').is_err());
    }

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers(&["X-Trace: abc".to_string()]).unwrap();
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
        assert!(parse_headers(&["Bad Name: x".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_build_body() {
        assert!(matches!(
            build_body(None, &[], &[]).await.unwrap(),
            RequestBody::Empty
        ));
        assert!(matches!(
            build_body(Some(r#"{"job_id": 3}"#), &[], &[]).await.unwrap(),
            RequestBody::Json(_)
        ));
        assert!(build_body(Some("{oops"), &[], &[]).await.is_err());

        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("cv.pdf");
        std::fs::write(&cv, b"%PDF").unwrap();
        let body = build_body(
            None,
            &["cover_letter=Hello".to_string()],
            &[format!("cv={}", cv.display())],
        )
        .await
        .unwrap();
        match body {
            RequestBody::Multipart(payload) => assert_eq!(payload.parts().len(), 2),
            other => panic!("unexpected body {other:?}"),
        }
    }
}
