//! HTTP handlers for the playlist export service.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::auth;
use crate::config::{Config, REPORT_FILE_NAME};
use crate::error::AppError;
use crate::export;
use crate::spotify::SpotifyApi;

/// State shared by all handlers. Request-specific data travels in cookies.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub spotify: Arc<dyn SpotifyApi>,
}

impl AppState {
    pub fn new(config: Config, spotify: Arc<dyn SpotifyApi>) -> Self {
        Self {
            config: Arc::new(config),
            spotify,
        }
    }
}

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    pub error: Option<String>,
}

fn error_message(code: &str) -> &'static str {
    match code {
        "state_mismatch" => "Login expired or was tampered with. Please log in again.",
        "access_denied" => "Access was not granted.",
        "invalid_callback" => "The login callback was incomplete.",
        "upstream_error" => "Spotify rejected the request. Please log in again.",
        "export_failed" => "The playlist report could not be written.",
        _ => "Something went wrong.",
    }
}

/// GET / - Landing page.
pub async fn home(Query(params): Query<HomeQuery>) -> Html<String> {
    let notice = params
        .error
        .as_deref()
        .map(|code| format!("<p class=\"error\">{}</p>", error_message(code)))
        .unwrap_or_default();
    Html(format!(
        "<h1>Playlist export</h1>{notice}<p><a href=\"/login\">Log in with Spotify</a></p>"
    ))
}

/// GET /authenticated - Shown after a successful login.
pub async fn authenticated() -> Html<&'static str> {
    Html("<h1>Logged in</h1><p><a href=\"/getPlaylists\">Export playlists</a></p>")
}

/// GET /health - Health check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /login - Start the authorization code flow.
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let csrf_state = auth::generate_state();
    let url = state.spotify.authorize_url(&csrf_state);
    tracing::debug!("redirecting to provider authorization page");
    (jar.add(auth::state_cookie(csrf_state)), found(&url))
}

/// 302 Found redirect.
fn found(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// GET /authenticate, /callback - Finish the flow and store the access token.
///
/// The state cookie is single-use: it is cleared whatever the outcome.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackQuery>,
) -> (CookieJar, Result<Redirect, AppError>) {
    let expected = auth::cookie_value(&jar, auth::STATE_COOKIE);
    let jar = auth::clear_state(jar);

    match complete_login(&state, expected.as_deref(), params).await {
        Ok(access_token) => (
            jar.add(auth::access_token_cookie(access_token)),
            Ok(Redirect::to("/authenticated")),
        ),
        Err(err) => (jar, Err(err)),
    }
}

async fn complete_login(
    state: &AppState,
    expected: Option<&str>,
    params: CallbackQuery,
) -> Result<String, AppError> {
    if let Some(error) = params.error {
        return Err(AppError::AuthorizationDenied(error));
    }

    auth::verify_state(expected, params.state.as_deref())?;

    let code = params.code.filter(|c| !c.is_empty()).ok_or(AppError::MissingCode)?;

    let grant = state.spotify.exchange_code(&code).await?;
    tracing::info!(
        token_type = %grant.token_type,
        expires_in = grant.expires_in,
        scope = grant.scope.as_deref().unwrap_or_default(),
        has_refresh_token = grant.refresh_token.is_some(),
        "authorization code exchanged"
    );

    Ok(grant.access_token)
}

/// GET /getPlaylists - Export every playlist of the logged-in user.
pub async fn export_playlists(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Redirect, AppError> {
    let token = auth::cookie_value(&jar, auth::ACCESS_TOKEN_COOKIE)
        .ok_or(AppError::MissingAccessToken)?;

    let summary = export::run(state.spotify.as_ref(), &token, &state.config.report_path()).await?;
    tracing::info!(
        playlists = summary.playlists,
        tracks = summary.tracks,
        bytes = summary.bytes,
        "export finished"
    );

    Ok(Redirect::to(&format!("/{}", REPORT_FILE_NAME)))
}

async fn redirect_home() -> Redirect {
    Redirect::to("/")
}

/// Build the app router. Unknown paths are looked up in `public_dir`, then redirected home.
pub fn router(public_dir: &Path) -> Router<AppState> {
    let static_files = ServeDir::new(public_dir).fallback(redirect_home.into_service());

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/login", get(login))
        .route("/authenticate", get(authenticate))
        .route("/callback", get(authenticate))
        .route("/authenticated", get(authenticated))
        .route("/getPlaylists", get(export_playlists))
        .fallback_service(static_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::library_mock;
    use crate::spotify::{MockSpotifyApi, SpotifyError, TokenGrant};
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_config(public_dir: &Path) -> Config {
        let public_dir = public_dir.to_string_lossy().to_string();
        Config::from_lookup(|key| match key {
            "SPOTIFY_CLIENT_ID" => Some("id".into()),
            "SPOTIFY_CLIENT_SECRET" => Some("secret".into()),
            "SPOTIFY_REDIRECT_URI" => Some("http://localhost:9000/authenticate".into()),
            "PUBLIC_DIR" => Some(public_dir.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn app(dir: &TempDir, api: MockSpotifyApi) -> Router {
        let config = test_config(dir.path());
        router(dir.path()).with_state(AppState::new(config, Arc::new(api)))
    }

    async fn send(app: Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    fn location(res: &Response<Body>) -> &str {
        res.headers()[header::LOCATION].to_str().unwrap()
    }

    fn set_cookies(res: &Response<Body>) -> Vec<String> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn state_cleared(res: &Response<Body>) -> bool {
        set_cookies(res)
            .iter()
            .any(|c| c.starts_with("spotify_auth_state=;") && c.contains("Max-Age=0"))
    }

    fn grant(token: &str) -> TokenGrant {
        TokenGrant {
            access_token: token.into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            refresh_token: None,
            scope: None,
        }
    }

    #[tokio::test]
    async fn test_login_sets_state_and_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_authorize_url()
            .times(1)
            .returning(|state| format!("https://accounts.example/authorize?state={state}"));

        let res = send(app(&dir, api), "/login", None).await;
        assert_eq!(res.status(), StatusCode::FOUND);

        let cookies = set_cookies(&res);
        assert_eq!(cookies.len(), 1);
        let state = cookies[0]
            .strip_prefix("spotify_auth_state=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(state.len(), 16);
        assert_eq!(location(&res), format!("https://accounts.example/authorize?state={state}"));
    }

    #[tokio::test]
    async fn test_authenticate_stores_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().times(1).returning(|code| {
            assert_eq!(code, "the-code");
            Ok(grant("user-token"))
        });

        let res = send(
            app(&dir, api),
            "/authenticate?code=the-code&state=s3cr3t",
            Some("spotify_auth_state=s3cr3t"),
        )
        .await;

        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/authenticated");
        let cookies = set_cookies(&res);
        assert!(cookies.iter().any(|c| c.starts_with("access_token=user-token")));
        assert!(state_cleared(&res));
    }

    #[tokio::test]
    async fn test_callback_alias() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().times(1).returning(|_| Ok(grant("t")));

        let res = send(app(&dir, api), "/callback?code=c&state=s", Some("spotify_auth_state=s")).await;
        assert_eq!(location(&res), "/authenticated");
    }

    #[tokio::test]
    async fn test_authenticate_state_mismatch_skips_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().never();

        let res = send(
            app(&dir, api),
            "/authenticate?code=c&state=forged",
            Some("spotify_auth_state=real"),
        )
        .await;

        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/?error=state_mismatch");
        assert!(state_cleared(&res));
        assert!(!set_cookies(&res).iter().any(|c| c.starts_with("access_token=")));
    }

    #[tokio::test]
    async fn test_authenticate_missing_state_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().never();

        let res = send(app(&dir, api), "/authenticate?code=c&state=s", None).await;
        assert_eq!(location(&res), "/?error=state_mismatch");
    }

    #[tokio::test]
    async fn test_authenticate_provider_denied() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().never();

        let res = send(
            app(&dir, api),
            "/authenticate?error=access_denied&state=s",
            Some("spotify_auth_state=s"),
        )
        .await;
        assert_eq!(location(&res), "/?error=access_denied");
        assert!(state_cleared(&res));
    }

    #[tokio::test]
    async fn test_authenticate_missing_code_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().never();

        let res = send(app(&dir, api), "/authenticate?state=s", Some("spotify_auth_state=s")).await;
        assert_eq!(location(&res), "/?error=invalid_callback");
        assert!(state_cleared(&res));
    }

    #[tokio::test]
    async fn test_authenticate_exchange_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_exchange_code().times(1).returning(|_| {
            Err(SpotifyError::Status {
                status: reqwest::StatusCode::BAD_REQUEST,
                body: "invalid_grant".into(),
            })
        });

        let res = send(
            app(&dir, api),
            "/authenticate?code=expired&state=s",
            Some("spotify_auth_state=s"),
        )
        .await;

        assert_eq!(location(&res), "/?error=upstream_error");
        assert!(state_cleared(&res));
        assert!(!set_cookies(&res).iter().any(|c| c.starts_with("access_token=")));
    }

    #[tokio::test]
    async fn test_export_without_token_redirects_home() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockSpotifyApi::new();
        api.expect_playlists_page().never();

        let res = send(app(&dir, api), "/getPlaylists", None).await;

        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/");
        assert!(!dir.path().join(REPORT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_export_writes_and_serves_report() {
        let dir = tempfile::tempdir().unwrap();

        let res = send(app(&dir, library_mock()), "/getPlaylists", Some("access_token=user-token")).await;
        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/playlist.txt");

        let written = std::fs::read_to_string(dir.path().join(REPORT_FILE_NAME)).unwrap();
        assert!(written.starts_with("\nMy Mix:\n\n\tA  -  X\n\tB  -  Y\n"));

        let res = send(app(&dir, MockSpotifyApi::new()), "/playlist.txt", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, written.as_bytes());
    }

    #[tokio::test]
    async fn test_unknown_path_redirects_home() {
        let dir = tempfile::tempdir().unwrap();
        let res = send(app(&dir, MockSpotifyApi::new()), "/does/not/exist", None).await;
        assert!(res.status().is_redirection());
        assert_eq!(location(&res), "/");
    }

    #[tokio::test]
    async fn test_home_shows_known_error_only() {
        let dir = tempfile::tempdir().unwrap();
        let res = send(app(&dir, MockSpotifyApi::new()), "/?error=%3Cscript%3E", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Something went wrong."));
        assert!(!body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let res = send(app(&dir, MockSpotifyApi::new()), "/health", None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
