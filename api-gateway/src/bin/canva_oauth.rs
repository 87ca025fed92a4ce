//! Canva OAuth Lambda
//!
//! Starts the Canva authorization code flow with PKCE and handles the
//! callback, storing the resulting tokens in Parameter Store.

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use shared::http::error_response;
use shared::oauth::{self, CanvaOAuth, Pkce};
use shared::{secrets, CurriculumService};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    service: CurriculumService,
    oauth: CanvaOAuth,
    redirect_uri: String,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let service = CurriculumService::from_env().await?;
        let oauth = CanvaOAuth::load(service.http().clone(), service.ssm()).await?;
        let redirect_uri = service.config().require_canva_redirect_uri()?.to_string();

        Ok(Self {
            service,
            oauth,
            redirect_uri,
        })
    }

    /// Create a verifier, park it under a fresh state value and build the redirect.
    async fn start_authorization(&self) -> Result<String, Error> {
        let pkce = Pkce::generate();
        let state = oauth::generate_state();
        secrets::put_parameter(self.service.ssm(), &oauth::verifier_parameter(&state), &pkce.verifier).await?;
        info!("Started Canva authorization");
        Ok(oauth::authorization_url(
            self.oauth.client_id(),
            &self.redirect_uri,
            &pkce.challenge,
            &state,
        ))
    }

    async fn complete_authorization(&self, code: &str, state: &str) -> Result<(), Error> {
        let parameter = oauth::verifier_parameter(state);
        let verifier = secrets::get_optional_parameter(self.service.ssm(), &parameter)
            .await
            .ok_or("Unknown or expired authorization state")?;

        let tokens = self.oauth.exchange_code(code, &verifier, &self.redirect_uri).await?;
        oauth::store_tokens(self.service.ssm(), &tokens).await?;

        if let Err(e) = secrets::delete_parameter(self.service.ssm(), &parameter).await {
            warn!(error = %e, "Could not remove used PKCE verifier");
        }
        Ok(())
    }
}

fn html(status: u16, title: &str, message: &str) -> Result<Response<Body>, Error> {
    let page = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n    <h1>{title}</h1>\n    <p>{message}</p>\n</body>\n</html>\n"
    );
    Ok(Response::builder()
        .status(status)
        .header("content-type", "text/html")
        .body(Body::from(page))?)
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = event.uri().path();
    let method = event.method().as_str();

    match (method, path) {
        ("GET", "/canva/authorize") => {
            let auth_url = state.start_authorization().await?;
            Ok(Response::builder()
                .status(302)
                .header("location", auth_url)
                .body(Body::Empty)?)
        }

        ("GET", "/canva-callback") => {
            let params = event.query_string_parameters();

            if let Some(err) = params.first("error") {
                error!("OAuth error from Canva: {}", err);
                return html(400, "Canva Authorization Failed", &format!("OAuth error: {}", err));
            }

            let (Some(code), Some(auth_state)) = (params.first("code"), params.first("state")) else {
                return error_response(400, "Missing code or state parameter");
            };

            match state.complete_authorization(code, auth_state).await {
                Ok(()) => {
                    info!("Canva authorization complete");
                    html(
                        200,
                        "Canva Connected",
                        "Curriculum Designer can now create presentations in Canva. You can close this window.",
                    )
                }
                Err(e) => {
                    error!(error = %e, "Canva token exchange failed");
                    html(400, "Canva Authorization Failed", &e.to_string())
                }
            }
        }

        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
