use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::connect_info::ConnectInfo;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{DefaultBodyLimit, FromRequestParts, State};
use axum::routing::{get, post};
use axum::{async_trait, Json, Router};
use http::request::Parts;
use http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Error, Reply, Result};
use crate::intake::FormIntake;
use crate::notifier::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub notifier: Notifier,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Mount `GET /test-email`.
    pub test_email: bool,
}

pub fn router(notifier: Notifier, options: RouterOptions) -> Router {
    // Uploads are accepted at any size
    let mut router = Router::new().route(
        "/submit",
        post(submit).layer(DefaultBodyLimit::disable()),
    );

    if options.test_email {
        router = router.route("/test-email", get(test_email));
    }

    router
        .layer(cors_layer())
        .with_state(AppState { notifier })
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Address of the peer the request arrived from, if the server recorded one.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub Option<IpAddr>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientAddr(addr))
    }
}

async fn submit(
    State(state): State<AppState>,
    ClientAddr(client_ip): ClientAddr,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Reply>> {
    let multipart = multipart.map_err(|e| Error::MalformedForm(e.body_text()))?;
    let (submission, files) = FormIntake::from_multipart(multipart).await?.validate()?;

    tracing::info!(attachments = files.len(), client = ?client_ip, "accepted submission");
    state.notifier.deliver(&submission, &files, client_ip).await?;

    Ok(Json(Reply::ok()))
}

async fn test_email(State(state): State<AppState>) -> Result<&'static str> {
    state.notifier.send_test().await?;
    Ok("Test email sent successfully")
}
