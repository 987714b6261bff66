//! HTTP middleware giving request handlers access to plugin facades.
//!
//! [`attach_facades`] stores the bot's [`Facades`] in every request's
//! extensions. Handlers take them either with the [`PluginFacades`]
//! extractor or with `Extension<Facades>`:
//!
//! ```rust,ignore
//! async fn hello(PluginFacades(facades): PluginFacades) -> String {
//!     facades.get::<Greeter>("greeter").map(|g| g.greet("world")).unwrap_or_default()
//! }
//! ```

use std::ops::Deref;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sirbot_core::Facades;

/// Middleware inserting a clone of `facades` into the request extensions.
///
/// Install with `axum::middleware::from_fn_with_state(facades, attach_facades)`.
pub async fn attach_facades(
    State(facades): State<Facades>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(facades);
    next.run(request).await
}

/// Extractor for the [`Facades`] attached by [`attach_facades`].
#[derive(Debug, Clone)]
pub struct PluginFacades(pub Facades);

impl Deref for PluginFacades {
    type Target = Facades;

    fn deref(&self) -> &Facades {
        &self.0
    }
}

impl<S> FromRequestParts<S> for PluginFacades
where
    S: Send + Sync,
{
    type Rejection = MissingFacades;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Facades>()
            .cloned()
            .map(PluginFacades)
            .ok_or(MissingFacades)
    }
}

/// Rejection used when a route is served without [`attach_facades`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingFacades;

impl IntoResponse for MissingFacades {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "plugin facades are not available on this route",
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::routing::get;
    use sirbot_core::PluginRegistry;
    use tower::ServiceExt;

    use super::*;

    async fn count(PluginFacades(facades): PluginFacades) -> String {
        facades.len().to_string()
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_rejects() {
        let app = Router::new().route("/", get(count));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_middleware_attaches_facades() {
        let facades = Facades::new(&PluginRegistry::new());
        let app = Router::new()
            .route("/", get(count))
            .layer(axum::middleware::from_fn_with_state(facades, attach_facades));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"0");
    }
}
