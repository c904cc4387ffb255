//! Per-request [`Context`] of GraphQL resolvers.

use std::sync::atomic::{AtomicU16, Ordering};

use axum::{async_trait, extract::FromRequestParts};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};

use crate::{Error, JuniperResponse, Service};

/// Per-request context of GraphQL resolvers.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] resolving the request.
    service: Service,

    /// [`http::StatusCode`] of the last recorded [`Error`], `0` if none.
    failure: AtomicU16,
}

impl Context {
    /// Creates a new [`Context`] resolving with the provided [`Service`].
    #[must_use]
    pub fn new(service: Service) -> Self {
        Self {
            service,
            failure: AtomicU16::new(0),
        }
    }

    /// Returns the [`Service`] resolving the request.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the [`http::StatusCode`] to respond with if resolving fails.
    ///
    /// Falls back to `500 Internal Server Error` if no [`Error`] has been
    /// recorded.
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        match self.failure.load(Ordering::Relaxed) {
            0 => http::StatusCode::INTERNAL_SERVER_ERROR,
            code => http::StatusCode::from_u16(code)
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Records the provided [`Error`] as the one the response reflects.
    pub fn record(&self, err: Error) -> Error {
        self.failure
            .store(err.status_code.as_u16(), Ordering::Relaxed);
        err
    }

    /// Returns a [`Result::map_err()`] closure doing [`Context::record()`].
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        |err| self.record(err)
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let Some(service) = parts.extensions.get::<Service>() else {
            let err = Error::internal(&"`Service` is not provided");
            return Err(JuniperResponse {
                status_code: err.status_code,
                response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                    err.into_field_error(),
                )),
            });
        };
        Ok(Self::new(service.clone()))
    }
}
