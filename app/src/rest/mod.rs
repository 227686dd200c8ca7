use crate::error::{AuthError, ObserverError};
use crate::observer::{
    AccountObserver, ConcurrentObserver, FieldObserver, PumpObserver, TriggerObserver,
};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

mod account_routes;
mod doc_routes;
mod field_routes;
mod metric_routes;
mod pump_routes;
mod query;
mod trigger_routes;


pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let accounts = AccountObserver::new(observer.clone());
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());

    metric_routes::routes(observer)
        .or(account_routes::routes(&accounts))
        .or(field_routes::routes(&fields, &accounts))
        .or(pump_routes::routes(&pumps, &accounts))
        .or(trigger_routes::routes(&triggers, &accounts))
        .or(doc_routes::routes())
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Serves the API until `shutdown` flips to true, then lets in-flight
/// requests finish. Fails right away if `bind_addr` cannot be bound.
pub async fn dispatch_server(
    observer: Arc<ConcurrentObserver>,
    bind_addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), warp::Error> {
    let routes = routes(&observer);
    let (addr, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(bind_addr, async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })?;

    info!("Starting webserver at: {}", addr);
    server.await;
    info!("Webserver stopped");
    Ok(())
}

/// Resolves `Authorization: Bearer <token>` to the id of a logged in user.
pub fn with_user(
    accounts: &AccountObserver,
) -> impl Filter<Extract = (i32,), Error = Rejection> + Clone {
    let accounts = accounts.clone();
    with_token().and_then(move |token: String| {
        let accounts = accounts.clone();
        async move {
            accounts
                .identify(&token)
                .await
                .map_err(|e| warp::reject::custom(ApiRejection(e)))
        }
    })
}

/// Extracts the raw bearer token.
pub fn with_token() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        |header: Option<String>| async move {
            header
                .as_deref()
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_owned())
                .filter(|token| !token.is_empty())
                .ok_or_else(|| warp::reject::custom(ApiRejection(AuthError::Missing.into())))
        },
    )
}

#[derive(Debug)]
struct ApiRejection(ObserverError);

impl warp::reject::Reject for ApiRejection {}

pub fn build_response<T: Serialize>(
    resp: Result<T, ObserverError>,
) -> Result<warp::reply::Response, Rejection> {
    build_response_with_status(resp, StatusCode::OK)
}

pub fn build_response_with_status<T: Serialize>(
    resp: Result<T, ObserverError>,
    status: StatusCode,
) -> Result<warp::reply::Response, Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::with_status(warp::reply::json(&data), status).into_response()),
        Err(err) => Ok(error_response(&err)),
    }
}

fn error_response(err: &ObserverError) -> warp::reply::Response {
    let (status, body) = match err {
        ObserverError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, dto::ErrorResponseDto::new(err)),
        ObserverError::NotFound(err) => (StatusCode::NOT_FOUND, dto::ErrorResponseDto::new(err)),
        ObserverError::Validation(err) => (
            StatusCode::BAD_REQUEST,
            dto::ErrorResponseDto {
                error: err.message.clone(),
                field: Some(err.field.to_owned()),
            },
        ),
        ObserverError::User(err) => {
            warn!("{}", err);
            (StatusCode::BAD_REQUEST, dto::ErrorResponseDto::new(err))
        }
        ObserverError::Unavailable(err) => {
            warn!("{}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                dto::ErrorResponseDto::new("Weather service unavailable"),
            )
        }
        ObserverError::Internal(err) => {
            error!("{}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                dto::ErrorResponseDto::new("Internal server error"),
            )
        }
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if let Some(ApiRejection(e)) = err.find::<ApiRejection>() {
        return Ok(error_response(e));
    }

    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type".to_owned())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned())
    };

    let body = dto::ErrorResponseDto {
        error: message,
        field: None,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}

///
/// DTO
///
pub mod dto {
    use serde::{Deserialize, Serialize};
    use std::fmt::Display;

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct ErrorResponseDto {
        pub error: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub field: Option<String>,
    }

    impl ErrorResponseDto {
        pub fn new(err: impl Display) -> Self {
            ErrorResponseDto {
                error: err.to_string(),
                field: None,
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct MessageDto {
        pub message: String,
    }

    impl MessageDto {
        pub fn new(message: &str) -> Self {
            MessageDto {
                message: message.to_owned(),
            }
        }
    }
}
