use super::build_response;
use crate::observer::ConcurrentObserver;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    observer: &Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health(observer.clone())
}

/// GET api/health
fn health(
    observer: Arc<ConcurrentObserver>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || observer.clone())
        .and(warp::path!("api" / "health"))
        .and(warp::get())
        .and_then(|observer: Arc<ConcurrentObserver>| async move {
            let database_state = match observer.check_db().await {
                Ok(_) => "connected".to_owned(),
                Err(e) => e.to_string(),
            };
            let ret = dto::HealthyDto {
                healthy: true,
                service: env!("CARGO_PKG_NAME").to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                database_state,
            };
            build_response(Ok(ret))
        })
        .boxed()
}

pub mod dto {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct HealthyDto {
        pub healthy: bool,
        pub service: String,
        pub version: String,
        pub database_state: String,
    }
}
