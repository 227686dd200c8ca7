use super::{build_response, with_user};
use crate::observer::{AccountObserver, PumpObserver};
use warp::Filter;

pub fn routes(
    pumps: &PumpObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    list_pumps(pumps.clone(), accounts).or(control_pump(pumps.clone(), accounts))
}

/// GET api/pumps
///
/// Returns all pumps below the user's fields
fn list_pumps(
    pumps: PumpObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pumps.clone())
        .and(warp::path!("api" / "pumps"))
        .and(warp::get())
        .and(with_user(accounts))
        .and_then(|pumps: PumpObserver, user_id: i32| async move {
            let resp = pumps
                .list(user_id)
                .await
                .map(|pumps| pumps.into_iter().map(dto::PumpDto::from).collect::<Vec<_>>());
            build_response(resp)
        })
        .boxed()
}

/// POST api/pumps/:id/control
///
/// Turns a pump on or off
///
/// Returns the updated `PumpDto`
fn control_pump(
    pumps: PumpObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pumps.clone())
        .and(warp::path!("api" / "pumps" / i32 / "control"))
        .and(warp::post())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |pumps: PumpObserver, pump_id: i32, user_id: i32, body: dto::PumpControlDto| async move {
                let resp = pumps
                    .control(user_id, pump_id, body.is_on)
                    .await
                    .map(dto::PumpDto::from);
                build_response(resp)
            },
        )
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::models::pump::PumpDao;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct PumpControlDto {
        pub is_on: bool,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct PumpDto {
        pub id: i32,
        pub checkpoint_id: i32,
        pub name: String,
        pub is_on: bool,
        pub last_activated: Option<DateTime<Utc>>,
    }

    impl From<PumpDao> for PumpDto {
        fn from(pump: PumpDao) -> Self {
            PumpDto {
                id: pump.id(),
                checkpoint_id: pump.checkpoint_id(),
                name: pump.name().clone(),
                is_on: pump.is_on(),
                last_activated: pump.last_activated(),
            }
        }
    }
}
