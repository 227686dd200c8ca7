use super::{build_response, build_response_with_status, dto::MessageDto, with_user};
use crate::observer::{AccountObserver, FieldObserver};
use warp::http::StatusCode;
use warp::Filter;

pub fn routes(
    fields: &FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    list_fields(fields.clone(), accounts)
        .or(create_field(fields.clone(), accounts))
        .or(update_field(fields.clone(), accounts))
        .or(delete_field(fields.clone(), accounts))
        .or(create_checkpoint(fields.clone(), accounts))
        .or(update_checkpoint(fields.clone(), accounts))
        .or(delete_checkpoint(fields.clone(), accounts))
}

/// GET api/fields
///
/// Returns every field of the user, with its checkpoints, their current
/// sensor readings and their pump
fn list_fields(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "fields"))
        .and(warp::get())
        .and(with_user(accounts))
        .and_then(|fields: FieldObserver, user_id: i32| async move {
            let resp = fields
                .list(user_id)
                .await
                .map(|views| views.into_iter().map(dto::FieldStatusDto::from).collect::<Vec<_>>());
            build_response(resp)
        })
        .boxed()
}

/// POST api/fields
///
/// Returns 201 and the created `FieldDto`
fn create_field(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "fields"))
        .and(warp::post())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |fields: FieldObserver, user_id: i32, body: dto::FieldCreateDto| async move {
                let resp = fields
                    .create(user_id, &body.name, body.city.as_deref())
                    .await
                    .map(dto::FieldDto::from);
                build_response_with_status(resp, StatusCode::CREATED)
            },
        )
        .boxed()
}

/// PUT api/fields/:id
///
/// Changes name and/or city of a field
fn update_field(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "fields" / i32))
        .and(warp::put())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |fields: FieldObserver, field_id: i32, user_id: i32, body: dto::FieldUpdateDto| async move {
                let resp = fields
                    .update(user_id, field_id, body.name.as_deref(), body.city.as_deref())
                    .await
                    .map(dto::FieldDto::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE api/fields/:id
///
/// Deletes a field with its checkpoints, readings, pumps and trigger tasks
fn delete_field(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "fields" / i32))
        .and(warp::delete())
        .and(with_user(accounts))
        .and_then(|fields: FieldObserver, field_id: i32, user_id: i32| async move {
            let resp = fields
                .delete(user_id, field_id)
                .await
                .map(|_| MessageDto::new("Field deleted successfully"));
            build_response(resp)
        })
        .boxed()
}

/// POST api/checkpoints
///
/// Creates a checkpoint with its sensor readings and pump
///
/// Returns 201 and the created `CheckpointDto`
fn create_checkpoint(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "checkpoints"))
        .and(warp::post())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |fields: FieldObserver, user_id: i32, body: dto::CheckpointCreateDto| async move {
                let resp = fields
                    .create_checkpoint(user_id, body.field_id, &body.name)
                    .await
                    .map(dto::CheckpointDto::from);
                build_response_with_status(resp, StatusCode::CREATED)
            },
        )
        .boxed()
}

/// PUT api/checkpoints/:id
fn update_checkpoint(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "checkpoints" / i32))
        .and(warp::put())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |fields: FieldObserver,
             checkpoint_id: i32,
             user_id: i32,
             body: dto::CheckpointUpdateDto| async move {
                let resp = fields
                    .rename_checkpoint(user_id, checkpoint_id, body.name.as_deref())
                    .await
                    .map(dto::CheckpointDto::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE api/checkpoints/:id
fn delete_checkpoint(
    fields: FieldObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || fields.clone())
        .and(warp::path!("api" / "checkpoints" / i32))
        .and(warp::delete())
        .and(with_user(accounts))
        .and_then(|fields: FieldObserver, checkpoint_id: i32, user_id: i32| async move {
            let resp = fields
                .delete_checkpoint(user_id, checkpoint_id)
                .await
                .map(|_| MessageDto::new("Checkpoint deleted successfully"));
            build_response(resp)
        })
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::models::{checkpoint::CheckpointDao, field::FieldDao};
    use crate::observer::field::{CheckpointView, FieldView};
    use crate::rest::pump_routes::dto::PumpDto;
    use chrono::{DateTime, Utc};
    use irrigo_core::SensorMetric;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use tracing::warn;

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct FieldCreateDto {
        pub name: String,
        pub city: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct FieldUpdateDto {
        pub name: Option<String>,
        pub city: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct FieldDto {
        pub id: i32,
        pub name: String,
        pub city: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<FieldDao> for FieldDto {
        fn from(field: FieldDao) -> Self {
            FieldDto {
                id: field.id(),
                name: field.name().clone(),
                city: field.city().clone(),
                created_at: field.created_at(),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct FieldStatusDto {
        pub id: i32,
        pub name: String,
        pub city: String,
        pub created_at: DateTime<Utc>,
        pub checkpoints: Vec<CheckpointStatusDto>,
    }

    impl From<FieldView> for FieldStatusDto {
        fn from(view: FieldView) -> Self {
            FieldStatusDto {
                id: view.field.id(),
                name: view.field.name().clone(),
                city: view.field.city().clone(),
                created_at: view.field.created_at(),
                checkpoints: view
                    .checkpoints
                    .into_iter()
                    .map(CheckpointStatusDto::from)
                    .collect(),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct CheckpointStatusDto {
        pub id: i32,
        pub name: String,
        /// Current reading per sensor metric
        pub sensors: BTreeMap<SensorMetric, SensorReadingDto>,
        pub pump: Option<PumpDto>,
    }

    impl From<CheckpointView> for CheckpointStatusDto {
        fn from(view: CheckpointView) -> Self {
            let sensors = view
                .readings
                .into_iter()
                .filter_map(|reading| match reading.metric() {
                    Ok(metric) => Some((
                        metric,
                        SensorReadingDto {
                            value: reading.value(),
                            unit: reading.unit().clone(),
                            timestamp: reading.timestamp(),
                        },
                    )),
                    Err(e) => {
                        warn!("Skipping reading: {}", e);
                        None
                    }
                })
                .collect();
            CheckpointStatusDto {
                id: view.checkpoint.id(),
                name: view.checkpoint.name().clone(),
                sensors,
                pump: view.pump.map(PumpDto::from),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct SensorReadingDto {
        pub value: f64,
        pub unit: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct CheckpointCreateDto {
        pub name: String,
        pub field_id: i32,
    }

    #[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct CheckpointUpdateDto {
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct CheckpointDto {
        pub id: i32,
        pub name: String,
        pub field_id: i32,
        pub created_at: DateTime<Utc>,
    }

    impl From<CheckpointDao> for CheckpointDto {
        fn from(checkpoint: CheckpointDao) -> Self {
            CheckpointDto {
                id: checkpoint.id(),
                name: checkpoint.name().clone(),
                field_id: checkpoint.field_id(),
                created_at: checkpoint.created_at(),
            }
        }
    }
}
