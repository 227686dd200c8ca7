use super::query::{CityQuery, FieldQuery};
use super::{build_response, build_response_with_status, dto::MessageDto, with_user};
use crate::error::ObserverError;
use crate::observer::{AccountObserver, TriggerObserver};
use irrigo_core::WeatherSample;
use warp::http::StatusCode;
use warp::Filter;

pub fn routes(
    triggers: &TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    list_triggers(triggers.clone(), accounts)
        .or(create_trigger(triggers.clone(), accounts))
        .or(update_trigger(triggers.clone(), accounts))
        .or(delete_trigger(triggers.clone(), accounts))
        .or(evaluate_trigger(triggers.clone(), accounts))
        .or(weather(triggers.clone(), accounts))
}

/// GET api/trigger-tasks?field_id=
///
/// Returns the user's trigger tasks, optionally only those of one field
fn list_triggers(
    triggers: TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || triggers.clone())
        .and(warp::path!("api" / "trigger-tasks"))
        .and(warp::get())
        .and(with_user(accounts))
        .and(warp::query::<FieldQuery>())
        .and_then(
            |triggers: TriggerObserver, user_id: i32, query: FieldQuery| async move {
                let resp = match query.field_id() {
                    Ok(field_id) => triggers.list(user_id, field_id).await,
                    Err(e) => Err(ObserverError::from(e)),
                };
                let resp = resp.map(|tasks| {
                    tasks
                        .into_iter()
                        .map(dto::TriggerDto::from)
                        .collect::<Vec<_>>()
                });
                build_response(resp)
            },
        )
        .boxed()
}

/// POST api/trigger-tasks
///
/// Returns 201 and the created `TriggerDto`
fn create_trigger(
    triggers: TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || triggers.clone())
        .and(warp::path!("api" / "trigger-tasks"))
        .and(warp::post())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |triggers: TriggerObserver, user_id: i32, body: dto::TriggerCreateDto| async move {
                let field_id = body.field_id;
                let resp = triggers
                    .create(user_id, field_id, body.into())
                    .await
                    .map(dto::TriggerDto::from);
                build_response_with_status(resp, StatusCode::CREATED)
            },
        )
        .boxed()
}

/// PUT api/trigger-tasks/:id
///
/// Partial update, absent keys are left as they are
fn update_trigger(
    triggers: TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || triggers.clone())
        .and(warp::path!("api" / "trigger-tasks" / i32))
        .and(warp::put())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |triggers: TriggerObserver,
             trigger_id: i32,
             user_id: i32,
             body: dto::TriggerUpdateDto| async move {
                let resp = triggers
                    .update(user_id, trigger_id, body.into())
                    .await
                    .map(dto::TriggerDto::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE api/trigger-tasks/:id
fn delete_trigger(
    triggers: TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || triggers.clone())
        .and(warp::path!("api" / "trigger-tasks" / i32))
        .and(warp::delete())
        .and(with_user(accounts))
        .and_then(
            |triggers: TriggerObserver, trigger_id: i32, user_id: i32| async move {
                let resp = triggers
                    .delete(user_id, trigger_id)
                    .await
                    .map(|_| MessageDto::new("Trigger task deleted successfully"));
                build_response(resp)
            },
        )
        .boxed()
}

/// POST api/trigger-tasks/:id/evaluate
///
/// Evaluates a trigger task against the posted weather sample
/// If the condition holds, every pump of the task's field is switched
///
/// Returns an `EvaluationDto`
fn evaluate_trigger(
    triggers: TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || triggers.clone())
        .and(warp::path!("api" / "trigger-tasks" / i32 / "evaluate"))
        .and(warp::post())
        .and(with_user(accounts))
        .and(warp::body::json())
        .and_then(
            |triggers: TriggerObserver, trigger_id: i32, user_id: i32, sample: WeatherSample| async move {
                let resp = triggers
                    .evaluate(user_id, trigger_id, &sample)
                    .await
                    .map(dto::EvaluationDto::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// GET api/weather?city=
///
/// Returns the current `WeatherReport` of a city, London if none is given
/// Answers 503 if the weather service can't be reached
fn weather(
    triggers: TriggerObserver,
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || triggers.clone())
        .and(warp::path!("api" / "weather"))
        .and(warp::get())
        .and(with_user(accounts))
        .and(warp::query::<CityQuery>())
        .and_then(
            |triggers: TriggerObserver, _user_id: i32, query: CityQuery| async move {
                let resp = triggers.weather(query.city()).await;
                build_response(resp)
            },
        )
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::models::trigger::{NewTrigger, TriggerDao};
    use crate::observer::trigger::{TriggerOutcome, TriggerPatch};
    use chrono::{DateTime, Utc};
    use irrigo_core::{Comparison, TriggerAction, WeatherMetric};
    use serde::{Deserialize, Serialize};

    fn active_by_default() -> bool {
        true
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct TriggerCreateDto {
        pub name: String,
        pub field_id: i32,
        pub weather_metric: WeatherMetric,
        pub condition: Comparison,
        pub threshold: f64,
        pub action: TriggerAction,
        #[serde(default = "active_by_default")]
        pub is_active: bool,
    }

    impl From<TriggerCreateDto> for NewTrigger {
        fn from(dto: TriggerCreateDto) -> Self {
            NewTrigger {
                name: dto.name,
                weather_metric: dto.weather_metric,
                condition: dto.condition,
                threshold: dto.threshold,
                action: dto.action,
                is_active: dto.is_active,
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct TriggerUpdateDto {
        pub name: Option<String>,
        pub weather_metric: Option<WeatherMetric>,
        pub condition: Option<Comparison>,
        pub threshold: Option<f64>,
        pub action: Option<TriggerAction>,
        pub is_active: Option<bool>,
    }

    impl From<TriggerUpdateDto> for TriggerPatch {
        fn from(dto: TriggerUpdateDto) -> Self {
            TriggerPatch {
                name: dto.name,
                weather_metric: dto.weather_metric,
                condition: dto.condition,
                threshold: dto.threshold,
                action: dto.action,
                is_active: dto.is_active,
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct TriggerDto {
        pub id: i32,
        pub name: String,
        pub field_id: i32,
        pub weather_metric: String,
        pub condition: String,
        pub threshold: f64,
        pub action: String,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
        pub last_triggered: Option<DateTime<Utc>>,
    }

    impl From<TriggerDao> for TriggerDto {
        fn from(trigger: TriggerDao) -> Self {
            TriggerDto {
                id: trigger.id(),
                name: trigger.name().clone(),
                field_id: trigger.field_id(),
                threshold: trigger.threshold(),
                is_active: trigger.is_active(),
                created_at: trigger.created_at,
                last_triggered: trigger.last_triggered(),
                weather_metric: trigger.weather_metric,
                condition: trigger.condition,
                action: trigger.action,
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct EvaluationDto {
        pub triggered: bool,
        pub message: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub weather_value: Option<f64>,
        pub threshold: f64,
    }

    impl From<TriggerOutcome> for EvaluationDto {
        fn from(outcome: TriggerOutcome) -> Self {
            EvaluationDto {
                triggered: outcome.triggered,
                message: outcome.message,
                weather_value: outcome.weather_value,
                threshold: outcome.threshold,
            }
        }
    }
}
