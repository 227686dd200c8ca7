use utoipa::openapi::schema::ComponentsBuilder;
use utoipa::openapi::{InfoBuilder, OpenApi as OpenApiSpec, OpenApiBuilder};
use utoipa::OpenApi;
use warp::Filter;

use super::{account_routes, field_routes, metric_routes, pump_routes, trigger_routes};

#[derive(OpenApi)]
#[openapi(components(schemas(
    super::dto::ErrorResponseDto,
    super::dto::MessageDto,
    metric_routes::dto::HealthyDto,
    account_routes::dto::SignupRequestDto,
    account_routes::dto::LoginRequestDto,
    account_routes::dto::TokenDto,
    account_routes::dto::UserDto,
)))]
struct AccountApi;

#[derive(OpenApi)]
#[openapi(components(schemas(
    field_routes::dto::FieldCreateDto,
    field_routes::dto::FieldUpdateDto,
    field_routes::dto::FieldDto,
    field_routes::dto::FieldStatusDto,
    field_routes::dto::CheckpointStatusDto,
    field_routes::dto::SensorReadingDto,
    field_routes::dto::CheckpointCreateDto,
    field_routes::dto::CheckpointUpdateDto,
    field_routes::dto::CheckpointDto,
    pump_routes::dto::PumpControlDto,
    pump_routes::dto::PumpDto,
)))]
struct FieldApi;

#[derive(OpenApi)]
#[openapi(components(schemas(
    trigger_routes::dto::TriggerCreateDto,
    trigger_routes::dto::TriggerUpdateDto,
    trigger_routes::dto::TriggerDto,
    trigger_routes::dto::EvaluationDto,
    irrigo_core::WeatherSample,
    irrigo_core::WeatherMetric,
    irrigo_core::Comparison,
    irrigo_core::TriggerAction,
    crate::weather::WeatherReport,
)))]
struct TriggerApi;

/// Merges the component schemas of every api section into one document.
fn merged_api(specs: Vec<OpenApiSpec>) -> OpenApiSpec {
    let mut components = ComponentsBuilder::new();
    for spec in specs {
        if let Some(spec_components) = spec.components {
            for (key, value) in spec_components.schemas {
                components = components.schema(key, value);
            }
        }
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .components(Some(components.build()))
        .build()
}

/// GET api/doc/api.json
pub fn routes() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api = merged_api(vec![
        AccountApi::openapi(),
        FieldApi::openapi(),
        TriggerApi::openapi(),
    ]);

    warp::path!("api" / "doc" / "api.json")
        .and(warp::get())
        .map(move || warp::reply::json(&api))
        .boxed()
}
