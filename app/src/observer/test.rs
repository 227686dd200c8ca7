use std::sync::Arc;

use irrigo_core::{Comparison, TriggerAction, WeatherMetric, WeatherSample};

use super::trigger::TriggerPatch;
use super::*;
use crate::auth::mock::StaticAuthenticator;
use crate::error::ObserverError;
use crate::models::{memory::MemoryStore, trigger::NewTrigger};
use crate::weather::mock::StaticWeather;

fn build_mocked_observer(weather: StaticWeather) -> Arc<ConcurrentObserver> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    ConcurrentObserver::new(store, Arc::new(weather), Arc::new(StaticAuthenticator))
}

async fn register(observer: &Arc<ConcurrentObserver>, name: &str) -> i32 {
    AccountObserver::new(observer.clone())
        .signup(name, &format!("{}@example.org", name), "secret-pw")
        .await
        .unwrap()
        .id()
}

fn heat_rule() -> NewTrigger {
    NewTrigger {
        name: "Heat".to_owned(),
        weather_metric: WeatherMetric::Temperature,
        condition: Comparison::GreaterThan,
        threshold: 30.0,
        action: TriggerAction::PowerOnAllPumps,
        is_active: true,
    }
}

fn temperature(value: f64) -> WeatherSample {
    WeatherSample {
        temperature: Some(value),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_checkpoint_has_readings_and_pump() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();

    // Execute
    let checkpoint = fields
        .create_checkpoint(user, field.id(), "CP-1")
        .await
        .unwrap();

    // Validate
    let views = fields.list(user).await.unwrap();
    assert_eq!(1, views.len());
    assert_eq!("Dublin", views[0].field.city());
    let view = &views[0].checkpoints[0];
    assert_eq!(checkpoint.id(), view.checkpoint.id());
    assert_eq!(4, view.readings.len());
    let pump = view.pump.as_ref().unwrap();
    assert_eq!("Pump CP-1", pump.name());
    assert!(!pump.is_on());
}

#[tokio::test]
async fn test_field_validation() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    fields.create(user, "North", Some("Cork")).await.unwrap();

    // Execute
    let empty = fields.create(user, "   ", None).await;
    let duplicate = fields.create(user, " North ", None).await;
    let too_long = fields.create(user, &"x".repeat(256), None).await;

    // Validate
    assert!(matches!(empty, Err(ObserverError::Validation(_))));
    assert!(matches!(duplicate, Err(ObserverError::User(_))));
    assert!(matches!(too_long, Err(ObserverError::Validation(_))));
}

#[tokio::test]
async fn test_update_field() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let north = fields.create(user, "North", None).await.unwrap();
    fields.create(user, "South", None).await.unwrap();

    // Execute
    let updated = fields
        .update(user, north.id(), None, Some("Galway"))
        .await
        .unwrap();
    let clash = fields.update(user, north.id(), Some("South"), None).await;

    // Validate
    assert_eq!("North", updated.name());
    assert_eq!("Galway", updated.city());
    assert!(matches!(clash, Err(ObserverError::User(_))));
}

#[tokio::test]
async fn test_user_isolation() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let alice = register(&observer, "alice").await;
    let mallory = register(&observer, "mallory").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(alice, "North", None).await.unwrap();
    let checkpoint = fields
        .create_checkpoint(alice, field.id(), "CP-1")
        .await
        .unwrap();
    let trigger = triggers
        .create(alice, field.id(), heat_rule())
        .await
        .unwrap();
    let pump_id = pumps.list(alice).await.unwrap()[0].id();

    // Execute & Validate
    assert!(fields.list(mallory).await.unwrap().is_empty());
    assert!(pumps.list(mallory).await.unwrap().is_empty());
    assert!(triggers.list(mallory, None).await.unwrap().is_empty());
    assert!(matches!(
        fields.update(mallory, field.id(), Some("Mine"), None).await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        fields.delete(mallory, field.id()).await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        fields.create_checkpoint(mallory, field.id(), "CP-2").await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        fields
            .rename_checkpoint(mallory, checkpoint.id(), Some("x"))
            .await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        fields.delete_checkpoint(mallory, checkpoint.id()).await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        pumps.control(mallory, pump_id, true).await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        triggers.create(mallory, field.id(), heat_rule()).await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        triggers
            .update(mallory, trigger.id(), TriggerPatch::default())
            .await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        triggers
            .evaluate(mallory, trigger.id(), &temperature(40.0))
            .await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(matches!(
        triggers.delete(mallory, trigger.id()).await,
        Err(ObserverError::NotFound(_))
    ));
    assert!(!pumps.list(alice).await.unwrap()[0].is_on());
}

#[tokio::test]
async fn test_delete_field_cascades() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    let checkpoint = fields
        .create_checkpoint(user, field.id(), "CP-1")
        .await
        .unwrap();
    triggers.create(user, field.id(), heat_rule()).await.unwrap();

    // Execute
    fields.delete(user, field.id()).await.unwrap();

    // Validate
    assert!(PumpObserver::new(observer.clone())
        .list(user)
        .await
        .unwrap()
        .is_empty());
    assert!(triggers.list(user, None).await.unwrap().is_empty());
    assert!(observer
        .store
        .readings(checkpoint.id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_pump_control() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    fields
        .create_checkpoint(user, field.id(), "CP-1")
        .await
        .unwrap();
    let pump_id = pumps.list(user).await.unwrap()[0].id();

    // Execute
    let on = pumps.control(user, pump_id, true).await.unwrap();
    let off = pumps.control(user, pump_id, false).await.unwrap();

    // Validate
    assert!(on.is_on());
    assert!(on.last_activated().is_some());
    assert!(!off.is_on());
    assert_eq!(on.last_activated(), off.last_activated());
    assert!(matches!(
        pumps.control(user, -1, true).await,
        Err(ObserverError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_evaluate_fires_for_own_field_only() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let north = fields.create(user, "North", None).await.unwrap();
    let south = fields.create(user, "South", None).await.unwrap();
    for name in ["CP-1", "CP-2"] {
        fields.create_checkpoint(user, north.id(), name).await.unwrap();
    }
    fields.create_checkpoint(user, south.id(), "CP-3").await.unwrap();
    let trigger = triggers.create(user, north.id(), heat_rule()).await.unwrap();

    // Execute
    let outcome = triggers
        .evaluate(user, trigger.id(), &temperature(32.0))
        .await
        .unwrap();

    // Validate
    assert!(outcome.triggered);
    assert_eq!(Some(32.0), outcome.weather_value);
    assert_eq!(30.0, outcome.threshold);
    assert_eq!("Action power_on_all_pumps executed for 2 pumps", outcome.message);
    let views = fields.list(user).await.unwrap();
    for view in views {
        let expected = view.field.id() == north.id();
        for checkpoint in view.checkpoints {
            assert_eq!(expected, checkpoint.pump.unwrap().is_on());
        }
    }
    assert_eq!(3, pumps.list(user).await.unwrap().len());
    let stored = triggers.list(user, Some(north.id())).await.unwrap();
    assert!(stored[0].last_triggered().is_some());
}

#[tokio::test]
async fn test_evaluate_condition_not_met() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    fields.create_checkpoint(user, field.id(), "CP-1").await.unwrap();
    let trigger = triggers.create(user, field.id(), heat_rule()).await.unwrap();

    // Execute
    let outcome = triggers
        .evaluate(user, trigger.id(), &temperature(28.0))
        .await
        .unwrap();

    // Validate
    assert!(!outcome.triggered);
    assert_eq!(Some(28.0), outcome.weather_value);
    assert_eq!("Condition not met", outcome.message);
    assert!(!pumps.list(user).await.unwrap()[0].is_on());
    let stored = triggers.list(user, None).await.unwrap();
    assert!(stored[0].last_triggered().is_none());
}

#[tokio::test]
async fn test_evaluate_inactive_never_fires() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    fields.create_checkpoint(user, field.id(), "CP-1").await.unwrap();
    let trigger = triggers.create(user, field.id(), heat_rule()).await.unwrap();
    triggers
        .update(
            user,
            trigger.id(),
            TriggerPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Execute
    let outcome = triggers
        .evaluate(user, trigger.id(), &temperature(45.0))
        .await
        .unwrap();

    // Validate
    assert!(!outcome.triggered);
    assert_eq!("Trigger is not active", outcome.message);
    assert!(!pumps.list(user).await.unwrap()[0].is_on());
}

#[tokio::test]
async fn test_evaluate_sees_task_changes_after_read() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    fields.create_checkpoint(user, field.id(), "CP-1").await.unwrap();
    let trigger = triggers.create(user, field.id(), heat_rule()).await.unwrap();
    let read_before = observer.store.trigger(user, trigger.id()).await.unwrap().unwrap();
    assert!(read_before.is_active());
    triggers
        .update(
            user,
            trigger.id(),
            TriggerPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Execute
    let firing = observer
        .store
        .evaluate_trigger(user, read_before.id(), &temperature(45.0), chrono::Utc::now())
        .await
        .unwrap()
        .unwrap();

    // Validate
    assert_eq!(irrigo_core::Evaluation::Inactive, firing.evaluation.unwrap());
    assert_eq!(0, firing.switched);
    assert!(!pumps.list(user).await.unwrap()[0].is_on());
    let stored = triggers.list(user, None).await.unwrap();
    assert!(stored[0].last_triggered().is_none());
}

#[tokio::test]
async fn test_evaluate_deleted_task() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    fields.create_checkpoint(user, field.id(), "CP-1").await.unwrap();
    let trigger = triggers.create(user, field.id(), heat_rule()).await.unwrap();
    triggers.delete(user, trigger.id()).await.unwrap();

    // Execute
    let res = triggers
        .evaluate(user, trigger.id(), &temperature(45.0))
        .await;

    // Validate
    assert!(matches!(res, Err(ObserverError::NotFound(_))));
    assert!(!pumps.list(user).await.unwrap()[0].is_on());
}

#[tokio::test]
async fn test_evaluate_power_off_and_missing_metric() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let fields = FieldObserver::new(observer.clone());
    let pumps = PumpObserver::new(observer.clone());
    let triggers = TriggerObserver::new(observer.clone());
    let field = fields.create(user, "North", None).await.unwrap();
    fields.create_checkpoint(user, field.id(), "CP-1").await.unwrap();
    let pump_id = pumps.list(user).await.unwrap()[0].id();
    pumps.control(user, pump_id, true).await.unwrap();
    let trigger = triggers
        .create(
            user,
            field.id(),
            NewTrigger {
                name: "Wind".to_owned(),
                weather_metric: WeatherMetric::WindSpeed,
                condition: Comparison::Equals,
                threshold: 12.5,
                action: TriggerAction::PowerOffAllPumps,
                is_active: true,
            },
        )
        .await
        .unwrap();

    // Execute
    let missing = triggers
        .evaluate(user, trigger.id(), &temperature(12.5))
        .await;
    let wind = WeatherSample {
        wind_speed: Some(12.5),
        ..Default::default()
    };
    let outcome = triggers.evaluate(user, trigger.id(), &wind).await.unwrap();

    // Validate
    assert!(matches!(missing, Err(ObserverError::User(_))));
    assert!(outcome.triggered);
    assert!(!pumps.list(user).await.unwrap()[0].is_on());
}

#[tokio::test]
async fn test_trigger_validation() {
    let observer = build_mocked_observer(StaticWeather::sunny());
    let user = register(&observer, "farmer").await;
    let field = FieldObserver::new(observer.clone())
        .create(user, "North", None)
        .await
        .unwrap();
    let triggers = TriggerObserver::new(observer.clone());

    let res = triggers
        .create(
            user,
            field.id(),
            NewTrigger {
                threshold: f64::NAN,
                ..heat_rule()
            },
        )
        .await;

    assert!(matches!(res, Err(ObserverError::Validation(_))));
}

#[tokio::test]
async fn test_signup() {
    // Prepare
    let observer = build_mocked_observer(StaticWeather::sunny());
    let accounts = AccountObserver::new(observer.clone());
    let user_id = register(&observer, "farmer").await;

    // Execute & Validate
    assert_eq!("farmer", accounts.me(user_id).await.unwrap().username());
    assert!(matches!(
        accounts.signup("farmer", "other@example.org", "secret-pw").await,
        Err(ObserverError::User(_))
    ));
    assert!(matches!(
        accounts.signup("other", "farmer@example.org", "secret-pw").await,
        Err(ObserverError::User(_))
    ));
    assert!(matches!(
        accounts.signup("ab", "ab@example.org", "secret-pw").await,
        Err(ObserverError::Validation(_))
    ));
    assert!(matches!(
        accounts.signup("other", "no-at-sign", "secret-pw").await,
        Err(ObserverError::Validation(_))
    ));
    assert!(matches!(
        accounts.signup("other", "other@example.org", "12345").await,
        Err(ObserverError::Validation(_))
    ));
}

#[tokio::test]
async fn test_weather() {
    let up = TriggerObserver::new(build_mocked_observer(StaticWeather::sunny()));
    let down = TriggerObserver::new(build_mocked_observer(StaticWeather::down()));

    assert_eq!("Cork", up.weather("Cork").await.unwrap().city);
    assert!(matches!(
        down.weather("Cork").await,
        Err(ObserverError::Unavailable(_))
    ));
}
