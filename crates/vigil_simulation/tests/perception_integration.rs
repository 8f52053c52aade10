//! Perception integration test
//!
//! Headless App, каждый app.update() = ровно один fixed step (1/60 s).
//!
//! Проверяем:
//! - Enter/exit events и состояние PerceptionLoop
//! - Observable gates через реальный tick (delay, darkness, mover)
//! - Sortable requests с учётом видимости
//! - Деградация viewer без projection / с битым конфигом

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use vigil_simulation::observable::{MovementType, Mover};
use vigil_simulation::shared::{LAYER_DEFAULT, LAYER_OBSERVABLES, LAYER_SORTABLES};
use vigil_simulation::*;

/// Events, собранные за прогон
#[derive(Resource, Default)]
struct Recorded {
    became_visible: Vec<Entity>,
    left_view: Vec<Entity>,
    fired: Vec<(Entity, ObservationDirection)>,
    sort_changed: Vec<(Entity, bool)>,
}

fn record_events(
    mut recorded: ResMut<Recorded>,
    mut became_visible: EventReader<ObjectBecameVisible>,
    mut left_view: EventReader<ObjectLeftView>,
    mut fired: EventReader<ObservationFired>,
    mut sort_changed: EventReader<SortStateChanged>,
) {
    recorded
        .became_visible
        .extend(became_visible.read().map(|event| event.entity));
    recorded.left_view.extend(left_view.read().map(|event| event.entity));
    recorded
        .fired
        .extend(fired.read().map(|event| (event.entity, event.direction)));
    recorded
        .sort_changed
        .extend(sort_changed.read().map(|event| (event.entity, event.is_sorted)));
}

/// Helper: полный App с perception plugins и ручным временем
fn create_perception_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .init_resource::<Recorded>()
        .add_systems(FixedUpdate, record_events.after(PerceptionSet::Behaviors));
    app
}

/// Step 1: Rapier только регистрирует коллайдеры → первый tick пустой,
/// следующий tick (update_period 0.1 s) — на step 7
const WARM_UP_STEPS: usize = 10;

fn run_steps(app: &mut App, steps: usize) {
    for _ in 0..steps {
        app.update();
    }
}

fn facing(direction: Dir3) -> Transform {
    Transform::IDENTITY.looking_to(direction, Dir3::Y)
}

/// Viewer в origin: custom FOV 60°/60°, радиус 50
fn spawn_viewer(app: &mut App) -> Entity {
    app.world_mut()
        .spawn((
            Viewer::new(ViewerConfig::custom_fov(60.0, 60.0), None),
            facing(Dir3::Z),
            PerceptionLoop::<Observable>::new(),
            PerceptionLoop::<Sortable>::new(),
        ))
        .id()
}

fn spawn_observable(app: &mut App, position: Vec3, observable: Observable) -> Entity {
    app.world_mut()
        .spawn((
            observable,
            Collider::cuboid(0.5, 0.5, 0.5),
            collision_groups(LAYER_OBSERVABLES),
            Transform::from_translation(position),
        ))
        .id()
}

fn no_cooldown() -> ObservableConfig {
    ObservableConfig {
        cooldown_seconds: 0.0,
        ..Default::default()
    }
}

fn recorded(app: &App) -> &Recorded {
    app.world().resource::<Recorded>()
}

/// Test: объект перед камерой → enter, blocker → exit
#[test]
fn test_end_to_end_visibility_events() {
    let mut app = create_perception_app(42);
    let viewer = spawn_viewer(&mut app);
    let target = spawn_observable(
        &mut app,
        Vec3::new(0.0, 0.0, 10.0),
        Observable::new("Target", ObservableBehavior::EventsOnly).with_config(no_cooldown()),
    );
    let off_axis = spawn_observable(
        &mut app,
        Vec3::new(20.0, 0.0, 10.0),
        Observable::new("OffAxis", ObservableBehavior::EventsOnly).with_config(no_cooldown()),
    );

    run_steps(&mut app, WARM_UP_STEPS);

    assert_eq!(recorded(&app).became_visible, vec![target]);
    assert!(app.world().get::<Observable>(target).unwrap().is_currently_observed());
    assert!(!app.world().get::<Observable>(off_axis).unwrap().is_currently_observed());
    assert!(app
        .world()
        .get::<PerceptionLoop<Observable>>(viewer)
        .unwrap()
        .is_currently_visible(target));

    // Непрозрачная стена в (0, 0, 5)
    app.world_mut().spawn((
        Collider::cuboid(0.5, 0.5, 0.5),
        collision_groups(LAYER_DEFAULT),
        Transform::from_xyz(0.0, 0.0, 5.0),
    ));
    run_steps(&mut app, 10);

    assert_eq!(recorded(&app).left_view, vec![target]);
    assert_eq!(
        recorded(&app).fired,
        vec![
            (target, ObservationDirection::Observed),
            (target, ObservationDirection::Unobserved),
        ]
    );
    assert!(!app.world().get::<Observable>(target).unwrap().is_currently_observed());
}

/// Test: без изменений мира повторные tick'и не дают events
#[test]
fn test_stable_world_produces_no_repeat_events() {
    let mut app = create_perception_app(42);
    spawn_viewer(&mut app);
    spawn_observable(&mut app, Vec3::new(1.0, 0.0, 12.0), Observable::default());

    run_steps(&mut app, 120);

    assert_eq!(recorded(&app).became_visible.len(), 1);
    assert!(recorded(&app).left_view.is_empty());
    assert_eq!(recorded(&app).fired.len(), 1);
}

/// Test: delayed hook срабатывает через observed_delay, is_observed — сразу
#[test]
fn test_delayed_observed_hook() {
    let mut app = create_perception_app(42);
    spawn_viewer(&mut app);
    let target = spawn_observable(
        &mut app,
        Vec3::new(0.0, 0.0, 10.0),
        Observable::new("Delayed", ObservableBehavior::EventsOnly).with_config(ObservableConfig {
            observed_delay_seconds: 0.5,
            ..Default::default()
        }),
    );

    run_steps(&mut app, WARM_UP_STEPS);
    assert!(app.world().get::<Observable>(target).unwrap().is_currently_observed());
    assert!(recorded(&app).fired.is_empty());

    // +0.5 s (с запасом на один step)
    run_steps(&mut app, 32);
    assert_eq!(recorded(&app).fired, vec![(target, ObservationDirection::Observed)]);
}

/// Test: requires_darkness — пока свет включён, hook не срабатывает
#[test]
fn test_darkness_gate_through_light_switch() {
    let mut app = create_perception_app(42);
    let viewer = spawn_viewer(&mut app);
    let target = spawn_observable(
        &mut app,
        Vec3::new(0.0, 0.0, 10.0),
        Observable::new("Shadow", ObservableBehavior::EventsOnly).with_config(ObservableConfig {
            requires_darkness: true,
            cooldown_seconds: 0.0,
            ..Default::default()
        }),
    );

    run_steps(&mut app, 10);
    assert_eq!(recorded(&app).became_visible, vec![target]);
    assert!(recorded(&app).fired.is_empty());

    app.world_mut().send_event(LightCommand::Off);
    run_steps(&mut app, 2);
    assert!(!app.world().resource::<LightSwitch>().is_on);

    // Отвернуться и посмотреть снова
    *app.world_mut().get_mut::<Transform>(viewer).unwrap() = facing(Dir3::NEG_Z);
    run_steps(&mut app, 10);
    *app.world_mut().get_mut::<Transform>(viewer).unwrap() = facing(Dir3::Z);
    run_steps(&mut app, 10);

    assert_eq!(
        recorded(&app).fired,
        vec![
            (target, ObservationDirection::Unobserved),
            (target, ObservationDirection::Observed),
        ]
    );
}

/// Test: mover переезжает, когда на него перестают смотреть
#[test]
fn test_mover_relocates_when_unobserved() {
    let mut app = create_perception_app(42);
    let viewer = spawn_viewer(&mut app);

    let destination = Vec3::new(0.0, 0.0, -15.0);
    let mover = Mover::new(vec![destination], MovementType::Instant);
    let target = spawn_observable(
        &mut app,
        Vec3::new(0.0, 0.0, 10.0),
        Observable::new("Mannequin", ObservableBehavior::Mover(mover)).with_config(no_cooldown()),
    );

    run_steps(&mut app, WARM_UP_STEPS);
    assert_eq!(
        app.world().get::<Transform>(target).unwrap().translation,
        Vec3::new(0.0, 0.0, 10.0)
    );

    // Отворачиваемся → манекен переезжает за спину
    *app.world_mut().get_mut::<Transform>(viewer).unwrap() = facing(Dir3::X);
    run_steps(&mut app, 10);

    assert_eq!(app.world().get::<Transform>(target).unwrap().translation, destination);
    assert!(recorded(&app).left_view.contains(&target));
}

/// Test: despawned видимый объект всё равно даёт ObjectLeftView
#[test]
fn test_despawned_entity_reported_as_left() {
    let mut app = create_perception_app(42);
    let viewer = spawn_viewer(&mut app);
    let target = spawn_observable(&mut app, Vec3::new(0.0, 0.0, 10.0), Observable::default());

    run_steps(&mut app, WARM_UP_STEPS);
    app.world_mut().despawn(target);
    run_steps(&mut app, 10);

    assert_eq!(recorded(&app).left_view, vec![target]);
    assert!(!app
        .world()
        .get::<PerceptionLoop<Observable>>(viewer)
        .unwrap()
        .is_currently_visible(target));
}

/// Test: SortRequest принимается только для видимых sortables
#[test]
fn test_sort_requests_respect_visibility() {
    let mut app = create_perception_app(42);
    spawn_viewer(&mut app);

    let mut spawn_sortable = |position: Vec3, name: &str| {
        app.world_mut()
            .spawn((
                Sortable::new(name),
                Collider::cuboid(0.2, 0.2, 0.2),
                collision_groups(LAYER_SORTABLES),
                Transform::from_translation(position),
            ))
            .id()
    };
    let visible = spawn_sortable(Vec3::new(0.0, 0.0, 5.0), "Mug");
    let behind = spawn_sortable(Vec3::new(0.0, 0.0, -5.0), "Plate");

    run_steps(&mut app, WARM_UP_STEPS);
    assert!(app.world().get::<Sortable>(visible).unwrap().in_camera_range);
    assert!(!app.world().get::<Sortable>(behind).unwrap().in_camera_range);

    app.world_mut().send_event(SortRequest { entity: visible });
    app.world_mut().send_event(SortRequest { entity: behind });
    run_steps(&mut app, 2);

    assert!(app.world().get::<Sortable>(visible).unwrap().is_sorted);
    assert!(!app.world().get::<Sortable>(behind).unwrap().is_sorted);
    assert_eq!(recorded(&app).sort_changed, vec![(visible, true)]);

    // Повторный запрос → toggle обратно
    app.world_mut().send_event(SortRequest { entity: visible });
    run_steps(&mut app, 2);
    assert!(!app.world().get::<Sortable>(visible).unwrap().is_sorted);
}

/// Test: viewer без projection и без custom FOV продолжает работать
#[test]
fn test_viewer_without_projection_degrades() {
    let mut app = create_perception_app(42);

    let config = ViewerConfig {
        derive_fov_from_lens: false,
        ..Default::default()
    };
    app.world_mut().spawn((
        Viewer::new(config, None),
        facing(Dir3::Z),
        PerceptionLoop::<Observable>::new(),
    ));
    // Позади: frustum/viewport проверить нечем → виден
    let behind = spawn_observable(&mut app, Vec3::new(0.0, 0.0, -10.0), Observable::default());

    run_steps(&mut app, WARM_UP_STEPS);

    assert_eq!(recorded(&app).became_visible, vec![behind]);
}

/// Test: битый конфиг → viewer пропускается, остальные работают
#[test]
fn test_invalid_viewer_config_is_skipped() {
    let mut app = create_perception_app(42);

    let mut broken = ViewerConfig::custom_fov(60.0, 60.0);
    broken.max_detection_distance = -1.0;
    app.world_mut().spawn((
        Viewer::new(broken, None),
        facing(Dir3::Z),
        PerceptionLoop::<Observable>::new(),
    ));
    spawn_observable(&mut app, Vec3::new(0.0, 0.0, 10.0), Observable::default());

    run_steps(&mut app, 10);

    assert!(recorded(&app).became_visible.is_empty());
}

/// Test: битый ObservableConfig → объект не виден и hooks не срабатывают, пока конфиг не починят
#[test]
fn test_invalid_observable_config_skipped_until_healed() {
    let mut app = create_perception_app(42);
    spawn_viewer(&mut app);
    let target = spawn_observable(
        &mut app,
        Vec3::new(0.0, 0.0, 10.0),
        Observable::new("Broken", ObservableBehavior::EventsOnly).with_config(ObservableConfig {
            cooldown_seconds: f32::NAN,
            ..Default::default()
        }),
    );

    run_steps(&mut app, WARM_UP_STEPS + 20);
    assert!(recorded(&app).became_visible.is_empty());
    assert!(recorded(&app).fired.is_empty());
    assert!(!app.world().get::<Observable>(target).unwrap().is_currently_observed());

    app.world_mut().get_mut::<Observable>(target).unwrap().config.cooldown_seconds = 0.0;
    run_steps(&mut app, 10);

    assert_eq!(recorded(&app).became_visible, vec![target]);
    assert_eq!(recorded(&app).fired, vec![(target, ObservationDirection::Observed)]);
}

/// Test: отрицательная задержка не превращается в мгновенный trigger
#[test]
fn test_negative_delay_never_fires() {
    let mut app = create_perception_app(42);
    spawn_viewer(&mut app);
    let target = spawn_observable(
        &mut app,
        Vec3::new(0.0, 0.0, 10.0),
        Observable::new("Eager", ObservableBehavior::EventsOnly).with_config(ObservableConfig {
            observed_delay_seconds: -1.0,
            ..Default::default()
        }),
    );

    run_steps(&mut app, WARM_UP_STEPS + 20);

    assert!(recorded(&app).fired.is_empty());
    assert!(!app.world().get::<Observable>(target).unwrap().state.has_pending());
}

/// Test: entity одновременно Viewer и Observable не становится целью другого viewer
#[test]
fn test_tracked_viewer_is_not_a_target() {
    let mut app = create_perception_app(42);
    spawn_viewer(&mut app);
    let hybrid = app
        .world_mut()
        .spawn((
            Viewer::new(ViewerConfig::custom_fov(60.0, 60.0), None),
            PerceptionLoop::<Observable>::new(),
            Observable::new("Hybrid", ObservableBehavior::EventsOnly),
            Collider::cuboid(0.5, 0.5, 0.5),
            collision_groups(LAYER_OBSERVABLES),
            Transform::from_xyz(0.0, 0.0, 10.0).looking_to(Dir3::NEG_Z, Dir3::Y),
        ))
        .id();

    run_steps(&mut app, WARM_UP_STEPS + 20);

    assert!(recorded(&app).became_visible.is_empty());
    assert!(!app.world().get::<Observable>(hybrid).unwrap().is_currently_observed());
}

/// Test: highlight_visible = false → in_camera_range не трогаем, сортировка по видимости работает
#[test]
fn test_highlight_visible_off_keeps_camera_range() {
    let mut app = create_perception_app(42);
    app.insert_resource(SortingRules {
        highlight_visible: false,
        ..Default::default()
    });
    spawn_viewer(&mut app);
    let mug = app
        .world_mut()
        .spawn((
            Sortable::new("Mug"),
            Collider::cuboid(0.2, 0.2, 0.2),
            collision_groups(LAYER_SORTABLES),
            Transform::from_xyz(0.0, 0.0, 5.0),
        ))
        .id();

    run_steps(&mut app, WARM_UP_STEPS);
    assert!(!app.world().get::<Sortable>(mug).unwrap().in_camera_range);

    app.world_mut().send_event(SortRequest { entity: mug });
    run_steps(&mut app, 2);
    assert!(app.world().get::<Sortable>(mug).unwrap().is_sorted);
}
