//! Headless симуляция VIGIL
//!
//! Маленькая сцена: камера медленно поворачивается, манекен двигается за спиной,
//! кружка на столе, стена. Печатает переходы видимости.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use vigil_simulation::observable::{MovementType, Mover};
use vigil_simulation::shared::{LAYER_DEFAULT, LAYER_OBSERVABLES, LAYER_SORTABLES, LAYER_VIEWERS, MASK_OCCLUSION};
use vigil_simulation::{
    collision_groups, create_headless_app, Collider, LightCommand, ObjectBecameVisible, ObjectLeftView, Observable, ObservableBehavior,
    ObservableConfig, ObservationFired, PerceptionLoop, PerceptionSet, PerspectiveLens, SimulationPlugin, SoundCue,
    Sortable, Viewer, ViewerConfig,
};

/// Градусов в секунду
const TURN_RATE: f32 = 30.0;

fn main() {
    let seed = 42;
    println!("Starting VIGIL headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .add_systems(Startup, spawn_scene)
        .add_systems(FixedUpdate, turn_viewer.in_set(PerceptionSet::Environment))
        .add_systems(FixedUpdate, print_transitions.after(PerceptionSet::Behaviors));

    // 20 секунд симуляции
    for tick in 0..1200 {
        if tick == 600 {
            app.world_mut().send_event(LightCommand::Off);
        }
        app.update();
    }

    println!("Simulation complete!");
}

fn spawn_scene(mut commands: Commands) {
    let config = ViewerConfig {
        candidate_layers: LAYER_OBSERVABLES.with(LAYER_SORTABLES),
        occlusion_layers: MASK_OCCLUSION,
        ..Default::default()
    };

    commands.spawn((
        Name::new("Player"),
        Viewer::new(config, Some(PerspectiveLens::default())),
        Collider::cuboid(0.3, 0.9, 0.3),
        collision_groups(LAYER_VIEWERS),
        Transform::IDENTITY.looking_to(Dir3::Z, Dir3::Y),
        PerceptionLoop::<Observable>::new(),
        PerceptionLoop::<Sortable>::new(),
    ));

    let mut mover = Mover::new(
        vec![Vec3::new(-6.0, 0.0, 12.0), Vec3::new(6.0, 0.0, 12.0), Vec3::new(0.0, 0.0, -8.0)],
        MovementType::Smooth,
    );
    mover.movement_sounds = vec!["footsteps_01".to_string(), "footsteps_02".to_string()];
    mover.move_effect = true;

    commands.spawn((
        Name::new("Mannequin"),
        Observable::new("Mannequin", ObservableBehavior::Mover(mover)).with_config(ObservableConfig {
            cooldown_seconds: 2.0,
            unobserved_delay_seconds: 0.5,
            ..Default::default()
        }),
        Collider::cuboid(0.4, 0.9, 0.4),
        collision_groups(LAYER_OBSERVABLES),
        Transform::from_xyz(0.0, 0.0, 12.0),
    ));

    commands.spawn((
        Name::new("Mug"),
        Sortable::new("Mug"),
        Collider::cuboid(0.1, 0.1, 0.1),
        collision_groups(LAYER_SORTABLES),
        Transform::from_xyz(2.0, -0.5, 6.0),
    ));

    commands.spawn((
        Name::new("Wall"),
        Collider::cuboid(3.0, 2.0, 0.1),
        collision_groups(LAYER_DEFAULT),
        Transform::from_xyz(8.0, 0.0, 8.0),
    ));
}

fn turn_viewer(time: Res<Time>, mut viewers: Query<&mut Transform, With<Viewer>>) {
    for mut transform in viewers.iter_mut() {
        transform.rotate_y((TURN_RATE * time.delta_secs()).to_radians());
    }
}

fn print_transitions(
    time: Res<Time>,
    names: Query<&Name>,
    mut became_visible: EventReader<ObjectBecameVisible>,
    mut left_view: EventReader<ObjectLeftView>,
    mut fired: EventReader<ObservationFired>,
    mut sounds: EventReader<SoundCue>,
) {
    let now = time.elapsed_secs();
    let name_of = |entity: Entity| {
        names
            .get(entity)
            .map(|name| name.as_str().to_string())
            .unwrap_or_else(|_| format!("{:?}", entity))
    };

    for event in became_visible.read() {
        println!("[{:>6.2}s] + {} ({:?})", now, name_of(event.entity), event.capability);
    }
    for event in left_view.read() {
        println!("[{:>6.2}s] - {} ({:?})", now, name_of(event.entity), event.capability);
    }
    for event in fired.read() {
        println!("[{:>6.2}s] * {} {:?}", now, name_of(event.entity), event.direction);
    }
    for event in sounds.read() {
        println!("[{:>6.2}s] ♪ {} '{}'", now, name_of(event.entity), event.clip);
    }
}
