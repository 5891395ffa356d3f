// End-to-end interaction scenarios driven through GlobeEngine, plus property tests over random
// event interleavings.

use globe_core::{
    DataRow, GlobeConfig, GlobeEngine, InteractionMode, Rotation, ScreenPoint, Timestamp,
    ViewportSize,
};
use proptest::prelude::*;

fn ms(value: u64) -> Timestamp {
    Timestamp::from_micros(value * 1000)
}

fn rows() -> Vec<DataRow> {
    [(48.85, 2.35, "Paris"), (-33.87, 151.21, "Sydney"), (40.71, -74.0, "New York")]
        .iter()
        .map(|&(lat, lon, label)| DataRow {
            latitude: lat,
            longitude: lon,
            label: label.to_string(),
            size_value: Some(lat.abs()),
            color_value: None,
        })
        .collect()
}

/// 400x400 viewport: base radius 160, centre (200, 200).
fn engine_with(rotation_speed: f64) -> GlobeEngine {
    let config = GlobeConfig {
        rotation_speed,
        ..Default::default()
    };
    GlobeEngine::initialize(ViewportSize::new(400.0, 400.0), rows(), Vec::new(), config, ms(0))
        .unwrap()
}

const CENTER: ScreenPoint = ScreenPoint { x: 200.0, y: 200.0 };

#[test]
fn drag_stops_auto_rotation() {
    let mut engine = engine_with(20.0);
    engine.frame(ms(100));
    assert_eq!(engine.mode(), InteractionMode::AutoRotating);

    assert!(engine.pointer_down(CENTER, 0));
    let held = engine.transform().rotation();
    // No rotation tick may touch the transform while dragging.
    for t in (200..2000).step_by(16) {
        engine.frame(ms(t));
        assert_eq!(engine.transform().rotation(), held);
    }

    assert!(engine.pointer_up(ms(2000)));
    assert_eq!(engine.mode(), InteractionMode::AutoRotating);
    engine.frame(ms(2500));
    assert!((engine.transform().rotation().lon - held.lon - 10.0).abs() < 1e-9);
}

#[test]
fn drag_outside_disk_is_ignored() {
    let mut engine = engine_with(20.0);
    assert!(!engine.pointer_down(ScreenPoint::new(5.0, 5.0), 0));
    assert!(!engine.pointer_down(CENTER, 2));
    assert_eq!(engine.mode(), InteractionMode::AutoRotating);
}

#[test]
fn drag_sensitivity_scales_with_zoom() {
    let mut engine = engine_with(0.0);
    let scale = engine.transform().scale();
    engine.pointer_down(CENTER, 0);
    engine.pointer_move(ScreenPoint::new(210.0, 190.0));
    let rotation = engine.transform().rotation();
    let k = 75.0 / scale;
    assert!((rotation.lon - 10.0 * k).abs() < 1e-9);
    assert!((rotation.lat - (-25.0 + 10.0 * k)).abs() < 1e-9);
}

#[test]
fn repeated_wheel_respects_max_scale() {
    // 500x500 viewport: base radius 200, bounds [100, 500].
    let mut engine = GlobeEngine::initialize(
        ViewportSize::new(500.0, 500.0),
        Vec::new(),
        Vec::new(),
        GlobeConfig::default(),
        ms(0),
    )
    .unwrap();
    let bounds = engine.transform().bounds();
    assert_eq!(bounds.min_scale, 100.0);
    assert_eq!(bounds.max_scale, 500.0);

    for i in 0..50 {
        engine.wheel(-100.0, ms(i));
        assert!(engine.transform().scale() <= 500.0);
    }
    assert_eq!(engine.transform().scale(), 500.0);
    assert_eq!(engine.current_zoom_percentage(), 250);
    // Wheel zoom is momentary.
    assert_eq!(engine.mode(), InteractionMode::AutoRotating);

    for i in 0..50 {
        engine.wheel(100.0, ms(100 + i));
    }
    assert_eq!(engine.transform().scale(), 100.0);
}

#[test]
fn button_zoom_tweens_then_resumes() {
    let mut engine = engine_with(20.0);
    let start = engine.transform().scale();
    engine.zoom_in(ms(0));
    assert_eq!(engine.mode(), InteractionMode::ButtonZooming);

    engine.frame(ms(125));
    let mid = engine.transform().scale();
    assert!(mid > start && mid < start * 1.2);

    engine.frame(ms(250));
    assert!((engine.transform().scale() - start * 1.2).abs() < 1e-9);
    assert_eq!(engine.mode(), InteractionMode::AutoRotating);
}

#[test]
fn button_zoom_clamps_at_bounds() {
    let mut engine = engine_with(0.0);
    let max = engine.transform().bounds().max_scale;
    for i in 0..10 {
        engine.zoom_in(ms(i * 300));
        engine.frame(ms(i * 300 + 250));
        assert!(engine.transform().scale() <= max);
    }
    assert_eq!(engine.transform().scale(), max);
    assert_eq!(engine.mode(), InteractionMode::Idle);
}

#[test]
fn reset_view_restores_defaults() {
    let mut engine = engine_with(20.0);
    engine.pointer_down(CENTER, 0);
    engine.pointer_move(ScreenPoint::new(320.0, 120.0));
    engine.pointer_up(ms(10));
    engine.wheel(-1.0, ms(20));
    engine.wheel(-1.0, ms(30));
    engine.frame(ms(500));

    engine.reset_view(ms(1000));
    assert_eq!(engine.mode(), InteractionMode::ResettingView);
    engine.frame(ms(1500));
    assert_eq!(engine.mode(), InteractionMode::ResettingView);
    engine.frame(ms(2000));

    let transform = engine.transform();
    let rotation = transform.rotation();
    assert!(rotation.lon.abs() < 1e-9);
    assert!((rotation.lat + 25.0).abs() < 1e-9);
    assert!((transform.scale() - 1.25 * 160.0).abs() < 1e-9);
    assert_eq!(engine.mode(), InteractionMode::AutoRotating);
}

#[test]
fn reset_view_without_rotation_settles_idle() {
    let mut engine = engine_with(0.0);
    engine.reset_view(ms(0));
    engine.frame(ms(1000));
    assert_eq!(engine.mode(), InteractionMode::Idle);
    assert_eq!(engine.transform().rotation(), Rotation::new(0.0, -25.0, 0.0));
}

#[test]
fn drag_cancels_reset_tween() {
    let mut engine = engine_with(20.0);
    engine.wheel(-1.0, ms(0));
    engine.frame(ms(400));
    engine.reset_view(ms(500));
    engine.frame(ms(800));
    assert!(engine.transform().scale() > 200.0 && engine.transform().scale() < 220.0);
    assert!(engine.pointer_down(CENTER, 0));
    let held = engine.transform();
    let (rotation, scale) = (held.rotation(), held.scale());
    engine.frame(ms(1200));
    assert_eq!(engine.transform().rotation(), rotation);
    assert_eq!(engine.transform().scale(), scale);
    assert_eq!(engine.mode(), InteractionMode::Dragging);
}

#[test]
fn resize_keeps_relative_zoom() {
    let mut engine = engine_with(0.0);
    engine.wheel(-1.0, ms(0));
    assert_eq!(engine.current_zoom_percentage(), 138);

    engine.resize(ViewportSize::new(1000.0, 800.0), ms(10));
    assert_eq!(engine.transform().bounds().base_radius, 320.0);
    assert_eq!(engine.current_zoom_percentage(), 138);
    let frame = engine.frame(ms(20)).unwrap();
    assert_eq!((frame.disk.cx, frame.disk.cy), (500.0, 400.0));
}

#[test]
fn resize_during_zoom_lands_on_target() {
    let mut engine = engine_with(0.0);
    engine.zoom_out(ms(0));
    engine.frame(ms(100));
    engine.resize(ViewportSize::new(800.0, 800.0), ms(120));
    // 1.25 / 1.2 of the new base radius, and no tween left to finish.
    assert!((engine.transform().scale() - 320.0 * 1.25 / 1.2).abs() < 1e-9);
    assert_eq!(engine.mode(), InteractionMode::Idle);
}

#[test]
fn render_is_idempotent_between_mutations() {
    let mut engine = engine_with(20.0);
    engine.frame(ms(700));
    assert_eq!(engine.render(ms(700)), engine.render(ms(700)));
    assert_eq!(engine.last_frame().cloned(), engine.render(ms(700)));
}

#[test]
fn hover_shows_tooltip_at_offset() {
    let mut engine = engine_with(0.0);
    engine.point_enter(1, ScreenPoint::new(120.0, 80.0), ms(0));
    let frame = engine.frame(ms(200)).unwrap();
    assert!(frame.tooltip.visible);
    assert_eq!(frame.tooltip.position, ScreenPoint::new(130.0, 70.0));
    assert_eq!(frame.tooltip.content.title, "Sydney");
    assert_eq!(frame.tooltip.content.lines, vec!["Value: 33.87"]);

    engine.point_leave(1, ms(200));
    let frame = engine.frame(ms(700)).unwrap();
    assert!(!frame.tooltip.visible);
}

#[derive(Debug, Clone)]
enum Action {
    Down(f64, f64),
    Move(f64, f64),
    Up,
    Wheel(f64),
    ZoomIn,
    ZoomOut,
    Reset,
    Frame(u64),
    Resize(f64, f64),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0.0..400.0f64, 0.0..400.0f64).prop_map(|(x, y)| Action::Down(x, y)),
        (-200.0..600.0f64, -200.0..600.0f64).prop_map(|(x, y)| Action::Move(x, y)),
        Just(Action::Up),
        prop_oneof![Just(-120.0), Just(120.0), -5.0..5.0f64].prop_map(Action::Wheel),
        Just(Action::ZoomIn),
        Just(Action::ZoomOut),
        Just(Action::Reset),
        (1u64..600).prop_map(Action::Frame),
        (0.0..1200.0f64, 0.0..1200.0f64).prop_map(|(w, h)| Action::Resize(w, h)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Exactly one owner at every step, scale within bounds, latitude within [-90, 90].
    #[test]
    fn invariants_hold_under_any_interleaving(
        speed in prop_oneof![Just(0.0), 1.0..90.0f64],
        actions in prop::collection::vec(action(), 1..60),
    ) {
        let mut engine = engine_with(speed);
        let mut now = 0u64;
        for action in actions {
            now += 7;
            let at = ms(now);
            match action {
                Action::Down(x, y) => { engine.pointer_down(ScreenPoint::new(x, y), 0); }
                Action::Move(x, y) => { engine.pointer_move(ScreenPoint::new(x, y)); }
                Action::Up => { engine.pointer_up(at); }
                Action::Wheel(dy) => { engine.wheel(dy, at); }
                Action::ZoomIn => { engine.zoom_in(at); }
                Action::ZoomOut => { engine.zoom_out(at); }
                Action::Reset => { engine.reset_view(at); }
                Action::Frame(dt) => {
                    now += dt;
                    engine.frame(ms(now));
                }
                Action::Resize(w, h) => engine.resize(ViewportSize::new(w, h), at),
            }

            prop_assert!(engine.coordinator().owner_is_exclusive(), "mode {:?}", engine.mode());
            prop_assert_ne!(engine.mode(), InteractionMode::WheelZooming);

            let transform = engine.transform();
            let bounds = transform.bounds();
            prop_assert!(transform.scale() >= bounds.min_scale - 1e-9);
            prop_assert!(transform.scale() <= bounds.max_scale + 1e-9);
            let rotation = transform.rotation();
            prop_assert!((-90.0..=90.0).contains(&rotation.lat));
            prop_assert!((-180.0..180.0).contains(&rotation.lon));
        }
    }
}
