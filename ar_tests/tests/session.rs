//! End-to-end session flow: camera, events, graph, and path search
//! working together the way the mobile host drives them.

use anyhow::Context;
use ar_core::prelude::*;

const ZERO: GeoPoint = GeoPoint::new(50.7753, 6.0839, 266.0);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn settle(camera: &mut Camera, dt: f32) {
    for _ in 0..2000 {
        if !camera.update(dt) {
            break;
        }
    }
}

/// The search-bar workflow: geo-anchored waypoints, closest node to the
/// camera's GPS position, name search, shortest path, highlighting.
#[test]
fn waypoint_search_and_routing() -> anyhow::Result<()> {
    init_tracing();
    let source = FixedLocation::at(ZERO);
    let frame = GeoFrame::from_source(&source)?;
    let cfg = CoreConfig::default();
    let mut camera = Camera::from_config(&cfg);

    let mut graph = GeoGraph::new();
    let entrance = graph.add_node(GeoNode::geo_anchored(
        GeoPoint::new(50.7753, 6.0839, 266.0),
        &frame,
        "Main entrance",
    ));
    let mensa = graph.add_node(GeoNode::geo_anchored(
        GeoPoint::new(50.7757, 6.0845, 266.0),
        &frame,
        "Mensa Academica",
    ));
    let library = graph.add_node(
        GeoNode::geo_anchored(GeoPoint::new(50.7761, 6.0852, 266.0), &frame, "Library")
            .with_description("central reading room"),
    );
    graph.add_edge(entrance, mensa, None)?;
    graph.add_edge(mensa, library, None)?;

    // The camera sits at the zero reference, so the entrance is closest.
    let camera_gps = camera.gps_position(&source)?;
    let here = graph
        .closest_node_to(frame.to_local(&camera_gps))
        .context("graph has nodes")?;
    assert_eq!(here, entrance);

    // Search matches on the description too.
    let target = graph
        .find_best_node_for("reading room")
        .context("description search must hit the library")?;
    assert_eq!(target, library);

    let route = graph.find_path(here, target).context("graph is connected")?;
    assert_eq!(route.len(), 3);
    assert_eq!(route.edge_count(), 2);

    struct Recorder(Vec<NodeId>);
    impl PathMarker for Recorder {
        fn mark(&mut self, id: NodeId, _node: &GeoNode) {
            self.0.push(id);
        }
        fn unmark(&mut self, _id: NodeId, _node: &GeoNode) {}
    }
    let mut rec = Recorder(Vec::new());
    route.mark_all(&mut rec);
    assert_eq!(rec.0, vec![entrance, mensa, library]);
    Ok(())
}

/// Trackball input walks the camera, and the GPS position it reports
/// afterwards differs from the device fix accordingly.
#[test]
fn manual_movement_diverges_from_gps_fix() -> anyhow::Result<()> {
    init_tracing();
    let source = FixedLocation::at(ZERO);
    let cfg = CoreConfig::default();
    let mut camera = Camera::from_config(&cfg);
    let mut events = EventQueue::new();

    // Forward on the trackball is northward while no sensor input exists.
    events.push(InputEvent::Trackball { dx: 0.0, dy: -2.0 });
    events.drain_into(&mut camera, &cfg, &source);
    settle(&mut camera, 1.0 / cfg.tick_hz as f32);

    let moved = 2.0 * cfg.trackball_factor;
    assert!((camera.position().y - moved).abs() < 1e-2);

    let gps = camera.gps_position(&source)?;
    assert!(gps.latitude > ZERO.latitude, "walked north of the fix");
    Ok(())
}

/// Picking a waypoint: the ground point under the screen center lands
/// near the waypoint the camera hovers over, and the graph finds it.
#[test]
fn picking_selects_the_nearest_waypoint() -> anyhow::Result<()> {
    init_tracing();
    let cfg = CoreConfig::default();
    let mut camera = Camera::from_config(&cfg);
    camera.set_position(Vec3::new(4.0, 7.0, 25.0));

    let mut graph = GeoGraph::new();
    let under = graph.add_node(GeoNode::virtual_at(Vec3::new(4.5, 7.5, 0.0), "under"));
    let _far = graph.add_node(GeoNode::virtual_at(Vec3::new(-30.0, -30.0, 0.0), "far"));

    // Identity sensor matrix: the camera looks straight down.
    let hit = camera.ground_intersection()?;
    let picked = graph.closest_node_to(hit).context("graph has nodes")?;
    assert_eq!(picked, under);
    Ok(())
}

/// Mode switching mid-session: sensor matrices drive the view until the
/// host disables them, after which manual rotation owns the camera and
/// the matrix stays identity.
#[test]
fn sensor_to_manual_handover() {
    init_tracing();
    let cfg = CoreConfig::default();
    let mut camera = Camera::from_config(&cfg);
    let dt = 1.0 / cfg.tick_hz as f32;

    let m = RotationMatrix::from_euler_yxz(Vec3::new(-90.0, 0.0, 45.0));
    camera.set_rotation_matrix(&m.m, 0).unwrap();
    let az = camera.azimuth_degrees().unwrap();
    assert!((az - 45.0).abs() < 1e-2);

    camera.set_sensor_input_enabled(false);
    assert_eq!(camera.rotation_matrix(), RotationMatrix::identity());

    camera.set_new_rotation(Vec3::new(0.0, 0.0, 180.0));
    settle(&mut camera, dt);
    assert_eq!(camera.manual_rotation(), Some(Vec3::new(0.0, 0.0, 180.0)));

    // Sensor writes still land in the matrix but no longer own the view.
    camera.set_rotation_matrix(&m.m, 0).unwrap();
    let view = camera.view_rotation();
    assert_ne!(view, m);
}

/// A full simulated frame loop stays finite and settles: no NaNs out of
/// the morph chain, update eventually reports rest.
#[test]
fn update_loop_settles_to_rest() {
    init_tracing();
    let cfg = CoreConfig::default();
    let mut camera = Camera::from_config(&cfg);
    let dt = 1.0 / cfg.tick_hz as f32;

    camera.set_new_position(Vec3::new(12.0, -3.0, 2.0));
    camera.set_new_offset(Vec3::new(0.0, 0.0, 1.0));

    let mut still_moving = true;
    for _ in 0..2000 {
        still_moving = camera.update(dt);
        if !still_moving {
            break;
        }
    }
    assert!(!still_moving);
    assert_eq!(camera.position(), Vec3::new(12.0, -3.0, 2.0));
    assert_eq!(camera.offset(), Vec3::new(0.0, 0.0, 1.0));
    let p = camera.position();
    assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
}
