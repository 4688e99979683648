//! Headless demo session.
//!
//! Usage:
//!   cargo run -p ar_app -- [--ticks 300] [--config session.json] [--seed 7]
//!
//! Stands in for the mobile host: it drives the per-frame update loop,
//! feeds synthetic sensor and trackball input through the event queue,
//! builds a waypoint graph around the session origin, and runs a search
//! plus a shortest-path query, printing the marked route and the camera
//! state at the end.

use std::env;
use std::fs;

use anyhow::Context;
use ar_core::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

struct Args {
    ticks: u32,
    seed: u64,
    config: Option<String>,
}

fn parse_args() -> Args {
    let mut out = Args {
        ticks: 300,
        seed: 7,
        config: None,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--ticks" if i + 1 < args.len() => {
                out.ticks = args[i + 1].parse().unwrap_or(out.ticks);
                i += 2;
            }
            "--seed" if i + 1 < args.len() => {
                out.seed = args[i + 1].parse().unwrap_or(out.seed);
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                out.config = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

/// UI stand-in: highlighting is a log line per node.
struct LogMarker;

impl PathMarker for LogMarker {
    fn mark(&mut self, id: NodeId, node: &GeoNode) {
        info!(id = id.0, name = %node.name, "mark waypoint on route");
    }

    fn unmark(&mut self, id: NodeId, node: &GeoNode) {
        info!(id = id.0, name = %node.name, "unmark waypoint");
    }
}

fn build_campus_graph(
    cfg: &CoreConfig,
    camera: &Camera,
    rng: &mut StdRng,
) -> anyhow::Result<GeoGraph> {
    let names = [
        "Main entrance",
        "Mensa Academica",
        "Library",
        "Lecture hall",
        "Cafeteria",
        "Bus stop",
    ];
    let mut graph = GeoGraph::new();
    let mut previous = None;
    for name in names {
        let pos = Vec3::random_in_ring(
            camera.position(),
            cfg.waypoint_min_radius,
            cfg.waypoint_max_radius,
            rng,
        );
        let id = graph.add_node(GeoNode::virtual_at(pos, name));
        // Chain each new waypoint to the previous one, like the
        // "new connected waypoint" button would.
        if let Some(prev) = previous {
            graph
                .add_edge(prev, id, None)
                .context("chaining waypoints")?;
        }
        previous = Some(id);
    }
    // A shortcut so the path search has a choice to make.
    graph
        .add_edge(NodeId(0), NodeId(3), Some(60.0))
        .context("adding the shortcut edge")?;
    Ok(graph)
}

/// Synthetic sensor orientation: pitched to the horizon, compass slowly
/// turning.
fn sensor_matrix(tick: u32) -> RotationMatrix {
    let azimuth = (tick as f32 * 0.5) % 360.0;
    RotationMatrix::from_euler_yxz(Vec3::new(-90.0, 0.0, azimuth))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let cfg = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).context("reading config file")?;
            CoreConfig::from_json_str(&text).context("parsing config")?
        }
        None => CoreConfig::default(),
    };
    info!(ticks = args.ticks, seed = args.seed, "starting session");

    let location = FixedLocation::at(GeoPoint::new(50.7753, 6.0839, 266.0));
    let mut camera = Camera::from_config(&cfg);
    camera.set_position(Vec3::new(0.0, 0.0, 1.7));

    let mut rng = StdRng::seed_from_u64(args.seed);
    let graph = build_campus_graph(&cfg, &camera, &mut rng)?;
    info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        "campus graph ready"
    );

    // A movable world object sharing the camera's buffering component.
    let mut drone_pos = Vec3::new(10.0, 0.0, 5.0);
    let mut drone_mover = MoveComp::new(cfg.camera_move_speed);

    let mut events = EventQueue::new();
    let dt = 1.0 / cfg.tick_hz as f32;

    for tick in 0..args.ticks {
        // Host input, simulated.
        events.push(InputEvent::OrientationMatrix {
            values: sensor_matrix(tick).m.to_vec(),
            offset: 0,
        });
        if tick % 30 == 0 {
            events.push(InputEvent::Trackball { dx: 0.1, dy: -0.2 });
            drone_mover.nudge(0.0, 1.0, 0.0, drone_pos);
        }

        events.drain_into(&mut camera, &cfg, &location);
        camera.update(dt);
        drone_mover.update(&mut drone_pos, dt);

        if tick % 60 == 0 {
            let looking_at = camera
                .ground_intersection()
                .map(|v| v.to_string())
                .unwrap_or_else(|e| e.to_string());
            info!(
                tick,
                position = %camera.position(),
                looking_at = %looking_at,
                "frame"
            );
        }
    }

    // The search-bar flow: find the waypoint, route to it from wherever
    // the camera ended up, highlight the result.
    let target = graph
        .find_best_node_for("library")
        .context("no waypoint matches the search")?;
    let here = graph
        .closest_node_to(camera.position())
        .context("graph is empty")?;
    match graph.find_path(here, target) {
        Some(route) => {
            info!(
                hops = route.edge_count(),
                cost = route.total_weight(),
                "route found"
            );
            route.mark_all(&mut LogMarker);
        }
        None => info!("no route between here and the target"),
    }

    let gps = camera.gps_position(&location)?;
    info!(camera_gps = %gps, drone = %drone_pos, "session done");
    print!("{}", camera.debug_dump());
    Ok(())
}
