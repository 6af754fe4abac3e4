use std::hint::black_box;

use criterion::{Criterion as Bench, criterion_group, criterion_main};
use litroutes_core::{
    BBox, Criterion, LatLon, ScoringParams, build_safety_graph, find_route,
    loading::{RawAttributes, RawEdge, RawNode, RawStreetNetwork},
    snap,
};

const SIDE: i64 = 60;
const STEP_DEG: f64 = 0.0015;

/// Square street grid, one light on every third block
fn grid() -> RawAttributes {
    let id = |row: i64, col: i64| row * SIDE + col;
    let position = |row: i64, col: i64| {
        LatLon::new(35.30 + row as f64 * STEP_DEG, -82.50 + col as f64 * STEP_DEG)
    };

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut lights = Vec::new();
    for row in 0..SIDE {
        for col in 0..SIDE {
            let at = position(row, col);
            nodes.push(RawNode {
                id: id(row, col),
                lat: at.lat,
                lon: at.lon,
            });
            let highway = if row % 10 == 0 || col % 10 == 0 { "primary" } else { "residential" };
            for (next_row, next_col) in [(row + 1, col), (row, col + 1)] {
                if next_row < SIDE && next_col < SIDE {
                    edges.push(RawEdge {
                        from: id(row, col),
                        to: id(next_row, next_col),
                        highway: vec![highway.to_string()],
                        ..RawEdge::default()
                    });
                }
            }
            if (row + col) % 3 == 0 {
                let next = position(row, col + 1);
                lights.push(LatLon::new(at.lat, (at.lon + next.lon) / 2.0));
            }
        }
    }

    RawAttributes {
        streets: RawStreetNetwork { nodes, edges },
        lights,
        ..RawAttributes::default()
    }
}

fn grid_bbox() -> BBox {
    let extent = SIDE as f64 * STEP_DEG;
    BBox::new(35.30 + extent, 35.30 - STEP_DEG, -82.50 + extent, -82.50 - STEP_DEG).unwrap()
}

fn routing_benchmark(c: &mut Bench) {
    let bbox = grid_bbox();
    let params = ScoringParams::default();

    c.bench_function("build_grid_graph", |b| {
        b.iter(|| build_safety_graph(&bbox, black_box(grid()), &params, 15.0).unwrap());
    });

    let graph = build_safety_graph(&bbox, grid(), &params, 15.0).unwrap();
    let start = snap(&graph, 35.301, -82.499).unwrap();
    let end = snap(&graph, 35.385, -82.415).unwrap();

    let mut group = c.benchmark_group("find_route");
    for criterion in [Criterion::Time, Criterion::Danger] {
        group.bench_function(criterion.to_string(), |b| {
            b.iter(|| find_route(&graph, black_box(start), black_box(end), criterion).unwrap());
        });
    }
    group.finish();

    c.bench_function("snap", |b| {
        b.iter(|| snap(&graph, black_box(35.3412), black_box(-82.4631)).unwrap());
    });
}

criterion_group!(benches, routing_benchmark);
criterion_main!(benches);
