//! Сквозные тесты генерации карты

use citygen::district::Relation;
use citygen::geometry::{Point, Polygon};
use citygen::{DistrictType, Map, MapConfig, generate};

fn small_map(seed: u64) -> Map {
    generate(&MapConfig::new(seed, 1280, 1280)).expect("карта 10×10 должна строиться")
}

#[test]
fn seed_42_has_exactly_one_urban_core() {
    let map = small_map(42);
    let cores: Vec<_> = map.districts().iter().filter(|d| d.is_core).collect();
    assert_eq!(cores.len(), 1);
    assert_eq!(cores[0].district_type, DistrictType::Urban);
    assert!(cores[0].blocks.is_empty());
    assert_eq!(map.districts().len(), 100);
}

#[test]
fn same_seed_gives_identical_json() {
    let a = small_map(42).to_json().unwrap();
    let b = small_map(42).to_json().unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_seeds_give_different_maps() {
    let a = small_map(1).to_json().unwrap();
    let b = small_map(2).to_json().unwrap();
    assert_ne!(a, b);
}

#[test]
fn relations_are_symmetric_and_bridges_cross_rivers() {
    let map = small_map(42);
    let districts = map.districts();
    for d in districts {
        for relation in Relation::ALL {
            for &other in d.relations(relation) {
                assert_ne!(other, d.id);
                assert!(
                    districts[other].relations(relation).contains(&d.id),
                    "{relation:?} {} -> {other} is one-sided",
                    d.id
                );
            }
        }
        for bridge in &d.bridges {
            assert!(d.rivers.contains(bridge));
        }
        assert!(d.rivers.iter().all(|r| d.neighbors.contains(r)));
    }
}

#[test]
fn river_runs_from_the_top_edge() {
    let map = small_map(42);
    let river = map.river();
    assert!(river.path.len() >= 2);
    assert_eq!(river.path[0].y, 0.0);
    assert!((30.0..60.0).contains(&river.width));
}

#[test]
fn every_district_is_named_and_water_has_no_blocks() {
    let map = small_map(7);
    for d in map.districts() {
        let words: Vec<&str> = d.name.split(' ').collect();
        assert_eq!(words.len(), 2, "{}", d.name);
        if d.is_water() {
            assert!(d.blocks.is_empty());
            assert_eq!(d.polygon, d.original_polygon);
        }
    }
    let urban = map
        .districts()
        .iter()
        .filter(|d| d.district_type == DistrictType::Urban)
        .count();
    assert!(urban >= 1);
}

#[test]
fn json_round_trip_keeps_the_map() {
    let map = small_map(42);
    let json = map.to_json().unwrap();
    let restored = Map::from_json(&json).unwrap();

    assert_eq!(restored.to_json().unwrap(), json);
    assert_eq!(restored.districts().len(), map.districts().len());
    for (a, b) in restored.districts().iter().zip(map.districts()) {
        assert_eq!(a.neighbors, b.neighbors);
        assert_eq!(a.bridges, b.bridges);
        assert_eq!(a.roads, b.roads);
        assert_eq!(a.polygon, b.polygon);
        assert_eq!(a.original_polygon, b.original_polygon);
        assert_eq!(a.blocks, b.blocks);
        for (p, q) in a.polygon.points.iter().zip(&b.polygon.points) {
            assert_eq!(p.x.to_bits(), q.x.to_bits());
            assert_eq!(p.y.to_bits(), q.y.to_bits());
        }
    }
}

/// Точка внутри многоугольника или на его границе с допуском
fn covers(polygon: &Polygon, p: Point, tolerance: f64) -> bool {
    polygon.contains_point(p)
        || polygon
            .edges()
            .iter()
            .any(|e| distance_to_segment(p, e.p1, e.p2) <= tolerance)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

#[test]
fn blocks_stay_inside_their_district_without_overlap() {
    let mut with_blocks = 0;
    for seed in [1, 2, 3, 42, 77] {
        let map = small_map(seed);
        for d in map.districts().iter().filter(|d| !d.blocks.is_empty()) {
            with_blocks += 1;
            let total: f64 = d.blocks.iter().map(Polygon::area).sum();
            assert!(
                total <= d.polygon.area() + 1e-6,
                "seed {seed}, district {}: blocks {total} > polygon {}",
                d.id,
                d.polygon.area()
            );
            for (i, block) in d.blocks.iter().enumerate() {
                for &p in &block.points {
                    assert!(
                        covers(&d.polygon, p, 1e-6),
                        "seed {seed}, district {}: block {i} leaves the district at {p:?}",
                        d.id
                    );
                }
                let inner = block.centroid();
                if block.area() < 1.0 || !block.contains_point(inner) {
                    continue;
                }
                for (j, other) in d.blocks.iter().enumerate() {
                    assert!(
                        i == j || !other.contains_point(inner),
                        "seed {seed}, district {}: blocks {i} and {j} overlap",
                        d.id
                    );
                }
            }
        }
    }
    assert!(with_blocks > 0);
}
