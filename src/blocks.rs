// src/blocks.rs
//! Кварталы, главное здание ядра и пригородная застройка
//!
//! Район делится на кварталы рекурсивным разрезанием: пока кусок больше
//! `block_size`, его самое длинное ребро режется перпендикуляром в слегка
//! случайной точке, а между половинами остаётся улица шириной `street_width`.
//! Если к району подходят дороги, он сначала разбивается на клинья вокруг сайта,
//! и вдоль дорожных лучей оставляется более широкая улица.

use std::collections::VecDeque;

use rand::Rng;
use tracing::{debug, warn};

use crate::carving::RoadFrontage;
use crate::district::{District, DistrictType};
use crate::geometry::{
    Edge, Point, Polygon, clip_corner, create_cross, create_rect_from_edge, find_rect_in_polygon,
    inset_polygon_edge_at, random_point_on_edge, shatter_polygon, slice_polygon,
};
use crate::map::MapWarning;

/// Предел итераций разбиения одного района
pub const MAX_SUBDIVISION_STEPS: usize = 2000;
/// Замена бесконечного наклона линии разреза
const STEEP_SLOPE: f64 = 999_999_999.0;

const ROAD_SPOKE_INSET: f64 = 5.0;
const SPOKE_INSET: f64 = 2.0;
const APEX_CLIP_MIN: f64 = 10.0;
const APEX_CLIP_JITTER: f64 = 10.0;

/// Разрешённое расстояние между углами пригородного дома на ребре
const SPRAWL_SPAN_MIN: f64 = 5.0;
const SPRAWL_SPAN_MAX: f64 = 20.0;
const SPRAWL_SPAN_RETRIES: usize = 10;

/// Контур главного здания: крест в самом большом вписанном прямоугольнике
#[must_use]
pub fn landmark(polygon: &Polygon) -> Option<Polygon> {
    find_rect_in_polygon(polygon).and_then(|rect| create_cross(&rect))
}

/// Начальная очередь разбиения района.
///
/// Без дорог это весь многоугольник. С дорогами это клинья от каждого ребра к
/// сайту (или центроиду, если сайт оказался вне прорезанного многоугольника);
/// у каждого клина оба луча сдвигаются внутрь, сильнее у дорожного конца, а
/// вершина срезается.
pub fn seed_queue(district: &District, rng: &mut impl Rng) -> Vec<Polygon> {
    if district.road_ends.is_empty() {
        return vec![district.polygon.clone()];
    }

    let roads: Vec<Point> = district
        .road_ends
        .iter()
        .filter_map(|&end| nearest_vertex(&district.polygon, end))
        .collect();
    let clip = APEX_CLIP_MIN + rng.gen_range(0.0..1.0) * APEX_CLIP_JITTER;
    let hub = if district.polygon.contains_point(district.site) {
        district.site
    } else {
        district.polygon.centroid()
    };

    let mut wedges = shatter_polygon(&district.polygon, hub);
    for wedge in &mut wedges {
        let spoke_inset = |corner: Point| {
            if roads.contains(&corner) {
                ROAD_SPOKE_INSET
            } else {
                SPOKE_INSET
            }
        };
        let outgoing = spoke_inset(wedge.points[1]);
        let incoming = spoke_inset(wedge.points[0]);
        inset_polygon_edge_at(wedge, 1, outgoing);
        inset_polygon_edge_at(wedge, 2, incoming);
        clip_corner(wedge, 2, clip);
    }
    wedges
}

/// Вершина прорезанного многоугольника, ближайшая к концу дороги на исходной границе
fn nearest_vertex(polygon: &Polygon, point: Point) -> Option<Point> {
    polygon
        .points
        .iter()
        .copied()
        .min_by(|a, b| a.distance(point).total_cmp(&b.distance(point)))
}

/// Линия разреза: перпендикуляр к самому длинному ребру в точке около середины.
///
/// Точка и наклон отклоняются случайно в пределах `chaos / 2`.
pub fn split_line(polygon: &Polygon, chaos: f64, rng: &mut impl Rng) -> Option<Edge> {
    let longest = polygon.edge(polygon.longest_edge_index()?);

    let percent = 0.5 + rng.gen_range(0.0..1.0) * chaos - chaos / 2.0;
    let split = longest.p1 + (longest.p2 - longest.p1) * percent;

    let mut slope = -1.0 / longest.slope();
    slope *= 1.0 + rng.gen_range(0.0..1.0) * chaos - chaos / 2.0;
    if slope.is_infinite() {
        slope = STEEP_SLOPE;
    }

    let direction = Point::new(1.0, slope);
    let length = direction.x.hypot(direction.y);
    Some(Edge::new(split, split + direction * (1.0 / length)))
}

/// Параметры разбиения района
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subdivision {
    pub chaos: f64,
    pub block_size: f64,
    pub street_width: f64,
}

impl From<&District> for Subdivision {
    fn from(district: &District) -> Self {
        Self {
            chaos: district.chaos,
            block_size: district.block_size,
            street_width: district.street_width,
        }
    }
}

/// Разбивает многоугольники очереди на кварталы.
///
/// Кусок меньше `block_size` становится кварталом; кусок, который не удалось
/// разрезать, тоже. `None`, если разбиение не уложилось в
/// [`MAX_SUBDIVISION_STEPS`] итераций.
pub fn subdivide(
    queue: Vec<Polygon>,
    params: Subdivision,
    rng: &mut impl Rng,
) -> Option<Vec<Polygon>> {
    let mut queue = VecDeque::from(queue);
    let mut blocks = Vec::new();
    let mut steps = 0;

    while let Some(polygon) = queue.pop_front() {
        steps += 1;
        if steps > MAX_SUBDIVISION_STEPS {
            return None;
        }

        if polygon.area() < params.block_size {
            blocks.push(polygon);
            continue;
        }

        let halves = split_line(&polygon, params.chaos, rng)
            .and_then(|line| slice_polygon(&polygon, &line, params.street_width));
        match halves {
            Some((first, second)) => {
                queue.push_back(first);
                queue.push_back(second);
            }
            None => blocks.push(polygon),
        }
    }
    Some(blocks)
}

/// Разбивает на кварталы все подходящие районы; ядро получает главное здание.
///
/// Прерванное разбиение оставляет район без кварталов и попадает в предупреждения.
pub fn subdivide_districts(districts: &mut [District], rng: &mut impl Rng) -> Vec<MapWarning> {
    let start = std::time::Instant::now();
    let mut warnings = Vec::new();
    let mut total = 0;

    for district in districts.iter_mut() {
        if district.is_core {
            district.landmark = landmark(&district.polygon);
            if district.landmark.is_none() {
                debug!(district = district.id, "Главное здание не поместилось в ядро");
            }
            continue;
        }
        if district.is_water() || district.block_size <= 0.0 || !district.blocks.is_empty() {
            continue;
        }

        let queue = seed_queue(district, rng);
        if let Some(blocks) = subdivide(queue, Subdivision::from(&*district), rng) {
            total += blocks.len();
            district.blocks = blocks;
        } else {
            warn!(
                district = district.id,
                limit = MAX_SUBDIVISION_STEPS,
                "Разбиение района на кварталы прервано"
            );
            district.blocks.clear();
            warnings.push(MapWarning::SubdivisionAborted {
                district: district.id,
            });
        }
    }

    debug!(
        blocks = total,
        aborted = warnings.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Кварталы построены"
    );
    warnings
}

/// Сколько домов и какой ширины ставить вдоль дороги сельского района
fn sprawl_density(district: &District, districts: &[District], rng: &mut impl Rng) -> (usize, f64, f64) {
    let is_urban = |id: usize| districts[id].district_type == DistrictType::Urban;
    if district.neighbors.iter().any(|&n| is_urban(n)) {
        return (10, 10.0, 20.0);
    }
    let near_urban = district
        .neighbors
        .iter()
        .any(|&n| districts[n].neighbors.iter().any(|&m| is_urban(m)));
    let near_village = district
        .neighbors
        .iter()
        .any(|&n| districts[n].district_type == DistrictType::Village);
    if near_urban || near_village {
        return (5, 5.0, 10.0);
    }
    let count = usize::from(rng.gen_range(0.0..1.0) > 0.75);
    (count, 5.0, 10.0)
}

/// Ставит пригородные дома вдоль сдвинутых дорожных рёбер сельских районов.
///
/// Чем ближе к городу, тем больше и шире дома.
pub fn place_sprawl(
    districts: &[District],
    frontage: &[RoadFrontage],
    rng: &mut impl Rng,
) -> Vec<Polygon> {
    let mut buildings = Vec::new();
    for front in frontage {
        let district = &districts[front.district];
        let (count, min_width, max_width) = sprawl_density(district, districts, rng);
        for _ in 0..count {
            let p1 = random_point_on_edge(&front.edge, rng);
            let mut p2 = random_point_on_edge(&front.edge, rng);
            let mut tries = 0;
            while tries < SPRAWL_SPAN_RETRIES && !(SPRAWL_SPAN_MIN..=SPRAWL_SPAN_MAX).contains(&p1.distance(p2)) {
                p2 = random_point_on_edge(&front.edge, rng);
                tries += 1;
            }
            let width = rng.gen_range(0.0..1.0) * (max_width - min_width) + min_width;
            if let Some(rect) = create_rect_from_edge(&Edge::new(p1, p2), width, district.site) {
                buildings.push(rect);
            }
        }
    }
    debug!(buildings = buildings.len(), "Пригородная застройка размещена");
    buildings
}
