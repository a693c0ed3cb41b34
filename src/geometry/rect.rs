// src/geometry/rect.rs
//! Прямоугольники внутри многоугольников: площадь под главное здание и постройки вдоль дорог

use super::{EPSILON, Edge, Point, Polygon, is_intersection_in_edge, line_intersection};

/// Число равномерных выборок на каждом ребре
const SAMPLES_PER_EDGE: usize = 10;

/// Ищет большой прямоугольник, опирающийся на одно из рёбер многоугольника.
///
/// Для каждого ребра берутся [`SAMPLES_PER_EDGE`] точек, из каждой строится
/// перпендикуляр внутрь до противоположной границы. Прямоугольник для пары точек
/// имеет ширину между ними и глубину меньшего из двух перпендикуляров; выбирается
/// пара с наибольшей площадью.
#[must_use]
pub fn find_rect_in_polygon(polygon: &Polygon) -> Option<Polygon> {
    if polygon.len() < 3 {
        return None;
    }
    let edges = polygon.edges();
    let orientation = polygon.orientation();
    let mut best: Option<(f64, Polygon)> = None;

    for (i, edge) in edges.iter().enumerate() {
        let Some(normal) = edge.unit_normal().map(|n| n * orientation) else {
            continue;
        };

        let samples: Vec<(Point, f64)> = (0..SAMPLES_PER_EDGE)
            .filter_map(|s| {
                let t = s as f64 / (SAMPLES_PER_EDGE - 1) as f64;
                let origin = edge.p1 + (edge.p2 - edge.p1) * t;
                ray_depth(&edges, i, origin, normal).map(|depth| (origin, depth))
            })
            .collect();

        for (a, &(pa, depth_a)) in samples.iter().enumerate() {
            for &(pb, depth_b) in &samples[a + 1..] {
                let depth = depth_a.min(depth_b);
                let area = pa.distance(pb) * depth;
                if area > EPSILON && best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
                    let rect = Polygon::new(vec![pa, pb, pb + normal * depth, pa + normal * depth]);
                    best = Some((area, rect));
                }
            }
        }
    }

    best.map(|(_, rect)| rect)
}

/// Расстояние от точки ребра `skip` вдоль нормали до самой дальней точки границы
fn ray_depth(edges: &[Edge], skip: usize, origin: Point, normal: Point) -> Option<f64> {
    let ray = Edge::new(origin, origin + normal);
    edges
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != skip)
        .filter_map(|(_, other)| {
            line_intersection(&ray, other)
                .filter(|&p| is_intersection_in_edge(p, other))
                .map(|p| (p - origin).dot(normal))
        })
        .filter(|&depth| depth > EPSILON)
        .max_by(f64::total_cmp)
}

/// Крестообразный контур внутри прямоугольника.
///
/// Короткая сторона делится на три части: перекладина занимает среднюю треть
/// по ширине, поперечина занимает вторую треть от начала длинной стороны.
#[must_use]
pub fn create_cross(rect: &Polygon) -> Option<Polygon> {
    if rect.len() != 4 {
        return None;
    }
    let mut r = rect.points.clone();
    if r[0].distance(r[1]) > r[1].distance(r[2]) {
        r.rotate_right(1);
    }

    let short_len = r[0].distance(r[1]);
    let long_len = r[1].distance(r[2]);
    if short_len <= 0.0 || long_len <= 0.0 {
        return None;
    }
    let across = (r[1] - r[0]) * (1.0 / short_len);
    let along = (r[3] - r[0]) * (1.0 / r[0].distance(r[3]));

    let third = short_len / 3.0;
    let stem = long_len - 2.0 * third;

    let steps = [
        across * third,
        across * third,
        along * third,
        across * third,
        along * third,
        across * -third,
        along * stem,
        across * -third,
        along * -stem,
        across * -third,
        along * -third,
        across * third,
    ];
    let mut points = Vec::with_capacity(steps.len());
    let mut cursor = r[0];
    for step in steps {
        cursor = cursor + step;
        points.push(cursor);
    }
    Some(Polygon::new(points))
}

/// Прямоугольник шириной `width` на ребре, вытянутый в сторону `towards`
#[must_use]
pub fn create_rect_from_edge(edge: &Edge, width: f64, towards: Point) -> Option<Polygon> {
    let normal = edge.unit_normal()?;
    let plus = edge.p2 + normal * width;
    let minus = edge.p2 - normal * width;
    let offset = if plus.distance(towards) <= minus.distance(towards) {
        normal * width
    } else {
        normal * -width
    };
    Some(Polygon::new(vec![edge.p1, edge.p2, edge.p2 + offset, edge.p1 + offset]))
}
