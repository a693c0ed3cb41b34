// src/geometry/inset.rs
//! Сдвиг ребра многоугольника внутрь и срезка углов

use std::collections::BTreeSet;

use tracing::debug;

use super::{Edge, Point, Polygon, is_intersection_in_edge, line_intersection};

/// Результат успешного сдвига ребра
#[derive(Debug, Clone, PartialEq)]
pub struct InsetResult {
    /// Исходные индексы вершин, удалённых из многоугольника (по возрастанию)
    pub spliced: Vec<usize>,
    /// Отрезанная полоса между старым и новым положением ребра
    pub negative: Polygon,
    /// Новое положение сдвинутого ребра
    pub new_edge: Edge,
}

/// Сдвигает ребро, начинающееся в вершине `start_point`, на `distance`.
///
/// См. [`inset_polygon_edge_at`]. Если точки нет среди вершин, возвращает `None`.
pub fn inset_polygon_edge(
    polygon: &mut Polygon,
    start_point: Point,
    distance: f64,
) -> Option<InsetResult> {
    let Some(index) = polygon.position(start_point) else {
        debug!("Сдвиг ребра: начальная точка {:?} не найдена", start_point);
        return None;
    };
    inset_polygon_edge_at(polygon, index, distance)
}

/// Сдвигает ребро `index` параллельно самому себе на `distance`.
///
/// Сначала пробуется направление внутрь многоугольника, затем наружу. От ребра
/// выполняется обход вперёд и назад до первого ребра, которое пересекает
/// смещённая прямая; полностью пропущенные рёбра вырезаются.
///
/// При успехе многоугольник меняется на месте: сдвинутое ребро остаётся ребром,
/// начинающимся в той же (новой) вершине, удалённые вершины исчезают. При неудаче
/// многоугольник не меняется.
pub fn inset_polygon_edge_at(
    polygon: &mut Polygon,
    index: usize,
    distance: f64,
) -> Option<InsetResult> {
    let n = polygon.len();
    if n < 3 || index >= n {
        return None;
    }

    let edge = polygon.edge(index);
    let normal = edge.unit_normal()? * polygon.orientation();

    for offset in [normal * distance, normal * -distance] {
        let line = Edge::new(edge.p1 + offset, edge.p2 + offset);
        if let Some(result) = try_inset(polygon, index, &line) {
            return Some(result);
        }
        if distance == 0.0 {
            break;
        }
    }

    debug!("Сдвиг ребра {} на {} не удался", index, distance);
    None
}

fn crossing(line: &Edge, edge: &Edge) -> Option<Point> {
    line_intersection(line, edge).filter(|&p| is_intersection_in_edge(p, edge))
}

fn try_inset(polygon: &mut Polygon, index: usize, line: &Edge) -> Option<InsetResult> {
    let n = polygon.len();
    let next = (index + 1) % n;

    // Обход вперёд: пропуск ребра j удаляет его конечную вершину
    let mut forward_removed = Vec::new();
    let mut j = next;
    let (forward_edge, forward_hit) = loop {
        if j == index {
            return None;
        }
        let candidate = polygon.edge(j);
        if let Some(hit) = crossing(line, &candidate) {
            break (j, hit);
        }
        forward_removed.push((j + 1) % n);
        if n - forward_removed.len() < 3 {
            return None;
        }
        j = (j + 1) % n;
    };

    // Обход назад: пропуск ребра k удаляет его начальную вершину
    let mut backward_removed = Vec::new();
    let mut k = (index + n - 1) % n;
    let backward_hit = loop {
        if k == index || k == forward_edge {
            return None;
        }
        let candidate = polygon.edge(k);
        if let Some(hit) = crossing(line, &candidate) {
            break hit;
        }
        backward_removed.push(k);
        if n - forward_removed.len() - backward_removed.len() < 3 {
            return None;
        }
        k = (k + n - 1) % n;
    };

    let removed: BTreeSet<usize> = forward_removed
        .iter()
        .chain(backward_removed.iter())
        .copied()
        .collect();
    if removed.contains(&index) || removed.contains(&next) || n - removed.len() < 3 {
        return None;
    }

    let mut negative = Vec::with_capacity(removed.len() + 4);
    negative.push(backward_hit);
    negative.extend(backward_removed.iter().rev().map(|&i| polygon.points[i]));
    negative.push(polygon.points[index]);
    negative.push(polygon.points[next]);
    negative.extend(forward_removed.iter().map(|&i| polygon.points[i]));
    negative.push(forward_hit);

    let mut points = polygon.points.clone();
    points[index] = backward_hit;
    points[next] = forward_hit;
    polygon.points = points
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !removed.contains(i))
        .map(|(_, p)| p)
        .collect();

    Some(InsetResult {
        spliced: removed.into_iter().collect(),
        negative: Polygon::new(negative),
        new_edge: Edge::new(backward_hit, forward_hit),
    })
}

/// Заменяет вершину `index` двумя точками, подтянутыми к соседям на `clip`.
///
/// Смещение не превышает половины длины соседнего ребра.
pub fn clip_corner(polygon: &mut Polygon, index: usize, clip: f64) {
    let n = polygon.len();
    if n < 3 || index >= n {
        return;
    }
    let corner = polygon.points[index];
    let prev = polygon.points[(index + n - 1) % n];
    let next = polygon.points[(index + 1) % n];

    let to_prev = corner.towards(prev, clip.min(corner.distance(prev) / 2.0));
    let to_next = corner.towards(next, clip.min(corner.distance(next) / 2.0));
    polygon.points.splice(index..=index, [to_prev, to_next]);
}

/// Срезает все углы: каждое ребро укорачивается на `clip` с обеих сторон,
/// ребро короче `2 * clip` стягивается в середину.
#[must_use]
pub fn clip_corners(polygon: &Polygon, clip: f64) -> Polygon {
    let mut points = Vec::with_capacity(polygon.len() * 2);
    for edge in polygon.edges() {
        if edge.length() > clip * 2.0 {
            points.push(edge.p1.towards(edge.p2, clip));
            points.push(edge.p2.towards(edge.p1, clip));
        } else {
            points.push(edge.midpoint());
        }
    }
    Polygon::new(points)
}
