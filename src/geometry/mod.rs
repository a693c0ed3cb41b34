// src/geometry/mod.rs
//! Геометрическое ядро генератора
//!
//! Все этапы конвейера (тесселяция, русла, дороги, кварталы) работают с тремя типами:
//! - [`Point`]: точка на плоскости, сравнивается по значению;
//! - [`Edge`]: неориентированный отрезок, `(p1, p2) ≡ (p2, p1)`;
//! - [`Polygon`]: упорядоченная замкнутая последовательность точек.
//!
//! `Point` копируется по значению, поэтому операции над многоугольниками никогда не
//! разделяют точки между двумя многоугольниками: каждая операция работает со своей копией.
//!
//! Операции, которые могут не сработать на вырожденной геометрии (вставка ребра,
//! разрез, поиск прямоугольника), возвращают `Option` и оставляют вход нетронутым.

pub mod inset;
pub mod rect;
pub mod slice;

pub use inset::{InsetResult, clip_corner, clip_corners, inset_polygon_edge, inset_polygon_edge_at};
pub use rect::{create_cross, create_rect_from_edge, find_rect_in_polygon};
pub use slice::{shatter_polygon, slice_polygon};

use std::ops::{Add, Mul, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Допуск для проверки попадания точки пересечения в отрезок
pub const EPSILON: f64 = 0.001;

/// Знаменатель, ниже которого прямые считаются параллельными
const PARALLEL_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Сравнение с допуском по каждой координате
    #[must_use]
    pub fn approx_eq(self, other: Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Смещает точку к `target` на `distance`
    #[must_use]
    pub fn towards(self, target: Point, distance: f64) -> Point {
        let length = self.distance(target);
        if length == 0.0 {
            return self;
        }
        self + (target - self) * (distance / length)
    }

    #[must_use]
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Хешируемый ключ точки (точное битовое представление координат)
    #[must_use]
    pub fn key(self) -> PointKey {
        PointKey::from(self)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Ключ точки для хеш-таблиц: `-0.0` и `0.0` дают один и тот же ключ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(u64, u64);

impl From<Point> for PointKey {
    fn from(p: Point) -> Self {
        PointKey((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub p1: Point,
    pub p2: Point,
}

impl Edge {
    #[must_use]
    pub const fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    #[must_use]
    pub fn midpoint(&self) -> Point {
        Point::new((self.p1.x + self.p2.x) / 2.0, (self.p1.y + self.p2.y) / 2.0)
    }

    /// Наклон прямой; у вертикального ребра бесконечен
    #[must_use]
    pub fn slope(&self) -> f64 {
        (self.p1.y - self.p2.y) / (self.p1.x - self.p2.x)
    }

    /// Единичная нормаль (поворот направления на 90° против часовой стрелки)
    #[must_use]
    pub fn unit_normal(&self) -> Option<Point> {
        let length = self.length();
        if length == 0.0 {
            return None;
        }
        let d = self.p2 - self.p1;
        Some(Point::new(-d.y / length, d.x / length))
    }

    /// Точное сравнение без учёта направления
    #[must_use]
    pub fn equivalent(&self, other: &Edge) -> bool {
        (self.p1 == other.p1 && self.p2 == other.p2) || (self.p1 == other.p2 && self.p2 == other.p1)
    }

    #[must_use]
    pub fn approx_eq(&self, other: &Edge, tolerance: f64) -> bool {
        (self.p1.approx_eq(other.p1, tolerance) && self.p2.approx_eq(other.p2, tolerance))
            || (self.p1.approx_eq(other.p2, tolerance) && self.p2.approx_eq(other.p1, tolerance))
    }
}

/// Многоугольник: порядок точек задаёт рёбра `(points[i], points[i + 1])`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl Polygon {
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Ребро, начинающееся в вершине `index`
    #[must_use]
    pub fn edge(&self, index: usize) -> Edge {
        let n = self.points.len();
        Edge::new(self.points[index % n], self.points[(index + 1) % n])
    }

    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        (0..self.points.len()).map(|i| self.edge(i)).collect()
    }

    /// Индекс вершины, точно совпадающей с `point`
    #[must_use]
    pub fn position(&self, point: Point) -> Option<usize> {
        self.points.iter().position(|&p| p == point)
    }

    /// Ориентированная площадь (формула шнурков): положительна при обходе против часовой стрелки
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice / 2.0
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// +1 для обхода против часовой стрелки, -1 для обхода по часовой
    #[must_use]
    pub fn orientation(&self) -> f64 {
        if self.signed_area() < 0.0 { -1.0 } else { 1.0 }
    }

    /// Центр масс; у вырожденного многоугольника это среднее вершин
    #[must_use]
    pub fn centroid(&self) -> Point {
        let n = self.points.len();
        if n == 0 {
            return Point::default();
        }
        let area = self.signed_area();
        if area.abs() < f64::EPSILON {
            let sum = self.points.iter().fold(Point::default(), |acc, &p| acc + p);
            return sum * (1.0 / n as f64);
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let cross = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        Point::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    #[must_use]
    pub fn bbox_center(&self) -> Point {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0)
    }

    /// Проверка попадания точки внутрь (чётность пересечений луча)
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > point.y) != (b.y > point.y)
                && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Индекс самого длинного ребра (первого из равных)
    #[must_use]
    pub fn longest_edge_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, edge) in self.edges().iter().enumerate() {
            let length = edge.length();
            if best.is_none_or(|(_, l)| length > l) {
                best = Some((i, length));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Точное сравнение с точностью до циклического сдвига
    #[must_use]
    pub fn equivalent(&self, other: &Polygon) -> bool {
        self.approx_eq(other, 0.0)
    }

    /// Сравнение с допуском с точностью до циклического сдвига
    #[must_use]
    pub fn approx_eq(&self, other: &Polygon, tolerance: f64) -> bool {
        let n = self.points.len();
        if n != other.points.len() {
            return false;
        }
        if n == 0 {
            return true;
        }
        (0..n).any(|shift| {
            (0..n).all(|i| self.points[i].approx_eq(other.points[(i + shift) % n], tolerance))
        })
    }

    /// Удаляет подряд идущие совпадающие точки (включая пару последняя/первая)
    pub fn dedup(&mut self, tolerance: f64) {
        self.points.dedup_by(|b, a| a.approx_eq(*b, tolerance));
        while self.points.len() > 1 {
            let first = self.points[0];
            let last = self.points[self.points.len() - 1];
            if first.approx_eq(last, tolerance) {
                self.points.pop();
            } else {
                break;
            }
        }
    }
}

/// Пересечение бесконечных прямых, проходящих через два ребра.
///
/// Возвращает `None`, если прямые параллельны, совпадают или ребро вырождено
/// (нулевой знаменатель).
#[must_use]
pub fn line_intersection(e1: &Edge, e2: &Edge) -> Option<Point> {
    let (x1, y1, x2, y2) = (e1.p1.x, e1.p1.y, e1.p2.x, e1.p2.y);
    let (x3, y3, x4, y4) = (e2.p1.x, e2.p1.y, e2.p2.x, e2.p2.y);

    let denom = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }
    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denom;
    Some(Point::new(x1 + ua * (x2 - x1), y1 + ua * (y2 - y1)))
}

/// Лежит ли точка пересечения (уже находящаяся на прямой ребра) в пределах отрезка.
///
/// Границы расширены на [`EPSILON`], чтобы вершины многоугольника не терялись
/// из-за ошибок округления.
#[must_use]
pub fn is_intersection_in_edge(intersection: Point, edge: &Edge) -> bool {
    let (min_x, max_x) = (edge.p1.x.min(edge.p2.x), edge.p1.x.max(edge.p2.x));
    let (min_y, max_y) = (edge.p1.y.min(edge.p2.y), edge.p1.y.max(edge.p2.y));
    intersection.x >= min_x - EPSILON
        && intersection.x <= max_x + EPSILON
        && intersection.y >= min_y - EPSILON
        && intersection.y <= max_y + EPSILON
}

/// Пересекает ли бесконечная прямая хотя бы одно ребро многоугольника
#[must_use]
pub fn does_line_intersect_polygon(line: &Edge, polygon: &Polygon) -> bool {
    polygon.edges().iter().any(|edge| {
        line_intersection(edge, line).is_some_and(|p| is_intersection_in_edge(p, edge))
    })
}

/// Первая точка, в которой отрезок пересекает границу многоугольника
#[must_use]
pub fn does_segment_intersect_polygon(segment: &Edge, polygon: &Polygon) -> Option<Point> {
    polygon.edges().iter().find_map(|edge| {
        line_intersection(edge, segment)
            .filter(|&p| is_intersection_in_edge(p, edge) && is_intersection_in_edge(p, segment))
    })
}

/// Общее ребро двух многоугольников (точное совпадение вершин)
#[must_use]
pub fn find_common_edge(a: &Polygon, b: &Polygon) -> Option<Edge> {
    let b_edges = b.edges();
    a.edges()
        .into_iter()
        .find(|edge| b_edges.iter().any(|other| edge.equivalent(other)))
}

/// Ближайшая к `target` точка (первая из равноудалённых)
#[must_use]
pub fn point_closest_to(points: &[Point], target: Point) -> Option<Point> {
    points
        .iter()
        .copied()
        .min_by(|a, b| a.distance(target).total_cmp(&b.distance(target)))
}

/// Равномерно случайная точка на отрезке
pub fn random_point_on_edge(edge: &Edge, rng: &mut impl Rng) -> Point {
    let t: f64 = rng.gen_range(0.0..1.0);
    edge.p1 + (edge.p2 - edge.p1) * t
}

/// Склеивает рёбра с совпадающими концами в ломаные.
///
/// Ребро присоединяется к началу или концу первой подходящей ломаной; если после
/// этого новый конец совпадает с концом другой ломаной, обе сливаются в одну.
/// Рёбра, ни к чему не подошедшие, начинают новую ломаную.
#[must_use]
pub fn join_edges(edges: &[Edge]) -> Vec<Vec<Point>> {
    let mut chains: Vec<Vec<Point>> = Vec::new();

    for edge in edges {
        // (индекс ломаной, присоединено ли к концу)
        let mut joined: Option<(usize, bool)> = None;
        for (i, chain) in chains.iter_mut().enumerate() {
            let first = chain[0];
            let last = chain[chain.len() - 1];
            if edge.p1 == first {
                chain.insert(0, edge.p2);
                joined = Some((i, false));
            } else if edge.p2 == first {
                chain.insert(0, edge.p1);
                joined = Some((i, false));
            } else if edge.p1 == last {
                chain.push(edge.p2);
                joined = Some((i, true));
            } else if edge.p2 == last {
                chain.push(edge.p1);
                joined = Some((i, true));
            }
            if joined.is_some() {
                break;
            }
        }

        let Some((i, at_end)) = joined else {
            chains.push(vec![edge.p1, edge.p2]);
            continue;
        };

        let chain = &chains[i];
        let new_point = if at_end { chain[chain.len() - 1] } else { chain[0] };
        let partner = chains.iter().enumerate().find_map(|(j, other)| {
            if j == i {
                None
            } else if other[0] == new_point {
                Some((j, true))
            } else if other[other.len() - 1] == new_point {
                Some((j, false))
            } else {
                None
            }
        });

        if let Some((j, partner_starts_there)) = partner {
            let (hi, lo) = if i > j { (i, j) } else { (j, i) };
            let removed_hi = chains.remove(hi);
            let removed_lo = chains.remove(lo);
            let (mut chain, mut other) = if hi == i {
                (removed_hi, removed_lo)
            } else {
                (removed_lo, removed_hi)
            };
            let merged = match (at_end, partner_starts_there) {
                (true, true) => {
                    chain.extend_from_slice(&other[1..]);
                    chain
                }
                (true, false) => {
                    other.reverse();
                    chain.extend_from_slice(&other[1..]);
                    chain
                }
                (false, true) => {
                    chain.reverse();
                    chain.extend_from_slice(&other[1..]);
                    chain
                }
                (false, false) => {
                    other.extend_from_slice(&chain[1..]);
                    other
                }
            };
            chains.push(merged);
        }
    }

    chains
}

/// Рёбра ломаной (без замыкающего ребра)
#[must_use]
pub fn polyline_edges(points: &[Point]) -> Vec<Edge> {
    points.windows(2).map(|w| Edge::new(w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(x1: f64, y1: f64, x2: f64, y2: f64) -> Edge {
        Edge::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        assert!(line_intersection(&edge(-1.0, 0.0, 1.0, 0.0), &edge(-1.0, 1.0, 1.0, 1.0)).is_none());
        assert!(line_intersection(&edge(0.0, -1.0, 0.0, 1.0), &edge(1.0, -1.0, 1.0, 1.0)).is_none());
        assert!(line_intersection(&edge(0.0, 0.0, 1.0, 1.0), &edge(1.0, 0.0, 2.0, 1.0)).is_none());
    }

    #[test]
    fn colinear_lines_do_not_intersect() {
        assert!(line_intersection(&edge(0.0, 0.0, 1.0, 0.0), &edge(1.0, 0.0, 2.0, 0.0)).is_none());
        assert!(line_intersection(&edge(0.0, 0.0, 0.0, 1.0), &edge(0.0, 1.0, 0.0, 2.0)).is_none());
        assert!(line_intersection(&edge(0.0, 0.0, 1.0, 1.0), &edge(1.0, 1.0, 2.0, 2.0)).is_none());
        // перекрывающиеся колинеарные отрезки
        assert!(line_intersection(&edge(0.0, 0.0, 2.0, 0.0), &edge(1.0, 0.0, 3.0, 0.0)).is_none());
    }

    #[test]
    fn crossing_lines_meet_at_origin() {
        let vertical = edge(0.0, -1.0, 0.0, 1.0);
        let horizontal = edge(-1.0, 0.0, 1.0, 0.0);
        let upward = edge(-1.0, -1.0, 1.0, 1.0);
        let downward = edge(-1.0, 1.0, 1.0, -1.0);
        let origin = Point::new(0.0, 0.0);

        for (a, b) in [
            (vertical, horizontal),
            (vertical, upward),
            (horizontal, upward),
            (upward, downward),
        ] {
            let p = line_intersection(&a, &b).unwrap();
            assert!(p.approx_eq(origin, 1e-12), "{p:?}");
        }
    }

    #[test]
    fn intersection_outside_vertical_edge_is_rejected() {
        let wall = edge(1.0, -1.0, 1.0, 1.0);
        assert!(is_intersection_in_edge(Point::new(1.0, 0.5), &wall));
        assert!(!is_intersection_in_edge(Point::new(1.0, 4.0), &wall));
    }

    #[test]
    fn area_centroid_and_containment_of_square() {
        let square = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert_eq!(square.signed_area(), 4.0);
        assert_eq!(square.orientation(), 1.0);
        assert!(square.centroid().approx_eq(Point::new(1.0, 1.0), 1e-12));
        assert!(square.contains_point(Point::new(0.5, 1.5)));
        assert!(!square.contains_point(Point::new(2.5, 1.0)));
    }

    #[test]
    fn polygon_equivalence_ignores_rotation() {
        let a = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)]);
        let b = Polygon::new(vec![Point::new(1.0, 1.0), Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let c = Polygon::new(vec![Point::new(1.0, 0.0), Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert!(a.equivalent(&b));
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn edges_are_equivalent_in_both_directions() {
        let a = edge(0.0, 0.0, 1.0, 2.0);
        let b = edge(1.0, 2.0, 0.0, 0.0);
        assert!(a.equivalent(&b));
        assert!(a.approx_eq(&edge(1.0, 2.0, 0.0, 1e-9), 1e-6));
    }

    #[test]
    fn join_edges_chains_shuffled_segments() {
        let p = |x: f64| Point::new(x, 0.0);
        let edges = vec![
            Edge::new(p(0.0), p(1.0)),
            Edge::new(p(3.0), p(4.0)),
            Edge::new(p(2.0), p(1.0)),
            Edge::new(p(2.0), p(3.0)),
            Edge::new(p(10.0), p(11.0)),
        ];
        let mut chains = join_edges(&edges);
        chains.sort_by_key(|c| std::cmp::Reverse(c.len()));

        assert_eq!(chains.len(), 2);
        let mut xs: Vec<f64> = chains[0].iter().map(|p| p.x).collect();
        if xs[0] > xs[xs.len() - 1] {
            xs.reverse();
        }
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(chains[1].len(), 2);
    }

    #[test]
    fn closest_point_prefers_first_of_ties() {
        let points = [Point::new(1.0, 0.0), Point::new(-1.0, 0.0), Point::new(5.0, 5.0)];
        assert_eq!(point_closest_to(&points, Point::new(0.0, 0.0)), Some(points[0]));
        assert_eq!(point_closest_to(&[], Point::new(0.0, 0.0)), None);
    }
}
