// src/geometry/slice.rs
//! Разрезание многоугольника прямой и разбиение на клинья

use tracing::debug;

use super::{
    EPSILON, Edge, Point, Polygon, inset_polygon_edge_at, is_intersection_in_edge,
    line_intersection,
};

const DEDUP_TOLERANCE: f64 = 1e-9;

/// Разрезает многоугольник бесконечной прямой на две части.
///
/// Прямая должна пересечь ровно два ребра (попадание в общую вершину двух рёбер
/// считается один раз). Ребро разреза каждой половины сдвигается внутрь на
/// `street_gap / 2`; если сдвиг не удался, половина остаётся без отступа.
#[must_use]
pub fn slice_polygon(polygon: &Polygon, line: &Edge, street_gap: f64) -> Option<(Polygon, Polygon)> {
    let n = polygon.len();
    if n < 3 {
        return None;
    }

    let mut hits: Vec<(usize, Point)> = Vec::with_capacity(2);
    for (i, edge) in polygon.edges().iter().enumerate() {
        let Some(hit) = line_intersection(edge, line) else {
            continue;
        };
        if !is_intersection_in_edge(hit, edge) {
            continue;
        }
        if hits.iter().any(|&(_, p)| p.approx_eq(hit, EPSILON)) {
            continue;
        }
        hits.push((i, hit));
    }

    if hits.len() != 2 {
        debug!("Разрез: прямая пересекает {} рёбер вместо двух", hits.len());
        return None;
    }
    let (a, first_hit) = hits[0];
    let (b, second_hit) = hits[1];

    let mut first = Vec::with_capacity(b - a + 2);
    first.push(first_hit);
    first.extend_from_slice(&polygon.points[a + 1..=b]);
    first.push(second_hit);

    let mut second = Vec::with_capacity(n - (b - a) + 2);
    second.push(second_hit);
    second.extend_from_slice(&polygon.points[b + 1..]);
    second.extend_from_slice(&polygon.points[..=a]);
    second.push(first_hit);

    let mut first = Polygon::new(first);
    let mut second = Polygon::new(second);
    first.dedup(DEDUP_TOLERANCE);
    second.dedup(DEDUP_TOLERANCE);
    if first.len() < 3 || second.len() < 3 {
        return None;
    }

    if street_gap > 0.0 {
        // у обеих половин ребро разреза последнее (от последней вершины к первой)
        for half in [&mut first, &mut second] {
            let cut = half.len() - 1;
            if inset_polygon_edge_at(half, cut, street_gap / 2.0).is_none() {
                debug!("Разрез: не удалось отступить улицу шириной {}", street_gap);
            }
        }
    }

    Some((first, second))
}

/// Разбивает многоугольник на треугольники: по одному на каждое ребро с общей
/// вершиной `interior`.
#[must_use]
pub fn shatter_polygon(polygon: &Polygon, interior: Point) -> Vec<Polygon> {
    polygon
        .edges()
        .into_iter()
        .map(|edge| Polygon::new(vec![edge.p1, edge.p2, interior]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            Point::new(-1.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, -1.0),
            Point::new(-1.0, -1.0),
        ])
    }

    /// Склеивает половины по линии разреза: точки разреза стоят на концах
    /// обеих половин и выбрасываются
    fn rejoin(first: &Polygon, second: &Polygon) -> Polygon {
        let mut points = first.points[1..first.len() - 1].to_vec();
        points.extend_from_slice(&second.points[1..second.len() - 1]);
        Polygon::new(points)
    }

    #[test]
    fn slice_with_zero_gap_reconstructs_polygon() {
        let poly = square();
        let line = Edge::new(Point::new(0.2, -5.0), Point::new(0.2, 5.0));
        let (left, right) = slice_polygon(&poly, &line, 0.0).unwrap();

        assert!((left.area() + right.area() - poly.area()).abs() < 1e-9);
        assert!((left.area() - 1.6).abs() < 1e-9 || (right.area() - 1.6).abs() < 1e-9);
        assert!(left.points[0].approx_eq(*right.points.last().unwrap(), 1e-12));
        assert!(right.points[0].approx_eq(*left.points.last().unwrap(), 1e-12));
        assert!(rejoin(&left, &right).approx_eq(&poly, 1e-9));
    }

    #[test]
    fn slanted_cut_of_pentagon_rejoins() {
        let pentagon = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, -1.0),
            Point::new(6.0, 2.0),
            Point::new(3.0, 5.0),
            Point::new(-1.0, 3.0),
        ]);
        let line = Edge::new(Point::new(-2.0, 1.0), Point::new(8.0, 2.5));
        let (a, b) = slice_polygon(&pentagon, &line, 0.0).unwrap();

        assert_eq!(a.len() + b.len(), pentagon.len() + 4);
        assert!((a.area() + b.area() - pentagon.area()).abs() < 1e-9);
        assert!(rejoin(&a, &b).approx_eq(&pentagon, 1e-9));
    }

    #[test]
    fn slice_through_vertices_counts_shared_hit_once() {
        let poly = square();
        let diagonal = Edge::new(Point::new(-2.0, 2.0), Point::new(2.0, -2.0));
        let (a, b) = slice_polygon(&poly, &diagonal, 0.0).unwrap();

        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 3);
        assert!((a.area() - 2.0).abs() < 1e-9);
        assert!((b.area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn slice_missing_polygon_fails() {
        let line = Edge::new(Point::new(5.0, -5.0), Point::new(5.0, 5.0));
        assert!(slice_polygon(&square(), &line, 0.0).is_none());
    }

    #[test]
    fn slice_with_gap_leaves_street_between_halves() {
        let line = Edge::new(Point::new(0.0, -5.0), Point::new(0.0, 5.0));
        let (a, b) = slice_polygon(&square(), &line, 0.2).unwrap();

        assert!((a.area() - 0.9 * 2.0).abs() < 1e-9);
        assert!((b.area() - 0.9 * 2.0).abs() < 1e-9);
        let min_gap = a
            .points
            .iter()
            .flat_map(|p| b.points.iter().map(move |q| (p.x - q.x).abs()))
            .fold(f64::INFINITY, f64::min);
        assert!((min_gap - 0.2).abs() < 1e-9);
    }

    #[test]
    fn shatter_gives_one_triangle_per_edge() {
        let pieces = shatter_polygon(&square(), Point::new(0.0, 0.0));
        assert_eq!(pieces.len(), 4);
        let total: f64 = pieces.iter().map(Polygon::area).sum();
        assert!((total - 4.0).abs() < 1e-12);
        assert!(pieces.iter().all(|p| p.points[2] == Point::new(0.0, 0.0)));
    }
}
