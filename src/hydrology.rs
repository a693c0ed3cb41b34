// src/hydrology.rs
//! Береговые линии, главная река и хребты

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::district::{District, Relation, link};
use crate::error::AttemptError;
use crate::geometry::{Edge, Point, join_edges, polyline_edges};
use crate::heightmap::Heightmap;
use crate::tessellation::Tessellation;

/// Минимальный перепад высот соседних районов, образующий хребет
const RIDGE_HEIGHT_DELTA: f64 = 0.08;
/// Хребты из стольких точек и короче отбрасываются
const RIDGE_MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub path: Vec<Point>,
    pub width: f64,
}

/// Ломаные по рёбрам, разделяющим воду и сушу, от длинных к коротким
#[must_use]
pub fn find_coasts(tess: &Tessellation, districts: &[District]) -> Vec<Vec<Point>> {
    let segments: Vec<Edge> = tess
        .edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| {
            edge.cells()
                .is_some_and(|(l, r)| districts[l].is_water() != districts[r].is_water())
        })
        .map(|(i, _)| tess.segment(i))
        .collect();

    let mut coasts = join_edges(&segments);
    coasts.sort_by_key(|c| std::cmp::Reverse(c.len()));
    debug!(segments = segments.len(), coasts = coasts.len(), "Береговые линии найдены");
    coasts
}

/// Прокладывает реку от самой низкой вершины верхнего края вниз по склону до воды.
///
/// Ширина реки берётся из потока случайных чисел. Возвращает реку и индексы
/// пройденных рёбер тесселяции. Река, пошедшая в гору или вернувшаяся в
/// пройденную вершину, означает отказ попытки.
pub fn trace_river(
    tess: &Tessellation,
    heightmap: &Heightmap,
    districts: &[District],
    rng: &mut impl Rng,
) -> Result<(River, Vec<usize>), AttemptError> {
    let width = f64::from(rng.gen_range(30_u32..60));
    let heights = &heightmap.heights;

    let source = (0..tess.vertices.len())
        .filter(|&v| tess.vertices[v].y == 0.0)
        .min_by(|&a, &b| heights[a].total_cmp(&heights[b]))
        .ok_or(AttemptError::NoRiverSource)?;

    let on_water = |v: usize| tess.vertex_cells[v].iter().any(|&c| districts[c].is_water());

    let mut vertices = vec![source];
    let mut visited = HashSet::from([source]);
    let mut current = source;
    loop {
        let next = heightmap
            .lowest_neighbor(tess, current)
            .ok_or(AttemptError::RiverStalled { vertex: current })?;
        if heights[next] > heights[current] || !visited.insert(next) {
            debug!(vertex = current, "Река остановилась");
            return Err(AttemptError::RiverStalled { vertex: current });
        }
        vertices.push(next);
        if on_water(next) {
            break;
        }
        current = next;
    }

    let edges = vertices
        .windows(2)
        .filter_map(|w| tess.edge_between(w[0], w[1]))
        .collect();
    let path = vertices.iter().map(|&v| tess.vertices[v]).collect();
    debug!(length = vertices.len(), width, "Река проложена");
    Ok((River { path, width }, edges))
}

/// Районы по обе стороны пройденных рекой рёбер становятся соседями через реку
pub fn mark_rivers(tess: &Tessellation, districts: &mut [District], river_edges: &[usize]) {
    for &edge in river_edges {
        if let Some((l, r)) = tess.edges[edge].cells() {
            link(districts, l, r, Relation::River);
        }
    }
}

/// Находит хребты: рёбра между сухопутными районами с большим перепадом высот,
/// не разделёнными рекой. Короткие цепочки отбрасываются; районы вдоль
/// оставшихся помечаются соседями через хребет.
///
/// Возвращает ломаные хребтов и индексы их рёбер тесселяции.
pub fn find_ridges(tess: &Tessellation, districts: &mut [District]) -> (Vec<Vec<Point>>, Vec<usize>) {
    let segments: Vec<Edge> = tess
        .edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| {
            edge.cells().is_some_and(|(l, r)| {
                let (left, right) = (&districts[l], &districts[r]);
                !left.is_water()
                    && !right.is_water()
                    && !left.rivers.contains(&r)
                    && (left.height - right.height).abs() > RIDGE_HEIGHT_DELTA
            })
        })
        .map(|(i, _)| tess.segment(i))
        .collect();

    let ridges: Vec<Vec<Point>> = join_edges(&segments)
        .into_iter()
        .filter(|ridge| ridge.len() > RIDGE_MIN_LENGTH)
        .collect();

    let mut ridge_edges = Vec::new();
    for ridge in &ridges {
        for segment in polyline_edges(ridge) {
            let Some(edge) = tess.edge_at(&segment) else {
                continue;
            };
            ridge_edges.push(edge);
            if let Some((l, r)) = tess.edges[edge].cells() {
                link(districts, l, r, Relation::Ridge);
            }
        }
    }
    debug!(
        candidates = segments.len(),
        ridges = ridges.len(),
        "Хребты найдены"
    );
    (ridges, ridge_edges)
}
