// src/roads.rs
//! Дороги между деревнями
//!
//! Деревни соединяются парами по триангуляции Делоне их сайтов. Каждая пара
//! связывается кратчайшим путём по рёбрам тесселяции, не пересекающим воду,
//! реку и хребты. Уже проложенные участки вдвое дешевле, поэтому дороги
//! сливаются в общую сеть.

use std::collections::{BTreeSet, HashSet};

use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeFiltered, EdgeRef};
use tracing::debug;

use crate::district::{District, DistrictType, Relation, link};
use crate::geometry::{Point, point_closest_to};
use crate::tessellation::{Tessellation, neighbor_pairs};

/// Множитель стоимости ребра, по которому уже идёт дорога
const SHARED_ROAD_DISCOUNT: f64 = 0.5;

/// Можно ли вести дорогу по ребру тесселяции
#[must_use]
pub fn is_road_edge_allowed(tess: &Tessellation, districts: &[District], edge: usize) -> bool {
    tess.edges[edge].cells().is_some_and(|(l, r)| {
        let (left, right) = (&districts[l], &districts[r]);
        !left.is_water()
            && !right.is_water()
            && !left.rivers.contains(&r)
            && !left.ridges.contains(&r)
    })
}

/// Пары деревень, которые соединяются дорогами, в порядке возрастания id
#[must_use]
pub fn village_pairs(districts: &[District], width: f64, height: f64, margin: f64) -> Vec<(usize, usize)> {
    let villages: Vec<usize> = districts
        .iter()
        .filter(|d| d.district_type == DistrictType::Village)
        .map(|d| d.id)
        .collect();
    let sites: Vec<Point> = villages.iter().map(|&v| districts[v].site).collect();
    neighbor_pairs(
        &sites,
        Point::new(-margin, -margin),
        Point::new(width + margin, height + margin),
    )
    .into_iter()
    .map(|(a, b)| (villages[a], villages[b]))
    .collect()
}

/// Прокладывает дороги между парами деревень.
///
/// Рёбра дорог, лежащие на границе самой деревни, отбрасываются; районы по
/// обе стороны оставшихся рёбер связываются через дорогу, а у деревень
/// запоминаются углы, в которые приходят дороги. Возвращает индексы рёбер
/// тесселяции, занятых дорогами, по возрастанию.
pub fn route_roads(
    tess: &Tessellation,
    districts: &mut [District],
    pairs: &[(usize, usize)],
) -> Vec<usize> {
    let start = std::time::Instant::now();
    let allowed: Vec<bool> = (0..tess.edges.len())
        .map(|e| is_road_edge_allowed(tess, districts, e))
        .collect();
    let graph = EdgeFiltered::from_fn(&tess.graph, |e| allowed[e.id().index()]);

    let mut used: HashSet<usize> = HashSet::new();
    let mut skipped = 0_usize;
    for &(a, b) in pairs {
        let (Some(from), Some(to)) = (
            road_endpoint(tess, &districts[a], districts[b].site),
            road_endpoint(tess, &districts[b], districts[a].site),
        ) else {
            skipped += 1;
            continue;
        };

        let target = NodeIndex::new(to);
        let route = astar(
            &graph,
            NodeIndex::new(from),
            |n| n == target,
            |e| {
                if used.contains(&e.id().index()) {
                    *e.weight() * SHARED_ROAD_DISCOUNT
                } else {
                    *e.weight()
                }
            },
            |_| 0.0,
        );
        let Some((_, path)) = route else {
            debug!(from = a, to = b, "Между деревнями нет пути");
            skipped += 1;
            continue;
        };
        for w in path.windows(2) {
            if let Some(edge) = tess.edge_between(w[0].index(), w[1].index()) {
                used.insert(edge);
            }
        }
    }

    let kept: BTreeSet<usize> = used
        .into_iter()
        .filter(|&e| {
            tess.edges[e].cells().is_some_and(|(l, r)| {
                districts[l].district_type != DistrictType::Village
                    && districts[r].district_type != DistrictType::Village
            })
        })
        .collect();

    for district in districts.iter_mut() {
        district.road_ends.clear();
    }
    for &edge in &kept {
        let e = tess.edges[edge];
        if let Some((l, r)) = e.cells() {
            link(districts, l, r, Relation::Road);
        }
        for vertex in [e.a, e.b] {
            for &cell in &tess.vertex_cells[vertex] {
                let district = &mut districts[cell];
                let corner = tess.vertices[vertex];
                if district.district_type == DistrictType::Village
                    && !district.road_ends.contains(&corner)
                {
                    district.road_ends.push(corner);
                }
            }
        }
    }

    debug!(
        pairs = pairs.len(),
        skipped,
        edges = kept.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Дороги проложены"
    );
    kept.into_iter().collect()
}

/// Угол деревни, ближайший к сайту другой деревни, как вершина тесселяции
fn road_endpoint(tess: &Tessellation, village: &District, towards: Point) -> Option<usize> {
    let corner = point_closest_to(&village.original_polygon.points, towards)?;
    tess.vertex_at(corner)
}
