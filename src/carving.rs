// src/carving.rs
//! Отступы границ районов под реку, хребты, дороги и улицы

use tracing::debug;

use crate::district::{District, DistrictType};
use crate::geometry::{Edge, inset_polygon_edge_at};

/// Полоса вдоль хребта
const RIDGE_INSET: f64 = 30.0;
const ROAD_INSET: f64 = 3.0;
/// Запас берега с каждой стороны реки
const RIVER_BANK: f64 = 3.0;
/// Сельские районы отступают от рек, хребтов и дорог дальше
const RURAL_EXTRA_INSET: f64 = 2.0;

/// Сдвинутое ребро сельского района вдоль дороги: здесь встаёт пригородная застройка
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadFrontage {
    pub district: usize,
    pub edge: Edge,
}

/// Отступ всех рёбер района в зависимости от его типа
#[must_use]
pub fn street_inset(district_type: DistrictType) -> f64 {
    match district_type {
        DistrictType::Rural => 1.0,
        DistrictType::Village | DistrictType::Urban => 3.0,
        DistrictType::Plaza | DistrictType::Water | DistrictType::Forest => 0.0,
    }
}

/// Отступ ребра, общего с соседом `neighbor`, и признак дороги
fn feature_inset(district: &District, neighbor: usize, river_width: f64) -> Option<(f64, bool)> {
    let (inset, is_road) = if district.rivers.contains(&neighbor) {
        (river_width / 2.0 + RIVER_BANK, false)
    } else if district.ridges.contains(&neighbor) {
        (RIDGE_INSET, false)
    } else if district.roads.contains(&neighbor) {
        (ROAD_INSET, true)
    } else {
        return None;
    };
    let extra = if district.district_type == DistrictType::Rural {
        RURAL_EXTRA_INSET
    } else {
        0.0
    };
    Some((inset + extra, is_road))
}

/// Прорезает в сухопутных районах место под реку, хребты и дороги.
///
/// Каждое исходное ребро, общее с соседом через реку, хребет или дорогу,
/// сдвигается внутрь. Индексы исходных вершин отслеживаются параллельной копией,
/// из которой убираются вырезанные вершины. Возвращает сдвинутые дорожные рёбра
/// сельских районов.
pub fn carve_features(districts: &mut [District], river_width: f64) -> Vec<RoadFrontage> {
    let mut frontage = Vec::new();
    let mut failed = 0_usize;

    for id in 0..districts.len() {
        if districts[id].is_water() {
            continue;
        }
        let mut copy = districts[id].polygon.points.clone();
        for edge in districts[id].original_polygon.edges() {
            let Some(neighbor) = districts[id].neighbors.iter().copied().find(|&n| {
                let other = &districts[n].original_polygon.points;
                other.contains(&edge.p1) && other.contains(&edge.p2)
            }) else {
                continue;
            };
            let Some((inset, is_road)) = feature_inset(&districts[id], neighbor, river_width) else {
                continue;
            };
            let Some(index) = copy.iter().position(|&p| p == edge.p1) else {
                continue;
            };

            let district = &mut districts[id];
            let Some(result) = inset_polygon_edge_at(&mut district.polygon, index, inset) else {
                failed += 1;
                continue;
            };
            for &spliced in result.spliced.iter().rev() {
                copy.remove(spliced);
            }
            if is_road && district.district_type == DistrictType::Rural {
                frontage.push(RoadFrontage {
                    district: id,
                    edge: result.new_edge,
                });
            }
        }
    }

    debug!(frontage = frontage.len(), failed, "Прорезаны река, хребты и дороги");
    frontage
}

/// Сдвигает каждое ребро района внутрь на ширину полосы улицы его типа
pub fn inset_districts(districts: &mut [District]) {
    let mut failed = 0_usize;
    for district in districts.iter_mut() {
        let inset = street_inset(district.district_type);
        if inset <= 0.0 {
            continue;
        }
        let mut i = 0;
        while i < district.polygon.len() {
            match inset_polygon_edge_at(&mut district.polygon, i, inset) {
                Some(result) => i -= result.spliced.iter().filter(|&&s| s < i).count(),
                None => failed += 1,
            }
            i += 1;
        }
    }
    debug!(failed, "Границы районов сдвинуты под улицы");
}
