// src/map.rs
//! Готовая карта и её сериализованная запись
//!
//! [`Map`] неизменяема после генерации: поля доступны только через методы.
//! Для обмена карта превращается в [`MapRecord`], где связи районов записаны
//! координатами сайтов; при чтении они снова разрешаются в id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MapType;
use crate::district::{District, DistrictType};
use crate::error::RecordError;
use crate::geometry::{Edge, Point, PointKey, Polygon};
use crate::hydrology::River;

/// Нефатальная диагностика генерации
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapWarning {
    #[error("разбиение района {district} на кварталы прервано по лимиту итераций")]
    SubdivisionAborted { district: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub(crate) districts: Vec<District>,
    pub(crate) coasts: Vec<Vec<Point>>,
    pub(crate) river: River,
    pub(crate) ridges: Vec<Vec<Point>>,
    pub(crate) bridges: Vec<Edge>,
    pub(crate) sprawl: Vec<Polygon>,
    pub(crate) archetype: MapType,
    pub(crate) seed: u64,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) warnings: Vec<MapWarning>,
}

impl Map {
    #[must_use]
    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    #[must_use]
    pub fn district(&self, id: usize) -> Option<&District> {
        self.districts.get(id)
    }

    /// Городское ядро
    #[must_use]
    pub fn core(&self) -> Option<&District> {
        self.districts.iter().find(|d| d.is_core)
    }

    /// Береговые линии, от длинных к коротким
    #[must_use]
    pub fn coasts(&self) -> &[Vec<Point>] {
        &self.coasts
    }

    #[must_use]
    pub fn river(&self) -> &River {
        &self.river
    }

    #[must_use]
    pub fn ridges(&self) -> &[Vec<Point>] {
        &self.ridges
    }

    #[must_use]
    pub fn bridges(&self) -> &[Edge] {
        &self.bridges
    }

    /// Пригородные дома вдоль дорог
    #[must_use]
    pub fn sprawl(&self) -> &[Polygon] {
        &self.sprawl
    }

    #[must_use]
    pub fn archetype(&self) -> MapType {
        self.archetype
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[must_use]
    pub fn warnings(&self) -> &[MapWarning] {
        &self.warnings
    }

    /// Можно ли перейти из района `a` в район `b`: соседи, не разделены хребтом
    /// и не разделены рекой без моста
    #[must_use]
    pub fn are_districts_adjacent(&self, a: usize, b: usize) -> bool {
        let Some(from) = self.districts.get(a) else {
            return false;
        };
        from.neighbors.contains(&b)
            && !from.ridges.contains(&b)
            && (!from.rivers.contains(&b) || from.bridges.contains(&b))
    }

    /// Соседи, в которые можно перейти из района
    #[must_use]
    pub fn passable_neighbors(&self, id: usize) -> Vec<usize> {
        self.districts.get(id).map_or_else(Vec::new, |d| {
            d.neighbors
                .iter()
                .copied()
                .filter(|&n| self.are_districts_adjacent(id, n))
                .collect()
        })
    }

    #[must_use]
    pub fn to_record(&self) -> MapRecord {
        let site = |id: usize| self.districts[id].site;
        let sites = |ids: &[usize]| -> Vec<Point> { ids.iter().map(|&id| site(id)).collect() };
        let districts = self
            .districts
            .iter()
            .map(|d| DistrictRecord {
                id: d.id,
                name: d.name.clone(),
                district_type: d.district_type,
                site: d.site,
                polygon: d.polygon.clone(),
                original_polygon: d.original_polygon.clone(),
                height: d.height,
                chaos: d.chaos,
                block_size: d.block_size,
                street_width: d.street_width,
                is_core: d.is_core,
                blocks: d.blocks.clone(),
                road_ends: d.road_ends.clone(),
                landmark: d.landmark.clone(),
                neighbors: sites(&d.neighbors),
                rivers: sites(&d.rivers),
                bridges: sites(&d.bridges),
                ridges: sites(&d.ridges),
                roads: sites(&d.roads),
            })
            .collect();

        MapRecord {
            seed: self.seed,
            width: self.width,
            height: self.height,
            archetype: self.archetype,
            districts,
            coasts: self.coasts.clone(),
            river: self.river.clone(),
            ridges: self.ridges.clone(),
            bridges: self.bridges.clone(),
            sprawl: self.sprawl.clone(),
            warnings: self.warnings.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Восстанавливает карту из записи, разрешая связи по координатам сайтов.
    ///
    /// Id района должен совпадать с его позицией; сайты должны быть уникальны.
    /// Вершины тесселяции (`corners`) в записи не хранятся и остаются пустыми.
    pub fn from_record(record: MapRecord) -> Result<Self, RecordError> {
        let mut lookup: HashMap<PointKey, usize> = HashMap::with_capacity(record.districts.len());
        for (index, d) in record.districts.iter().enumerate() {
            if d.id != index {
                return Err(RecordError::IdMismatch { index, id: d.id });
            }
            if lookup.insert(d.site.key(), index).is_some() {
                return Err(RecordError::DuplicateSite {
                    x: d.site.x,
                    y: d.site.y,
                });
            }
        }
        let resolve = |sites: &[Point]| -> Result<Vec<usize>, RecordError> {
            sites
                .iter()
                .map(|p| {
                    lookup
                        .get(&p.key())
                        .copied()
                        .ok_or(RecordError::UnknownSite { x: p.x, y: p.y })
                })
                .collect()
        };

        let mut districts = Vec::with_capacity(record.districts.len());
        for r in &record.districts {
            let mut district = District::new(r.id, r.site, r.original_polygon.clone(), Vec::new());
            district.name.clone_from(&r.name);
            district.district_type = r.district_type;
            district.polygon = r.polygon.clone();
            district.height = r.height;
            district.chaos = r.chaos;
            district.block_size = r.block_size;
            district.street_width = r.street_width;
            district.is_core = r.is_core;
            district.blocks = r.blocks.clone();
            district.road_ends = r.road_ends.clone();
            district.landmark = r.landmark.clone();
            district.neighbors = resolve(&r.neighbors)?;
            district.rivers = resolve(&r.rivers)?;
            district.bridges = resolve(&r.bridges)?;
            district.ridges = resolve(&r.ridges)?;
            district.roads = resolve(&r.roads)?;
            districts.push(district);
        }

        Ok(Self {
            districts,
            coasts: record.coasts,
            river: record.river,
            ridges: record.ridges,
            bridges: record.bridges,
            sprawl: record.sprawl,
            archetype: record.archetype,
            seed: record.seed,
            width: record.width,
            height: record.height,
            warnings: record.warnings,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        Self::from_record(serde_json::from_str(json)?)
    }

    /// Число районов каждого типа
    #[must_use]
    pub fn type_counts(&self) -> HashMap<DistrictType, usize> {
        let mut counts = HashMap::new();
        for d in &self.districts {
            *counts.entry(d.district_type).or_insert(0) += 1;
        }
        counts
    }
}

/// Район в сериализованном виде: связи записаны сайтами соседей
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictRecord {
    pub id: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub district_type: DistrictType,
    pub site: Point,
    pub polygon: Polygon,
    pub original_polygon: Polygon,
    pub height: f64,
    pub chaos: f64,
    pub block_size: f64,
    pub street_width: f64,
    pub is_core: bool,
    pub blocks: Vec<Polygon>,
    pub road_ends: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<Polygon>,
    pub neighbors: Vec<Point>,
    pub rivers: Vec<Point>,
    pub bridges: Vec<Point>,
    pub ridges: Vec<Point>,
    pub roads: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub seed: u64,
    pub width: f64,
    pub height: f64,
    pub archetype: MapType,
    pub districts: Vec<DistrictRecord>,
    pub coasts: Vec<Vec<Point>>,
    pub river: River,
    pub ridges: Vec<Vec<Point>>,
    pub bridges: Vec<Edge>,
    pub sprawl: Vec<Polygon>,
    #[serde(default)]
    pub warnings: Vec<MapWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::district::{Relation, link};

    fn district(id: usize) -> District {
        let x = id as f64 * 10.0;
        let polygon = Polygon::new(vec![
            Point::new(x, 0.0),
            Point::new(x + 10.0, 0.0),
            Point::new(x + 10.0, 10.0),
            Point::new(x, 10.0),
        ]);
        District::new(id, Point::new(x + 5.0, 5.0), polygon, Vec::new())
    }

    /// Четыре района в ряд: 0|1 река с мостом, 1|2 река без моста, 2|3 хребет
    fn sample() -> Map {
        let mut districts: Vec<District> = (0..4).map(district).collect();
        for i in 1..4 {
            link(&mut districts, i - 1, i, Relation::Neighbor);
        }
        link(&mut districts, 0, 1, Relation::River);
        link(&mut districts, 0, 1, Relation::Bridge);
        link(&mut districts, 1, 2, Relation::River);
        link(&mut districts, 2, 3, Relation::Ridge);
        districts[0].is_core = true;
        districts[0].district_type = DistrictType::Urban;
        districts[0].name = "Salt Wharf".to_string();
        Map {
            districts,
            coasts: vec![vec![Point::new(0.0, 10.0), Point::new(40.0, 10.0)]],
            river: River {
                path: vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
                width: 42.0,
            },
            ridges: Vec::new(),
            bridges: vec![Edge::new(Point::new(5.0, 5.0), Point::new(15.0, 5.0))],
            sprawl: Vec::new(),
            archetype: MapType::Delta,
            seed: 7,
            width: 40.0,
            height: 10.0,
            warnings: vec![MapWarning::SubdivisionAborted { district: 3 }],
        }
    }

    #[test]
    fn adjacency_respects_rivers_bridges_and_ridges() {
        let map = sample();
        assert!(map.are_districts_adjacent(0, 1));
        assert!(!map.are_districts_adjacent(1, 2));
        assert!(!map.are_districts_adjacent(2, 3));
        assert!(!map.are_districts_adjacent(0, 2));
        assert!(!map.are_districts_adjacent(0, 99));
        assert_eq!(map.passable_neighbors(1), vec![0]);
        assert!(map.passable_neighbors(3).is_empty());
    }

    #[test]
    fn json_round_trip_relinks_districts() {
        let map = sample();
        let json = map.to_json().unwrap();
        let restored = Map::from_json(&json).unwrap();

        assert_eq!(restored.to_json().unwrap(), json);
        assert_eq!(restored.districts()[1].rivers, vec![0, 2]);
        assert_eq!(restored.districts()[0].bridges, vec![1]);
        assert_eq!(restored.core().map(|d| d.id), Some(0));
        assert_eq!(restored.archetype(), MapType::Delta);
        assert_eq!(restored.warnings(), map.warnings());
    }

    #[test]
    fn unknown_site_is_rejected() {
        let mut record = sample().to_record();
        record.districts[2].neighbors.push(Point::new(-1.0, -1.0));
        assert!(matches!(
            Map::from_record(record),
            Err(RecordError::UnknownSite { .. })
        ));
    }

    #[test]
    fn duplicate_site_and_bad_id_are_rejected() {
        let mut record = sample().to_record();
        record.districts[3].site = record.districts[0].site;
        assert!(matches!(
            Map::from_record(record),
            Err(RecordError::DuplicateSite { .. })
        ));

        let mut record = sample().to_record();
        record.districts[1].id = 5;
        assert!(matches!(
            Map::from_record(record),
            Err(RecordError::IdMismatch { index: 1, id: 5 })
        ));
    }

    #[test]
    fn record_uses_camel_case_and_type_tag() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"type\":\"urban\""));
        assert!(json.contains("\"originalPolygon\""));
        assert!(json.contains("\"kind\":\"subdivision_aborted\""));
    }
}
