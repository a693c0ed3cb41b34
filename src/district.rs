// src/district.rs
//! Район: основная ячейка карты
//!
//! Районы живут в плотном `Vec`, индекс в котором и есть `id`. Связи между
//! районами хранятся списками id и всегда симметричны: их добавляет только [`link`].

use serde::{Deserialize, Serialize};

use crate::config::{Density, DensityParams};
use crate::geometry::{Point, Polygon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistrictType {
    Rural,
    Urban,
    Plaza,
    Water,
    Village,
    Forest,
}

impl DistrictType {
    #[must_use]
    pub fn is_water(self) -> bool {
        self == DistrictType::Water
    }

    /// Застроенный район: деревня или город
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, DistrictType::Urban | DistrictType::Village)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct District {
    pub id: usize,
    pub name: String,
    pub district_type: DistrictType,
    /// Сайт ячейки Вороного
    pub site: Point,
    /// Текущая граница (после отступов под реку, дороги и улицы)
    pub polygon: Polygon,
    /// Исходная граница ячейки
    pub original_polygon: Polygon,
    /// Id вершин тесселяции, образующих `original_polygon`
    pub corners: Vec<usize>,
    pub height: f64,
    pub chaos: f64,
    pub block_size: f64,
    pub street_width: f64,
    pub blocks: Vec<Polygon>,
    /// Вершины `original_polygon`, в которых заканчиваются дороги
    pub road_ends: Vec<Point>,
    pub is_core: bool,
    /// Контур главного здания городского ядра
    pub landmark: Option<Polygon>,

    pub neighbors: Vec<usize>,
    /// Соседи через реку
    pub rivers: Vec<usize>,
    /// Соседи через реку, с которыми есть мост
    pub bridges: Vec<usize>,
    /// Соседи за хребтом
    pub ridges: Vec<usize>,
    /// Соседи, граница с которыми идёт по дороге
    pub roads: Vec<usize>,
}

impl District {
    #[must_use]
    pub fn new(id: usize, site: Point, polygon: Polygon, corners: Vec<usize>) -> Self {
        let DensityParams {
            chaos,
            block_size,
            street_width,
        } = Density::Rural.params();
        Self {
            id,
            name: String::new(),
            district_type: DistrictType::Rural,
            site,
            original_polygon: polygon.clone(),
            polygon,
            corners,
            height: 0.0,
            chaos,
            block_size,
            street_width,
            blocks: Vec::new(),
            road_ends: Vec::new(),
            is_core: false,
            landmark: None,
            neighbors: Vec::new(),
            rivers: Vec::new(),
            bridges: Vec::new(),
            ridges: Vec::new(),
            roads: Vec::new(),
        }
    }

    pub fn set_density(&mut self, density: Density) {
        let params = density.params();
        self.chaos = params.chaos;
        self.block_size = params.block_size;
        self.street_width = params.street_width;
    }

    #[must_use]
    pub fn is_water(&self) -> bool {
        self.district_type.is_water()
    }

    #[must_use]
    pub fn relations(&self, relation: Relation) -> &[usize] {
        match relation {
            Relation::Neighbor => &self.neighbors,
            Relation::River => &self.rivers,
            Relation::Bridge => &self.bridges,
            Relation::Ridge => &self.ridges,
            Relation::Road => &self.roads,
        }
    }

    fn relations_mut(&mut self, relation: Relation) -> &mut Vec<usize> {
        match relation {
            Relation::Neighbor => &mut self.neighbors,
            Relation::River => &mut self.rivers,
            Relation::Bridge => &mut self.bridges,
            Relation::Ridge => &mut self.ridges,
            Relation::Road => &mut self.roads,
        }
    }
}

/// Вид связи между двумя районами
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Neighbor,
    River,
    Bridge,
    Ridge,
    Road,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Neighbor,
        Relation::River,
        Relation::Bridge,
        Relation::Ridge,
        Relation::Road,
    ];
}

/// Симметрично связывает два района; повторная связь не дублируется
pub fn link(districts: &mut [District], a: usize, b: usize, relation: Relation) {
    if a == b {
        return;
    }
    let list = districts[a].relations_mut(relation);
    if !list.contains(&b) {
        list.push(b);
    }
    let list = districts[b].relations_mut(relation);
    if !list.contains(&a) {
        list.push(a);
    }
}
