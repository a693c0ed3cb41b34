// src/tessellation.rs
//! Тесселяция Вороного по сетке сайтов
//!
//! Каждая ячейка строится отсечением прямоугольника карты полуплоскостями
//! серединных перпендикуляров к соседним сайтам. Вершины ячеек свариваются в
//! общую таблицу (координаты округляются до 1/1024), поэтому соседние ячейки
//! разделяют побитово одинаковые вершины, а каждое ребро встречается один раз.
//!
//! Граф вершин (`petgraph::UnGraph`) используется для высот, реки и дорог:
//! индекс узла совпадает с id вершины, индекс ребра совпадает с индексом [`TessEdge`].

use std::collections::{HashMap, HashSet};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::MapConfig;
use crate::geometry::{Edge, Point, PointKey, Polygon};

/// Шаг сетки, к которому привариваются вершины
const WELD_SCALE: f64 = 1024.0;

/// Сколько раз перебрасывать сайт, совпадающий по x или y с уже поставленным
const SITE_REJECTION_LIMIT: usize = 1000;

/// Ребро тесселяции между двумя вершинами
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TessEdge {
    pub a: usize,
    pub b: usize,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl TessEdge {
    /// Обе ячейки по сторонам ребра, если ребро не на границе карты
    #[must_use]
    pub fn cells(&self) -> Option<(usize, usize)> {
        self.left.zip(self.right)
    }
}

/// Ячейка: многоугольник и id его вершин
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub polygon: Polygon,
    pub corners: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Tessellation {
    pub sites: Vec<Point>,
    pub cells: Vec<Cell>,
    pub vertices: Vec<Point>,
    pub edges: Vec<TessEdge>,
    /// Ячейки, которым принадлежит вершина
    pub vertex_cells: Vec<Vec<usize>>,
    pub graph: UnGraph<(), f64>,
    edge_lookup: HashMap<(usize, usize), usize>,
    site_lookup: HashMap<PointKey, usize>,
    vertex_lookup: HashMap<PointKey, usize>,
}

/// Расставляет по одному сайту в каждой ячейке сетки.
///
/// Смещения внутри ячейки целые; сайт перебрасывается, пока его x или y
/// совпадает с координатой уже поставленного сайта.
pub fn jittered_sites(config: &MapConfig, rng: &mut impl Rng) -> Vec<Point> {
    let (sites, forced) = place_sites(config, rng);
    if forced > 0 {
        warn!(
            forced,
            limit = SITE_REJECTION_LIMIT,
            "Сайты приняты с повторяющейся координатой x или y"
        );
    }
    sites
}

/// Сайты и число сайтов, принятых после исчерпания попыток
fn place_sites(config: &MapConfig, rng: &mut impl Rng) -> (Vec<Point>, usize) {
    let grid = config.site_grid_size;
    let mut sites = Vec::with_capacity(config.cell_count());
    let mut used_x = HashSet::new();
    let mut used_y = HashSet::new();
    let mut forced = 0;

    for i in (0..config.width).step_by(grid as usize) {
        for j in (0..config.height).step_by(grid as usize) {
            let span_x = grid.min(config.width - i);
            let span_y = grid.min(config.height - j);
            let mut tries = 0;
            let (x, y) = loop {
                let x = rng.gen_range(0..span_x) + i;
                let y = rng.gen_range(0..span_y) + j;
                tries += 1;
                if !used_x.contains(&x) && !used_y.contains(&y) {
                    break (x, y);
                }
                if tries >= SITE_REJECTION_LIMIT {
                    debug!(x, y, "Сайт принят после {} попыток", tries);
                    forced += 1;
                    break (x, y);
                }
            };
            used_x.insert(x);
            used_y.insert(y);
            sites.push(Point::new(f64::from(x), f64::from(y)));
        }
    }
    (sites, forced)
}

impl Tessellation {
    /// Строит тесселяцию Вороного в прямоугольнике `[0, width] × [0, height]`
    #[must_use]
    pub fn build(sites: Vec<Point>, width: f64, height: f64) -> Self {
        let start = std::time::Instant::now();
        let bounds = bounds_polygon(Point::new(0.0, 0.0), Point::new(width, height));
        let mut welder = Welder::default();
        let cells: Vec<Cell> = (0..sites.len())
            .map(|i| {
                let raw = voronoi_cell(&sites, i, &bounds);
                welder.weld_cell(&raw)
            })
            .collect();
        let vertices = welder.vertices;

        let mut edges: Vec<TessEdge> = Vec::new();
        let mut edge_lookup = HashMap::new();
        let mut vertex_cells = vec![Vec::new(); vertices.len()];
        for (c, cell) in cells.iter().enumerate() {
            let n = cell.corners.len();
            for k in 0..n {
                let a = cell.corners[k];
                let b = cell.corners[(k + 1) % n];
                if !vertex_cells[a].contains(&c) {
                    vertex_cells[a].push(c);
                }
                let key = (a.min(b), a.max(b));
                if let Some(&index) = edge_lookup.get(&key) {
                    let edge: &mut TessEdge = &mut edges[index];
                    if edge.left != Some(c) && edge.right.is_none() {
                        edge.right = Some(c);
                    }
                } else {
                    edge_lookup.insert(key, edges.len());
                    edges.push(TessEdge {
                        a,
                        b,
                        left: Some(c),
                        right: None,
                    });
                }
            }
        }

        let mut graph = UnGraph::with_capacity(vertices.len(), edges.len());
        for _ in &vertices {
            graph.add_node(());
        }
        for edge in &edges {
            let length = vertices[edge.a].distance(vertices[edge.b]);
            graph.add_edge(NodeIndex::new(edge.a), NodeIndex::new(edge.b), length);
        }

        let site_lookup = sites
            .iter()
            .enumerate()
            .map(|(i, &site)| (site.key(), i))
            .collect();
        let vertex_lookup = vertices
            .iter()
            .enumerate()
            .map(|(i, &p)| (p.key(), i))
            .collect();

        debug!(
            cells = cells.len(),
            vertices = vertices.len(),
            edges = edges.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Тесселяция построена"
        );

        Self {
            sites,
            cells,
            vertices,
            edges,
            vertex_cells,
            graph,
            edge_lookup,
            site_lookup,
            vertex_lookup,
        }
    }

    /// Ребро тесселяции между двумя вершинами
    #[must_use]
    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_lookup.get(&(a.min(b), a.max(b))).copied()
    }

    /// Геометрия ребра тесселяции
    #[must_use]
    pub fn segment(&self, edge: usize) -> Edge {
        let e = &self.edges[edge];
        Edge::new(self.vertices[e.a], self.vertices[e.b])
    }

    /// Соседние вершины в порядке графа
    pub fn vertex_neighbors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors(NodeIndex::new(vertex)).map(NodeIndex::index)
    }

    /// Id ячейки по её сайту
    #[must_use]
    pub fn cell_by_site(&self, site: Point) -> Option<usize> {
        self.site_lookup.get(&site.key()).copied()
    }

    /// Id вершины с точно такими координатами
    #[must_use]
    pub fn vertex_at(&self, point: Point) -> Option<usize> {
        self.vertex_lookup.get(&point.key()).copied()
    }

    /// Ребро тесселяции с такими концами (в любом порядке)
    #[must_use]
    pub fn edge_at(&self, segment: &Edge) -> Option<usize> {
        self.edge_between(self.vertex_at(segment.p1)?, self.vertex_at(segment.p2)?)
    }

    /// Индекс ребра графа для ребра тесселяции
    #[must_use]
    pub fn graph_edge(edge: usize) -> EdgeIndex {
        EdgeIndex::new(edge)
    }
}

/// Пары соседних ячеек Вороного для произвольного набора сайтов.
///
/// Это рёбра триангуляции Делоне; используется для графа деревень. Пары
/// упорядочены `(меньший, больший)` и отсортированы.
#[must_use]
pub fn neighbor_pairs(sites: &[Point], min: Point, max: Point) -> Vec<(usize, usize)> {
    let bounds = bounds_polygon(min, max);
    let mut welder = Welder::default();
    let cells: Vec<Cell> = (0..sites.len())
        .map(|i| welder.weld_cell(&voronoi_cell(sites, i, &bounds)))
        .collect();

    let mut owners: HashMap<(usize, usize), usize> = HashMap::new();
    let mut pairs = Vec::new();
    for (c, cell) in cells.iter().enumerate() {
        let n = cell.corners.len();
        for k in 0..n {
            let a = cell.corners[k];
            let b = cell.corners[(k + 1) % n];
            let key = (a.min(b), a.max(b));
            match owners.get(&key) {
                Some(&other) if other != c => pairs.push((other.min(c), other.max(c))),
                Some(_) => {}
                None => {
                    owners.insert(key, c);
                }
            }
        }
    }
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

fn bounds_polygon(min: Point, max: Point) -> Vec<Point> {
    vec![
        Point::new(min.x, min.y),
        Point::new(max.x, min.y),
        Point::new(max.x, max.y),
        Point::new(min.x, max.y),
    ]
}

/// Ячейка сайта `index`: прямоугольник, отсечённый перпендикулярами к остальным сайтам
fn voronoi_cell(sites: &[Point], index: usize, bounds: &[Point]) -> Vec<Point> {
    let site = sites[index];
    let mut others: Vec<(f64, usize)> = sites
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(i, &p)| (site.distance(p), i))
        .collect();
    others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut cell = bounds.to_vec();
    for (distance, other) in others {
        let radius = cell
            .iter()
            .map(|&p| site.distance(p))
            .fold(0.0_f64, f64::max);
        // более далёкие сайты уже не могут отрезать часть ячейки
        if distance / 2.0 > radius {
            break;
        }
        cell = clip_half_plane(&cell, site, sites[other]);
        if cell.is_empty() {
            break;
        }
    }
    cell
}

/// Оставляет часть многоугольника, которая ближе к `keep`, чем к `other`
fn clip_half_plane(polygon: &[Point], keep: Point, other: Point) -> Vec<Point> {
    let mid = (keep + other) * 0.5;
    let normal = other - keep;
    let side = |p: Point| (p - mid).dot(normal);

    let n = polygon.len();
    let mut result = Vec::with_capacity(n + 1);
    for i in 0..n {
        let current = polygon[i];
        let next = polygon[(i + 1) % n];
        let dc = side(current);
        let dn = side(next);
        if dc <= 0.0 {
            result.push(current);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            result.push(current + (next - current) * (dc / (dc - dn)));
        }
    }
    result
}

/// Таблица сваренных вершин
#[derive(Default)]
struct Welder {
    vertices: Vec<Point>,
    index: HashMap<(i64, i64), usize>,
}

impl Welder {
    fn weld(&mut self, p: Point) -> usize {
        let key = (
            (p.x * WELD_SCALE).round() as i64,
            (p.y * WELD_SCALE).round() as i64,
        );
        *self.index.entry(key).or_insert_with(|| {
            self.vertices.push(Point::new(
                key.0 as f64 / WELD_SCALE,
                key.1 as f64 / WELD_SCALE,
            ));
            self.vertices.len() - 1
        })
    }

    fn weld_cell(&mut self, raw: &[Point]) -> Cell {
        let mut corners: Vec<usize> = raw.iter().map(|&p| self.weld(p)).collect();
        corners.dedup();
        while corners.len() > 1 && corners.first() == corners.last() {
            corners.pop();
        }
        let polygon = Polygon::new(corners.iter().map(|&v| self.vertices[v]).collect());
        Cell { polygon, corners }
    }
}
