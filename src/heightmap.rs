// src/heightmap.rs
//! Высоты вершин тесселяции: шум, эрозия и заполнение впадин
//!
//! Высота вершины складывается из наклона карты (верх выше низа), горизонтального
//! профиля архетипа и фрактального шума. Затем впадины заполняются, и несколько
//! циклов эрозии прорезают долины стоком в самого низкого соседа.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::MapType;
use crate::district::{District, DistrictType};
use crate::tessellation::Tessellation;

const NOISE_FREQUENCY: f32 = 0.001;
const NOISE_OCTAVES: i32 = 4;
/// Шум масштабируется в `[-NOISE_AMPLITUDE, NOISE_AMPLITUDE]`
const NOISE_AMPLITUDE: f64 = 0.33;

const BASE_FLUX: f64 = 0.02;
pub const EROSION_CYCLES: usize = 2;

/// На сколько вершина-впадина поднимается над самым низким соседом
const DEPRESSION_LIFT: f64 = 0.001;
const MAX_FILL_ROUNDS: usize = 100_000;

/// Районы выше этой высоты покрыты лесом
pub const FOREST_ALTITUDE: f64 = 0.33;

/// Высоты вершин тесселяции (индекс = id вершины)
#[derive(Debug, Clone)]
pub struct Heightmap {
    pub heights: Vec<f64>,
    /// Ордината нижнего края карты: вершины на нём служат стоком и не бывают впадинами
    drain_y: f64,
}

impl Heightmap {
    /// Строит высоты для всех вершин. Сид шума берётся из потока случайных чисел.
    pub fn generate(
        tess: &Tessellation,
        map_type: MapType,
        width: f64,
        height: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let mut noise = FastNoiseLite::new();
        noise.set_seed(Some(rng.gen_range(i32::MIN..=i32::MAX)));
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(NOISE_OCTAVES));
        noise.set_frequency(Some(NOISE_FREQUENCY));

        let profile = map_type.x_profile();
        let heights = tess
            .vertices
            .iter()
            .map(|p| {
                let y_factor = 1.0 - 2.0 * p.y / height;
                let x_factor = profile_at(p.x, width, &profile);
                let random = f64::from(noise.get_noise_2d(p.x as f32, p.y as f32)) * NOISE_AMPLITUDE;
                (y_factor + x_factor) / 2.0 + random
            })
            .collect();

        Self {
            heights,
            drain_y: height,
        }
    }

    /// Высоты, заданные явно
    #[must_use]
    pub fn from_heights(heights: Vec<f64>, drain_y: f64) -> Self {
        Self { heights, drain_y }
    }

    /// Самый низкий сосед (первый из равных в порядке графа)
    #[must_use]
    pub fn lowest_neighbor(&self, tess: &Tessellation, vertex: usize) -> Option<usize> {
        tess.vertex_neighbors(vertex)
            .min_by(|&a, &b| self.heights[a].total_cmp(&self.heights[b]))
    }

    /// Впадина: все соседи строго выше, и вершина не на нижнем крае
    #[must_use]
    pub fn is_depression(&self, tess: &Tessellation, vertex: usize) -> bool {
        if tess.vertices[vertex].y == self.drain_y {
            return false;
        }
        self.lowest_neighbor(tess, vertex)
            .is_some_and(|low| self.heights[low] > self.heights[vertex])
    }

    #[must_use]
    pub fn depressions(&self, tess: &Tessellation) -> Vec<usize> {
        (0..self.heights.len())
            .filter(|&v| self.is_depression(tess, v))
            .collect()
    }

    /// Поднимает впадины до уровня чуть выше самого низкого соседа.
    ///
    /// После первого прохода проверяются только соседи исправленных вершин.
    /// Возвращает число выполненных раундов.
    pub fn fill_depressions(&mut self, tess: &Tessellation) -> usize {
        let mut candidates = self.depressions(tess);
        let mut rounds = 0;
        while !candidates.is_empty() {
            if rounds >= MAX_FILL_ROUNDS {
                warn!(
                    remaining = candidates.len(),
                    "Заполнение впадин остановлено по лимиту раундов"
                );
                break;
            }
            for &vertex in &candidates {
                if let Some(low) = self.lowest_neighbor(tess, vertex) {
                    self.heights[vertex] = self.heights[low] + DEPRESSION_LIFT;
                }
            }
            let mut next: Vec<usize> = candidates
                .iter()
                .flat_map(|&v| tess.vertex_neighbors(v))
                .collect();
            next.sort_unstable();
            next.dedup();
            next.retain(|&v| self.is_depression(tess, v));
            candidates = next;
            rounds += 1;
        }
        rounds
    }

    /// Эрозия стоком: вершины от высоких к низким отдают поток самому низкому соседу,
    /// затем каждая вершина опускается на свой поток плюс средний.
    pub fn erode(&mut self, tess: &Tessellation, cycles: usize) {
        let n = self.heights.len();
        if n == 0 {
            return;
        }
        for _ in 0..cycles {
            let mut flux = vec![BASE_FLUX; n];
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| self.heights[b].total_cmp(&self.heights[a]).then(a.cmp(&b)));

            for vertex in order {
                let Some(low) = self.lowest_neighbor(tess, vertex) else {
                    continue;
                };
                let drop = self.heights[vertex] - self.heights[low];
                if drop > 0.0 {
                    flux[low] += flux[vertex] * drop;
                }
            }

            let mean_flux = flux.iter().sum::<f64>() / n as f64;
            for (h, f) in self.heights.iter_mut().zip(&flux) {
                *h -= f + mean_flux;
            }
        }
    }

    /// Полный цикл: заполнение, эрозия, повторное заполнение
    pub fn erode_and_fill(&mut self, tess: &Tessellation) {
        let start = std::time::Instant::now();
        let first = self.fill_depressions(tess);
        self.erode(tess, EROSION_CYCLES);
        let second = self.fill_depressions(tess);
        debug!(
            fill_rounds = first + second,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Эрозия завершена"
        );
    }

    /// Средняя высота углов района
    #[must_use]
    pub fn mean_height(&self, corners: &[usize]) -> f64 {
        if corners.is_empty() {
            return 0.0;
        }
        corners.iter().map(|&v| self.heights[v]).sum::<f64>() / corners.len() as f64
    }
}

/// Кусочно-линейный профиль в узлах `[0, w/3, w/2, 2w/3, w]`
fn profile_at(x: f64, width: f64, profile: &[f64; 5]) -> f64 {
    let knots = [0.0, width / 3.0, width / 2.0, width * 2.0 / 3.0, width];
    if x <= knots[0] {
        return profile[0];
    }
    for i in 0..4 {
        if x <= knots[i + 1] {
            let t = (x - knots[i]) / (knots[i + 1] - knots[i]);
            return profile[i] + (profile[i + 1] - profile[i]) * t;
        }
    }
    profile[4]
}

/// Задаёт высоты районам и делит их на воду, лес и сельскую местность
pub fn classify_districts(districts: &mut [District], heightmap: &Heightmap) {
    for district in districts.iter_mut() {
        district.height = heightmap.mean_height(&district.corners);
        if district.height < 0.0 {
            district.district_type = DistrictType::Water;
        } else if district.height > FOREST_ALTITUDE {
            district.district_type = DistrictType::Forest;
        }
    }
    let water = districts.iter().filter(|d| d.is_water()).count();
    let forest = districts
        .iter()
        .filter(|d| d.district_type == DistrictType::Forest)
        .count();
    debug!(water, forest, "Районы классифицированы по высоте");
}
