// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет параметры, управляющие процедурной генерацией города:
//! - Архетипы карты (залив, дельта, побережье)
//! - Плотность застройки районов (деревня, центр, средний пояс, окраина)
//! - Размеры карты, сетки сайтов и количество деревень/городских районов
//!
//! Конфигурация загружается из TOML; все поля, кроме сида, имеют значения по умолчанию.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::GenerationError;

/// Архетип карты
///
/// Определяет профиль высот вдоль горизонтали: где вода вдаётся в сушу и
/// как широко река выходит к морю.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MapType {
    /// Море вдаётся глубоким заливом в центре карты
    #[default]
    Bay,
    /// Широкая низменная дельта в центре, вода подступает с двух сторон
    Delta,
    /// Почти ровное побережье с пологим понижением к центру
    Coastal,
}

impl MapType {
    /// Порядок, в котором архетип выбирается из потока случайных чисел
    pub const ALL: [MapType; 3] = [MapType::Bay, MapType::Coastal, MapType::Delta];

    /// Горизонтальный профиль высоты в узлах `[0, w/3, w/2, 2w/3, w]`.
    ///
    /// # Примеры
    /// ```
    /// use citygen::config::MapType;
    /// assert_eq!(MapType::Bay.x_profile()[2], 0.0);
    /// ```
    #[must_use]
    pub fn x_profile(self) -> [f64; 5] {
        match self {
            MapType::Bay => [0.5, 0.5, 0.0, 0.5, 0.5],
            MapType::Delta => [0.5, 0.25, -0.25, 0.25, 0.5],
            MapType::Coastal => [0.3, 0.3, 0.2, 0.3, 0.3],
        }
    }

    /// Выбирает архетип равновероятно
    pub fn choose(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Плотность застройки района
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Density {
    /// Сельская местность: кварталы не строятся
    Rural,
    Village,
    /// Первая треть городских районов по порядку роста
    Inner,
    /// До половины городских районов
    Mid,
    /// Остальные городские районы
    Outer,
}

/// Параметры разбиения района на кварталы
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityParams {
    /// Случайный разброс точки и наклона разреза (0.0 = строго пополам)
    pub chaos: f64,
    /// Площадь, ниже которой многоугольник становится кварталом (0 = без кварталов)
    pub block_size: f64,
    /// Ширина улицы между кварталами
    pub street_width: f64,
}

impl Density {
    #[must_use]
    pub fn params(self) -> DensityParams {
        match self {
            Density::Rural => DensityParams {
                chaos: 0.0,
                block_size: 0.0,
                street_width: 4.0,
            },
            Density::Village => DensityParams {
                chaos: 0.25,
                block_size: 1000.0,
                street_width: 6.0,
            },
            Density::Inner => DensityParams {
                chaos: 0.75,
                block_size: 300.0,
                street_width: 4.0,
            },
            Density::Mid => DensityParams {
                chaos: 0.5,
                block_size: 600.0,
                street_width: 4.0,
            },
            Density::Outer => DensityParams {
                chaos: 0.0,
                block_size: 1200.0,
                street_width: 4.0,
            },
        }
    }

    /// Уровень плотности городского района по его номеру в порядке роста
    #[must_use]
    pub fn urban_tier(order: usize, total: usize) -> Self {
        let order = order as f64;
        let total = total as f64;
        if order < total / 3.0 {
            Density::Inner
        } else if order < total / 2.0 {
            Density::Mid
        } else {
            Density::Outer
        }
    }
}

/// Основные параметры генерации карты
///
/// Полная конфигурация для генерации одной карты. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Сид генератора случайных чисел (детерминированная генерация)
    pub seed: u64,

    /// Ширина карты в единицах карты (по умолчанию 4096)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Высота карты (по умолчанию 4096)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Размер ячейки сетки сайтов: по одному сайту на ячейку (по умолчанию 128)
    #[serde(default = "default_site_grid_size")]
    pub site_grid_size: u32,

    /// Количество деревень
    #[serde(default = "default_villages")]
    pub villages: usize,

    /// Количество городских районов, включая ядро
    #[serde(default = "default_urban_districts")]
    pub urban_districts: usize,

    /// Сколько раз перезапускать конвейер, прежде чем сдаться
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_width() -> u32 {
    4096
}
fn default_height() -> u32 {
    4096
}
fn default_site_grid_size() -> u32 {
    128
}
fn default_villages() -> usize {
    25
}
fn default_urban_districts() -> usize {
    75
}
fn default_max_attempts() -> usize {
    86
}

/// Число ячеек, под которое подобраны значения по умолчанию (32×32)
const REFERENCE_CELLS: f64 = 1024.0;
const MIN_VILLAGES: usize = 3;
const MIN_URBAN_DISTRICTS: usize = 3;

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 4096,
            height: 4096,
            site_grid_size: 128,
            villages: 25,
            urban_districts: 75,
            max_attempts: 86,
        }
    }
}

impl MapConfig {
    /// Конфигурация для карты произвольного размера.
    ///
    /// Количество деревень и городских районов масштабируется по числу ячеек
    /// относительно карты 4096×4096 с сеткой 128.
    #[must_use]
    pub fn new(seed: u64, width: u32, height: u32) -> Self {
        let mut config = Self {
            seed,
            width,
            height,
            ..Self::default()
        };
        let scale = config.cell_count() as f64 / REFERENCE_CELLS;
        config.villages = ((default_villages() as f64 * scale).round() as usize).max(MIN_VILLAGES);
        config.urban_districts =
            ((default_urban_districts() as f64 * scale).round() as usize).max(MIN_URBAN_DISTRICTS);
        config
    }

    /// Загружает параметры из TOML-файла
    ///
    /// # Аргументы
    /// * `path` - путь к файлу конфигурации в формате TOML
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл не найден или содержит недопустимый формат.
    ///
    /// # Пример
    /// ```toml
    /// # city.toml
    /// seed = 42
    /// width = 2048
    /// height = 2048
    /// villages = 8
    /// ```
    pub fn from_toml_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Число столбцов сетки сайтов
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.site_grid_size.max(1))
    }

    /// Число строк сетки сайтов
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.site_grid_size.max(1))
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Проверяет, что из конфигурации можно построить карту
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.width == 0 || self.height == 0 {
            return Err(GenerationError::InvalidConfig(format!(
                "размеры карты должны быть положительными: {}×{}",
                self.width, self.height
            )));
        }
        if self.site_grid_size == 0 || self.site_grid_size > self.width.min(self.height) {
            return Err(GenerationError::InvalidConfig(format!(
                "размер ячейки {} не помещается в карту {}×{}",
                self.site_grid_size, self.width, self.height
            )));
        }
        if self.cell_count() < 2 {
            return Err(GenerationError::InvalidConfig(
                "карта должна содержать хотя бы две ячейки".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(GenerationError::InvalidConfig(
                "max_attempts должно быть больше нуля".to_string(),
            ));
        }
        if self.urban_districts == 0 {
            return Err(GenerationError::InvalidConfig(
                "нужен хотя бы один городской район".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_map() {
        let config = MapConfig::default();
        assert_eq!(config.cell_count(), 1024);
        assert_eq!(MapConfig::new(0, 4096, 4096), config);
    }

    #[test]
    fn small_maps_scale_counts_down() {
        let config = MapConfig::new(42, 1280, 1280);
        assert_eq!(config.cell_count(), 100);
        assert_eq!(config.villages, 3);
        assert_eq!(config.urban_districts, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_uses_defaults_for_missing_fields() {
        let config: MapConfig = toml::from_str("seed = 7\nvillages = 4").unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.villages, 4);
        assert_eq!(config.width, 4096);
        assert_eq!(config.max_attempts, 86);
    }

    #[test]
    fn zero_sized_map_is_rejected() {
        let config = MapConfig::new(1, 0, 1024);
        assert!(matches!(config.validate(), Err(GenerationError::InvalidConfig(_))));
    }

    #[test]
    fn urban_tiers_follow_growth_order() {
        assert_eq!(Density::urban_tier(0, 9), Density::Inner);
        assert_eq!(Density::urban_tier(2, 9), Density::Inner);
        assert_eq!(Density::urban_tier(3, 9), Density::Mid);
        assert_eq!(Density::urban_tier(4, 9), Density::Mid);
        assert_eq!(Density::urban_tier(5, 9), Density::Outer);
    }
}
