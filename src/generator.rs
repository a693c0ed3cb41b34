// src/generator.rs
//! Конвейер генерации карты
//!
//! Одна попытка проходит все стадии подряд на общем потоке случайных чисел:
//! сайты, архетип, высоты, гидрология, деревни и мосты, дороги, город,
//! прорезка границ, кварталы, пригород, названия. Попытка, завершившаяся
//! [`AttemptError`], отбрасывается целиком, и следующая продолжает тот же поток.

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::blocks::{place_sprawl, subdivide_districts};
use crate::carving::{carve_features, inset_districts};
use crate::config::{MapConfig, MapType};
use crate::district::{District, DistrictType, Relation, link};
use crate::error::{AttemptError, GenerationError};
use crate::heightmap::{Heightmap, classify_districts};
use crate::hydrology::{find_coasts, find_ridges, mark_rivers, trace_river};
use crate::map::Map;
use crate::naming::name_districts;
use crate::roads::{route_roads, village_pairs};
use crate::settlement::{place_bridges, place_villages};
use crate::tessellation::{Tessellation, jittered_sites};
use crate::urban::{choose_core, deforest, smooth_urban, urbanize};

/// Запас рамки для графа деревень, в ячейках сетки
const VILLAGE_GRAPH_MARGIN_CELLS: f64 = 2.0;

/// Генерирует карту по конфигурации.
///
/// Результат полностью определяется `config`: одинаковый сид и размеры дают
/// одинаковую карту.
///
/// # Ошибки
/// [`GenerationError::InvalidConfig`] для непригодных размеров и
/// [`GenerationError::TooManyAttempts`], если ни одна из `max_attempts` попыток
/// не дала корректной карты.
pub fn generate(config: &MapConfig) -> Result<Map, GenerationError> {
    config.validate()?;
    let started = Instant::now();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let mut last = AttemptError::EmptyTessellation;
    for attempt in 1..=config.max_attempts {
        match run_attempt(config, &mut rng) {
            Ok(map) => {
                info!(
                    attempt,
                    seed = config.seed,
                    archetype = ?map.archetype(),
                    districts = map.districts().len(),
                    warnings = map.warnings().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Карта построена"
                );
                return Ok(map);
            }
            Err(error) => {
                info!(attempt, %error, "Попытка генерации отклонена");
                last = error;
            }
        }
    }

    Err(GenerationError::TooManyAttempts {
        attempts: config.max_attempts,
        last,
    })
}

/// Одна попытка конвейера
fn run_attempt(config: &MapConfig, rng: &mut ChaCha8Rng) -> Result<Map, AttemptError> {
    let width = f64::from(config.width);
    let height = f64::from(config.height);

    let sites = jittered_sites(config, rng);
    let archetype = MapType::choose(rng);
    debug!(?archetype, sites = sites.len(), "Начата попытка");

    let tess = Tessellation::build(sites, width, height);
    if tess.cells.is_empty() {
        return Err(AttemptError::EmptyTessellation);
    }
    let mut districts = create_districts(&tess);

    let mut heightmap = Heightmap::generate(&tess, archetype, width, height, rng);
    heightmap.erode_and_fill(&tess);
    classify_districts(&mut districts, &heightmap);

    let coasts = find_coasts(&tess, &districts);
    let (river, river_edges) = trace_river(&tess, &heightmap, &districts, rng)?;
    mark_rivers(&tess, &mut districts, &river_edges);
    let (ridges, _) = find_ridges(&tess, &mut districts);

    place_villages(&mut districts, config.villages, rng)?;
    let bridges = place_bridges(&mut districts, river.width, rng);

    let margin = f64::from(config.site_grid_size) * VILLAGE_GRAPH_MARGIN_CELLS;
    let pairs = village_pairs(&districts, width, height, margin);
    route_roads(&tess, &mut districts, &pairs);

    let core = choose_core(&mut districts, rng)?;
    urbanize(&mut districts, core, config.urban_districts);
    let reverted = smooth_urban(&mut districts);
    let cleared = deforest(&mut districts);
    debug!(reverted, cleared, "Город сглажен, леса у поселений вырублены");
    validate_core(&districts)?;

    let frontage = carve_features(&mut districts, river.width);
    inset_districts(&mut districts);
    let warnings = subdivide_districts(&mut districts, rng);
    let sprawl = place_sprawl(&districts, &frontage, rng);
    name_districts(&mut districts, rng);

    Ok(Map {
        districts,
        coasts,
        river,
        ridges,
        bridges,
        sprawl,
        archetype,
        seed: config.seed,
        width,
        height,
        warnings,
    })
}

/// Район на каждую ячейку; соседи связываются по общим рёбрам тесселяции
fn create_districts(tess: &Tessellation) -> Vec<District> {
    let mut districts: Vec<District> = tess
        .cells
        .iter()
        .enumerate()
        .map(|(id, cell)| District::new(id, tess.sites[id], cell.polygon.clone(), cell.corners.clone()))
        .collect();
    for edge in &tess.edges {
        if let Some((left, right)) = edge.cells() {
            link(&mut districts, left, right, Relation::Neighbor);
        }
    }
    districts
}

/// Ровно одно ядро, и оно городское
fn validate_core(districts: &[District]) -> Result<(), AttemptError> {
    let cores: Vec<&District> = districts.iter().filter(|d| d.is_core).collect();
    match cores.as_slice() {
        [core] if core.district_type == DistrictType::Urban => Ok(()),
        [core] => Err(AttemptError::InvalidCore(format!(
            "район {} имеет тип {:?}",
            core.id, core.district_type
        ))),
        _ => Err(AttemptError::InvalidCore(format!(
            "ожидалось одно ядро, найдено {}",
            cores.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};

    fn district(id: usize) -> District {
        District::new(id, Point::new(id as f64, 0.0), Polygon::default(), Vec::new())
    }

    #[test]
    fn core_must_be_single_and_urban() {
        let mut districts = vec![district(0), district(1)];
        assert!(matches!(
            validate_core(&districts),
            Err(AttemptError::InvalidCore(_))
        ));

        districts[1].is_core = true;
        assert!(matches!(
            validate_core(&districts),
            Err(AttemptError::InvalidCore(_))
        ));

        districts[1].district_type = DistrictType::Urban;
        assert_eq!(validate_core(&districts), Ok(()));

        districts[0].is_core = true;
        districts[0].district_type = DistrictType::Urban;
        assert!(validate_core(&districts).is_err());
    }

    #[test]
    fn invalid_config_is_reported_before_generation() {
        let config = MapConfig {
            max_attempts: 0,
            ..MapConfig::new(1, 512, 512)
        };
        assert!(matches!(
            generate(&config),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn impossible_maps_exhaust_attempts() {
        let config = MapConfig {
            villages: 1000,
            max_attempts: 2,
            ..MapConfig::new(3, 512, 512)
        };
        assert!(matches!(
            generate(&config),
            Err(GenerationError::TooManyAttempts { attempts: 2, .. })
        ));
    }

    #[test]
    fn districts_are_linked_to_their_neighbours() {
        let config = MapConfig::new(5, 512, 512);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let tess = Tessellation::build(jittered_sites(&config, &mut rng), 512.0, 512.0);
        let districts = create_districts(&tess);

        assert_eq!(districts.len(), 16);
        for d in &districts {
            assert!(d.neighbors.len() >= 2);
            for &n in &d.neighbors {
                assert!(districts[n].neighbors.contains(&d.id));
            }
        }
    }
}
