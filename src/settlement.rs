// src/settlement.rs
//! Размещение деревень и мостов

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::config::Density;
use crate::district::{District, DistrictType, Relation, link};
use crate::error::AttemptError;
use crate::geometry::{Edge, find_common_edge};

const VILLAGE_SCORE_BASE: f64 = 1.0;
const VILLAGE_SCORE_ON_COAST: f64 = 5.0;
const VILLAGE_SCORE_ON_RIVER: f64 = 10.0;
const VILLAGE_SCORE_ON_MOUTH: f64 = 30.0;
const VILLAGE_SCORE_NEXT_TO_VILLAGE: f64 = -6.0;

/// Запас длины моста за пределами половины ширины реки
const BRIDGE_OVERHANG: f64 = 3.0;

/// Привлекательность района для деревни (не меньше нуля)
#[must_use]
pub fn village_score(district: &District, districts: &[District]) -> f64 {
    let on_coast = district.neighbors.iter().any(|&n| districts[n].is_water());
    let on_river = !district.rivers.is_empty();
    let on_mouth = on_coast && on_river;
    let next_to_village = district
        .neighbors
        .iter()
        .any(|&n| districts[n].district_type == DistrictType::Village);

    let mut score = VILLAGE_SCORE_BASE;
    if on_coast {
        score += VILLAGE_SCORE_ON_COAST;
    }
    if on_river {
        score += VILLAGE_SCORE_ON_RIVER;
    }
    if on_mouth {
        score += VILLAGE_SCORE_ON_MOUTH;
    }
    if next_to_village {
        score += VILLAGE_SCORE_NEXT_TO_VILLAGE;
    }
    score.max(0.0)
}

/// Выбор по рулетке: индекс элемента с вероятностью, пропорциональной весу.
///
/// `None`, если список пуст или суммарный вес не положителен.
pub fn pick_weighted(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return None;
    }
    let choice = rng.gen_range(0.0..1.0) * total;
    let mut current = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        current += w;
        if choice < current {
            return Some(i);
        }
    }
    // накопленная сумма могла не дотянуть до total из-за округления
    weights.iter().rposition(|&w| w > 0.0)
}

/// Превращает `count` сельских районов в деревни, по одному выбору рулеткой за раз
pub fn place_villages(
    districts: &mut [District],
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<usize>, AttemptError> {
    let mut villages = Vec::with_capacity(count);
    for _ in 0..count {
        let candidates: Vec<usize> = districts
            .iter()
            .filter(|d| d.district_type == DistrictType::Rural)
            .map(|d| d.id)
            .collect();
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&id| village_score(&districts[id], districts))
            .collect();
        let choice = pick_weighted(&weights, rng).ok_or(AttemptError::NoVillageCandidate)?;

        let village = &mut districts[candidates[choice]];
        village.district_type = DistrictType::Village;
        village.set_density(Density::Village);
        villages.push(village.id);
    }
    debug!(villages = villages.len(), "Деревни размещены");
    Ok(villages)
}

/// Строит мосты от деревень у реки.
///
/// Деревня соединяется мостами с соседними деревнями за рекой; если таких нет,
/// мост ведёт к случайному соседу за рекой. Отрезок моста перпендикулярен общему
/// ребру районов и проходит через его середину.
pub fn place_bridges(districts: &mut [District], river_width: f64, rng: &mut impl Rng) -> Vec<Edge> {
    let half_length = river_width / 2.0 + BRIDGE_OVERHANG;
    let mut segments = Vec::new();
    let mut built: HashSet<(usize, usize)> = HashSet::new();

    let villages: Vec<usize> = districts
        .iter()
        .filter(|d| d.district_type == DistrictType::Village && !d.rivers.is_empty())
        .map(|d| d.id)
        .collect();

    for village in villages {
        let across: Vec<usize> = districts[village]
            .neighbors
            .iter()
            .copied()
            .filter(|&n| {
                districts[n].district_type == DistrictType::Village
                    && districts[village].rivers.contains(&n)
            })
            .collect();
        for neighbor in across {
            link(districts, village, neighbor, Relation::Bridge);
        }

        if districts[village].bridges.is_empty() {
            let rivers = &districts[village].rivers;
            let target = rivers[rng.gen_range(0..rivers.len())];
            link(districts, village, target, Relation::Bridge);
        }

        for neighbor in districts[village].bridges.clone() {
            let key = (village.min(neighbor), village.max(neighbor));
            if !built.insert(key) {
                continue;
            }
            let shared = find_common_edge(
                &districts[village].original_polygon,
                &districts[neighbor].original_polygon,
            );
            let Some((mid, normal)) = shared.and_then(|e| Some((e.midpoint(), e.unit_normal()?)))
            else {
                debug!(village, neighbor, "Мост без общего ребра пропущен");
                continue;
            };
            segments.push(Edge::new(mid + normal * half_length, mid - normal * half_length));
        }
    }

    debug!(bridges = segments.len(), "Мосты построены");
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Ряд квадратных районов `0..n` вдоль оси x
    fn row(n: usize) -> Vec<District> {
        let mut districts: Vec<District> = (0..n)
            .map(|i| {
                let x = i as f64 * 10.0;
                let polygon = Polygon::new(vec![
                    Point::new(x, 0.0),
                    Point::new(x + 10.0, 0.0),
                    Point::new(x + 10.0, 10.0),
                    Point::new(x, 10.0),
                ]);
                District::new(i, Point::new(x + 5.0, 5.0), polygon, Vec::new())
            })
            .collect();
        for i in 1..n {
            link(&mut districts, i - 1, i, Relation::Neighbor);
        }
        districts
    }

    #[test]
    fn village_score_rewards_river_mouths() {
        let mut districts = row(4);
        districts[0].district_type = DistrictType::Water;
        link(&mut districts, 1, 2, Relation::River);

        assert_eq!(village_score(&districts[1], &districts), 46.0);
        assert_eq!(village_score(&districts[2], &districts), 11.0);
        assert_eq!(village_score(&districts[3], &districts), 1.0);

        districts[3].district_type = DistrictType::Village;
        // 1 + 10 - 6
        assert_eq!(village_score(&districts[2], &districts), 5.0);
    }

    #[test]
    fn village_score_is_never_negative() {
        let mut districts = row(2);
        districts[0].district_type = DistrictType::Village;
        assert_eq!(village_score(&districts[1], &districts), 0.0);
    }

    #[test]
    fn pick_weighted_skips_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let choice = pick_weighted(&[0.0, 2.0, 0.0, 1.0], &mut rng).unwrap();
            assert!(choice == 1 || choice == 3);
        }
        assert_eq!(pick_weighted(&[0.0, 0.0], &mut rng), None);
        assert_eq!(pick_weighted(&[], &mut rng), None);
    }

    #[test]
    fn villages_fail_when_nothing_scores() {
        let mut districts = row(3);
        districts[1].district_type = DistrictType::Village;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // оба оставшихся района соседствуют с деревней: вес 1 - 6 обрезается до 0
        assert_eq!(
            place_villages(&mut districts, 1, &mut rng),
            Err(AttemptError::NoVillageCandidate)
        );
    }

    #[test]
    fn villages_take_village_density() {
        let mut districts = row(6);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let villages = place_villages(&mut districts, 2, &mut rng).unwrap();
        assert_eq!(villages.len(), 2);
        for id in villages {
            assert_eq!(districts[id].district_type, DistrictType::Village);
            assert_eq!(districts[id].block_size, 1000.0);
            assert_eq!(districts[id].street_width, 6.0);
        }
    }

    #[test]
    fn bridges_connect_villages_across_the_river() {
        let mut districts = row(4);
        link(&mut districts, 1, 2, Relation::River);
        districts[1].district_type = DistrictType::Village;
        districts[2].district_type = DistrictType::Village;
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let segments = place_bridges(&mut districts, 40.0, &mut rng);

        assert_eq!(segments.len(), 1);
        assert_eq!(districts[1].bridges, vec![2]);
        assert_eq!(districts[2].bridges, vec![1]);
        let bridge = segments[0];
        assert!((bridge.length() - 46.0).abs() < 1e-9);
        assert!(bridge.midpoint().approx_eq(Point::new(20.0, 5.0), 1e-9));
        assert!((bridge.p1.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn lone_village_bridges_to_a_river_neighbour() {
        let mut districts = row(3);
        link(&mut districts, 0, 1, Relation::River);
        districts[1].district_type = DistrictType::Village;
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let segments = place_bridges(&mut districts, 30.0, &mut rng);

        assert_eq!(segments.len(), 1);
        assert_eq!(districts[1].bridges, vec![0]);
        assert_eq!(districts[0].bridges, vec![1]);
        for d in &districts {
            assert!(d.bridges.iter().all(|b| d.rivers.contains(b)));
        }
    }
}
