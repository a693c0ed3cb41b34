// src/urban.rs
//! Рост города от ядра
//!
//! Город растёт алгоритмом Дейкстры по графу районов: стоимость перехода
//! задаётся «сложностью урбанизации», которая бесконечна через воду, хребты и реки без
//! моста и снижается вдоль рек, дорог и берега. Районы становятся городскими
//! в порядке накопленной стоимости; номер в этом порядке задаёт плотность.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::Rng;
use tracing::debug;

use crate::config::Density;
use crate::district::{District, DistrictType};
use crate::error::AttemptError;

const BASE_DIFFICULTY: f64 = 16.0;
/// Множитель для каждого облегчающего признака перехода
const EASING: f64 = 0.5;

/// Стоимость распространения города из `from` в `to`
#[must_use]
pub fn urbanization_difficulty(districts: &[District], from: usize, to: usize) -> f64 {
    let (source, target) = (&districts[from], &districts[to]);
    let can_be_urbanized = !matches!(target.district_type, DistrictType::Water | DistrictType::Urban);
    let with_bridge = source.bridges.contains(&to);
    let without_bridge = source.rivers.contains(&to) && !with_bridge;
    let ridge = source.ridges.contains(&to);
    let shared_river = source
        .rivers
        .iter()
        .any(|&r| districts[r].rivers.contains(&to));
    let shared_road = source.roads.contains(&to);
    let shared_coast = source
        .neighbors
        .iter()
        .any(|&n| districts[n].is_water() && districts[n].neighbors.contains(&to));

    if !can_be_urbanized || ridge || without_bridge {
        return f64::INFINITY;
    }
    let eased = [with_bridge, shared_river, shared_road, shared_coast]
        .into_iter()
        .filter(|&f| f)
        .count();
    BASE_DIFFICULTY * EASING.powi(eased as i32)
}

/// Выбирает городское ядро среди районов на реке у воды
pub fn choose_core(districts: &mut [District], rng: &mut impl Rng) -> Result<usize, AttemptError> {
    let candidates: Vec<usize> = districts
        .iter()
        .filter(|d| {
            !d.is_water()
                && !d.rivers.is_empty()
                && d.neighbors.iter().any(|&n| districts[n].is_water())
        })
        .map(|d| d.id)
        .collect();
    if candidates.is_empty() {
        return Err(AttemptError::NoCoreCandidate);
    }
    let core = candidates[rng.gen_range(0..candidates.len())];
    districts[core].is_core = true;
    debug!(core, candidates = candidates.len(), "Выбрано городское ядро");
    Ok(core)
}

/// Элемент очереди с приоритетом: меньшая стоимость выходит первой
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    district: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.district.cmp(&self.district))
    }
}

/// Выращивает город из `core`, превращая до `max_districts` районов в городские.
///
/// Возвращает id районов в порядке урбанизации.
pub fn urbanize(districts: &mut [District], core: usize, max_districts: usize) -> Vec<usize> {
    let mut cost = vec![f64::INFINITY; districts.len()];
    let mut done = vec![false; districts.len()];
    let mut order = Vec::with_capacity(max_districts);
    let mut heap = BinaryHeap::new();

    cost[core] = 0.0;
    heap.push(Frontier {
        cost: 0.0,
        district: core,
    });

    while let Some(Frontier { cost: current, district }) = heap.pop() {
        if order.len() >= max_districts {
            break;
        }
        if done[district] || current > cost[district] {
            continue;
        }
        done[district] = true;

        let tier = Density::urban_tier(order.len(), max_districts);
        let d = &mut districts[district];
        d.district_type = DistrictType::Urban;
        d.set_density(tier);
        order.push(district);

        for i in 0..districts[district].neighbors.len() {
            let neighbor = districts[district].neighbors[i];
            if done[neighbor] {
                continue;
            }
            let step = urbanization_difficulty(districts, district, neighbor);
            if !step.is_finite() {
                continue;
            }
            let next = current + step;
            if next < cost[neighbor] {
                cost[neighbor] = next;
                heap.push(Frontier {
                    cost: next,
                    district: neighbor,
                });
            }
        }
    }

    debug!(urban = order.len(), target = max_districts, "Город вырос");
    order
}

/// Возвращает в сельские одиночные городские районы: больше двух третей соседей
/// сельские и не стоят на реке. Ядро не трогается.
///
/// Решение принимается по состоянию карты до прохода. Возвращает число
/// возвращённых районов.
pub fn smooth_urban(districts: &mut [District]) -> usize {
    let reverted: Vec<usize> = districts
        .iter()
        .filter(|d| d.district_type == DistrictType::Urban && !d.is_core)
        .filter(|d| {
            let rural = d
                .neighbors
                .iter()
                .filter(|&&n| {
                    districts[n].district_type == DistrictType::Rural && districts[n].rivers.is_empty()
                })
                .count();
            rural as f64 > d.neighbors.len() as f64 * 2.0 / 3.0
        })
        .map(|d| d.id)
        .collect();

    for &id in &reverted {
        districts[id].district_type = DistrictType::Rural;
        districts[id].set_density(Density::Rural);
    }
    reverted.len()
}

/// Леса, примыкающие к городу или деревне, вырубаются
pub fn deforest(districts: &mut [District]) -> usize {
    let cleared: Vec<usize> = districts
        .iter()
        .filter(|d| d.district_type == DistrictType::Forest)
        .filter(|d| {
            d.neighbors
                .iter()
                .any(|&n| districts[n].district_type.is_settled())
        })
        .map(|d| d.id)
        .collect();
    for &id in &cleared {
        districts[id].district_type = DistrictType::Rural;
    }
    cleared.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::district::{Relation, link};
    use crate::geometry::{Point, Polygon};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn row(n: usize) -> Vec<District> {
        let mut districts: Vec<District> = (0..n)
            .map(|i| District::new(i, Point::new(i as f64, 0.0), Polygon::default(), Vec::new()))
            .collect();
        for i in 1..n {
            link(&mut districts, i - 1, i, Relation::Neighbor);
        }
        districts
    }

    #[test]
    fn difficulty_multiplies_easings() {
        let mut districts = row(4);
        assert_eq!(urbanization_difficulty(&districts, 1, 2), 16.0);

        link(&mut districts, 1, 2, Relation::Road);
        assert_eq!(urbanization_difficulty(&districts, 1, 2), 8.0);

        link(&mut districts, 1, 2, Relation::River);
        assert!(urbanization_difficulty(&districts, 1, 2).is_infinite());
        link(&mut districts, 1, 2, Relation::Bridge);
        assert_eq!(urbanization_difficulty(&districts, 1, 2), 4.0);

        districts[2].district_type = DistrictType::Water;
        assert!(urbanization_difficulty(&districts, 1, 2).is_infinite());
    }

    #[test]
    fn difficulty_is_eased_along_the_coast() {
        let mut districts = row(3);
        link(&mut districts, 0, 2, Relation::Neighbor);
        districts[2].district_type = DistrictType::Water;
        // 0 и 1 оба выходят к воде 2
        assert_eq!(urbanization_difficulty(&districts, 0, 1), 8.0);
    }

    #[test]
    fn ridge_blocks_growth() {
        let mut districts = row(6);
        link(&mut districts, 2, 3, Relation::Ridge);
        districts[0].is_core = true;

        let order = urbanize(&mut districts, 0, 5);
        assert_eq!(order, vec![0, 1, 2]);
        assert!(districts[3..].iter().all(|d| d.district_type == DistrictType::Rural));
    }

    #[test]
    fn growth_crosses_bridged_rivers_and_assigns_tiers() {
        let mut districts = row(7);
        link(&mut districts, 2, 3, Relation::River);
        link(&mut districts, 2, 3, Relation::Bridge);

        let order = urbanize(&mut districts, 0, 6);
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(districts[6].district_type, DistrictType::Rural);
        // первая треть в центре, до половины в среднем поясе, дальше окраина
        assert_eq!(districts[0].block_size, 300.0);
        assert_eq!(districts[1].block_size, 300.0);
        assert_eq!(districts[2].block_size, 600.0);
        assert_eq!(districts[3].block_size, 1200.0);
        assert_eq!(districts[5].chaos, 0.0);
    }

    #[test]
    fn cheaper_paths_are_urbanized_first() {
        // 0 соединён с 1 и 2; к 2 ведёт дорога
        let mut districts = row(2);
        districts.push(District::new(2, Point::new(0.0, 1.0), Polygon::default(), Vec::new()));
        link(&mut districts, 0, 2, Relation::Neighbor);
        link(&mut districts, 0, 2, Relation::Road);

        let order = urbanize(&mut districts, 0, 2);
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn core_requires_river_and_water() {
        let mut districts = row(3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(
            choose_core(&mut districts, &mut rng),
            Err(AttemptError::NoCoreCandidate)
        );

        districts[0].district_type = DistrictType::Water;
        link(&mut districts, 1, 2, Relation::River);
        assert_eq!(choose_core(&mut districts, &mut rng), Ok(1));
        assert!(districts[1].is_core);
    }

    #[test]
    fn isolated_urban_district_reverts() {
        // звезда: центр 0 и три сельских соседа
        let mut districts: Vec<District> = (0..4)
            .map(|i| District::new(i, Point::new(i as f64, 0.0), Polygon::default(), Vec::new()))
            .collect();
        for i in 1..4 {
            link(&mut districts, 0, i, Relation::Neighbor);
        }
        districts[0].district_type = DistrictType::Urban;
        districts[0].set_density(Density::Inner);

        assert_eq!(smooth_urban(&mut districts), 1);
        assert_eq!(districts[0].district_type, DistrictType::Rural);
        assert_eq!(districts[0].block_size, 0.0);

        districts[0].district_type = DistrictType::Urban;
        districts[0].is_core = true;
        assert_eq!(smooth_urban(&mut districts), 0);
    }

    #[test]
    fn forests_next_to_settlements_are_cleared() {
        let mut districts = row(4);
        districts[0].district_type = DistrictType::Village;
        districts[1].district_type = DistrictType::Forest;
        districts[3].district_type = DistrictType::Forest;

        assert_eq!(deforest(&mut districts), 1);
        assert_eq!(districts[1].district_type, DistrictType::Rural);
        assert_eq!(districts[3].district_type, DistrictType::Forest);
    }
}
