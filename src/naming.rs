// src/naming.rs
//! Названия районов

use rand::Rng;
use rand::seq::SliceRandom;

use crate::district::District;

const MODIFIERS: &[&str] = &[
    "Abbot's",
    "Bishop's",
    "Prince's",
    "Widow's",
    "Tanners'",
    "Masons'",
    "Coopers'",
    "Dyers'",
    "Smiths'",
    "Chandlers'",
    "Salt",
    "Crow",
    "Hare",
    "Lantern",
    "High",
    "Low",
    "Upper",
    "Nether",
    "Grey",
    "Amber",
    "Silver",
    "Long",
];

const NOUNS: &[&str] = &[
    "Row",
    "Cross",
    "Green",
    "End",
    "Wharf",
    "Lane",
    "Steps",
    "Close",
    "Hythe",
    "Ford",
    "Mill",
    "Walk",
    "Rise",
    "Hollow",
    "Common",
    "Wall",
    "Bridge",
    "Chapel",
    "Barrow",
    "Well",
];

/// Название вида «модификатор существительное»; существительное выбирается первым
pub fn generate_name(rng: &mut impl Rng) -> String {
    let noun = NOUNS.choose(rng).copied().unwrap_or_default();
    let modifier = MODIFIERS.choose(rng).copied().unwrap_or_default();
    format!("{modifier} {noun}")
}

/// Даёт названия всем районам в порядке id
pub fn name_districts(districts: &mut [District], rng: &mut impl Rng) {
    for district in districts.iter_mut() {
        district.name = generate_name(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn name_is_modifier_then_noun() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..50 {
            let name = generate_name(&mut rng);
            let (modifier, noun) = name.split_once(' ').unwrap();
            assert!(MODIFIERS.contains(&modifier), "{name}");
            assert!(NOUNS.contains(&noun), "{name}");
        }
    }

    #[test]
    fn names_are_reproducible() {
        let a: Vec<String> = {
            let mut rng = ChaCha8Rng::seed_from_u64(12);
            (0..10).map(|_| generate_name(&mut rng)).collect()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let b: Vec<String> = (0..10).map(|_| generate_name(&mut rng)).collect();
        assert_eq!(a, b);
    }
}
