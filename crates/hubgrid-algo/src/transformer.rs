//! Transformer arrangements: catalog sizes combined in parallel, up to a
//! total unit count.

use hubgrid_core::{Euros, Kilowatts, TransformerConfig, TransformerOption};
use serde::Serialize;
use std::fmt;

/// Capacities closer than this are the same step of the front.
const CAPACITY_EPS: f64 = 1e-9;

/// `count` units of one catalog size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransformerUnits {
    pub unit: TransformerOption,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformerArrangement {
    /// Largest size first
    pub units: Vec<TransformerUnits>,
    pub capacity: Kilowatts,
    pub cost: Euros,
}

impl TransformerArrangement {
    pub fn unit_count(&self) -> u32 {
        self.units.iter().map(|u| u.count).sum()
    }
}

impl fmt::Display for TransformerArrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.units.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{} x {}", group.count, group.unit.capacity)?;
        }
        Ok(())
    }
}

/// Unit counts per catalog entry, with running totals.
#[derive(Debug, Clone)]
struct Mix {
    counts: Vec<u32>,
    units: u32,
    capacity: f64,
    cost: f64,
}

impl Mix {
    fn with(&self, index: usize, option: &TransformerOption) -> Self {
        let mut counts = self.counts.clone();
        counts[index] += 1;
        Self {
            counts,
            units: self.units + 1,
            capacity: self.capacity + option.capacity.value(),
            cost: self.cost + option.cost.value(),
        }
    }

    fn into_arrangement(self, catalog: &[TransformerOption]) -> TransformerArrangement {
        let mut units: Vec<TransformerUnits> = catalog
            .iter()
            .zip(&self.counts)
            .filter(|(_, count)| **count > 0)
            .map(|(unit, &count)| TransformerUnits { unit: *unit, count })
            .collect();
        units.sort_by(|a, b| b.unit.capacity.value().total_cmp(&a.unit.capacity.value()));
        TransformerArrangement {
            units,
            capacity: Kilowatts(self.capacity),
            cost: Euros(self.cost),
        }
    }
}

/// Keep the mixes no cheaper mix matches in capacity, ordered by cost.
fn pareto(mut mixes: Vec<Mix>) -> Vec<Mix> {
    mixes.sort_by(|a, b| {
        a.cost
            .total_cmp(&b.cost)
            .then(b.capacity.total_cmp(&a.capacity))
            .then(a.units.cmp(&b.units))
    });
    let mut front: Vec<Mix> = Vec::with_capacity(mixes.len());
    for mix in mixes {
        if front
            .last()
            .map_or(true, |best| mix.capacity > best.capacity + CAPACITY_EPS)
        {
            front.push(mix);
        }
    }
    front
}

/// All arrangements that are not dominated by a cheaper, at least as strong
/// one, ordered by cost (and therefore by capacity).
///
/// Sets of `k` units are grown from the front of `k - 1` units: a dominated
/// set stays dominated after adding the same unit to both.
pub fn arrangements(config: &TransformerConfig) -> Vec<TransformerArrangement> {
    let catalog = &config.catalog;
    let mut level = vec![Mix {
        counts: vec![0; catalog.len()],
        units: 0,
        capacity: 0.0,
        cost: 0.0,
    }];
    let mut all: Vec<Mix> = Vec::new();
    for _ in 0..config.max_parallel_units {
        let grown = level
            .iter()
            .flat_map(|mix| {
                catalog
                    .iter()
                    .enumerate()
                    .map(move |(index, option)| mix.with(index, option))
            })
            .collect();
        level = pareto(grown);
        if level.is_empty() {
            break;
        }
        all.extend(level.iter().cloned());
    }
    pareto(all)
        .into_iter()
        .map(|mix| mix.into_arrangement(catalog))
        .collect()
}

/// Cheapest arrangement covering `load`.
pub fn cheapest_covering(
    front: &[TransformerArrangement],
    load: Kilowatts,
) -> Option<TransformerArrangement> {
    front.iter().find(|a| a.capacity >= load).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_front_is_monotone() {
        let front = arrangements(&TransformerConfig::default());
        assert_eq!(front[0].capacity, Kilowatts(1000.0));
        assert_eq!(front[0].cost, Euros(120_000.0));
        for pair in front.windows(2) {
            assert!(pair[1].capacity > pair[0].capacity);
            assert!(pair[1].cost > pair[0].cost);
        }
    }

    #[test]
    fn test_parallel_units_beat_single_large_unit() {
        // 2 × 1000 kW costs 240k, a single 2000 kW unit 220k: single wins
        let front = arrangements(&TransformerConfig::default());
        let pick = cheapest_covering(&front, Kilowatts(1900.0)).unwrap();
        assert_eq!(pick.unit_count(), 1);
        assert_eq!(pick.units[0].unit.capacity, Kilowatts(2000.0));

        // above the largest unit, parallel units are required
        let pick = cheapest_covering(&front, Kilowatts(5000.0)).unwrap();
        assert!(pick.unit_count() >= 2);
        assert!(pick.capacity >= Kilowatts(5000.0));
    }

    #[test]
    fn test_mixed_sizes_cover_the_gap_between_identical_sets() {
        let front = arrangements(&TransformerConfig::default());
        let pick = cheapest_covering(&front, Kilowatts(4150.0)).unwrap();
        // 2 × 2500 kW would cost 540k
        assert_eq!(pick.cost, Euros(455_000.0));
        assert_eq!(pick.capacity, Kilowatts(4150.0));
        assert_eq!(
            pick.units,
            vec![
                TransformerUnits {
                    unit: TransformerOption {
                        capacity: Kilowatts(3150.0),
                        cost: Euros(335_000.0),
                    },
                    count: 1,
                },
                TransformerUnits {
                    unit: TransformerOption {
                        capacity: Kilowatts(1000.0),
                        cost: Euros(120_000.0),
                    },
                    count: 1,
                },
            ]
        );
        assert_eq!(pick.to_string(), "1 x 3150.00 kW + 1 x 1000.00 kW");
    }

    #[test]
    fn test_parallel_limit_caps_capacity() {
        let config = TransformerConfig {
            max_parallel_units: 2,
            ..TransformerConfig::default()
        };
        let front = arrangements(&config);
        assert_eq!(front.last().unwrap().capacity, Kilowatts(6300.0));
        assert!(front.iter().all(|a| a.unit_count() <= 2));
        assert!(cheapest_covering(&front, Kilowatts(7000.0)).is_none());
    }

    #[test]
    fn test_empty_catalog_has_no_arrangements() {
        let config = TransformerConfig {
            catalog: Vec::new(),
            max_parallel_units: 4,
        };
        assert!(arrangements(&config).is_empty());
    }
}
