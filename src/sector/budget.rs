// src/sector/budget.rs
use crate::config::{BudgetSettings, DifficultyTier};
use crate::sector::{NodeId, Sector, ThreatBudget};
use std::collections::BTreeMap;

/// Стадия 2: бюджет угрозы. Чистая функция от сектора и сложности.
pub trait ThreatBudgetCalculator: Send + Sync {
    fn calculate(&self, sector: &Sector, difficulty: DifficultyTier) -> ThreatBudget;
}

/// Бюджет растёт с размером, средней глубиной и сложностью;
/// доля узла пропорциональна его глубине.
#[derive(Debug, Clone, Default)]
pub struct DepthScaledBudget {
    pub settings: BudgetSettings,
}

impl DepthScaledBudget {
    #[must_use]
    pub fn new(settings: BudgetSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn total(&self, sector: &Sector, difficulty: DifficultyTier) -> u32 {
        let size = sector.len() as f64;
        let depth_factor =
            1.0 + self.settings.depth_scaling * (sector.average_depth() - 1.0).max(0.0);
        let raw = f64::from(self.settings.base_per_room)
            * size
            * difficulty.budget_multiplier()
            * depth_factor;
        raw.round().clamp(0.0, f64::from(u32::MAX)) as u32
    }
}

/// Делит `total` пропорционально глубине. Остаток от округления вниз раздаётся
/// по одному очку самым глубоким узлам (при равенстве — меньший id первым),
/// так что сумма долей в точности равна `total`.
fn split_by_depth(sector: &Sector, total: u32) -> BTreeMap<NodeId, u32> {
    let mut shares = BTreeMap::new();
    if sector.is_empty() {
        return shares;
    }

    let depth_sum: u64 = sector.nodes.iter().map(|n| u64::from(n.depth)).sum();
    let weight = |depth: u32| {
        if depth_sum == 0 {
            1
        } else {
            u64::from(depth)
        }
    };
    let weight_sum = if depth_sum == 0 {
        sector.len() as u64
    } else {
        depth_sum
    };

    let mut assigned: u64 = 0;
    for node in &sector.nodes {
        let share = u64::from(total) * weight(node.depth) / weight_sum;
        assigned += share;
        shares.insert(node.id, share as u32);
    }

    let mut by_depth: Vec<(u32, NodeId)> = sector.nodes.iter().map(|n| (n.depth, n.id)).collect();
    by_depth.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut remainder = u64::from(total) - assigned;
    for &(_, id) in by_depth.iter().cycle() {
        if remainder == 0 {
            break;
        }
        if let Some(share) = shares.get_mut(&id) {
            *share += 1;
        }
        remainder -= 1;
    }
    shares
}

impl ThreatBudgetCalculator for DepthScaledBudget {
    fn calculate(&self, sector: &Sector, difficulty: DifficultyTier) -> ThreatBudget {
        let total = self.total(sector, difficulty);
        let per_node = split_by_depth(sector, total);
        tracing::debug!(total, ?difficulty, "бюджет угрозы рассчитан");
        ThreatBudget { total, per_node }
    }
}
