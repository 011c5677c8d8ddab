// src/sector/topology.rs
use crate::biome::Biome;
use crate::config::VineSettings;
use crate::rng::RandomSource;
use crate::sector::{NodeId, Sector};

/// Стадия 1: построение абстрактного графа сектора.
///
/// Реализация обязана быть детерминированной: одинаковые
/// (биом, число комнат, глубина, состояние источника) дают одинаковый сектор.
pub trait TopologyGenerator: Send + Sync {
    fn generate_sector(
        &self,
        biome: Biome,
        room_count: usize,
        depth: u32,
        rng: &mut dyn RandomSource,
    ) -> Sector;
}

/// Рост «вьющейся лозой»: каждый шаг прирастает один узел к узлу фронтира,
/// причём свежие узлы выбираются чаще, так что граф тянется цепочкой,
/// а редкие петли дают боковые комнаты и кольца.
#[derive(Debug, Clone, Default)]
pub struct SproutingVine {
    pub settings: VineSettings,
}

impl SproutingVine {
    #[must_use]
    pub fn new(settings: VineSettings) -> Self {
        Self { settings }
    }

    fn max_degree(&self) -> usize {
        self.settings.max_degree.max(2)
    }

    /// Веса фронтира: `1 + i * recency_bias` в порядке добавления
    fn frontier_weights(&self, frontier: &[NodeId]) -> Vec<u32> {
        (0..frontier.len())
            .map(|i| 1u32.saturating_add((i as u32).saturating_mul(self.settings.recency_bias)))
            .collect()
    }

    /// Второе ребро от нового узла к узлу рядом с родителем.
    ///
    /// Цель, которая дала бы дубликат (родитель уже соединён с ребёнком) или
    /// упёрлась бы в предел степени, перебрасывается из того же потока.
    /// После `1 + max_branch_rerolls` неудачных бросков ветвление отменяется
    /// с предупреждением.
    fn sprout_loop(
        &self,
        sector: &mut Sector,
        parent: NodeId,
        child: NodeId,
        rng: &mut dyn RandomSource,
    ) {
        let parent_depth = sector.nodes[parent as usize].depth;
        let window = self.settings.loop_depth_window;
        let candidates: Vec<NodeId> = sector
            .nodes
            .iter()
            .filter(|n| n.id != child && n.depth.abs_diff(parent_depth) <= window)
            .map(|n| n.id)
            .collect();

        for attempt in 0..=self.settings.max_branch_rerolls {
            let target = candidates[rng.next_below(candidates.len() as u32) as usize];
            let saturated = sector.nodes[target as usize].degree >= self.max_degree();
            if !saturated && sector.connect(child, target) {
                tracing::trace!(child, target, attempt, "петля лозы");
                return;
            }
        }
        tracing::warn!(
            child,
            parent,
            attempts = self.settings.max_branch_rerolls + 1,
            "петля не нашла свободной цели, ветвление пропущено"
        );
    }
}

impl TopologyGenerator for SproutingVine {
    fn generate_sector(
        &self,
        biome: Biome,
        room_count: usize,
        depth: u32,
        rng: &mut dyn RandomSource,
    ) -> Sector {
        let max_degree = self.max_degree();
        let mut sector = Sector::new(biome, depth);
        let mut frontier: Vec<NodeId> = vec![sector.start];

        while sector.len() < room_count {
            if frontier.is_empty() {
                // Все узлы насыщены — открываем фронтир заново, чтобы рост не встал
                frontier.extend(
                    sector
                        .nodes
                        .iter()
                        .filter(|n| n.degree < max_degree)
                        .map(|n| n.id),
                );
                if frontier.is_empty() {
                    frontier.extend(sector.nodes.iter().map(|n| n.id));
                }
            }

            let weights = self.frontier_weights(&frontier);
            let pick = rng.pick_weighted(&weights).unwrap_or(frontier.len() - 1);
            let parent = frontier[pick];

            // Пока растём, глубина — глубина в дереве; итоговая считается BFS в конце
            let child = sector.add_node(sector.nodes[parent as usize].depth + 1);
            sector.connect(parent, child);

            if rng.chance(self.settings.branch_probability) {
                self.sprout_loop(&mut sector, parent, child, rng);
            }

            frontier.retain(|&id| sector.nodes[id as usize].degree < max_degree);
            if sector.nodes[child as usize].degree < max_degree {
                frontier.push(child);
            }
        }

        sector.recompute_depths(depth);
        tracing::debug!(
            nodes = sector.len(),
            edges = sector.edges.len(),
            avg_depth = sector.average_depth(),
            "сектор построен"
        );
        sector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRandom, SeededRandom};

    fn vine() -> SproutingVine {
        SproutingVine::default()
    }

    #[test]
    fn grows_exact_room_count() {
        for count in [3, 4, 15, 60] {
            let sector = vine().generate_sector(Biome::Forest, count, 1, &mut SeededRandom::new(9));
            assert_eq!(sector.len(), count);
        }
    }

    #[test]
    fn same_seed_same_sector() {
        let a = vine().generate_sector(Biome::Citadel, 25, 1, &mut SeededRandom::new(42));
        let b = vine().generate_sector(Biome::Citadel, 25, 1, &mut SeededRandom::new(42));
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_usually_differ() {
        let a = vine().generate_sector(Biome::Citadel, 25, 1, &mut SeededRandom::new(1));
        let b = vine().generate_sector(Biome::Citadel, 25, 1, &mut SeededRandom::new(2));
        assert_ne!(a.edges, b.edges);
    }

    #[test]
    fn sector_is_connected_without_loops_or_duplicates() {
        for seed in 0..20 {
            let settings = VineSettings {
                branch_probability: 0.6,
                ..VineSettings::default()
            };
            let sector = SproutingVine::new(settings).generate_sector(
                Biome::TheRoots,
                30,
                1,
                &mut SeededRandom::new(seed),
            );
            assert!(sector.is_connected(), "seed {seed}");
            for (i, e) in sector.edges.iter().enumerate() {
                assert_ne!(e.from, e.to);
                assert!(
                    sector.edges[i + 1..].iter().all(|o| !o.joins(e.from, e.to)),
                    "дубликат ребра {e:?} при сиде {seed}"
                );
            }
        }
    }

    #[test]
    fn depth_is_shortest_distance_plus_root_depth() {
        let sector = vine().generate_sector(Biome::Niflheim, 20, 3, &mut SeededRandom::new(5));
        let distances = sector.distances_from_start();
        assert_eq!(sector.node(sector.start).unwrap().depth, 3);
        for node in &sector.nodes {
            assert_eq!(node.depth, 3 + distances[&node.id]);
            assert_eq!(node.biome, Biome::Niflheim);
        }
    }

    #[test]
    fn degrees_match_edges() {
        let sector = vine().generate_sector(Biome::Forest, 40, 1, &mut SeededRandom::new(77));
        for node in &sector.nodes {
            assert_eq!(node.degree, sector.neighbors(node.id).len());
        }
    }

    #[test]
    fn degree_cap_of_two_without_loops_grows_a_path() {
        let settings = VineSettings {
            branch_probability: 0.0,
            max_degree: 2,
            ..VineSettings::default()
        };
        let sector =
            SproutingVine::new(settings).generate_sector(Biome::Forest, 12, 1, &mut SeededRandom::new(3));
        assert_eq!(sector.edges.len(), 11);
        assert!(sector.nodes.iter().all(|n| n.degree <= 2));
        assert!(sector.is_connected());
    }

    #[test]
    fn exhausted_rerolls_abandon_the_loop_after_a_fixed_number_of_draws() {
        // Единственный кандидат петли — родитель, каждый бросок даёт дубликат
        let settings = VineSettings {
            branch_probability: 1.0,
            max_branch_rerolls: 2,
            ..VineSettings::default()
        };
        let mut rng = ScriptedRandom::new([]);
        let sector = SproutingVine::new(settings).generate_sector(Biome::Forest, 2, 1, &mut rng);
        assert_eq!(sector.edges.len(), 1);
        // родитель, шанс петли, три попытки цели
        assert_eq!(rng.draws, 5);
    }

    #[test]
    fn duplicate_loop_target_is_rerolled() {
        // Узел 1: единственный кандидат петли — его же родитель 0, все броски дают дубликат.
        // Узел 2: кандидаты [0, 1]; первый бросок попадает в родителя 1, второй — в 0.
        let settings = VineSettings {
            branch_probability: 1.0,
            recency_bias: 0,
            ..VineSettings::default()
        };
        let draws = [
            0, // родитель узла 1
            0, // шанс петли
            0, 0, 0, 0, 0, // пять попыток, все в ребро 0-1
            1, // родитель узла 2: фронтир [0, 1]
            0, // шанс петли
            1, // цель 1 — дубликат
            0, // переброс: цель 0
        ];
        let mut rng = ScriptedRandom::new(draws);
        let sector = SproutingVine::new(settings).generate_sector(Biome::Citadel, 3, 1, &mut rng);
        assert!(sector.has_edge(0, 1));
        assert!(sector.has_edge(1, 2));
        assert!(sector.has_edge(2, 0));
        assert_eq!(sector.edges.len(), 3);
        assert_eq!(rng.draws, draws.len());
    }
}
