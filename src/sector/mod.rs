pub mod budget;
pub mod topology;

use std::collections::{BTreeMap, BTreeSet};

use crate::biome::Biome;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

pub type NodeId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorNode {
    pub id: NodeId,
    /// Расстояние от стартового узла в рёбрах плюс глубина корня
    pub depth: u32,
    pub biome: Biome,
    pub degree: usize,
    /// Соседи по любому ребру; поддерживается вместе со списком рёбер
    #[serde(default)]
    pub links: BTreeSet<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorEdge {
    pub from: NodeId,
    pub to: NodeId,
    /// Односторонний проход: пройти можно только `from -> to`
    pub one_way: bool,
}

impl SectorEdge {
    #[must_use]
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Бюджет угрозы сектора: общий и доля каждого узла
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatBudget {
    pub total: u32,
    pub per_node: BTreeMap<NodeId, u32>,
}

impl ThreatBudget {
    #[must_use]
    pub fn share(&self, node: NodeId) -> u32 {
        self.per_node.get(&node).copied().unwrap_or(0)
    }
}

/// Абстрактный граф будущего подземелья.
///
/// Инвариант: идентификатор узла совпадает с его индексом в `nodes`,
/// петель и дублирующих рёбер нет.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub biome: Biome,
    pub nodes: Vec<SectorNode>,
    pub edges: Vec<SectorEdge>,
    pub start: NodeId,
    pub budget: ThreatBudget,
}

impl Sector {
    /// Сектор из одного корневого (стартового) узла
    #[must_use]
    pub fn new(biome: Biome, root_depth: u32) -> Self {
        let mut sector = Self {
            biome,
            nodes: Vec::new(),
            edges: Vec::new(),
            start: 0,
            budget: ThreatBudget::default(),
        };
        sector.add_node(root_depth);
        sector
    }

    pub fn add_node(&mut self, depth: u32) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(SectorNode {
            id,
            depth,
            biome: self.biome,
            degree: 0,
            links: BTreeSet::new(),
        });
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SectorNode> {
        self.nodes.get(id as usize)
    }

    #[must_use]
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.node(a).is_some_and(|n| n.links.contains(&b))
    }

    /// Двусторонний проход. Возвращает `false`, если ребро было бы петлёй,
    /// дубликатом или ссылается на несуществующий узел.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        self.push_edge(a, b, false)
    }

    pub fn connect_one_way(&mut self, from: NodeId, to: NodeId) -> bool {
        self.push_edge(from, to, true)
    }

    fn push_edge(&mut self, from: NodeId, to: NodeId, one_way: bool) -> bool {
        if from == to || self.node(from).is_none() || self.node(to).is_none() {
            return false;
        }
        if self.has_edge(from, to) {
            return false;
        }
        self.edges.push(SectorEdge { from, to, one_way });
        for (node, other) in [(from, to), (to, from)] {
            let node = &mut self.nodes[node as usize];
            node.degree += 1;
            node.links.insert(other);
        }
        true
    }

    /// Соседи узла по любому ребру (без учёта направления), по возрастанию id
    #[must_use]
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| n.links.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Граф проходимости: по дуге на каждое одностороннее ребро и по две на двустороннее.
    /// Индекс вершины в графе совпадает с `NodeId`.
    #[must_use]
    pub fn traversal_graph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len() * 2);
        for node in &self.nodes {
            graph.add_node(node.id);
        }
        for edge in &self.edges {
            let a = NodeIndex::new(edge.from as usize);
            let b = NodeIndex::new(edge.to as usize);
            graph.add_edge(a, b, ());
            if !edge.one_way {
                graph.add_edge(b, a, ());
            }
        }
        graph
    }

    /// Кратчайшие расстояния (в рёбрах) от стартового узла до всех достижимых узлов
    #[must_use]
    pub fn distances_from_start(&self) -> BTreeMap<NodeId, u32> {
        if self.node(self.start).is_none() {
            return BTreeMap::new();
        }
        let graph = self.traversal_graph();
        dijkstra(&graph, NodeIndex::new(self.start as usize), None, |_| 1u32)
            .into_iter()
            .map(|(idx, dist)| (graph[idx], dist))
            .collect()
    }

    #[must_use]
    pub fn unreachable_from_start(&self) -> Vec<NodeId> {
        let reachable = self.distances_from_start();
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !reachable.contains_key(id))
            .collect()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.unreachable_from_start().is_empty()
    }

    /// Пересчитывает глубину как кратчайшее расстояние от старта.
    /// Недостижимые узлы сохраняют прежнюю глубину.
    pub fn recompute_depths(&mut self, root_depth: u32) {
        let distances = self.distances_from_start();
        for node in &mut self.nodes {
            if let Some(&dist) = distances.get(&node.id) {
                node.depth = root_depth + dist;
            }
        }
    }

    #[must_use]
    pub fn average_depth(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.nodes.iter().map(|n| u64::from(n.depth)).sum();
        sum as f64 / self.nodes.len() as f64
    }

    /// Тупики: узлы с единственным проходом, кроме стартового
    #[must_use]
    pub fn dead_ends(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.degree == 1 && n.id != self.start)
            .map(|n| n.id)
            .collect()
    }

    /// Узел для арены босса: самый глубокий, при равенстве — с большим id.
    /// Стартовый узел боссом не бывает.
    #[must_use]
    pub fn boss_node(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.id != self.start)
            .max_by_key(|n| (n.depth, n.id))
            .map(|n| n.id)
    }
}
