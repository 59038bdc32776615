//! Link topology.
//!
//! Links are symmetric and keyed by the normalized node pair. Each carries
//! the propagation delay, a loss rate and the RSSI stamped onto delivered
//! frames.

use dvmesh::{Duration, NodeId};
use hashbrown::HashMap;

/// One bidirectional radio link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub active: bool,
    /// Probability a frame on this link is lost.
    pub loss_rate: f64,
    pub delay: Duration,
    /// Received signal strength reported to the receiver, dBm.
    pub rssi: f64,
}

impl Default for Link {
    fn default() -> Self {
        Link {
            active: true,
            loss_rate: 0.0,
            delay: Duration::from_millis(1),
            rssi: -90.0,
        }
    }
}

/// The link graph of a scenario.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    links: HashMap<(NodeId, NodeId), Link>,
}

fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Topology {
    pub fn new() -> Self {
        Topology::default()
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId, link: Link) {
        if a != b {
            self.links.insert(key(a, b), link);
        }
    }

    pub fn link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.links.get(&key(a, b))
    }

    pub fn link_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut Link> {
        self.links.get_mut(&key(a, b))
    }

    pub fn set_active(&mut self, a: NodeId, b: NodeId, active: bool) {
        if let Some(link) = self.links.get_mut(&key(a, b)) {
            link.active = active;
        }
    }

    /// Nodes reachable from `node` over active links, sorted for
    /// deterministic delivery order.
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .links
            .iter()
            .filter(|(_, link)| link.active)
            .filter_map(|(&(a, b), _)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Deactivate every link crossing between `group` and the rest.
    pub fn partition(&mut self, group: &[NodeId]) {
        for (&(a, b), link) in self.links.iter_mut() {
            let a_in = group.contains(&a);
            let b_in = group.contains(&b);
            if a_in != b_in {
                link.active = false;
            }
        }
    }

    /// Reactivate every link.
    pub fn heal(&mut self) {
        for link in self.links.values_mut() {
            link.active = true;
        }
    }

    pub fn fully_connected(nodes: &[NodeId], link: Link) -> Self {
        let mut topo = Topology::new();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in &nodes[i + 1..] {
                topo.connect(a, b, link);
            }
        }
        topo
    }

    pub fn chain(nodes: &[NodeId], link: Link) -> Self {
        let mut topo = Topology::new();
        for pair in nodes.windows(2) {
            topo.connect(pair[0], pair[1], link);
        }
        topo
    }

    pub fn star(hub: NodeId, leaves: &[NodeId], link: Link) -> Self {
        let mut topo = Topology::new();
        for &leaf in leaves {
            topo.connect(hub, leaf, link);
        }
        topo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_symmetric() {
        let mut topo = Topology::new();
        topo.connect(3, 1, Link::default());
        assert!(topo.link(1, 3).is_some());
        assert!(topo.link(3, 1).is_some());
        assert_eq!(topo.neighbors(1), vec![3]);
        assert_eq!(topo.neighbors(3), vec![1]);
    }

    #[test]
    fn test_chain_shape() {
        let topo = Topology::chain(&[0, 1, 2, 3], Link::default());
        assert_eq!(topo.neighbors(0), vec![1]);
        assert_eq!(topo.neighbors(1), vec![0, 2]);
        assert_eq!(topo.neighbors(3), vec![2]);
    }

    #[test]
    fn test_fully_connected_shape() {
        let topo = Topology::fully_connected(&[0, 1, 2], Link::default());
        assert_eq!(topo.neighbors(0), vec![1, 2]);
        assert_eq!(topo.neighbors(2), vec![0, 1]);
    }

    #[test]
    fn test_star_shape() {
        let topo = Topology::star(9, &[1, 2, 3], Link::default());
        assert_eq!(topo.neighbors(9), vec![1, 2, 3]);
        assert_eq!(topo.neighbors(2), vec![9]);
    }

    #[test]
    fn test_partition_and_heal() {
        let mut topo = Topology::fully_connected(&[0, 1, 2, 3], Link::default());
        topo.partition(&[0, 1]);
        assert_eq!(topo.neighbors(0), vec![1]);
        assert_eq!(topo.neighbors(2), vec![3]);
        topo.heal();
        assert_eq!(topo.neighbors(0), vec![1, 2, 3]);
    }

    #[test]
    fn test_self_links_ignored() {
        let mut topo = Topology::new();
        topo.connect(1, 1, Link::default());
        assert!(topo.neighbors(1).is_empty());
    }
}
