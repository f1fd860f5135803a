//! Incremental contour assembly.
//!
//! Every sliced triangle knows which of its edges the contour enters and
//! leaves through, and adjacent triangles share those edges. Stitching
//! intersections into chains is therefore pure bookkeeping: an incoming
//! intersection either extends an existing chain at one end, bridges two
//! chains together, or starts a new one. Two hash maps keyed on the open
//! edge of each chain end make every step O(1) amortized.
//!
//! Chain convention: for consecutive elements,
//! `chain[k].backward_edge == chain[k+1].forward_edge`; a chain is closed
//! once `last.backward_edge == first.forward_edge`.

use std::collections::{HashMap, VecDeque};

use strata_clip::Point;

/// Edge identity: the two deduplicated position indices of its endpoints,
/// in ascending order. Two triangles sharing an edge produce equal keys.
pub(crate) type EdgeKey = (u32, u32);

pub(crate) fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One crossing of a layer plane through a triangle: the 2D point on the
/// plane plus the edges linking it to its chain neighbors.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// Intersection point on the layer plane, integer units.
    pub point: Point,
    pub(crate) forward: EdgeKey,
    pub(crate) backward: EdgeKey,
}

/// An ordered run of intersections along one contour.
#[derive(Debug)]
pub struct Chain {
    items: VecDeque<Intersection>,
}

impl Chain {
    fn new(first: Intersection) -> Self {
        let mut items = VecDeque::new();
        items.push_back(first);
        Self { items }
    }

    /// Number of intersections in the chain.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the chain holds no intersections.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A chain is closed when its open ends meet on the same edge.
    pub fn is_closed(&self) -> bool {
        match (self.items.back(), self.items.front()) {
            (Some(last), Some(first)) => last.backward == first.forward,
            _ => false,
        }
    }

    /// The intersection points in chain order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.items.iter().map(|i| i.point)
    }

    fn last(&self) -> Intersection {
        self.items[self.items.len() - 1]
    }
}

/// Stitches the intersections of one layer into chains as they arrive.
#[derive(Default)]
pub(crate) struct ChainSet {
    chains: Vec<Option<Chain>>,
    /// first.forward_edge -> chain slot
    by_first_forward: HashMap<EdgeKey, usize>,
    /// last.backward_edge -> chain slot
    by_last_backward: HashMap<EdgeKey, usize>,
}

impl ChainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one intersection, extending and merging chains as needed.
    pub fn add(&mut self, ins: Intersection) {
        if let Some(&ci) = self.by_first_forward.get(&ins.backward) {
            self.prepend(ci, ins);
            self.merge_after_prepend(ci, ins);
        } else if let Some(&ci) = self.by_last_backward.get(&ins.forward) {
            self.append(ci, ins);
            self.merge_after_append(ci, ins);
        } else {
            let idx = self.chains.len();
            self.chains.push(Some(Chain::new(ins)));
            self.by_first_forward.insert(ins.forward, idx);
            self.by_last_backward.insert(ins.backward, idx);
        }
    }

    /// All chains assembled so far, closed and open.
    pub fn into_chains(self) -> Vec<Chain> {
        self.chains.into_iter().flatten().collect()
    }

    fn prepend(&mut self, ci: usize, ins: Intersection) {
        let chain = self.chains[ci].as_mut().expect("live chain");
        chain.items.push_front(ins);
        self.remove_if(Map::FirstForward, ins.backward, ci);
        self.by_first_forward.insert(ins.forward, ci);
    }

    fn append(&mut self, ci: usize, ins: Intersection) {
        let chain = self.chains[ci].as_mut().expect("live chain");
        chain.items.push_back(ins);
        self.remove_if(Map::LastBackward, ins.forward, ci);
        self.by_last_backward.insert(ins.backward, ci);
    }

    /// After prepending, another chain may end on the edge this one now
    /// starts with; concatenate this chain onto its back.
    fn merge_after_prepend(&mut self, ci: usize, ins: Intersection) {
        let di = match self.by_last_backward.get(&ins.forward) {
            Some(&di) if di != ci => di,
            _ => return,
        };
        let mut c = self.chains[ci].take().expect("live chain");
        let c_last_backward = c.last().backward;
        self.remove_if(Map::FirstForward, ins.forward, ci);
        self.remove_if(Map::LastBackward, ins.forward, di);
        self.remove_if(Map::LastBackward, c_last_backward, ci);
        let d = self.chains[di].as_mut().expect("live chain");
        d.items.append(&mut c.items);
        self.by_last_backward.insert(c_last_backward, di);
    }

    /// After appending, another chain may start on the edge this one now
    /// ends with; concatenate it onto this chain's back.
    fn merge_after_append(&mut self, ci: usize, ins: Intersection) {
        let di = match self.by_first_forward.get(&ins.backward) {
            Some(&di) if di != ci => di,
            _ => return,
        };
        let mut d = self.chains[di].take().expect("live chain");
        let d_last_backward = d.last().backward;
        self.remove_if(Map::FirstForward, ins.backward, di);
        self.remove_if(Map::LastBackward, ins.backward, ci);
        self.remove_if(Map::LastBackward, d_last_backward, di);
        let c = self.chains[ci].as_mut().expect("live chain");
        c.items.append(&mut d.items);
        self.by_last_backward.insert(d_last_backward, ci);
    }

    /// Remove a map entry only when it still points at the given chain;
    /// on non-manifold input a key can be claimed by another chain.
    fn remove_if(&mut self, map: Map, key: EdgeKey, idx: usize) {
        let map = match map {
            Map::FirstForward => &mut self.by_first_forward,
            Map::LastBackward => &mut self.by_last_backward,
        };
        if map.get(&key) == Some(&idx) {
            map.remove(&key);
        }
    }
}

enum Map {
    FirstForward,
    LastBackward,
}
