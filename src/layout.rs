//! 2D coordinate generation.
//!
//! Coordinates are in bond-length units. Ring systems are built as regular
//! polygons, fusing each new ring onto an already placed bond (or atom, for
//! spiro centres). Everything else grows breadth-first from the first atom of
//! each fragment: chains zigzag at 120 degrees, sp centres continue straight,
//! the largest branch continues the chain and the other substituents take the
//! free slot with the most room. Remaining clashes are removed by flipping or
//! rotating branches about acyclic bonds.

use crate::rings::{find_rings, ring_systems, Ring};
use crate::{Bond, MoleculeGraph};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Neg, Sub};

/// Horizontal gap between disconnected fragments, in bond lengths.
const FRAGMENT_GAP: f64 = 1.5;
/// Atoms closer than this are considered to collide.
const COLLISION_DISTANCE: f64 = 0.55;
/// Non-bonded atoms closer than this are moved apart after placement.
const CLASH_DISTANCE: f64 = 0.8;
/// Minimum distance from an atom to the centre of a ring it is not part of.
const RING_CLEARANCE: f64 = 0.6;
const MAX_CLASH_PASSES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).length()
    }

    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unit vector in the same direction; the x axis for a zero vector.
    pub fn normalized(&self) -> Point {
        let length = self.length();
        if length < 1e-12 {
            Point::new(1.0, 0.0)
        } else {
            Point::new(self.x / length, self.y / length)
        }
    }

    pub fn rotate(&self, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Mean of a set of points; the origin for an empty set.
pub fn centroid<I: IntoIterator<Item = Point>>(points: I) -> Point {
    let mut sum = Point::default();
    let mut count = 0usize;
    for p in points {
        sum = sum + p;
        count += 1;
    }
    if count == 0 {
        sum
    } else {
        sum * (1.0 / count as f64)
    }
}

/// Computes 2D coordinates for every atom, indexed by node index.
pub fn compute_2d_coords(graph: &MoleculeGraph) -> Vec<Point> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }
    let rings = find_rings(graph);
    let systems = ring_systems(&rings);
    let mut system_of_atom = vec![None; n];
    for (id, members) in systems.iter().enumerate() {
        for &r in members {
            for atom in &rings[r].atoms {
                system_of_atom[atom.index()] = Some(id);
            }
        }
    }

    let mut layout = Layout {
        graph,
        rings: &rings,
        systems: &systems,
        system_of_atom,
        coords: vec![None; n],
        turn: vec![1.0; n],
        placed: Vec::new(),
    };

    let mut fragments = Vec::new();
    for node in graph.node_indices() {
        if layout.coords[node.index()].is_none() {
            fragments.push(layout.place_fragment(node));
        }
    }

    let mut coords: Vec<Point> = layout
        .coords
        .into_iter()
        .map(|p| p.unwrap_or_default())
        .collect();
    for fragment in &fragments {
        resolve_clashes(graph, &rings, &mut coords, fragment);
        orient(&mut coords, fragment);
    }
    pack_fragments(&mut coords, &fragments);
    coords
}

struct Layout<'a> {
    graph: &'a MoleculeGraph,
    rings: &'a [Ring],
    systems: &'a [Vec<usize>],
    system_of_atom: Vec<Option<usize>>,
    coords: Vec<Option<Point>>,
    // zigzag direction to take at each chain atom
    turn: Vec<f64>,
    // atoms of the fragment being placed
    placed: Vec<NodeIndex>,
}

impl Layout<'_> {
    fn pos(&self, atom: NodeIndex) -> Option<Point> {
        self.coords[atom.index()]
    }

    fn put(&mut self, atom: NodeIndex, p: Point, queue: &mut VecDeque<NodeIndex>) {
        self.coords[atom.index()] = Some(p);
        self.placed.push(atom);
        queue.push_back(atom);
    }

    /// Places the fragment containing `start` and returns its atoms.
    fn place_fragment(&mut self, start: NodeIndex) -> Vec<NodeIndex> {
        self.placed.clear();
        let mut queue = VecDeque::new();

        match self.system_of_atom[start.index()] {
            Some(system) => {
                for (atom, p) in self.layout_ring_system(system) {
                    self.put(atom, p, &mut queue);
                }
            }
            None => {
                self.turn[start.index()] = -1.0;
                self.put(start, Point::default(), &mut queue);
            }
        }

        while let Some(atom) = queue.pop_front() {
            let mut pending: Vec<NodeIndex> = self
                .graph
                .neighbors(atom)
                .filter(|nb| self.pos(*nb).is_none())
                .collect();
            if pending.is_empty() {
                continue;
            }
            pending.sort();
            pending.dedup();
            let origin = self.pos(atom).unwrap_or_default();

            for (child, direction, turn) in self.child_directions(atom, &pending) {
                if self.pos(child).is_some() {
                    continue;
                }
                let target = origin + direction;
                match self.system_of_atom[child.index()] {
                    Some(system) => {
                        let local = self.layout_ring_system(system);
                        let anchor = local
                            .iter()
                            .find(|(a, _)| *a == child)
                            .map(|(_, p)| *p)
                            .unwrap_or_default();
                        let center = centroid(local.iter().map(|(_, p)| *p));
                        let rotation = direction.angle() - (center - anchor).angle();
                        for (ring_atom, p) in local {
                            if self.pos(ring_atom).is_none() {
                                let q = (p - anchor).rotate(rotation) + target;
                                self.put(ring_atom, q, &mut queue);
                            }
                        }
                    }
                    None => {
                        self.turn[child.index()] = turn;
                        self.put(child, target, &mut queue);
                    }
                }
            }
        }
        std::mem::take(&mut self.placed)
    }

    /// Number of unplaced atoms reachable from `child` without passing
    /// through `parent`.
    fn branch_size(&self, parent: NodeIndex, child: NodeIndex) -> usize {
        let mut seen = vec![parent, child];
        let mut queue = VecDeque::from([child]);
        while let Some(atom) = queue.pop_front() {
            for nb in self.graph.neighbors(atom) {
                if self.pos(nb).is_none() && !seen.contains(&nb) {
                    seen.push(nb);
                    queue.push_back(nb);
                }
            }
        }
        seen.len() - 1
    }

    /// Chooses a direction (and the zigzag sign to hand down) for every
    /// unplaced neighbour of `atom`. The largest branch takes the slot that
    /// continues the chain; the others fill the remaining slots.
    fn child_directions(
        &self,
        atom: NodeIndex,
        pending: &[NodeIndex],
    ) -> Vec<(NodeIndex, Point, f64)> {
        let origin = self.pos(atom).unwrap_or_default();
        let placed_dirs: Vec<Point> = self
            .graph
            .neighbors(atom)
            .filter_map(|nb| self.pos(nb))
            .map(|p| (p - origin).normalized())
            .collect();
        let turn = self.turn[atom.index()];
        let m = pending.len();

        let mut children = pending.to_vec();
        children.sort_by_key(|child| std::cmp::Reverse(self.branch_size(atom, *child)));

        let (slots, main) = match placed_dirs.len() {
            0 => {
                let slots: Vec<Point> = (0..m)
                    .map(|k| Point::from_angle(-PI / 6.0 + 2.0 * PI * k as f64 / m as f64))
                    .collect();
                return children
                    .into_iter()
                    .zip(slots)
                    .map(|(child, direction)| (child, direction, 1.0))
                    .collect();
            }
            1 => {
                let forward = -placed_dirs[0];
                if m == 1 && self.is_linear(atom) {
                    return vec![(children[0], forward, turn)];
                }
                let slots = if m == 1 {
                    vec![forward.rotate(turn * PI / 3.0), forward.rotate(-turn * PI / 3.0)]
                } else {
                    spread_in_gap(placed_dirs[0].angle(), 2.0 * PI, m)
                };
                let target = if m % 2 == 1 && m > 1 {
                    forward
                } else {
                    forward.rotate(turn * PI / 3.0)
                };
                let mut main = closest_slot(&slots, target);
                if self.collides(origin + slots[main]) {
                    let mirrored = forward.rotate(-turn * PI / 3.0);
                    let other = closest_slot(&slots, mirrored);
                    if !self.collides(origin + slots[other]) {
                        main = other;
                    }
                }
                let mut slots = slots;
                if m == 1 {
                    slots = vec![slots[main]];
                    main = 0;
                }
                (slots, main)
            }
            _ => {
                // the free gap with the most room, preferring wider gaps
                let best = angular_gaps(&placed_dirs)
                    .into_iter()
                    .map(|(start, size)| {
                        let slots = spread_in_gap(start, size, m);
                        let room = slots
                            .iter()
                            .map(|d| self.clearance(atom, origin + *d))
                            .fold(f64::INFINITY, f64::min)
                            .min(1.2);
                        (room, size, slots)
                    })
                    .max_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
                let slots = best.map(|(_, _, slots)| slots).unwrap_or_default();
                let main = slots.len() / 2;
                (slots, main)
            }
        };

        let zigzag = |direction: Point| -> f64 {
            let forward = placed_dirs.first().map(|d| -*d).unwrap_or(direction);
            let side = forward.cross(direction);
            if side.abs() < 1e-6 {
                turn
            } else {
                -side.signum()
            }
        };
        let mut order: Vec<usize> = vec![main];
        order.extend((0..slots.len()).filter(|&k| k != main));
        children
            .into_iter()
            .zip(order)
            .map(|(child, k)| (child, slots[k], zigzag(slots[k])))
            .collect()
    }

    /// sp centres: a triple bond or two cumulated double bonds.
    fn is_linear(&self, atom: NodeIndex) -> bool {
        let bonds: Vec<Bond> = self.graph.edges(atom).map(|e| *e.weight()).collect();
        bonds.len() == 2
            && (bonds.contains(&Bond::Triple)
                || bonds.iter().filter(|b| **b == Bond::Double).count() == 2)
    }

    fn collides(&self, p: Point) -> bool {
        self.placed
            .iter()
            .filter_map(|a| self.pos(*a))
            .any(|q| q.distance(p) < COLLISION_DISTANCE)
    }

    /// Distance from `p` to the nearest placed atom other than `from`, or
    /// to the centre of a placed ring.
    fn clearance(&self, from: NodeIndex, p: Point) -> f64 {
        let atoms = self
            .placed
            .iter()
            .filter(|a| **a != from)
            .filter_map(|a| self.pos(*a))
            .map(|q| q.distance(p));
        let centers = self
            .rings
            .iter()
            .filter(|ring| ring.atoms.iter().all(|a| self.placed.contains(a)))
            .map(|ring| centroid(ring.atoms.iter().filter_map(|a| self.pos(*a))).distance(p));
        atoms.chain(centers).fold(f64::INFINITY, f64::min)
    }

    /// Lays out one ring system in its own frame.
    fn layout_ring_system(&self, system: usize) -> Vec<(NodeIndex, Point)> {
        let members = &self.systems[system];
        let mut local: BTreeMap<NodeIndex, Point> = BTreeMap::new();
        let mut done = vec![false; members.len()];

        let first = &self.rings[members[0]];
        for (atom, p) in regular_polygon(first.len(), Point::default(), -PI / 2.0)
            .into_iter()
            .enumerate()
        {
            local.insert(first.atoms[atom], p);
        }
        done[0] = true;

        loop {
            // next ring: the one with the most atoms already placed
            let next = (0..members.len())
                .filter(|&i| !done[i])
                .map(|i| {
                    let placed = self.rings[members[i]]
                        .atoms
                        .iter()
                        .filter(|a| local.contains_key(a))
                        .count();
                    (placed, std::cmp::Reverse(i))
                })
                .max();
            let Some((placed, std::cmp::Reverse(i))) = next else {
                break;
            };
            done[i] = true;
            let ring = &self.rings[members[i]];
            if placed == 0 {
                // not reachable through shared atoms; set it beside the rest
                let right = local.values().map(|p| p.x).fold(f64::MIN, f64::max);
                let r = circumradius(ring.len(), 1.0);
                let center = Point::new(right + r + 1.0, 0.0);
                for (k, p) in regular_polygon(ring.len(), center, -PI / 2.0)
                    .into_iter()
                    .enumerate()
                {
                    local.insert(ring.atoms[k], p);
                }
                continue;
            }
            self.fuse_ring(ring, &mut local);
        }

        local.into_iter().collect()
    }

    /// Places the unplaced atoms of `ring` given at least one placed atom.
    fn fuse_ring(&self, ring: &Ring, local: &mut BTreeMap<NodeIndex, Point>) {
        let n = ring.len();
        let is_placed: Vec<bool> = ring.atoms.iter().map(|a| local.contains_key(a)).collect();
        let Some((start, run)) = longest_run(&is_placed) else {
            return;
        };
        if run == n {
            return;
        }
        // ring atoms starting at the placed run
        let atoms: Vec<NodeIndex> = (0..n).map(|k| ring.atoms[(start + k) % n]).collect();
        let unplaced = &atoms[run..];
        let m = unplaced.len();

        if run == 1 {
            // spiro centre: grow the ring away from the atom's placed neighbours
            let s = atoms[0];
            let ps = local[&s];
            let neighbours = self
                .graph
                .neighbors(s)
                .filter_map(|nb| local.get(&nb).copied());
            let away = (ps - centroid(neighbours)).normalized();
            let r = circumradius(n, 1.0);
            let center = ps + away * r;
            let start_angle = (ps - center).angle();
            let step = 2.0 * PI / n as f64;
            for (j, atom) in unplaced.iter().enumerate() {
                let angle = start_angle + step * (j + 1) as f64;
                local
                    .entry(*atom)
                    .or_insert(center + Point::from_angle(angle) * r);
            }
            return;
        }

        // the unplaced atoms run from p (end of the placed run) round to q
        let q = local[&atoms[0]];
        let p = local[&atoms[run - 1]];
        let sides = m + 2;
        let base = p.distance(q).max(1e-6);
        let r = circumradius(sides, base);
        let apothem = base / (2.0 * (PI / sides as f64).tan());
        let mid = (p + q) * 0.5;
        let normal = (q - p).perp().normalized();

        let reference = {
            let near: Vec<Point> = [atoms[0], atoms[run - 1]]
                .iter()
                .flat_map(|end| self.graph.neighbors(*end))
                .filter(|nb| *nb != atoms[0] && *nb != atoms[run - 1])
                .filter_map(|nb| local.get(&nb).copied())
                .collect();
            if near.is_empty() {
                centroid(local.values().copied())
            } else {
                centroid(near)
            }
        };
        let side = if (reference - mid).dot(normal) > 0.0 {
            -1.0
        } else {
            1.0
        };
        let center = mid + normal * (apothem * side);

        let step = 2.0 * PI / sides as f64;
        let direction = if (p - center).cross(q - center) > 0.0 {
            -1.0
        } else {
            1.0
        };
        let start_angle = (p - center).angle();
        for (j, atom) in unplaced.iter().enumerate() {
            let angle = start_angle + direction * step * (j + 1) as f64;
            local
                .entry(*atom)
                .or_insert(center + Point::from_angle(angle) * r);
        }
    }
}

fn circumradius(sides: usize, edge: f64) -> f64 {
    edge / (2.0 * (PI / sides as f64).sin())
}

/// Vertices of a regular polygon with unit edges.
fn regular_polygon(sides: usize, center: Point, start_angle: f64) -> Vec<Point> {
    let r = circumradius(sides, 1.0);
    (0..sides)
        .map(|k| center + Point::from_angle(start_angle + 2.0 * PI * k as f64 / sides as f64) * r)
        .collect()
}

/// Longest cyclic run of `true`, as (start index, length).
fn longest_run(flags: &[bool]) -> Option<(usize, usize)> {
    let n = flags.len();
    if n == 0 || !flags.iter().any(|f| *f) {
        return None;
    }
    let Some(gap) = flags.iter().position(|f| !f) else {
        return Some((0, n));
    };
    let mut best = (0, 0);
    let mut current: Option<(usize, usize)> = None;
    for k in 1..=n {
        let i = (gap + k) % n;
        if flags[i] {
            current = Some(match current {
                Some((s, len)) => (s, len + 1),
                None => (i, 1),
            });
            if let Some(run) = current {
                if run.1 > best.1 {
                    best = run;
                }
            }
        } else {
            current = None;
        }
    }
    Some(best)
}

/// Free angular gaps between bond directions, as (start angle, size).
fn angular_gaps(existing: &[Point]) -> Vec<(f64, f64)> {
    let mut angles: Vec<f64> = existing.iter().map(|d| d.angle()).collect();
    angles.sort_by(|a, b| a.total_cmp(b));
    let Some(&last) = angles.last() else {
        return vec![(0.0, 2.0 * PI)];
    };
    let mut gaps = vec![(last, angles[0] + 2.0 * PI - last)];
    gaps.extend(angles.windows(2).map(|pair| (pair[0], pair[1] - pair[0])));
    gaps
}

/// Directions for `m` new bonds, evenly spaced inside a gap.
fn spread_in_gap(start: f64, size: f64, m: usize) -> Vec<Point> {
    (0..m)
        .map(|k| Point::from_angle(start + size * (k + 1) as f64 / (m + 1) as f64))
        .collect()
}

fn closest_slot(slots: &[Point], target: Point) -> usize {
    (0..slots.len())
        .max_by(|&a, &b| slots[a].dot(target).total_cmp(&slots[b].dot(target)))
        .unwrap_or(0)
}

/// Sum of clash penalties within a fragment: atom pairs closer than
/// `CLASH_DISTANCE` and atoms sitting near the centre of a ring they are
/// not part of.
fn clash_score(rings: &[&Ring], coords: &[Point], fragment: &[NodeIndex]) -> f64 {
    let mut score = 0.0;
    for (i, a) in fragment.iter().enumerate() {
        let pa = coords[a.index()];
        for b in &fragment[i + 1..] {
            let d = pa.distance(coords[b.index()]);
            if d < CLASH_DISTANCE {
                score += 1.0 + CLASH_DISTANCE - d;
            }
        }
    }
    for ring in rings {
        let center = centroid(ring.atoms.iter().map(|a| coords[a.index()]));
        for atom in fragment.iter().filter(|a| !ring.contains(**a)) {
            let d = coords[atom.index()].distance(center);
            if d < RING_CLEARANCE {
                score += 1.0 + RING_CLEARANCE - d;
            }
        }
    }
    score
}

/// Atoms reachable from `start` without stepping onto `blocked`.
fn branch(graph: &MoleculeGraph, start: NodeIndex, blocked: NodeIndex) -> Vec<NodeIndex> {
    let mut seen = vec![start];
    let mut queue = VecDeque::from([start]);
    while let Some(atom) = queue.pop_front() {
        for nb in graph.neighbors(atom) {
            if nb != blocked && !seen.contains(&nb) {
                seen.push(nb);
                queue.push_back(nb);
            }
        }
    }
    seen
}

/// Moves substituents that ended up on top of each other. Each pass tries
/// flipping the smaller side of every acyclic bond across the bond axis, or
/// rotating it about the bond's other atom, and keeps the move that lowers
/// the clash score most.
fn resolve_clashes(
    graph: &MoleculeGraph,
    rings: &[Ring],
    coords: &mut [Point],
    fragment: &[NodeIndex],
) {
    let local_rings: Vec<&Ring> = rings
        .iter()
        .filter(|ring| ring.atoms.iter().all(|a| fragment.contains(a)))
        .collect();
    let mut score = clash_score(&local_rings, coords, fragment);
    if score == 0.0 {
        return;
    }

    let mut moves = Vec::new();
    for edge in graph.edge_references() {
        let (a, b) = (edge.source(), edge.target());
        if !fragment.contains(&a) || rings.iter().any(|ring| ring.contains_bond(a, b)) {
            continue;
        }
        let from_b = branch(graph, b, a);
        let from_a = branch(graph, a, b);
        if from_b.len() <= from_a.len() {
            moves.push((a, b, from_b));
        } else {
            moves.push((b, a, from_a));
        }
    }
    const TURNS: [f64; 9] = [
        0.0,
        PI / 6.0,
        -PI / 6.0,
        PI / 3.0,
        -PI / 3.0,
        PI / 2.0,
        -PI / 2.0,
        2.0 * PI / 3.0,
        -2.0 * PI / 3.0,
    ];

    for _ in 0..MAX_CLASH_PASSES {
        let mut best: Option<(f64, f64, Vec<Point>)> = None;
        for (pivot, head, side) in &moves {
            let p = coords[pivot.index()];
            let axis = (coords[head.index()] - p).normalized();
            for &turn in &TURNS {
                let mut trial = coords.to_vec();
                for atom in side {
                    let d = coords[atom.index()] - p;
                    trial[atom.index()] = if turn == 0.0 {
                        // mirror across the bond axis
                        p + axis * (2.0 * d.dot(axis)) - d
                    } else {
                        p + d.rotate(turn)
                    };
                }
                let trial_score = clash_score(&local_rings, &trial, fragment);
                let cost = turn.abs() * 0.01;
                let better = match &best {
                    Some((s, c, _)) => trial_score + cost < s + c,
                    None => true,
                };
                if trial_score < score - 1e-9 && better {
                    best = Some((trial_score, cost, trial));
                }
            }
        }
        let Some((new_score, _, trial)) = best else {
            break;
        };
        coords.copy_from_slice(&trial);
        score = new_score;
        if score == 0.0 {
            break;
        }
    }
}

/// Rotates a fragment about its centroid so its long axis is horizontal.
fn orient(coords: &mut [Point], fragment: &[NodeIndex]) {
    if fragment.len() < 2 {
        return;
    }
    let center = centroid(fragment.iter().map(|a| coords[a.index()]));
    let (mut xx, mut xy, mut yy) = (0.0, 0.0, 0.0);
    for atom in fragment {
        let d = coords[atom.index()] - center;
        xx += d.x * d.x;
        xy += d.x * d.y;
        yy += d.y * d.y;
    }
    let anisotropy = ((xx - yy) * (xx - yy) + 4.0 * xy * xy).sqrt();
    if anisotropy < 1e-6 * (xx + yy).max(1e-12) {
        return;
    }
    let angle = 0.5 * (2.0 * xy).atan2(xx - yy);
    for atom in fragment {
        let p = &mut coords[atom.index()];
        *p = (*p - center).rotate(-angle) + center;
    }
}

/// Lines fragments up left to right, vertically centred on y = 0.
fn pack_fragments(coords: &mut [Point], fragments: &[Vec<NodeIndex>]) {
    let mut cursor = 0.0;
    for (i, fragment) in fragments.iter().enumerate() {
        let xs = fragment.iter().map(|a| coords[a.index()].x);
        let min_x = xs.clone().fold(f64::INFINITY, f64::min);
        let max_x = xs.fold(f64::NEG_INFINITY, f64::max);
        let ys = fragment.iter().map(|a| coords[a.index()].y);
        let min_y = ys.clone().fold(f64::INFINITY, f64::min);
        let max_y = ys.fold(f64::NEG_INFINITY, f64::max);
        let offset = Point::new(
            if i == 0 { -min_x } else { cursor - min_x },
            -(min_y + max_y) / 2.0,
        );
        for atom in fragment {
            let p = &mut coords[atom.index()];
            *p = *p + offset;
        }
        cursor = max_x + offset.x + FRAGMENT_GAP;
    }
}
