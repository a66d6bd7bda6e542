use std::{error, fmt};

use itertools::Itertools;
use log::debug;
use petgraph::algo::connected_components;
use petgraph::{Graph, Undirected};

use crate::canvas::{Canvas, Color};
use crate::face_indexer::{FaceIndexer, IndexError, IndexedPoint, PointKind};

const PI: f64 = std::f64::consts::PI;

/*
Reference solver configuration, following the uniform neighbour
approach: relaxation runs in blocks of sweeps with the distance to a
packing checked in between.
*/
pub const BLOCK_ITERATIONS: usize = 2000;
pub const DEFAULT_TOLERANCE: f64 = 0.1;
pub const DEFAULT_MAX_BLOCKS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum PackError {
    EmptyComplex,
    SizeMismatch { points: usize, neighbours: usize },
    NoNeighbours(usize),
    NeighbourOutOfRange { point: usize, neighbour: usize },
    CircleOutOfRange(usize),
    Disconnected { components: usize },
    BoundaryNotSimple { visited: usize, total: usize },
    Unrealizable { r: f64, r1: f64, r2: f64 },
    NonPositiveLabel { circle: usize, label: f64 },
    NotConverged { blocks: usize, distance: f64 },
    NotAPacking,
    MissingBoundarySeed,
    Stalled { placed: usize, total: usize },
    Index(IndexError),
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyComplex => write!(f, "cannot pack an empty complex"),
            Self::SizeMismatch { points, neighbours } => {
                write!(
                    f,
                    "{} points but {} neighbour lists",
                    points, neighbours
                )
            }
            Self::NoNeighbours(point) => {
                write!(f, "point {} has an empty neighbour list", point)
            }
            Self::NeighbourOutOfRange { point, neighbour } => {
                write!(f, "point {} lists out of range neighbour {}", point, neighbour)
            }
            Self::CircleOutOfRange(circle) => {
                write!(f, "circle {} is out of range", circle)
            }
            Self::Disconnected { components } => {
                write!(f, "tangency complex splits into {} components", components)
            }
            Self::BoundaryNotSimple { visited, total } => {
                write!(
                    f,
                    "boundary walk closed after {} of {} boundary vertices",
                    visited, total
                )
            }
            Self::Unrealizable { r, r1, r2 } => {
                write!(
                    f,
                    "no tangency angle for radii {}, {} and {}",
                    r, r1, r2
                )
            }
            Self::NonPositiveLabel { circle, label } => {
                write!(f, "label {} for circle {} must be positive", label, circle)
            }
            Self::NotConverged { blocks, distance } => {
                write!(
                    f,
                    "no packing after {} blocks, distance still {}",
                    blocks, distance
                )
            }
            Self::NotAPacking => write!(f, "layout needs a packing label"),
            Self::MissingBoundarySeed => {
                write!(f, "layout needs a boundary vertex to anchor at the origin")
            }
            Self::Stalled { placed, total } => {
                write!(f, "layout stalled with {} of {} circles placed", placed, total)
            }
            Self::Index(inner) => write!(f, "{}", inner),
        }
    }
}
impl error::Error for PackError {}

impl From<IndexError> for PackError {
    fn from(inner: IndexError) -> Self {
        Self::Index(inner)
    }
}

/*
law of cosines angle at the circle of radius r in the triangle of
three mutually tangent circles
*/
fn tangency_angle(r: f64, r1: f64, r2: f64) -> Result<f64, PackError> {
    let a = r + r1;
    let b = r + r2;
    let c = r1 + r2;
    let argument = (a * a + b * b - c * c) / (2.0 * a * b);
    if !argument.is_finite() || !(-1.0..=1.0).contains(&argument) {
        return Err(PackError::Unrealizable { r, r1, r2 });
    }
    Ok(argument.acos())
}

/*
A labelled tangency complex. Every point of the subdivision carries a
putative radius; make_packing relaxes the radii until every angle sum
meets its target, and layout then computes centres.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct CirclePacker {
    kinds: Vec<PointKind>,
    neighbours: Vec<Vec<usize>>,
    labels: Vec<f64>,
    packing: bool,
    tolerance: f64,
    block_iterations: usize,
    max_blocks: usize,
    boundary_vertices: usize,
}

impl CirclePacker {
    pub fn new(points: &[IndexedPoint], neighbours: Vec<Vec<usize>>) -> Result<Self, PackError> {
        let size = points.len();
        if size == 0 {
            return Err(PackError::EmptyComplex);
        }
        if neighbours.len() != size {
            return Err(PackError::SizeMismatch {
                points: size,
                neighbours: neighbours.len(),
            });
        }
        for (point, fan) in neighbours.iter().enumerate() {
            if fan.is_empty() {
                return Err(PackError::NoNeighbours(point));
            }
            for &other in fan {
                if other >= size {
                    return Err(PackError::NeighbourOutOfRange {
                        point,
                        neighbour: other,
                    });
                }
            }
        }

        let mut graph: Graph<(), (), Undirected> = Graph::new_undirected();
        let nodes: Vec<_> = (0..size).map(|_| graph.add_node(())).collect();
        for (point, fan) in neighbours.iter().enumerate() {
            for &other in fan {
                graph.add_edge(nodes[point], nodes[other], ());
            }
        }
        let components = connected_components(&graph);
        if components != 1 {
            return Err(PackError::Disconnected { components });
        }

        let kinds: Vec<PointKind> = points.iter().map(|point| point.kind).collect();
        let packer = Self {
            boundary_vertices: kinds
                .iter()
                .filter(|kind| **kind == PointKind::BoundaryVertex)
                .count(),
            kinds,
            neighbours,
            labels: vec![1.0; size],
            packing: false,
            tolerance: DEFAULT_TOLERANCE,
            block_iterations: BLOCK_ITERATIONS,
            max_blocks: DEFAULT_MAX_BLOCKS,
        };
        packer.check_boundary_walk()?;
        Ok(packer)
    }

    pub fn from_indexer(indexer: &FaceIndexer) -> Result<Self, PackError> {
        let neighbours = indexer.all_neighbours()?;
        Self::new(indexer.points(), neighbours)
    }

    /*
    every boundary vertex must lie on the single walk following the
    first neighbour pointers, and the walk must stay on the boundary
    */
    fn check_boundary_walk(&self) -> Result<(), PackError> {
        let start = match self
            .kinds
            .iter()
            .position(|kind| *kind == PointKind::BoundaryVertex)
        {
            Some(start) => start,
            None => return Ok(()),
        };
        let mut visited = 0;
        let mut steps = 0;
        let mut index = start;
        loop {
            let boundary_like = matches!(
                self.kinds[index],
                PointKind::BoundaryVertex
                    | PointKind::GeneralizedBoundaryVertex
                    | PointKind::BoundaryEdge
            );
            if !boundary_like {
                return Err(PackError::BoundaryNotSimple {
                    visited,
                    total: self.boundary_vertices,
                });
            }
            if self.kinds[index] == PointKind::BoundaryVertex {
                visited += 1;
            }
            index = self.neighbours[index][0];
            steps += 1;
            if index == start {
                break;
            }
            if steps > 2 * self.kinds.len() {
                return Err(PackError::BoundaryNotSimple {
                    visited,
                    total: self.boundary_vertices,
                });
            }
        }
        if visited != self.boundary_vertices {
            return Err(PackError::BoundaryNotSimple {
                visited,
                total: self.boundary_vertices,
            });
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_packing(&self) -> bool {
        self.packing
    }

    pub fn label(&self, circle: usize) -> Option<f64> {
        self.labels.get(circle).copied()
    }

    /*
    seed a radius before packing, for instance to pin the scale
    */
    pub fn set_label(&mut self, circle: usize, label: f64) -> Result<(), PackError> {
        if circle >= self.labels.len() {
            return Err(PackError::CircleOutOfRange(circle));
        }
        if !label.is_finite() || label <= 0.0 {
            return Err(PackError::NonPositiveLabel { circle, label });
        }
        self.labels[circle] = label;
        self.packing = false;
        Ok(())
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
        self.packing = false;
    }

    pub fn set_max_blocks(&mut self, max_blocks: usize) {
        self.max_blocks = max_blocks;
    }

    fn comes_full_circle(&self, circle: usize) -> bool {
        matches!(
            self.kinds[circle],
            PointKind::InteriorVertex | PointKind::InteriorEdge | PointKind::Barycentre
        )
    }

    /*
    angle sum at a circle over its fan of consecutive petals, closed
    up only where the fan comes full circle
    */
    fn angle_sum(&self, circle: usize) -> Result<f64, PackError> {
        let fan = &self.neighbours[circle];
        let r = self.labels[circle];
        let mut theta = 0.0;
        for (a, b) in fan.iter().tuple_windows() {
            theta += tangency_angle(r, self.labels[*a], self.labels[*b])?;
        }
        if self.comes_full_circle(circle) && fan.len() > 1 {
            theta += tangency_angle(r, self.labels[fan[0]], self.labels[fan[fan.len() - 1]])?;
        }
        Ok(theta)
    }

    fn target_sum(&self, circle: usize) -> f64 {
        match self.kinds[circle] {
            PointKind::BoundaryEdge | PointKind::GeneralizedBoundaryVertex => PI,
            PointKind::BoundaryVertex => {
                let k = self.boundary_vertices as f64;
                (k - 2.0) * PI / k
            }
            _ => 2.0 * PI,
        }
    }

    /*
    total deviation of the angle sums from their targets
    */
    fn distance(&self) -> Result<f64, PackError> {
        let mut deviation = 0.0;
        for circle in 0..self.labels.len() {
            deviation += (self.angle_sum(circle)? - self.target_sum(circle)).abs();
        }
        Ok(deviation)
    }

    /*
    uniform neighbour model: pretend all petals share one radius,
    solve for the radius that would meet the target exactly
    */
    fn relax(&mut self, circle: usize) -> Result<(), PackError> {
        let k = self.neighbours[circle].len() as f64;
        let theta = self.angle_sum(circle)?;
        let beta = (theta / (2.0 * k)).sin();
        let delta = (self.target_sum(circle) / (2.0 * k)).sin();
        let uniform = (beta / (1.0 - beta)) * self.labels[circle];
        self.labels[circle] = ((1.0 - delta) / delta) * uniform;
        Ok(())
    }

    /*
    Gauss-Seidel sweeps in blocks, holding circle 0 fixed as the
    overall scale, until the distance drops below the tolerance or
    the block budget runs out
    */
    pub fn make_packing(&mut self) -> Result<(), PackError> {
        for block in 0..=self.max_blocks {
            let deviation = self.distance()?;
            debug!("distance to packing after {} blocks: {}", block, deviation);
            if deviation < self.tolerance {
                self.packing = true;
                return Ok(());
            }
            if block == self.max_blocks {
                return Err(PackError::NotConverged {
                    blocks: block,
                    distance: deviation,
                });
            }
            for _ in 0..self.block_iterations {
                for circle in 1..self.labels.len() {
                    self.relax(circle)?;
                }
            }
        }
        Ok(())
    }

    /*
    centres for a packing label: anchor a boundary vertex at the
    origin with its first petal on the positive x axis, then keep
    sweeping, placing any circle with two consecutively placed petals
    */
    pub fn layout(&self) -> Result<Vec<(f64, f64)>, PackError> {
        if !self.packing {
            return Err(PackError::NotAPacking);
        }
        let size = self.labels.len();
        let mut coordinates = vec![(0.0, 0.0); size];
        let mut placed = vec![false; size];

        let seed = self
            .kinds
            .iter()
            .position(|kind| *kind == PointKind::BoundaryVertex)
            .ok_or(PackError::MissingBoundarySeed)?;
        coordinates[seed] = (0.0, 0.0);
        placed[seed] = true;
        let first = self.neighbours[seed][0];
        coordinates[first] = (self.labels[seed] + self.labels[first], 0.0);
        placed[first] = true;

        loop {
            let mut all_placed = true;
            let mut progress = false;
            for v in 0..size {
                if placed[v] {
                    continue;
                }
                all_placed = false;
                let fan = &self.neighbours[v];
                for pair in fan.windows(2) {
                    if placed[pair[0]] && placed[pair[1]] {
                        self.place_circle(v, pair[0], pair[1], &mut coordinates, &mut placed)?;
                        progress = true;
                        break;
                    }
                }
                if self.comes_full_circle(v)
                    && !placed[v]
                    && placed[fan[fan.len() - 1]]
                    && placed[fan[0]]
                {
                    self.place_circle(v, fan[fan.len() - 1], fan[0], &mut coordinates, &mut placed)?;
                    progress = true;
                }
            }
            if all_placed {
                return Ok(coordinates);
            }
            if !progress {
                return Err(PackError::Stalled {
                    placed: placed.iter().filter(|done| **done).count(),
                    total: size,
                });
            }
        }
    }

    /*
    place v tangent to u, rotated from the bearing of w by the
    tangency angle of the three radii
    */
    fn place_circle(
        &self,
        v: usize,
        u: usize,
        w: usize,
        coordinates: &mut [(f64, f64)],
        placed: &mut [bool],
    ) -> Result<(), PackError> {
        let r = self.labels[u];
        let r1 = self.labels[w];
        let r2 = self.labels[v];
        let bearing =
            (coordinates[w].1 - coordinates[u].1).atan2(coordinates[w].0 - coordinates[u].0);
        let alpha = tangency_angle(r, r1, r2)?;
        coordinates[v] = (
            coordinates[u].0 + (r + r2) * (alpha + bearing).cos(),
            coordinates[u].1 + (r + r2) * (alpha + bearing).sin(),
        );
        placed[v] = true;
        Ok(())
    }

    /*
    render the packed complex: the circles in light grey, the
    boundary walk in black, and the underlying graph edges in red
    with a dot at each vertex
    */
    pub fn draw<C: Canvas>(
        &self,
        coordinates: &[(f64, f64)],
        board: &mut C,
        with_circles: bool,
    ) -> Result<(), PackError> {
        let size = self.labels.len();
        if coordinates.len() != size {
            return Err(PackError::SizeMismatch {
                points: size,
                neighbours: coordinates.len(),
            });
        }

        if with_circles {
            board.set_pen_color(Color::grey(220));
            for circle in 0..size {
                board.draw_circle(
                    coordinates[circle].0,
                    coordinates[circle].1,
                    self.labels[circle],
                );
            }
        }

        board.set_pen_color(Color::grey(0));
        if let Some(start) = self
            .kinds
            .iter()
            .position(|kind| *kind == PointKind::BoundaryVertex)
        {
            let mut index = start;
            loop {
                let next = self.neighbours[index][0];
                board.draw_line(
                    coordinates[index].0,
                    coordinates[index].1,
                    coordinates[next].0,
                    coordinates[next].1,
                );
                index = next;
                if index == start {
                    break;
                }
            }
        }

        board.set_pen_color(Color::rgb(255, 0, 0));
        let barycentres = self
            .kinds
            .iter()
            .filter(|kind| **kind == PointKind::Barycentre)
            .count();
        for index in 0..size - barycentres {
            for &other in &self.neighbours[index] {
                if self.kinds[other] == PointKind::InteriorEdge {
                    board.draw_line(
                        coordinates[index].0,
                        coordinates[index].1,
                        coordinates[other].0,
                        coordinates[other].1,
                    );
                    board.fill_circle(coordinates[index].0, coordinates[index].1, 0.05);
                }
            }
        }
        Ok(())
    }
}

mod test {

    #[allow(dead_code)]
    fn wheel_packer() -> crate::circle_packing::CirclePacker {
        use crate::circle_packing::CirclePacker;
        use crate::combinatorial_map::CombinatorialMap;
        use crate::face_indexer::{configure, FaceIndexer};
        let g = CombinatorialMap::ring(3).unwrap();
        let threshold = g.dart_count();
        let wrapped = configure(&g, &[1, 1, 1]).unwrap();
        let indexer = FaceIndexer::new(wrapped, threshold).unwrap();
        CirclePacker::from_indexer(&indexer).unwrap()
    }

    #[test]
    fn initial_angle_sums_and_targets() {
        use crate::circle_packing::PI;
        let packer = wheel_packer();
        assert_eq!(packer.size(), 19);
        // all labels start at 1, so the interior vertex with its six
        // unit petals already meets the full angle
        assert!((packer.angle_sum(0).unwrap() - 2.0 * PI).abs() < 1e-12);
        assert!((packer.target_sum(0) - 2.0 * PI).abs() < 1e-12);
        // three boundary vertices make the corner target pi/3
        assert!((packer.target_sum(2) - PI / 3.0).abs() < 1e-12);
        // a generalized boundary vertex flattens to pi
        assert!((packer.target_sum(1) - PI).abs() < 1e-12);
    }

    #[test]
    fn tangency_angle_domain() {
        use crate::circle_packing::{tangency_angle, PackError};
        assert!((tangency_angle(1.0, 1.0, 1.0).unwrap() - std::f64::consts::FRAC_PI_3).abs() < 1e-12);
        assert!(matches!(
            tangency_angle(1.0, -1.0, 1.0),
            Err(PackError::Unrealizable { .. })
        ));
    }

    #[test]
    fn relaxation_reduces_the_distance() {
        let mut packer = wheel_packer();
        // short blocks, well clear of full convergence
        let mut previous = packer.distance().unwrap();
        assert!(previous > packer.tolerance);
        for _ in 0..3 {
            for _ in 0..20 {
                for circle in 1..packer.size() {
                    packer.relax(circle).unwrap();
                }
            }
            let current = packer.distance().unwrap();
            assert!(
                current < previous,
                "distance went from {} to {}",
                previous,
                current
            );
            previous = current;
        }
    }

    #[test]
    fn packing_and_layout_are_tangent() {
        let mut packer = wheel_packer();
        packer.set_tolerance(1e-6);
        packer.set_max_blocks(50);
        packer.make_packing().unwrap();
        assert!(packer.is_packing());
        let coordinates = packer.layout().unwrap();
        assert_eq!(coordinates.len(), 19);
        for circle in 0..packer.size() {
            for &petal in &packer.neighbours[circle] {
                let dx = coordinates[circle].0 - coordinates[petal].0;
                let dy = coordinates[circle].1 - coordinates[petal].1;
                let gap = (dx * dx + dy * dy).sqrt()
                    - (packer.labels[circle] + packer.labels[petal]);
                assert!(
                    gap.abs() < 1e-3,
                    "circles {} and {} are {} apart from tangency",
                    circle,
                    petal,
                    gap
                );
            }
        }
    }

    #[test]
    fn layout_needs_a_packing() {
        use crate::circle_packing::PackError;
        let packer = wheel_packer();
        assert_eq!(packer.layout(), Err(PackError::NotAPacking));
    }

    #[test]
    fn seeded_labels_reset_the_packing() {
        use crate::circle_packing::PackError;
        let mut packer = wheel_packer();
        packer.set_tolerance(1e-4);
        packer.make_packing().unwrap();
        packer.set_label(3, 2.0).unwrap();
        assert!(!packer.is_packing());
        assert_eq!(
            packer.set_label(3, 0.0),
            Err(PackError::NonPositiveLabel {
                circle: 3,
                label: 0.0
            })
        );
        assert_eq!(
            packer.set_label(99, 1.0),
            Err(PackError::CircleOutOfRange(99))
        );
    }

    #[test]
    fn broken_boundary_walk_is_rejected() {
        use crate::circle_packing::{CirclePacker, PackError};
        use crate::face_indexer::{IndexedPoint, PointKind};
        let points = vec![
            IndexedPoint {
                orbit: Some(0),
                kind: PointKind::BoundaryVertex,
            },
            IndexedPoint {
                orbit: Some(1),
                kind: PointKind::BoundaryEdge,
            },
            IndexedPoint {
                orbit: Some(2),
                kind: PointKind::BoundaryVertex,
            },
        ];
        let neighbours = vec![vec![1], vec![0], vec![1]];
        assert_eq!(
            CirclePacker::new(&points, neighbours),
            Err(PackError::BoundaryNotSimple {
                visited: 1,
                total: 2
            })
        );
    }

    #[test]
    fn disconnected_complex_is_rejected() {
        use crate::circle_packing::{CirclePacker, PackError};
        use crate::face_indexer::{IndexedPoint, PointKind};
        let points = vec![
            IndexedPoint {
                orbit: Some(0),
                kind: PointKind::InteriorVertex,
            },
            IndexedPoint {
                orbit: Some(1),
                kind: PointKind::InteriorVertex,
            },
            IndexedPoint {
                orbit: Some(2),
                kind: PointKind::InteriorVertex,
            },
            IndexedPoint {
                orbit: Some(3),
                kind: PointKind::InteriorVertex,
            },
        ];
        let neighbours = vec![vec![1], vec![0], vec![3], vec![2]];
        assert_eq!(
            CirclePacker::new(&points, neighbours),
            Err(PackError::Disconnected { components: 2 })
        );
    }

    #[test]
    fn drawing_covers_all_layers() {
        use crate::canvas::SvgCanvas;
        let mut packer = wheel_packer();
        packer.set_tolerance(1e-4);
        packer.make_packing().unwrap();
        let coordinates = packer.layout().unwrap();
        let mut board = SvgCanvas::new();
        packer.draw(&coordinates, &mut board, true).unwrap();
        let svg = board.to_svg();
        assert!(svg.contains("#dcdcdc"));
        assert!(svg.contains("#000000"));
        assert!(svg.contains("#ff0000"));
    }
}
