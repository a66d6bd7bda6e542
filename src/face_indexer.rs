use std::{collections::HashMap, collections::HashSet, error, fmt};

use either::Either::{self, Left, Right};
use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::combinatorial_map::{CombinatorialMap, Dart, MapError};
use crate::utils::{mark_orbit, orbit_min};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    EmptyMap,
    NotConfigured(Dart),
    ThresholdOutOfRange { threshold: usize, total: usize },
    Disconnected { components: usize },
    MissingBoundary,
    BoundaryListMismatch { expected: usize, got: usize },
    BrokenFan(usize),
    IsolatedPoint(usize),
    Map(MapError),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMap => write!(f, "cannot index an empty map"),
            Self::NotConfigured(dart) => {
                write!(f, "map not configured, dart {} has no pairing", dart)
            }
            Self::ThresholdOutOfRange { threshold, total } => {
                write!(f, "threshold {} out of range for {} darts", threshold, total)
            }
            Self::Disconnected { components } => {
                write!(f, "map splits into {} components", components)
            }
            Self::MissingBoundary => {
                write!(f, "configure needs a map with nonempty boundary")
            }
            Self::BoundaryListMismatch { expected, got } => {
                write!(
                    f,
                    "boundary subdivision list has {} entries for {} boundary darts",
                    got, expected
                )
            }
            Self::BrokenFan(point) => {
                write!(f, "neighbour fan around point {} does not chain up", point)
            }
            Self::IsolatedPoint(point) => {
                write!(f, "point {} lies on no face", point)
            }
            Self::Map(inner) => write!(f, "{}", inner),
        }
    }
}
impl error::Error for IndexError {}

impl From<MapError> for IndexError {
    fn from(inner: MapError) -> Self {
        Self::Map(inner)
    }
}

/*
Classification of the points of the barycentric subdivision.
Vertices and edges are rotation and pairing orbits; barycentres stand
for whole faces.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    InteriorVertex,
    GeneralizedBoundaryVertex,
    BoundaryVertex,
    InteriorEdge,
    BoundaryEdge,
    Barycentre,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPoint {
    pub orbit: Option<Dart>,
    pub kind: PointKind,
}

/*
An indexed map: every rotation orbit, pairing orbit and face of a
configured map gets one point, classified against the threshold that
separates the original darts from the ones configure added.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceIndexer {
    rotation: Vec<usize>,
    pairing: Vec<usize>,
    threshold: usize,
    points: Vec<IndexedPoint>,
    faces: Vec<Vec<usize>>,
}

/*
Wrap a map with nonempty boundary in an explicit outer ring.
Each boundary dart grows a spoke to a fresh generalized boundary
vertex, and boundary[i] subdivision vertices are threaded in between
consecutive ones. The result has no boundary darts left, so it can be
indexed with the old dart count as threshold.
*/
pub fn configure(
    map: &CombinatorialMap,
    boundary: &[usize],
) -> Result<CombinatorialMap, IndexError> {
    let b = map.boundary_count();
    if b == 0 {
        return Err(IndexError::MissingBoundary);
    }
    if boundary.len() != b {
        return Err(IndexError::BoundaryListMismatch {
            expected: b,
            got: boundary.len(),
        });
    }
    let old_total = map.dart_count();
    let subdivisions: usize = boundary.iter().sum();
    let total = old_total + 3 * b + 2 * subdivisions;
    let mut rotation = vec![0; total];
    let mut pairing: Vec<Option<Dart>> = vec![None; total];
    rotation[..old_total].copy_from_slice(map.rotation_map());
    pairing[..old_total].clone_from_slice(map.pairing_map());

    // spoke from boundary dart 0 into the first generalized boundary vertex
    pairing[0] = Some(old_total);
    pairing[old_total] = Some(0);
    rotation[old_total] = old_total + 1;
    rotation[old_total + 1] = old_total + 2;
    let mut n = old_total + 2;
    rotation[n] = old_total;

    for (i, &count) in boundary.iter().enumerate() {
        for _ in 0..count {
            // a subdivision edge followed by its boundary vertex
            pairing[n] = Some(n + 1);
            pairing[n + 1] = Some(n);
            n += 1;
            rotation[n] = n + 1;
            rotation[n + 1] = n;
            n += 1;
        }
        if i == b - 1 {
            break;
        }
        // edge over to the next generalized boundary vertex
        pairing[n] = Some(n + 1);
        pairing[n + 1] = Some(n);
        n += 1;
        rotation[n] = n + 1;
        n += 1;
    }

    // tie the ring back into the first generalized boundary vertex
    pairing[n] = Some(old_total + 1);
    pairing[old_total + 1] = Some(n);
    n += 1;

    // close the remaining generalized boundary vertices and their spokes
    let mut aux = old_total + 2;
    for (i, &count) in boundary.iter().enumerate().take(b - 1) {
        aux += 2 * count + 2;
        rotation[aux] = n;
        rotation[n] = aux - 1;
        pairing[n] = Some(i + 1);
        pairing[i + 1] = Some(n);
        n += 1;
    }

    Ok(CombinatorialMap::from_raw(
        0,
        total,
        HashSet::new(),
        rotation,
        pairing,
    )?)
}

impl FaceIndexer {
    pub fn new(map: CombinatorialMap, threshold: usize) -> Result<Self, IndexError> {
        let total = map.dart_count();
        if total == 0 {
            return Err(IndexError::EmptyMap);
        }
        if map.boundary_count() != 0 {
            return Err(IndexError::NotConfigured(0));
        }
        if threshold == 0 || threshold >= total {
            return Err(IndexError::ThresholdOutOfRange { threshold, total });
        }
        let rotation = map.rotation_map().to_vec();
        let mut pairing = Vec::with_capacity(total);
        for (dart, entry) in map.pairing_map().iter().enumerate() {
            match entry {
                Some(partner) => pairing.push(*partner),
                None => return Err(IndexError::NotConfigured(dart)),
            }
        }

        let mut components = QuickUnionUf::<UnionBySize>::new(total);
        for dart in 0..total {
            components.union(dart, rotation[dart]);
            components.union(dart, pairing[dart]);
        }
        let roots: HashSet<usize> = (0..total).map(|dart| components.find(dart)).collect();
        if roots.len() > 1 {
            return Err(IndexError::Disconnected {
                components: roots.len(),
            });
        }

        let mut indexer = Self {
            rotation,
            pairing,
            threshold,
            points: Vec::new(),
            faces: Vec::new(),
        };
        let vertex_point = indexer.index_vertices();
        let edge_point = indexer.index_edges();
        indexer.index_faces(&vertex_point, &edge_point)?;
        Ok(indexer)
    }

    pub fn points(&self) -> &[IndexedPoint] {
        &self.points
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /*
    walk the rotation orbit looking for a dart whose partner lies
    below the threshold; where the walk stops decides the vertex kind
    */
    fn vertex_kind(&self, start: Dart) -> PointKind {
        let mut point = start;
        loop {
            if self.pairing[point] < self.threshold {
                break;
            }
            point = self.rotation[point];
            if point == start {
                break;
            }
        }
        if point < self.threshold {
            PointKind::InteriorVertex
        } else if self.pairing[point] < self.threshold {
            PointKind::GeneralizedBoundaryVertex
        } else {
            PointKind::BoundaryVertex
        }
    }

    fn index_vertices(&mut self) -> HashMap<Dart, usize> {
        let total = self.rotation.len();
        let mut vertex_point = HashMap::new();
        let mut seen = vec![false; total];
        for dart in 0..total {
            if seen[dart] {
                continue;
            }
            // ascending scan, so dart is the least in its orbit
            let kind = self.vertex_kind(dart);
            vertex_point.insert(dart, self.points.len());
            self.points.push(IndexedPoint {
                orbit: Some(dart),
                kind,
            });
            mark_orbit(&self.rotation, dart, &mut seen);
        }
        vertex_point
    }

    fn index_edges(&mut self) -> HashMap<Dart, usize> {
        let total = self.pairing.len();
        let mut edge_point = HashMap::new();
        let mut seen = vec![false; total];
        for dart in 0..total {
            if seen[dart] {
                continue;
            }
            let kind = if dart < self.threshold {
                PointKind::InteriorEdge
            } else {
                PointKind::BoundaryEdge
            };
            edge_point.insert(dart, self.points.len());
            self.points.push(IndexedPoint {
                orbit: Some(dart),
                kind,
            });
            mark_orbit(&self.pairing, dart, &mut seen);
        }
        edge_point
    }

    /*
    trace every face except the outer one, which is the orbit of the
    rotation image of the threshold dart and gets skipped up front
    each trace alternates rotation (recording the vertex) and pairing
    (recording the edge) until it returns to its seed
    */
    fn index_faces(
        &mut self,
        vertex_point: &HashMap<Dart, usize>,
        edge_point: &HashMap<Dart, usize>,
    ) -> Result<(), IndexError> {
        let total = self.rotation.len();
        let mut in_face = vec![false; total];

        let outer_start = self.rotation[self.threshold];
        let mut point = outer_start;
        loop {
            in_face[point] = true;
            point = self.pairing[self.rotation[point]];
            if point == outer_start {
                break;
            }
        }

        for seed in 0..total {
            if in_face[seed] {
                continue;
            }
            let mut face = Vec::new();
            let mut point = seed;
            loop {
                in_face[point] = true;
                let vertex_orbit = orbit_min(&self.rotation, point);
                face.push(self.point_index(Left(vertex_orbit), vertex_point, edge_point)?);
                point = self.rotation[point];
                let edge_orbit = point.min(self.pairing[point]);
                face.push(self.point_index(Right(edge_orbit), vertex_point, edge_point)?);
                point = self.pairing[point];
                if point == seed {
                    break;
                }
            }
            self.faces.push(face);
            self.points.push(IndexedPoint {
                orbit: None,
                kind: PointKind::Barycentre,
            });
        }
        Ok(())
    }

    fn point_index(
        &self,
        orbit: Either<Dart, Dart>,
        vertex_point: &HashMap<Dart, usize>,
        edge_point: &HashMap<Dart, usize>,
    ) -> Result<usize, IndexError> {
        let found = match orbit {
            Left(vertex) => vertex_point.get(&vertex),
            Right(edge) => edge_point.get(&edge),
        };
        found
            .copied()
            .ok_or_else(|| IndexError::IsolatedPoint(orbit.into_inner()))
    }

    /*
    cyclic neighbour lists for every point, counterclockwise
    a barycentre inherits its face; everything else chains the
    (successor, barycentre, predecessor) triples of the faces it lies
    on, and boundary-like points keep the dangling predecessor at the
    end since their fan cannot come full circle
    */
    pub fn all_neighbours(&self) -> Result<Vec<Vec<usize>>, IndexError> {
        let face_count = self.faces.len();
        let barycentre_base = self.points.len() - face_count;
        let mut neighbours = vec![Vec::new(); self.points.len()];
        for (f, face) in self.faces.iter().enumerate() {
            neighbours[barycentre_base + f] = face.clone();
        }
        for point in 0..barycentre_base {
            neighbours[point] = self.fan_around(point, barycentre_base)?;
        }
        Ok(neighbours)
    }

    fn fan_around(&self, point: usize, barycentre_base: usize) -> Result<Vec<usize>, IndexError> {
        let mut triples = Vec::new();
        for (f, face) in self.faces.iter().enumerate() {
            if let Some(at) = face.iter().position(|&entry| entry == point) {
                let successor = face[(at + 1) % face.len()];
                let predecessor = face[(at + face.len() - 1) % face.len()];
                triples.push((successor, barycentre_base + f, predecessor));
            }
        }
        if triples.is_empty() {
            return Err(IndexError::IsolatedPoint(point));
        }

        let mut order = vec![0usize];
        while order.len() < triples.len() {
            let current = order[order.len() - 1];
            let target = triples[current].2;
            let next = (0..triples.len()).find(|j| !order.contains(j) && triples[*j].0 == target);
            match next {
                Some(j) => order.push(j),
                None => {
                    // a generalized boundary vertex bordering the outer
                    // face yields exactly two triples in reverse order
                    if triples.len() == 2 && order.len() == 1 {
                        order = vec![1, 0];
                    } else {
                        return Err(IndexError::BrokenFan(point));
                    }
                }
            }
        }

        let kind = self.points[point].kind;
        let comes_full_circle =
            matches!(kind, PointKind::InteriorVertex | PointKind::InteriorEdge);
        let mut fan = Vec::with_capacity(2 * triples.len() + 1);
        for &slot in &order {
            fan.push(triples[slot].0);
            fan.push(triples[slot].1);
        }
        if !comes_full_circle {
            fan.push(triples[order[order.len() - 1]].2);
        }
        Ok(fan)
    }
}

mod test {

    #[test]
    fn configure_wraps_a_triangle() {
        use crate::combinatorial_map::CombinatorialMap;
        use crate::face_indexer::configure;
        let g = CombinatorialMap::ring(3).unwrap();
        let wrapped = configure(&g, &[1, 1, 1]).unwrap();
        assert_eq!(wrapped.boundary_count(), 0);
        assert_eq!(wrapped.dart_count(), 18);
        assert!(wrapped.check_maps().is_ok());
        // spokes from the original boundary darts
        assert_eq!(wrapped.pairing_map()[0], Some(3));
        assert_eq!(wrapped.pairing_map()[1], Some(16));
        assert_eq!(wrapped.pairing_map()[2], Some(17));
        // first generalized boundary vertex and a subdivision vertex
        assert_eq!(wrapped.rotation_map()[3], 4);
        assert_eq!(wrapped.rotation_map()[4], 5);
        assert_eq!(wrapped.rotation_map()[5], 3);
        assert_eq!(wrapped.rotation_map()[6], 7);
        assert_eq!(wrapped.rotation_map()[7], 6);
        assert_eq!(wrapped.pairing_map()[5], Some(6));
        assert_eq!(wrapped.pairing_map()[4], Some(15));
    }

    #[test]
    fn configure_rejects_bad_input() {
        use crate::combinatorial_map::CombinatorialMap;
        use crate::face_indexer::{configure, IndexError};
        let g = CombinatorialMap::ring(3).unwrap();
        assert_eq!(
            configure(&g, &[1, 1]),
            Err(IndexError::BoundaryListMismatch {
                expected: 3,
                got: 2
            })
        );
        let mut closed = CombinatorialMap::ring(3).unwrap();
        closed.closure().unwrap();
        assert_eq!(configure(&closed, &[]), Err(IndexError::MissingBoundary));
    }

    #[test]
    fn triangle_points_and_faces() {
        use crate::combinatorial_map::CombinatorialMap;
        use crate::face_indexer::{configure, FaceIndexer, PointKind};
        let g = CombinatorialMap::ring(3).unwrap();
        let threshold = g.dart_count();
        let wrapped = configure(&g, &[1, 1, 1]).unwrap();
        let indexer = FaceIndexer::new(wrapped, threshold).unwrap();
        assert_eq!(indexer.point_count(), 19);

        let count_of = |kind: PointKind| {
            indexer
                .points()
                .iter()
                .filter(|point| point.kind == kind)
                .count()
        };
        assert_eq!(count_of(PointKind::InteriorVertex), 1);
        assert_eq!(count_of(PointKind::GeneralizedBoundaryVertex), 3);
        assert_eq!(count_of(PointKind::BoundaryVertex), 3);
        assert_eq!(count_of(PointKind::InteriorEdge), 3);
        assert_eq!(count_of(PointKind::BoundaryEdge), 6);
        assert_eq!(count_of(PointKind::Barycentre), 3);

        assert_eq!(indexer.points()[0].kind, PointKind::InteriorVertex);
        assert_eq!(indexer.points()[0].orbit, Some(0));
        assert_eq!(indexer.points()[1].kind, PointKind::GeneralizedBoundaryVertex);
        assert_eq!(indexer.points()[1].orbit, Some(3));
        assert_eq!(indexer.points()[2].kind, PointKind::BoundaryVertex);
        assert_eq!(indexer.points()[2].orbit, Some(6));
        assert_eq!(indexer.points()[7].kind, PointKind::InteriorEdge);
        assert_eq!(indexer.points()[7].orbit, Some(0));
        assert_eq!(indexer.points()[10].kind, PointKind::BoundaryEdge);
        assert_eq!(indexer.points()[10].orbit, Some(4));
        assert_eq!(indexer.points()[18].kind, PointKind::Barycentre);

        assert_eq!(
            indexer.faces(),
            &[
                vec![0, 8, 3, 12, 2, 11, 1, 7],
                vec![0, 9, 5, 14, 4, 13, 3, 8],
                vec![0, 7, 1, 10, 6, 15, 5, 9],
            ]
        );
    }

    #[test]
    fn triangle_neighbour_fans() {
        use crate::combinatorial_map::CombinatorialMap;
        use crate::face_indexer::{configure, FaceIndexer};
        let g = CombinatorialMap::ring(3).unwrap();
        let threshold = g.dart_count();
        let wrapped = configure(&g, &[1, 1, 1]).unwrap();
        let indexer = FaceIndexer::new(wrapped, threshold).unwrap();
        let neighbours = indexer.all_neighbours().unwrap();

        // the interior vertex comes full circle through all three faces
        assert_eq!(neighbours[0], vec![8, 16, 7, 18, 9, 17]);
        // generalized boundary vertices keep a trailing predecessor,
        // including the reversed pair bordering the outer face
        assert_eq!(neighbours[1], vec![10, 18, 7, 16, 11]);
        assert_eq!(neighbours[3], vec![12, 16, 8, 17, 13]);
        assert_eq!(neighbours[5], vec![14, 17, 9, 18, 15]);
        // boundary vertices and edges see a single face
        assert_eq!(neighbours[2], vec![11, 16, 12]);
        assert_eq!(neighbours[4], vec![13, 17, 14]);
        assert_eq!(neighbours[6], vec![15, 18, 10]);
        assert_eq!(neighbours[11], vec![1, 16, 2]);
        // interior edges close up between their two faces
        assert_eq!(neighbours[7], vec![0, 16, 1, 18]);
        assert_eq!(neighbours[8], vec![3, 16, 0, 17]);
        assert_eq!(neighbours[9], vec![5, 17, 0, 18]);
        // barycentres inherit their face
        assert_eq!(neighbours[16], vec![0, 8, 3, 12, 2, 11, 1, 7]);
        assert_eq!(neighbours[18], vec![0, 7, 1, 10, 6, 15, 5, 9]);
    }

    #[test]
    fn indexer_rejects_bad_input() {
        use crate::combinatorial_map::CombinatorialMap;
        use crate::face_indexer::{configure, FaceIndexer, IndexError};
        let unconfigured = CombinatorialMap::ring(3).unwrap();
        assert!(matches!(
            FaceIndexer::new(unconfigured, 3),
            Err(IndexError::NotConfigured(_))
        ));
        let g = CombinatorialMap::ring(3).unwrap();
        let wrapped = configure(&g, &[1, 1, 1]).unwrap();
        assert_eq!(
            FaceIndexer::new(wrapped.clone(), 0),
            Err(IndexError::ThresholdOutOfRange {
                threshold: 0,
                total: 18
            })
        );
        assert_eq!(
            FaceIndexer::new(wrapped, 18),
            Err(IndexError::ThresholdOutOfRange {
                threshold: 18,
                total: 18
            })
        );
    }
}
