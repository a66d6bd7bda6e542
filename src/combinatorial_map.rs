use std::{collections::HashSet, error, fmt, fs};

use itertools::Itertools;
use log::warn;
use permutations::Permutation;

pub type Dart = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    TooFewSides(usize),
    RotationOutOfRange { k: usize, boundary: usize },
    GlueOutOfRange { n: usize, boundary: usize, other_boundary: usize },
    ClosureOnClosed,
    RemoveOutOfRange { x: Dart, y: Dart, total: usize },
    PairedOnBoundary(Dart),
    UnpairedInterior(Dart),
    NotInvolutive(Dart),
    RotationNotBijective(Dart),
    ActiveOutOfRange(Dart),
    SizeMismatch { expected: usize, rotation: usize, pairing: usize },
    BadPermutation,
    Parse(String),
    Io(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSides(n) => {
                write!(f, "a generator needs at least 3 sides, got {}", n)
            }
            Self::RotationOutOfRange { k, boundary } => {
                write!(f, "rotate({}) called with boundary size {}", k, boundary)
            }
            Self::GlueOutOfRange {
                n,
                boundary,
                other_boundary,
            } => {
                write!(
                    f,
                    "glue at {} points exceeds boundary sizes {} and {}",
                    n, boundary, other_boundary
                )
            }
            Self::ClosureOnClosed => {
                write!(f, "closure called on a map with empty boundary")
            }
            Self::RemoveOutOfRange { x, y, total } => {
                write!(f, "cannot remove darts {} and {} from a map on {}", x, y, total)
            }
            Self::PairedOnBoundary(dart) => {
                write!(f, "pairing defined on boundary dart {}", dart)
            }
            Self::UnpairedInterior(dart) => {
                write!(f, "pairing undefined on interior dart {}", dart)
            }
            Self::NotInvolutive(dart) => {
                write!(f, "pairing fails to be an involution at dart {}", dart)
            }
            Self::RotationNotBijective(dart) => {
                write!(f, "rotation fails to be a bijection at dart {}", dart)
            }
            Self::ActiveOutOfRange(dart) => {
                write!(f, "active dart {} is out of range", dart)
            }
            Self::SizeMismatch {
                expected,
                rotation,
                pairing,
            } => {
                write!(
                    f,
                    "expected {} darts but rotation has {} and pairing has {}",
                    expected, rotation, pairing
                )
            }
            Self::BadPermutation => {
                write!(f, "relabeling slice is not a permutation")
            }
            Self::Parse(explanation) => {
                write!(f, "ill-formed textual map: {}", explanation)
            }
            Self::Io(explanation) => {
                write!(f, "{}", explanation)
            }
        }
    }
}
impl error::Error for MapError {}

/*
A combinatorial map on darts 0..boundary+interior.
Darts below boundary are free boundary points, the rest carry the
edge pairing. rotation is a bijection of all darts, pairing an
involution defined exactly on the interior darts. active holds the
darts still eligible for bigon reduction.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinatorialMap {
    boundary: usize,
    interior: usize,
    rotation: Vec<usize>,
    pairing: Vec<Option<Dart>>,
    active: HashSet<Dart>,
}

impl CombinatorialMap {
    /*
    the n-gon with a doubled interior frame
    boundary spokes 0..n, frame darts n..3n paired up along the polygon
    */
    pub fn polygon(n: usize) -> Result<Self, MapError> {
        if n < 3 {
            return Err(MapError::TooFewSides(n));
        }
        let total = 3 * n;
        let mut rotation = vec![0; total];
        let mut pairing = vec![None; total];
        for i in 0..n {
            rotation[i] = n + i;
            rotation[n + i] = 2 * n + i;
            rotation[2 * n + i] = i;
        }
        for i in 0..n - 1 {
            pairing[n + i] = Some(2 * n + i + 1);
            pairing[2 * n + i + 1] = Some(n + i);
        }
        pairing[2 * n - 1] = Some(2 * n);
        pairing[2 * n] = Some(2 * n - 1);
        Ok(Self {
            boundary: n,
            interior: 2 * n,
            rotation,
            pairing,
            active: HashSet::new(),
        })
    }

    /*
    the bare boundary n-cycle, no interior darts at all
    */
    pub fn ring(n: usize) -> Result<Self, MapError> {
        if n < 3 {
            return Err(MapError::TooFewSides(n));
        }
        let rotation = (0..n).map(|i| (i + 1) % n).collect();
        Ok(Self {
            boundary: n,
            interior: 0,
            rotation,
            pairing: vec![None; n],
            active: HashSet::new(),
        })
    }

    pub fn from_raw(
        boundary: usize,
        interior: usize,
        active: HashSet<Dart>,
        rotation: Vec<usize>,
        pairing: Vec<Option<Dart>>,
    ) -> Result<Self, MapError> {
        let map = Self {
            boundary,
            interior,
            rotation,
            pairing,
            active,
        };
        map.check_maps()?;
        Ok(map)
    }

    pub fn boundary_count(&self) -> usize {
        self.boundary
    }

    pub fn interior_count(&self) -> usize {
        self.interior
    }

    pub fn dart_count(&self) -> usize {
        self.boundary + self.interior
    }

    pub fn active_darts(&self) -> &HashSet<Dart> {
        &self.active
    }

    pub fn rotation_map(&self) -> &[usize] {
        &self.rotation
    }

    pub fn pairing_map(&self) -> &[Option<Dart>] {
        &self.pairing
    }

    /*
    relabel every dart through p, conjugating rotation and pairing
    the one primitive all the surgery operations funnel through
    */
    pub fn renumber(&mut self, p: &Permutation) {
        let total = self.dart_count();
        let mut new_rotation = vec![0; total];
        let mut new_pairing = vec![None; total];
        for i in 0..total {
            new_rotation[p.apply(i)] = p.apply(self.rotation[i]);
            new_pairing[p.apply(i)] = self.pairing[i].map(|j| p.apply(j));
        }
        self.rotation = new_rotation;
        self.pairing = new_pairing;
        self.active = self.active.iter().map(|&i| p.apply(i)).collect();
    }

    /*
    cyclically relabel the boundary darts by k steps
    */
    pub fn rotate(&mut self, k: usize) -> Result<(), MapError> {
        if k == 0 || k >= self.boundary {
            return Err(MapError::RotationOutOfRange {
                k,
                boundary: self.boundary,
            });
        }
        let total = self.dart_count();
        let mut image = vec![0; total];
        for i in 0..k {
            image[i] = self.boundary - k + i;
        }
        for i in 0..(self.boundary - k) {
            image[k + i] = i;
        }
        for (i, slot) in image.iter_mut().enumerate().take(total).skip(self.boundary) {
            *slot = i;
        }
        let p = Permutation::try_from(image).map_err(|_| MapError::BadPermutation)?;
        self.renumber(&p);
        Ok(())
    }

    /*
    glue n consecutive boundary darts of other onto the last n
    boundary darts of self, creating 2n fresh seam darts which are
    added to the active set, then renumber everything back into the
    boundary-first layout
    */
    pub fn glue(&mut self, other: &Self, n: usize) -> Result<(), MapError> {
        if n == 0 || n > self.boundary || n > other.boundary {
            return Err(MapError::GlueOutOfRange {
                n,
                boundary: self.boundary,
                other_boundary: other.boundary,
            });
        }
        let b = self.boundary;
        let old_total = self.dart_count();
        let other_total = other.dart_count();
        let new_boundary = b + other.boundary - 2 * n;
        let new_interior = self.interior + other.interior + 4 * n;
        let new_total = new_boundary + new_interior;
        let seam = old_total + other_total;

        self.rotation.resize(new_total, 0);
        self.pairing.resize(new_total, None);

        for i in 0..other_total {
            self.rotation[old_total + i] = old_total + other.rotation[i];
            self.pairing[old_total + i] = other.pairing[i].map(|j| old_total + j);
        }

        for i in 0..n {
            self.pairing[b - n + i] = Some(seam + i);
            self.pairing[seam + i] = Some(b - n + i);
            self.pairing[old_total + n - i - 1] = Some(seam + n + i);
            self.pairing[seam + n + i] = Some(old_total + n - i - 1);
            self.rotation[seam + i] = seam + n + i;
            self.rotation[seam + n + i] = seam + i;
        }

        for &dart in &other.active {
            self.active.insert(dart + old_total);
        }
        for dart in seam..seam + 2 * n {
            self.active.insert(dart);
        }

        let mut image = vec![0; new_total];
        for (i, slot) in image.iter_mut().enumerate().take(b - n) {
            *slot = i;
        }
        for i in 0..(other.boundary - n) {
            image[old_total + n + i] = b - n + i;
        }
        for i in 0..self.interior {
            image[b + i] = new_boundary + i;
        }
        for i in 0..other.interior {
            image[old_total + other.boundary + i] = old_total + other.boundary - 2 * n + i;
        }
        for i in 0..n {
            image[b - n + i] = seam - 2 * n + i;
            image[old_total + i] = seam - n + i;
        }
        for (i, slot) in image.iter_mut().enumerate().take(seam + 2 * n).skip(seam) {
            *slot = i;
        }

        self.boundary = new_boundary;
        self.interior = new_interior;
        let p = Permutation::try_from(image).map_err(|_| MapError::BadPermutation)?;
        self.renumber(&p);
        Ok(())
    }

    /*
    boundary-seeded isomorphism test
    the identity on the boundary is forced, so propagate it through
    rotation and pairing over every dart and look for a clash
    */
    pub fn isomorphic(&self, other: &Self) -> bool {
        if self.boundary == 0 {
            warn!("isomorphism test needs a nonempty boundary");
            return false;
        }
        if self.boundary != other.boundary
            || self.interior != other.interior
            || self.active.len() != other.active.len()
        {
            return false;
        }
        let total = self.dart_count();
        for i in 0..self.boundary {
            if self.rotation[i] < self.boundary && self.rotation[i] != other.rotation[i] {
                return false;
            }
        }
        let mut image: Vec<Option<usize>> = vec![None; total];
        for (i, slot) in image.iter_mut().enumerate().take(self.boundary) {
            *slot = Some(i);
        }
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..total {
                let mapped = match image[i] {
                    Some(m) => m,
                    None => continue,
                };
                let rotation_target = other.rotation[mapped];
                match image[self.rotation[i]] {
                    Some(existing) => {
                        if existing != rotation_target {
                            return false;
                        }
                    }
                    None => {
                        image[self.rotation[i]] = Some(rotation_target);
                        changed = true;
                    }
                }
                if let Some(paired) = self.pairing[i] {
                    let pairing_target = match other.pairing[mapped] {
                        Some(t) => t,
                        None => return false,
                    };
                    match image[paired] {
                        Some(existing) => {
                            if existing != pairing_target {
                                return false;
                            }
                        }
                        None => {
                            image[paired] = Some(pairing_target);
                            changed = true;
                        }
                    }
                }
            }
        }
        true
    }

    /*
    bigon reduction until no active dart can be reduced
    an active dart x with rotation image y and pairing partner z is
    reducible unless y == z (a closed loop); the boundary and interior
    cases splice the surrounding maps differently before the pair is
    removed, and the scan restarts because remove_points relabels
    */
    pub fn normal_form(&mut self) -> Result<(), MapError> {
        loop {
            let mut reduced = false;
            for x in self.active.iter().copied().sorted() {
                if x < self.boundary {
                    continue;
                }
                let y = self.rotation[x];
                let z = match self.pairing[x] {
                    Some(z) => z,
                    None => continue,
                };
                if y == z {
                    continue;
                }
                if !self.active.contains(&y) {
                    warn!("rotation image {} of active dart {} is not active", y, x);
                }
                if y < self.boundary {
                    let mut t = self.rotation[z];
                    while self.rotation[t] != z {
                        t = self.rotation[t];
                    }
                    self.rotation[t] = y;
                    self.rotation[y] = self.rotation[z];
                    self.remove_points(x, z)?;
                } else {
                    let w = match self.pairing[y] {
                        Some(w) => w,
                        None => return Err(MapError::UnpairedInterior(y)),
                    };
                    self.pairing[z] = Some(w);
                    self.pairing[w] = Some(z);
                    self.remove_points(x, y)?;
                }
                reduced = true;
                break;
            }
            if !reduced {
                return Ok(());
            }
        }
    }

    /*
    drop every active loop, a dart whose rotation image is its own
    pairing partner
    */
    pub fn remove_loops(&mut self) -> Result<(), MapError> {
        loop {
            let candidate = self.active.iter().copied().sorted().find(|&x| {
                x >= self.boundary && self.pairing[x] == Some(self.rotation[x])
            });
            match candidate {
                Some(x) => {
                    let y = self.rotation[x];
                    warn!("removing loop at darts {} and {}", x, y);
                    self.remove_points(x, y)?;
                }
                None => return Ok(()),
            }
        }
    }

    /*
    eliminate the boundary by pairing each boundary dart against a
    shifted copy of the whole map through a fresh tripled frame
    */
    pub fn closure(&mut self) -> Result<(), MapError> {
        if self.boundary == 0 {
            return Err(MapError::ClosureOnClosed);
        }
        let b = self.boundary;
        let old_total = self.dart_count();
        let shift = 3 * b;
        let new_total = shift + old_total;
        let old_rotation = std::mem::take(&mut self.rotation);
        let old_pairing = std::mem::take(&mut self.pairing);
        let mut rotation = vec![0; new_total];
        let mut pairing = vec![None; new_total];
        for i in 0..old_total {
            rotation[shift + i] = shift + old_rotation[i];
            pairing[shift + i] = old_pairing[i].map(|j| shift + j);
        }
        for i in 0..b {
            pairing[shift + i] = Some(i);
            pairing[i] = Some(shift + i);
            rotation[i] = b + i;
            rotation[b + i] = 2 * b + i;
            rotation[2 * b + i] = i;
        }
        for i in 0..b - 1 {
            pairing[b + i] = Some(2 * b + i + 1);
            pairing[2 * b + i + 1] = Some(b + i);
        }
        pairing[2 * b - 1] = Some(2 * b);
        pairing[2 * b] = Some(2 * b - 1);
        self.rotation = rotation;
        self.pairing = pairing;
        self.interior += 4 * b;
        self.boundary = 0;
        self.active = self.active.iter().map(|&dart| dart + shift).collect();
        Ok(())
    }

    /*
    remove the matched pair x, y: push both to the top through the
    standard two-slot permutation, then truncate
    callers must have already spliced rotation and pairing around the
    pair or the remaining maps dangle
    */
    pub fn remove_points(&mut self, x: Dart, y: Dart) -> Result<(), MapError> {
        let total = self.dart_count();
        if x >= total || y >= total || x == y {
            return Err(MapError::RemoveOutOfRange { x, y, total });
        }
        self.active.remove(&x);
        self.active.remove(&y);
        let (low, high) = if x <= y { (x, y) } else { (y, x) };
        let mut image = vec![0; total];
        for (i, slot) in image.iter_mut().enumerate().take(low) {
            *slot = i;
        }
        for i in (low + 1)..high {
            image[i] = i - 1;
        }
        for i in (high + 1)..total {
            image[i] = i - 2;
        }
        image[low] = total - 2;
        image[high] = total - 1;
        let p = Permutation::try_from(image).map_err(|_| MapError::BadPermutation)?;
        self.renumber(&p);
        self.rotation.truncate(total - 2);
        self.pairing.truncate(total - 2);
        self.interior -= 2;
        Ok(())
    }

    /*
    invariant validation: pairing undefined exactly on the boundary
    and an involution elsewhere, rotation a bijection, active darts in
    range
    the active set drifting out of closure under rotation is only
    worth a warning
    */
    pub fn check_maps(&self) -> Result<(), MapError> {
        let total = self.dart_count();
        if self.rotation.len() != total || self.pairing.len() != total {
            return Err(MapError::SizeMismatch {
                expected: total,
                rotation: self.rotation.len(),
                pairing: self.pairing.len(),
            });
        }
        for i in 0..self.boundary {
            if self.pairing[i].is_some() {
                return Err(MapError::PairedOnBoundary(i));
            }
        }
        for i in self.boundary..total {
            match self.pairing[i] {
                None => return Err(MapError::UnpairedInterior(i)),
                Some(j) => {
                    if j >= total || self.pairing[j] != Some(i) {
                        return Err(MapError::NotInvolutive(i));
                    }
                }
            }
        }
        let mut seen = vec![false; total];
        for i in 0..total {
            let image = self.rotation[i];
            if image >= total || seen[image] {
                return Err(MapError::RotationNotBijective(i));
            }
            seen[image] = true;
        }
        for &dart in &self.active {
            if dart >= total {
                return Err(MapError::ActiveOutOfRange(dart));
            }
        }
        for &dart in &self.active {
            if !self.active.contains(&self.rotation[dart]) {
                warn!("active set not closed under rotation at dart {}", dart);
            }
        }
        Ok(())
    }

    /*
    textual format:
    line 1 holds boundary size, interior size and the active count,
    line 2 the active darts ascending, then rotation, then pairing
    with -1 for undefined
    */
    pub fn to_text(&self) -> String {
        let active_line = self.active.iter().sorted().join(" ");
        let rotation_line = self.rotation.iter().join(" ");
        let pairing_line = self
            .pairing
            .iter()
            .map(|entry| match entry {
                Some(j) => j.to_string(),
                None => "-1".to_string(),
            })
            .join(" ");
        format!(
            "{} {} {}\n{}\n{}\n{}\n",
            self.boundary,
            self.interior,
            self.active.len(),
            active_line,
            rotation_line,
            pairing_line
        )
    }

    pub fn from_text(text: &str) -> Result<Self, MapError> {
        let mut tokens = text.split_whitespace();
        let boundary = take_number(&mut tokens)?;
        let interior = take_number(&mut tokens)?;
        let active_count = take_number(&mut tokens)?;
        if boundary < 0 || interior < 0 || active_count < 0 {
            return Err(MapError::Parse("negative size".to_string()));
        }
        let total = (boundary + interior) as usize;
        let mut active = HashSet::new();
        for _ in 0..active_count {
            let dart = take_number(&mut tokens)?;
            if dart < 0 {
                return Err(MapError::Parse("negative active dart".to_string()));
            }
            active.insert(dart as usize);
        }
        let mut rotation = Vec::with_capacity(total);
        for _ in 0..total {
            let image = take_number(&mut tokens)?;
            if image < 0 {
                return Err(MapError::Parse("negative rotation image".to_string()));
            }
            rotation.push(image as usize);
        }
        let mut pairing = Vec::with_capacity(total);
        for _ in 0..total {
            let partner = take_number(&mut tokens)?;
            if partner < -1 {
                return Err(MapError::Parse(format!("bad pairing entry {}", partner)));
            }
            pairing.push(if partner == -1 {
                None
            } else {
                Some(partner as usize)
            });
        }
        Self::from_raw(boundary as usize, interior as usize, active, rotation, pairing)
    }

    pub fn load(filename: &str) -> Result<Self, MapError> {
        let contents = fs::read_to_string(filename).map_err(|err| MapError::Io(err.to_string()))?;
        Self::from_text(&contents)
    }

    pub fn save(&self, filename: &str) -> Result<(), MapError> {
        fs::write(filename, self.to_text()).map_err(|err| MapError::Io(err.to_string()))
    }
}

fn take_number<'a, I>(tokens: &mut I) -> Result<i64, MapError>
where
    I: Iterator<Item = &'a str>,
{
    let token = tokens
        .next()
        .ok_or_else(|| MapError::Parse("unexpected end of input".to_string()))?;
    token
        .parse::<i64>()
        .map_err(|_| MapError::Parse(format!("bad token {}", token)))
}

mod test {

    #[test]
    fn polygon_shape() {
        use crate::combinatorial_map::{CombinatorialMap, MapError};
        let g = CombinatorialMap::polygon(3).unwrap();
        assert_eq!(g.boundary_count(), 3);
        assert_eq!(g.interior_count(), 6);
        assert_eq!(g.dart_count(), 9);
        assert!(g.check_maps().is_ok());
        assert_eq!(g.rotation_map(), &[3, 4, 5, 6, 7, 8, 0, 1, 2]);
        assert_eq!(g.pairing_map()[3], Some(7));
        assert_eq!(g.pairing_map()[5], Some(6));
        assert_eq!(CombinatorialMap::polygon(2), Err(MapError::TooFewSides(2)));
    }

    #[test]
    fn ring_shape() {
        use crate::combinatorial_map::{CombinatorialMap, MapError};
        let g = CombinatorialMap::ring(4).unwrap();
        assert_eq!(g.boundary_count(), 4);
        assert_eq!(g.interior_count(), 0);
        assert!(g.check_maps().is_ok());
        assert_eq!(g.rotation_map(), &[1, 2, 3, 0]);
        assert!(g.pairing_map().iter().all(|entry| entry.is_none()));
        assert_eq!(CombinatorialMap::ring(0), Err(MapError::TooFewSides(0)));
    }

    #[test]
    fn rotation_of_a_ring_is_itself() {
        use crate::combinatorial_map::CombinatorialMap;
        let mut g = CombinatorialMap::ring(5).unwrap();
        g.rotate(2).unwrap();
        assert_eq!(g, CombinatorialMap::ring(5).unwrap());
        assert!(g.rotate(0).is_err());
        assert!(g.rotate(5).is_err());
    }

    #[test]
    fn glue_sizes() {
        use crate::combinatorial_map::CombinatorialMap;
        let mut g1 = CombinatorialMap::polygon(3).unwrap();
        let g2 = CombinatorialMap::polygon(3).unwrap();
        g1.glue(&g2, 1).unwrap();
        assert_eq!(g1.boundary_count(), 4);
        assert_eq!(g1.interior_count(), 16);
        assert_eq!(g1.dart_count(), 20);
        assert!(g1.check_maps().is_ok());
        assert_eq!(g1.active_darts().len(), 2);
        assert!(g1.glue(&g2, 0).is_err());
        assert!(g1.glue(&g2, 4).is_err());
    }

    #[test]
    fn glued_rings_reduce() {
        use crate::combinatorial_map::CombinatorialMap;
        let mut g = CombinatorialMap::ring(3).unwrap();
        let other = CombinatorialMap::ring(3).unwrap();
        g.glue(&other, 1).unwrap();
        assert_eq!(g.boundary_count(), 4);
        assert_eq!(g.interior_count(), 4);
        assert!(g.check_maps().is_ok());
        g.normal_form().unwrap();
        assert_eq!(g.boundary_count(), 4);
        assert_eq!(g.interior_count(), 2);
        assert_eq!(g.dart_count(), 6);
        assert!(g.active_darts().is_empty());
        assert!(g.check_maps().is_ok());
    }

    #[test]
    fn normal_form_is_idempotent() {
        use crate::combinatorial_map::CombinatorialMap;
        let mut rings = CombinatorialMap::ring(3).unwrap();
        rings.glue(&CombinatorialMap::ring(3).unwrap(), 1).unwrap();
        let mut polygons = CombinatorialMap::polygon(3).unwrap();
        polygons
            .glue(&CombinatorialMap::polygon(4).unwrap(), 2)
            .unwrap();
        for mut g in [rings, polygons] {
            g.normal_form().unwrap();
            let settled = g.clone();
            g.normal_form().unwrap();
            assert_eq!(g, settled);
            assert!(g.check_maps().is_ok());
        }
    }

    #[test]
    fn isomorphism() {
        use crate::combinatorial_map::CombinatorialMap;
        let g1 = CombinatorialMap::polygon(4).unwrap();
        let g2 = CombinatorialMap::polygon(4).unwrap();
        assert!(g1.isomorphic(&g2));
        assert!(!g1.isomorphic(&CombinatorialMap::ring(4).unwrap()));
        let mut closed = CombinatorialMap::ring(3).unwrap();
        closed.closure().unwrap();
        assert!(!closed.isomorphic(&closed.clone()));
    }

    #[test]
    fn closure_sizes() {
        use crate::combinatorial_map::{CombinatorialMap, MapError};
        let mut g = CombinatorialMap::ring(3).unwrap();
        g.closure().unwrap();
        assert_eq!(g.boundary_count(), 0);
        assert_eq!(g.interior_count(), 12);
        assert!(g.check_maps().is_ok());
        assert_eq!(g.closure(), Err(MapError::ClosureOnClosed));

        let mut p = CombinatorialMap::polygon(3).unwrap();
        p.closure().unwrap();
        assert_eq!(p.boundary_count(), 0);
        assert_eq!(p.interior_count(), 18);
        assert!(p.check_maps().is_ok());
    }

    #[test]
    fn closure_of_a_glued_map() {
        use crate::combinatorial_map::CombinatorialMap;
        let mut g = CombinatorialMap::polygon(3).unwrap();
        let other = CombinatorialMap::polygon(3).unwrap();
        g.glue(&other, 1).unwrap();
        assert_eq!(g.boundary_count(), 4);
        assert_eq!(g.interior_count(), 16);
        g.closure().unwrap();
        assert_eq!(g.boundary_count(), 0);
        assert_eq!(g.interior_count(), 32);
        assert!(g.check_maps().is_ok());
    }

    #[test]
    fn text_round_trip() {
        use crate::combinatorial_map::CombinatorialMap;
        let mut g = CombinatorialMap::polygon(4).unwrap();
        let other = CombinatorialMap::ring(3).unwrap();
        g.glue(&other, 1).unwrap();
        let text = g.to_text();
        let reloaded = CombinatorialMap::from_text(&text).unwrap();
        assert_eq!(g, reloaded);
        assert_eq!(text, reloaded.to_text());
        assert!(CombinatorialMap::from_text("3 0").is_err());
        assert!(CombinatorialMap::from_text("not a map").is_err());
    }

    #[test]
    fn invalid_raw_maps_rejected() {
        use crate::combinatorial_map::{CombinatorialMap, MapError};
        use std::collections::HashSet;
        let bad_rotation = CombinatorialMap::from_raw(
            3,
            0,
            HashSet::new(),
            vec![1, 1, 0],
            vec![None, None, None],
        );
        assert_eq!(bad_rotation, Err(MapError::RotationNotBijective(1)));
        let paired_boundary = CombinatorialMap::from_raw(
            2,
            0,
            HashSet::new(),
            vec![1, 0],
            vec![Some(1), Some(0)],
        );
        assert_eq!(paired_boundary, Err(MapError::PairedOnBoundary(0)));
        let not_involutive = CombinatorialMap::from_raw(
            0,
            3,
            HashSet::new(),
            vec![1, 2, 0],
            vec![Some(1), Some(2), Some(0)],
        );
        assert_eq!(not_involutive, Err(MapError::NotInvolutive(0)));
    }

    #[test]
    fn random_surgery_preserves_invariants() {
        use crate::combinatorial_map::CombinatorialMap;
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let mut g = CombinatorialMap::ring(rng.gen_range(3..8)).unwrap();
            for _ in 0..4 {
                if g.boundary_count() == 0 {
                    break;
                }
                let other = CombinatorialMap::ring(rng.gen_range(3..8)).unwrap();
                let at_most = g.boundary_count().min(other.boundary_count());
                let n = rng.gen_range(1..=at_most);
                g.glue(&other, n).unwrap();
                assert!(g.check_maps().is_ok());
                if g.boundary_count() > 1 {
                    g.rotate(rng.gen_range(1..g.boundary_count())).unwrap();
                    assert!(g.check_maps().is_ok());
                }
            }
            g.normal_form().unwrap();
            assert!(g.check_maps().is_ok());
            g.remove_loops().unwrap();
            assert!(g.check_maps().is_ok());
        }
    }
}
