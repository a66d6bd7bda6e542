/*
Helpers on orbits of maps stored as arrays, shared by the map
and indexing modules.
*/

/*
least element of the orbit of start under repeated application of d
d must be a bijection of 0..d.len() or this never terminates
*/
pub fn orbit_min(d: &[usize], start: usize) -> usize {
    let mut smallest = start;
    let mut point = d[start];
    while point != start {
        if point < smallest {
            smallest = point;
        }
        point = d[point];
    }
    smallest
}

/*
mark every element of the orbit of start under d in seen
*/
pub fn mark_orbit(d: &[usize], start: usize, seen: &mut [bool]) {
    let mut point = start;
    loop {
        seen[point] = true;
        point = d[point];
        if point == start {
            break;
        }
    }
}

mod test {

    #[test]
    fn orbit_minimum() {
        use crate::utils::orbit_min;
        let cycle = vec![1, 2, 0, 4, 3];
        assert_eq!(orbit_min(&cycle, 0), 0);
        assert_eq!(orbit_min(&cycle, 1), 0);
        assert_eq!(orbit_min(&cycle, 2), 0);
        assert_eq!(orbit_min(&cycle, 3), 3);
        assert_eq!(orbit_min(&cycle, 4), 3);
        let identity = vec![0, 1, 2];
        assert_eq!(orbit_min(&identity, 2), 2);
    }

    #[test]
    fn orbit_marking() {
        use crate::utils::mark_orbit;
        let cycle = vec![1, 2, 0, 4, 3];
        let mut seen = vec![false; 5];
        mark_orbit(&cycle, 1, &mut seen);
        assert_eq!(seen, vec![true, true, true, false, false]);
        mark_orbit(&cycle, 4, &mut seen);
        assert_eq!(seen, vec![true, true, true, true, true]);
    }
}
