use std::convert::Infallible;
use std::iter;

use ahash::AHashSet;
use tracing::debug;

use crate::error::Result;
use crate::sim::{Position, Simulation};
use crate::utils::*;

const SHORT_ROPE: usize = 2;
const LONG_ROPE: usize = 10;

#[inline]
pub fn input() -> &'static [u8] {
    include_bytes!("input.txt")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    #[inline]
    pub const fn offset(self) -> Position {
        match self {
            Self::Up => Position::new(0, 1),
            Self::Down => Position::new(0, -1),
            Self::Left => Position::new(-1, 0),
            Self::Right => Position::new(1, 0),
        }
    }

    #[inline]
    fn from_byte(c: u8) -> Option<Self> {
        Some(match c {
            b'U' => Self::Up,
            b'D' => Self::Down,
            b'L' => Self::Left,
            b'R' => Self::Right,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    pub direction: Direction,
    pub magnitude: u32,
}

impl Motion {
    fn parse(line: Line) -> Result<Self> {
        const EXPECTED: &str = "`<U|D|L|R> <steps>`";
        let direction = line.first().and_then(Direction::from_byte).ok_or_else(|| line.error(EXPECTED))?;
        let magnitude = line.advance(1).strip_prefix(" ", EXPECTED)?.parse(EXPECTED)?;
        Ok(Self { direction, magnitude })
    }

    #[inline]
    pub fn unit_steps(self) -> impl Iterator<Item = Direction> {
        iter::repeat(self.direction).take(self.magnitude as _)
    }
}

pub fn parse_motions(s: &[u8]) -> Result<Vec<Motion>> {
    parse_lines(s, Motion::parse)
}

/// The displacement that brings `lagging` back in touch with `leading`, if any.
pub fn correction(lagging: Position, leading: Position) -> Option<Position> {
    if lagging.touches(leading) {
        return None;
    }
    let mut cardinal = Direction::ALL.into_iter().filter(|d| lagging + d.offset() * 2 == leading);
    if let (Some(direction), None) = (cardinal.next(), cardinal.next()) {
        return Some(direction.offset());
    }
    let vertical = if leading.y > lagging.y { Direction::Up } else { Direction::Down };
    let horizontal = if leading.x > lagging.x { Direction::Right } else { Direction::Left };
    Some(vertical.offset() + horizontal.offset())
}

/// A knot's current position and every position it has occupied.
#[derive(Debug, Clone)]
pub struct Trail {
    position: Position,
    visited: AHashSet<Position>,
}

impl Trail {
    fn new(origin: Position) -> Self {
        Self { position: origin, visited: iter::once(origin).collect() }
    }

    #[inline]
    fn shift(&mut self, offset: Position) {
        self.position += offset;
        self.visited.insert(self.position);
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn visited(&self) -> &AHashSet<Position> {
        &self.visited
    }

    #[inline]
    pub fn visit_count(&self) -> usize {
        self.visited.len()
    }
}

/// The knot driven directly by motions.
#[derive(Debug, Clone)]
pub struct Leader(Trail);

impl Leader {
    #[inline]
    pub fn advance(&mut self, direction: Direction) {
        self.0.shift(direction.offset());
    }

    #[inline]
    pub fn trail(&self) -> &Trail {
        &self.0
    }
}

/// A knot that only ever moves to stay in touch with the knot ahead of it.
#[derive(Debug, Clone)]
pub struct Follower(Trail);

impl Follower {
    #[inline]
    pub fn follow(&mut self, ahead: &Trail) {
        let offset = correction(self.0.position, ahead.position).unwrap_or_default();
        self.0.shift(offset);
    }

    #[inline]
    pub fn trail(&self) -> &Trail {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Rope {
    head: Leader,
    followers: Vec<Follower>,
}

impl Rope {
    /// A rope of `knots` knots, all starting at the origin.
    ///
    /// # Panics
    ///
    /// Panics if `knots` is zero.
    pub fn new(knots: usize) -> Self {
        assert!(knots > 0, "a rope needs at least one knot");
        let trail = Trail::new(Position::ORIGIN);
        Self { head: Leader(trail.clone()), followers: vec![Follower(trail); knots - 1] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        1 + self.followers.len()
    }

    #[inline]
    pub fn head(&self) -> &Trail {
        self.head.trail()
    }

    #[inline]
    pub fn tail(&self) -> &Trail {
        self.followers.last().map_or(self.head.trail(), Follower::trail)
    }

    pub fn knots(&self) -> impl Iterator<Item = &Trail> + '_ {
        iter::once(self.head.trail()).chain(self.followers.iter().map(Follower::trail))
    }
}

impl Simulation for Rope {
    type Stimulus = Direction;
    type Observation = ();
    type Error = Infallible;

    fn step(&mut self, direction: Direction) -> Result<(), Infallible> {
        self.head.advance(direction);
        let mut ahead = &self.head.0;
        for follower in &mut self.followers {
            follower.follow(ahead);
            ahead = &follower.0;
        }
        Ok(())
    }
}

fn simulate(s: &[u8], knots: usize) -> Result<usize> {
    let motions = parse_motions(s)?;
    let mut rope = Rope::new(knots);
    rope.run(motions.iter().flat_map(|m| m.unit_steps()))?;
    let visited = rope.tail().visit_count();
    debug!(knots, motions = motions.len(), visited, "rope settled");
    Ok(visited)
}

#[inline]
pub fn part1(s: &[u8]) -> Result<usize> {
    simulate(s, SHORT_ROPE)
}

#[inline]
pub fn part2(s: &[u8]) -> Result<usize> {
    simulate(s, LONG_ROPE)
}

#[test]
fn test_day09_part1() {
    assert_eq!(part1(input()).unwrap(), 13);
}

#[test]
fn test_day09_part2() {
    assert_eq!(part2(input()).unwrap(), 1);
}

#[test]
fn test_day09_larger_example() {
    let s = b"R 5\nU 8\nL 8\nD 3\nR 17\nD 10\nL 25\nU 20\n";
    assert_eq!(part1(s).unwrap(), 88);
    assert_eq!(part2(s).unwrap(), 36);
}

#[test]
fn test_day09_follower_trails_leader() {
    let mut rope = Rope::new(2);
    rope.run([Direction::Right; 4]).unwrap();
    assert_eq!(rope.head().position(), Position::new(4, 0));
    assert_eq!(rope.tail().position(), Position::new(3, 0));
    let expected: AHashSet<_> = (0..4).map(|x| Position::new(x, 0)).collect();
    assert_eq!(rope.tail().visited(), &expected);
}

#[test]
fn test_day09_correction() {
    let o = Position::ORIGIN;
    assert_eq!(correction(o, Position::new(1, 1)), None);
    assert_eq!(correction(o, o), None);
    assert_eq!(correction(o, Position::new(0, -2)), Some(Position::new(0, -1)));
    assert_eq!(correction(o, Position::new(-2, 1)), Some(Position::new(-1, 1)));
    assert_eq!(correction(o, Position::new(2, 2)), Some(Position::new(1, 1)));
}

#[test]
fn test_day09_single_knot_rope() {
    let mut rope = Rope::new(1);
    rope.run([Direction::Up, Direction::Up, Direction::Down]).unwrap();
    assert_eq!(rope.len(), 1);
    assert_eq!(rope.tail().visit_count(), 3);
}

#[test]
#[should_panic(expected = "at least one knot")]
fn test_day09_empty_rope() {
    Rope::new(0);
}

#[test]
fn test_day09_parse_error() {
    use crate::error::Error;
    assert!(matches!(part1(b"R 4\nX 2\n"), Err(Error::Parse { line: 2, .. })));
    assert!(matches!(part1(b"R 4\nU\n"), Err(Error::Parse { line: 2, .. })));
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn knots_stay_in_touch(knots in 1..12_usize, steps in prop::collection::vec(direction(), 0..300)) {
            let mut rope = Rope::new(knots);
            for direction in steps {
                rope.step(direction).unwrap();
                let positions: Vec<_> = rope.knots().map(Trail::position).collect();
                for pair in positions.windows(2) {
                    prop_assert!(pair[0].touches(pair[1]));
                }
            }
        }

        #[test]
        fn visited_sets_never_shrink(steps in prop::collection::vec(direction(), 0..300)) {
            let mut rope = Rope::new(LONG_ROPE);
            let mut counts: Vec<_> = rope.knots().map(Trail::visit_count).collect();
            for direction in steps {
                rope.step(direction).unwrap();
                let next: Vec<_> = rope.knots().map(Trail::visit_count).collect();
                for (before, after) in counts.iter().zip(&next) {
                    prop_assert!(after >= before);
                    prop_assert!(after - before <= 1);
                }
                counts = next;
            }
        }
    }
}
