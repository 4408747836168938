//! Discrete-step simulation primitives shared by the agent-based days.

use std::ops::{Add, AddAssign, Mul, Sub};

/// A point on the integer grid; `y` grows upwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self::new(0, 0);

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Overlapping or adjacent, diagonals included.
    #[inline]
    pub fn touches(self, other: Self) -> bool {
        self.chebyshev(other) <= 1
    }
}

impl Add for Position {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Position {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Position {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for Position {
    type Output = Self;

    #[inline]
    fn mul(self, k: i32) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}

/// A collection of agents advanced one stimulus at a time.
///
/// Implementors own their agents and apply the ordering rules of the model
/// inside `step`; drivers only decide which stimuli to feed and when to stop.
pub trait Simulation {
    type Stimulus;
    type Observation;
    type Error;

    fn step(&mut self, stimulus: Self::Stimulus) -> Result<Self::Observation, Self::Error>;

    /// Feeds every stimulus in order, stopping at the first error.
    fn run<I>(&mut self, stimuli: I) -> Result<(), Self::Error>
    where
        Self: Sized,
        I: IntoIterator<Item = Self::Stimulus>,
    {
        stimuli.into_iter().try_for_each(|stimulus| self.step(stimulus).map(drop))
    }

    /// Lazily feeds stimuli, yielding each step's observation.
    fn observe<I>(&mut self, stimuli: I) -> Observe<'_, Self, I::IntoIter>
    where
        Self: Sized,
        I: IntoIterator<Item = Self::Stimulus>,
    {
        Observe { sim: self, stimuli: stimuli.into_iter() }
    }
}

#[derive(Debug)]
pub struct Observe<'a, S, I> {
    sim: &'a mut S,
    stimuli: I,
}

impl<S, I> Iterator for Observe<'_, S, I>
where
    S: Simulation,
    I: Iterator<Item = S::Stimulus>,
{
    type Item = Result<S::Observation, S::Error>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let stimulus = self.stimuli.next()?;
        Some(self.sim.step(stimulus))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stimuli.size_hint()
    }
}

#[test]
fn test_touching() {
    let p = Position::new(2, -1);
    for dx in -1..=1 {
        for dy in -1..=1 {
            assert!(p.touches(p + Position::new(dx, dy)));
        }
    }
    assert!(!p.touches(p + Position::new(2, 1)));
    assert_eq!(p.chebyshev(Position::new(-1, 3)), 4);
}

#[test]
fn test_observe_stops_with_stimuli() {
    struct Counter(u32);

    impl Simulation for Counter {
        type Stimulus = u32;
        type Observation = u32;
        type Error = ();

        fn step(&mut self, by: u32) -> Result<u32, ()> {
            self.0 += by;
            if self.0 > 10 {
                Err(())
            } else {
                Ok(self.0)
            }
        }
    }

    let mut c = Counter(0);
    let seen: Vec<_> = c.observe([1, 2, 3]).collect();
    assert_eq!(seen, vec![Ok(1), Ok(3), Ok(6)]);
    assert_eq!(c.run([4, 5]), Err(()));
    assert_eq!(c.0, 15);
}
