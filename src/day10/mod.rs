use std::fmt::{self, Display};
use std::iter;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sim::Simulation;
use crate::utils::*;

const FIRST_SAMPLE: usize = 20;
const SAMPLE_PERIOD: usize = 40;
const LAST_SAMPLE: usize = 220;

const SCREEN_WIDTH: usize = 40;
const SCREEN_HEIGHT: usize = 6;

#[inline]
pub fn input() -> &'static [u8] {
    include_bytes!("input.txt")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Noop,
    Addx(i64),
}

impl Instruction {
    /// Cycles the instruction stays in flight before its effect lands.
    #[inline]
    pub const fn cycles(self) -> usize {
        match self {
            Self::Noop => 1,
            Self::Addx(_) => 2,
        }
    }

    fn parse(line: Line) -> Result<Self> {
        const EXPECTED: &str = "`noop` or `addx <int>`";
        let line = line.trim();
        if line.text == b"noop" {
            Ok(Self::Noop)
        } else {
            Ok(Self::Addx(line.strip_prefix("addx ", EXPECTED)?.parse(EXPECTED)?))
        }
    }
}

pub fn parse_program(s: &[u8]) -> Result<Vec<Instruction>> {
    parse_lines(s, Instruction::parse)
}

/// One clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// The register as seen *during* a cycle, before any effect retiring at its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub number: usize,
    pub x: i64,
}

impl Cycle {
    #[inline]
    pub fn signal_strength(self) -> i64 {
        self.number as i64 * self.x
    }

    #[inline]
    pub fn is_sampled(self) -> bool {
        self.number >= FIRST_SAMPLE && (self.number - FIRST_SAMPLE) % SAMPLE_PERIOD == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    instruction: Instruction,
    remaining: usize,
}

#[derive(Debug, Clone)]
pub struct Cpu<I> {
    program: I,
    x: i64,
    cycle: usize,
    in_flight: Option<InFlight>,
}

impl<I: Iterator<Item = Instruction>> Cpu<I> {
    pub fn new(program: impl IntoIterator<IntoIter = I>) -> Self {
        Self { program: program.into_iter(), x: 1, cycle: 0, in_flight: None }
    }

    #[inline]
    pub fn x(&self) -> i64 {
        self.x
    }

    /// Number of completed cycles.
    #[inline]
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    #[inline]
    fn retire(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::Noop => {}
            Instruction::Addx(v) => self.x += v,
        }
    }

    /// Retires the finished instruction (if any) and fetches the next one.
    fn fetch(&mut self) -> Result<InFlight> {
        if let Some(done) = self.in_flight.take() {
            self.retire(done.instruction);
        }
        let instruction =
            self.program.next().ok_or(Error::ProgramExhausted { cycle: self.cycle })?;
        Ok(InFlight { instruction, remaining: instruction.cycles() })
    }
}

impl<I: Iterator<Item = Instruction>> Simulation for Cpu<I> {
    type Stimulus = Tick;
    type Observation = Cycle;
    type Error = Error;

    fn step(&mut self, _: Tick) -> Result<Cycle> {
        let mut in_flight = match self.in_flight.filter(|f| f.remaining > 0) {
            Some(f) => f,
            None => self.fetch()?,
        };
        self.cycle += 1;
        in_flight.remaining -= 1;
        self.in_flight = Some(in_flight);
        Ok(Cycle { number: self.cycle, x: self.x })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pixels: [[bool; SCREEN_WIDTH]; SCREEN_HEIGHT],
}

impl Screen {
    pub const CYCLES: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

    pub fn new() -> Self {
        Self { pixels: [[false; SCREEN_WIDTH]; SCREEN_HEIGHT] }
    }

    /// Draws the pixel under the beam during `cycle`; the sprite is 3 pixels wide.
    pub fn draw(&mut self, cycle: Cycle) {
        let beam = (cycle.number - 1) % Self::CYCLES;
        let (row, col) = (beam / SCREEN_WIDTH, beam % SCREEN_WIDTH);
        self.pixels[row][col] = (col as i64 - cycle.x).abs() <= 1;
    }

    #[inline]
    pub fn is_lit(&self, row: usize, col: usize) -> bool {
        self.pixels[row][col]
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.pixels.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            for &lit in row {
                f.write_str(if lit { "#" } else { "." })?;
            }
        }
        Ok(())
    }
}

#[inline]
pub fn part1(s: &[u8]) -> Result<i64> {
    let mut cpu = Cpu::new(parse_program(s)?);
    let mut strength = 0;
    for cycle in cpu.observe(iter::repeat(Tick).take(LAST_SAMPLE)) {
        let cycle = cycle?;
        if cycle.is_sampled() {
            strength += cycle.signal_strength();
        }
    }
    debug!(strength, "signal sampled");
    Ok(strength)
}

#[inline]
pub fn part2(s: &[u8]) -> Result<String> {
    let mut cpu = Cpu::new(parse_program(s)?);
    let mut screen = Screen::new();
    // a program that stops before the last pixel is an error, not a partial screen
    for cycle in cpu.observe(iter::repeat(Tick).take(Screen::CYCLES)) {
        screen.draw(cycle?);
    }
    debug!(cycles = cpu.cycle(), x = cpu.x(), "screen rendered");
    Ok(screen.to_string())
}

#[test]
fn test_day10_part1() {
    assert_eq!(part1(input()).unwrap(), 14880);
}

#[test]
fn test_day10_part2() {
    let expected = "\
#######...#..#######....#..########...##
.###................##..................
####........##...###...##......##.##....
.##.................##..................
...##..####......###.......##..........#
....................#...................";
    assert_eq!(part2(input()).unwrap(), expected);
}

#[test]
fn test_day10_register_timing() {
    use Instruction::*;
    let mut cpu = Cpu::new([Noop, Addx(3), Addx(-5)]);
    let xs: Vec<_> = cpu.observe([Tick; 5]).map(|c| c.unwrap().x).collect();
    assert_eq!(xs, vec![1, 1, 1, 4, 4]);
    assert_eq!(cpu.cycle(), 5);
    assert_eq!(cpu.step(Tick), Err(Error::ProgramExhausted { cycle: 5 }));
    assert_eq!(cpu.x(), -1);
}

#[test]
fn test_day10_cycle_numbers_increase() {
    let mut cpu = Cpu::new(parse_program(input()).unwrap());
    let numbers: Vec<_> = cpu.observe([Tick; 50]).map(|c| c.unwrap().number).collect();
    assert_eq!(numbers, (1..=50).collect::<Vec<_>>());
}

#[test]
fn test_day10_short_program_is_fatal() {
    assert_eq!(part1(b"noop\naddx 2\n"), Err(Error::ProgramExhausted { cycle: 3 }));
    assert_eq!(part2(b"noop\naddx 2\n"), Err(Error::ProgramExhausted { cycle: 3 }));
    assert!(matches!(part1(b"noop\naddy 2\n"), Err(Error::Parse { line: 2, .. })));
}

#[test]
fn test_day10_sample_points() {
    let sampled: Vec<_> = (1..=LAST_SAMPLE)
        .map(|number| Cycle { number, x: 0 })
        .filter(|c| c.is_sampled())
        .map(|c| c.number)
        .collect();
    assert_eq!(sampled, vec![20, 60, 100, 140, 180, 220]);
}
