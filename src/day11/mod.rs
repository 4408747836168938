use std::collections::VecDeque;
use std::iter;

use arrayvec::ArrayVec;
use num_integer::Integer;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::sim::Simulation;
use crate::utils::*;

pub type Worry = u64;

const BLOCK_LINES: usize = 6;
const RELIEF_FACTOR: Worry = 3;
const CALM_ROUNDS: usize = 20;
const ANXIOUS_ROUNDS: usize = 10_000;

#[inline]
pub fn input() -> &'static [u8] {
    include_bytes!("input.txt")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Old,
    Value(Worry),
}

impl Operand {
    #[inline]
    fn resolve(self, old: Worry) -> Worry {
        match self {
            Self::Old => old,
            Self::Value(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add(Operand),
    Multiply(Operand),
}

impl Operation {
    /// Widened so that squaring any 64-bit worry level cannot overflow.
    #[inline]
    pub fn apply(self, old: Worry) -> u128 {
        match self {
            Self::Add(rhs) => old as u128 + rhs.resolve(old) as u128,
            Self::Multiply(rhs) => old as u128 * rhs.resolve(old) as u128,
        }
    }

    fn parse(line: Line) -> Result<Self> {
        const EXPECTED: &str = "`Operation: new = old <+|*> <int|old>`";
        let line = line.trim().strip_prefix("Operation: new = old ", EXPECTED)?;
        let rhs = line.advance(1).trim();
        let rhs = if rhs.text == b"old" { Operand::Old } else { Operand::Value(rhs.parse(EXPECTED)?) };
        match line.first() {
            Some(b'+') => Ok(Self::Add(rhs)),
            Some(b'*') => Ok(Self::Multiply(rhs)),
            _ => Err(line.error(EXPECTED)),
        }
    }
}

/// Normalization applied to every worry level right after the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relief {
    DivideBy(Worry),
    Modulo(Worry),
}

impl Relief {
    #[inline]
    pub fn apply(self, worry: u128) -> u128 {
        match self {
            Self::DivideBy(d) => Integer::div_floor(&worry, &(d as u128)),
            Self::Modulo(m) => Integer::mod_floor(&worry, &(m as u128)),
        }
    }
}

impl Default for Relief {
    fn default() -> Self {
        Self::DivideBy(RELIEF_FACTOR)
    }
}

/// Items thrown during one turn, split by the outcome of the divisibility test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Throws {
    pub pass: Vec<Worry>,
    pub fail: Vec<Worry>,
}

#[derive(Debug, Clone)]
pub struct Monkey {
    id: usize,
    items: VecDeque<Worry>,
    operation: Operation,
    divisor: Worry,
    on_pass: usize,
    on_fail: usize,
    relief: Relief,
    inspections: usize,
}

impl Monkey {
    pub fn new(
        id: usize, items: impl IntoIterator<Item = Worry>, operation: Operation, divisor: Worry,
        on_pass: usize, on_fail: usize,
    ) -> Self {
        Self {
            id,
            items: items.into_iter().collect(),
            operation,
            divisor,
            on_pass,
            on_fail,
            relief: Relief::default(),
            inspections: 0,
        }
    }

    fn parse(block: &[Line]) -> Result<Self> {
        const HEADER: &str = "`Monkey <id>:`";
        const ITEMS: &str = "`Starting items: <int>, ...`";
        const TEST: &str = "`Test: divisible by <int>`";
        const ON_PASS: &str = "`If true: throw to monkey <id>`";
        const ON_FAIL: &str = "`If false: throw to monkey <id>`";

        let &[header, items, operation, test, on_pass, on_fail] = block else {
            let last = block[block.len() - 1];
            return Err(last.error("six lines describing a monkey"));
        };
        let id = header.trim().strip_prefix("Monkey ", HEADER)?.strip_suffix(":", HEADER)?.parse(HEADER)?;
        let items = items.trim().strip_prefix("Starting items:", ITEMS)?;
        let items: VecDeque<Worry> = if items.is_blank() {
            VecDeque::new()
        } else {
            items.split(b',').map(|item| item.parse(ITEMS)).collect::<Result<_>>()?
        };
        Ok(Self::new(
            id,
            items,
            Operation::parse(operation)?,
            test.trim().strip_prefix("Test: divisible by ", TEST)?.parse(TEST)?,
            on_pass.trim().strip_prefix("If true: throw to monkey ", ON_PASS)?.parse(ON_PASS)?,
            on_fail.trim().strip_prefix("If false: throw to monkey ", ON_FAIL)?.parse(ON_FAIL)?,
        ))
    }

    /// New worry level of an item after inspection and relief.
    #[inline]
    pub fn inspect(&self, item: Worry) -> Result<Worry> {
        let worry = self.relief.apply(self.operation.apply(item));
        Worry::try_from(worry).map_err(|_| Error::WorryOverflow { monkey: self.id, worry })
    }

    #[inline]
    pub fn passes(&self, worry: Worry) -> bool {
        Integer::is_multiple_of(&worry, &self.divisor)
    }

    /// Inspects every item held when the turn starts and empties the queue.
    pub fn take_turn(&mut self) -> Result<Throws> {
        let mut throws = Throws::default();
        for &item in &self.items {
            let worry = self.inspect(item)?;
            if self.passes(worry) {
                throws.pass.push(worry);
            } else {
                throws.fail.push(worry);
            }
        }
        self.inspections += self.items.len();
        self.items.clear();
        Ok(throws)
    }

    #[inline]
    pub fn receive(&mut self, items: impl IntoIterator<Item = Worry>) {
        self.items.extend(items);
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn items(&self) -> &VecDeque<Worry> {
        &self.items
    }

    #[inline]
    pub fn divisor(&self) -> Worry {
        self.divisor
    }

    /// Destinations for items that pass and fail the test, in that order.
    #[inline]
    pub fn targets(&self) -> (usize, usize) {
        (self.on_pass, self.on_fail)
    }

    #[inline]
    pub fn relief(&self) -> Relief {
        self.relief
    }

    #[inline]
    pub fn set_relief(&mut self, relief: Relief) {
        self.relief = relief;
    }

    #[inline]
    pub fn inspections(&self) -> usize {
        self.inspections
    }
}

/// One full pass over every monkey in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round;

#[derive(Debug, Clone)]
pub struct Troop {
    monkeys: Vec<Monkey>,
    round: usize,
}

impl Troop {
    /// Monkeys must be listed by id, and every throw must land on one of them.
    pub fn new(monkeys: Vec<Monkey>) -> Result<Self> {
        let count = monkeys.len();
        for (expected, monkey) in monkeys.iter().enumerate() {
            if monkey.id != expected {
                return Err(Error::MonkeyOutOfOrder { expected, found: monkey.id });
            }
            if monkey.divisor == 0 {
                return Err(Error::ZeroDivisor { monkey: monkey.id });
            }
            for target in [monkey.on_pass, monkey.on_fail] {
                if target >= count {
                    return Err(Error::UnknownTarget { monkey: monkey.id, target, count });
                }
            }
        }
        Ok(Self { monkeys, round: 0 })
    }

    #[inline]
    pub fn monkeys(&self) -> &[Monkey] {
        &self.monkeys
    }

    /// Rounds completed so far.
    #[inline]
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn item_count(&self) -> usize {
        self.monkeys.iter().map(|m| m.items.len()).sum()
    }

    /// Product of every monkey's divisor; reducing by it preserves every test.
    pub fn common_modulus(&self) -> Result<Worry> {
        self.monkeys
            .iter()
            .try_fold(1 as Worry, |modulus, m| modulus.checked_mul(m.divisor))
            .ok_or(Error::ModulusOverflow { monkeys: self.monkeys.len() })
    }

    pub fn rounds(&mut self, n: usize) -> Result<()> {
        self.run(iter::repeat(Round).take(n))
    }

    /// Product of the two highest inspection counts.
    pub fn monkey_business(&self) -> Result<u64> {
        let mut counts: Vec<_> = self.monkeys.iter().map(Monkey::inspections).collect();
        if counts.len() < 2 {
            return Err(Error::TooFewMonkeys(counts.len()));
        }
        counts.sort_unstable_by(|a, b| b.cmp(a));
        Ok(counts[0] as u64 * counts[1] as u64)
    }
}

impl Simulation for Troop {
    type Stimulus = Round;
    type Observation = ();
    type Error = Error;

    fn step(&mut self, _: Round) -> Result<()> {
        for i in 0..self.monkeys.len() {
            let throws = self.monkeys[i].take_turn()?;
            let (on_pass, on_fail) = self.monkeys[i].targets();
            self.monkeys[on_pass].receive(throws.pass);
            self.monkeys[on_fail].receive(throws.fail);
        }
        self.round += 1;
        trace!(round = self.round, "round complete");
        Ok(())
    }
}

/// Parses blank-line separated monkey descriptions into a troop.
pub fn build_agents(s: &[u8]) -> Result<Troop> {
    let mut monkeys = Vec::new();
    let mut block = ArrayVec::<Line, BLOCK_LINES>::new();
    for line in lines(s) {
        if line.is_blank() {
            if !block.is_empty() {
                monkeys.push(Monkey::parse(&block)?);
                block.clear();
            }
        } else {
            block.try_push(line).map_err(|_| line.error("a blank line between monkeys"))?;
        }
    }
    if !block.is_empty() {
        monkeys.push(Monkey::parse(&block)?);
    }
    Troop::new(monkeys)
}

/// Swaps every monkey's relief for reduction modulo the troop's common modulus.
///
/// Must run after the troop is complete and before the first round.
pub fn install_overflow_guard(troop: &mut Troop) -> Result<()> {
    let relief = Relief::Modulo(troop.common_modulus()?);
    for monkey in &mut troop.monkeys {
        monkey.set_relief(relief);
    }
    Ok(())
}

fn simulate(mut troop: Troop, rounds: usize) -> Result<u64> {
    troop.rounds(rounds)?;
    let business = troop.monkey_business()?;
    let inspections: Vec<_> = troop.monkeys().iter().map(Monkey::inspections).collect();
    debug!(rounds, ?inspections, business, "monkeys done");
    Ok(business)
}

#[inline]
pub fn part1(s: &[u8]) -> Result<u64> {
    simulate(build_agents(s)?, CALM_ROUNDS)
}

#[inline]
pub fn part2(s: &[u8]) -> Result<u64> {
    let mut troop = build_agents(s)?;
    install_overflow_guard(&mut troop)?;
    simulate(troop, ANXIOUS_ROUNDS)
}

#[test]
fn test_day11_part1() {
    assert_eq!(part1(input()).unwrap(), 10605);
}

#[test]
fn test_day11_part2() {
    assert_eq!(part2(input()).unwrap(), 2713310158);
}

#[test]
fn test_day11_inspection_counts() {
    let mut troop = build_agents(input()).unwrap();
    troop.rounds(1).unwrap();
    let counts: Vec<_> = troop.monkeys().iter().map(Monkey::inspections).collect();
    assert_eq!(counts, vec![2, 4, 3, 5]);
    troop.rounds(19).unwrap();
    let counts: Vec<_> = troop.monkeys().iter().map(Monkey::inspections).collect();
    assert_eq!(counts, vec![101, 95, 7, 105]);
    assert_eq!(troop.round(), 20);
}

#[test]
fn test_day11_parse() {
    let troop = build_agents(input()).unwrap();
    let m = &troop.monkeys()[2];
    assert_eq!(m.items(), &VecDeque::from(vec![79, 60, 97]));
    assert_eq!(m.operation, Operation::Multiply(Operand::Old));
    assert_eq!(m.divisor(), 13);
    assert_eq!(m.targets(), (1, 3));
    assert_eq!(m.relief(), Relief::DivideBy(3));
    assert_eq!(troop.common_modulus(), Ok(23 * 19 * 13 * 17));
}

#[test]
fn test_day11_single_inspection() {
    let mut monkey = Monkey::new(0, [79], Operation::Multiply(Operand::Value(19)), 23, 1, 1);
    let throws = monkey.take_turn().unwrap();
    assert_eq!(throws, Throws { pass: vec![], fail: vec![500] });
    assert_eq!(monkey.inspections(), 1);
    assert!(monkey.items().is_empty());

    let mut troop = Troop::new(vec![
        Monkey::new(0, [79], Operation::Multiply(Operand::Value(19)), 23, 1, 1),
        Monkey::new(1, [], Operation::Add(Operand::Value(1)), 2, 0, 0),
    ])
    .unwrap();
    troop.step(Round).unwrap();
    // monkey 1 sees the item in the same round: 500 + 1 = 501, 501 / 3 = 167, thrown back
    assert_eq!(troop.monkeys()[0].items(), &VecDeque::from(vec![167]));
    assert_eq!(troop.monkeys()[1].inspections(), 1);
}

#[test]
fn test_day11_self_throw_waits_a_round() {
    let mut troop = Troop::new(vec![
        Monkey::new(0, [4, 5], Operation::Add(Operand::Old), 2, 0, 1),
        Monkey::new(1, [], Operation::Add(Operand::Value(0)), 7, 1, 1),
    ])
    .unwrap();
    troop.rounds(1).unwrap();
    // 4 -> 8 / 3 = 2, kept; 5 -> 10 / 3 = 3, passed on
    assert_eq!(troop.monkeys()[0].items(), &VecDeque::from(vec![2]));
    assert_eq!(troop.monkeys()[0].inspections(), 2);
    assert_eq!(troop.monkeys()[1].items(), &VecDeque::from(vec![1]));
}

#[test]
fn test_day11_invalid_troops() {
    let op = Operation::Add(Operand::Old);
    assert_eq!(
        Troop::new(vec![Monkey::new(0, [], op, 3, 0, 2), Monkey::new(1, [], op, 3, 0, 0)]).unwrap_err(),
        Error::UnknownTarget { monkey: 0, target: 2, count: 2 }
    );
    assert_eq!(
        Troop::new(vec![Monkey::new(1, [], op, 3, 0, 0)]).unwrap_err(),
        Error::MonkeyOutOfOrder { expected: 0, found: 1 }
    );
    assert_eq!(Troop::new(vec![Monkey::new(0, [], op, 0, 0, 0)]).unwrap_err(), Error::ZeroDivisor { monkey: 0 });
    let lonely = Troop::new(vec![Monkey::new(0, [1], op, 3, 0, 0)]).unwrap();
    assert_eq!(lonely.monkey_business(), Err(Error::TooFewMonkeys(1)));
}

#[test]
fn test_day11_parse_errors() {
    let monkey = |items: &str, operation: &str| {
        format!(
            "Monkey 0:\n  Starting items:{}\n  Operation: new = old {}\n  Test: divisible by 2\n    \
             If true: throw to monkey 0\n    If false: throw to monkey 0\n",
            items, operation
        )
    };
    let parse_line = |s: String| match build_agents(s.as_bytes()) {
        Err(Error::Parse { line, .. }) => Some(line),
        _ => None,
    };
    assert!(build_agents(monkey("", "* old").as_bytes()).unwrap().monkeys()[0].items().is_empty());
    assert_eq!(parse_line(monkey(" 1, x", "+ 1")), Some(2));
    assert_eq!(parse_line(monkey(" 1", "/ 2")), Some(3));
    assert_eq!(parse_line(monkey(" 1", "+ 1").replace("monkey 0\n", "monkey zero\n")), Some(5));
    assert_eq!(parse_line("Monkey 0:\n  Starting items:\n  Operation: new = old + 2\n".into()), Some(3));
    assert_eq!(parse_line(monkey("", "+ 1") + "Monkey 1:\n"), Some(7));
}

fn describe_monkeys(monkeys: &[(&str, &str, Worry, usize, usize)]) -> String {
    let mut s = String::new();
    for (id, &(items, operation, divisor, on_pass, on_fail)) in monkeys.iter().enumerate() {
        s += &format!(
            "Monkey {}:\n  Starting items: {}\n  Operation: new = old {}\n  Test: divisible by {}\n    \
             If true: throw to monkey {}\n    If false: throw to monkey {}\n\n",
            id, items, operation, divisor, on_pass, on_fail
        );
    }
    s
}

#[test]
fn test_day11_modulus_too_large() {
    let s = describe_monkeys(&[("1", "* old", 97, 1, 0); 10]);
    assert_eq!(part2(s.as_bytes()), Err(Error::ModulusOverflow { monkeys: 10 }));
    let mut troop = build_agents(s.as_bytes()).unwrap();
    assert!(install_overflow_guard(&mut troop).is_err());
    assert_eq!(troop.monkeys()[0].relief(), Relief::DivideBy(3));
}

#[test]
fn test_day11_modulus_above_32_bits() {
    let s = describe_monkeys(&[
        ("4000000000, 123456789", "* old", 4294967311, 1, 1),
        ("4294967310", "+ 7", 3, 0, 1),
    ]);
    let mut troop = build_agents(s.as_bytes()).unwrap();
    install_overflow_guard(&mut troop).unwrap();
    assert_eq!(troop.common_modulus(), Ok(4294967311 * 3));
    troop.rounds(1000).unwrap();
    assert_eq!(troop.item_count(), 3);
    assert!(troop.monkeys().iter().flat_map(Monkey::items).all(|&w| w < 4294967311 * 3));
    assert_eq!(troop.monkey_business(), Ok(2999 * 8999));
}

#[test]
fn test_day11_worry_overflow_is_fatal() {
    let s = describe_monkeys(&[("99999", "* old", 2, 1, 1), ("", "* old", 2, 0, 0)]);
    assert_eq!(
        part1(s.as_bytes()),
        Err(Error::WorryOverflow { monkey: 0, worry: 4572107923182185645633262002871513123 })
    );
    let mut troop = build_agents(s.as_bytes()).unwrap();
    troop.rounds(1).unwrap();
    assert!(troop.rounds(1).is_err());
    assert_eq!(troop.round(), 1);
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    const DIVISORS: [Worry; 9] = [2, 3, 5, 7, 11, 13, 17, 19, 23];

    fn operation() -> impl Strategy<Value = Operation> {
        let operand = prop_oneof![Just(Operand::Old), (0..20 as Worry).prop_map(Operand::Value)];
        (any::<bool>(), operand).prop_map(|(add, rhs)| if add { Operation::Add(rhs) } else { Operation::Multiply(rhs) })
    }

    fn troops() -> impl Strategy<Value = Troop> {
        (2..7_usize).prop_flat_map(|n| {
            let monkey = (
                prop::collection::vec(0..1000 as Worry, 0..6),
                operation(),
                prop::sample::select(DIVISORS.to_vec()),
                0..n,
                0..n,
            );
            prop::collection::vec(monkey, n).prop_map(|specs| {
                let monkeys = specs
                    .into_iter()
                    .enumerate()
                    .map(|(id, (items, op, divisor, on_pass, on_fail))| {
                        Monkey::new(id, items, op, divisor, on_pass, on_fail)
                    })
                    .collect();
                Troop::new(monkeys).unwrap()
            })
        })
    }

    /// Troops that never square, so a few rounds without relief stay within 64 bits.
    fn tame_troops() -> impl Strategy<Value = Troop> {
        fn operation() -> impl Strategy<Value = Operation> {
            let operand = prop_oneof![Just(Operand::Old), (1..20 as Worry).prop_map(Operand::Value)];
            (any::<bool>(), operand).prop_map(|(add, rhs)| match rhs {
                Operand::Value(_) if !add => Operation::Multiply(rhs),
                _ => Operation::Add(rhs),
            })
        }

        (2..5_usize).prop_flat_map(|n| {
            let monkey =
                (prop::collection::vec(0..100 as Worry, 0..4), operation(), prop::sample::select(DIVISORS.to_vec()), 0..n, 0..n);
            prop::collection::vec(monkey, n).prop_map(|specs| {
                let monkeys = specs
                    .into_iter()
                    .enumerate()
                    .map(|(id, (items, op, divisor, on_pass, on_fail))| Monkey::new(id, items, op, divisor, on_pass, on_fail))
                    .collect();
                Troop::new(monkeys).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn rounds_conserve_items(mut troop in troops(), rounds in 1..30_usize) {
            install_overflow_guard(&mut troop).unwrap();
            let total = troop.item_count();
            for _ in 0..rounds {
                troop.step(Round).unwrap();
                prop_assert_eq!(troop.item_count(), total);
            }
            let inspected: usize = troop.monkeys().iter().map(Monkey::inspections).sum();
            prop_assert!(inspected >= total);
        }

        #[test]
        fn common_modulus_preserves_tests(
            divisors in prop::collection::vec(prop::sample::select(DIVISORS.to_vec()), 1..8),
            worry in 0..u32::MAX as Worry,
        ) {
            let relief = Relief::Modulo(divisors.iter().product());
            let reduced = relief.apply(worry as u128);
            for d in divisors {
                prop_assert_eq!(reduced % d as u128, worry as u128 % d as u128);
            }
        }

        #[test]
        fn guarded_troop_classifies_like_unbounded(plain in tame_troops(), rounds in 1..4_usize) {
            let mut plain = plain;
            let mut guarded = plain.clone();
            install_overflow_guard(&mut guarded).unwrap();
            let modulus = guarded.common_modulus().unwrap();
            for monkey in &mut plain.monkeys {
                monkey.set_relief(Relief::DivideBy(1));
            }
            for _ in 0..rounds {
                for (p, g) in plain.monkeys().iter().zip(guarded.monkeys()) {
                    for &item in p.items() {
                        let exact = p.inspect(item).unwrap();
                        let reduced = g.inspect(item % modulus).unwrap();
                        prop_assert_eq!(reduced, exact % modulus);
                        prop_assert_eq!(g.passes(reduced), p.passes(exact));
                    }
                }
                plain.step(Round).unwrap();
                guarded.step(Round).unwrap();
                for (p, g) in plain.monkeys().iter().zip(guarded.monkeys()) {
                    let reduced: Vec<_> = p.items().iter().map(|w| w % modulus).collect();
                    prop_assert_eq!(g.items().iter().copied().collect::<Vec<_>>(), reduced);
                    prop_assert_eq!(g.inspections(), p.inspections());
                }
            }
        }
    }
}
