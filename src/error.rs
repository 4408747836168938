use std::convert::Infallible;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("line {line}: expected {expected}, found {found:?}")]
    Parse { line: usize, expected: &'static str, found: String },

    #[error("program exhausted after cycle {cycle}")]
    ProgramExhausted { cycle: usize },

    #[error("monkey {monkey} throws to monkey {target}, but there are only {count} monkeys")]
    UnknownTarget { monkey: usize, target: usize, count: usize },

    #[error("expected monkey {expected}, found monkey {found}")]
    MonkeyOutOfOrder { expected: usize, found: usize },

    #[error("monkey {monkey} tests divisibility by zero")]
    ZeroDivisor { monkey: usize },

    #[error("product of {monkeys} divisors does not fit in 64 bits")]
    ModulusOverflow { monkeys: usize },

    #[error("monkey {monkey} raised a worry level to {worry}, which does not fit in 64 bits")]
    WorryOverflow { monkey: usize, worry: u128 },

    #[error("need at least two monkeys, found {0}")]
    TooFewMonkeys(usize),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
