use eyre::Result;

macro_rules! run_day {
    ($day:path) => {{
        use $day::*;
        println!("{}", stringify!($day));
        println!("Problem 1: {}", part1(input())?);
        println!("Problem 2: {}", part2(input())?);
    }};
}

fn main() -> Result<()> {
    use aoc2022::*;
    logging::init();
    run_day!(day09);
    run_day!(day10);
    run_day!(day11);
    Ok(())
}
