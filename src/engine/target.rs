use std::fmt;

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

pub const LETTERS: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

pub const DIGITS: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Brown,
}

pub const COLORS: &[ColorName] = &[
    ColorName::Red,
    ColorName::Orange,
    ColorName::Yellow,
    ColorName::Green,
    ColorName::Blue,
    ColorName::Purple,
    ColorName::Pink,
    ColorName::Brown,
];

impl ColorName {
    pub fn name(self) -> &'static str {
        match self {
            ColorName::Red => "red",
            ColorName::Orange => "orange",
            ColorName::Yellow => "yellow",
            ColorName::Green => "green",
            ColorName::Blue => "blue",
            ColorName::Purple => "purple",
            ColorName::Pink => "pink",
            ColorName::Brown => "brown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
    Star,
    Heart,
    Diamond,
}

pub const SHAPES: &[ShapeKind] = &[
    ShapeKind::Circle,
    ShapeKind::Square,
    ShapeKind::Triangle,
    ShapeKind::Star,
    ShapeKind::Heart,
    ShapeKind::Diamond,
];

impl ShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Star => "star",
            ShapeKind::Heart => "heart",
            ShapeKind::Diamond => "diamond",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Addition,
    Subtraction,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Addition => '+',
            Operator::Subtraction => '-',
        }
    }

    pub fn spoken(self) -> &'static str {
        match self {
            Operator::Addition => "plus",
            Operator::Subtraction => "minus",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Hard,
}

impl Difficulty {
    pub fn max_operand(self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Hard => 10,
        }
    }

    pub fn speed_factor(self) -> f32 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "easy" => Some(Difficulty::Easy),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithmeticProblem {
    pub lhs: u32,
    pub rhs: u32,
    pub op: Operator,
    pub answer: u32,
}

impl ArithmeticProblem {
    pub fn spoken(&self) -> String {
        format!("What is {} {} {}?", self.lhs, self.op.spoken(), self.rhs)
    }
}

/// Payload carried by a single item on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Color(ColorName),
    Letter(char),
    Digit(u8),
    Shape(ShapeKind),
    Number(u32),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Color(c) => f.write_str(c.name()),
            Payload::Letter(ch) => write!(f, "{ch}"),
            Payload::Digit(d) => write!(f, "{d}"),
            Payload::Shape(s) => f.write_str(s.name()),
            Payload::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Color(ColorName),
    Letter(char),
    Digit(u8),
    Shape(ShapeKind),
    Arithmetic(ArithmeticProblem),
}

impl Target {
    pub fn payload(&self) -> Payload {
        match *self {
            Target::Color(c) => Payload::Color(c),
            Target::Letter(ch) => Payload::Letter(ch),
            Target::Digit(d) => Payload::Digit(d),
            Target::Shape(s) => Payload::Shape(s),
            Target::Arithmetic(p) => Payload::Number(p.answer),
        }
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        self.payload() == *payload
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Arithmetic(p) => write!(f, "{} {} {}", p.lhs, p.op.symbol(), p.rhs),
            other => write!(f, "{}", other.payload()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    Colors,
    Letters,
    Digits,
    Shapes,
    Arithmetic,
}

impl Catalog {
    pub fn len(self) -> usize {
        match self {
            Catalog::Colors => COLORS.len(),
            Catalog::Letters => LETTERS.len(),
            Catalog::Digits => DIGITS.len(),
            Catalog::Shapes => SHAPES.len(),
            Catalog::Arithmetic => 0,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Payload at `index`, wrapping around. Arithmetic has no fixed entries.
    pub fn payload_at(self, index: usize) -> Option<Payload> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        let i = index % len;
        Some(match self {
            Catalog::Colors => Payload::Color(COLORS[i]),
            Catalog::Letters => Payload::Letter(LETTERS[i]),
            Catalog::Digits => Payload::Digit(DIGITS[i]),
            Catalog::Shapes => Payload::Shape(SHAPES[i]),
            Catalog::Arithmetic => return None,
        })
    }

    pub fn target_at(self, index: usize) -> Option<Target> {
        match self.payload_at(index)? {
            Payload::Color(c) => Some(Target::Color(c)),
            Payload::Letter(ch) => Some(Target::Letter(ch)),
            Payload::Digit(d) => Some(Target::Digit(d)),
            Payload::Shape(s) => Some(Target::Shape(s)),
            // Numbers only exist as arithmetic answers, never as catalog entries.
            Payload::Number(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPolicy {
    Sequential,
    Random,
}

/// Picks the target for each round from a catalog.
pub struct TargetSelector {
    catalog: Catalog,
    policy: TargetPolicy,
    difficulty: Difficulty,
    last_index: Option<usize>,
}

impl TargetSelector {
    pub fn new(catalog: Catalog, policy: TargetPolicy, difficulty: Difficulty) -> Self {
        Self {
            catalog,
            policy,
            difficulty,
            last_index: None,
        }
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    pub fn select(&mut self, rng: &mut SmallRng) -> Target {
        if self.catalog == Catalog::Arithmetic {
            return Target::Arithmetic(generate_problem(self.difficulty, rng));
        }

        let len = self.catalog.len();
        let index = match self.policy {
            TargetPolicy::Sequential => self.last_index.map(|i| (i + 1) % len).unwrap_or(0),
            TargetPolicy::Random => {
                let mut idx = rng.gen_range(0..len);
                if len > 1 && Some(idx) == self.last_index {
                    // Shift to any other entry so the same value never repeats back to back.
                    idx = (idx + rng.gen_range(1..len)) % len;
                }
                idx
            }
        };
        self.last_index = Some(index);
        self.catalog
            .target_at(index)
            .unwrap_or(Target::Color(ColorName::Red))
    }
}

pub fn generate_problem(difficulty: Difficulty, rng: &mut SmallRng) -> ArithmeticProblem {
    let max = difficulty.max_operand();
    if rng.gen_bool(0.5) {
        let lhs = rng.gen_range(0..=max);
        let rhs = rng.gen_range(0..=max);
        ArithmeticProblem {
            lhs,
            rhs,
            op: Operator::Addition,
            answer: lhs + rhs,
        }
    } else {
        let lhs = rng.gen_range(0..=max);
        let rhs = rng.gen_range(0..=lhs);
        ArithmeticProblem {
            lhs,
            rhs,
            op: Operator::Subtraction,
            answer: lhs - rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_letters_wrap_around() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut selector =
            TargetSelector::new(Catalog::Letters, TargetPolicy::Sequential, Difficulty::Easy);
        assert_eq!(selector.select(&mut rng), Target::Letter('A'));
        assert_eq!(selector.select(&mut rng), Target::Letter('B'));
        for _ in 0..24 {
            selector.select(&mut rng);
        }
        assert_eq!(selector.select(&mut rng), Target::Letter('A'));
    }

    #[test]
    fn test_sequential_digits_loop() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut selector =
            TargetSelector::new(Catalog::Digits, TargetPolicy::Sequential, Difficulty::Easy);
        let picked: Vec<Target> = (0..11).map(|_| selector.select(&mut rng)).collect();
        assert_eq!(picked[0], Target::Digit(0));
        assert_eq!(picked[9], Target::Digit(9));
        assert_eq!(picked[10], Target::Digit(0));
    }

    #[test]
    fn test_random_colors_never_repeat_back_to_back() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut selector =
            TargetSelector::new(Catalog::Colors, TargetPolicy::Random, Difficulty::Easy);
        let mut prev = selector.select(&mut rng);
        for _ in 0..500 {
            let next = selector.select(&mut rng);
            assert_ne!(prev, next);
            prev = next;
        }
    }

    #[test]
    fn test_easy_subtraction_never_negative() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut subtractions = 0;
        while subtractions < 1000 {
            let p = generate_problem(Difficulty::Easy, &mut rng);
            if p.op == Operator::Subtraction {
                subtractions += 1;
                assert!(p.lhs >= p.rhs);
                assert_eq!(p.answer, p.lhs - p.rhs);
            }
            assert!(p.lhs <= 5 && p.rhs <= 5);
        }
    }

    #[test]
    fn test_hard_operands_bounded_by_ten() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..1000 {
            let p = generate_problem(Difficulty::Hard, &mut rng);
            assert!(p.lhs <= 10 && p.rhs <= 10);
        }
    }

    #[test]
    fn test_arithmetic_target_matches_answer() {
        let problem = ArithmeticProblem {
            lhs: 3,
            rhs: 2,
            op: Operator::Subtraction,
            answer: 1,
        };
        let target = Target::Arithmetic(problem);
        assert!(target.matches(&Payload::Number(1)));
        assert!(!target.matches(&Payload::Number(5)));
        assert_eq!(target.to_string(), "3 - 2");
    }

    #[test]
    fn test_arithmetic_catalog_has_no_fixed_entries() {
        assert!(Catalog::Arithmetic.is_empty());
        assert_eq!(Catalog::Arithmetic.payload_at(0), None);
        assert_eq!(Catalog::Arithmetic.target_at(3), None);
        assert_eq!(Catalog::Digits.target_at(12), Some(Target::Digit(2)));
    }
}
