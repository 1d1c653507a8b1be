use crate::engine::target::{Payload, Target};
use crate::engine::variant::GameKind;

fn target_noun(target: &Target) -> String {
    match target {
        Target::Color(c) => format!("{} bubbles", c.name()),
        Target::Letter(ch) => format!("letter {ch}"),
        Target::Digit(d) => format!("number {d}"),
        Target::Shape(s) => format!("{}s", s.name()),
        Target::Arithmetic(p) => format!("answer to {} {} {}", p.lhs, p.op.spoken(), p.rhs),
    }
}

pub fn round_intro(game: GameKind, target: &Target, round_index: u32) -> String {
    if let Target::Arithmetic(p) = target {
        return p.spoken();
    }
    match (game, round_index) {
        (GameKind::FreeTap, 0) => "Pop all the bubbles!".to_string(),
        (GameKind::FreeTap, _) => "More bubbles! Pop them all!".to_string(),
        (GameKind::Speed, 0) => format!("Be quick! Tap every {}!", target_noun(target)),
        (GameKind::FallingShapes, 0) => {
            format!("Catch the falling {}!", target_noun(target))
        }
        (_, 0) => format!("Let's play! Find all the {}.", target_noun(target)),
        _ => format!("Now find the {}.", target_noun(target)),
    }
}

pub fn hint(target: &Target, remaining: usize) -> String {
    match target {
        Target::Arithmetic(p) => format!("Take your time. {}", p.spoken()),
        _ if remaining == 1 => format!("Just one more. Find the {}.", target_noun(target)),
        _ => format!("Can you find the {}? {remaining} left.", target_noun(target)),
    }
}

pub fn wrong_pop(target: &Target, popped: &Payload) -> String {
    match target {
        Target::Arithmetic(_) => "Not quite. Try again!".to_string(),
        _ => format!("That's {popped}. Look for the {}.", target_noun(target)),
    }
}

pub fn countdown(seconds_left: u32) -> String {
    format!("{seconds_left} seconds left!")
}

pub fn celebration(target: &Target, round_index: u32) -> String {
    match target {
        Target::Arithmetic(p) => format!("Yes! The answer is {}.", p.answer),
        _ if round_index % 3 == 2 => "Amazing work! You found them all!".to_string(),
        _ => "Great job!".to_string(),
    }
}

pub fn results(score: u32, rounds: u32) -> String {
    let rounds_word = if rounds == 1 { "round" } else { "rounds" };
    format!("Time's up! You finished {rounds} {rounds_word} and scored {score} points.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::target::ColorName;

    #[test]
    fn test_first_round_has_distinct_intro() {
        let target = Target::Color(ColorName::Green);
        let first = round_intro(GameKind::Colors, &target, 0);
        let later = round_intro(GameKind::Colors, &target, 1);
        assert_ne!(first, later);
        assert!(first.contains("green"));
    }

    #[test]
    fn test_hint_counts_remaining() {
        let target = Target::Letter('Q');
        assert!(hint(&target, 3).contains("3 left"));
        assert!(hint(&target, 1).contains("one more"));
    }

    #[test]
    fn test_results_pluralises() {
        assert!(results(10, 1).contains("1 round "));
        assert!(results(10, 2).contains("2 rounds"));
    }
}
