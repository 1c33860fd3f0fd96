use rand::Rng;
use rand::seq::SliceRandom;

pub const ADJECTIVES: [&str; 5] = ["행복한", "즐거운", "신나는", "재미있는", "멋진"];
pub const NOUNS: [&str; 5] = ["사자", "호랑이", "코끼리", "기린", "팬더"];

/// Random "adjective noun" nickname. Not unique across sessions.
pub fn generate_nickname() -> String {
    generate_nickname_with(&mut rand::thread_rng())
}

pub fn generate_nickname_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    // Both lists are non-empty constants.
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or(ADJECTIVES[0]);
    let noun = NOUNS.choose(rng).copied().unwrap_or(NOUNS[0]);
    format!("{} {}", adjective, noun)
}
