//! Default playlist accent colors

use rand::seq::SliceRandom;

/// Accent colors assigned to playlists created without one
pub const DEFAULT_ACCENTS: [&str; 5] = ["#fb7185", "#f97316", "#c084fc", "#38bdf8", "#facc15"];

/// Pick a random accent from the default palette
pub fn random_accent() -> String {
    DEFAULT_ACCENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_ACCENTS[0])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_accent_comes_from_palette() {
        for _ in 0..20 {
            let accent = random_accent();
            assert!(DEFAULT_ACCENTS.contains(&accent.as_str()));
        }
    }
}
