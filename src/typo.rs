use std::collections::BTreeSet;

use rand::Rng;

pub const DEFAULT_TYPO_BUDGET: usize = 3;

/// Failed random draws tolerated before site selection gives up.
const MAX_FAILED_DRAWS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypoPhase {
    InsertWrongChar,
    DeleteWrongChar,
    InsertCorrectChar,
}

impl TypoPhase {
    pub fn next(self) -> Option<TypoPhase> {
        match self {
            TypoPhase::InsertWrongChar => Some(TypoPhase::DeleteWrongChar),
            TypoPhase::DeleteWrongChar => Some(TypoPhase::InsertCorrectChar),
            TypoPhase::InsertCorrectChar => None,
        }
    }
}

/// A simulated mistake in flight. `phase` is the next step to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTypo {
    pub index: usize,
    pub substitute: char,
    pub phase: TypoPhase,
}

fn is_typo_candidate(c: char) -> bool {
    let in_alphabet = c.is_ascii_alphanumeric()
        || ('А'..='Я').contains(&c)
        || ('а'..='я').contains(&c);
    in_alphabet && !c.is_whitespace() && !matches!(c, '.' | ',' | '!' | '?' | ';' | ':')
}

/// Choose up to `max_sites` distinct indices where a typo may be simulated.
///
/// Index 0 is never chosen. Running out of draws yields fewer sites.
pub fn choose_typo_sites(text: &[char], max_sites: usize, rng: &mut impl Rng) -> BTreeSet<usize> {
    let mut sites = BTreeSet::new();
    if max_sites == 0 || text.len() < 2 {
        return sites;
    }

    let mut failed = 0usize;
    while sites.len() < max_sites && failed < MAX_FAILED_DRAWS {
        let idx = rng.gen_range(1..text.len());
        if is_typo_candidate(text[idx]) && sites.insert(idx) {
            continue;
        }
        failed += 1;
    }

    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn sites_respect_character_rules() {
        let text = chars("Hello, world! Is this: a test; yes. Привет 2024?");
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sites = choose_typo_sites(&text, DEFAULT_TYPO_BUDGET, &mut rng);
            assert!(sites.len() <= DEFAULT_TYPO_BUDGET);
            for idx in sites {
                assert_ne!(idx, 0);
                let c = text[idx];
                assert!(!c.is_whitespace(), "seed {seed} picked whitespace");
                assert!(!".,!?;:".contains(c), "seed {seed} picked {c:?}");
            }
        }
    }

    #[test]
    fn cyrillic_letters_are_candidates() {
        assert!(is_typo_candidate('ж'));
        assert!(is_typo_candidate('Ж'));
        assert!(!is_typo_candidate('-'));
        assert!(!is_typo_candidate('é'));
    }

    #[test]
    fn gives_up_quietly_without_candidates() {
        let text = chars("a . , ! ? ; :");
        let mut rng = StdRng::seed_from_u64(3);
        assert!(choose_typo_sites(&text, 3, &mut rng).is_empty());
    }

    #[test]
    fn short_or_disabled_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(choose_typo_sites(&chars("a"), 3, &mut rng).is_empty());
        assert!(choose_typo_sites(&chars("abcdef"), 0, &mut rng).is_empty());
    }

    #[test]
    fn finds_the_only_candidates() {
        // Only indices 1 and 2 qualify.
        let text = chars("abc . . . .");
        let mut rng = StdRng::seed_from_u64(11);
        let sites = choose_typo_sites(&text, 3, &mut rng);
        assert!(sites.iter().all(|i| *i == 1 || *i == 2));
    }

    #[test]
    fn phases_run_in_order() {
        assert_eq!(
            TypoPhase::InsertWrongChar.next(),
            Some(TypoPhase::DeleteWrongChar)
        );
        assert_eq!(
            TypoPhase::DeleteWrongChar.next(),
            Some(TypoPhase::InsertCorrectChar)
        );
        assert_eq!(TypoPhase::InsertCorrectChar.next(), None);
    }
}
