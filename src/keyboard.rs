use rand::Rng;

/// A key press as the host page reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    /// DOM-style key name: a single character, or a name like `Enter`.
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn has_command_modifier(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }

    /// Keys that would change field content if they reached it.
    ///
    /// Shift is not a command modifier: `A` and `!` still count.
    pub fn is_content_affecting(&self) -> bool {
        self.key.chars().count() == 1 || matches!(self.key.as_str(), "Enter" | "Backspace")
    }

    pub fn is_manual_input(&self) -> bool {
        self.is_content_affecting() && !self.has_command_modifier()
    }
}

fn qwerty_neighbors(c: char) -> Option<&'static [char]> {
    let neighbors: &[char] = match c {
        'a' => &['q', 'w', 's', 'z'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['s', 'e', 'r', 'f', 'c', 'x'],
        'e' => &['w', 's', 'd', 'r', '3', '4'],
        'f' => &['d', 'r', 't', 'g', 'v', 'c'],
        'g' => &['f', 't', 'y', 'h', 'b', 'v'],
        'h' => &['g', 'y', 'u', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o', '8', '9'],
        'j' => &['h', 'u', 'i', 'k', 'm', 'n'],
        'k' => &['j', 'i', 'o', 'l', 'm'],
        'l' => &['k', 'o', 'p'],
        'm' => &['n', 'j', 'k'],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p', '9', '0'],
        'p' => &['o', 'l', '0'],
        'q' => &['w', 'a', '1', '2'],
        'r' => &['e', 'd', 'f', 't', '4', '5'],
        's' => &['a', 'w', 'e', 'd', 'x', 'z'],
        't' => &['r', 'f', 'g', 'y', '5', '6'],
        'u' => &['y', 'h', 'j', 'i', '7', '8'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e', '2', '3'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'g', 'h', 'u', '6', '7'],
        'z' => &['a', 's', 'x'],
        '1' => &['2', 'q'],
        '2' => &['1', '3', 'q', 'w'],
        '3' => &['2', '4', 'w', 'e'],
        '4' => &['3', '5', 'e', 'r'],
        '5' => &['4', '6', 'r', 't'],
        '6' => &['5', '7', 't', 'y'],
        '7' => &['6', '8', 'y', 'u'],
        '8' => &['7', '9', 'u', 'i'],
        '9' => &['8', '0', 'i', 'o'],
        '0' => &['9', 'o', 'p'],
        _ => return None,
    };
    Some(neighbors)
}

/// Pick a fat-finger substitute for `c` from its QWERTY neighbors.
///
/// Upper-case input yields an upper-case letter. Anything outside the
/// letter/digit table (punctuation, whitespace, non-Latin scripts) has no
/// neighbor.
pub fn qwerty_adjacent_char(c: char, rng: &mut impl Rng) -> Option<char> {
    let (base, make_upper) = if c.is_ascii_uppercase() {
        (c.to_ascii_lowercase(), true)
    } else {
        (c, false)
    };

    let neighbors = qwerty_neighbors(base)?;
    let chosen = neighbors[rng.gen_range(0..neighbors.len())];
    Some(if make_upper {
        chosen.to_ascii_uppercase()
    } else {
        chosen
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn neighbors_are_adjacent_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(7);
        for c in ('a'..='z').chain('0'..='9') {
            let table = qwerty_neighbors(c).expect("every letter and digit has neighbors");
            for _ in 0..20 {
                let n = qwerty_adjacent_char(c, &mut rng).unwrap();
                assert!(table.contains(&n), "{n:?} is not a neighbor of {c:?}");
                assert!(n.is_ascii_alphanumeric());
                assert_ne!(n, c);
            }
        }
    }

    #[test]
    fn preserves_upper_case() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let n = qwerty_adjacent_char('Q', &mut rng).unwrap();
            assert!(['W', 'A', '1', '2'].contains(&n), "got {n:?}");
        }
    }

    #[test]
    fn no_neighbor_outside_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        for c in [' ', '.', ',', '!', '\n', 'ж', 'é', '['] {
            assert_eq!(qwerty_adjacent_char(c, &mut rng), None, "{c:?}");
        }
    }

    #[test]
    fn same_seed_same_choice() {
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..10)
                .map(|_| qwerty_adjacent_char('g', &mut rng))
                .collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..10)
                .map(|_| qwerty_adjacent_char('g', &mut rng))
                .collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn manual_input_classification() {
        assert!(KeyEvent::new("a").is_manual_input());
        assert!(KeyEvent::new("A").is_manual_input());
        assert!(KeyEvent::new(" ").is_manual_input());
        assert!(KeyEvent::new("Enter").is_manual_input());
        assert!(KeyEvent::new("Backspace").is_manual_input());
        assert!(KeyEvent::new("я").is_manual_input());

        assert!(!KeyEvent::new("Shift").is_manual_input());
        assert!(!KeyEvent::new("ArrowLeft").is_manual_input());
        assert!(!KeyEvent::new("Tab").is_manual_input());
        assert!(!KeyEvent::new("c").with_ctrl().is_manual_input());
        assert!(!KeyEvent::new("v").with_meta().is_manual_input());
        assert!(!KeyEvent::new("x").with_alt().is_manual_input());
    }
}
