//! Coordinate normalization and closed-interval helpers.
//!
//! Every position stored in the model is 0-based and inclusive on both ends.
//! Readers convert their native convention by subtracting an input offset.

/// Parses an integer, returning 0 for anything malformed.
///
/// Legacy annotation dumps carry stray characters in numeric columns, so a
/// failed parse degrades to 0 instead of aborting the build.
#[must_use]
pub fn parse_int_safe(s: &str) -> i64 {
    let s = s.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    s.parse().unwrap_or(0)
}

/// Converts a raw position string into a canonical 0-based coordinate.
#[must_use]
pub fn normalize(raw: &str, input_offset: i64) -> i64 {
    parse_int_safe(raw) - input_offset
}

/// Renders a canonical coordinate in a format's native convention.
#[must_use]
pub fn format_position(pos: i64, input_offset: i64) -> String {
    (pos + input_offset).to_string()
}

/// A closed genomic interval `[start, end]`.
pub trait Span {
    fn start(&self) -> i64;
    fn end(&self) -> i64;

    fn size(&self) -> i64 {
        self.end() - self.start() + 1
    }

    fn includes<S: Span + ?Sized>(&self, other: &S) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    fn intersects<S: Span + ?Sized>(&self, other: &S) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }

    fn contains_pos(&self, pos: i64) -> bool {
        self.start() <= pos && pos <= self.end()
    }

    fn intersect_size<S: Span + ?Sized>(&self, other: &S) -> i64 {
        let start = self.start().max(other.start());
        let end = self.end().min(other.end());
        (end - start + 1).max(0)
    }
}

impl Span for (i64, i64) {
    fn start(&self) -> i64 {
        self.0
    }

    fn end(&self) -> i64 {
        self.1
    }
}

/// Subtracts every interval in `remove` from `keep`, returning the uncovered pieces.
#[must_use]
pub fn subtract(keep: (i64, i64), remove: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut pieces = vec![keep];
    for &(rs, re) in remove {
        let mut next = Vec::with_capacity(pieces.len() + 1);
        for (ps, pe) in pieces {
            if re < ps || pe < rs {
                next.push((ps, pe));
                continue;
            }
            if ps < rs {
                next.push((ps, rs - 1));
            }
            if re < pe {
                next.push((re + 1, pe));
            }
        }
        pieces = next;
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_safe_leniency() {
        assert_eq!(parse_int_safe("123"), 123);
        assert_eq!(parse_int_safe(" 42 "), 42);
        assert_eq!(parse_int_safe("+7"), 7);
        assert_eq!(parse_int_safe("-3"), -3);
        assert_eq!(parse_int_safe("12a"), 0);
        assert_eq!(parse_int_safe(""), 0);
    }

    #[test]
    fn normalize_one_based() {
        assert_eq!(normalize("100", 1), 99);
        assert_eq!(normalize("100", 0), 100);
        assert_eq!(normalize("garbage", 1), -1);
    }

    #[test]
    fn format_then_normalize() {
        for offset in [0, 1] {
            for pos in [0, 1, 99, 248_956_421] {
                assert_eq!(normalize(&format_position(pos, offset), offset), pos);
            }
        }
    }

    #[test]
    fn span_relations() {
        let a = (10, 20);
        assert_eq!(a.size(), 11);
        assert!(a.includes(&(12, 20)));
        assert!(!a.includes(&(12, 21)));
        assert!(a.intersects(&(20, 30)));
        assert!(!a.intersects(&(21, 30)));
        assert_eq!(a.intersect_size(&(15, 30)), 6);
        assert_eq!(a.intersect_size(&(25, 30)), 0);
    }

    #[test]
    fn subtract_pieces() {
        assert_eq!(subtract((0, 99), &[(20, 29), (50, 59)]), vec![(0, 19), (30, 49), (60, 99)]);
        assert_eq!(subtract((0, 9), &[(0, 9)]), Vec::<(i64, i64)>::new());
        assert_eq!(subtract((0, 9), &[(20, 30)]), vec![(0, 9)]);
    }
}
