//! Numeric-aware name ordering.
//!
//! Page files are named like `page1.jpg`, `page2.jpg`, ... `page10.jpg`, so a
//! plain byte comparison puts `page10` before `page2`. Names are split into
//! runs of ASCII digits and runs of everything else; digit runs compare by
//! numeric value, text runs compare case-insensitively, and digits sort before
//! text. Ties fall back to the raw string so the order is total.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Number(&'a str),
    Text(&'a str),
}

impl Segment<'_> {
    fn cmp_natural(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => compare_digits(a, b),
            (Segment::Text(a), Segment::Text(b)) => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
        }
    }
}

/// Compare two digit runs by value without parsing (runs may exceed u64).
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != numeric)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;

        Some(if numeric {
            Segment::Number(head)
        } else {
            Segment::Text(head)
        })
    }
}

/// Compare two names the way a reader expects pages to be ordered.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let mut left = Segments { rest: a };
    let mut right = Segments { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = l.cmp_natural(&r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Stable in-place sort of `items` by the name returned from `name`.
pub fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| compare_names(name(a), name(b)));
}
