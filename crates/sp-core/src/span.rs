pub type FileId = u64;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Span({}:{}-{})", self.file, self.lo, self.hi)
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32) -> Span {
        Span { file, lo, hi }
    }

    pub fn null() -> Span {
        Span::default()
    }

    pub fn is_null(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Smallest span covering every non-null input span of the same file.
    pub fn union(spans: impl IntoIterator<Item = Span>) -> Span {
        let mut iter = spans.into_iter().filter(|span| !span.is_null());
        let Some(first) = iter.next() else {
            return Span::null();
        };
        iter.fold(first, |acc, span| {
            if span.file != acc.file {
                return acc;
            }
            Span {
                file: acc.file,
                lo: acc.lo.min(span.lo),
                hi: acc.hi.max(span.hi),
            }
        })
    }

    pub fn to(self, other: Span) -> Span {
        Span::union([self, other])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_null_spans() {
        let joined = Span::union([Span::null(), Span::new(1, 4, 9), Span::new(1, 2, 5)]);
        assert_eq!(joined, Span::new(1, 2, 9));
        assert!(Span::union(std::iter::empty()).is_null());
    }
}
