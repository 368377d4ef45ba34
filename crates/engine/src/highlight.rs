//! Marks occurrences of the search term inside rendered text.

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub marked: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            marked: false,
        }
    }

    fn marked(text: &str) -> Self {
        Self {
            text: text.to_string(),
            marked: true,
        }
    }
}

/// Case-insensitive literal matcher for a user-typed term.
///
/// The term is escaped before it becomes a pattern, so `c++` or `(` match
/// themselves. A blank term highlights nothing.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    pub fn new(term: &str) -> Self {
        if term.trim().is_empty() {
            return Self::default();
        }

        let pattern = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build();
        match pattern {
            Ok(pattern) => Self {
                pattern: Some(pattern),
            },
            Err(err) => {
                // Only reachable when the escaped term exceeds the regex size limit.
                log::warn!("highlight disabled for search term: {err}");
                Self::default()
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn segments(&self, text: &str) -> Vec<Segment> {
        let Some(pattern) = &self.pattern else {
            return vec![Segment::plain(text)];
        };

        let mut out = Vec::new();
        let mut last = 0usize;
        for found in pattern.find_iter(text) {
            if found.start() > last {
                out.push(Segment::plain(&text[last..found.start()]));
            }
            out.push(Segment::marked(found.as_str()));
            last = found.end();
        }
        if last < text.len() || out.is_empty() {
            out.push(Segment::plain(&text[last..]));
        }
        out
    }
}
