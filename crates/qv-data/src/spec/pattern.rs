//! `{id}` address templates

use std::fmt;
use regex::Regex;

/// Piece of a name pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed `name_pattern` such as `img_{theta}_{phi}.png`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    segments: Vec<Segment>,
}

impl NamePattern {
    /// Split `source` into literal text and `{name}` placeholders
    pub fn parse(source: &str) -> Result<Self, regex::Error> {
        let placeholder = Regex::new(r"\{(.*?)\}")?;

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in placeholder.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut segments, &source[last..whole.start()]);
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            last = whole.end();
        }
        push_literal(&mut segments, &source[last..]);

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance (repeats included)
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Substitute every placeholder `lookup` knows; the others stay in place
    pub fn substitute<F>(&self, lookup: F) -> NamePattern
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut segments = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => push_literal(&mut segments, text),
                Segment::Placeholder(name) => match lookup(name) {
                    Some(value) => push_literal(&mut segments, &value),
                    None => segments.push(segment.clone()),
                },
            }
        }
        NamePattern { segments }
    }

    /// Substitute and flatten to a string. Unknown placeholders are written back as `{name}`.
    pub fn render<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.substitute(lookup).to_string()
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Placeholder(name) => write!(f, "{{{}}}", name)?,
            }
        }
        Ok(())
    }
}

/// Append literal text, merging with a preceding literal
fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Literal(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_string()));
    }
}
