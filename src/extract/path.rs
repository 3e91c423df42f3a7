//! Dotted-path selection over parsed JSON
//!
//! A path is a `.`-separated list of segments. Each segment is a property
//! name; a segment made only of digits also indexes arrays, and `*` selects
//! every child of an object or array. The empty path selects the token it is
//! applied to.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("segment {0} is empty")]
    EmptySegment(usize),
}

/// One step of a [`JsonPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Property lookup; `index` is set when the name is a non-negative integer
    Name { name: String, index: Option<usize> },
    /// All children of an object (document order) or array
    Wildcard,
}

impl Segment {
    fn parse(raw: &str) -> Segment {
        if raw == "*" {
            return Segment::Wildcard;
        }

        let index = if raw.bytes().all(|b| b.is_ascii_digit()) {
            raw.parse::<usize>().ok()
        } else {
            None
        };

        Segment::Name {
            name: raw.to_string(),
            index,
        }
    }

    /// Single-valued step; wildcards never resolve here
    fn child<'a>(&self, token: &'a Value) -> Option<&'a Value> {
        match (self, token) {
            (Segment::Name { name, .. }, Value::Object(map)) => map.get(name),
            (Segment::Name { index: Some(i), .. }, Value::Array(items)) => items.get(*i),
            _ => None,
        }
    }

    fn step<'a>(&self, token: &'a Value, out: &mut Vec<&'a Value>) {
        match (self, token) {
            (Segment::Wildcard, Value::Object(map)) => out.extend(map.values()),
            (Segment::Wildcard, Value::Array(items)) => out.extend(items.iter()),
            (Segment::Wildcard, _) => {}
            (Segment::Name { .. }, _) => out.extend(self.child(token)),
        }
    }
}

/// A parsed dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Ok(Self::root());
        }

        let segments = raw
            .split('.')
            .enumerate()
            .map(|(pos, seg)| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(pos))
                } else {
                    Ok(Segment::parse(seg))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(JsonPath {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The empty path
    pub fn root() -> Self {
        JsonPath {
            raw: String::new(),
            segments: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every token the path matches under `root`, in encounter order
    ///
    /// Unresolvable steps (missing key, wrong token type, index out of
    /// range) simply drop that branch.
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::with_capacity(current.len());
            for token in current {
                segment.step(token, &mut next);
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// Record-scoped lookup: the single token at this path, or `None`
    pub fn resolve<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(record, |token, segment| segment.child(token))
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse `path` and select it against `tree`
pub fn select<'a>(tree: &'a Value, path: &str) -> Result<Vec<&'a Value>, PathError> {
    Ok(JsonPath::parse(path)?.select(tree))
}
