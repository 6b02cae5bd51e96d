//! Field paths: stack-shaped addresses into a document.

use std::fmt;

use serde_yaml::Value;

/// One step of a field path: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    pub fn key(name: impl Into<String>) -> Self {
        Segment::Key(name.into())
    }

    /// Segment for an arbitrary mapping key as stored in a document.
    pub fn from_key(key: &Value) -> Self {
        Segment::Key(key_text(key))
    }
}

/// Ordered sequence of segments; empty means the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse dotted notation, e.g. `api.deepseek.models.model_1` or
    /// `output.directories[1]`.
    pub fn parse(dotted: &str) -> Self {
        let mut segments = Vec::new();
        for part in dotted.split('.').filter(|p| !p.is_empty()) {
            let (name, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if !name.is_empty() {
                segments.push(Segment::key(name));
            }
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(end) = stripped.find(']') else {
                    break;
                };
                match stripped[..end].parse::<usize>() {
                    Ok(i) => segments.push(Segment::Index(i)),
                    Err(_) => segments.push(Segment::key(&stripped[..end])),
                }
                rest = &stripped[end + 1..];
            }
        }
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    pub fn child(&self, segment: Segment) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    /// Name of the last segment when it is a mapping key.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }

    /// Name of the first segment when it is a mapping key.
    pub fn first_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("(root)");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => f.write_str(k)?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

/// Display text for a mapping key. Non-string keys are rendered as YAML.
pub fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn find_key<'a>(map: &'a serde_yaml::Mapping, name: &str) -> Option<&'a Value> {
    map.get(name)
        .or_else(|| map.iter().find(|(k, _)| key_text(k) == name).map(|(_, v)| v))
}

/// Immutable child lookup for one segment.
pub fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Mapping(map), Segment::Key(name)) => find_key(map, name),
        (Value::Sequence(seq), Segment::Index(i)) => seq.get(*i),
        _ => None,
    }
}

/// Mutable child lookup for one segment.
pub fn child_mut<'a>(node: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (node, segment) {
        (Value::Mapping(map), Segment::Key(name)) => {
            let key = match map.get(name.as_str()) {
                Some(_) => Value::String(name.clone()),
                None => map.keys().find(|k| key_text(k) == *name)?.clone(),
            };
            map.get_mut(&key)
        }
        (Value::Sequence(seq), Segment::Index(i)) => seq.get_mut(*i),
        _ => None,
    }
}

pub fn lookup<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(doc, |node, seg| child(node, seg))
}

pub fn lookup_mut<'a>(doc: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    let mut node = doc;
    for seg in path.segments() {
        node = child_mut(node, seg)?;
    }
    Some(node)
}

/// Every scalar position in `doc`, depth-first in document order.
pub fn leaf_paths(doc: &Value) -> Vec<FieldPath> {
    fn walk(node: &Value, path: &mut FieldPath, out: &mut Vec<FieldPath>) {
        match node {
            Value::Mapping(map) => {
                for (k, v) in map {
                    path.push(Segment::from_key(k));
                    walk(v, path, out);
                    path.pop();
                }
            }
            Value::Sequence(seq) => {
                for (i, v) in seq.iter().enumerate() {
                    path.push(Segment::Index(i));
                    walk(v, path, out);
                    path.pop();
                }
            }
            _ => out.push(path.clone()),
        }
    }
    let mut out = Vec::new();
    walk(doc, &mut FieldPath::root(), &mut out);
    out
}

/// Short human rendering of a scalar (strings unquoted).
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "~".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
