//! Composable SQL templates.
//!
//! A [`Template`] stores literal SQL segments and interpolated parameters
//! separately, so fragments can be merged without manually tracking
//! placeholder indices. Placeholder text is generated later by the
//! [renderer](crate::render), per dialect.
//!
//! # Example
//!
//! ```ignore
//! use sqlstitch::template::{sql, bind, ident};
//!
//! let mut q = sql("SELECT * FROM ");
//! q.push_bind(ident("users"));
//! q.push(" WHERE status = ").push_bind(bind("active"));
//! ```

use crate::value::Value;

/// A dialect-resolvable builtin expression.
///
/// Builtins render as literal SQL text and never become bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// The current timestamp at statement execution time.
    CurrentTimestamp,
    /// The current date at statement execution time.
    CurrentDate,
    /// A dialect-native random number expression.
    Random,
}

/// An interpolated template parameter.
///
/// The closed set of things that may appear between literal segments: a
/// plain bound [`Value`], an identifier to be dialect-quoted, or a
/// [`Builtin`] resolved to literal SQL at render time. User data can never
/// collide with the marker variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A plain value, bound as a positional parameter.
    Value(Value),
    /// An identifier (optionally dotted, e.g. `users.id`), quoted per dialect.
    Ident(String),
    /// A builtin expression, spliced inline.
    Builtin(Builtin),
}

impl Param {
    /// Check if this parameter is an identifier marker.
    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Ident(_))
    }

    /// Check if this parameter is a builtin marker.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }
}

impl From<Value> for Param {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Builtin> for Param {
    fn from(b: Builtin) -> Self {
        Self::Builtin(b)
    }
}

/// Wrap a plain value as a bound parameter.
pub fn bind(value: impl Into<Value>) -> Param {
    Param::Value(value.into())
}

/// Mark a name as an identifier to be quoted at render time.
pub fn ident(name: impl Into<String>) -> Param {
    Param::Ident(name.into())
}

/// Mark a builtin expression to be resolved at render time.
pub fn builtin(b: Builtin) -> Param {
    Param::Builtin(b)
}

/// Start building a template from an initial SQL fragment.
pub fn sql(initial: impl Into<String>) -> Template {
    Template::new(initial)
}

/// A composable SQL template.
///
/// Stores `n + 1` literal segments interleaved with `n` parameters. The
/// structural invariant `segments.len() == params.len() + 1` holds after
/// every operation; parameter order is the flattened left-to-right order of
/// composition and determines final positional placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<String>,
    params: Vec<Param>,
}

impl Template {
    /// Create a template with an initial literal segment.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            segments: vec![initial.into()],
            params: Vec::new(),
        }
    }

    /// Create an empty template.
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Append literal SQL text (no parameter).
    pub fn push(&mut self, text: &str) -> &mut Self {
        if !text.is_empty() {
            // last segment always exists by the structural invariant
            if let Some(last) = self.segments.last_mut() {
                last.push_str(text);
            }
        }
        self
    }

    /// Append a parameter (value, identifier or builtin).
    pub fn push_bind(&mut self, param: impl Into<Param>) -> &mut Self {
        self.params.push(param.into());
        self.segments.push(String::new());
        self
    }

    /// Append a comma-separated list of bound values.
    ///
    /// If `values` is empty, this appends `NULL` (so `IN (NULL)` is valid SQL).
    pub fn push_bind_list<T>(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self
    where
        T: Into<Value>,
    {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return self.push("NULL");
        };

        self.push_bind(bind(first));
        for v in iter {
            self.push(", ");
            self.push_bind(bind(v));
        }
        self
    }

    /// Merge a fragment into this template.
    ///
    /// The fragment's first literal segment is appended onto this template's
    /// last segment (adjacent literal text concatenates without an
    /// intervening placeholder), then the fragment's remaining
    /// (parameter, segment) pairs follow in order. The fragment is only read;
    /// all mutation happens on `self`.
    pub fn merge(&mut self, fragment: &Template) -> &mut Self {
        let mut segments = fragment.segments.iter();
        if let Some(first) = segments.next() {
            self.push(first);
        }
        for (param, segment) in fragment.params.iter().zip(segments) {
            self.params.push(param.clone());
            self.segments.push(segment.clone());
        }
        self
    }

    /// The literal segments, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The interpolated parameters, in order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Check if this template holds no text and no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.segments.iter().all(|s| s.is_empty())
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::empty()
    }
}
