//! Filter AST types (RFC 7644 §3.4.2.2), per the Data Model in §3.

/// An ordered, dot-separated attribute path, e.g. `name.givenName`.
///
/// A segment may carry an attached bracket selector (`emails[type eq
/// "work"]`), which constrains a multi-valued segment to the elements
/// matching the selector before descent continues. This lets
/// `emails[type eq "work"].value` be represented as a single path used by
/// an enclosing [`FilterNode::Compare`] or [`FilterNode::Present`], while a
/// bracket expression with no enclosing comparison parses as a standalone
/// [`FilterNode::Complex`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttrPath {
    pub segments: Vec<PathSegment>,
}

impl AttrPath {
    /// Build a plain path with no selectors, from segment names.
    pub fn simple<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: names
                .into_iter()
                .map(|name| PathSegment {
                    name: name.into(),
                    selector: None,
                })
                .collect(),
        }
    }

    /// A human-readable rendering, used in error messages and logs.
    pub fn display(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// One segment of an [`AttrPath`], optionally gated by a bracket selector.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,
    pub selector: Option<Box<FilterNode>>,
}

/// Comparison operators, RFC 7644 §3.4.2.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A literal value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `path op value`
    Compare {
        path: AttrPath,
        op: CompareOp,
        value: Literal,
    },
    /// `path pr`
    Present { path: AttrPath },
    /// `left and right`
    And(Box<FilterNode>, Box<FilterNode>),
    /// `left or right`
    Or(Box<FilterNode>, Box<FilterNode>),
    /// `not inner`
    Not(Box<FilterNode>),
    /// `path[predicate]` or `path[predicate].sub`, used standalone (no
    /// enclosing comparison or presence check).
    Complex {
        path: AttrPath,
        predicate: Box<FilterNode>,
        sub: Option<String>,
    },
}
