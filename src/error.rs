use serde::Serialize;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_EXPRESSION: &str = "S-ERR-EXPR-001";
pub const ERR_SHAPE: &str = "S-ERR-SHAPE-001";
pub const ERR_ASSIGNMENT: &str = "S-ERR-SET-001";
pub const ERR_COMPONENT: &str = "S-ERR-COMPONENT-001";
pub const ERR_PARSE: &str = "S-ERR-PARSE-001";

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure reported by an expression gateway.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExprError {
    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("type error: {message}")]
    Type { message: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors produced during a render pass.
///
/// Everything except [`RenderError::Parse`] is non-fatal: it is collected in
/// [`crate::Rendered::errors`] and the offending subtree degrades.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderError {
    /// A condition, loop source or interpolation failed to evaluate.
    #[error("{directive} `{expr}` (key {key}): {source}")]
    Expression {
        directive: String,
        expr: String,
        key: u64,
        source: ExprError,
    },

    /// A loop source evaluated to something that is not a sequence.
    #[error("cannot convert {found} to array (from `{expr}`)")]
    Shape { expr: String, found: String },

    /// An `s:set` value failed to evaluate; the raw value was stored instead.
    #[error("set {name} = `{expr}`: {source}")]
    Assignment {
        name: String,
        expr: String,
        source: ExprError,
    },

    /// The component loader rejected a node.
    #[error("component {name}: {message}")]
    Component { name: String, message: String },

    /// Markup could not be read. Fatal.
    #[error("failed to parse markup: {message}")]
    Parse { message: String },
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::Expression { .. } => ERR_EXPRESSION,
            RenderError::Shape { .. } => ERR_SHAPE,
            RenderError::Assignment { .. } => ERR_ASSIGNMENT,
            RenderError::Component { .. } => ERR_COMPONENT,
            RenderError::Parse { .. } => ERR_PARSE,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Parse { .. })
    }
}
