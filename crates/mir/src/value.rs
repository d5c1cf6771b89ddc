//! # MIR Values
//!
//! This module defines values and operands in the MIR system.
//! Values represent data that flows through the program.

use crate::PrettyPrint;

/// Represents any value in the program: literals, variables, temporaries, etc.
///
/// Values in MIR can be either immediate constants or references to computed values.
/// This design supports both efficient constant propagation and general computation.
///
/// # Design Notes
///
/// - Literals are embedded directly for efficiency
/// - Operands reference values computed by instructions
/// - The type is Copy for efficient passing around
/// - Error values support graceful error recovery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum Value {
    /// A constant literal value
    /// These are embedded directly for efficient constant propagation
    Literal(Literal),

    /// An operand that references a computed value (variable, temporary, etc.)
    /// The `ValueId` points to the instruction that produces this value
    Operand(crate::ValueId),

    /// A placeholder for unresolved or error values
    /// Also produced when a promoted slot is read before any store reaches it
    Error,
}

/// Literal constant values
///
/// These represent compile-time known constants that can be embedded
/// directly in the MIR without requiring computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum Literal {
    /// Integer literal
    Integer(i64),

    /// Boolean literal
    Boolean(bool),

    /// The null address constant
    ///
    /// Stack slot addresses are never null, which is what lets the
    /// optimizer fold comparisons against this literal.
    Null,

    /// Unit value (void, empty tuple)
    Unit,
}

impl Value {
    /// Creates a new integer literal value
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Creates a new boolean literal value
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }

    /// Creates the null address constant
    pub const fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    /// Creates the unit value
    pub const fn unit() -> Self {
        Self::Literal(Literal::Unit)
    }

    /// Creates a new operand value
    pub const fn operand(id: crate::ValueId) -> Self {
        Self::Operand(id)
    }

    /// Creates an error value for error recovery
    pub const fn error() -> Self {
        Self::Error
    }

    /// Returns true if this is the null address constant
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Literal(Literal::Null))
    }

    /// Attempts to evaluate this value as a constant, non-negative index
    ///
    /// This is the shape a field projection's index operand must have for
    /// the owning aggregate to be expandable.
    pub const fn as_const_index(&self) -> Option<usize> {
        match self {
            Self::Literal(Literal::Integer(value)) if *value >= 0 => Some(*value as usize),
            _ => None,
        }
    }
}

impl PrettyPrint for Value {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Literal(lit) => lit.pretty_print(0),
            Self::Operand(id) => format!("%{}", id.index()),
            Self::Error => "<error>".to_string(),
        }
    }
}

impl PrettyPrint for Literal {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Boolean(value) => value.to_string(),
            Self::Null => "null".to_string(),
            Self::Unit => "()".to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}
