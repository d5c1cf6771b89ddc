//! # MIR Type System
//!
//! This module defines a simplified type system for MIR. It provides the type
//! information the optimization passes need (scalar vs. aggregate, pointee
//! types, field layout) while remaining self-contained.

/// A simplified type representation for MIR
///
/// This is a lifetime-free representation of types that can be stored
/// alongside MIR values. It contains enough information for basic type
/// checking and optimization within the MIR layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MirType {
    /// Signed integer type
    Int,

    /// Boolean type
    Bool,

    /// Floating-point type
    Float,

    /// Pointer to memory containing values of `element` type
    ///
    /// This lets the passes propagate pointee information without a
    /// separate layout table: a stack slot's address value is typed as a
    /// pointer to the allocated type.
    Pointer { element: Box<MirType> },

    /// Fixed-lane SIMD vector of a scalar element type
    Vector { element: Box<MirType>, lanes: usize },

    /// Aggregate type with positional fields
    ///
    /// Field identity is purely positional: field `i` is the `i`-th element.
    /// There are no field names, no overlapping fields and no
    /// variable-length tail.
    Aggregate(Vec<MirType>),

    /// Unit type (no value)
    Unit,

    /// Unknown type (for incomplete analysis)
    Unknown,
}

impl MirType {
    /// Creates an integer type
    pub const fn int() -> Self {
        Self::Int
    }

    /// Creates a boolean type
    pub const fn bool() -> Self {
        Self::Bool
    }

    /// Creates a floating-point type
    pub const fn float() -> Self {
        Self::Float
    }

    /// Creates a pointer type
    pub fn pointer(element: Self) -> Self {
        Self::Pointer {
            element: Box::new(element),
        }
    }

    /// Creates a vector type
    pub fn vector(element: Self, lanes: usize) -> Self {
        Self::Vector {
            element: Box::new(element),
            lanes,
        }
    }

    /// Creates an aggregate type from its field types, in declaration order
    pub const fn aggregate(fields: Vec<Self>) -> Self {
        Self::Aggregate(fields)
    }

    /// Creates a unit type
    pub const fn unit() -> Self {
        Self::Unit
    }

    /// Creates an unknown type
    pub const fn unknown() -> Self {
        Self::Unknown
    }

    /// Returns true if this is a numeric type
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Bool | Self::Float)
    }

    /// Returns true if this is a scalar-like type: numeric, pointer, or a
    /// vector of such
    ///
    /// Only slots of scalar-like type can be promoted to SSA values.
    pub fn is_scalar(&self) -> bool {
        match self {
            Self::Int | Self::Bool | Self::Float | Self::Pointer { .. } => true,
            Self::Vector { element, .. } => {
                element.is_numeric() || matches!(element.as_ref(), Self::Pointer { .. })
            }
            _ => false,
        }
    }

    /// Returns true if this is an aggregate type
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }

    /// Returns the field types if this is an aggregate
    pub fn field_types(&self) -> Option<&[Self]> {
        match self {
            Self::Aggregate(fields) => Some(fields),
            _ => None,
        }
    }

    /// Gets the type of an aggregate field by positional index
    /// Returns None if the index is out of bounds or this is not an aggregate
    pub fn field_type(&self, index: usize) -> Option<&Self> {
        match self {
            Self::Aggregate(fields) => fields.get(index),
            _ => None,
        }
    }

    /// Returns the number of fields for an aggregate, zero otherwise
    pub fn field_count(&self) -> usize {
        match self {
            Self::Aggregate(fields) => fields.len(),
            _ => 0,
        }
    }

    /// Returns the pointer element type if this is a pointer
    pub fn pointer_element_type(&self) -> Option<&Self> {
        match self {
            Self::Pointer { element } => Some(element.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for MirType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::Float => write!(f, "float"),
            Self::Pointer { element } => {
                write!(f, "{element}*")
            }
            Self::Vector { element, lanes } => {
                write!(f, "<{lanes} x {element}>")
            }
            Self::Aggregate(fields) => {
                write!(f, "{{")?;
                for (i, ty) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, "}}")
            }
            Self::Unit => write!(f, "()"),
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}
