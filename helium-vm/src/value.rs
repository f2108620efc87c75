// helium-vm - Bytecode model and compiler for the Helium scripting language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tagged values for the constant pool.
//!
//! The compiler stores literals and nested function programs as opaque
//! tagged values. Values are immutable once inserted into a pool.

use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::program::Program;

/// A host callback: receives the call's arguments, returns one value.
pub type NativeFn = fn(&[Value]) -> Value;

/// A constant pool entry.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(SmolStr),
    Null,
    /// A nested function body, or a native callback wrapper.
    Program(Rc<Program>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            // Compare floats by bits so pools can be compared exactly.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Program(a), Value::Program(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Null => write!(f, "null"),
            Value::Program(p) if p.native.is_some() => write!(f, "#<native {}>", p.argc),
            Value::Program(p) => write!(f, "#<program {}>", p.argc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str(SmolStr::new("hi")).to_string(), "\"hi\"");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    }
}
