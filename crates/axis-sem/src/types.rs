//! The closed type set (§3 of the language contract).

use axis_par::ast::TypeName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    Str,
    Ptr,
    Void,
}

impl Type {
    /// Storage/register width in bytes. `bool` is 1 byte in storage; the
    /// code generator widens it to 4/8 in registers, but that's a codegen
    /// concern, not a type-system one.
    pub fn size(self) -> i32 {
        match self {
            Type::I8 | Type::U8 | Type::Bool => 1,
            Type::I16 | Type::U16 => 2,
            Type::I32 | Type::U32 => 4,
            Type::I64 | Type::U64 | Type::Str | Type::Ptr => 8,
            Type::Void => 0,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::U8 | Type::U16 | Type::U32 | Type::U64
        )
    }

    /// The inclusive range of values this type can represent, used to check
    /// integer literals at their point of use.
    pub fn int_range(self) -> Option<(i128, i128)> {
        Some(match self {
            Type::I8 => (i8::MIN as i128, i8::MAX as i128),
            Type::I16 => (i16::MIN as i128, i16::MAX as i128),
            Type::I32 => (i32::MIN as i128, i32::MAX as i128),
            Type::I64 => (i64::MIN as i128, i64::MAX as i128),
            Type::U8 => (0, u8::MAX as i128),
            Type::U16 => (0, u16::MAX as i128),
            Type::U32 => (0, u32::MAX as i128),
            Type::U64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

impl From<TypeName> for Type {
    fn from(t: TypeName) -> Type {
        match t {
            TypeName::I8 => Type::I8,
            TypeName::I16 => Type::I16,
            TypeName::I32 => Type::I32,
            TypeName::I64 => Type::I64,
            TypeName::U8 => Type::U8,
            TypeName::U16 => Type::U16,
            TypeName::U32 => Type::U32,
            TypeName::U64 => Type::U64,
            TypeName::Bool => Type::Bool,
            TypeName::Str => Type::Str,
            TypeName::Ptr => Type::Ptr,
            TypeName::Void => Type::Void,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::Bool => "bool",
            Type::Str => "str",
            Type::Ptr => "ptr",
            Type::Void => "void",
        };
        f.write_str(s)
    }
}
