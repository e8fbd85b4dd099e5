//! Schema-driven binary codec for record payloads.

mod schema;
mod value;

pub use schema::{Field, FieldType, Schema};
pub use value::{decode_record, decode_value, encode_record, encode_value, Value};

impl FieldType {
    /// Maps a registration-time type tag to its primitive field type.
    ///
    /// Only primitive tags are representable here: `Array` (15) and any
    /// unrecognized tag are rejected by the caller with
    /// [`crate::error::Error::UnsupportedSchema`], per the registry's rule
    /// that a dynamically declared command may not itself contain a nested
    /// array.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Null,
            1 => Self::Byte,
            2 => Self::Word,
            3 => Self::Dword,
            4 => Self::Qword,
            5 => Self::SignedByte,
            6 => Self::SignedWord,
            7 => Self::SignedDword,
            8 => Self::SignedQword,
            9 => Self::Single,
            10 => Self::Double,
            11 => Self::Boolean,
            12 => Self::Guid,
            13 => Self::String,
            14 => Self::Binary,
            _ => return None,
        })
    }
}
