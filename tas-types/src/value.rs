//! The tagged value stored under each Context Store key.

use crate::input_frame::InputFrame;

/// A single turn's compiled action spec plus its fake-attack count vector;
/// the unit the Branch Explorer hands to the Context Store for the
/// BattleTurnRunner program-kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattlePath {
    pub turns: Vec<TurnPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPlan {
    /// actor slot -> concrete target enemy bit, in actor order.
    pub targets: Vec<u8>,
    pub fake_attack_count: u32,
}

/// The tag discriminating which variant of [`TaggedValue`] is stored.
/// Stable numeric values so it can be written to the wire (§4.6 context
/// serialization: `{u16 key, u8 type_tag, payload}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueTag {
    U8 = 0,
    U16 = 1,
    U32 = 2,
    F32 = 3,
    F64 = 4,
    Bytes = 5,
    Frame = 6,
    BattlePath = 7,
}

impl ValueTag {
    pub fn from_u8(b: u8) -> Option<ValueTag> {
        Some(match b {
            0 => ValueTag::U8,
            1 => ValueTag::U16,
            2 => ValueTag::U32,
            3 => ValueTag::F32,
            4 => ValueTag::F64,
            5 => ValueTag::Bytes,
            6 => ValueTag::Frame,
            7 => ValueTag::BattlePath,
            _ => return None,
        })
    }
}

/// One of u8, u16, u32, f32, f64, byte-string, input-frame, or battle-path,
/// as enumerated in spec.md §3 Context Store.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Frame(InputFrame),
    BattlePath(BattlePath),
}

impl TaggedValue {
    pub fn tag(&self) -> ValueTag {
        match self {
            TaggedValue::U8(_) => ValueTag::U8,
            TaggedValue::U16(_) => ValueTag::U16,
            TaggedValue::U32(_) => ValueTag::U32,
            TaggedValue::F32(_) => ValueTag::F32,
            TaggedValue::F64(_) => ValueTag::F64,
            TaggedValue::Bytes(_) => ValueTag::Bytes,
            TaggedValue::Frame(_) => ValueTag::Frame,
            TaggedValue::BattlePath(_) => ValueTag::BattlePath,
        }
    }
}

/// Implements `TryFrom<&TaggedValue>`/`From<T>` pairs so `ContextStore::get<T>`
/// can be generic without a proc-macro.
macro_rules! scalar_conversions {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for TaggedValue {
                fn from(v: $ty) -> Self {
                    TaggedValue::$variant(v)
                }
            }

            impl<'a> TryFrom<&'a TaggedValue> for $ty {
                type Error = ();

                fn try_from(v: &'a TaggedValue) -> Result<Self, Self::Error> {
                    match v {
                        TaggedValue::$variant(x) => Ok(*x),
                        _ => Err(()),
                    }
                }
            }
        )+
    };
}

scalar_conversions! {
    U8 => u8,
    U16 => u16,
    U32 => u32,
    F32 => f32,
    F64 => f64,
    Frame => InputFrame,
}

impl From<Vec<u8>> for TaggedValue {
    fn from(v: Vec<u8>) -> Self {
        TaggedValue::Bytes(v)
    }
}

impl<'a> TryFrom<&'a TaggedValue> for Vec<u8> {
    type Error = ();

    fn try_from(v: &'a TaggedValue) -> Result<Self, Self::Error> {
        match v {
            TaggedValue::Bytes(b) => Ok(b.clone()),
            _ => Err(()),
        }
    }
}

impl From<BattlePath> for TaggedValue {
    fn from(v: BattlePath) -> Self {
        TaggedValue::BattlePath(v)
    }
}

impl<'a> TryFrom<&'a TaggedValue> for BattlePath {
    type Error = ();

    fn try_from(v: &'a TaggedValue) -> Result<Self, Self::Error> {
        match v {
            TaggedValue::BattlePath(b) => Ok(b.clone()),
            _ => Err(()),
        }
    }
}
