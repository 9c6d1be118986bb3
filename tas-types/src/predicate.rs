//! The packed predicate record.

/// Comparison operator applied between the lhs and the reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Cmp {
    Eq = 0,
    Ne = 1,
    Lt = 2,
    Le = 3,
    Gt = 4,
    Ge = 5,
}

impl Cmp {
    pub fn from_u8(b: u8) -> Option<Cmp> {
        Some(match b {
            0 => Cmp::Eq,
            1 => Cmp::Ne,
            2 => Cmp::Lt,
            3 => Cmp::Le,
            4 => Cmp::Gt,
            5 => Cmp::Ge,
            _ => return None,
        })
    }

    /// Applies the comparison over unsigned 64-bit operands.
    pub fn apply_u64(self, lhs: u64, rhs: u64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Ne => lhs != rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }

    /// Applies the comparison over f64 operands (width=8 float semantics).
    pub fn apply_f64(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Ne => lhs != rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }
}

/// `absolute` compares against `rhs` directly; `delta` compares against
/// `baseline + rhs` where the baseline was captured at a scripted
/// checkpoint (`capture-predicate-baselines`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PredicateKind {
    Absolute = 0,
    Delta = 1,
}

impl PredicateKind {
    pub fn from_u8(b: u8) -> Option<PredicateKind> {
        Some(match b {
            0 => PredicateKind::Absolute,
            1 => PredicateKind::Delta,
            _ => return None,
        })
    }
}

/// Byte width of the memory read; 8 means f64 semantics per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Width {
    W1 = 1,
    W2 = 2,
    W4 = 4,
    W8 = 8,
}

impl Width {
    pub fn from_u8(b: u8) -> Option<Width> {
        Some(match b {
            1 => Width::W1,
            2 => Width::W2,
            4 => Width::W4,
            8 => Width::W8,
            _ => return None,
        })
    }

    pub fn bytes(self) -> usize {
        self as u8 as usize
    }
}

bitflags::bitflags! {
    /// Flags bitset on a predicate record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PredicateFlags: u16 {
        const ACTIVE = 1 << 0;
        const CAPTURE_BASELINE_AT_TURN_START = 1 << 1;
        const LHS_IS_KEY = 1 << 2;
        const RHS_IS_KEY = 1 << 3;
        const LHS_IS_PROGRAM = 1 << 4;
        const RHS_IS_PROGRAM = 1 << 5;
        const EVALUATE_EVERY_TURN = 1 << 6;
    }
}

/// Packed 24-byte predicate record: `{id, required_bp_key, kind, width,
/// cmp, flags, addr, rhs}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredicateRecord {
    pub id: u16,
    pub required_bp_key: u16,
    pub kind: PredicateKind,
    pub width: Width,
    pub cmp: Cmp,
    pub flags: PredicateFlags,
    pub addr: u32,
    pub rhs: u64,
}

impl PredicateRecord {
    pub const WIRE_LEN: usize = 24;

    pub fn is_active(&self) -> bool {
        self.flags.contains(PredicateFlags::ACTIVE)
    }

    pub fn capture_baseline(&self) -> bool {
        self.flags
            .contains(PredicateFlags::CAPTURE_BASELINE_AT_TURN_START)
    }

    /// Field order matches spec.md §3; multi-byte fields are little-endian,
    /// matching the rest of the IPC wire protocol. This is
    /// distinct from `read-*` VM ops, which read emulated memory in the
    /// emulated platform's own big-endian layout.
    pub fn to_wire(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[0..2].copy_from_slice(&self.id.to_le_bytes());
        out[2..4].copy_from_slice(&self.required_bp_key.to_le_bytes());
        out[4] = self.kind as u8;
        out[5] = self.width as u8;
        out[6] = self.cmp as u8;
        out[7..9].copy_from_slice(&self.flags.bits().to_le_bytes());
        out[9..13].copy_from_slice(&self.addr.to_le_bytes());
        out[13..21].copy_from_slice(&self.rhs.to_le_bytes());
        // out[21..24] reserved, zero-filled.
        out
    }

    pub fn from_wire(b: &[u8; Self::WIRE_LEN]) -> Option<PredicateRecord> {
        Some(PredicateRecord {
            id: u16::from_le_bytes([b[0], b[1]]),
            required_bp_key: u16::from_le_bytes([b[2], b[3]]),
            kind: PredicateKind::from_u8(b[4])?,
            width: Width::from_u8(b[5])?,
            cmp: Cmp::from_u8(b[6])?,
            flags: PredicateFlags::from_bits_truncate(u16::from_le_bytes([b[7], b[8]])),
            addr: u32::from_le_bytes([b[9], b[10], b[11], b[12]]),
            rhs: u64::from_le_bytes(b[13..21].try_into().unwrap()),
        })
    }
}
