//! Per-object operation flags.

use std::fmt;

/// Bit positions in an [`OpFlags`] set.
///
/// Positions 1 through 9 are capabilities that a container reports as the
/// union of its own and its children's bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpFlag {
    HasUpdates = 0,
    HasConstraints = 1,
    HasRoots = 2,
    HasAlgRoots = 3,
    HasPowerflowAdjustments = 4,
    PreExRequested = 5,
    UsesBusFrequency = 6,
    HasPflowStates = 7,
    HasDynStates = 8,
    HasDifferentialStates = 9,
    /// Spare capability bit kept by the object itself.
    Extra = 10,
    PflowInitialized = 17,
    DynInitialized = 18,
    ObjectArmed = 19,
    Error = 23,
    StateChange = 24,
    ObjectChange = 25,
    ConstraintChange = 26,
    RootChange = 27,
    JacobianCountChange = 28,
    SlackBusChange = 29,
    VoltageControlChange = 30,
    ConnectivityChange = 31,
    NoPflowStates = 44,
    NoDynStates = 45,
    DisableFlagUpdates = 46,
    FlagUpdateRequired = 47,
    Disconnected = 49,
}

impl OpFlag {
    pub const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }

    pub const fn is_cascading(self) -> bool {
        OpFlags::CASCADING.0 & self.bit() != 0
    }

    /// Flag recorded by the object whose condition changed.
    pub const fn is_change(self) -> bool {
        OpFlags::CHANGES.0 & self.bit() != 0
    }
}

/// Fixed-width flag set.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpFlags(u64);

impl OpFlags {
    /// Capability bits propagated to containers.
    pub const CASCADING: OpFlags = OpFlags(0x3FE);

    /// Bits 24..=31 recording that some condition changed.
    pub const CHANGES: OpFlags = OpFlags(0xFF00_0000);

    pub const fn empty() -> Self {
        OpFlags(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        OpFlags(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn contains(self, flag: OpFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn set(&mut self, flag: OpFlag) {
        self.0 |= flag.bit();
    }

    pub fn clear(&mut self, flag: OpFlag) {
        self.0 &= !flag.bit();
    }

    pub fn assign(&mut self, flag: OpFlag, value: bool) {
        if value {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    pub fn union(self, other: OpFlags) -> OpFlags {
        OpFlags(self.0 | other.0)
    }

    pub fn cascading(self) -> OpFlags {
        OpFlags(self.0 & Self::CASCADING.0)
    }

    /// Replace the cascading bits, keep everything else.
    pub fn with_cascading(self, cascading: OpFlags) -> OpFlags {
        OpFlags((self.0 & !Self::CASCADING.0) | cascading.cascading().0)
    }

    pub fn clear_changes(&mut self) {
        self.0 &= !Self::CHANGES.0;
    }
}

impl fmt::Debug for OpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpFlags({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascading_range() {
        assert!(!OpFlag::HasUpdates.is_cascading());
        assert!(OpFlag::HasConstraints.is_cascading());
        assert!(OpFlag::HasDifferentialStates.is_cascading());
        assert!(!OpFlag::Extra.is_cascading());
        assert!(!OpFlag::ObjectArmed.is_cascading());
        assert!(OpFlag::ConnectivityChange.is_change());
        assert!(!OpFlag::HasRoots.is_change());
    }

    #[test]
    fn set_and_clear() {
        let mut flags = OpFlags::empty();
        flags.set(OpFlag::HasRoots);
        flags.set(OpFlag::ObjectArmed);
        assert!(flags.contains(OpFlag::HasRoots));
        assert_eq!(flags.cascading().bits(), OpFlag::HasRoots.bit());
        flags.assign(OpFlag::HasRoots, false);
        assert!(!flags.contains(OpFlag::HasRoots));
        assert!(flags.contains(OpFlag::ObjectArmed));
    }

    #[test]
    fn with_cascading_keeps_local_bits() {
        let mut own = OpFlags::empty();
        own.set(OpFlag::ObjectArmed);
        own.set(OpFlag::HasRoots);
        let mut child = OpFlags::empty();
        child.set(OpFlag::HasDynStates);
        child.set(OpFlag::PflowInitialized);
        child.set(OpFlag::Extra);
        let merged = own.with_cascading(child);
        assert!(merged.contains(OpFlag::ObjectArmed));
        assert!(merged.contains(OpFlag::HasDynStates));
        assert!(!merged.contains(OpFlag::HasRoots));
        assert!(!merged.contains(OpFlag::PflowInitialized));
        assert!(!merged.contains(OpFlag::Extra));
    }

    #[test]
    fn clear_changes_only_touches_change_bits() {
        let mut flags = OpFlags::empty();
        flags.set(OpFlag::StateChange);
        flags.set(OpFlag::ConnectivityChange);
        flags.set(OpFlag::HasRoots);
        flags.clear_changes();
        assert_eq!(flags.bits(), OpFlag::HasRoots.bit());
    }
}
