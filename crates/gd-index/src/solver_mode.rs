//! Solver configurations and slot allocation.

/// One indexing scheme under which the object tree is mapped onto flat arrays.
///
/// The `offset_index` slot selects the matching record in every
/// [`OffsetTable`](crate::OffsetTable) without a map lookup. Two modes with
/// different slots are distinct even when every other field is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverMode {
    pub offset_index: usize,
    /// Object-local bookkeeping rather than a solver array.
    pub local: bool,
    pub dynamic: bool,
    pub algebraic: bool,
    pub differential: bool,
    /// Extended state set (e.g. power-flow with extra control states).
    pub extended: bool,
    /// Slot of the configuration supplying the category this one lacks.
    pub paired_offset_index: Option<usize>,
}

impl SolverMode {
    pub const LOCAL: SolverMode = SolverMode {
        offset_index: 0,
        local: true,
        dynamic: false,
        algebraic: true,
        differential: true,
        extended: false,
        paired_offset_index: None,
    };

    pub const POWER_FLOW: SolverMode = SolverMode {
        offset_index: 1,
        local: false,
        dynamic: false,
        algebraic: true,
        differential: false,
        extended: false,
        paired_offset_index: None,
    };

    pub const DAE: SolverMode = SolverMode {
        offset_index: 2,
        local: false,
        dynamic: true,
        algebraic: true,
        differential: true,
        extended: false,
        paired_offset_index: None,
    };

    pub const DYN_ALGEBRAIC: SolverMode = SolverMode {
        offset_index: 3,
        local: false,
        dynamic: true,
        algebraic: true,
        differential: false,
        extended: false,
        paired_offset_index: Some(4),
    };

    pub const DYN_DIFFERENTIAL: SolverMode = SolverMode {
        offset_index: 4,
        local: false,
        dynamic: true,
        algebraic: false,
        differential: true,
        extended: false,
        paired_offset_index: Some(3),
    };

    /// Number of slots reserved by the predefined modes.
    pub const PREDEFINED: usize = 5;

    /// A static algebraic mode at the given slot.
    pub const fn new(offset_index: usize) -> Self {
        Self {
            offset_index,
            local: false,
            dynamic: false,
            algebraic: true,
            differential: false,
            extended: false,
            paired_offset_index: None,
        }
    }

    /// Same semantics at a different slot.
    pub fn with_index(self, offset_index: usize) -> Self {
        Self {
            offset_index,
            ..self
        }
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn has_algebraic(&self) -> bool {
        self.algebraic
    }

    pub fn has_differential(&self) -> bool {
        self.differential
    }

    /// Algebraic and differential states share one dynamic array.
    pub fn is_dae(&self) -> bool {
        self.dynamic && self.algebraic && self.differential && !self.local
    }

    pub fn is_algebraic_only(&self) -> bool {
        self.algebraic && !self.differential
    }

    pub fn is_differential_only(&self) -> bool {
        self.differential && !self.algebraic
    }

    /// Compare everything except the slot (and the pairing, which is slot-derived).
    pub fn matches_except_index(&self, other: &SolverMode) -> bool {
        self.local == other.local
            && self.dynamic == other.dynamic
            && self.algebraic == other.algebraic
            && self.differential == other.differential
            && self.extended == other.extended
    }
}

impl Default for SolverMode {
    fn default() -> Self {
        Self::LOCAL
    }
}

/// Hands out slot indices for solver configurations.
///
/// The predefined modes occupy slots `0..SolverMode::PREDEFINED`; every
/// registration after that receives the next free slot.
#[derive(Debug, Clone)]
pub struct SolverModeRegistry {
    modes: Vec<SolverMode>,
}

impl SolverModeRegistry {
    pub fn new() -> Self {
        Self {
            modes: vec![
                SolverMode::LOCAL,
                SolverMode::POWER_FLOW,
                SolverMode::DAE,
                SolverMode::DYN_ALGEBRAIC,
                SolverMode::DYN_DIFFERENTIAL,
            ],
        }
    }

    /// Register a configuration modelled on `template` at a fresh slot.
    pub fn register(&mut self, template: SolverMode) -> SolverMode {
        let mode = template.with_index(self.modes.len());
        self.modes.push(mode);
        mode
    }

    /// Register an algebraic/differential pair pointing at each other.
    pub fn register_pair(
        &mut self,
        algebraic: SolverMode,
        differential: SolverMode,
    ) -> (SolverMode, SolverMode) {
        let alg_slot = self.modes.len();
        let diff_slot = alg_slot + 1;
        let alg = SolverMode {
            offset_index: alg_slot,
            paired_offset_index: Some(diff_slot),
            ..algebraic
        };
        let diff = SolverMode {
            offset_index: diff_slot,
            paired_offset_index: Some(alg_slot),
            ..differential
        };
        self.modes.push(alg);
        self.modes.push(diff);
        (alg, diff)
    }

    pub fn get(&self, index: usize) -> Option<&SolverMode> {
        self.modes.get(index)
    }

    /// First registered mode matching `target` in everything but the slot.
    pub fn find(&self, target: &SolverMode) -> Option<&SolverMode> {
        self.modes.iter().find(|m| m.matches_except_index(target))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SolverMode> {
        self.modes.iter()
    }
}

impl Default for SolverModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
