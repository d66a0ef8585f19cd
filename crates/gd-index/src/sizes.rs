//! Per-(object, configuration) state size counters.

/// Counts of state entries, root functions and Jacobian nonzeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSizes {
    /// Differential states.
    pub diff_size: usize,
    /// Algebraic states other than voltages and angles.
    pub alg_size: usize,
    /// Voltage states.
    pub v_size: usize,
    /// Angle states.
    pub a_size: usize,
    /// Roots on purely differential states.
    pub diff_roots: usize,
    /// Roots depending on algebraic states.
    pub alg_roots: usize,
    /// Upper bound on Jacobian nonzeros.
    pub jac_size: usize,
}

impl StateSizes {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn state_reset(&mut self) {
        self.diff_size = 0;
        self.alg_size = 0;
        self.v_size = 0;
        self.a_size = 0;
    }

    pub fn root_and_jacobian_reset(&mut self) {
        self.diff_roots = 0;
        self.alg_roots = 0;
        self.jac_size = 0;
    }

    pub fn add(&mut self, other: &StateSizes) {
        self.add_state_sizes(other);
        self.add_root_and_jacobian_sizes(other);
    }

    pub fn add_state_sizes(&mut self, other: &StateSizes) {
        self.diff_size += other.diff_size;
        self.alg_size += other.alg_size;
        self.v_size += other.v_size;
        self.a_size += other.a_size;
    }

    pub fn add_root_and_jacobian_sizes(&mut self, other: &StateSizes) {
        self.diff_roots += other.diff_roots;
        self.alg_roots += other.alg_roots;
        self.jac_size += other.jac_size;
    }

    /// Entries in the algebraic array: voltages, angles and other algebraic states.
    pub fn algebraic_count(&self) -> usize {
        self.v_size + self.a_size + self.alg_size
    }

    pub fn state_count(&self) -> usize {
        self.algebraic_count() + self.diff_size
    }

    pub fn root_count(&self) -> usize {
        self.alg_roots + self.diff_roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StateSizes {
        StateSizes {
            diff_size: 2,
            alg_size: 3,
            v_size: 1,
            a_size: 1,
            diff_roots: 1,
            alg_roots: 2,
            jac_size: 11,
        }
    }

    #[test]
    fn partial_resets_leave_other_fields() {
        let mut s = sample();
        s.state_reset();
        assert_eq!(s.state_count(), 0);
        assert_eq!(s.root_count(), 3);
        assert_eq!(s.jac_size, 11);

        let mut s = sample();
        s.root_and_jacobian_reset();
        assert_eq!(s.state_count(), 7);
        assert_eq!(s.root_count(), 0);
        assert_eq!(s.jac_size, 0);
    }

    #[test]
    fn add_accumulates_fieldwise() {
        let mut acc = StateSizes::default();
        acc.add(&sample());
        acc.add(&sample());
        assert_eq!(acc.alg_size, 6);
        assert_eq!(acc.jac_size, 22);

        let mut states_only = StateSizes::default();
        states_only.add_state_sizes(&sample());
        assert_eq!(states_only.state_count(), 7);
        assert_eq!(states_only.root_count(), 0);
    }
}
