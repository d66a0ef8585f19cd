//! Alert codes raised by components toward their container.

use crate::flags::OpFlag;
use gd_core::ObjectId;

/// Kind of change or condition reported upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    StateCountChange,
    StateCountIncrease,
    StateCountDecrease,
    StateIdentityChange,
    RootCountChange,
    RootCountIncrease,
    RootCountDecrease,
    JacCountChange,
    JacCountIncrease,
    JacCountDecrease,
    ObjectCountChange,
    ObjectCountIncrease,
    ObjectCountDecrease,
    ConstraintCountChange,
    ConnectivityChange,
    FlagChange,
    InvalidState,
    InitializationFailure,
    SlackBusChange,
    VoltageControlChange,
    PotentialFaultChange,
    VeryLowVoltage,
    UpdateRequired,
    UpdateNotRequired,
    SingleStepRequired,
    SingleStepNotRequired,
}

/// Which part of a receiver's offset records an alert makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    None,
    /// Root and Jacobian counts, and the placement derived from them.
    RootsAndJacobian,
    /// State counts, and the placement derived from them.
    States,
    /// Everything, as after a topology change.
    All,
}

/// How a container reacts to an alert from a descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Forward the alert unchanged to the container's own parent.
    pub cascade: bool,
    pub invalidates: Invalidation,
    /// Recompute aggregated capability flags.
    pub refresh_flags: bool,
    /// Change bit recorded on the receiving container, if any.
    pub marks: Option<OpFlag>,
}

impl AlertPolicy {
    const fn new(cascade: bool, invalidates: Invalidation) -> Self {
        Self {
            cascade,
            invalidates,
            refresh_flags: false,
            marks: None,
        }
    }

    const fn refreshing(mut self) -> Self {
        self.refresh_flags = true;
        self
    }

    const fn marking(mut self, flag: OpFlag) -> Self {
        self.marks = Some(flag);
        self
    }
}

impl AlertKind {
    pub const ALL: [AlertKind; 26] = [
        AlertKind::StateCountChange,
        AlertKind::StateCountIncrease,
        AlertKind::StateCountDecrease,
        AlertKind::StateIdentityChange,
        AlertKind::RootCountChange,
        AlertKind::RootCountIncrease,
        AlertKind::RootCountDecrease,
        AlertKind::JacCountChange,
        AlertKind::JacCountIncrease,
        AlertKind::JacCountDecrease,
        AlertKind::ObjectCountChange,
        AlertKind::ObjectCountIncrease,
        AlertKind::ObjectCountDecrease,
        AlertKind::ConstraintCountChange,
        AlertKind::ConnectivityChange,
        AlertKind::FlagChange,
        AlertKind::InvalidState,
        AlertKind::InitializationFailure,
        AlertKind::SlackBusChange,
        AlertKind::VoltageControlChange,
        AlertKind::PotentialFaultChange,
        AlertKind::VeryLowVoltage,
        AlertKind::UpdateRequired,
        AlertKind::UpdateNotRequired,
        AlertKind::SingleStepRequired,
        AlertKind::SingleStepNotRequired,
    ];

    /// Dispatch table entry for this kind.
    pub const fn policy(self) -> AlertPolicy {
        use AlertKind::*;
        use Invalidation as I;
        match self {
            StateCountChange | StateCountIncrease | StateCountDecrease | StateIdentityChange => {
                AlertPolicy::new(true, I::States)
                    .refreshing()
                    .marking(OpFlag::StateChange)
            }
            RootCountChange | RootCountIncrease | RootCountDecrease => {
                AlertPolicy::new(true, I::RootsAndJacobian)
                    .refreshing()
                    .marking(OpFlag::RootChange)
            }
            JacCountChange | JacCountIncrease | JacCountDecrease => {
                AlertPolicy::new(true, I::RootsAndJacobian).marking(OpFlag::JacobianCountChange)
            }
            ObjectCountChange | ObjectCountIncrease | ObjectCountDecrease => {
                AlertPolicy::new(true, I::All)
                    .refreshing()
                    .marking(OpFlag::ObjectChange)
            }
            ConstraintCountChange => AlertPolicy::new(true, I::None)
                .refreshing()
                .marking(OpFlag::ConstraintChange),
            ConnectivityChange => {
                AlertPolicy::new(true, I::None).marking(OpFlag::ConnectivityChange)
            }
            SlackBusChange => AlertPolicy::new(true, I::None).marking(OpFlag::SlackBusChange),
            VoltageControlChange => {
                AlertPolicy::new(true, I::None).marking(OpFlag::VoltageControlChange)
            }
            InvalidState | InitializationFailure | PotentialFaultChange | VeryLowVoltage => {
                AlertPolicy::new(true, I::None)
            }
            // Re-raised by the receiver only if its own aggregate changed.
            FlagChange => AlertPolicy::new(false, I::None).refreshing(),
            UpdateRequired | UpdateNotRequired | SingleStepRequired | SingleStepNotRequired => {
                AlertPolicy::new(false, I::None)
            }
        }
    }

    pub fn cascades(self) -> bool {
        self.policy().cascade
    }
}

/// One alert together with the object that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvent {
    pub source: ObjectId,
    pub kind: AlertKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_kinds_cascade() {
        for kind in [
            AlertKind::StateCountChange,
            AlertKind::RootCountIncrease,
            AlertKind::JacCountDecrease,
            AlertKind::ObjectCountChange,
            AlertKind::ConnectivityChange,
        ] {
            assert!(kind.cascades(), "{kind:?}");
        }
    }

    #[test]
    fn local_kinds_are_absorbed() {
        for kind in [
            AlertKind::UpdateRequired,
            AlertKind::UpdateNotRequired,
            AlertKind::SingleStepRequired,
            AlertKind::SingleStepNotRequired,
            AlertKind::FlagChange,
        ] {
            assert!(!kind.cascades(), "{kind:?}");
        }
    }

    #[test]
    fn invalidation_matches_category() {
        assert_eq!(
            AlertKind::StateCountDecrease.policy().invalidates,
            Invalidation::States
        );
        assert_eq!(
            AlertKind::JacCountChange.policy().invalidates,
            Invalidation::RootsAndJacobian
        );
        assert_eq!(
            AlertKind::ObjectCountIncrease.policy().invalidates,
            Invalidation::All
        );
        assert_eq!(
            AlertKind::VeryLowVoltage.policy().invalidates,
            Invalidation::None
        );
    }

    #[test]
    fn absorbed_kinds_never_invalidate() {
        for kind in AlertKind::ALL.into_iter().filter(|k| !k.cascades()) {
            assert_eq!(kind.policy().invalidates, Invalidation::None, "{kind:?}");
        }
        let invalidating = AlertKind::ALL
            .into_iter()
            .filter(|k| k.policy().invalidates != Invalidation::None)
            .count();
        assert_eq!(invalidating, 13);
    }

    #[test]
    fn every_kind_has_a_policy() {
        let refreshing = AlertKind::ALL
            .iter()
            .filter(|k| k.policy().refresh_flags)
            .count();
        assert!(refreshing >= 4);
        assert!(AlertKind::FlagChange.policy().refresh_flags);
    }
}
