//! Smoke tests driving components through the shared trait object.

use gd_index::{SolverMode, StateData};
use gd_model::{AlertKind, ArrayData, ComponentKind, GridComponent, Invalidation, StateBlock};

fn boxed() -> Vec<Box<dyn GridComponent>> {
    vec![
        Box::new(StateBlock::bus("b1").with_states(1, 0)),
        Box::new(StateBlock::new("gen", ComponentKind::Submodel).with_states(1, 2)),
        Box::new(StateBlock::relay("r1")),
    ]
}

#[test]
fn contiguous_placement_through_trait_objects() {
    let mode = SolverMode::DAE;
    let mut parts = boxed();
    let mut next = 0;
    for part in &mut parts {
        part.load_sizes(&mode, false);
        part.set_offset(next, &mode);
        next += part.core().offsets.total(&mode).state_count();
    }
    assert_eq!(next, 3 + 3);

    let state = vec![0.0; next];
    let dstate = vec![0.0; next];
    let sd = StateData::new(0.0, &state, &dstate);
    let mut resid = vec![f64::NAN; next];
    let mut ad = ArrayData::new();
    for part in &parts {
        part.residual(&sd, &mut resid, &mode).unwrap();
        part.jacobian_elements(&sd, &mut ad, &mode).unwrap();
    }
    assert!(resid.iter().all(|r| r.is_finite()));
    ad.compact();
    assert_eq!(ad.len(), next);
}

#[test]
fn disabled_components_contribute_nothing() {
    let mode = SolverMode::POWER_FLOW;
    let mut block = StateBlock::new("x", ComponentKind::Submodel).with_states(4, 0);
    block.set_flag("enabled", false).unwrap();
    block.load_sizes(&mode, false);
    assert_eq!(block.core().offsets.total(&mode).state_count(), 0);
    let alert = block.core_mut().take_alerts().pop().unwrap();
    assert_eq!(alert.kind, AlertKind::ObjectCountDecrease);
    assert_eq!(alert.kind.policy().invalidates, Invalidation::All);
}

#[test]
fn dynamic_only_reload_keeps_state_sizes() {
    let mode = SolverMode::DAE;
    let mut block = StateBlock::new("x", ComponentKind::Submodel).with_states(1, 1);
    block.load_sizes(&mode, false);
    block.set("nroots", 2.0).unwrap();
    assert!(block.core().offsets.is_state_loaded(&mode));
    assert!(!block.core().offsets.is_root_and_jacobian_loaded(&mode));
    block.load_sizes(&mode, true);
    let so = block.core().offsets.offsets(&mode).unwrap();
    assert_eq!(so.total.diff_roots, 2);
    assert_eq!(so.total.state_count(), 2);
}
