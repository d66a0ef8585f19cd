//! Read-only result accessors for writers and exporters.
//!
//! Vector getters write one entry per matching component starting at `start`,
//! grow `out` as needed, and return the next free index so calls can be
//! chained across areas. Components are visited in the same order the offset
//! passes use (terminals, nested areas recursively, monitors); disabled
//! components are skipped.

use gd_index::SolverMode;
use gd_model::{ComponentKind, ModelResult, fill};

use crate::area::{Area, ComponentRef};

fn put<T: Default + Clone>(out: &mut Vec<T>, start: usize, values: impl IntoIterator<Item = T>) -> usize {
    let mut next = start;
    for value in values {
        if out.len() <= next {
            out.resize(next + 1, T::default());
        }
        out[next] = value;
        next += 1;
    }
    next
}

impl Area {
    fn collect_leaves<'a>(&'a self, out: &mut Vec<ComponentRef<'a>>) {
        out.extend(self.terminals.iter().map(|c| c.as_ref()).filter(|c| c.is_enabled()));
        for area in self.areas.iter().filter(|a| a.core.enabled) {
            area.collect_leaves(out);
        }
        out.extend(self.monitors.iter().map(|c| c.as_ref()).filter(|c| c.is_enabled()));
    }

    /// Enabled non-area components of the whole subtree in traversal order.
    pub fn leaves(&self) -> Vec<ComponentRef<'_>> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn leaves_of(&self, kind: ComponentKind) -> impl Iterator<Item = ComponentRef<'_>> + '_ {
        self.leaves().into_iter().filter(move |c| c.kind() == kind)
    }

    /// Number of enabled components of `kind` anywhere below this area.
    pub fn get_count(&self, kind: ComponentKind) -> usize {
        self.leaves_of(kind).count()
    }

    pub fn get_voltage(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(out, start, self.leaves_of(ComponentKind::Bus).map(|b| b.voltage()))
    }

    pub fn get_voltage_from_state(
        &self,
        out: &mut Vec<f64>,
        start: usize,
        state: &[f64],
        mode: &SolverMode,
    ) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Bus)
                .map(|b| b.voltage_from_state(state, mode)),
        )
    }

    pub fn get_angle(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(out, start, self.leaves_of(ComponentKind::Bus).map(|b| b.angle()))
    }

    pub fn get_angle_from_state(
        &self,
        out: &mut Vec<f64>,
        start: usize,
        state: &[f64],
        mode: &SolverMode,
    ) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Bus)
                .map(|b| b.angle_from_state(state, mode)),
        )
    }

    pub fn get_bus_generation_real(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(out, start, self.leaves_of(ComponentKind::Bus).map(|b| b.generation_real()))
    }

    pub fn get_bus_generation_reactive(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Bus).map(|b| b.generation_reactive()),
        )
    }

    pub fn get_bus_load_real(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(out, start, self.leaves_of(ComponentKind::Bus).map(|b| b.load_real()))
    }

    pub fn get_bus_load_reactive(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(out, start, self.leaves_of(ComponentKind::Bus).map(|b| b.load_reactive()))
    }

    /// Real power at link terminal `end` (1 or 2).
    pub fn get_link_real_power(&self, out: &mut Vec<f64>, start: usize, end: usize) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Link).map(|l| l.link_real_power(end)),
        )
    }

    pub fn get_link_reactive_power(&self, out: &mut Vec<f64>, start: usize, end: usize) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Link)
                .map(|l| l.link_reactive_power(end)),
        )
    }

    pub fn get_link_loss(&self, out: &mut Vec<f64>, start: usize) -> usize {
        put(out, start, self.leaves_of(ComponentKind::Link).map(|l| l.link_loss()))
    }

    pub fn get_bus_name(&self, out: &mut Vec<String>, start: usize) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Bus).map(|b| b.name().to_string()),
        )
    }

    pub fn get_link_name(&self, out: &mut Vec<String>, start: usize) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Link).map(|l| l.name().to_string()),
        )
    }

    /// Name of the bus at terminal `end` (1 or 2) of every link; empty when
    /// a link is not connected there.
    pub fn get_link_bus(&self, out: &mut Vec<String>, start: usize, end: usize) -> usize {
        put(
            out,
            start,
            self.leaves_of(ComponentKind::Link)
                .map(|l| l.link_bus_name(end).unwrap_or_default().to_string()),
        )
    }

    /// Total loss over every link.
    pub fn get_loss(&self) -> f64 {
        self.leaves_of(ComponentKind::Link).map(|l| l.link_loss()).sum()
    }

    pub fn get_generation_real(&self) -> f64 {
        self.leaves_of(ComponentKind::Bus).map(|b| b.generation_real()).sum()
    }

    pub fn get_generation_reactive(&self) -> f64 {
        self.leaves_of(ComponentKind::Bus)
            .map(|b| b.generation_reactive())
            .sum()
    }

    pub fn get_load_real(&self) -> f64 {
        self.leaves_of(ComponentKind::Bus).map(|b| b.load_real()).sum()
    }

    pub fn get_load_reactive(&self) -> f64 {
        self.leaves_of(ComponentKind::Bus).map(|b| b.load_reactive()).sum()
    }

    /// Mean bus angle, or zero without buses.
    pub fn get_avg_angle(&self) -> f64 {
        let (sum, n) = self
            .leaves_of(ComponentKind::Bus)
            .fold((0.0, 0usize), |(s, n), b| (s + b.angle(), n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    /// Write `1.0` at every voltage state index of the subtree.
    pub fn get_voltage_states(&self, sdata: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        for leaf in self.leaves() {
            if let Some(r) = leaf.core().local_ranges(mode) {
                fill(sdata, r.v, 1.0, "voltage state")?;
            }
        }
        Ok(())
    }

    /// Write `1.0` at every angle state index of the subtree.
    pub fn get_angle_states(&self, sdata: &mut [f64], mode: &SolverMode) -> ModelResult<()> {
        for leaf in self.leaves() {
            if let Some(r) = leaf.core().local_ranges(mode) {
                fill(sdata, r.a, 1.0, "angle state")?;
            }
        }
        Ok(())
    }
}
