//! Element models for circuit simulation.
//!
//! This module provides the element contract and the element family:
//! - Sources: Voltage Source, Current Source (both waveform driven)
//! - Linear: Resistor, Capacitor
//! - Nonlinear: Diode
//!
//! Every element takes part in a timestep through the [`Element`] hooks.
//! Elements never talk to each other; they only share node indices and the
//! assembler.

mod diode;
mod linear;
mod sources;
mod waveform;

pub use diode::{Diode, DiodeParams};
pub use linear::{Capacitor, Resistor};
pub use sources::{CurrentSource, VoltageSource};
pub use waveform::Waveform;

use std::fmt;

use crate::circuit::{NodeId, VoltageSourceId};
use crate::error::{Result, SimError};
use crate::solver::{MnaMatrix, SimContext};

/// The contract every two-terminal element satisfies to take part in a solve.
///
/// Hooks are invoked by the iteration driver in topology order:
/// `solver_begin` once per timestep, then per iteration
/// `solver_iteration_begin` (before the solve) and `solver_iteration_end`
/// (after it), and finally `solver_end` once the timestep has converged.
pub trait Element {
    /// Node indices this element connects, in terminal order.
    fn nodes(&self) -> [NodeId; 2];

    /// Number of auxiliary voltage-source unknowns this element needs.
    fn voltage_source_count(&self) -> usize {
        0
    }

    /// Receive the auxiliary unknown assigned by the assembly pass.
    fn set_voltage_source(&mut self, _vs: VoltageSourceId) {}

    /// Whether stamps depend on the previous iterate.
    fn is_nonlinear(&self) -> bool {
        false
    }

    /// Stamp contributions that stay fixed for the whole timestep.
    fn solver_begin(&mut self, _ctx: &SimContext, _mna: &mut MnaMatrix) {}

    /// Stamp contributions that are re-linearized every iteration.
    fn solver_iteration_begin(&mut self, _ctx: &SimContext, _mna: &mut MnaMatrix) {}

    /// Read back solved quantities after an iteration's solve.
    fn solver_iteration_end(&mut self, _ctx: &SimContext, _mna: &MnaMatrix) {}

    /// Commit state once the timestep has converged.
    fn solver_end(&mut self, _ctx: &SimContext, _mna: &MnaMatrix) {}

    /// Last solved branch current (amps).
    fn current(&self) -> f64;
}

/// A single-parameter edit applied between timesteps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
    /// Sinusoid amplitude (V or A)
    Amplitude(f64),
    /// Constant offset (V or A)
    DcBias(f64),
    /// Sinusoid frequency (Hz)
    Frequency(f64),
    /// Sinusoid phase (degrees)
    PhaseOffset(f64),
    /// Resistance (ohms)
    Resistance(f64),
    /// Capacitance (farads)
    Capacitance(f64),
    /// Diode saturation current (amps)
    SaturationCurrent(f64),
    /// Diode ideality factor
    EmissionCoefficient(f64),
}

impl Edit {
    /// Build an edit from a parameter name.
    pub fn from_name(name: &str, value: f64) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "amplitude" | "amp" => Some(Self::Amplitude(value)),
            "dcbias" | "dc_bias" | "dc" => Some(Self::DcBias(value)),
            "frequency" | "freq" => Some(Self::Frequency(value)),
            "phaseoffset" | "phase_offset" | "phase" => Some(Self::PhaseOffset(value)),
            "resistance" => Some(Self::Resistance(value)),
            "capacitance" => Some(Self::Capacitance(value)),
            "is" => Some(Self::SaturationCurrent(value)),
            "n" => Some(Self::EmissionCoefficient(value)),
            _ => None,
        }
    }

    /// The parameter name this edit targets.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Amplitude(_) => "amplitude",
            Self::DcBias(_) => "dc_bias",
            Self::Frequency(_) => "frequency",
            Self::PhaseOffset(_) => "phase_offset",
            Self::Resistance(_) => "resistance",
            Self::Capacitance(_) => "capacitance",
            Self::SaturationCurrent(_) => "is",
            Self::EmissionCoefficient(_) => "n",
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A circuit element.
#[derive(Debug, Clone)]
pub enum Component {
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Resistor(Resistor),
    Capacitor(Capacitor),
    Diode(Diode),
}

impl Component {
    /// Identifier used in persisted records.
    pub fn save_id(&self) -> &'static str {
        match self {
            Component::VoltageSource(_) => "vs",
            Component::CurrentSource(_) => "cs",
            Component::Resistor(_) => "r",
            Component::Capacitor(_) => "c",
            Component::Diode(_) => "d",
        }
    }

    /// Human readable element kind.
    pub fn name(&self) -> &'static str {
        match self {
            Component::VoltageSource(_) => "Voltage Source",
            Component::CurrentSource(_) => "Current Source",
            Component::Resistor(_) => "Resistor",
            Component::Capacitor(_) => "Capacitor",
            Component::Diode(_) => "Diode",
        }
    }

    /// Apply a parameter edit. Edits only affect future stamps.
    pub fn apply_edit(&mut self, edit: Edit) -> Result<()> {
        let applied = match self {
            Component::VoltageSource(v) => apply_waveform_edit(&mut v.waveform, edit),
            Component::CurrentSource(i) => apply_waveform_edit(&mut i.waveform, edit),
            Component::Resistor(r) => match edit {
                Edit::Resistance(value) => {
                    require_positive("Resistor", "resistance", value)?;
                    r.set_resistance(value);
                    true
                }
                _ => false,
            },
            Component::Capacitor(c) => match edit {
                Edit::Capacitance(value) => {
                    require_positive("Capacitor", "capacitance", value)?;
                    c.set_capacitance(value);
                    true
                }
                _ => false,
            },
            Component::Diode(d) => match edit {
                Edit::SaturationCurrent(value) => {
                    require_positive("Diode", "is", value)?;
                    d.params.is = value;
                    true
                }
                Edit::EmissionCoefficient(value) => {
                    require_positive("Diode", "n", value)?;
                    d.params.n = value;
                    true
                }
                _ => false,
            },
        };

        if applied {
            Ok(())
        } else {
            Err(SimError::InvalidEdit {
                element: self.name().to_string(),
                edit: edit.to_string(),
            })
        }
    }

    fn as_element(&self) -> &dyn Element {
        match self {
            Component::VoltageSource(v) => v,
            Component::CurrentSource(i) => i,
            Component::Resistor(r) => r,
            Component::Capacitor(c) => c,
            Component::Diode(d) => d,
        }
    }

    fn as_element_mut(&mut self) -> &mut dyn Element {
        match self {
            Component::VoltageSource(v) => v,
            Component::CurrentSource(i) => i,
            Component::Resistor(r) => r,
            Component::Capacitor(c) => c,
            Component::Diode(d) => d,
        }
    }
}

fn apply_waveform_edit(waveform: &mut Waveform, edit: Edit) -> bool {
    match edit {
        Edit::Amplitude(v) => waveform.set_amplitude(v),
        Edit::DcBias(v) => waveform.set_dc_bias(v),
        Edit::Frequency(v) => waveform.set_frequency(v),
        Edit::PhaseOffset(v) => waveform.set_phase_offset(v),
        _ => return false,
    }
    true
}

fn require_positive(element: &str, param: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_parameter(
            element,
            param,
            format!("must be positive and finite, got {value}"),
        ))
    }
}

impl Element for Component {
    fn nodes(&self) -> [NodeId; 2] {
        self.as_element().nodes()
    }

    fn voltage_source_count(&self) -> usize {
        self.as_element().voltage_source_count()
    }

    fn set_voltage_source(&mut self, vs: VoltageSourceId) {
        self.as_element_mut().set_voltage_source(vs)
    }

    fn is_nonlinear(&self) -> bool {
        self.as_element().is_nonlinear()
    }

    fn solver_begin(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        self.as_element_mut().solver_begin(ctx, mna)
    }

    fn solver_iteration_begin(&mut self, ctx: &SimContext, mna: &mut MnaMatrix) {
        self.as_element_mut().solver_iteration_begin(ctx, mna)
    }

    fn solver_iteration_end(&mut self, ctx: &SimContext, mna: &MnaMatrix) {
        self.as_element_mut().solver_iteration_end(ctx, mna)
    }

    fn solver_end(&mut self, ctx: &SimContext, mna: &MnaMatrix) {
        self.as_element_mut().solver_end(ctx, mna)
    }

    fn current(&self) -> f64 {
        self.as_element().current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Component {
        Component::VoltageSource(VoltageSource::new([NodeId(1), NodeId::GROUND]))
    }

    #[test]
    fn test_waveform_edits_are_independent() {
        let mut c = source();
        c.apply_edit(Edit::Amplitude(2.0)).unwrap();
        c.apply_edit(Edit::PhaseOffset(90.0)).unwrap();

        let Component::VoltageSource(v) = &c else { unreachable!() };
        assert_eq!(v.waveform, Waveform::new(0.0, 60.0, 2.0, 90.0));
    }

    #[test]
    fn test_mismatched_edit_rejected() {
        let mut c = source();
        let err = c.apply_edit(Edit::Resistance(100.0)).unwrap_err();
        assert!(matches!(err, SimError::InvalidEdit { .. }));

        let mut r = Component::Resistor(Resistor::new([NodeId(1), NodeId(2)], 1e3));
        assert!(r.apply_edit(Edit::Frequency(1.0)).is_err());
        assert!(matches!(
            r.apply_edit(Edit::Resistance(-5.0)),
            Err(SimError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_edit_from_name() {
        assert_eq!(Edit::from_name("Amplitude", 1.0), Some(Edit::Amplitude(1.0)));
        assert_eq!(Edit::from_name("phase", 45.0), Some(Edit::PhaseOffset(45.0)));
        assert_eq!(Edit::from_name("bogus", 1.0), None);
    }

    #[test]
    fn test_only_sources_own_unknowns() {
        assert_eq!(source().voltage_source_count(), 1);
        let r = Component::Resistor(Resistor::new([NodeId(1), NodeId(2)], 1e3));
        assert_eq!(r.voltage_source_count(), 0);
        assert!(!r.is_nonlinear());
    }
}
