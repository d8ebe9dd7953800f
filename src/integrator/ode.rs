//! State vector layout shared with external solvers (block layout, 6N values):
//!   [x_0, y_0, z_0, ..., x_{N-1}, y_{N-1}, z_{N-1}, vx_0, vy_0, vz_0, ..., vz_{N-1}]

use std::mem;
use super::super::constants::{ODE_ABSOLUTE_TOLERANCE, ODE_RELATIVE_TOLERANCE, ODE_MIN_TIME_STEP, ODE_MAX_STEPS};
use super::super::constants::{ODE_SAFETY_FACTOR, ODE_MIN_STEP_FACTOR, ODE_MAX_STEP_FACTOR};
use super::super::errors::{DynamicsError, Result};
use super::super::particles::{Axes, Particle, System};

/// Right-hand side f(t, y, dy/dt) of the first order system y' = f(t, y).
pub type RightHandSide<'a> = dyn FnMut(f64, &[f64], &mut [f64]) -> Result<()> + 'a;

/// Generic ODE solver driven by the system for `IntegratorType::ExternalOde`.
/// It advances `state` from `initial_time` to `final_time`, choosing its own
/// internal steps.
pub trait OdeSolver: Send {
    fn name(&self) -> &str;
    fn integrate(&mut self, initial_time: f64, final_time: f64, state: &mut [f64], rhs: &mut RightHandSide<'_>) -> Result<()>;
}

pub fn state_len(n_particles: usize) -> usize {
    6 * n_particles
}

pub fn pack_state(particles: &[Particle]) -> Vec<f64> {
    let n_particles = particles.len();
    let mut state = vec![0.; state_len(n_particles)];
    for (i, particle) in particles.iter().enumerate() {
        state[3*i..3*i+3].copy_from_slice(&particle.position.as_array());
        state[3*(n_particles+i)..3*(n_particles+i)+3].copy_from_slice(&particle.velocity.as_array());
    }
    state
}

/// Copies positions and velocities back into the particles. Fixed particles are not modified.
pub fn unpack_state(state: &[f64], particles: &mut [Particle]) -> Result<()> {
    let n_particles = particles.len();
    check_state_len(state, n_particles)?;
    for (i, particle) in particles.iter_mut().enumerate() {
        if particle.fixed {
            continue;
        }
        particle.position = Axes::new(state[3*i], state[3*i+1], state[3*i+2]);
        let j = 3*(n_particles+i);
        particle.velocity = Axes::new(state[j], state[j+1], state[j+2]);
    }
    Ok(())
}

/// dy/dt for the block layout: the position block derives into the velocities
/// and the velocity block into the accelerations of the active force law.
pub fn right_hand_side(system: &System, time: f64, state: &[f64], derivative: &mut [f64]) -> Result<()> {
    let n_particles = system.len();
    check_state_len(state, n_particles)?;
    check_state_len(derivative, n_particles)?;

    let mut positions = Vec::with_capacity(n_particles);
    let mut velocities = Vec::with_capacity(n_particles);
    for i in 0..n_particles {
        positions.push(Axes::new(state[3*i], state[3*i+1], state[3*i+2]));
        let j = 3*(n_particles+i);
        velocities.push(Axes::new(state[j], state[j+1], state[j+2]));
    }
    let accelerations = system.accelerations_at(time, &positions, &velocities)?;

    for (i, particle) in system.particles().iter().enumerate() {
        let velocity = if particle.fixed { Axes::zero() } else { velocities[i] };
        derivative[3*i..3*i+3].copy_from_slice(&velocity.as_array());
        derivative[3*(n_particles+i)..3*(n_particles+i)+3].copy_from_slice(&accelerations[i].as_array());
    }
    Ok(())
}

fn check_state_len(state: &[f64], n_particles: usize) -> Result<()> {
    if state.len() != state_len(n_particles) {
        return Err(DynamicsError::OdeFailure(format!("state vector has {} values but {} particles need {}", state.len(), n_particles, state_len(n_particles))));
    }
    Ok(())
}

/// One `ExternalOde` step: the solver is taken out of the system for the
/// duration of the call and handed back even when it fails.
pub(crate) fn step(system: &mut System, time_step: f64) -> Result<()> {
    let mut solver = system.take_ode_solver().ok_or(DynamicsError::MissingOdeSolver)?;
    let initial_time = system.time();
    let mut state = pack_state(system.particles());

    let outcome = {
        let frozen: &System = &*system;
        let mut rhs = |time: f64, y: &[f64], dydt: &mut [f64]| right_hand_side(frozen, time, y, dydt);
        solver.integrate(initial_time, initial_time + time_step, &mut state, &mut rhs)
    };
    system.restore_ode_solver(solver);
    outcome?;

    unpack_state(&state, system.particles_mut())
}

/// Adaptive embedded Runge-Kutta 5(4) of Dormand & Prince with local
/// extrapolation and first-same-as-last stage reuse.
#[derive(Debug, Clone)]
pub struct DormandPrince {
    pub absolute_tolerance: f64,
    pub relative_tolerance: f64,
    pub max_steps: usize,
    suggested_time_step: Option<f64>,
    // Workspace
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    k7: Vec<f64>,
    y_stage: Vec<f64>,
    y_new: Vec<f64>,
}

// Butcher tableau
const C2: f64 = 1./5.;
const C3: f64 = 3./10.;
const C4: f64 = 4./5.;
const C5: f64 = 8./9.;
const A21: f64 = 1./5.;
const A31: f64 = 3./40.;
const A32: f64 = 9./40.;
const A41: f64 = 44./45.;
const A42: f64 = -56./15.;
const A43: f64 = 32./9.;
const A51: f64 = 19372./6561.;
const A52: f64 = -25360./2187.;
const A53: f64 = 64448./6561.;
const A54: f64 = -212./729.;
const A61: f64 = 9017./3168.;
const A62: f64 = -355./33.;
const A63: f64 = 46732./5247.;
const A64: f64 = 49./176.;
const A65: f64 = -5103./18656.;
// Fifth order weights (also the last row of the tableau)
const B1: f64 = 35./384.;
const B3: f64 = 500./1113.;
const B4: f64 = 125./192.;
const B5: f64 = -2187./6784.;
const B6: f64 = 11./84.;
// Difference between the fifth and the embedded fourth order weights
const E1: f64 = 35./384. - 5179./57600.;
const E3: f64 = 500./1113. - 7571./16695.;
const E4: f64 = 125./192. - 393./640.;
const E5: f64 = -2187./6784. + 92097./339200.;
const E6: f64 = 11./84. - 187./2100.;
const E7: f64 = -1./40.;

impl Default for DormandPrince {
    fn default() -> DormandPrince {
        DormandPrince::new(ODE_ABSOLUTE_TOLERANCE, ODE_RELATIVE_TOLERANCE)
    }
}

impl DormandPrince {
    pub fn new(absolute_tolerance: f64, relative_tolerance: f64) -> DormandPrince {
        DormandPrince {
            absolute_tolerance: absolute_tolerance,
            relative_tolerance: relative_tolerance,
            max_steps: ODE_MAX_STEPS,
            suggested_time_step: None,
            k1: Vec::new(),
            k2: Vec::new(),
            k3: Vec::new(),
            k4: Vec::new(),
            k5: Vec::new(),
            k6: Vec::new(),
            k7: Vec::new(),
            y_stage: Vec::new(),
            y_new: Vec::new(),
        }
    }

    fn resize(&mut self, n: usize) {
        for buffer in [&mut self.k1, &mut self.k2, &mut self.k3, &mut self.k4, &mut self.k5,
                       &mut self.k6, &mut self.k7, &mut self.y_stage, &mut self.y_new].iter_mut() {
            buffer.clear();
            buffer.resize(n, 0.);
        }
    }

    fn error_norm(&self, state: &[f64]) -> f64 {
        let mut error: f64 = 0.;
        for i in 0..state.len() {
            let local_error = E1*self.k1[i] + E3*self.k3[i] + E4*self.k4[i] + E5*self.k5[i] + E6*self.k6[i] + E7*self.k7[i];
            let scale = self.absolute_tolerance + self.relative_tolerance * state[i].abs().max(self.y_new[i].abs());
            error = error.max(local_error.abs() / scale);
        }
        error
    }
}

impl OdeSolver for DormandPrince {
    fn name(&self) -> &str {
        "Dormand-Prince 5(4)"
    }

    fn integrate(&mut self, initial_time: f64, final_time: f64, state: &mut [f64], rhs: &mut RightHandSide<'_>) -> Result<()> {
        let span = final_time - initial_time;
        if !(span > 0.) || !span.is_finite() {
            return Err(DynamicsError::InvalidTimeStep(span));
        }
        if !(self.absolute_tolerance > 0.) || !(self.relative_tolerance >= 0.) {
            return Err(DynamicsError::InvalidParameter { name: "ODE tolerance", value: self.absolute_tolerance.min(self.relative_tolerance) });
        }
        let n = state.len();
        self.resize(n);
        let min_time_step = ODE_MIN_TIME_STEP * span;

        let mut time = initial_time;
        let mut time_step = self.suggested_time_step.unwrap_or(span).min(span);
        let mut n_steps = 0;
        rhs(time, &state[..], &mut self.k1[..])?;

        while time < final_time {
            if n_steps >= self.max_steps {
                return Err(DynamicsError::OdeFailure(format!("maximum number of steps ({}) reached at t={}", self.max_steps, time)));
            }
            let last_step = time + time_step >= final_time;
            let h = if last_step { final_time - time } else { time_step };

            for i in 0..n {
                self.y_stage[i] = state[i] + h*A21*self.k1[i];
            }
            rhs(time + C2*h, &self.y_stage[..], &mut self.k2[..])?;
            for i in 0..n {
                self.y_stage[i] = state[i] + h*(A31*self.k1[i] + A32*self.k2[i]);
            }
            rhs(time + C3*h, &self.y_stage[..], &mut self.k3[..])?;
            for i in 0..n {
                self.y_stage[i] = state[i] + h*(A41*self.k1[i] + A42*self.k2[i] + A43*self.k3[i]);
            }
            rhs(time + C4*h, &self.y_stage[..], &mut self.k4[..])?;
            for i in 0..n {
                self.y_stage[i] = state[i] + h*(A51*self.k1[i] + A52*self.k2[i] + A53*self.k3[i] + A54*self.k4[i]);
            }
            rhs(time + C5*h, &self.y_stage[..], &mut self.k5[..])?;
            for i in 0..n {
                self.y_stage[i] = state[i] + h*(A61*self.k1[i] + A62*self.k2[i] + A63*self.k3[i] + A64*self.k4[i] + A65*self.k5[i]);
            }
            rhs(time + h, &self.y_stage[..], &mut self.k6[..])?;
            for i in 0..n {
                self.y_new[i] = state[i] + h*(B1*self.k1[i] + B3*self.k3[i] + B4*self.k4[i] + B5*self.k5[i] + B6*self.k6[i]);
            }
            rhs(time + h, &self.y_new[..], &mut self.k7[..])?;

            let error = h * self.error_norm(state);
            if !error.is_finite() {
                return Err(DynamicsError::OdeFailure(format!("non-finite error estimate at t={}", time)));
            }

            if error <= 1. {
                time = if last_step { final_time } else { time + h };
                state.copy_from_slice(&self.y_new);
                mem::swap(&mut self.k1, &mut self.k7); // First same as last
                n_steps += 1;
                let factor = if error == 0. {
                    ODE_MAX_STEP_FACTOR
                } else {
                    (ODE_SAFETY_FACTOR * error.powf(-0.2)).max(ODE_MIN_STEP_FACTOR).min(ODE_MAX_STEP_FACTOR)
                };
                time_step = h * factor;
            } else {
                time_step = h * (ODE_SAFETY_FACTOR * error.powf(-0.25)).max(ODE_MIN_STEP_FACTOR);
                if time_step < min_time_step {
                    return Err(DynamicsError::OdeFailure(format!("step size underflow at t={}", time)));
                }
            }
        }
        self.suggested_time_step = Some(time_step);
        Ok(())
    }
}
