use std::io::Write;
use std::path::Path;
use super::super::errors::{DynamicsError, Result};
use super::super::particles::System;
use super::super::tools::timestamp;
use super::ode::DormandPrince;
use super::output::{read_recovery_snapshot, write_recovery_snapshot, HistoryWriter};
use super::IntegratorType;

/// Outcome of one `Simulation::iterate` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Iteration {
    Continue { recovery_snapshot_due: bool },
    Completed,
}

/// Drives a system with a fixed time step until the time limit, writing
/// historic snapshots to a CSV history and signalling when a recovery
/// snapshot should be saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub system: System,
    pub integrator: IntegratorType,
    time_step: f64,
    pub time_limit: f64,
    pub historic_snapshot_period: f64,
    pub recovery_snapshot_period: f64,
    #[serde(default)]
    last_historic_snapshot_time: f64,
    #[serde(default)]
    last_recovery_snapshot_time: f64,
    #[serde(default)]
    n_historic_snapshots: usize, // Zero in case descriptions
    #[serde(default)]
    n_history_records: usize,
    #[serde(default)]
    n_history_bytes: u64, // History length when the snapshot was saved
    #[serde(default)]
    pub conservation_tolerance: Option<f64>,
    #[serde(default)]
    drift_reported: bool,
}

impl Simulation {
    pub fn new(system: System, integrator: IntegratorType, time_step: f64, time_limit: f64,
               historic_snapshot_period: f64, recovery_snapshot_period: f64) -> Result<Simulation> {
        if !(time_step > 0.) || !time_step.is_finite() {
            return Err(DynamicsError::InvalidTimeStep(time_step));
        }
        if !(time_limit >= system.time()) || !time_limit.is_finite() {
            return Err(DynamicsError::InvalidParameter { name: "time_limit", value: time_limit });
        }
        if !(historic_snapshot_period > 0.) {
            return Err(DynamicsError::InvalidParameter { name: "historic_snapshot_period", value: historic_snapshot_period });
        }
        if !(recovery_snapshot_period > 0.) {
            return Err(DynamicsError::InvalidParameter { name: "recovery_snapshot_period", value: recovery_snapshot_period });
        }
        system.ensure_not_empty()?;
        let initial_time = system.time();
        let mut simulation = Simulation {
            system: system,
            integrator: integrator,
            time_step: time_step,
            time_limit: time_limit,
            historic_snapshot_period: historic_snapshot_period,
            recovery_snapshot_period: recovery_snapshot_period,
            last_historic_snapshot_time: initial_time,
            last_recovery_snapshot_time: initial_time,
            n_historic_snapshots: 0,
            n_history_records: 0,
            n_history_bytes: 0,
            conservation_tolerance: None,
            drift_reported: false,
        };
        simulation.prepare()?;
        Ok(simulation)
    }

    /// Reads a JSON case description or a recovery snapshot (JSON or bincode).
    /// An unreadable recovery snapshot is replaced by the previous one.
    pub fn load(path: &Path) -> Result<Simulation> {
        let mut simulation: Simulation = read_recovery_snapshot(path)?;
        simulation.prepare()?;
        Ok(simulation)
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn n_historic_snapshots(&self) -> usize {
        self.n_historic_snapshots
    }

    /// Rows of the history file accounted for by this simulation.
    pub fn n_history_records(&self) -> usize {
        self.n_history_records
    }

    /// Bytes of the history file accounted for by this simulation. Anything
    /// after them is discarded when resuming.
    pub fn n_history_bytes(&self) -> u64 {
        self.n_history_bytes
    }

    /// Whether the conservation drift warning has already been logged.
    pub fn drift_reported(&self) -> bool {
        self.drift_reported
    }

    pub fn set_conservation_tolerance(&mut self, tolerance: Option<f64>) -> Result<()> {
        if let Some(value) = tolerance {
            if !(value >= 0.) {
                return Err(DynamicsError::InvalidParameter { name: "conservation_tolerance", value: value });
            }
        }
        self.conservation_tolerance = tolerance;
        self.prepare()
    }

    // Things that are not persisted: the ODE workspace and, for old
    // snapshots, the conservation baseline.
    fn prepare(&mut self) -> Result<()> {
        self.system.reconcile_ids()?;
        if self.integrator == IntegratorType::ExternalOde && !self.system.has_ode_solver() {
            self.system.set_ode_solver(Box::new(DormandPrince::default()));
        }
        if self.conservation_tolerance.is_some() && self.system.baseline().is_none() {
            self.system.record_baseline()?;
        }
        Ok(())
    }

    pub fn set_time_limit(&mut self, time_limit: f64) -> Result<()> {
        if time_limit > 0. && self.time_limit != time_limit {
            if time_limit < self.system.time() || !time_limit.is_finite() {
                return Err(DynamicsError::InvalidParameter { name: "time_limit", value: time_limit });
            }
            println!("[INFO {} UTC] The time limit changed from {} to {}", timestamp(), self.time_limit, time_limit);
            self.time_limit = time_limit;
        }
        Ok(())
    }

    /// Non-positive periods keep the current value.
    pub fn set_snapshot_periods(&mut self, historic_snapshot_period: f64, recovery_snapshot_period: f64) {
        if historic_snapshot_period > 0. && self.historic_snapshot_period != historic_snapshot_period {
            println!("[INFO {} UTC] The historic snapshot period changed from {} to {}", timestamp(), self.historic_snapshot_period, historic_snapshot_period);
            self.historic_snapshot_period = historic_snapshot_period;
        } else {
            println!("[INFO {} UTC] A historic snapshot will be saved every {} time units", timestamp(), self.historic_snapshot_period);
        }

        if recovery_snapshot_period > 0. && self.recovery_snapshot_period != recovery_snapshot_period {
            println!("[INFO {} UTC] The recovery snapshot period changed from {} to {}", timestamp(), self.recovery_snapshot_period, recovery_snapshot_period);
            self.recovery_snapshot_period = recovery_snapshot_period;
        } else {
            println!("[INFO {} UTC] A recovery snapshot will be saved every {} time units", timestamp(), self.recovery_snapshot_period);
        }
    }

    fn is_completed(&self) -> bool {
        self.system.time() + self.time_step > self.time_limit + 1e-9 * self.time_step
    }

    fn write_historic_snapshot<W: Write>(&mut self, history: &mut HistoryWriter<W>, silent_mode: bool) -> Result<()> {
        history.write_snapshot(&self.system)?;
        self.n_historic_snapshots += 1;
        self.n_history_records += self.system.len();
        if !silent_mode {
            let current_time = self.system.time();
            print!("Time: {:0.3} ({:0.1e}) | Step: {} | Time step: {:0.3e}                    \r",
                   current_time, current_time, self.system.n_steps(), self.time_step);
            let _ = std::io::stdout().flush();
        }
        Ok(())
    }

    /// Writes the due historic snapshot, advances the system by one time step
    /// and reports whether the time limit has been reached.
    pub fn iterate<W: Write>(&mut self, history: &mut HistoryWriter<W>, silent_mode: bool) -> Result<Iteration> {
        let current_time = self.system.time();
        let first_snapshot_trigger = self.n_historic_snapshots == 0;
        let historic_snapshot_time_trigger = self.last_historic_snapshot_time + self.historic_snapshot_period <= current_time;
        let recovery_snapshot_time_trigger = self.last_recovery_snapshot_time + self.recovery_snapshot_period <= current_time;
        if first_snapshot_trigger || historic_snapshot_time_trigger {
            self.write_historic_snapshot(history, silent_mode)?;
            // Whole periods instead of the current time to avoid small deviations
            if first_snapshot_trigger {
                self.last_historic_snapshot_time = current_time;
            } else {
                let elapsed_periods = ((current_time - self.last_historic_snapshot_time) / self.historic_snapshot_period).floor();
                self.last_historic_snapshot_time += elapsed_periods * self.historic_snapshot_period;
            }
        }

        if self.is_completed() {
            history.flush()?;
            return Ok(Iteration::Completed);
        }

        self.system.step(self.time_step, self.integrator)?;

        if let Some(tolerance) = self.conservation_tolerance {
            if !self.drift_reported && !self.system.check_conservation(tolerance)? {
                let drift = self.system.conservation_drift()?;
                println!("[WARNING {} UTC] Conservation drift above {} at time {}: energy {:e}, momentum {:e}",
                         timestamp(), tolerance, self.system.time(), drift.energy, drift.momentum);
                self.drift_reported = true;
            }
        }

        if self.is_completed() {
            self.write_historic_snapshot(history, silent_mode)?;
            self.last_historic_snapshot_time = self.system.time();
            history.flush()?;
            Ok(Iteration::Completed)
        } else {
            Ok(Iteration::Continue { recovery_snapshot_due: first_snapshot_trigger || recovery_snapshot_time_trigger })
        }
    }

    /// Flushes the history and saves the whole simulation so that it can be resumed.
    pub fn write_recovery_snapshot<W: Write>(&mut self, snapshot_path: &Path, history: &mut HistoryWriter<W>) -> Result<()> {
        self.last_recovery_snapshot_time = self.system.time();
        history.flush()?;
        self.n_history_bytes = history.n_bytes();
        write_recovery_snapshot(snapshot_path, &*self)
    }
}
