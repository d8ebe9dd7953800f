use std::path::Path;
use holos::{Iteration, Simulation};

/// Runs the simulation to completion, saving recovery snapshots when due.
/// Returns the number of iterations.
pub fn iterate(simulation: &mut Simulation, history_path: &Path, snapshot_path: &Path, resume: bool) -> usize {
    let silent_mode = true;
    if resume {
        holos::output::truncate_history(history_path, simulation.n_history_bytes()).unwrap();
    }
    let mut history_writer = holos::output::get_history_writer(history_path, resume).unwrap();
    let mut n_iterations = 0;
    loop {
        n_iterations += 1;
        match simulation.iterate(&mut history_writer, silent_mode).unwrap() {
            Iteration::Continue { recovery_snapshot_due } => {
                if recovery_snapshot_due {
                    simulation.write_recovery_snapshot(snapshot_path, &mut history_writer).unwrap();
                }
            },
            Iteration::Completed => {
                simulation.write_recovery_snapshot(snapshot_path, &mut history_writer).unwrap();
                break;
            },
        }
    }
    n_iterations
}

/// Same as `iterate` but stops early, without a final recovery snapshot,
/// after `max_iterations` iterations.
pub fn iterate_until(simulation: &mut Simulation, history_path: &Path, snapshot_path: &Path, max_iterations: usize) {
    let mut history_writer = holos::output::get_history_writer(history_path, false).unwrap();
    for _ in 0..max_iterations {
        match simulation.iterate(&mut history_writer, true).unwrap() {
            Iteration::Continue { recovery_snapshot_due } => {
                if recovery_snapshot_due {
                    simulation.write_recovery_snapshot(snapshot_path, &mut history_writer).unwrap();
                }
            },
            Iteration::Completed => break,
        }
    }
    history_writer.flush().unwrap();
}
