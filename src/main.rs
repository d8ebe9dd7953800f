extern crate holos;
extern crate clap;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use holos::tools::timestamp;
use holos::{Iteration, Simulation};
use std::path::Path;
use std::process;
use std::time::Instant;

fn cli() -> Command {
    Command::new("holos")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Newtonian N-body simulator with selectable integrators and conservation diagnostics.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("start")
                .about("Start a simulation")
                .arg(Arg::new("start_case_filename")
                    .required(true)
                    .index(1)
                    .help("JSON case description"))
                .arg(Arg::new("snapshot_filename")
                    .required(true)
                    .index(2)
                    .help("Recovery snapshot filename"))
                .arg(Arg::new("historic_snapshot_filename")
                    .required(true)
                    .index(3)
                    .help("Historic snapshot filename (CSV)"))
                .arg(silent_arg())
                )
        .subcommand(Command::new("resume")
                .about("Resume a simulation")
                .arg(Arg::new("resume_case_filename")
                    .required(true)
                    .index(1)
                    .help("Recovery snapshot filename"))
                .arg(Arg::new("historic_snapshot_filename")
                    .required(true)
                    .index(2)
                    .help("Historic snapshot filename (CSV)"))
                .arg(silent_arg())
                .arg(Arg::new("change_historic_snapshot_period")
                    .long("historic-snapshot-period")
                    .value_name("time")
                    .value_parser(value_parser!(f64))
                    .help("Set new historic snapshots period."))
                .arg(Arg::new("change_recovery_snapshot_period")
                    .long("recovery-snapshot-period")
                    .value_name("time")
                    .value_parser(value_parser!(f64))
                    .help("Set new recovery snapshots period."))
                .arg(Arg::new("change_time_limit")
                    .long("time-limit")
                    .value_name("time")
                    .value_parser(value_parser!(f64))
                    .help("Set new time limit."))
                )
}

fn silent_arg() -> Arg {
    Arg::new("silent")
        .short('s')
        .long("silent")
        .action(ArgAction::SetTrue)
        .help("Only print INFO/WARNING/ERROR messages")
}

struct Invocation<'a> {
    case_filename: &'a str,
    snapshot_filename: &'a str,
    history_filename: &'a str,
    silent_mode: bool,
    resume: bool,
    new_historic_snapshot_period: f64,
    new_recovery_snapshot_period: f64,
    new_time_limit: f64,
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    // Positional arguments are declared as required, clap rejects the call before we get here
    matches.get_one::<String>(id).map(|value| value.as_str()).unwrap_or_default()
}

fn parse_invocation(matches: &ArgMatches) -> Option<Invocation<'_>> {
    match matches.subcommand() {
        Some(("start", start_matches)) => {
            Some(Invocation {
                case_filename: required(start_matches, "start_case_filename"),
                snapshot_filename: required(start_matches, "snapshot_filename"),
                history_filename: required(start_matches, "historic_snapshot_filename"),
                silent_mode: start_matches.get_flag("silent"),
                resume: false,
                new_historic_snapshot_period: -1.,
                new_recovery_snapshot_period: -1.,
                new_time_limit: -1.,
            })
        },
        Some(("resume", resume_matches)) => {
            let snapshot_filename = required(resume_matches, "resume_case_filename");
            Some(Invocation {
                case_filename: snapshot_filename,
                snapshot_filename: snapshot_filename,
                history_filename: required(resume_matches, "historic_snapshot_filename"),
                silent_mode: resume_matches.get_flag("silent"),
                resume: true,
                new_historic_snapshot_period: resume_matches.get_one::<f64>("change_historic_snapshot_period").copied().unwrap_or(-1.),
                new_recovery_snapshot_period: resume_matches.get_one::<f64>("change_recovery_snapshot_period").copied().unwrap_or(-1.),
                new_time_limit: resume_matches.get_one::<f64>("change_time_limit").copied().unwrap_or(-1.),
            })
        },
        _ => None,
    }
}

fn run(invocation: &Invocation<'_>) -> Result<(), String> {
    let snapshot_path = Path::new(invocation.snapshot_filename);
    let case_path = Path::new(invocation.case_filename);
    let history_path = Path::new(invocation.history_filename);

    if !invocation.resume && snapshot_path.exists() {
        return Err(format!("File '{}' already exists.", invocation.snapshot_filename));
    } else if !invocation.resume && history_path.exists() {
        return Err(format!("File '{}' already exists.", invocation.history_filename));
    }

    // Start/Resume from snapshot
    let mut simulation = Simulation::load(case_path).map_err(|e| {
        if invocation.resume {
            format!("It was not possible to resume the simulation from '{}': {}", invocation.case_filename, e)
        } else {
            format!("It was not possible to start the simulation from '{}': {}", invocation.case_filename, e)
        }
    })?;

    simulation.set_snapshot_periods(invocation.new_historic_snapshot_period, invocation.new_recovery_snapshot_period);
    simulation.set_time_limit(invocation.new_time_limit).map_err(|e| e.to_string())?;
    println!("[INFO {} UTC] {} particles integrated with {} (time step {}) until {}", timestamp(),
             simulation.system.len(), simulation.integrator, simulation.time_step(), simulation.time_limit);
    if !invocation.silent_mode {
        print!("{}", simulation.system);
    }

    // Create/recover historic snapshots
    if invocation.resume {
        holos::output::truncate_history(history_path, simulation.n_history_bytes()).map_err(|e| e.to_string())?;
    }
    let mut history_writer = holos::output::get_history_writer(history_path, invocation.resume).map_err(|e| e.to_string())?;

    // Simulate
    loop {
        match simulation.iterate(&mut history_writer, invocation.silent_mode) {
            Ok(Iteration::Continue { recovery_snapshot_due }) => {
                if recovery_snapshot_due {
                    // Save a snapshot so that we can resume in case of failure
                    simulation.write_recovery_snapshot(snapshot_path, &mut history_writer).map_err(|e| e.to_string())?;
                }
            },
            Ok(Iteration::Completed) => {
                simulation.write_recovery_snapshot(snapshot_path, &mut history_writer).map_err(|e| e.to_string())?;
                if !invocation.silent_mode {
                    println!();
                }
                println!("[INFO {} UTC] Simulation completed at time {}", timestamp(), simulation.system.time());
                break;
            },
            Err(e) => {
                // Keep what has been integrated so far
                let _ = history_writer.flush();
                return Err(format!("{} at time {}", e, simulation.system.time()));
            },
        }
    }
    Ok(())
}

fn main() {
    let start = Instant::now();
    let matches = cli().get_matches();
    let invocation = match parse_invocation(&matches) {
        Some(invocation) => invocation,
        None => {
            let _ = cli().print_help();
            process::exit(2);
        },
    };

    if let Err(message) = run(&invocation) {
        println!("[ERROR {} UTC] {}", timestamp(), message);
        process::exit(1);
    }

    let elapsed = start.elapsed().as_secs_f64();
    if !invocation.resume {
        println!("[INFO {} UTC] Execution time: {} seconds", timestamp(), elapsed);
    } else {
        println!("[INFO {} UTC] Execution time since last resume: {} seconds", timestamp(), elapsed);
    }
}
