use std::fs;
use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Write, BufWriter, BufReader};
use std::path::{Path, PathBuf};
use bincode;
use csv;
use serde::ser::Serialize;
use serde::de::DeserializeOwned;
use serde_json;
use super::super::errors::{DynamicsError, Result};
use super::super::particles::System;
use super::super::tools::timestamp;


////////////////////////////////////////////////////////////////////////////////
//- Dump and restore functions
////////////////////////////////////////////////////////////////////////////////

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |extension| extension == "json")
}

/// Serializes `value` as pretty JSON when the path ends in `.json`, as bincode otherwise.
pub fn write_snapshot<T: Serialize>(snapshot_path: &Path, value: &T) -> Result<()> {
    write_snapshot_as(snapshot_path, value, is_json(snapshot_path))
}

fn write_snapshot_as<T: Serialize>(snapshot_path: &Path, value: &T, json: bool) -> Result<()> {
    let mut writer = BufWriter::new(File::create(snapshot_path)?);
    if json {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        bincode::serialize_into(&mut writer, value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the snapshot next to its final location and renames it into place,
/// so that an interrupted write never replaces a readable snapshot. The
/// previous snapshot (if any) is kept as `<name>.bak`.
pub fn write_recovery_snapshot<T: Serialize>(snapshot_path: &Path, value: &T) -> Result<()> {
    let temporary_path = sibling_path(snapshot_path, ".tmp");
    write_snapshot_as(&temporary_path, value, is_json(snapshot_path))?;
    if snapshot_path.exists() {
        fs::rename(snapshot_path, backup_path(snapshot_path))?;
    }
    fs::rename(&temporary_path, snapshot_path)?;
    Ok(())
}

pub fn backup_path(snapshot_path: &Path) -> PathBuf {
    sibling_path(snapshot_path, ".bak")
}

// snapshot.json -> snapshot.json.bak
fn sibling_path(snapshot_path: &Path, suffix: &str) -> PathBuf {
    let mut file_name = snapshot_path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    file_name.push(suffix);
    snapshot_path.with_file_name(file_name)
}

pub fn read_snapshot<T: DeserializeOwned>(snapshot_path: &Path) -> Result<T> {
    read_snapshot_as(snapshot_path, is_json(snapshot_path))
}

/// Reads the recovery snapshot, falling back to the `.bak` copy of the
/// previous one when the snapshot is missing or unreadable.
pub fn read_recovery_snapshot<T: DeserializeOwned>(snapshot_path: &Path) -> Result<T> {
    let e = match read_snapshot(snapshot_path) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    let backup_path = backup_path(snapshot_path);
    if !backup_path.exists() {
        return Err(e);
    }
    match read_snapshot_as(&backup_path, is_json(snapshot_path)) {
        Ok(value) => {
            println!("[WARNING {} UTC] Snapshot '{}' could not be read ({}), restored the previous one from '{}'",
                     timestamp(), snapshot_path.display(), e, backup_path.display());
            Ok(value)
        },
        // Report the error of the snapshot that was asked for
        Err(_) => Err(e),
    }
}

fn read_snapshot_as<T: DeserializeOwned>(snapshot_path: &Path, json: bool) -> Result<T> {
    let reader = BufReader::new(File::open(snapshot_path)?);
    if json {
        Ok(serde_json::from_reader(reader)?)
    } else {
        Ok(bincode::deserialize_from(reader)?)
    }
}


////////////////////////////////////////////////////////////////////////////////
//- Historic snapshots
////////////////////////////////////////////////////////////////////////////////

/// One row of the history file: the state of one particle at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub time: f64,
    pub time_step: f64,
    pub step: u64,
    pub id: usize,
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub velocity_z: f64,
    pub mass: f64,
    pub total_energy: f64, // Same value for every particle of a snapshot
}

// Counts the bytes handed to the underlying writer
struct ByteCounter<W: Write> {
    inner: W,
    n_bytes: u64,
}

impl<W: Write> Write for ByteCounter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.n_bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct HistoryWriter<W: Write> {
    writer: csv::Writer<ByteCounter<W>>,
}

impl<W: Write> HistoryWriter<W> {
    /// `existing_n_bytes` is the length of the history already present in
    /// `inner` (rows are appended after it).
    pub fn new(inner: W, write_headers: bool, existing_n_bytes: u64) -> HistoryWriter<W> {
        let counter = ByteCounter { inner: inner, n_bytes: existing_n_bytes };
        let writer = csv::WriterBuilder::new().has_headers(write_headers).from_writer(counter);
        HistoryWriter { writer: writer }
    }

    /// Length of the history once the buffered rows have been flushed.
    pub fn n_bytes(&self) -> u64 {
        self.writer.get_ref().n_bytes
    }

    pub fn write_snapshot(&mut self, system: &System) -> Result<()> {
        let total_energy = system.total_energy()?;
        for particle in system.particles().iter() {
            let record = HistoryRecord {
                time: system.time(),
                time_step: system.last_time_step(),
                step: system.n_steps(),
                id: particle.id,
                position_x: particle.position.x,
                position_y: particle.position.y,
                position_z: particle.position.z,
                velocity_x: particle.velocity.x,
                velocity_y: particle.velocity.y,
                velocity_z: particle.velocity.z,
                mass: particle.mass,
                total_energy: total_energy,
            };
            self.writer.serialize(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Opens the history file. When resuming, rows are appended to the existing
/// file and no header is written again.
pub fn get_history_writer(history_path: &Path, resume: bool) -> Result<HistoryWriter<File>> {
    let existing_n_bytes = match fs::metadata(history_path) {
        Ok(metadata) if resume => metadata.len(),
        _ => 0,
    };
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if resume {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let history_file = options.open(history_path)?;
    Ok(HistoryWriter::new(history_file, existing_n_bytes == 0, existing_n_bytes))
}

/// Drops whatever was written after the recovery snapshot a simulation is
/// resumed from (complete rows or a partially flushed one), so that the
/// history does not contain duplicated instants. The history must contain at
/// least the `expected_n_bytes` accounted for by the snapshot.
pub fn truncate_history(history_path: &Path, expected_n_bytes: u64) -> Result<()> {
    let current_n_bytes = match fs::metadata(history_path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };
    if current_n_bytes < expected_n_bytes {
        return Err(DynamicsError::IncompleteHistory { expected_n_bytes: expected_n_bytes, current_n_bytes: current_n_bytes });
    }
    if current_n_bytes > expected_n_bytes {
        let history_file = OpenOptions::new().write(true).open(history_path)?;
        history_file.set_len(expected_n_bytes)?;
    }
    Ok(())
}

pub fn read_history(history_path: &Path) -> Result<Vec<HistoryRecord>> {
    let mut reader = csv::Reader::from_path(history_path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}
