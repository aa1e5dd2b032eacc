//! Scalar metric logging.
//!
//! The trainer reports its time series through [`ScalarWriter`]. The
//! [`TensorboardWriter`] appends rows to a `scalars.csv` file that plotting
//! tools or a TensorBoard converter can pick up; [`MemoryWriter`] keeps the
//! rows in memory.

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Receiver for named scalar time series. Purely observational.
pub trait ScalarWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// CSV-backed writer: one `step,tag,value,wall_time` row per scalar.
pub struct TensorboardWriter {
    log_dir: PathBuf,
    start_time: u64,
    scalar_writer: BufWriter<File>,
}

impl TensorboardWriter {
    /// Create `log_dir/run_name/` and open `scalars.csv` inside it.
    pub fn new<P: AsRef<Path>>(log_dir: P, run_name: &str) -> Result<Self> {
        let log_path = log_dir.as_ref().join(run_name);
        create_dir_all(&log_path)?;

        let scalar_file = File::create(log_path.join("scalars.csv"))?;
        let mut scalar_writer = BufWriter::new(scalar_file);
        writeln!(scalar_writer, "step,tag,value,wall_time")?;

        Ok(Self {
            log_dir: log_path,
            start_time: unix_secs(),
            scalar_writer,
        })
    }

    /// Directory this run writes into.
    pub fn run_dir(&self) -> &Path {
        &self.log_dir
    }

    fn wall_time(&self) -> u64 {
        unix_secs().saturating_sub(self.start_time)
    }
}

impl ScalarWriter for TensorboardWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64) -> Result<()> {
        let wall_time = self.wall_time();
        writeln!(self.scalar_writer, "{},{},{},{}", step, tag, value, wall_time)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.scalar_writer.flush()?;
        Ok(())
    }
}

impl Drop for TensorboardWriter {
    fn drop(&mut self) {
        let _ = self.scalar_writer.flush();
    }
}

/// Seconds since the Unix epoch, 0 if the clock is before it.
pub fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One recorded scalar.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f32,
    pub step: u64,
}

/// In-memory writer.
#[derive(Clone, Debug, Default)]
pub struct MemoryWriter {
    pub records: Vec<ScalarRecord>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All values recorded under `tag`, as `(step, value)` in write order.
    pub fn series(&self, tag: &str) -> Vec<(u64, f32)> {
        self.records
            .iter()
            .filter(|r| r.tag == tag)
            .map(|r| (r.step, r.value))
            .collect()
    }
}

impl ScalarWriter for MemoryWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64) -> Result<()> {
        self.records.push(ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
        });
        Ok(())
    }
}

impl<W: ScalarWriter + ?Sized> ScalarWriter for &mut W {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64) -> Result<()> {
        (**self).add_scalar(tag, value, step)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_writer_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut writer = TensorboardWriter::new(dir.path(), "run").unwrap();
            writer.add_scalar("train/Q-loss", 1.5, 0).unwrap();
            writer.add_scalar("eval/rewards", -120.0, 25).unwrap();
            writer.flush().unwrap();
        }
        let content = std::fs::read_to_string(dir.path().join("run").join("scalars.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "step,tag,value,wall_time");
        assert!(lines[1].starts_with("0,train/Q-loss,1.5,"));
        assert!(lines[2].starts_with("25,eval/rewards,-120,"));
    }

    #[test]
    fn test_memory_writer_series() {
        let mut writer = MemoryWriter::new();
        writer.add_scalar("a", 1.0, 0).unwrap();
        writer.add_scalar("b", 2.0, 0).unwrap();
        writer.add_scalar("a", 3.0, 1).unwrap();
        assert_eq!(writer.series("a"), vec![(0, 1.0), (1, 3.0)]);
    }
}
