//! Export of recorded runs: snapshot streams for the visualizer and a CSV of the
//! final particle positions.

use anyhow::{Context, Result};
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tasep_common::Snapshot;

/// On-disk encoding of a snapshot stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    /// Parses the `format` key of the config. Unknown names fall back to JSON.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.unwrap_or("json") {
            "json" => OutputFormat::Json,
            "bincode" => OutputFormat::Bincode,
            "messagepack" => OutputFormat::MessagePack,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                OutputFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes `snapshots` to `<base>_snapshots.<ext>` and returns the path written.
pub fn save_snapshots(snapshots: &[Snapshot], base_filename: &str, format: OutputFormat) -> Result<PathBuf> {
    let filename = PathBuf::from(format!("{}_snapshots.{}", base_filename, format.extension()));
    let file = File::create(&filename)
        .with_context(|| format!("Error creating snapshot file '{}'", filename.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, snapshots).context("Error serializing snapshots to JSON")?;
        }
        OutputFormat::Bincode => write_snapshot_stream(&mut writer, snapshots)?,
        OutputFormat::MessagePack => {
            rmp_serde::encode::write(&mut writer, snapshots)
                .context("Error serializing snapshots to MessagePack")?;
        }
    }
    writer.flush()?;

    info!(
        "{} snapshots saved to {} ({:?} format)",
        snapshots.len(),
        filename.display(),
        format
    );
    Ok(filename)
}

/// Binary stream layout: a `u32` count followed by that many bincode snapshots.
pub fn write_snapshot_stream<W: Write>(mut writer: W, snapshots: &[Snapshot]) -> Result<()> {
    let count = u32::try_from(snapshots.len()).context("Too many snapshots for one stream")?;
    bincode::serialize_into(&mut writer, &count).context("Error writing snapshot count")?;
    for snapshot in snapshots {
        bincode::serialize_into(&mut writer, snapshot).context("Error serializing snapshot to bincode")?;
    }
    Ok(())
}

/// Reads a stream written by [`write_snapshot_stream`].
pub fn read_snapshot_stream<R: Read>(mut reader: R) -> Result<Vec<Snapshot>> {
    let count: u32 = bincode::deserialize_from(&mut reader).context("Failed to read snapshot count")?;
    let mut snapshots = Vec::with_capacity(count.min(1 << 16) as usize);
    for index in 0..count {
        let snapshot: Snapshot = bincode::deserialize_from(&mut reader)
            .with_context(|| format!("Failed to deserialize snapshot {}", index))?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

/// Opens and reads a binary snapshot file.
pub fn load_snapshot_file<P: AsRef<Path>>(path: P) -> Result<Vec<Snapshot>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open input file '{}'", path.display()))?;
    read_snapshot_stream(BufReader::new(file))
}

/// Writes one `(index, position)` row per particle to `<base>_final_positions.csv`.
pub fn save_final_positions(positions: &[i64], base_filename: &str) -> Result<PathBuf> {
    let filename = PathBuf::from(format!("{}_final_positions.csv", base_filename));
    let mut writer = csv::Writer::from_path(&filename)
        .with_context(|| format!("Error saving CSV file '{}'", filename.display()))?;
    writer.write_record(["index", "position"])?;
    for (index, position) in positions.iter().enumerate() {
        writer.write_record(&[index.to_string(), position.to_string()])?;
    }
    writer.flush()?;
    info!("Final positions saved to {}", filename.display());
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(frame: u64, positions: Option<Vec<i64>>) -> Snapshot {
        Snapshot {
            frame,
            model_time: frame as f64 * 1.25,
            particle_count: 3,
            free_count: 2,
            leader_position: 7,
            can_be_stopped: frame > 1,
            positions,
        }
    }

    #[test]
    fn stream_has_a_u32_header() {
        let snaps = vec![snapshot(0, Some(vec![7, 5, 4])), snapshot(2, None)];
        let mut buffer = Vec::new();
        write_snapshot_stream(&mut buffer, &snaps).unwrap();
        assert_eq!(&buffer[..4], &2u32.to_le_bytes());
        let back = read_snapshot_stream(buffer.as_slice()).unwrap();
        assert_eq!(back, snaps);
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let mut buffer = Vec::new();
        write_snapshot_stream(&mut buffer, &[snapshot(0, None)]).unwrap();
        buffer.truncate(buffer.len() - 3);
        assert!(read_snapshot_stream(buffer.as_slice()).is_err());
    }

    #[test]
    fn format_names() {
        assert_eq!(OutputFormat::from_name(None), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name(Some("bincode")), OutputFormat::Bincode);
        assert_eq!(OutputFormat::from_name(Some("messagepack")).extension(), "msgpack");
        assert_eq!(OutputFormat::from_name(Some("yaml")), OutputFormat::Json);
    }

    #[test]
    fn writes_files_next_to_the_base_name() {
        let dir = std::env::temp_dir().join(format!("tasep-output-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("run");
        let base = base.to_str().unwrap();

        let snaps = vec![snapshot(0, Some(vec![1, 0]))];
        let json = save_snapshots(&snaps, base, OutputFormat::Json).unwrap();
        let parsed: Vec<Snapshot> = serde_json::from_reader(File::open(&json).unwrap()).unwrap();
        assert_eq!(parsed, snaps);

        let bin = save_snapshots(&snaps, base, OutputFormat::Bincode).unwrap();
        assert_eq!(load_snapshot_file(&bin).unwrap(), snaps);

        let msgpack = save_snapshots(&snaps, base, OutputFormat::MessagePack).unwrap();
        let parsed: Vec<Snapshot> = rmp_serde::from_read(File::open(&msgpack).unwrap()).unwrap();
        assert_eq!(parsed, snaps);

        let csv_path = save_final_positions(&[4, 2, 1], base).unwrap();
        let text = std::fs::read_to_string(csv_path).unwrap();
        assert_eq!(text, "index,position\n0,4\n1,2\n2,1\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
