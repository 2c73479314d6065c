use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    LargeListArray, ListArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;
use ndarray::{Array1, Array2};
use ndarray_npy::NpzReader;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{BeamQuantity, CaloData, CaloQuantity, ChannelReadout};

// ---------------------------------------------------------------------------
// Per-run file layout
// ---------------------------------------------------------------------------

/// Path of the preprocessed beamline diagnostics archive for a run.
pub fn doocs_file(root: &Path, run: u32) -> PathBuf {
    root.join("processed").join(format!("run_{run:05}.npz"))
}

/// Path of the digitized waveform table for a run.
pub fn calo_file(root: &Path, run: u32) -> PathBuf {
    root.join("data")
        .join("measurements")
        .join(format!("run_{run:05}.parquet"))
}

// ---------------------------------------------------------------------------
// Beamline diagnostics (DOOCS)
// ---------------------------------------------------------------------------

/// Read one beamline diagnostics array for a run, unmodified: no masking,
/// no unit conversion (both are done upstream).
pub fn get_doocs(root: &Path, run: u32, quantity: BeamQuantity) -> Result<Array1<f64>> {
    let path = doocs_file(root, run);
    debug!("run {run}: loading {quantity} from {}", path.display());

    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut npz = NpzReader::new(file).with_context(|| format!("reading {}", path.display()))?;
    npz_entry(&mut npz, quantity.entry_name())
}

/// Fetch an archive entry by name. numpy's `savez` stores entries with a
/// `.npy` suffix, so that spelling is tried first.
fn npz_entry(npz: &mut NpzReader<File>, name: &str) -> Result<Array1<f64>> {
    if let Ok(values) = npz.by_name(&format!("{name}.npy")) {
        return Ok(values);
    }
    Ok(npz.by_name(name)?)
}

// ---------------------------------------------------------------------------
// Calorimeter waveforms
// ---------------------------------------------------------------------------

/// One-shot calorimeter query: open the run file, derive the requested
/// quantity for one channel and return it with invalid events dropped.
pub fn get_calo(root: &Path, run: u32, channel: usize, quantity: CaloQuantity) -> Result<CaloData> {
    Ok(load_channel(root, run, channel)?.quantity(quantity))
}

/// Load the stored arrays for one digitizer channel of a run.
///
/// The channel index is not range-checked; a channel missing from the file
/// fails with the error of its first absent column.
pub fn load_channel(root: &Path, run: u32, channel: usize) -> Result<ChannelReadout> {
    let path = calo_file(root, run);
    debug!("run {run}: loading channel {channel} from {}", path.display());

    let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?;
    let reader = builder.build().context("building parquet reader")?;
    let batches: Vec<RecordBatch> = reader
        .collect::<std::result::Result<_, _>>()
        .context("reading parquet record batches")?;

    let timestamps = scalar_column(&batches, "timestamp")?;
    let baselines = scalar_column(&batches, &format!("baseline{channel}"))?;
    let adc = list_column(&batches, &format!("data{channel}"))?;
    let amplitude_counts = scalar_column(&batches, &format!("amplitude{channel}"))?;
    let amplitude_indices = scalar_column(&batches, &format!("amplitude_position{channel}"))?;
    let integral_counts = scalar_column(&batches, &format!("integral{channel}"))?;

    let n_events = timestamps.len();
    for (column, length) in [
        (format!("baseline{channel}"), baselines.len()),
        (format!("data{channel}"), adc.nrows()),
        (format!("amplitude{channel}"), amplitude_counts.len()),
        (format!("amplitude_position{channel}"), amplitude_indices.len()),
        (format!("integral{channel}"), integral_counts.len()),
    ] {
        if length != n_events {
            bail!("column '{column}' has {length} events, expected {n_events}");
        }
    }

    Ok(ChannelReadout::assemble(
        timestamps,
        baselines,
        adc,
        amplitude_counts,
        amplitude_indices,
        integral_counts,
    ))
}

// -- Arrow column helpers --

/// Concatenate a numeric scalar column across batches into one array.
fn scalar_column(batches: &[RecordBatch], name: &str) -> Result<Array1<f64>> {
    let mut values = Vec::new();
    for batch in batches {
        let column = batch
            .column_by_name(name)
            .with_context(|| format!("missing column '{name}'"))?;
        append_numeric(column, &mut values).with_context(|| format!("column '{name}'"))?;
    }
    Ok(Array1::from_vec(values))
}

/// Concatenate a list column across batches into an (events, samples) array.
/// The waveforms are fixed-length, so ragged rows are an error.
fn list_column(batches: &[RecordBatch], name: &str) -> Result<Array2<f64>> {
    let mut flat = Vec::new();
    let mut n_samples: Option<usize> = None;

    for batch in batches {
        let column = batch
            .column_by_name(name)
            .with_context(|| format!("missing column '{name}'"))?;
        match column.data_type() {
            DataType::List(_) => {
                let list = column
                    .as_any()
                    .downcast_ref::<ListArray>()
                    .context("expected ListArray")?;
                for row in 0..list.len() {
                    append_row(&list.value(row), &mut flat, &mut n_samples)
                        .with_context(|| format!("column '{name}', row {row}"))?;
                }
            }
            DataType::LargeList(_) => {
                let list = column
                    .as_any()
                    .downcast_ref::<LargeListArray>()
                    .context("expected LargeListArray")?;
                for row in 0..list.len() {
                    append_row(&list.value(row), &mut flat, &mut n_samples)
                        .with_context(|| format!("column '{name}', row {row}"))?;
                }
            }
            other => bail!("expected a list column for '{name}', got {other:?}"),
        }
    }

    let n_samples = n_samples.unwrap_or(0);
    let n_events = if n_samples == 0 { 0 } else { flat.len() / n_samples };
    Ok(Array2::from_shape_vec((n_events, n_samples), flat)?)
}

fn append_row(values: &ArrayRef, flat: &mut Vec<f64>, n_samples: &mut Option<usize>) -> Result<()> {
    let start = flat.len();
    append_numeric(values, flat)?;
    let length = flat.len() - start;
    match *n_samples {
        Some(expected) if expected != length => {
            bail!("waveform has {length} samples, expected {expected}")
        }
        None => *n_samples = Some(length),
        _ => {}
    }
    Ok(())
}

/// Append the values of a numeric Arrow array as f64. Nulls become NaN.
fn append_numeric(column: &ArrayRef, out: &mut Vec<f64>) -> Result<()> {
    match column.data_type() {
        DataType::Float64 => {
            let values = column
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            out.extend(values.iter().map(|v| v.unwrap_or(f64::NAN)));
        }
        DataType::Float32 => {
            let values = column
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            out.extend(values.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        DataType::Int64 => {
            let values = column
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            out.extend(values.iter().map(|v| v.map_or(f64::NAN, |x| x as f64)));
        }
        DataType::Int32 => {
            let values = column
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            out.extend(values.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        DataType::Int16 => {
            let values = column
                .as_any()
                .downcast_ref::<Int16Array>()
                .context("expected Int16Array")?;
            out.extend(values.iter().map(|v| v.map_or(f64::NAN, f64::from)));
        }
        other => bail!("unsupported numeric type {other:?}"),
    }
    Ok(())
}
