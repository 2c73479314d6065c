use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int32Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::Array1;
use ndarray_npy::NpzWriter;
use parquet::arrow::ArrowWriter;

use beamtest_analysis::constants::NUM_CHANNELS;
use beamtest_analysis::data::loader::{calo_file, doocs_file};

const RUN: u32 = 42;
const N_EVENTS: usize = 200;
const N_SAMPLES: usize = 1024;
const BASELINE: f64 = 8200.0;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// The stored per-event columns of one digitizer channel, counts domain.
struct ChannelColumns {
    baselines: Vec<f64>,
    traces: Vec<Vec<i32>>,
    amplitudes: Vec<f64>,
    positions: Vec<f64>,
    integrals: Vec<f64>,
}

fn synth_channel(rng: &mut SimpleRng) -> ChannelColumns {
    let mut baselines = Vec::with_capacity(N_EVENTS);
    let mut traces = Vec::with_capacity(N_EVENTS);
    let mut amplitudes = Vec::with_capacity(N_EVENTS);
    let mut positions = Vec::with_capacity(N_EVENTS);
    let mut integrals = Vec::with_capacity(N_EVENTS);

    for _ in 0..N_EVENTS {
        let baseline = (BASELINE + rng.gauss(0.0, 30.0)).round();
        // roughly one event in seven misses the detector: noise only
        let empty = rng.next_f64() < 0.15;
        let amplitude = 4000.0 + 6000.0 * rng.next_f64();
        let mu = 200.0 + 600.0 * rng.next_f64();
        let sigma = 15.0 + 10.0 * rng.next_f64();

        let mut trace = Vec::with_capacity(N_SAMPLES);
        for i in 0..N_SAMPLES {
            let pulse = if empty {
                0.0
            } else {
                gaussian(i as f64, mu, sigma, amplitude)
            };
            let counts = (baseline - pulse + rng.gauss(0.0, 8.0)).round().max(0.0);
            trace.push(counts as i32);
        }

        // per-event fields as the DAQ stores them: signed counts below baseline
        let deviations: Vec<f64> = trace.iter().map(|&c| baseline - f64::from(c)).collect();
        let mut peak = 0.0_f64;
        let mut peak_index = 0usize;
        for (i, &d) in deviations.iter().enumerate() {
            if d > peak {
                peak = d;
                peak_index = i;
            }
        }

        baselines.push(baseline);
        traces.push(trace);
        amplitudes.push(-peak);
        positions.push(peak_index as f64);
        integrals.push(-deviations.iter().sum::<f64>());
    }

    ChannelColumns {
        baselines,
        traces,
        amplitudes,
        positions,
        integrals,
    }
}

fn write_calo(root: &Path, rng: &mut SimpleRng) -> Result<()> {
    let timestamps: Vec<i64> = (0..N_EVENTS)
        .map(|i| i as i64 * 1_000_000 + (rng.next_f64() * 1000.0) as i64)
        .collect();

    let mut fields = vec![Field::new("timestamp", DataType::Int64, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(timestamps))];

    for channel in 0..NUM_CHANNELS {
        let chan = synth_channel(rng);

        let mut trace_builder = ListBuilder::new(Int32Builder::new());
        for trace in &chan.traces {
            trace_builder.values().append_slice(trace);
            trace_builder.append(true);
        }

        fields.push(Field::new(format!("baseline{channel}"), DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(chan.baselines)));
        fields.push(Field::new(
            format!("data{channel}"),
            DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
            false,
        ));
        columns.push(Arc::new(trace_builder.finish()));
        fields.push(Field::new(format!("amplitude{channel}"), DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(chan.amplitudes)));
        fields.push(Field::new(
            format!("amplitude_position{channel}"),
            DataType::Float64,
            false,
        ));
        columns.push(Arc::new(Float64Array::from(chan.positions)));
        fields.push(Field::new(format!("integral{channel}"), DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(chan.integrals)));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("creating record batch")?;

    let path = calo_file(root, RUN);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {N_EVENTS} events x {NUM_CHANNELS} channels ({N_SAMPLES} samples each) to {}",
        path.display()
    );
    Ok(())
}

fn write_doocs(root: &Path, rng: &mut SimpleRng) -> Result<()> {
    let charge = Array1::from_iter((0..N_EVENTS).map(|_| rng.gauss(250.0, 20.0)));
    let pos_x = Array1::from_iter((0..N_EVENTS).map(|_| rng.gauss(0.0, 1.5)));
    let pos_y = Array1::from_iter((0..N_EVENTS).map(|_| rng.gauss(0.0, 1.5)));

    let path = doocs_file(root, RUN);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut npz = NpzWriter::new(file);
    npz.add_array("chargeToroid", &charge)?;
    npz.add_array("posX", &pos_x)?;
    npz.add_array("posY", &pos_y)?;
    npz.finish()?;

    println!("Wrote {N_EVENTS} diagnostics entries to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);
    let root = Path::new("sample_data");
    write_calo(root, &mut rng)?;
    write_doocs(root, &mut rng)?;
    Ok(())
}
