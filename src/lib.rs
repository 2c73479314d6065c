//! Analysis helpers for calorimeter beam-test runs.
//!
//! The crate collects the small, stateless building blocks used when looking
//! at beam-test data: accessors for the per-run data files, statistics
//! helpers with first-order error propagation, polynomial fit models for
//! calibration curves, and plot-style presets.
//!
//! Each run leaves two artifacts on disk, both named from the run number:
//!
//! ```text
//! <root>/processed/run_00042.npz              beamline diagnostics (DOOCS)
//! <root>/data/measurements/run_00042.parquet  digitized PMT waveforms
//! ```
//!
//! ```rust,no_run
//! use beamtest_analysis::{get_calo, get_doocs, BeamQuantity, CaloQuantity};
//!
//! let root = std::path::Path::new("/data/beamtest");
//! let charge = get_doocs(root, 42, BeamQuantity::Charge)?;
//! let amplitudes = get_calo(root, 42, 3, CaloQuantity::Amp)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod constants;
pub mod data;
pub mod fit;
pub mod stats;
pub mod style;

pub use data::loader::{get_calo, get_doocs, load_channel};
pub use data::model::{BeamQuantity, CaloData, CaloQuantity, ChannelReadout, UnknownQuantity};
pub use stats::Measurement;
