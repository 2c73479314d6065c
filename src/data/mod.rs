/// Data layer: per-run file access and derived waveform quantities.
///
/// Architecture:
/// ```text
///  processed/run_<NNNNN>.npz      data/measurements/run_<NNNNN>.parquet
///        │                                   │
///        ▼                                   ▼
///   ┌──────────┐                       ┌──────────┐
///   │  loader   │  archive entry →     │  loader   │  table columns →
///   └──────────┘  Array1<f64>          └──────────┘  ChannelReadout
///                                            │
///                                            ▼
///                                    ┌───────────────┐
///                                    │ ChannelReadout │  signal, validity
///                                    └───────────────┘  mask, quantities
/// ```
pub mod loader;
pub mod model;
