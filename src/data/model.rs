use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Axis, Zip};

use crate::constants::{
    DAC_CONVERSION, NOISE_FLOOR, RELATIVE_TOT_FRACTION, SAMPLING_TIME, TOT_THRESHOLD,
};

// ---------------------------------------------------------------------------
// Quantity selectors
// ---------------------------------------------------------------------------

/// Raised when a quantity token read from user input is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type \"{0}\" not implemented")]
pub struct UnknownQuantity(pub String);

/// A quantity stored in the beamline diagnostics archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamQuantity {
    /// Charge from the toroid beam charge transformer in [pC].
    Charge,
    /// Horizontal position from the beam position monitor in [mm].
    PosX,
    /// Vertical position from the beam position monitor in [mm].
    PosY,
}

impl BeamQuantity {
    /// Name of the backing archive entry.
    pub(crate) fn entry_name(self) -> &'static str {
        match self {
            BeamQuantity::Charge => "chargeToroid",
            BeamQuantity::PosX => "posX",
            BeamQuantity::PosY => "posY",
        }
    }

    fn token(self) -> &'static str {
        match self {
            BeamQuantity::Charge => "charge",
            BeamQuantity::PosX => "posX",
            BeamQuantity::PosY => "posY",
        }
    }
}

impl FromStr for BeamQuantity {
    type Err = UnknownQuantity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charge" => Ok(BeamQuantity::Charge),
            "posX" => Ok(BeamQuantity::PosX),
            "posY" => Ok(BeamQuantity::PosY),
            other => Err(UnknownQuantity(other.to_string())),
        }
    }
}

impl fmt::Display for BeamQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A quantity derived from the digitized PMT waveforms of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaloQuantity {
    /// Maximum amplitude of the waveform in [mV].
    Amp,
    /// Position of the amplitude maximum in [ns].
    AmpPos,
    /// Integral of the waveform in [mV µs].
    Int,
    /// Time over the fixed threshold in [ns].
    Tot,
    /// Time over the amplitude-relative threshold in [ns].
    TotRel,
    /// Raw waveform in [adc counts].
    Adc,
    /// Baseline-subtracted waveform in [mV].
    Wave,
}

impl CaloQuantity {
    fn token(self) -> &'static str {
        match self {
            CaloQuantity::Amp => "amp",
            CaloQuantity::AmpPos => "ampPos",
            CaloQuantity::Int => "int",
            CaloQuantity::Tot => "tot",
            CaloQuantity::TotRel => "tot_rel",
            CaloQuantity::Adc => "adc",
            CaloQuantity::Wave => "wave",
        }
    }
}

impl FromStr for CaloQuantity {
    type Err = UnknownQuantity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amp" => Ok(CaloQuantity::Amp),
            "ampPos" => Ok(CaloQuantity::AmpPos),
            "int" => Ok(CaloQuantity::Int),
            "tot" => Ok(CaloQuantity::Tot),
            "tot_rel" => Ok(CaloQuantity::TotRel),
            "adc" => Ok(CaloQuantity::Adc),
            "wave" => Ok(CaloQuantity::Wave),
            other => Err(UnknownQuantity(other.to_string())),
        }
    }
}

impl fmt::Display for CaloQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// CaloData – per-event scalars or waveforms
// ---------------------------------------------------------------------------

/// Result of a calorimeter query: one scalar per event, or one waveform row
/// per event.
#[derive(Debug, Clone, PartialEq)]
pub enum CaloData {
    Scalars(Array1<f64>),
    Waveforms(Array2<f64>),
}

impl CaloData {
    /// Number of events.
    pub fn len(&self) -> usize {
        match self {
            CaloData::Scalars(a) => a.len(),
            CaloData::Waveforms(w) => w.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The per-event scalars, if this is a scalar quantity.
    pub fn as_scalars(&self) -> Option<&Array1<f64>> {
        match self {
            CaloData::Scalars(a) => Some(a),
            CaloData::Waveforms(_) => None,
        }
    }

    /// The per-event waveforms, if this is a waveform quantity.
    pub fn as_waveforms(&self) -> Option<&Array2<f64>> {
        match self {
            CaloData::Scalars(_) => None,
            CaloData::Waveforms(w) => Some(w),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelReadout – one channel of one run
// ---------------------------------------------------------------------------

/// All stored and derived arrays for one digitizer channel of a run.
///
/// Waveform rows are events, columns are samples. The per-event scalar
/// fields (amplitude, amplitude position, integral) are computed upstream
/// and read back from the file, not recomputed from the trace.
///
/// Every public accessor drops the events failing the validity mask, so the
/// returned arrays line up across quantities.
#[derive(Debug, Clone)]
pub struct ChannelReadout {
    /// Event timestamps in [ns].
    timestamps: Array1<f64>,
    /// Raw waveforms in [adc counts].
    adc: Array2<f64>,
    /// Baseline-subtracted waveforms in [mV].
    signal: Array2<f64>,
    /// Stored event amplitudes in [mV].
    amplitudes: Array1<f64>,
    /// Stored positions of the amplitude maximum in [ns].
    amplitude_positions: Array1<f64>,
    /// Stored waveform integrals in [mV µs].
    integrals: Array1<f64>,
}

impl ChannelReadout {
    /// Build a readout from the stored columns, applying the count → mV
    /// conversions and the baseline subtraction.
    pub(crate) fn assemble(
        timestamps: Array1<f64>,
        baselines: Array1<f64>,
        adc: Array2<f64>,
        amplitude_counts: Array1<f64>,
        amplitude_indices: Array1<f64>,
        integral_counts: Array1<f64>,
    ) -> Self {
        // baseline (events,) broadcast against the waveforms (events, samples)
        let baseline_column = baselines.insert_axis(Axis(1));
        let signal = (&adc - &baseline_column).mapv(|d| (DAC_CONVERSION * d).abs());

        let amplitudes = amplitude_counts.mapv(|a| (DAC_CONVERSION * a).abs());
        let amplitude_positions = amplitude_indices.mapv(|i| SAMPLING_TIME * i);
        let integrals = integral_counts.mapv(|v| (DAC_CONVERSION * v).abs() * SAMPLING_TIME / 1e3);

        ChannelReadout {
            timestamps,
            adc,
            signal,
            amplitudes,
            amplitude_positions,
            integrals,
        }
    }

    /// Number of stored events, before masking.
    pub fn n_events(&self) -> usize {
        self.signal.nrows()
    }

    /// Number of samples per waveform.
    pub fn n_samples(&self) -> usize {
        self.signal.ncols()
    }

    /// Absolute time axis of the waveforms in [ns].
    pub fn time_axis(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n_samples()).map(|i| SAMPLING_TIME * i as f64))
    }

    /// Indices of events passing the validity mask: the spread of the
    /// baseline-subtracted signal must exceed the noise floor.
    pub fn valid_indices(&self) -> Vec<usize> {
        self.signal
            .std_axis(Axis(1), 0.0)
            .iter()
            .enumerate()
            .filter(|(_, &spread)| spread > NOISE_FLOOR)
            .map(|(i, _)| i)
            .collect()
    }

    /// Event timestamps in [ns], masked.
    pub fn timestamps(&self) -> Array1<f64> {
        self.masked_scalars(&self.timestamps)
    }

    /// Event amplitudes in [mV], masked.
    pub fn amplitudes(&self) -> Array1<f64> {
        self.masked_scalars(&self.amplitudes)
    }

    /// Positions of the amplitude maximum in [ns], masked.
    pub fn amplitude_positions(&self) -> Array1<f64> {
        self.masked_scalars(&self.amplitude_positions)
    }

    /// Waveform integrals in [mV µs], masked.
    pub fn integrals(&self) -> Array1<f64> {
        self.masked_scalars(&self.integrals)
    }

    /// Time the signal spends above the fixed threshold, in [ns], masked.
    pub fn time_over_threshold(&self) -> Array1<f64> {
        let thresholds = Array1::from_elem(self.n_events(), TOT_THRESHOLD);
        self.masked_scalars(&self.samples_over(&thresholds))
    }

    /// Time the signal spends above a fraction of the event amplitude, in
    /// [ns], masked.
    pub fn relative_time_over_threshold(&self) -> Array1<f64> {
        let thresholds = self.amplitudes.mapv(|a| RELATIVE_TOT_FRACTION * a);
        self.masked_scalars(&self.samples_over(&thresholds))
    }

    /// Raw waveforms in [adc counts], masked.
    pub fn raw_waveforms(&self) -> Array2<f64> {
        self.masked_waveforms(&self.adc)
    }

    /// Baseline-subtracted waveforms in [mV], masked.
    pub fn waveforms(&self) -> Array2<f64> {
        self.masked_waveforms(&self.signal)
    }

    /// The requested quantity with invalid events dropped.
    pub fn quantity(&self, quantity: CaloQuantity) -> CaloData {
        match quantity {
            CaloQuantity::Amp => CaloData::Scalars(self.amplitudes()),
            CaloQuantity::AmpPos => CaloData::Scalars(self.amplitude_positions()),
            CaloQuantity::Int => CaloData::Scalars(self.integrals()),
            CaloQuantity::Tot => CaloData::Scalars(self.time_over_threshold()),
            CaloQuantity::TotRel => CaloData::Scalars(self.relative_time_over_threshold()),
            CaloQuantity::Adc => CaloData::Waveforms(self.raw_waveforms()),
            CaloQuantity::Wave => CaloData::Waveforms(self.waveforms()),
        }
    }

    /// Per-event duration above a per-event threshold, in [ns].
    fn samples_over(&self, thresholds: &Array1<f64>) -> Array1<f64> {
        Zip::from(self.signal.rows())
            .and(thresholds)
            .map_collect(|row, &threshold| {
                SAMPLING_TIME * row.iter().filter(|&&s| s > threshold).count() as f64
            })
    }

    fn masked_scalars(&self, values: &Array1<f64>) -> Array1<f64> {
        values.select(Axis(0), &self.valid_indices())
    }

    fn masked_waveforms(&self, waveforms: &Array2<f64>) -> Array2<f64> {
        waveforms.select(Axis(0), &self.valid_indices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // Three events, four samples: event 0 carries a pulse well above the
    // noise floor, event 1 is flat (empty), event 2 carries a smaller pulse
    // that still passes the mask. Counts chosen so the pulse deviations are
    // thousands of counts (hundreds of mV).
    fn readout() -> ChannelReadout {
        let baselines = array![8000.0, 8000.0, 8000.0];
        let adc = array![
            [8000.0, 4000.0, 2000.0, 8000.0],
            [8000.0, 8000.0, 8000.0, 8000.0],
            [8000.0, 8000.0, 4000.0, 8000.0],
        ];
        let timestamps = array![10.0, 20.0, 30.0];
        let amplitude_counts = array![-6000.0, -10.0, -4000.0];
        let amplitude_indices = array![2.0, 0.0, 2.0];
        let integral_counts = array![-10000.0, -10.0, -4000.0];
        ChannelReadout::assemble(
            timestamps,
            baselines,
            adc,
            amplitude_counts,
            amplitude_indices,
            integral_counts,
        )
    }

    #[test]
    fn signal_is_baseline_subtracted_and_converted() {
        let r = readout();
        let wave = r.waveforms();
        // first event, second sample: |dacConv · (8000 − 4000)|
        let expected = DAC_CONVERSION * 4000.0;
        assert!((wave[[0, 1]] - expected).abs() < 1e-9);
        assert_eq!(wave[[0, 0]], 0.0);
    }

    #[test]
    fn flat_events_fail_the_validity_mask() {
        let r = readout();
        assert_eq!(r.valid_indices(), vec![0, 2]);
    }

    #[test]
    fn mask_is_applied_uniformly_to_every_quantity() {
        let r = readout();
        let n_valid = r.valid_indices().len();
        for quantity in [
            CaloQuantity::Amp,
            CaloQuantity::AmpPos,
            CaloQuantity::Int,
            CaloQuantity::Tot,
            CaloQuantity::TotRel,
            CaloQuantity::Adc,
            CaloQuantity::Wave,
        ] {
            assert_eq!(r.quantity(quantity).len(), n_valid, "{quantity}");
        }
        // the flat event's timestamp is gone
        assert_eq!(r.timestamps(), array![10.0, 30.0]);
    }

    #[test]
    fn stored_fields_are_converted_not_recomputed() {
        let r = readout();
        let amp = r.amplitudes();
        assert!((amp[0] - DAC_CONVERSION * 6000.0).abs() < 1e-9);
        let pos = r.amplitude_positions();
        assert_eq!(pos[0], 2.0 * SAMPLING_TIME);
        let int = r.integrals();
        assert!((int[0] - DAC_CONVERSION * 10000.0 * SAMPLING_TIME / 1e3).abs() < 1e-9);
    }

    #[test]
    fn tot_is_a_multiple_of_the_sampling_time() {
        let r = readout();
        let max = SAMPLING_TIME * r.n_samples() as f64;
        for tot in r.time_over_threshold().iter().chain(r.relative_time_over_threshold().iter()) {
            assert!(*tot >= 0.0);
            assert!(*tot <= max);
            assert_eq!(tot % SAMPLING_TIME, 0.0);
        }
    }

    #[test]
    fn tot_counts_samples_above_the_fixed_threshold() {
        let r = readout();
        // event 0: deviations of 0, 4000, 6000, 0 counts ≈ 0, 488, 732, 0 mV;
        // two samples clear the 120 mV threshold
        assert_eq!(r.time_over_threshold()[0], 2.0 * SAMPLING_TIME);
    }

    #[test]
    fn unknown_tokens_are_rejected_with_the_offending_value() {
        let err = "foo".parse::<CaloQuantity>().unwrap_err();
        assert_eq!(err.to_string(), "type \"foo\" not implemented");
        let err = "bar".parse::<BeamQuantity>().unwrap_err();
        assert_eq!(err.to_string(), "type \"bar\" not implemented");
    }

    #[test]
    fn tokens_round_trip_through_display() {
        for q in ["amp", "ampPos", "int", "tot", "tot_rel", "adc", "wave"] {
            assert_eq!(q.parse::<CaloQuantity>().unwrap().to_string(), q);
        }
        for q in ["charge", "posX", "posY"] {
            assert_eq!(q.parse::<BeamQuantity>().unwrap().to_string(), q);
        }
    }
}
