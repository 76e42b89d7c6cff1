//! Peak normalization.

use tracing::debug;

use super::buffer::AudioBuffer;

/// Scale `audio` so its loudest sample sits `headroom_db` below full scale.
///
/// Returns the gain applied, or `None` for digital silence, which is left
/// untouched.
pub fn normalize_peak(audio: &mut AudioBuffer, headroom_db: f64) -> Option<f64> {
    let peak_db = audio.peak_dbfs();
    if !peak_db.is_finite() {
        return None;
    }

    let gain_db = -headroom_db - peak_db;
    audio.apply_gain_db(gain_db);
    debug!(peak_db, gain_db, "Peak normalized");
    Some(gain_db)
}
