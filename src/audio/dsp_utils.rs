// Utilitaires DSP - Hygiène audio
//
// Allocation-free helpers applied to every sample in the real-time callback.

/// Flush denormals to zero (anti-dénormaux)
///
/// Les nombres dénormaux peuvent causer des ralentissements CPU importants.
/// Seuil: 1e-15 (largement sous le bruit numérique à 32-bit float)
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Replace NaN and infinities by silence, then flush denormals
///
/// The render path must never propagate a corrupt value to the device.
#[inline]
pub fn sanitize_sample(x: f32) -> f32 {
    if x.is_finite() {
        flush_denormals_to_zero(x)
    } else {
        0.0
    }
}
