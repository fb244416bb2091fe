// Format conversion for CPAL audio streams
//
// The render engine produces f32 internally; conversion to the device's
// sample format (f32, i16, u16) happens when writing the output buffer,
// without allocation.

use cpal::{FromSample, Sample};

/// Write one mono sample to every channel of an interleaved frame
/// (e.g. [L, R] for stereo).
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(internal_sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mono_to_interleaved_f32() {
        let mut output: [f32; 2] = [0.0; 2];
        write_mono_to_interleaved_frame(0.5, &mut output);
        assert_eq!(output, [0.5, 0.5]);
    }

    #[test]
    fn test_write_mono_to_interleaved_i16() {
        let mut output_i16: [i16; 2] = [0; 2];
        write_mono_to_interleaved_frame(0.5, &mut output_i16);
        assert!(output_i16[0] > 0);
        assert_eq!(output_i16[0], output_i16[1]);
    }

    #[test]
    fn test_write_mono_to_interleaved_u16_silence() {
        // u16 est en binaire décalé : le silence est au milieu de la plage
        let mut output_u16: [u16; 2] = [0; 2];
        write_mono_to_interleaved_frame(0.0, &mut output_u16);
        assert!((output_u16[0] as i32 - 32768).abs() <= 1);
        assert_eq!(output_u16[0], output_u16[1]);
    }
}
