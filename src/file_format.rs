//! # File formats
//!
//! Codecs turning byte payloads into [`SampleStream`]s and models back into bytes. Astronomy
//! formats (FITS, SD-FITS) and picture formats are provided by external crates implementing
//! [`FileFormat`] and registered into [`crate::openvlbi::OpenVlbi`] by name. The crate itself
//! ships [`RawFormat`] and the bits-per-sample decoder used for raw node ingestion.

use crate::stream::SampleStream;
use crate::vlbi_errors::VlbiError;

/// A named codec between bytes and streams.
pub trait FileFormat: Send + Sync {
    /// Name under which the codec is registered, also matched against file extensions.
    fn name(&self) -> &str;

    /// Build a stream from a payload.
    fn decode_stream(&self, bytes: &[u8]) -> Result<SampleStream, VlbiError>;

    /// Serialize a model.
    fn encode_model(&self, model: &SampleStream) -> Result<Vec<u8>, VlbiError>;
}

/// Decode a little-endian sample buffer.
///
/// Arguments
/// ---------
/// * `bytes`: the raw buffer
/// * `bits_per_sample`: 8, 16, 32 or 64 for unsigned integers, -32 or -64 for IEEE floats
///
/// Return
/// ------
/// * the samples as `f64`, trailing bytes that do not form a full sample are ignored
/// * [`VlbiError::InvalidSampleFormat`] for any other `bits_per_sample`
pub fn decode_samples(bytes: &[u8], bits_per_sample: i32) -> Result<Vec<f64>, VlbiError> {
    fn words<const N: usize>(bytes: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
        bytes.chunks_exact(N).map(|chunk| {
            let mut word = [0u8; N];
            word.copy_from_slice(chunk);
            word
        })
    }

    let samples = match bits_per_sample {
        8 => bytes.iter().map(|&b| f64::from(b)).collect(),
        16 => words::<2>(bytes).map(|w| f64::from(u16::from_le_bytes(w))).collect(),
        32 => words::<4>(bytes).map(|w| f64::from(u32::from_le_bytes(w))).collect(),
        64 => words::<8>(bytes).map(|w| u64::from_le_bytes(w) as f64).collect(),
        -32 => words::<4>(bytes).map(|w| f64::from(f32::from_le_bytes(w))).collect(),
        -64 => words::<8>(bytes).map(f64::from_le_bytes).collect(),
        other => return Err(VlbiError::InvalidSampleFormat(other)),
    };
    Ok(samples)
}

/// Check a bits-per-sample code without decoding anything.
pub fn validate_bits_per_sample(bits_per_sample: i32) -> Result<(), VlbiError> {
    match bits_per_sample {
        8 | 16 | 32 | 64 | -32 | -64 => Ok(()),
        other => Err(VlbiError::InvalidSampleFormat(other)),
    }
}

/// Minimal self-describing format:
///
/// ```text
/// u32 LE            number of dimensions d
/// d × u64 LE        axis sizes, first axis varying fastest
/// Π sizes × f64 LE  samples
/// ```
///
/// Only the samples and the shape are stored; metadata is left at its defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFormat;

impl RawFormat {
    fn error(reason: impl Into<String>) -> VlbiError {
        VlbiError::Decode {
            format: "raw".into(),
            reason: reason.into(),
        }
    }

    fn take<'a>(bytes: &mut &'a [u8], n: usize) -> Result<&'a [u8], VlbiError> {
        if bytes.len() < n {
            return Err(Self::error(format!(
                "truncated payload: needed {n} more bytes, {} left",
                bytes.len()
            )));
        }
        let (head, tail) = bytes.split_at(n);
        *bytes = tail;
        Ok(head)
    }
}

impl FileFormat for RawFormat {
    fn name(&self) -> &str {
        "raw"
    }

    fn decode_stream(&self, bytes: &[u8]) -> Result<SampleStream, VlbiError> {
        let mut cursor = bytes;
        let mut u32_bytes = [0u8; 4];
        u32_bytes.copy_from_slice(Self::take(&mut cursor, 4)?);
        let dims = u32::from_le_bytes(u32_bytes) as usize;
        if dims == 0 || dims > 8 {
            return Err(Self::error(format!("unsupported dimension count {dims}")));
        }

        let mut shape = Vec::with_capacity(dims);
        for _ in 0..dims {
            let mut u64_bytes = [0u8; 8];
            u64_bytes.copy_from_slice(Self::take(&mut cursor, 8)?);
            let size = usize::try_from(u64::from_le_bytes(u64_bytes))
                .map_err(|_| Self::error("axis size does not fit in memory"))?;
            shape.push(size);
        }

        let len = shape
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(s))
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| Self::error("payload size overflows"))?;
        let body = Self::take(&mut cursor, len)?;
        if !cursor.is_empty() {
            return Err(Self::error(format!("{} trailing bytes", cursor.len())));
        }

        SampleStream::with_shape(decode_samples(body, -64)?, &shape)
    }

    fn encode_model(&self, model: &SampleStream) -> Result<Vec<u8>, VlbiError> {
        let mut out = Vec::with_capacity(4 + 8 * model.shape().len() + 8 * model.len());
        out.extend_from_slice(&(model.shape().len() as u32).to_le_bytes());
        for &size in model.shape() {
            out.extend_from_slice(&(size as u64).to_le_bytes());
        }
        for &sample in model.data() {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(out)
    }
}
