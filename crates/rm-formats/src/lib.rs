//! Audio file formats for ringmix.
//!
//! Decodes RIFF/WAVE files into raw PCM chunks and writes captured 16-bit
//! stereo output back to WAV.

mod wav_format;

pub use rm_ir::PcmChunk;
pub use wav_format::{decode_wav, frames_to_wav, write_wav, WavDecoder};

/// Error type for format parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Wrong magic bytes in the file header
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The input ended inside a header or chunk
    #[error("unexpected end of file while reading {0}")]
    UnexpectedEof(&'static str),
    /// Compressed or non-PCM encoding
    #[error("unsupported codec: {0} (only PCM is supported)")]
    UnsupportedCodec(&'static str),
    /// PCM with a layout that cannot describe any frame
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The file has chunks but none of them describes the format
    #[error("file does not contain format information")]
    MissingFormat,
    /// A data chunk appeared before any format chunk
    #[error("found data chunk before format chunk")]
    DataBeforeFormat,
    /// The format chunk has a size other than 16, 18 or 40 bytes
    #[error("illegal format chunk size: {0}")]
    InvalidFormatChunk(u32),
}

/// Turns an encoded file into decoded PCM chunks.
pub trait Decoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<PcmChunk>, DecodeError>;
}
