//! WAV encoding and decoding for PCM audio.
//!
//! Only uncompressed PCM is decoded. Unknown chunks such as `LIST` or
//! `fact` are skipped. Every `fmt ` chunk opens a new [`PcmChunk`] and the
//! `data` chunks after it are appended to that chunk.

use binrw::{binrw, BinReaderExt, BinWrite, BinWriterExt};
use rm_engine::Frame;
use rm_ir::{PcmChunk, FRAME_BYTES};
use std::io::{self, Cursor, Write};

use crate::{DecodeError, Decoder};

const PCM_FORMAT: u16 = 0x0001;

#[binrw]
#[brw(little)]
#[derive(Debug)]
struct RiffHeader {
    id: [u8; 4],
    /// 4 plus the length of the chunks that follow
    size: u32,
    form: [u8; 4],
}

#[binrw]
#[brw(little)]
#[derive(Debug)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

/// The part of a `fmt ` chunk shared by the 16, 18 and 40 byte layouts.
#[binrw]
#[brw(little)]
#[derive(Debug)]
struct FormatChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// Header of a canonical 16-bit stereo file.
#[derive(BinWrite, Debug)]
#[bw(little)]
struct CanonicalHeader {
    riff: RiffHeader,
    fmt_header: ChunkHeader,
    fmt: FormatChunk,
    data_header: ChunkHeader,
}

// --- Writing ---

pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> io::Result<()> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = (frames.len() * FRAME_BYTES) as u32;

    let header = CanonicalHeader {
        riff: RiffHeader {
            id: *b"RIFF",
            size: 36 + data_size,
            form: *b"WAVE",
        },
        fmt_header: ChunkHeader {
            id: *b"fmt ",
            size: 16,
        },
        fmt: FormatChunk {
            format_tag: PCM_FORMAT,
            channels: num_channels,
            sample_rate,
            byte_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
        },
        data_header: ChunkHeader {
            id: *b"data",
            size: data_size,
        },
    };

    let mut head = Cursor::new(Vec::with_capacity(44));
    head.write_le(&header).map_err(into_io)?;
    w.write_all(head.get_ref())?;
    for frame in frames {
        w.write_all(&frame.to_le_bytes())?;
    }
    Ok(())
}

pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44 + frames.len() * FRAME_BYTES);
    write_wav(&mut buf, frames, sample_rate).expect("Vec<u8> write cannot fail");
    buf
}

fn into_io(err: binrw::Error) -> io::Error {
    match err {
        binrw::Error::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

// --- Reading ---

/// RIFF/WAVE decoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<PcmChunk>, DecodeError> {
        decode_wav(data)
    }
}

/// Decode a WAV file into its PCM chunks.
///
/// A file whose RIFF body is empty is valid and has no chunks.
pub fn decode_wav(data: &[u8]) -> Result<Vec<PcmChunk>, DecodeError> {
    let mut reader = Cursor::new(data);
    let riff: RiffHeader = reader
        .read_le()
        .map_err(|_| DecodeError::UnexpectedEof("RIFF header"))?;
    if riff.id != *b"RIFF" {
        return Err(DecodeError::InvalidHeader(format!(
            "expected 'RIFF' as the ID but got '{}'",
            id_str(&riff.id)
        )));
    }
    if riff.form != *b"WAVE" {
        return Err(DecodeError::InvalidHeader(format!(
            "expected 'WAVE' ID in header but got '{}'",
            id_str(&riff.form)
        )));
    }

    let body_len = riff.size.checked_sub(4).ok_or_else(|| {
        DecodeError::InvalidHeader(format!("RIFF size {} is too small", riff.size))
    })? as usize;
    let start = reader.position() as usize;
    let body = data
        .get(start..start + body_len)
        .ok_or(DecodeError::UnexpectedEof("RIFF body"))?;

    let chunks = parse_chunks(body)?;
    for chunk in &chunks {
        log::debug!("decoded WAV chunk: {}", chunk);
    }
    Ok(chunks)
}

fn parse_chunks(body: &[u8]) -> Result<Vec<PcmChunk>, DecodeError> {
    let mut chunks: Vec<PcmChunk> = Vec::new();
    let mut reader = Cursor::new(body);

    while (reader.position() as usize) < body.len() {
        let header: ChunkHeader = reader
            .read_le()
            .map_err(|_| DecodeError::UnexpectedEof("chunk header"))?;
        let start = reader.position() as usize;
        let size = header.size as usize;

        let next = match &header.id {
            b"fmt " => {
                if !matches!(header.size, 16 | 18 | 40) {
                    return Err(DecodeError::InvalidFormatChunk(header.size));
                }
                if start + size > body.len() {
                    return Err(DecodeError::UnexpectedEof("format chunk"));
                }
                let fmt: FormatChunk = reader
                    .read_le()
                    .map_err(|_| DecodeError::UnexpectedEof("format chunk"))?;
                if fmt.format_tag != PCM_FORMAT {
                    return Err(DecodeError::UnsupportedCodec(codec_name(fmt.format_tag)));
                }
                if fmt.channels == 0 || fmt.bits_per_sample == 0 {
                    return Err(DecodeError::UnsupportedFormat(format!(
                        "{} channels, {} bits/sample",
                        fmt.channels, fmt.bits_per_sample
                    )));
                }
                chunks.push(PcmChunk::new(
                    fmt.channels,
                    fmt.sample_rate,
                    fmt.bits_per_sample,
                    Vec::new(),
                ));
                start + size
            }
            b"data" => {
                let samples = body
                    .get(start..start + size)
                    .ok_or(DecodeError::UnexpectedEof("data chunk"))?;
                let current = chunks.last_mut().ok_or(DecodeError::DataBeforeFormat)?;
                current.data.extend_from_slice(samples);
                let mut next = start + size;
                if size % 2 == 1 {
                    if next >= body.len() {
                        return Err(DecodeError::UnexpectedEof("data chunk padding"));
                    }
                    next += 1;
                }
                next
            }
            other => {
                log::debug!("skipping '{}' chunk ({} bytes)", id_str(other), size);
                let mut next = (start + size).min(body.len());
                if size % 2 == 1 && next < body.len() {
                    next += 1;
                }
                next
            }
        };
        reader.set_position(next as u64);
    }

    if !body.is_empty() && chunks.is_empty() {
        return Err(DecodeError::MissingFormat);
    }
    Ok(chunks)
}

fn codec_name(format_tag: u16) -> &'static str {
    match format_tag {
        0x0003 => "IEEE float",
        0x0006 => "8-bit ITU-T G.711 A-law",
        0x0007 => "8-bit ITU-T G.711 µ-law",
        0xFFFE => "Extensible",
        _ => "Unknown",
    }
}

fn id_str(id: &[u8; 4]) -> String {
    String::from_utf8_lossy(id).into_owned()
}
