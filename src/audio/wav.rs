//! Fixed-header RIFF/WAVE container codec
//!
//! The writer streams 16-bit PCM into a 44-byte canonical header whose two
//! size fields are unknown until the session ends: they are written as
//! placeholders and back-patched by [`WavWriter::finalize`].
//!
//! The reader is deliberately narrow. It reads fields at the canonical
//! offsets of the same header shape the writer produces and never walks
//! chunks, so files with extra chunks before `data` decode as noise.
//!
//! ```text
//!  0  "RIFF"        4  riff size (len - 8)   8  "WAVE"
//! 12  "fmt "       16  16 (fmt size)        20  1 (PCM)
//! 22  channels     24  sample rate          28  byte rate
//! 32  block align  34  bits per sample      36  "data"
//! 40  data size (len - 44)                  44  payload
//! ```

use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

use super::dsp::from_pcm16;

/// Size of the canonical header in bytes.
pub const HEADER_LEN: u64 = 44;

const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;
const CHANNELS_OFFSET: usize = 22;
const SAMPLE_RATE_OFFSET: usize = 24;
const DATA_LEN_OFFSET: usize = 40;

const PCM_FORMAT_TAG: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;

/// Channel layout and rate declared in a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmFormat {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * BYTES_PER_SAMPLE
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

fn encode_header(format: PcmFormat, riff_size: u32, data_size: u32) -> [u8; HEADER_LEN as usize] {
    let mut header = [0u8; HEADER_LEN as usize];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// RIFF sizes are 32-bit; longer files saturate instead of wrapping.
fn size_field(len: u64) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Incremental 16-bit PCM writer with back-patched size fields.
pub struct WavWriter<W: Write + Seek> {
    inner: W,
    format: PcmFormat,
    data_len: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Write a header with placeholder sizes and return a writer positioned
    /// at the start of the payload.
    pub fn new(mut inner: W, format: PcmFormat) -> io::Result<Self> {
        inner.write_all(&encode_header(format, 0, 0))?;
        Ok(Self {
            inner,
            format,
            data_len: 0,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Payload bytes appended so far.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Complete frames appended so far.
    pub fn frames_written(&self) -> u64 {
        self.data_len / self.format.block_align().max(1) as u64
    }

    /// Append interleaved samples as little-endian i16.
    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        for sample in samples {
            self.inner.write_all(&sample.to_le_bytes())?;
        }
        self.data_len += samples.len() as u64 * BYTES_PER_SAMPLE as u64;
        Ok(())
    }

    /// Patch the RIFF and data size fields and hand back the inner stream.
    ///
    /// The total length is taken from the stream itself, so bytes written by
    /// anyone else through [`WavWriter::get_mut`] are accounted for.
    pub fn finalize(mut self) -> io::Result<W> {
        self.inner.flush()?;
        let file_len = self.inner.seek(SeekFrom::End(0))?;
        let riff_size = size_field(file_len.saturating_sub(8));
        let data_size = size_field(file_len.saturating_sub(HEADER_LEN));

        self.inner.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.inner.write_all(&riff_size.to_le_bytes())?;
        self.inner.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.inner.write_all(&data_size.to_le_bytes())?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

/// Mono samples decoded from the first channel of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedSource {
    pub samples: Vec<f32>,
    /// Declared sample rate; 0 when the header could not be read.
    pub sample_rate: u32,
    /// Declared channel count; 0 when the header could not be read.
    pub channels: u16,
}

impl DecodedSource {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn read_u16_le(header: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([header[offset], header[offset + 1]])
}

fn read_u32_le(header: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        header[offset],
        header[offset + 1],
        header[offset + 2],
        header[offset + 3],
    ])
}

/// Decode the first channel of a canonical 16-bit PCM container.
///
/// A header shorter than 44 bytes or a zero channel count yields no samples.
/// A payload shorter than declared yields the complete frames present. Only
/// I/O errors other than end-of-file are returned.
pub fn read_first_channel<R: Read>(reader: R) -> io::Result<DecodedSource> {
    let mut reader = BufReader::new(reader);
    let mut header = [0u8; HEADER_LEN as usize];
    if let Err(err) = reader.read_exact(&mut header) {
        return match err.kind() {
            io::ErrorKind::UnexpectedEof => Ok(DecodedSource::default()),
            _ => Err(err),
        };
    }

    let channels = read_u16_le(&header, CHANNELS_OFFSET);
    let sample_rate = read_u32_le(&header, SAMPLE_RATE_OFFSET);
    let data_len = read_u32_le(&header, DATA_LEN_OFFSET) as usize;

    if channels == 0 {
        return Ok(DecodedSource {
            samples: Vec::new(),
            sample_rate,
            channels,
        });
    }

    let frame_bytes = channels as usize * BYTES_PER_SAMPLE as usize;
    let declared_frames = data_len / frame_bytes;
    let mut frame = vec![0u8; frame_bytes];
    // Declared length is untrusted; cap the reservation
    let mut samples = Vec::with_capacity(declared_frames.min(1 << 22));

    for _ in 0..declared_frames {
        match reader.read_exact(&mut frame) {
            Ok(()) => samples.push(from_pcm16(i16::from_le_bytes([frame[0], frame[1]]))),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        }
    }

    Ok(DecodedSource {
        samples,
        sample_rate,
        channels,
    })
}
