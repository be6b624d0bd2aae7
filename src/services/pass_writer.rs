//! Pass sinks: a binary dump file and a per-pass log.
//!
//! # Dump format
//!
//! All integers are little-endian.
//!
//! ```text
//! magic        8 bytes  "IWPASS01"
//! separation   u32
//! jets         u32
//! oversample   u32
//! width        u32      dots per row
//! bytes/row    u32      unpacked bytes of one nozzle row
//! first_row    u64
//! last_row     u64
//! page_length  u64
//! channels     u8, then per channel: code (u8), planes (u8)
//!
//! per pass:
//!   pass i64, subpass u32, start_row i64, advance i64,
//!   first_jet u32, nozzles_used u32, phantom_rows u32,
//!   per channel, per plane: length u32 + PackBits data
//! ```

use std::fmt::Write as _;
use std::io::{self, Read, Write};

use inkjet_raster::weave::{FlushedPass, PassChannel};
use inkjet_raster::{Channel, PageRange, PassEmitter, PassMap, RasterPipeline};
use serde::Serialize;

use crate::error::JobError;

pub const DUMP_MAGIC: &[u8; 8] = b"IWPASS01";

/// Fixed part of a dump: head, page and channel layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHeader {
    pub separation: u32,
    pub jets: u32,
    pub oversample: u32,
    pub width: u32,
    pub bytes_per_row: u32,
    pub page: PageRange,
    pub channels: Vec<(Channel, u8)>,
}

impl DumpHeader {
    pub fn for_pipeline(pipeline: &RasterPipeline) -> Self {
        let map = pipeline.pass_map();
        let geometry = map.geometry();
        let engine = pipeline.engine();
        let planes = engine.planes();
        let width = engine.width();
        Self {
            separation: geometry.separation() as u32,
            jets: geometry.jets() as u32,
            oversample: geometry.oversample() as u32,
            width: width as u32,
            bytes_per_row: width.div_ceil(geometry.oversample()).div_ceil(8) as u32,
            page: map.page(),
            channels: engine
                .ink_set()
                .channels()
                .iter()
                .map(|&c| (c, planes[c] as u8))
                .collect(),
        }
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(DUMP_MAGIC)?;
        for v in [
            self.separation,
            self.jets,
            self.oversample,
            self.width,
            self.bytes_per_row,
        ] {
            w.write_all(&v.to_le_bytes())?;
        }
        for v in [self.page.first_row, self.page.last_row, self.page.page_length] {
            w.write_all(&(v as u64).to_le_bytes())?;
        }
        w.write_all(&[self.channels.len() as u8])?;
        for &(channel, planes) in &self.channels {
            w.write_all(&[channel.code() as u8, planes])?;
        }
        Ok(())
    }
}

/// Streams passes into a dump.
#[derive(Debug)]
pub struct PassDumpWriter<W: Write> {
    writer: W,
    header: DumpHeader,
    passes: usize,
    bytes: u64,
}

impl<W: Write> PassDumpWriter<W> {
    /// Write the header and get ready for passes.
    pub fn new(mut writer: W, header: DumpHeader) -> io::Result<Self> {
        header.write_to(&mut writer)?;
        Ok(Self {
            writer,
            header,
            passes: 0,
            bytes: 0,
        })
    }

    #[inline]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Packed bytes written, headers excluded.
    #[inline]
    pub fn data_bytes(&self) -> u64 {
        self.bytes
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> PassEmitter for PassDumpWriter<W> {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()> {
        let w = &mut self.writer;
        w.write_all(&pass.pass.to_le_bytes())?;
        w.write_all(&(pass.subpass as u32).to_le_bytes())?;
        w.write_all(&pass.start_row.to_le_bytes())?;
        w.write_all(&pass.advance.to_le_bytes())?;
        for v in [pass.first_jet, pass.nozzles_used, pass.phantom_rows] {
            w.write_all(&(v as u32).to_le_bytes())?;
        }
        for &(channel, planes) in &self.header.channels {
            let data = pass.channel(channel).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("pass {} has no {} channel", pass.pass, channel),
                )
            })?;
            for plane in 0..planes as usize {
                let bytes = data.planes.get(plane).map(Vec::as_slice).unwrap_or_default();
                w.write_all(&(bytes.len() as u32).to_le_bytes())?;
                w.write_all(bytes)?;
                self.bytes += bytes.len() as u64;
            }
        }
        self.passes += 1;
        Ok(())
    }
}

/// A dump read back into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDump {
    pub header: DumpHeader,
    pub passes: Vec<FlushedPass>,
}

fn read_array<R: Read, const N: usize>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    read_array(r).map(u32::from_le_bytes)
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    read_array(r).map(u64::from_le_bytes)
}

fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    read_array(r).map(i64::from_le_bytes)
}

/// `Ok(None)` at a clean end of file.
fn read_pass_start<R: Read>(r: &mut R) -> io::Result<Option<i64>> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..])? {
            0 if filled == 0 => return Ok(None),
            0 => return Err(io::ErrorKind::UnexpectedEof.into()),
            n => filled += n,
        }
    }
    Ok(Some(i64::from_le_bytes(buf)))
}

fn read_header<R: Read>(r: &mut R) -> Result<DumpHeader, JobError> {
    let magic: [u8; 8] = read_array(r)?;
    if &magic != DUMP_MAGIC {
        return Err(JobError::Dump("bad magic".to_string()));
    }
    let separation = read_u32(r)?;
    let jets = read_u32(r)?;
    let oversample = read_u32(r)?;
    let width = read_u32(r)?;
    let bytes_per_row = read_u32(r)?;
    let first_row = read_u64(r)? as usize;
    let last_row = read_u64(r)? as usize;
    let page_length = read_u64(r)? as usize;
    let page = PageRange::new(first_row, last_row, page_length)?;

    let [count]: [u8; 1] = read_array(r)?;
    let mut channels = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let [code, planes]: [u8; 2] = read_array(r)?;
        let channel = Channel::ALL
            .into_iter()
            .find(|c| c.code() as u8 == code)
            .ok_or_else(|| JobError::Dump(format!("unknown channel code {code:#04x}")))?;
        channels.push((channel, planes));
    }
    Ok(DumpHeader {
        separation,
        jets,
        oversample,
        width,
        bytes_per_row,
        page,
        channels,
    })
}

/// Parse a whole dump.
pub fn read_pass_dump<R: Read>(mut reader: R) -> Result<PassDump, JobError> {
    let r = &mut reader;
    let header = read_header(r)?;
    let mut passes = Vec::new();
    while let Some(pass) = read_pass_start(r)? {
        let subpass = read_u32(r)? as usize;
        let start_row = read_i64(r)?;
        let advance = read_i64(r)?;
        let first_jet = read_u32(r)? as usize;
        let nozzles_used = read_u32(r)? as usize;
        let phantom_rows = read_u32(r)? as usize;

        let mut channels = Vec::with_capacity(header.channels.len());
        for &(channel, planes) in &header.channels {
            let mut data = Vec::with_capacity(planes as usize);
            for _ in 0..planes {
                let len = read_u32(r)? as usize;
                let mut bytes = vec![0u8; len];
                r.read_exact(&mut bytes)?;
                data.push(bytes);
            }
            channels.push(PassChannel {
                channel,
                planes: data,
            });
        }
        passes.push(FlushedPass {
            pass,
            subpass,
            start_row,
            advance,
            jets: header.jets as usize,
            first_jet,
            nozzles_used,
            phantom_rows,
            bytes_per_row: header.bytes_per_row as usize,
            channels,
        });
    }
    Ok(PassDump { header, passes })
}

/// One line of the pass table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub pass: i64,
    pub subpass: usize,
    pub start_row: i64,
    pub advance: i64,
    pub first_jet: usize,
    pub nozzles_used: usize,
    pub phantom_rows: usize,
    /// Dots fired; `None` when built from the schedule alone.
    pub dots: Option<usize>,
}

/// Collects [`PassSummary`] lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassLog {
    pub passes: Vec<PassSummary>,
}

impl PassLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schedule of a pass map, without printing anything.
    pub fn from_map(map: &PassMap) -> Self {
        let mut previous = 0;
        let passes = map
            .records()
            .iter()
            .map(|record| {
                let summary = PassSummary {
                    pass: record.pass,
                    subpass: record.subpass,
                    start_row: record.physical_start_row,
                    advance: record.physical_start_row - previous,
                    first_jet: record.first_jet,
                    nozzles_used: record.nozzles_used,
                    phantom_rows: record.phantom_rows,
                    dots: None,
                };
                previous = record.physical_start_row;
                summary
            })
            .collect();
        Self { passes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Fixed-width text table.
    pub fn table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>6} {:>4} {:>7} {:>7} {:>5} {:>7} {:>7} {:>8}",
            "pass", "sub", "start", "advance", "jet0", "nozzles", "phantom", "dots"
        );
        for p in &self.passes {
            let dots = p.dots.map_or_else(|| "-".to_string(), |d| d.to_string());
            let _ = writeln!(
                out,
                "{:>6} {:>4} {:>7} {:>7} {:>5} {:>7} {:>7} {:>8}",
                p.pass, p.subpass, p.start_row, p.advance, p.first_jet, p.nozzles_used, p.phantom_rows, dots
            );
        }
        out
    }
}

impl PassEmitter for PassLog {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()> {
        let mut dots = 0;
        for channel in &pass.channels {
            for plane in 0..channel.planes.len() {
                let rows = pass
                    .plane_rows(channel.channel, plane)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                dots += rows
                    .iter()
                    .flatten()
                    .map(|b| b.count_ones() as usize)
                    .sum::<usize>();
            }
        }
        self.passes.push(PassSummary {
            pass: pass.pass,
            subpass: pass.subpass,
            start_row: pass.start_row,
            advance: pass.advance,
            first_jet: pass.first_jet,
            nozzles_used: pass.nozzles_used,
            phantom_rows: pass.phantom_rows,
            dots: Some(dots),
        });
        Ok(())
    }
}

/// Sends every pass to two emitters.
#[derive(Debug)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: PassEmitter, B: PassEmitter> PassEmitter for Tee<A, B> {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()> {
        self.0.emit_pass(pass)?;
        self.1.emit_pass(pass)
    }
}
