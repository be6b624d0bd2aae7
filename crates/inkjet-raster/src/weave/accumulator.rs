//! Per-pass row buffers and in-order flushing.

use std::io;

use super::pack::{blank_row, pack_bits, unpack_row, PackError};
use super::passmap::{PassMap, PassRecord};
use super::WeaveError;
use crate::channel::Channel;
use crate::output::PackedLine;

/// Packed rows of one channel of a flushed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassChannel {
    pub channel: Channel,
    /// One buffer per bit plane, holding `jets` packed rows each.
    pub planes: Vec<Vec<u8>>,
}

/// A complete pass handed to the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushedPass {
    pub pass: i64,
    pub subpass: usize,
    pub start_row: i64,
    /// Rows the paper moves since the previous pass; the first pass
    /// measures from row 0.
    pub advance: i64,
    pub jets: usize,
    pub first_jet: usize,
    pub nozzles_used: usize,
    pub phantom_rows: usize,
    /// Unpacked bytes of one nozzle row of one plane.
    pub bytes_per_row: usize,
    pub channels: Vec<PassChannel>,
}

impl FlushedPass {
    pub fn channel(&self, channel: Channel) -> Option<&PassChannel> {
        self.channels.iter().find(|c| c.channel == channel)
    }

    /// Unpack every nozzle row of one plane.
    pub fn plane_rows(&self, channel: Channel, plane: usize) -> Result<Vec<Vec<u8>>, PackError> {
        let Some(data) = self.channel(channel).and_then(|c| c.planes.get(plane)) else {
            return Ok(Vec::new());
        };
        let mut rows = Vec::with_capacity(self.jets);
        let mut rest = data.as_slice();
        for _ in 0..self.jets {
            let (row, used) = unpack_row(rest, self.bytes_per_row)?;
            rows.push(row);
            rest = &rest[used..];
        }
        if !rest.is_empty() {
            return Err(PackError::Overflow {
                expected: self.bytes_per_row * self.jets,
            });
        }
        Ok(rows)
    }

    /// Whether no nozzle fires in this pass.
    pub fn is_blank(&self) -> Result<bool, PackError> {
        for c in &self.channels {
            for plane in 0..c.planes.len() {
                if self
                    .plane_rows(c.channel, plane)?
                    .iter()
                    .any(|row| row.iter().any(|&b| b != 0))
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Outbound boundary: receives passes in emitted order.
pub trait PassEmitter {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()>;
}

impl<E: PassEmitter + ?Sized> PassEmitter for &mut E {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()> {
        (**self).emit_pass(pass)
    }
}

/// Collects every pass, mostly for tests and previews.
impl PassEmitter for Vec<FlushedPass> {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()> {
        self.push(pass.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ChannelBuffer {
    channel: Channel,
    planes: Vec<Vec<u8>>,
    /// Next jet expected; earlier gaps are blank.
    next_jet: usize,
}

/// Rows gathered so far for one open pass.
#[derive(Debug, Clone)]
struct PassBuffer {
    pass: Option<i64>,
    channels: Vec<ChannelBuffer>,
}

impl PassBuffer {
    fn new(layout: &[(Channel, u32)]) -> Self {
        Self {
            pass: None,
            channels: layout
                .iter()
                .map(|&(channel, planes)| ChannelBuffer {
                    channel,
                    planes: vec![Vec::new(); planes as usize],
                    next_jet: 0,
                })
                .collect(),
        }
    }

    fn reset(&mut self) {
        self.pass = None;
        for c in &mut self.channels {
            c.next_jet = 0;
            for plane in &mut c.planes {
                plane.clear();
            }
        }
    }
}

/// Ring of open passes, addressed by `pass mod window`.
#[derive(Debug, Clone)]
pub struct PassAccumulator {
    jets: usize,
    bytes_per_row: usize,
    blank: Vec<u8>,
    slots: Vec<PassBuffer>,
    layout: Vec<(Channel, u32)>,
    next_flush: i64,
    end: i64,
    previous_start: Option<i64>,
}

impl PassAccumulator {
    /// `layout` lists the active channels and their plane counts;
    /// `bytes_per_row` is the packed width of one nozzle row.
    pub fn new(map: &PassMap, layout: Vec<(Channel, u32)>, bytes_per_row: usize) -> Self {
        let slots = (0..map.window()).map(|_| PassBuffer::new(&layout)).collect();
        Self {
            jets: map.geometry().jets(),
            bytes_per_row,
            blank: blank_row(bytes_per_row),
            slots,
            layout,
            next_flush: map.first_premapped_pass(),
            end: map.first_unused_pass(),
            previous_start: None,
        }
    }

    /// Ring size.
    #[inline]
    pub fn window(&self) -> usize {
        self.slots.len()
    }

    /// Next pass to flush; equals the pass map's end once all are out.
    #[inline]
    pub fn next_flush(&self) -> i64 {
        self.next_flush
    }

    /// Passes currently holding rows.
    pub fn open_passes(&self) -> usize {
        self.slots.iter().filter(|s| s.pass.is_some()).count()
    }

    fn slot_index(&self, pass: i64) -> usize {
        pass.rem_euclid(self.slots.len() as i64) as usize
    }

    /// Append one nozzle row of `channel` to the pass described by `record`.
    pub fn add_row(
        &mut self,
        record: &PassRecord,
        jet: usize,
        channel: Channel,
        line: &PackedLine,
    ) -> Result<(), WeaveError> {
        if line.bytes_per_plane() != self.bytes_per_row {
            return Err(WeaveError::WidthMismatch {
                expected: self.bytes_per_row,
                actual: line.bytes_per_plane(),
            });
        }
        let index = self.slot_index(record.pass);
        let slot = &mut self.slots[index];
        match slot.pass {
            Some(held) if held != record.pass => {
                return Err(WeaveError::PassWindowExceeded {
                    pass: record.pass,
                    occupied_by: held,
                });
            }
            Some(_) => {}
            None => {
                tracing::trace!(pass = record.pass, slot = index, "open pass");
                slot.pass = Some(record.pass);
            }
        }

        let Some(buffer) = slot.channels.iter_mut().find(|c| c.channel == channel) else {
            return Ok(());
        };
        for (plane, data) in buffer.planes.iter_mut().enumerate() {
            for _ in buffer.next_jet..jet {
                data.extend_from_slice(&self.blank);
            }
            if plane < line.planes() as usize {
                pack_bits(line.plane(plane as u32), data);
            } else {
                data.extend_from_slice(&self.blank);
            }
        }
        buffer.next_jet = buffer.next_jet.max(jet + 1);
        Ok(())
    }

    /// Flush, in order, every pass that is ready once `through_row` has
    /// been submitted.
    pub fn flush_ready<E: PassEmitter + ?Sized>(
        &mut self,
        map: &PassMap,
        through_row: i64,
        emitter: &mut E,
    ) -> Result<usize, WeaveError> {
        let mut flushed = 0;
        while self.next_flush < self.end {
            match map.ready_row(self.next_flush) {
                Some(ready) if ready <= through_row => {}
                _ => break,
            }
            self.flush_next(map, emitter)?;
            flushed += 1;
        }
        Ok(flushed)
    }

    /// Flush every remaining pass.
    pub fn finish<E: PassEmitter + ?Sized>(
        &mut self,
        map: &PassMap,
        emitter: &mut E,
    ) -> Result<usize, WeaveError> {
        let mut flushed = 0;
        while self.next_flush < self.end {
            self.flush_next(map, emitter)?;
            flushed += 1;
        }
        Ok(flushed)
    }

    fn flush_next<E: PassEmitter + ?Sized>(
        &mut self,
        map: &PassMap,
        emitter: &mut E,
    ) -> Result<(), WeaveError> {
        let pass = self.next_flush;
        let Some(record) = map.record(pass) else {
            self.next_flush += 1;
            return Ok(());
        };
        let index = self.slot_index(pass);
        let held = self.slots[index].pass == Some(pass);

        let jets = self.jets;
        let blank = &self.blank;
        let channels = if held {
            self.slots[index]
                .channels
                .iter_mut()
                .map(|c| {
                    for data in &mut c.planes {
                        for _ in c.next_jet..jets {
                            data.extend_from_slice(blank);
                        }
                    }
                    PassChannel {
                        channel: c.channel,
                        planes: c.planes.clone(),
                    }
                })
                .collect()
        } else {
            let blank_plane = blank.repeat(jets);
            self.layout
                .iter()
                .map(|&(channel, planes)| PassChannel {
                    channel,
                    planes: vec![blank_plane.clone(); planes as usize],
                })
                .collect()
        };

        let flushed = FlushedPass {
            pass,
            subpass: record.subpass,
            start_row: record.physical_start_row,
            advance: record.physical_start_row - self.previous_start.unwrap_or(0),
            jets: self.jets,
            first_jet: record.first_jet,
            nozzles_used: record.nozzles_used,
            phantom_rows: record.phantom_rows,
            bytes_per_row: self.bytes_per_row,
            channels,
        };
        tracing::trace!(
            pass,
            start_row = flushed.start_row,
            advance = flushed.advance,
            nozzles = flushed.nozzles_used,
            "flush pass"
        );
        emitter.emit_pass(&flushed)?;

        if held {
            self.slots[index].reset();
        }
        self.previous_start = Some(record.physical_start_row);
        self.next_flush += 1;
        Ok(())
    }
}
