use crate::channel::{Channel, ChannelMap, InkSet};

/// Bit planes of one channel for one scanline.
///
/// Plane `j` holds bit `j` of every pixel's dot pattern. Pixels are packed
/// eight per byte, most significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedLine {
    width: usize,
    bytes_per_plane: usize,
    planes: u32,
    data: Vec<u8>,
}

impl PackedLine {
    pub fn new(width: usize, planes: u32) -> Self {
        let bytes_per_plane = width.div_ceil(8);
        Self {
            width,
            bytes_per_plane,
            planes,
            data: vec![0; bytes_per_plane * planes as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn planes(&self) -> u32 {
        self.planes
    }

    #[inline]
    pub fn bytes_per_plane(&self) -> usize {
        self.bytes_per_plane
    }

    pub fn plane(&self, plane: u32) -> &[u8] {
        let start = plane as usize * self.bytes_per_plane;
        &self.data[start..start + self.bytes_per_plane]
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Lay `bits` into pixel `x`: bit `j` of the pattern lands in plane `j`.
    /// Bits beyond the line's plane count are dropped.
    #[inline]
    pub fn set_bits(&mut self, x: usize, bits: u32) {
        let byte = x / 8;
        let mask = 0x80u8 >> (x % 8);
        let mut pattern = bits;
        let mut plane = 0usize;
        while pattern != 0 && plane < self.planes as usize {
            if pattern & 1 != 0 {
                self.data[plane * self.bytes_per_plane + byte] |= mask;
            }
            pattern >>= 1;
            plane += 1;
        }
    }

    /// Set pixel `x` in every plane.
    #[inline]
    pub fn set_all_planes(&mut self, x: usize) {
        let byte = x / 8;
        let mask = 0x80u8 >> (x % 8);
        for plane in 0..self.planes as usize {
            self.data[plane * self.bytes_per_plane + byte] |= mask;
        }
    }

    /// Dot pattern of pixel `x` rebuilt from the planes.
    pub fn pixel(&self, x: usize) -> u32 {
        let byte = x / 8;
        let mask = 0x80u8 >> (x % 8);
        (0..self.planes as usize).fold(0, |acc, plane| {
            if self.data[plane * self.bytes_per_plane + byte] & mask != 0 {
                acc | (1 << plane)
            } else {
                acc
            }
        })
    }

    /// Number of pixels with any bit set.
    pub fn count_dots(&self) -> usize {
        (0..self.width).filter(|&x| self.pixel(x) != 0).count()
    }
}

/// Dither output of one scanline: a [`PackedLine`] per active channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitheredRow {
    width: usize,
    ink_set: InkSet,
    lines: ChannelMap<PackedLine>,
}

impl DitheredRow {
    /// Allocate a row; channels outside `ink_set` get no planes.
    pub fn new(width: usize, ink_set: InkSet, planes: &ChannelMap<u32>) -> Self {
        let lines = ChannelMap::from_fn(|channel| {
            if ink_set.has(channel) {
                PackedLine::new(width, planes[channel])
            } else {
                PackedLine::new(width, 0)
            }
        });
        Self {
            width,
            ink_set,
            lines,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn ink_set(&self) -> InkSet {
        self.ink_set
    }

    /// The line of an active channel.
    pub fn line(&self, channel: Channel) -> Option<&PackedLine> {
        self.ink_set.has(channel).then(|| &self.lines[channel])
    }

    pub(crate) fn line_mut(&mut self, channel: Channel) -> &mut PackedLine {
        &mut self.lines[channel]
    }

    /// Active channels with their lines, in storage order.
    pub fn lines(&self) -> impl Iterator<Item = (Channel, &PackedLine)> {
        let ink_set = self.ink_set;
        self.lines.iter().filter(move |(c, _)| ink_set.has(*c))
    }

    pub fn clear(&mut self) {
        for (_, line) in self.lines.iter_mut() {
            line.clear();
        }
    }

    pub fn is_blank(&self) -> bool {
        self.lines().all(|(_, line)| line.is_blank())
    }

    /// Whether this row was allocated for the given shape.
    pub(crate) fn matches(&self, width: usize, ink_set: InkSet, planes: &ChannelMap<u32>) -> bool {
        self.width == width
            && self.ink_set == ink_set
            && ink_set
                .channels()
                .iter()
                .all(|&c| self.lines[c].planes() == planes[c] && self.lines[c].width() == width)
    }
}
