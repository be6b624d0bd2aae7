//! Rebuild the printed page from its passes and render it as a PNG.

use std::io::{self, Cursor};
use std::path::Path;

use inkjet_raster::weave::FlushedPass;
use inkjet_raster::{Channel, ChannelMap, InkSet, PageRange, PassEmitter, RasterPipeline, WeaveGeometry};

use crate::error::JobError;

/// Red, green and blue absorbed by a full dot of each ink.
fn absorption(channel: Channel) -> [f32; 3] {
    match channel {
        Channel::K => [1.0, 1.0, 1.0],
        Channel::C => [1.0, 0.0, 0.0],
        Channel::M => [0.0, 1.0, 0.0],
        Channel::Y => [0.0, 0.0, 1.0],
        Channel::LightC => [0.35, 0.0, 0.0],
        Channel::LightM => [0.0, 0.35, 0.0],
    }
}

#[derive(Debug, Clone)]
struct InkLayer {
    channel: Channel,
    planes: u32,
    /// Dot pattern per pixel, row-major over the printed rows.
    dots: Vec<u8>,
}

/// A [`PassEmitter`] that places every nozzle row back onto the page.
///
/// Nozzle `j` of a pass lands on row `start_row + j * separation`;
/// oversampled passes carry every `oversample`-th column, starting at their
/// subpass.
#[derive(Debug, Clone)]
pub struct PreviewCanvas {
    width: usize,
    page: PageRange,
    separation: usize,
    oversample: usize,
    layers: Vec<InkLayer>,
    row_hits: Vec<u32>,
    passes: usize,
}

impl PreviewCanvas {
    pub fn new(
        width: usize,
        page: PageRange,
        geometry: &WeaveGeometry,
        ink_set: InkSet,
        planes: &ChannelMap<u32>,
    ) -> Self {
        let height = page.last_row - page.first_row + 1;
        let layers = ink_set
            .channels()
            .iter()
            .map(|&channel| InkLayer {
                channel,
                planes: planes[channel],
                dots: vec![0; width * height],
            })
            .collect();
        Self {
            width,
            page,
            separation: geometry.separation(),
            oversample: geometry.oversample(),
            layers,
            row_hits: vec![0; height],
            passes: 0,
        }
    }

    /// A canvas shaped for what `pipeline` emits.
    pub fn for_pipeline(pipeline: &RasterPipeline) -> Self {
        let map = pipeline.pass_map();
        let engine = pipeline.engine();
        Self::new(
            engine.width(),
            map.page(),
            map.geometry(),
            engine.ink_set(),
            &engine.planes(),
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.row_hits.len()
    }

    #[inline]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Dot pattern of `channel` at column `x` of page row `row`.
    pub fn dot(&self, channel: Channel, x: usize, row: usize) -> u8 {
        let Some(layer) = self.layers.iter().find(|l| l.channel == channel) else {
            return 0;
        };
        if !self.page.contains(row) || x >= self.width {
            return 0;
        }
        layer.dots[(row - self.page.first_row) * self.width + x]
    }

    /// How often a printing nozzle passed over each printed row.
    #[inline]
    pub fn row_hits(&self) -> &[u32] {
        &self.row_hits
    }

    /// Every row was visited once per column phase.
    pub fn is_fully_covered(&self) -> bool {
        self.row_hits.iter().all(|&hits| hits == self.oversample as u32)
    }

    /// Subtractive composite of all inks, 8-bit RGB.
    pub fn to_rgb(&self) -> Vec<u8> {
        let pixels = self.width * self.height();
        let mut rgb = Vec::with_capacity(pixels * 3);
        for i in 0..pixels {
            let mut light = [1.0f32; 3];
            for layer in &self.layers {
                let dot = layer.dots[i];
                if dot == 0 {
                    continue;
                }
                let full = ((1u32 << layer.planes) - 1).max(1) as f32;
                let coverage = (dot as f32 / full).min(1.0);
                for (l, a) in light.iter_mut().zip(absorption(layer.channel)) {
                    *l *= 1.0 - coverage * a;
                }
            }
            rgb.extend(light.iter().map(|l| (l * 255.0).round() as u8));
        }
        rgb
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, JobError> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = png::Encoder::new(&mut buf, self.width as u32, self.height() as u32);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Fast);
            let mut writer = encoder
                .write_header()
                .map_err(|e| JobError::PngEncode(e.to_string()))?;
            writer
                .write_image_data(&self.to_rgb())
                .map_err(|e| JobError::PngEncode(e.to_string()))?;
        }
        Ok(buf.into_inner())
    }

    pub fn write_png(&self, path: &Path) -> Result<(), JobError> {
        let bytes = self.encode_png()?;
        std::fs::write(path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote preview");
        Ok(())
    }

    fn page_index(&self, pass: &FlushedPass, jet: usize) -> Option<usize> {
        let row = pass.start_row + (jet * self.separation) as i64;
        let row = usize::try_from(row).ok()?;
        self.page
            .contains(row)
            .then(|| row - self.page.first_row)
    }
}

impl PassEmitter for PreviewCanvas {
    fn emit_pass(&mut self, pass: &FlushedPass) -> io::Result<()> {
        let real_jets = pass.first_jet..pass.first_jet + pass.nozzles_used;
        for jet in real_jets.clone() {
            if let Some(y) = self.page_index(pass, jet) {
                self.row_hits[y] += 1;
            }
        }

        for layer_index in 0..self.layers.len() {
            let (channel, planes) = {
                let layer = &self.layers[layer_index];
                (layer.channel, layer.planes)
            };
            for plane in 0..planes as usize {
                let rows = pass
                    .plane_rows(channel, plane)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                for jet in real_jets.clone() {
                    let (Some(y), Some(bytes)) = (self.page_index(pass, jet), rows.get(jet)) else {
                        continue;
                    };
                    let base = y * self.width;
                    let dots = &mut self.layers[layer_index].dots;
                    for (i, x) in (pass.subpass..self.width).step_by(self.oversample).enumerate() {
                        if bytes[i / 8] & (0x80 >> (i % 8)) != 0 {
                            dots[base + x] |= 1 << plane;
                        }
                    }
                }
            }
        }
        self.passes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkjet_raster::{DitherAlgorithm, RowInput, WeaveStrategy};

    fn gray_pipeline(width: usize, rows: usize, geometry: Option<WeaveGeometry>) -> RasterPipeline {
        let page = PageRange::rows(rows).unwrap();
        let builder = RasterPipeline::builder(width)
            .ink_set(InkSet::Monochrome)
            .algorithm(DitherAlgorithm::Ordered);
        let builder = match geometry {
            Some(g) => builder.weave(g, page),
            None => builder.page(page),
        };
        builder.build().unwrap()
    }

    #[test]
    fn test_canvas_rebuilds_woven_page() {
        let geometry = WeaveGeometry::new(3, 12, 2, WeaveStrategy::ZigZag).unwrap();
        let mut pipeline = gray_pipeline(20, 40, Some(geometry));
        let mut canvas = PreviewCanvas::for_pipeline(&pipeline);

        let mut expected = Vec::new();
        for y in 0..40 {
            // Only full black prints under ordered dither with any matrix.
            let row: Vec<u16> = (0..20).map(|x| if (x + y) % 5 == 0 { 65535 } else { 0 }).collect();
            pipeline.write_row(y, RowInput::Gray(&row), &mut canvas).unwrap();
            expected.push(row);
        }
        pipeline.finish(&mut canvas).unwrap();

        assert!(canvas.is_fully_covered(), "hits: {:?}", canvas.row_hits());
        for (y, row) in expected.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                assert_eq!(canvas.dot(Channel::K, x, y) != 0, v == 65535, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_png_has_page_dimensions() {
        let mut pipeline = gray_pipeline(10, 6, None);
        let mut canvas = PreviewCanvas::for_pipeline(&pipeline);
        let black = vec![65535u16; 10];
        for y in 0..6 {
            pipeline.write_row(y, RowInput::Gray(&black), &mut canvas).unwrap();
        }
        pipeline.finish(&mut canvas).unwrap();

        let rgb = canvas.to_rgb();
        assert_eq!(rgb.len(), 10 * 6 * 3);
        assert!(rgb.iter().all(|&b| b == 0), "full black composites to black");

        let png = canvas.encode_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoder = png::Decoder::new(Cursor::new(png));
        let reader = decoder.read_info().unwrap();
        assert_eq!((reader.info().width, reader.info().height), (10, 6));
    }

    #[test]
    fn test_unknown_channel_reads_blank() {
        let canvas = PreviewCanvas::new(
            4,
            PageRange::rows(2).unwrap(),
            &WeaveGeometry::single_row(),
            InkSet::Monochrome,
            &ChannelMap::from_fn(|_| 1),
        );
        assert_eq!(canvas.dot(Channel::C, 0, 0), 0);
        assert_eq!(canvas.dot(Channel::K, 9, 0), 0);
        assert_eq!(canvas.to_rgb(), vec![255; 4 * 2 * 3]);
    }
}
