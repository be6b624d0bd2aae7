use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Plastic number, the generator of the R2 low-discrepancy lattice.
const PLASTIC: f64 = 1.324_717_957_244_746;

/// Rank every cell of a `width` x `height` tile by its R2 lattice phase.
///
/// The result is a permutation of `0..width*height` stored row-major
/// (`x + y * width`). Adjacent ranks are spread evenly over the tile, which
/// gives a threshold table with blue-noise-like behaviour.
fn r2_rank_table(width: usize, height: usize) -> Vec<u32> {
    let a1 = 1.0 / PLASTIC;
    let a2 = 1.0 / (PLASTIC * PLASTIC);

    let mut cells: Vec<(f64, usize)> = (0..width * height)
        .map(|i| {
            let x = (i % width) as f64;
            let y = (i / width) as f64;
            let phase = (0.5 + a1 * x + a2 * y).fract();
            (phase, i)
        })
        .collect();
    cells.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut ranks = vec![0u32; width * height];
    for (rank, &(_, cell)) in cells.iter().enumerate() {
        ranks[cell] = rank as u32;
    }
    ranks
}

fn write_table(file: &mut File, name: &str, width: usize, height: usize) {
    let table = r2_rank_table(width, height);

    writeln!(file, "/// {width}x{height} threshold ranks, row-major (`x + y * {width}`)").unwrap();
    writeln!(file, "pub static {name}: [u32; {}] = [", table.len()).unwrap();
    for (i, value) in table.iter().enumerate() {
        if i > 0 && i % 16 == 0 {
            writeln!(file).unwrap();
        }
        write!(file, "{value},").unwrap();
    }
    writeln!(file, "\n];").unwrap();
    writeln!(file).unwrap();
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("threshold_tables.rs");
    let mut file = File::create(&dest_path).unwrap();

    // Square table for symmetric resolutions
    write_table(&mut file, "QUICK_257", 257, 257);

    // Rectangular table for 2:1 resolutions
    write_table(&mut file, "RECT_367_179", 367, 179);

    println!("cargo::rerun-if-changed=build.rs");
}
