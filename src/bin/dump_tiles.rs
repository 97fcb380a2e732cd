use std::env;
use std::path::Path;
use std::process;

use retrovid::video::{read_pixel, BitDepth, VideoSubsystem, BITMAP_TILES, TILE_PIXELS, TILE_SIZE};

/// Tiles to dump, never more than the page holds
fn tile_count(arg: Option<&str>) -> usize {
    arg.and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(4)
        .min(BITMAP_TILES)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: dump_tiles <image> [bpp] [tiles]");
        eprintln!("Example: dump_tiles sprites.gif 4 8");
        process::exit(1);
    }

    let depth = match args.get(2).map(|s| s.parse::<u32>()) {
        None => BitDepth::default(),
        Some(Ok(bits)) => BitDepth::try_from(bits).unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(1);
        }),
        Some(Err(_)) => {
            eprintln!("Invalid bit depth: {}", args[2]);
            process::exit(1);
        }
    };
    let tiles = tile_count(args.get(3).map(String::as_str));

    let mut video = VideoSubsystem::new();
    let report = match video.load_file(Path::new(&args[1]), depth) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let memory = video.memory();
    let words_per_tile = TILE_PIXELS / depth.pixels_per_word();

    println!(
        "{}: {}x{}, {} pixels packed at {}, {} colors",
        args[1], report.width, report.height, report.pixels, depth, report.colors
    );
    println!("================================================================================");

    for tile in 0..tiles {
        let first_word = tile * words_per_tile;
        let words = &memory.bitmap[first_word..first_word + words_per_tile];
        println!("Tile {:3} (words {}..{})", tile, first_word, first_word + words_per_tile);

        for (i, chunk) in words.chunks(8).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|w| format!("{:08x}", w)).collect();
            println!("  {:4}: {}", first_word + i * 8, hex.join(" "));
        }

        for y in 0..TILE_SIZE {
            print!("  |");
            for x in 0..TILE_SIZE {
                let value = read_pixel(&memory.bitmap[..], tile * TILE_PIXELS + y * TILE_SIZE + x, depth);
                if value == 0 {
                    print!(" .");
                } else {
                    print!("{:2x}", value & 0xFF);
                }
            }
            println!(" |");
        }
    }
    println!("================================================================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrovid::video::BITMAP_WORDS;

    #[test]
    fn tile_count_is_clamped_to_the_page() {
        assert_eq!(tile_count(None), 4);
        assert_eq!(tile_count(Some("12")), 12);
        assert_eq!(tile_count(Some("many")), 4);
        assert_eq!(tile_count(Some("100000")), BITMAP_TILES);
    }

    #[test]
    fn largest_dump_stays_inside_the_bitmap() {
        let tiles = tile_count(Some("100000"));
        for depth in BitDepth::ALL {
            let words_per_tile = TILE_PIXELS / depth.pixels_per_word();
            assert!(tiles * words_per_tile <= BITMAP_WORDS, "{depth}");
        }
    }
}
