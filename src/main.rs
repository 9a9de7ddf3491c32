use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use railmapper::render::{compose, save_png};
use railmapper::svg::{cities_svg, grid_svg, isolines_svg, merge_svgs, write_svg, ISOLINE_STROKE};
use railmapper::{MapConfig, World};

#[derive(Parser, Clone)]
#[command(name = "railmapper-cli")]
#[command(about = "Generate a terrain map, place settlements and plan a rail network")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducible generation
    #[arg(long)]
    seed: Option<u32>,

    /// Grid size in cells (format: WIDTHxHEIGHT)
    #[arg(long)]
    size: Option<String>,

    /// Number of settlements to place
    #[arg(long)]
    cities: Option<usize>,

    /// Directory for map.png, isolines.svg, grid.svg and cities.json
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Print a coloured preview of the map to the terminal
    #[arg(long)]
    ascii: bool,
}

fn parse_size(size: &str) -> Result<(usize, usize)> {
    let Some((w, h)) = size.split_once('x') else {
        bail!("size must look like WIDTHxHEIGHT, got {:?}", size);
    };
    let width = w.trim().parse().with_context(|| format!("bad width in {:?}", size))?;
    let height = h.trim().parse().with_context(|| format!("bad height in {:?}", size))?;
    Ok((width, height))
}

fn build_config(args: &Args) -> Result<MapConfig> {
    let mut config = match &args.config {
        Some(path) => MapConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => MapConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(size) = &args.size {
        let (width, height) = parse_size(size)?;
        config.width = width;
        config.height = height;
    }
    if let Some(count) = args.cities {
        config.city_count = count;
    }
    config.validate()?;
    Ok(config)
}

fn print_map_ascii(world: &World) {
    let height = world.height();
    let water = world.water();
    let levels = &world.config().contour_levels;
    let low = levels.first().copied().unwrap_or(0.4);
    let high = levels.last().copied().unwrap_or(0.44);

    let sample_x = (height.width / 80).max(1);
    let sample_y = (height.height / 30).max(1);

    for y in (0..height.height).step_by(sample_y) {
        for x in (0..height.width).step_by(sample_x) {
            let has_city = world.cities().iter().any(|p| {
                (p.x as usize) / sample_x == x / sample_x && (p.y as usize) / sample_y == y / sample_y
            });
            let v = height.at(x, y);
            let (color, ch) = if has_city {
                ("\x1b[92m", '●')
            } else if water.at(x, y) < 0.5 {
                ("\x1b[94m", '~')
            } else if v < low {
                ("\x1b[36m", '.')
            } else if v < high {
                ("\x1b[93m", ',')
            } else {
                ("\x1b[90m", '▲')
            };
            print!("{}{}\x1b[0m", color, ch);
        }
        println!();
    }
}

fn print_map_info(world: &World) {
    let config = world.config();
    let route = world.best_route();

    println!("\n\x1b[1mMap Summary:\x1b[0m");
    println!("═══════════════════════════════\n");
    println!("  Size:        {}x{} cells (seed {})", config.width, config.height, config.seed);
    println!(
        "  High ground: {:.1}% at or above {:.2}",
        world.height().coverage(config.threshold) * 100.0,
        config.threshold
    );
    println!("  Cities:      {} placed, {} requested", world.cities().len(), config.city_count);
    println!("  Sight lines: {}", world.graph().edge_count());

    println!("\n\x1b[1mBest Route:\x1b[0m");
    match route.start {
        Some(start) => {
            println!("  Start: {} (#{})", world.names()[start], start);
            println!("  Connects {} cities for {:.0} of {:.0}", route.node_count(), route.spent, config.economy.initial_budget);
            for &(from, to) in route.edges.iter().take(5) {
                println!("  • {} → {}", world.names()[from], world.names()[to]);
            }
        }
        None => println!("  No cities to connect"),
    }
}

fn write_outputs(world: &World, out: &Path) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let config = world.config();
    let route = world.best_route();

    let png_path = out.join("map.png");
    save_png(&compose(world, &route.edges, route.start), &png_path)
        .with_context(|| format!("writing {}", png_path.display()))?;

    let isolines = isolines_svg(
        world.contours(),
        config.width,
        config.height,
        config.px_per_cell,
        (config.px_per_cell / 2).max(1),
        ISOLINE_STROKE,
    );
    let cities = cities_svg(world.cities(), world.names(), &route.edges, route.start, config.px_per_cell);
    let svg_path = out.join("isolines.svg");
    write_svg(&merge_svgs(&isolines, &cities), &svg_path).with_context(|| format!("writing {}", svg_path.display()))?;

    let grid_path = out.join("grid.svg");
    write_svg(&grid_svg(config.width, config.height, config.px_per_cell), &grid_path)
        .with_context(|| format!("writing {}", grid_path.display()))?;

    let json_path = out.join("cities.json");
    let report = serde_json::to_string_pretty(&world.report())?;
    fs::write(&json_path, report).with_context(|| format!("writing {}", json_path.display()))?;

    println!(
        "\nWrote {}, {}, {} and {}",
        png_path.display(),
        svg_path.display(),
        grid_path.display(),
        json_path.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    println!("=== Rail Mapper ===");
    println!(
        "Generating {}x{} map with seed {} and {} cities...",
        config.width, config.height, config.seed, config.city_count
    );

    let world = World::generate(&config)?;

    if args.ascii {
        println!();
        print_map_ascii(&world);
    }
    print_map_info(&world);
    write_outputs(&world, &args.out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64x32").unwrap(), (64, 32));
        assert_eq!(parse_size(" 8 x 4 ").unwrap(), (8, 4));
        assert!(parse_size("64").is_err());
        assert!(parse_size("ax3").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from(["railmapper-cli", "--seed", "9", "--size", "30x20", "--cities", "5"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!((config.width, config.height), (30, 20));
        assert_eq!(config.city_count, 5);
        assert_eq!(config.threshold, MapConfig::default().threshold);
    }

    #[test]
    fn test_write_outputs_creates_every_file() {
        let args = Args::parse_from(["railmapper-cli", "--seed", "3", "--size", "24x16", "--cities", "6"]);
        let config = build_config(&args).unwrap();
        let world = World::generate(&config).unwrap();
        let out = std::env::temp_dir().join(format!("railmapper-out-{}", std::process::id()));

        write_outputs(&world, &out).unwrap();
        for name in ["map.png", "isolines.svg", "grid.svg", "cities.json"] {
            assert!(out.join(name).is_file(), "missing {}", name);
        }
        let grid = fs::read_to_string(out.join("grid.svg")).unwrap();
        assert_eq!(grid.matches("<line").count(), 25 + 17);
        fs::remove_dir_all(&out).ok();
    }

    #[test]
    fn test_invalid_size_is_rejected() {
        let args = Args::parse_from(["railmapper-cli", "--size", "0x20"]);
        assert!(build_config(&args).is_err());
    }
}
