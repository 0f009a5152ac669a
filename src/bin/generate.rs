use tenchi::terrain::{TerrainConfig, TerrainGenerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 可选参数：JSON 配置文件路径
    let config = match std::env::args().nth(1) {
        Some(path) => TerrainConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => TerrainConfig {
            resolution: 257,
            seed: Some(2024),
            ..Default::default()
        },
    };
    let water_height = config.water_height;
    let mut generator = TerrainGenerator::new(config)?;

    generator.multiple_perlin()?;
    generator.config_mut().reset_terrain = false;
    let peaks = generator.voronoi()?;
    // 分辨率不是 2^n + 1 时跳过中点位移
    if let Err(e) = generator.midpoint_displacement() {
        log::warn!("Skipping diamond-square: {e}");
    }
    generator.erode()?;
    generator.smooth();
    generator.field_mut().normalize();

    let (alpha, _) = generator.splat_maps()?;
    let (trees, _) = generator.plant_vegetation()?;
    let (details, _) = generator.apply_details()?;
    let shore = generator.shoreline();

    let heights = generator.field().heights();
    let (min, max) = generator.field().min_max();
    let avg = heights.iter().sum::<f32>() / heights.len() as f32;
    let wet = heights.iter().filter(|&&h| h < water_height).count();
    let dry = heights.len() - wet;

    println!("Height stats:");
    println!("  Min: {:.3}", min);
    println!("  Max: {:.3}", max);
    println!("  Avg: {:.3}", avg);
    println!("  Voronoi peaks: {}", peaks.len());
    println!(
        "  Wet cells (h<{}): {} ({:.1}%)",
        water_height,
        wet,
        wet as f32 * 100.0 / heights.len() as f32
    );
    println!(
        "  Dry cells: {} ({:.1}%)",
        dry,
        dry as f32 * 100.0 / heights.len() as f32
    );
    println!("  Shore segments: {}", shore.len());
    println!("Layers:");
    println!("  Alpha map: {}x{}x{}", alpha.width, alpha.height, alpha.layers);
    println!("  Trees: {}", trees.len());
    for (i, layer) in details.iter().enumerate() {
        println!("  Detail {}: {} cells", i, layer.occupied());
    }
    Ok(())
}
