use citygen::{MapConfig, generate};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Генератор карты города и окрестностей
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Путь для сохранения карты в JSON (по умолчанию: ./map.json)
    #[arg(short, long, default_value = "map.json")]
    output: PathBuf,

    /// Путь для растрового превью карты (PNG)
    #[arg(short, long)]
    preview: Option<PathBuf>,

    /// Масштаб превью: пикселей на единицу карты
    #[arg(long, default_value_t = 0.25)]
    scale: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    println!("🔍 Загрузка конфигурации...");
    let config_path = cli.config.to_str().ok_or("путь к конфигурации не в UTF-8")?;
    let config = MapConfig::from_toml_file(config_path)?;

    println!(
        "Генерация карты (сид: {}, размер: {}×{})...",
        config.seed, config.width, config.height
    );
    let map = generate(&config)?;
    let core = map.core().map_or("нет", |d| d.name.as_str());
    println!(
        "Архетип: {:?}, районов: {}, ядро: {}",
        map.archetype(),
        map.districts().len(),
        core
    );
    for warning in map.warnings() {
        println!("⚠️  {warning}");
    }

    println!("Сохранение в {:?}", cli.output);
    std::fs::write(&cli.output, map.to_json()?)?;

    if let Some(preview) = &cli.preview {
        println!("Сохранение превью в {preview:?}");
        let preview_path = preview.to_str().ok_or("путь к превью не в UTF-8")?;
        map.save_preview_png(preview_path, cli.scale)?;
    }

    println!("\nГотово! Карта сохранена.");
    Ok(())
}
