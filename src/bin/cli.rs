use clap::Parser;
use dungeongen::{Catalog, DungeonGenerationParams, DungeonGenerator};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Генератор подземелий для Rune and Rust
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Пользовательский каталог шаблонов (по умолчанию: встроенный)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Переопределить сид из конфигурации
    #[arg(short, long)]
    seed: Option<u64>,

    /// Путь для сохранения подземелья в JSON (по умолчанию: ./dungeon.json)
    #[arg(short, long, default_value = "dungeon.json")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "dungeongen=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    println!("🔍 Загрузка конфигурации...");
    let params = DungeonGenerationParams::from_toml_file(&cli.config)?;
    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_toml_file(path)?,
        None => Catalog::builtin()?,
    };

    let mut request = params.request();
    if let Some(seed) = cli.seed {
        request.seed = Some(seed);
    }

    println!(
        "Генерация подземелья «{}» ({}, {:?}, комнат: {})...",
        request.name, request.biome, request.difficulty, request.room_count
    );
    let generator = DungeonGenerator::from_catalog(Arc::new(catalog), params.settings);
    let (dungeon, report) = generator.generate_with_report(&request)?;

    println!(
        "Сид: {}, угроза: {} из {}, починок: {}, тупиков: {}",
        dungeon.seed,
        dungeon.total_threat(),
        dungeon.threat_budget,
        report.repairs(),
        report.dead_ends.len()
    );
    if !report.unreachable.is_empty() {
        println!("⚠️ Недостижимые узлы: {:?}", report.unreachable);
    }

    println!("Сохранение в {:?}", cli.output);
    fs::write(&cli.output, serde_json::to_string_pretty(&dungeon)?)?;

    println!("\nГотово! Подземелье сохранено.");
    Ok(())
}
