use clap::Parser;
use pipe_analysis::core::ConfigProvider;
use pipe_analysis::utils::{logger, validation::Validate};
use pipe_analysis::{list_dates, run_analysis, SourceKind, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-analysis")]
#[command(about = "Payment success analysis driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "pipe-analysis.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Show what would be analysed without fetching any file
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based payment analysis");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No file will be fetched");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source = config.source.clone();
    match run_analysis(&source, config, monitor_enabled).await {
        Ok(report_path) => {
            tracing::info!("✅ Analysis completed successfully!");
            println!("✅ Analysis completed successfully!");
            println!("📁 Report saved to: {}", report_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    match config.source.kind {
        SourceKind::Local => println!("  Source: local directory {}", config.source.data_dir),
        SourceKind::S3 => println!("  Source: bucket {}", config.source.bucket),
        SourceKind::Http => println!(
            "  Source: {}",
            config.source.base_url.as_deref().unwrap_or("-")
        ),
    }
    println!("  Prefix: {}", config.prefix());
    println!("  Output: {}", config.output_path());
    println!("  Chunk Size: {}", config.chunk_size());
    println!("  Malformed Rows: {:?}", config.row_policy());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📅 Dates:");
    if config.selected_dates().is_empty() {
        let available = list_dates(&config.source).await?;
        match available.last() {
            Some(latest) => println!("  Latest file would be used: {}", latest),
            None => println!("  ⚠️ No CSV files under '{}'", config.prefix()),
        }
        println!("  Available: {}", available.join(", "));
    } else {
        println!("  Selected: {}", config.selected_dates().join(", "));
    }

    let schema = config.schema();
    println!();
    println!("🔄 Grouping:");
    println!("  Client column: {}", schema.client_column);
    println!("  Status column: {}", schema.status_column);
    if let Some(name_column) = &schema.client_name_column {
        println!("  Client name column: {}", name_column);
    }
    if !schema.dimension_columns.is_empty() {
        println!("  Dimensions: {}", schema.dimension_columns.join(", "));
    }
    println!("  Sort: {:?}", config.sort_order());

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    if config.archive() {
        println!("  Archive: pipe_analysis.zip");
    }
    if config.upload_summary() {
        println!("  Upload: summary documents next to the source files");
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
