use clap::Parser;
use pipe_analysis::utils::{logger, validation::Validate};
use pipe_analysis::{list_dates, run_analysis, CliConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pipe-analysis CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let source = config.source_settings();

    if config.list {
        match list_dates(&source).await {
            Ok(dates) if dates.is_empty() => {
                println!("No CSV files found under '{}'", source.prefix);
            }
            Ok(dates) => {
                println!("📅 Available dates ({}):", dates.len());
                for date in dates {
                    println!("  {}", date);
                }
            }
            Err(e) => {
                tracing::error!("❌ Listing failed: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(e.exit_code());
            }
        }
        return Ok(());
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run_analysis(&source, config, monitor_enabled).await {
        Ok(report_path) => {
            tracing::info!("✅ Analysis completed successfully!");
            tracing::info!("📁 Report saved to: {}", report_path);
            println!("✅ Analysis completed successfully!");
            println!("📁 Report saved to: {}", report_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
