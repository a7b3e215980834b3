use anyhow::Context;
use clap::Parser;
use ppm_estimate::config::ShipmentArgs;
use ppm_estimate::core::reconcile::{
    compute_divergence, evaluate_save, format_cents, guidance, SaveDecision,
};
use ppm_estimate::core::{ConfigProvider, EstimateResult, PersistedPpmRecord, PpmStore};
use ppm_estimate::utils::error::ErrorSeverity;
use ppm_estimate::utils::{logger, validation::Validate};
use ppm_estimate::{
    CliConfig, EstimateError, EstimateOrchestrator, FilePpmStore, HttpEstimateClient,
    HttpPpmStore, TomlConfig,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置 (若有指定)
    let toml = match &cli.config {
        Some(path) => Some(
            TomlConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path))?,
        ),
        None => None,
    };

    // 初始化日誌
    match &toml {
        Some(config) if config.json_logs() => logger::init_json_logger(config.log_level()),
        _ if cli.json_logs => logger::init_json_logger(None),
        _ => logger::init_cli_logger(cli.verbose),
    }

    tracing::info!("Starting ppm-estimate");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let outcome = match &toml {
        Some(config) => run(config, &cli.shipment).await,
        None => run(&cli, &cli.shipment).await,
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Estimate failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 2,      // 輸入被拒絕
            ErrorSeverity::Medium => 3,   // 可重試
            ErrorSeverity::High => 1,     // 資料錯誤
            ErrorSeverity::Critical => 4, // 配置錯誤
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run<C: ConfigProvider + Validate>(
    config: &C,
    shipment: &ShipmentArgs,
) -> ppm_estimate::Result<()> {
    // 驗證配置
    config.validate()?;

    let store = open_store(config)?;
    let persisted = match (&store, &shipment.move_id) {
        (Some(store), Some(move_id)) => {
            tracing::info!("📂 Loading PPM record for move {}", move_id);
            Some(store.get_ppm_for_move(move_id).await?)
        }
        _ => None,
    };

    let candidate = shipment.apply_to(
        persisted
            .as_ref()
            .map(PersistedPpmRecord::to_candidate)
            .unwrap_or_default(),
    );

    let client = Arc::new(HttpEstimateClient::from_config(config)?);
    let orchestrator = EstimateOrchestrator::from_config(client, config);
    orchestrator.on_field_change(&candidate)?;

    let timeout_error = || EstimateError::EstimateTimeout {
        seconds: shipment.wait_seconds,
    };
    let result = tokio::time::timeout(
        Duration::from_secs(shipment.wait_seconds),
        orchestrator.resolved(),
    )
    .await
    .map_err(|_| timeout_error())?
    .ok_or_else(timeout_error)?;

    let status = orchestrator.current_estimate();
    let guide = guidance(&status);

    match &result {
        EstimateResult::Success(range) => println!(
            "✅ Incentive estimate: {} to {}",
            format_cents(range.min()),
            format_cents(range.max())
        ),
        EstimateResult::Failure { kind, detail } => {
            println!("⚠️  Incentive estimate unavailable ({:?}): {}", kind, detail)
        }
    }
    if let Some(message) = guide.message {
        println!("💡 {}", message);
    }
    if guide.retry_available {
        println!("   Run the command again to retry.");
    }

    if let Some(record) = &persisted {
        if compute_divergence(&result, record) {
            let saved = record
                .saved_range()
                .map(|r| format!("{} to {}", format_cents(r.min()), format_cents(r.max())))
                .unwrap_or_else(|| "none".to_string());
            println!("⚠️  Estimate differs from the saved one ({})", saved);
        }
    }

    let advance = shipment
        .advance
        .or_else(|| persisted.as_ref().map(PersistedPpmRecord::requested_advance))
        .unwrap_or(0);
    let last_result = orchestrator.last_result();
    let decision = evaluate_save(
        &status,
        last_result.as_ref(),
        advance,
        config.unavailable_policy(),
    );

    if let SaveDecision::Blocked(blocker) = decision {
        println!("❌ Save blocked: {}", blocker.message());
        return Ok(());
    }

    if !shipment.save {
        return Ok(());
    }

    match (&store, &persisted, &shipment.move_id, orchestrator.last_request()) {
        (Some(store), Some(record), Some(move_id), Some(request)) => {
            let mut updated = record.with_estimate(&request, result.incentive());
            if let Some(amount) = shipment.advance {
                updated.advance_requested = amount > 0;
                updated.advance_amount = Some(amount);
            }
            let saved = store.patch_ppm(move_id, &updated).await?;
            tracing::info!("💾 PPM {} saved for move {}", saved.id, move_id);
            println!("💾 PPM {} saved", saved.id);
        }
        _ => println!("Nothing saved: --save needs --move-id and a PPM store"),
    }

    Ok(())
}

fn open_store<C: ConfigProvider>(config: &C) -> ppm_estimate::Result<Option<Box<dyn PpmStore>>> {
    if let Some(endpoint) = config.ppm_store_endpoint() {
        let store = HttpPpmStore::new(endpoint, config.request_timeout())?;
        return Ok(Some(Box::new(store)));
    }

    Ok(config
        .ppm_store_directory()
        .map(|dir| Box::new(FilePpmStore::new(dir.to_string())) as Box<dyn PpmStore>))
}
