use crate::commands::{build_runtime, load_config, CommandResult};
use qualcel_db::{connect_with_config, migrations, DemoCatalog, SeededDevice};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = DemoCatalog::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoCatalog::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(seeded.devices_seeded)
        } else {
            let failed = verification
                .checks
                .iter()
                .filter(|(_, _, passed)| !passed)
                .map(|(device, check, _)| format!("{device}:{check}"))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_failure_message(&failed), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(devices) => CommandResult::success("seed", seeded_message(&devices)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seeded_message(devices: &[SeededDevice]) -> String {
    let lines = devices
        .iter()
        .map(|device| format!("  - {}: {}", device.id, device.model))
        .collect::<Vec<_>>();
    format!("demo catalog loaded with {} devices:\n{}", devices.len(), lines.join("\n"))
}

fn verification_failure_message(failed: &[String]) -> String {
    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    }
}
