use crate::commands::CommandResult;
use atelier_core::config::{AppConfig, LoadOptions};
use atelier_db::{connect_with_settings, migrations, InquirySeedInfo, PipelineSeedDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = PipelineSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = PipelineSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedOutput, (&'static str, String, u8)> =
            if !verification.all_present {
                let failed_checks = failed_check_labels(&verification.checks);
                Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
            } else {
                Ok(SeedOutput {
                    inquiries: seed_result.inquiries_seeded,
                    proposals: seed_result.proposals_seeded,
                })
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => {
            let inquiry_lines: Vec<String> = output
                .inquiries
                .iter()
                .map(|seed| {
                    format!("  - {}: {} ({})", seed.status, seed.inquiry_id, seed.description)
                })
                .collect();
            let message = format!(
                "pipeline seed loaded: {} inquiries, {} proposals\n{}",
                output.inquiries.len(),
                output.proposals,
                inquiry_lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    inquiries: Vec<InquirySeedInfo>,
    proposals: usize,
}

fn failed_check_labels(checks: &[(String, bool)]) -> Vec<&str> {
    checks.iter().filter_map(|(check, passed)| (!passed).then_some(check.as_str())).collect()
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::{failed_check_labels, verification_failure_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = vec![
            ("inquiry-new".to_string(), true),
            ("inquiry-booked-proposal-count".to_string(), false),
            ("proposal-booked-v1-subtotals".to_string(), false),
        ];

        let failed_checks = failed_check_labels(&checks);

        assert_eq!(
            verification_failure_message(&failed_checks),
            "Seed verification failed for checks: inquiry-booked-proposal-count, \
             proposal-booked-v1-subtotals"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = vec![("inquiry-new".to_string(), true)];

        let failed_checks = failed_check_labels(&checks);

        assert_eq!(verification_failure_message(&failed_checks), "Some seed data failed to load");
    }
}
