//! Netify policy command handlers.

use netzone_config::Config;
use netzone_core::{NetifySettings, PolicyOutcome, PolicyPatch};

use crate::cli::{GlobalOpts, PolicyArgs, PolicyCommand};
use crate::error::CliError;
use crate::output;

use super::util;

fn outcome_label(outcome: PolicyOutcome, fallback: &str) -> String {
    match outcome {
        PolicyOutcome::Reject => "reject".into(),
        PolicyOutcome::FallbackToDefault => fallback.into(),
        PolicyOutcome::AutoCreate => "auto-create".into(),
    }
}

fn detail(settings: &NetifySettings) -> String {
    output::detail_block(&[
        (
            "allow_unknown_devices",
            settings.allow_unknown_devices.to_string(),
        ),
        (
            "auto_create_devices",
            settings.auto_create_devices.to_string(),
        ),
        (
            "allow_unknown_zones",
            settings.allow_unknown_zones.to_string(),
        ),
        ("auto_create_zones", settings.auto_create_zones.to_string()),
        (
            "unknown devices",
            outcome_label(settings.device_policy(), "accept unassigned"),
        ),
        (
            "unknown zones",
            outcome_label(settings.zone_policy(), "default zone"),
        ),
    ])
}

fn render(global: &GlobalOpts, settings: &NetifySettings) -> Result<(), CliError> {
    let out = output::render_single(&global.output, settings, detail, |s| {
        format!(
            "{} {} {} {}",
            s.allow_unknown_devices,
            s.auto_create_devices,
            s.allow_unknown_zones,
            s.auto_create_zones
        )
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(args: PolicyArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = util::local_engine(config).await?;

    match args.command {
        PolicyCommand::Show => render(global, &engine.store().policy()),

        PolicyCommand::Set {
            allow_unknown_devices,
            auto_create_devices,
            allow_unknown_zones,
            auto_create_zones,
        } => {
            let patch = PolicyPatch {
                allow_unknown_devices,
                auto_create_devices,
                allow_unknown_zones,
                auto_create_zones,
            };
            if patch.is_empty() {
                return Err(CliError::Validation {
                    field: "policy".into(),
                    reason: "pass at least one switch to change".into(),
                });
            }
            let settings = engine.update_policy(&patch).await?;
            util::persist(&engine).await?;
            output::status(global, "Policy updated");
            render(global, &settings)
        }
    }
}
