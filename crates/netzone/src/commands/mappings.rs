//! Mapping table command handlers.

use tabled::Tabled;

use netzone_config::Config;
use netzone_core::{IdentityQuery, MappingEntry, MappingType, TestReport, ZonePreview};

use crate::cli::{GlobalOpts, MappingsArgs, MappingsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MappingRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&MappingEntry> for MappingRow {
    fn from(e: &MappingEntry) -> Self {
        Self {
            kind: e.kind.to_string(),
            key: e.key.clone(),
            value: e.value.clone(),
        }
    }
}

fn hit(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}

fn preview_line(preview: &ZonePreview) -> String {
    match preview {
        ZonePreview::Existing {
            zone_id, zone_name, ..
        } => format!("existing zone {zone_id} ({zone_name})"),
        ZonePreview::WouldCreate { router_identifier } => {
            format!("would create zone '{router_identifier}'")
        }
        ZonePreview::DefaultFallback { zone_id } => format!("default zone {zone_id}"),
        ZonePreview::Rejected { .. } => "rejected by policy".into(),
    }
}

fn test_detail(report: &TestReport) -> String {
    let r = &report.resolution;
    output::detail_block(&[
        ("IP", r.ip.clone()),
        (
            "Identifier",
            hit(r.hit(MappingType::RouterIdentifierMapping)),
        ),
        ("Router", hit(r.hit(MappingType::RouterMapping))),
        ("Interface", hit(r.hit(MappingType::InterfaceMapping))),
        ("Resolved", hit(report.resolved_zone_identifier.as_deref())),
        ("Zone", preview_line(&report.zone_preview)),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: MappingsArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = util::local_engine(config).await?;

    match args.command {
        MappingsCommand::List { kind } => {
            let kind = kind.as_deref().map(MappingType::parse).transpose()?;
            let entries: Vec<MappingEntry> = engine
                .config()
                .mappings
                .entries()
                .into_iter()
                .filter(|e| kind.is_none_or(|k| e.kind == k))
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| MappingRow::from(e),
                |e| format!("{}={}", e.key, e.value),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MappingsCommand::Add { kind, key, value } => {
            let kind = MappingType::parse(&kind)?;
            let previous = engine.add_mapping(kind, &key, &value).await?;
            util::persist(&engine).await?;
            let message = match previous {
                Some(old) => format!("Updated {kind} {key}: {old} -> {value}"),
                None => format!("Added {kind} {key} -> {value}"),
            };
            output::status(global, &message);
            Ok(())
        }

        MappingsCommand::Remove { kind, key } => {
            let kind = MappingType::parse(&kind)?;
            if !util::confirm(
                &format!("Remove {kind} mapping '{key}'?"),
                "mappings remove",
                global.yes,
            )? {
                return Ok(());
            }
            let removed = engine.remove_mapping(kind, &key).await?;
            util::persist(&engine).await?;
            output::status(global, &format!("Removed {kind} {key} (was {removed})"));
            Ok(())
        }

        MappingsCommand::Test {
            ip,
            interface,
            router_key,
        } => {
            let mut query = IdentityQuery::new(ip);
            query.interface = interface;
            query.router_key = router_key;
            let report = engine.test(&query).await?;
            let out = output::render_single(&global.output, &report, test_detail, |r| {
                hit(r.resolved_zone_identifier.as_deref())
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
