//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::changes::{
    BlueprintChanges, ChangeAction, ChangesetHasher, FieldChange, SkippedRollbackItem,
    StagingResult, join_child_path,
};
use crate::config::ValidationResult;
use crate::core::MappingNode;
use crate::rollback::RollbackPlan;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource action row for table display.
#[derive(Tabled)]
struct ResourceActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
}

/// Skipped item row for table display.
#[derive(Tabled)]
struct SkippedRow {
    #[tabled(rename = "Type")]
    item_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a staging result, with the stored changeset ID if it was
    /// saved.
    #[must_use]
    pub fn format_staging(
        &self,
        result: &StagingResult,
        changeset_id: Option<&str>,
        detailed: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&StagingJson::new(result, changeset_id)),
            OutputFormat::Text => {
                let mut output = Self::format_changes_text("Staged changeset", &result.changes, detailed);

                if !result.is_complete() {
                    let _ = write!(output, "\n{} Resources that could not be diffed:\n", "✗".red());
                    for failure in &result.failures {
                        let _ = writeln!(
                            output,
                            "   - {}: {}",
                            qualified(&failure.child_path, &failure.resource_name),
                            failure.error
                        );
                    }
                }

                if let Some(id) = changeset_id {
                    let _ = write!(output, "\nSaved changeset: {}\n", id.bold());
                }

                output
            }
        }
    }

    /// Formats a reverse changeset, with the items filtered out of it.
    #[must_use]
    pub fn format_reversal(
        &self,
        changes: Option<&BlueprintChanges>,
        skipped: &[SkippedRollbackItem],
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "changes": changes,
                "skipped_items": skipped,
                "has_skipped_items": !skipped.is_empty(),
            })),
            OutputFormat::Text => {
                let mut output = changes.map_or_else(
                    || String::from("Nothing to reverse.\n"),
                    |changes| Self::format_changes_text("Reverse changeset", changes, true),
                );
                output.push_str(&Self::format_skipped_text(skipped));
                output
            }
        }
    }

    /// Formats a rollback or teardown plan.
    #[must_use]
    pub fn format_plan(&self, plan: &RollbackPlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => {
                let title = format!("{} plan for {}", plan.kind, plan.instance_id);
                let mut output = match &plan.changes {
                    Some(changes) if !plan.is_noop() => {
                        Self::format_changes_text(&title, changes, false)
                    }
                    _ => format!("{} {title}: nothing to do.\n", "✓".green()),
                };

                if let Some(digest) = &plan.digest {
                    let hasher = ChangesetHasher::new();
                    let _ = writeln!(output, "   Digest: {}", hasher.short_hash(digest));
                }
                let _ = writeln!(
                    output,
                    "   Planned at: {}",
                    plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );

                output.push_str(&Self::format_skipped_text(&plan.skipped_items));
                output
            }
        }
    }

    /// Formats a changeset digest.
    #[must_use]
    pub fn format_digest(&self, digest: &str, full: bool) -> String {
        let shown = if full {
            digest.to_string()
        } else {
            ChangesetHasher::new().short_hash(digest)
        };

        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({ "digest": shown })),
            OutputFormat::Text => format!("{shown}\n"),
        }
    }

    /// Formats a configuration validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid.\n", "✓".green())
                } else {
                    let mut output = format!(
                        "{} Configuration has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && result.warning_count() > 0 {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats a changeset as text.
    fn format_changes_text(title: &str, changes: &BlueprintChanges, detailed: bool) -> String {
        if changes.is_empty() {
            return format!("{} {title}: no changes.\n", "✓".green());
        }

        let mut output = format!("\n{title}\n\n");

        let rows: Vec<ResourceActionRow> = changes
            .resource_actions()
            .into_iter()
            .filter(|a| a.action != ChangeAction::NoChange)
            .enumerate()
            .map(|(i, a)| ResourceActionRow {
                index: i + 1,
                action: Self::format_action(a.action),
                resource: qualified(&a.child_path, &a.name),
            })
            .collect();

        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let summary = changes.summary();
        let _ = write!(
            output,
            "\nChanges: {} to create, {} to update, {} to recreate, {} to remove\n",
            summary.create.to_string().green(),
            summary.update.to_string().yellow(),
            summary.recreate.to_string().yellow(),
            summary.delete.to_string().red()
        );
        if summary.removed_links > 0 || summary.new_children > 0 || summary.removed_children > 0 {
            let _ = writeln!(
                output,
                "         {} link(s) to remove, {} child blueprint(s) to create, {} to remove",
                summary.removed_links, summary.new_children, summary.removed_children
            );
        }

        if detailed {
            output.push_str("\nField changes:\n");
            write_field_changes(&mut output, "", changes);
        }

        output
    }

    /// Formats skipped items as text.
    fn format_skipped_text(skipped: &[SkippedRollbackItem]) -> String {
        if skipped.is_empty() {
            return String::new();
        }

        let mut output = format!(
            "\n{} {} operation(s) skipped as unsafe:\n",
            "⚠".yellow(),
            skipped.len()
        );

        let rows: Vec<SkippedRow> = skipped
            .iter()
            .map(|item| SkippedRow {
                item_type: item.item_type.to_string(),
                name: qualified(&item.child_path, &item.name),
                status: item.status.clone(),
                reason: item.reason.clone(),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
        output
    }

    /// Formats an action with color.
    fn format_action(action: ChangeAction) -> String {
        match action {
            ChangeAction::Create => "+create".green().to_string(),
            ChangeAction::Update => "~update".yellow().to_string(),
            ChangeAction::Recreate => "±recreate".yellow().to_string(),
            ChangeAction::Delete => "-delete".red().to_string(),
            ChangeAction::NoChange => "noop".dimmed().to_string(),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn qualified(child_path: &str, name: &str) -> String {
    join_child_path(child_path, name)
}

fn write_field_changes(output: &mut String, child_path: &str, changes: &BlueprintChanges) {
    let resources = changes
        .new_resources
        .iter()
        .chain(changes.resource_changes.iter());

    for (name, resource) in resources {
        let name = qualified(child_path, name);
        for change in resource.new_fields.iter().chain(&resource.modified_fields) {
            let _ = writeln!(output, "   {name}: {}", describe(change));
        }
        for path in &resource.removed_fields {
            let _ = writeln!(output, "   {name}: {} {}", "-".red(), path);
        }
    }

    for (name, export) in changes.new_exports.iter().chain(&changes.export_changes) {
        let _ = writeln!(output, "   export {name}: {}", describe(export));
    }

    for (name, child) in &changes.child_changes {
        write_field_changes(output, &join_child_path(child_path, name), child);
    }
}

fn describe(change: &FieldChange) -> String {
    let render = |value: Option<&MappingNode>| {
        if change.sensitive {
            return String::from("(sensitive)");
        }
        value.map_or_else(
            || String::from("(known on deploy)"),
            |v| serde_json::to_string(v).unwrap_or_default(),
        )
    };

    match &change.prev_value {
        Some(prev) => format!(
            "{} {}: {} -> {}",
            "~".yellow(),
            change.field_path,
            render(Some(prev)),
            render(change.new_value.as_ref())
        ),
        None => format!(
            "{} {}: {}",
            "+".green(),
            change.field_path,
            render(change.new_value.as_ref())
        ),
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct StagingJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    changeset_id: Option<&'a str>,
    complete: bool,
    changes: &'a BlueprintChanges,
    failures: Vec<FailureJson>,
}

#[derive(Serialize)]
struct FailureJson {
    child_path: String,
    resource: String,
    error: String,
}

impl<'a> StagingJson<'a> {
    fn new(result: &'a StagingResult, changeset_id: Option<&'a str>) -> Self {
        Self {
            changeset_id,
            complete: result.is_complete(),
            changes: &result.changes,
            failures: result
                .failures
                .iter()
                .map(|f| FailureJson {
                    child_path: f.child_path.clone(),
                    resource: f.resource_name.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{Changes, ResourceInfo, SkippedItemType};

    fn sample_changes() -> BlueprintChanges {
        let mut changes = BlueprintChanges::default();
        let mut resource = Changes {
            applied_resource_info: ResourceInfo::named("q", "aws/sqs/queue"),
            ..Changes::default()
        };
        resource.modified_fields.push(FieldChange::new(
            "spec.timeout",
            Some(MappingNode::from(30_i64)),
            Some(MappingNode::from(60_i64)),
        ));
        changes.resource_changes.insert(String::from("q"), resource);
        changes
    }

    #[test]
    fn test_text_changes_lists_resources() {
        colored::control::set_override(false);
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let output = formatter.format_reversal(Some(&sample_changes()), &[]);

        assert!(output.contains("~update"));
        assert!(output.contains("spec.timeout: 30 -> 60"));
    }

    #[test]
    fn test_json_reversal() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let skipped = [SkippedRollbackItem {
            name: String::from("q"),
            item_type: SkippedItemType::Resource,
            child_path: String::new(),
            status: String::from("UPDATE FAILED"),
            reason: String::from("resource update was not completed successfully"),
        }];
        let output = formatter.format_reversal(None, &skipped);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["has_skipped_items"], true);
        assert_eq!(value["skipped_items"][0]["type"], "resource");
        assert!(value["changes"].is_null());
    }

    #[test]
    fn test_sensitive_values_masked() {
        colored::control::set_override(false);
        let mut change = FieldChange::new(
            "spec.password",
            Some(MappingNode::from("old")),
            Some(MappingNode::from("new")),
        );
        change.sensitive = true;

        let described = describe(&change);
        assert!(!described.contains("old"));
        assert!(described.contains("(sensitive)"));
    }

    #[test]
    fn test_digest_short() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let output = formatter.format_digest("abcdef1234567890", false);
        assert_eq!(output, "abcdef123456\n");
    }
}
