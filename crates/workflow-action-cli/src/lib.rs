//! Inspection surface over a recorded workflow snapshot.
//!
//! Hosts embed the CLI through [`run_cli`], or call [`execute`] to get the
//! JSON payload without printing it. Every command reads one snapshot file
//! and evaluates the resolvers as the given caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use workflow_action_core::{
    annotable_action_data, classify_action, is_ready_to_complete, resolve_instance,
    resolve_override, sort_stages, Action, ActionMap, AnnotationRequest, Caller, CommentMap,
    OverrideMap, RecordedAcl, ResolveContext, Resolved, Resource, Scope, StageFacts, StatusIcon,
    WorkflowError,
};

#[derive(Debug, Parser)]
#[command(name = "wfa")]
#[command(about = "Workflow action-state inspector")]
pub struct Cli {
    /// Workflow snapshot JSON (scope, actions, comments, resources, acl).
    #[arg(long)]
    snapshot: PathBuf,

    /// Caller id the resolvers evaluate permissions for.
    #[arg(long)]
    caller: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List stages, most recent first.
    Stages,
    /// Resolve the instance of an action the caller may see.
    Resolve(ActionArgs),
    /// Evaluate whether an action is ready to complete.
    Ready(ActionArgs),
    /// Classify the status icon of an action within a stage.
    Status(StageActionArgs),
    /// Resolve the content override of a typesetting action.
    Override(ActionArgs),
    /// Build the full view-model of an action within a stage.
    Annotate(StageActionArgs),
}

#[derive(Debug, Args)]
pub struct ActionArgs {
    #[arg(long)]
    action: String,
}

#[derive(Debug, Args)]
pub struct StageActionArgs {
    #[arg(long)]
    stage: String,
    #[arg(long)]
    action: String,
}

/// On-disk snapshot of one workflow scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub scope: Scope,
    #[serde(default)]
    pub actions: ActionMap,
    #[serde(default)]
    pub comments: CommentMap,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub acl: RecordedAcl,
}

#[derive(Debug, Clone, Serialize)]
struct StageSummary<'a> {
    id: &'a str,
    identifier: Option<&'a str>,
    status: &'static str,
    start_time: Option<String>,
    member_count: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ResolveOutput<'a> {
    action_id: &'a str,
    provenance: Option<&'static str>,
    action: Option<&'a Action>,
}

#[derive(Debug, Clone, Serialize)]
struct ReadyOutput<'a> {
    action_id: &'a str,
    resolved: bool,
    is_ready: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OverrideOutput<'a> {
    action_id: &'a str,
    override_nodes: Option<OverrideMap>,
}

#[derive(Debug, Clone, Serialize)]
struct StatusOutput<'a> {
    action_id: &'a str,
    stage_id: &'a str,
    status: Option<StatusIcon>,
}

/// Loads a workflow snapshot from disk.
///
/// # Errors
/// Returns an error when the file cannot be read or does not decode as a
/// snapshot (including blank or duplicate action ids).
pub fn load_snapshot(path: &Path) -> Result<WorkflowSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot: WorkflowSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to decode snapshot {}", path.display()))?;
    debug!(
        path = %path.display(),
        actions = snapshot.actions.len(),
        comments = snapshot.comments.len(),
        resources = snapshot.resources.len(),
        "loaded workflow snapshot"
    );
    Ok(snapshot)
}

/// Executes the parsed CLI and prints the JSON result on stdout.
///
/// # Errors
/// Returns an error when the snapshot cannot be loaded, the caller is blank,
/// or the result cannot be encoded.
pub fn run_cli(cli: Cli) -> Result<()> {
    let value = execute(cli)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Executes the parsed CLI and returns the JSON result.
///
/// # Errors
/// Returns an error when the snapshot cannot be loaded, the caller is blank,
/// or the result cannot be encoded.
pub fn execute(cli: Cli) -> Result<Value> {
    if cli.caller.trim().is_empty() {
        return Err(WorkflowError::Configuration("--caller MUST be non-empty".to_string()).into());
    }
    let snapshot = load_snapshot(&cli.snapshot)?;
    run_command(&snapshot, &Caller::new(cli.caller), &cli.command)
}

/// Evaluates one command against an already loaded snapshot.
///
/// # Errors
/// Returns an error when the result cannot be encoded as JSON.
pub fn run_command(
    snapshot: &WorkflowSnapshot,
    caller: &Caller,
    command: &Command,
) -> Result<Value> {
    let ctx = ResolveContext {
        action_map: &snapshot.actions,
        caller,
        acl: &snapshot.acl,
    };

    let value = match command {
        Command::Stages => {
            let summaries = sort_stages(&snapshot.actions)
                .into_iter()
                .map(stage_summary)
                .collect::<Result<Vec<_>>>()?;
            serde_json::to_value(summaries)?
        }
        Command::Resolve(args) => {
            let resolved = resolve_instance(&args.action, &ctx);
            serde_json::to_value(ResolveOutput {
                action_id: &args.action,
                provenance: resolved.map(|instance| {
                    if instance.is_live() {
                        "live"
                    } else {
                        "snapshot"
                    }
                }),
                action: resolved.map(Resolved::action),
            })?
        }
        Command::Ready(args) => {
            let resolved = resolve_instance(&args.action, &ctx);
            serde_json::to_value(ReadyOutput {
                action_id: &args.action,
                resolved: resolved.is_some(),
                is_ready: resolved.is_some_and(|instance| {
                    is_ready_to_complete(
                        &snapshot.scope,
                        instance.action(),
                        &snapshot.resources,
                        &snapshot.actions,
                    )
                }),
            })?
        }
        Command::Status(args) => {
            let stage = snapshot
                .actions
                .get(&args.stage)
                .filter(|stage| stage.as_stage().is_some());
            let status = resolve_instance(&args.action, &ctx).map(|instance| {
                classify_action(&ctx, instance.action(), stage, &snapshot.scope, &StageFacts)
            });
            serde_json::to_value(StatusOutput {
                action_id: &args.action,
                stage_id: &args.stage,
                status,
            })?
        }
        Command::Override(args) => serde_json::to_value(OverrideOutput {
            action_id: &args.action,
            override_nodes: resolve_override(&args.action, &ctx),
        })?,
        Command::Annotate(args) => {
            let request = AnnotationRequest {
                scope: &snapshot.scope,
                stage_id: &args.stage,
                action_id: &args.action,
                caller,
                action_map: &snapshot.actions,
                comment_map: &snapshot.comments,
                resources: &snapshot.resources,
            };
            serde_json::to_value(annotable_action_data(&request, &snapshot.acl))?
        }
    };
    Ok(value)
}

fn stage_summary(stage: &Action) -> Result<StageSummary<'_>> {
    let start_time = stage
        .start_time
        .map(|start| start.format(&Rfc3339))
        .transpose()
        .context("failed to format stage start_time")?;
    Ok(StageSummary {
        id: stage.id.as_str(),
        identifier: stage
            .as_stage()
            .and_then(|body| body.identifier.as_deref()),
        status: stage.status.as_str(),
        start_time,
        member_count: stage.stage_members().len(),
    })
}

/// Stable `{code, message}` payload for a failed command.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
}

#[must_use]
pub fn error_envelope(err: &anyhow::Error) -> ErrorEnvelope {
    ErrorEnvelope {
        code: error_code(err),
        message: format!("{err:#}"),
    }
}

fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(workflow) = cause.downcast_ref::<WorkflowError>() {
            return match workflow {
                WorkflowError::Validation(_) => "validation_error",
                WorkflowError::Snapshot(_) => "snapshot_error",
                WorkflowError::Configuration(_) => "configuration_error",
            };
        }
        if cause.downcast_ref::<serde_json::Error>().is_some() {
            return "snapshot_error";
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return "io_error";
        }
    }
    "internal_error"
}
