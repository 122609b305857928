use consentry_core::PolicyName;

use crate::cli::PolicyArgs;
use crate::context::{AppContext, CliError, CliResult};
use crate::output::{render_decision, render_status};

pub(crate) fn handle_status(ctx: &AppContext) -> CliResult<String> {
    render_status(ctx.store.policies_key(), &ctx.store.policies(), ctx.output)
}

pub(crate) fn handle_check(ctx: &AppContext, args: &PolicyArgs) -> CliResult<String> {
    let policy = policy_name(args)?;
    let decision = ctx.store.is_policy_accepted(policy.clone());
    render_decision(policy.as_str(), decision, ctx.output)
}

pub(crate) fn handle_accept(ctx: &AppContext, args: &PolicyArgs) -> CliResult<String> {
    let policy = policy_name(args)?;
    ctx.store.accept_policy(policy.clone())?;
    let decision = ctx.store.is_policy_accepted(policy.clone());
    render_decision(policy.as_str(), decision, ctx.output)
}

pub(crate) fn handle_reject(ctx: &AppContext, args: &PolicyArgs) -> CliResult<String> {
    let policy = policy_name(args)?;
    if policy.is_essential() {
        tracing::warn!("essential cookies cannot be rejected; record left unchanged");
    }
    ctx.store.reject_policy(policy.clone())?;
    let decision = ctx.store.is_policy_accepted(policy.clone());
    render_decision(policy.as_str(), decision, ctx.output)
}

pub(crate) fn handle_accept_all(ctx: &AppContext) -> CliResult<String> {
    ctx.store.accept_all_policies()?;
    handle_status(ctx)
}

pub(crate) fn handle_reject_all(ctx: &AppContext) -> CliResult<String> {
    ctx.store.reject_all_policies()?;
    handle_status(ctx)
}

/// Expire every visible cookie, release the store, and reopen it so the
/// record is seeded afresh.
pub(crate) fn handle_reset(ctx: &mut AppContext) -> CliResult<String> {
    ctx.store.delete_all("/", None)?;
    ctx.reopen()?;
    handle_status(ctx)
}

fn policy_name(args: &PolicyArgs) -> CliResult<PolicyName> {
    let trimmed = args.policy.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation("policy name must not be empty"));
    }
    Ok(PolicyName::new(trimmed))
}
