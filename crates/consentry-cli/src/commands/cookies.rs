use consentry_core::CookieOptions;

use crate::cli::{CookieDeleteArgs, CookieGetArgs, CookieScopeArgs, CookieSetArgs};
use crate::context::{AppContext, CliError, CliResult};
use crate::output::{render_cookie, render_cookies, render_message};

pub(crate) fn handle_cookie_list(ctx: &AppContext) -> CliResult<String> {
    render_cookies(&ctx.store.all(), ctx.output)
}

pub(crate) fn handle_cookie_get(ctx: &AppContext, args: &CookieGetArgs) -> CliResult<String> {
    let value = ctx
        .store
        .get(&args.name)
        .ok_or_else(|| CliError::validation(format!("cookie '{}' is not set", args.name)))?;
    render_cookie(&args.name, &value, ctx.output)
}

pub(crate) fn handle_cookie_set(ctx: &AppContext, args: CookieSetArgs) -> CliResult<String> {
    if args.name.is_empty() {
        return Err(CliError::validation("cookie name must not be empty"));
    }
    let options = CookieOptions {
        max_age: args.max_age,
        path: args.path,
        same_site: args.same_site.map(Into::into),
        domain: args.domain,
        secure: args.secure,
    };
    ctx.store.set(&args.name, &args.value, options)?;
    render_message(&format!("set cookie '{}'", args.name), ctx.output)
}

pub(crate) fn handle_cookie_delete(ctx: &AppContext, args: &CookieDeleteArgs) -> CliResult<String> {
    ctx.store.delete(
        &args.name,
        &args.scope.path,
        args.scope.domain.as_deref(),
    )?;
    render_message(&format!("deleted cookie '{}'", args.name), ctx.output)
}

pub(crate) fn handle_cookie_delete_all(
    ctx: &AppContext,
    args: &CookieScopeArgs,
) -> CliResult<String> {
    let count = ctx.store.delete_all(&args.path, args.domain.as_deref())?;
    render_message(&format!("deleted {count} cookie(s)"), ctx.output)
}
