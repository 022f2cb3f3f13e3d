//! ---
//! ens_section: "03-logging"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Structured ensemble lifecycle logging."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
/// Emit an informational log enriched with ensemble context.
#[macro_export]
macro_rules! ens_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::INFO,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with ensemble context.
#[macro_export]
macro_rules! ens_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::DEBUG,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning log enriched with ensemble context.
#[macro_export]
macro_rules! ens_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::WARN,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with ensemble context.
#[macro_export]
macro_rules! ens_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::ERROR,
            ensemble = ctx.ensemble.unwrap_or(""),
            kind = ctx.kind.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            stage = ctx.stage_str(),
            message = %format_args!($($arg)+)
        );
    }};
}
