// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message
/// patterns across the engine.

// ============================================================================
// Gateway Operation Logging Macros
// ============================================================================

/// Log the start of a generation request with consistent fields
#[macro_export]
macro_rules! log_generation_start {
    ($kind:expr, mode = $mode:expr, count = $count:expr) => {
        tracing::info!(
            component = "provider_gateway",
            kind = ?$kind,
            mode = ?$mode,
            requested_count = $count,
            "Generation request started"
        );
    };
}

/// Log completion of a generation request
#[macro_export]
macro_rules! log_generation_done {
    ($kind:expr, source = $source:expr, count = $count:expr) => {
        tracing::info!(
            component = "provider_gateway",
            kind = ?$kind,
            source = $source,
            item_count = $count,
            "Generation request completed"
        );
    };
}

/// Log a classified provider failure and the fallback taken
#[macro_export]
macro_rules! log_provider_fallback {
    ($error:expr, fallback = $fallback:expr) => {
        tracing::warn!(
            component = "provider_gateway",
            error_kind = $error.kind(),
            error = %$error,
            can_retry = $error.can_retry(),
            fallback = $fallback,
            "Provider call failed, degrading"
        );
    };
}

// ============================================================================
// Quota Logging Macros
// ============================================================================

/// Log quota window resets and gate decisions
#[macro_export]
macro_rules! log_quota_event {
    (reset, window = $window:expr, date = $date:expr) => {
        tracing::info!(
            component = "quota_manager",
            window = $window,
            reset_date = %$date,
            "Quota window reset"
        );
    };
    (denied, $reason:expr) => {
        tracing::warn!(
            component = "quota_manager",
            reason = %$reason,
            "Quota check denied provider call"
        );
    };
    (increment, daily_used = $daily:expr, monthly_used = $monthly:expr) => {
        tracing::debug!(
            component = "quota_manager",
            daily_used = $daily,
            monthly_used = $monthly,
            "Usage counters incremented"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log startup/configuration events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
    (mode_switch, from = $from:expr, to = $to:expr) => {
        tracing::info!(
            event_type = "mode_switch",
            from = ?$from,
            to = ?$to,
            "Service mode changed"
        );
    };
}

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}
