//! Feature-specific logging macros and utilities
//!
//! Each component logs under its own target so levels can be tuned per
//! feature through `[logging.features]` or `PARTYSYNC_LOG_FEATURE_<NAME>`.

/// Feature categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFeature {
    Sync,
    Mutation,
    Status,
    Store,
    Session,
    Users,
}

impl LogFeature {
    pub const ALL: [LogFeature; 6] = [
        LogFeature::Sync,
        LogFeature::Mutation,
        LogFeature::Status,
        LogFeature::Store,
        LogFeature::Session,
        LogFeature::Users,
    ];

    /// Get the target string for this feature
    pub fn target(&self) -> &'static str {
        match self {
            LogFeature::Sync => "partysync::sync",
            LogFeature::Mutation => "partysync::mutation",
            LogFeature::Status => "partysync::status",
            LogFeature::Store => "partysync::store",
            LogFeature::Session => "partysync::session",
            LogFeature::Users => "partysync::users",
        }
    }

    /// Feature key as used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            LogFeature::Sync => "sync",
            LogFeature::Mutation => "mutation",
            LogFeature::Status => "status",
            LogFeature::Store => "store",
            LogFeature::Session => "session",
            LogFeature::Users => "users",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

// Synchronizer logging macros
#[macro_export]
macro_rules! log_sync_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "partysync::sync", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_sync_info {
    ($($arg:tt)*) => {
        log::info!(target: "partysync::sync", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_sync_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "partysync::sync", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_sync_error {
    ($($arg:tt)*) => {
        log::error!(target: "partysync::sync", $($arg)*)
    };
}

// Mutation logging macros
#[macro_export]
macro_rules! log_mutation_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "partysync::mutation", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_mutation_info {
    ($($arg:tt)*) => {
        log::info!(target: "partysync::mutation", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_mutation_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "partysync::mutation", $($arg)*)
    };
}

// Status and pause mirror logging macros
#[macro_export]
macro_rules! log_status_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "partysync::status", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_status_info {
    ($($arg:tt)*) => {
        log::info!(target: "partysync::status", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_status_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "partysync::status", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_status_error {
    ($($arg:tt)*) => {
        log::error!(target: "partysync::status", $($arg)*)
    };
}

// Store logging macros
#[macro_export]
macro_rules! log_store_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "partysync::store", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_store_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "partysync::store", $($arg)*)
    };
}

// Session logging macros
#[macro_export]
macro_rules! log_session_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "partysync::session", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_session_info {
    ($($arg:tt)*) => {
        log::info!(target: "partysync::session", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_session_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "partysync::session", $($arg)*)
    };
}

// User directory logging macros
#[macro_export]
macro_rules! log_users_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "partysync::users", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_users_info {
    ($($arg:tt)*) => {
        log::info!(target: "partysync::users", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_users_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "partysync::users", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_users_error {
    ($($arg:tt)*) => {
        log::error!(target: "partysync::users", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_round_trip() {
        for feature in LogFeature::ALL {
            assert_eq!(LogFeature::from_name(feature.name()), Some(feature));
            assert!(feature.target().ends_with(feature.name()));
        }
        assert_eq!(LogFeature::from_name("transform"), None);
    }
}
