//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts and CI a way to distinguish a rejected
//! code from an unreachable backend or a misconfigured environment.

#![allow(dead_code)] // Constants may be used in future or for documentation

use stepup_core::StepUpError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// The backend rejected the verification.
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Backend unreachable or timing out.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// Local trust-store I/O failure.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Primary identity token was not accepted.
/// Maps to EX_NOPERM from sysexits.h.
pub const UNAUTHORIZED: i32 = 77;

/// Missing or invalid configuration (e.g. STEPUP_API_URL).
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = match err.downcast_ref::<StepUpError>() {
            Some(StepUpError::Config(_)) => CONFIG_ERROR,
            Some(StepUpError::Http(_)) => NETWORK_ERROR,
            Some(StepUpError::Rejected { .. }) => VERIFICATION_FAILED,
            Some(StepUpError::Unauthorized) => UNAUTHORIZED,
            Some(StepUpError::Storage(_)) => IO_ERROR,
            Some(StepUpError::Api(_)) => GENERAL_ERROR,
            // Not a backend error: classify by the rendered chain.
            None => {
                let message = format!("{err:#}");
                if message.contains("environment variable") || message.contains("configuration") {
                    CONFIG_ERROR
                } else {
                    GENERAL_ERROR
                }
            }
        };

        Self {
            code,
            message: Some(format!("{err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_sysexits() {
        let cases = [
            (StepUpError::Config("missing".into()), CONFIG_ERROR),
            (
                StepUpError::Rejected {
                    detail: "bad code".into(),
                },
                VERIFICATION_FAILED,
            ),
            (StepUpError::Unauthorized, UNAUTHORIZED),
            (StepUpError::Storage("disk".into()), IO_ERROR),
            (StepUpError::Api("odd shape".into()), GENERAL_ERROR),
        ];

        for (err, expected) in cases {
            let exit = ExitCode::from_anyhow(&anyhow::Error::new(err));
            assert_eq!(exit.code, expected);
        }
    }

    #[test]
    fn test_plain_anyhow_error_is_general() {
        let exit = ExitCode::from_anyhow(&anyhow::anyhow!("something else"));
        assert_eq!(exit.code, GENERAL_ERROR);
    }
}
