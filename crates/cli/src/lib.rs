//! Layoutcheck CLI
//!
//! Command-line interface for running layout checks against a served or
//! already running site across viewports.

pub mod builtin;
pub mod commands;
pub mod output;

/// Process exit status for a command result: 0 when clean, 1 when any
/// report has violations, 2 when the command failed
pub fn exit_status(result: &anyhow::Result<bool>) -> u8 {
    match result {
        Ok(false) => 0,
        Ok(true) => 1,
        Err(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(false)), 0);
        assert_eq!(exit_status(&Ok(true)), 1);
        assert_eq!(exit_status(&Err(anyhow::anyhow!("Playwright not found"))), 2);
    }
}
