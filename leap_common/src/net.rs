//! Robot networking constants and address derivation.
use std::time::Duration;

use crate::error::BridgeError;

/// TCP port the robot firmware listens on.
pub const ROBOT_PORT: u16 = 9090;
/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 2.0;
/// Highest agent id on the robot network (inclusive).
pub const MAX_AGENT_ID: i64 = 19;

/// Prefix for agents 10..=19 (`192.168.50.1` + `15` = `192.168.50.115`).
const TWO_DIGIT_PREFIX: &str = "192.168.50.1";
/// Prefix for agents 0..=9 (`192.168.50.10` + `5` = `192.168.50.105`).
const ONE_DIGIT_PREFIX: &str = "192.168.50.10";

/// Derive the robot IP for `agent_id` by appending the id to a fixed prefix.
///
/// The result is built by string concatenation, not address arithmetic.
pub fn agent_address(agent_id: i64) -> Result<String, BridgeError> {
    if !(0..=MAX_AGENT_ID).contains(&agent_id) {
        return Err(BridgeError::InvalidArgument(format!(
            "Invalid agent ID {}. Allowed IDs: 0-{}.",
            agent_id, MAX_AGENT_ID
        )));
    }
    let prefix = if agent_id > 9 {
        TWO_DIGIT_PREFIX
    } else {
        ONE_DIGIT_PREFIX
    };
    Ok(format!("{}{}", prefix, agent_id))
}

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Convert a timeout in (possibly fractional) seconds into a `Duration`.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, BridgeError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "Connect timeout must be a positive number of seconds, got {}",
            secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_every_agent_address() {
        for n in 0..=MAX_AGENT_ID {
            let expected = if n > 9 {
                format!("192.168.50.1{}", n)
            } else {
                format!("192.168.50.10{}", n)
            };
            assert_eq!(agent_address(n).unwrap(), expected);
        }
    }

    #[test]
    fn derives_boundary_addresses() {
        assert_eq!(agent_address(0).unwrap(), "192.168.50.100");
        assert_eq!(agent_address(9).unwrap(), "192.168.50.109");
        assert_eq!(agent_address(10).unwrap(), "192.168.50.110");
        assert_eq!(agent_address(15).unwrap(), "192.168.50.115");
        assert_eq!(agent_address(19).unwrap(), "192.168.50.119");
    }

    #[test]
    fn rejects_out_of_range_agents() {
        for n in [-1, 20, 100, i64::MIN, i64::MAX] {
            assert!(matches!(
                agent_address(n),
                Err(BridgeError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn rejects_non_positive_timeouts() {
        assert!(timeout_from_secs(0.0).is_err());
        assert!(timeout_from_secs(-1.0).is_err());
        assert!(timeout_from_secs(f64::NAN).is_err());
        assert_eq!(
            timeout_from_secs(DEFAULT_CONNECT_TIMEOUT_SECS).unwrap(),
            Duration::from_secs(2)
        );
    }
}
