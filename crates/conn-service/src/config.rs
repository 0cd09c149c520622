//! Service settings.

use conn_types::ConnectionError;

const DEFAULT_WEIGHT: f64 = 1.0;

/// Settings for [`crate::ConnectionService`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Weight given to every newly created connection. Must be finite and non-zero.
    pub weight: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
        }
    }
}

impl ServiceConfig {
    /// Read `CONN_WEIGHT`; falls back to the default when unset.
    pub fn from_env() -> Result<Self, ConnectionError> {
        match std::env::var("CONN_WEIGHT") {
            Ok(raw) => Self::parse_weight(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    fn parse_weight(raw: &str) -> Result<Self, ConnectionError> {
        let weight = raw.trim().parse::<f64>().map_err(|e| {
            ConnectionError::InvalidConfig(format!("CONN_WEIGHT {:?}: {}", raw, e))
        })?;
        let config = Self { weight };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.weight == 0.0 {
            return Err(ConnectionError::InvalidConfig(
                "weight must not be empty".to_string(),
            ));
        }
        if !self.weight.is_finite() {
            return Err(ConnectionError::InvalidConfig(format!(
                "weight must be finite, got {}",
                self.weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        ServiceConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_weight_accepts_numbers() {
        assert_eq!(ServiceConfig::parse_weight(" 0.5 ").unwrap().weight, 0.5);
        assert_eq!(ServiceConfig::parse_weight("-2").unwrap().weight, -2.0);
    }

    #[test]
    fn parse_weight_rejects_zero_and_garbage() {
        assert!(matches!(
            ServiceConfig::parse_weight("0"),
            Err(ConnectionError::InvalidConfig(_))
        ));
        assert!(matches!(
            ServiceConfig::parse_weight("heavy"),
            Err(ConnectionError::InvalidConfig(_))
        ));
        assert!(matches!(
            ServiceConfig::parse_weight("inf"),
            Err(ConnectionError::InvalidConfig(_))
        ));
    }
}
