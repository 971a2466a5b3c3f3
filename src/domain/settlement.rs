use crate::error::{OrderFlowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment channel chosen by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    CashOnDelivery,
    OrangeMoney,
    MtnMobileMoney,
}

impl SettlementMethod {
    pub const ALL: [SettlementMethod; 3] = [
        SettlementMethod::CashOnDelivery,
        SettlementMethod::OrangeMoney,
        SettlementMethod::MtnMobileMoney,
    ];

    /// Mobile-money methods need a wallet number before checkout.
    pub fn requires_phone(&self) -> bool {
        !matches!(self, SettlementMethod::CashOnDelivery)
    }

    /// Short code used in button ids (`pay:<code>`).
    pub fn code(&self) -> &'static str {
        match self {
            SettlementMethod::CashOnDelivery => "cash",
            SettlementMethod::OrangeMoney => "orange",
            SettlementMethod::MtnMobileMoney => "mtn",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettlementMethod::CashOnDelivery => "Espèces",
            SettlementMethod::OrangeMoney => "Orange Money",
            SettlementMethod::MtnMobileMoney => "MTN MoMo",
        }
    }
}

impl FromStr for SettlementMethod {
    type Err = OrderFlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cash" => Ok(SettlementMethod::CashOnDelivery),
            "orange" => Ok(SettlementMethod::OrangeMoney),
            "mtn" => Ok(SettlementMethod::MtnMobileMoney),
            other => Err(OrderFlowError::ValidationError(format!(
                "Unknown settlement method: {other}"
            ))),
        }
    }
}

impl fmt::Display for SettlementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numbering plan accepted by the mobile-money networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneRules {
    pub country_code: String,
    pub local_digits: usize,
    pub local_prefixes: Vec<String>,
}

impl Default for PhoneRules {
    fn default() -> Self {
        Self {
            country_code: "224".to_string(),
            local_digits: 9,
            local_prefixes: vec!["6".to_string()],
        }
    }
}

impl PhoneRules {
    /// Validates a wallet number and returns it in international form
    /// without the leading `+` (e.g. `224622000111`).
    ///
    /// Accepts spaces, dots and dashes as separators, and an optional
    /// `+`/`00` international prefix.
    pub fn normalize(&self, raw: &str) -> Result<String> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
            .collect();

        let digits = compact
            .strip_prefix('+')
            .or_else(|| compact.strip_prefix("00"))
            .unwrap_or(&compact);

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(OrderFlowError::ValidationError(format!(
                "Phone number contains invalid characters: {raw}"
            )));
        }

        let local = if digits.len() == self.country_code.len() + self.local_digits {
            digits.strip_prefix(self.country_code.as_str()).ok_or_else(|| {
                OrderFlowError::ValidationError(format!("Unexpected country code: {raw}"))
            })?
        } else {
            digits
        };

        if local.len() != self.local_digits {
            return Err(OrderFlowError::ValidationError(format!(
                "Phone number must have {} digits: {raw}",
                self.local_digits
            )));
        }

        if !self.local_prefixes.is_empty()
            && !self.local_prefixes.iter().any(|p| local.starts_with(p.as_str()))
        {
            return Err(OrderFlowError::ValidationError(format!(
                "Phone number is not on a mobile network: {raw}"
            )));
        }

        Ok(format!("{}{}", self.country_code, local))
    }
}
