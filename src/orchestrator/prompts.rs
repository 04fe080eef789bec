// Prompt templates for family coordination

use serde::{Deserialize, Serialize};

use crate::ollama::truncate_chars;

/// Market data handed to the family. Unknown fields are carried through to
/// the prompt untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_24h: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Characters of earlier answers quoted in Claudae's review prompt
const REVIEW_QUOTE_CHARS: usize = 300;

pub fn nyala_analysis(market: &MarketSnapshot) -> String {
    format!(
        "As NYALA, the Trading Engine, analyze this market data:\n{}\n\n\
         Provide:\n\
         1. Trade recommendation (BUY/SELL/HOLD)\n\
         2. Confidence level (0-100%)\n\
         3. Technical reasoning\n\
         4. Target entry/exit points",
        market.to_pretty_json()
    )
}

pub fn deon_risk_review(nyala_response: &str) -> String {
    format!(
        "As DEON, the Risk Grader, evaluate NYALA's recommendation:\n{}\n\n\
         Provide:\n\
         1. Risk score (0-100, lower is safer)\n\
         2. Position size recommendation\n\
         3. Stop loss level\n\
         4. Approval (YES/NO) with reasoning",
        nyala_response
    )
}

pub fn claudae_oversight(nyala_response: &str, deon_response: &str) -> String {
    format!(
        "As CLAUDAE, the System Guardian, review the family decision:\n\n\
         NYALA's Analysis: {}...\n\
         DEON's Risk Assessment: {}...\n\n\
         Provide final execution decision and any system alerts.",
        truncate_chars(nyala_response, REVIEW_QUOTE_CHARS),
        truncate_chars(deon_response, REVIEW_QUOTE_CHARS)
    )
}

pub fn quick_trade(market: &MarketSnapshot) -> String {
    format!(
        "QUICK: BUY/SELL/HOLD for {} at ${}? (10 words max)",
        market.symbol, market.price
    )
}

pub fn quick_risk(market: &MarketSnapshot) -> String {
    format!("Risk level LOW/MEDIUM/HIGH for {}? (5 words max)", market.symbol)
}

pub fn guardian_status() -> &'static str {
    "Hello CLAUDAE! You are the system guardian for HONEY DUO WEALTH, \
     protecting our family's financial future. Please provide a brief status report."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_extra_fields_round_trip_into_prompt() {
        let market: MarketSnapshot = serde_json::from_str(
            r#"{"symbol":"BTC-USD","price":95420.5,"change_24h":2.3,"rsi":45,"sentiment":"neutral"}"#,
        )
        .unwrap();
        assert_eq!(market.extra.len(), 2);
        let prompt = nyala_analysis(&market);
        assert!(prompt.contains("\"rsi\": 45"));
        assert!(prompt.contains("BTC-USD"));
    }

    #[test]
    fn test_oversight_truncates_quotes() {
        let long = "x".repeat(1000);
        let prompt = claudae_oversight(&long, "short");
        assert!(prompt.contains(&format!("{}...", "x".repeat(300))));
        assert!(!prompt.contains(&"x".repeat(301)));
    }

    #[test]
    fn test_quick_prompts() {
        let market = MarketSnapshot::new("ETH-USD", 2500.0);
        assert_eq!(
            quick_trade(&market),
            "QUICK: BUY/SELL/HOLD for ETH-USD at $2500? (10 words max)"
        );
        assert!(quick_risk(&market).starts_with("Risk level LOW/MEDIUM/HIGH for ETH-USD"));
    }
}
