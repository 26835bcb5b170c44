use crate::core::types::{Condition, Market};

/// Deterministic prompt for one subject. Prices are presented on the 0-100
/// percentage scale the oracle is instructed to answer in.
pub fn build_prompt(market: &Market, condition: Option<&Condition>) -> String {
    let volume = market
        .volume
        .map(|v| format!("{v:.0}"))
        .unwrap_or_else(|| "unknown".to_string());
    let closes = market
        .close_date
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());

    let mut prompt = format!(
        "You are a prediction-market analyst. Estimate the probability that the following market resolves YES.

Market: \"{}\"
Platform: {}
Current YES price: {:.1}%
Current NO price: {:.1}%
Volume: {}
Closes: {}
",
        market.title,
        market.platform,
        market.yes_price * 100.0,
        market.no_price * 100.0,
        volume,
        closes,
    );

    if let Some(condition) = condition {
        prompt.push_str(&format!(
            "Internal proposition under review: \"{}\" (resolves by {})\n",
            condition.question,
            condition.end_time.to_rfc3339(),
        ));
    }

    prompt.push_str(
        "
Respond with a single JSON object and nothing else, with fields:
- \"probability\": probability the market resolves YES, 0-100
- \"confidence\": how confident you are in that estimate, 0-100
- \"reasoning\": a concise summary of your analysis
- \"fair_value\": the price (0-100) you consider fair for the YES side
- \"edge\": fair_value minus the current YES price, in percentage points
- \"recommendation\": \"BUY_YES\", \"BUY_NO\" or \"SKIP\"

Decision rules: recommend BUY_YES only when edge > 5 percentage points and confidence > 65. Recommend BUY_NO only when edge < -5 percentage points and confidence > 65. Otherwise recommend SKIP.",
    );

    prompt
}
