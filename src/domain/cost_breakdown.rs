use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENERGY_COST: Regex = Regex::new(r"Energy: \$([0-9]+\.[0-9]+)").unwrap();
    static ref TIME_COST: Regex = Regex::new(r"Time \(Charging\): \$([0-9]+\.[0-9]+)").unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub energy_cost: f64,
    pub time_cost: f64,
}

// Matches across the whole text; the breakdown block is not `Label: value` lines.
pub fn extract_cost_breakdown(raw: &str) -> CostBreakdown {
    CostBreakdown {
        energy_cost: first_amount(&ENERGY_COST, raw).unwrap_or(0.0),
        time_cost: first_amount(&TIME_COST, raw).unwrap_or(0.0),
    }
}

fn first_amount(pattern: &Regex, raw: &str) -> Option<f64> {
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|amount| amount.as_str().parse::<f64>().ok())
}
