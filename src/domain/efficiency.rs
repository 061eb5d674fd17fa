use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EfficiencyTotals {
    pub start_mileage: Option<i64>,
    pub end_mileage: Option<i64>,
    pub total_cost: f64,
    pub total_energy_kwh: f64,
    pub total_sessions: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EfficiencyMetrics {
    pub start_mileage: i64,
    pub end_mileage: i64,
    pub total_miles: i64,
    pub total_cost: f64,
    pub total_energy_kwh: f64,
    pub total_sessions: i64,
    pub cost_per_mile: f64,
    pub kwh_per_100_miles: f64,
    pub miles_per_100_kwh: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: i64,
    pub total_cost: f64,
    pub total_energy: f64,
    pub avg_cost_per_kwh: f64,
}

pub fn compute_efficiency(totals: &EfficiencyTotals) -> EfficiencyMetrics {
    let start_mileage = totals.start_mileage.unwrap_or(0);
    let end_mileage = totals.end_mileage.unwrap_or(0);
    let total_miles = (end_mileage - start_mileage).max(0);
    let miles = total_miles as f64;

    let cost_per_mile = if total_miles > 0 {
        round_to(totals.total_cost / miles, 4)
    } else {
        0.0
    };
    let kwh_per_100_miles = if total_miles > 0 {
        round_to(totals.total_energy_kwh / miles * 100.0, 2)
    } else {
        0.0
    };
    let miles_per_100_kwh = if totals.total_energy_kwh > 0.0 {
        round_to(miles / totals.total_energy_kwh * 100.0, 2)
    } else {
        0.0
    };

    EfficiencyMetrics {
        start_mileage,
        end_mileage,
        total_miles,
        total_cost: totals.total_cost,
        total_energy_kwh: totals.total_energy_kwh,
        total_sessions: totals.total_sessions,
        cost_per_mile,
        kwh_per_100_miles,
        miles_per_100_kwh,
    }
}

pub fn summarize_sessions(totals: &EfficiencyTotals) -> SessionStats {
    SessionStats {
        total_sessions: totals.total_sessions,
        total_cost: totals.total_cost,
        total_energy: totals.total_energy_kwh,
        avg_cost_per_kwh: if totals.total_energy_kwh > 0.0 {
            totals.total_cost / totals.total_energy_kwh
        } else {
            0.0
        },
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
