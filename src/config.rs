//! Pipeline configuration. A plain record constructed by the caller and
//! passed by reference, no global or static configuration lives in this
//! crate, following the `ValidatorConfig` pattern.

/// Every tunable threshold the pipeline reads, grouped as one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_transactions: usize,

    pub cycle_min_len: usize,
    pub cycle_max_len: usize,
    pub cycle_time_span_hours: f64,
    pub cycle_amount_ratio: f64,

    pub smurf_min_counterparties: usize,
    pub smurf_window_hours: f64,

    pub shell_min_len: usize,
    pub shell_max_len: usize,
    pub shell_intermediate_degree_min: usize,
    pub shell_intermediate_degree_max: usize,
    pub shell_amount_ratio: f64,
    pub shell_min_amount: f64,
    pub shell_time_span_hours: f64,

    pub density_threshold: f64,
    pub flag_threshold: u8,

    pub high_velocity_window_hours: f64,
    pub high_velocity_min_transactions: usize,

    pub cycle_time_slack_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,

            cycle_min_len: 3,
            cycle_max_len: 5,
            cycle_time_span_hours: 72.0,
            cycle_amount_ratio: 1.25,

            smurf_min_counterparties: 10,
            smurf_window_hours: 72.0,

            shell_min_len: 3,
            shell_max_len: 8,
            shell_intermediate_degree_min: 2,
            shell_intermediate_degree_max: 3,
            shell_amount_ratio: 3.0,
            shell_min_amount: 100.0,
            shell_time_span_hours: 72.0,

            density_threshold: 0.30,
            flag_threshold: 25,

            high_velocity_window_hours: 24.0,
            high_velocity_min_transactions: 5,

            cycle_time_slack_minutes: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.max_transactions, 10_000);
        assert_eq!(cfg.cycle_min_len, 3);
        assert_eq!(cfg.cycle_max_len, 5);
        assert_eq!(cfg.cycle_amount_ratio, 1.25);
        assert_eq!(cfg.smurf_min_counterparties, 10);
        assert_eq!(cfg.shell_max_len, 8);
        assert_eq!(cfg.shell_amount_ratio, 3.0);
        assert_eq!(cfg.shell_min_amount, 100.0);
        assert_eq!(cfg.density_threshold, 0.30);
        assert_eq!(cfg.flag_threshold, 25);
        assert_eq!(cfg.high_velocity_window_hours, 24.0);
        assert_eq!(cfg.high_velocity_min_transactions, 5);
    }
}
