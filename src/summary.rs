// ABOUTME: Structured per-table run outcomes shared by export and import
// ABOUTME: Lets callers detect a degraded run programmatically instead of scraping logs

/// What happened to one table during a run
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    /// Table exported or loaded fully
    Completed { rows: u64 },
    /// Table deliberately left out (empty source table, schema drift left no columns)
    Skipped { reason: String },
    /// Table could not be processed
    Failed { error: String },
}

/// Aggregated result of one export or import run
#[derive(Debug, Default)]
pub struct RunSummary {
    outcomes: Vec<(String, TableOutcome)>,
    warnings: Vec<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &str, outcome: TableOutcome) {
        self.outcomes.push((table.to_string(), outcome));
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn outcomes(&self) -> &[(String, TableOutcome)] {
        &self.outcomes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn total_rows(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                TableOutcome::Completed { rows } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn completed_tables(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TableOutcome::Completed { .. }))
            .count()
    }

    /// True when any table was skipped or failed, or any warning was raised
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
            || self
                .outcomes
                .iter()
                .any(|(_, o)| !matches!(o, TableOutcome::Completed { .. }))
    }

    /// Emit the summary through tracing, one line per table
    pub fn log(&self, label: &str) {
        tracing::info!(
            "{} summary: {} tables completed, {} rows total",
            label,
            self.completed_tables(),
            self.total_rows()
        );
        for (table, outcome) in &self.outcomes {
            match outcome {
                TableOutcome::Completed { rows } => {
                    tracing::info!("  {} - {} rows", table, rows);
                }
                TableOutcome::Skipped { reason } => {
                    tracing::warn!("  {} - skipped: {}", table, reason);
                }
                TableOutcome::Failed { error } => {
                    tracing::error!("  {} - failed: {}", table, error);
                }
            }
        }
        for warning in &self.warnings {
            tracing::warn!("  warning: {}", warning);
        }
    }
}
