use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::quests::types::{QuestRecord, QuestStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraderSummary {
    pub total: usize,
    pub done: usize,
}

/// Aggregate progress over the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub by_status: BTreeMap<QuestStatus, usize>,
    pub by_trader: BTreeMap<String, TraderSummary>,
    pub kappa_total: usize,
    pub kappa_done: usize,
}

impl ProgressSummary {
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = (&'a QuestRecord, QuestStatus)>,
    {
        let mut summary = Self::default();
        for (record, status) in statuses {
            summary.total += 1;
            *summary.by_status.entry(status).or_default() += 1;
            let done = status == QuestStatus::Done;
            if let Some(trader) = record.trader.as_deref().filter(|t| !t.is_empty()) {
                let entry = summary.by_trader.entry(trader.to_string()).or_default();
                entry.total += 1;
                entry.done += usize::from(done);
            }
            if record.kappa_required {
                summary.kappa_total += 1;
                summary.kappa_done += usize::from(done);
            }
        }
        summary
    }

    pub fn count(&self, status: QuestStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

impl fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quests: {}", self.total)?;
        for status in QuestStatus::ALL {
            writeln!(f, "  {:<13}{}", status.label(), self.count(status))?;
        }
        if self.kappa_total > 0 {
            writeln!(f, "Kappa: {}/{}", self.kappa_done, self.kappa_total)?;
        }
        for (trader, counts) in &self.by_trader {
            writeln!(f, "  {:<13}{}/{}", trader, counts.done, counts.total)?;
        }
        Ok(())
    }
}
