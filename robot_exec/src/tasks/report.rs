//! Report task

use crate::{data_store::DataStore, sched::Task};

/// Queues victims found by refine for sending to the fleet.
pub struct ReportTask {
    enabled: bool,
}

impl ReportTask {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Task for ReportTask {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        while let Some(victim) = ds.refined_victims.pop_front() {
            ds.outbound.push_victim(victim.report, victim.found_at);
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{comms::TrafficClass, data_store::FoundVictim};
    use comms_if::proto::VictimReport;
    use std::time::Duration;

    #[test]
    fn test_report_queues_victims() {
        let mut task = ReportTask::new(true);
        let mut ds = DataStore::default();

        for i in 0..3 {
            ds.refined_victims.push_back(FoundVictim {
                report: VictimReport {
                    x_mm: i,
                    y_mm: i,
                    tag_id: i.to_string(),
                },
                found_at: Duration::from_millis(10 * i as u64),
            });
        }

        task.execute(&mut ds);

        assert!(ds.refined_victims.is_empty());
        assert_eq!(ds.outbound.count(TrafficClass::Victim), 3);

        // Find times travel with the victims
        let first = ds.outbound.pop_front(TrafficClass::Victim).unwrap();
        assert_eq!(first.found_at, Some(Duration::from_millis(0)));
    }
}
