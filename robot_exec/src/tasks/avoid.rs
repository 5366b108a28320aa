//! Avoid task

use log::info;

use crate::{data_store::DataStore, sched::Task};

/// Raises the obstacle flag while anything is closer than the threshold.
pub struct AvoidTask {
    enabled: bool,

    /// Units: millimeters
    threshold_mm: u32,
}

impl AvoidTask {
    pub fn new(enabled: bool, threshold_mm: u32) -> Self {
        Self {
            enabled,
            threshold_mm,
        }
    }
}

impl Task for AvoidTask {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        // Without new readings the flag keeps its last value
        let closest = match ds.range_inbox.drain(..).min() {
            Some(r) => r,
            None => return,
        };

        let obstacle = closest < self.threshold_mm;

        if obstacle != ds.obstacle_detected {
            if obstacle {
                info!("Obstacle detected at {} mm", closest);
            } else {
                info!("Obstacle cleared");
            }
        }

        ds.obstacle_detected = obstacle;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_obstacle_flag() {
        let mut task = AvoidTask::new(true, 300);
        let mut ds = DataStore::default();

        ds.range_inbox.extend(&[800, 250, 1200]);
        task.execute(&mut ds);
        assert!(ds.obstacle_detected);
        assert!(ds.range_inbox.is_empty());

        task.execute(&mut ds);
        assert!(ds.obstacle_detected);

        ds.range_inbox.push_back(300);
        task.execute(&mut ds);
        assert!(!ds.obstacle_detected);
    }
}
