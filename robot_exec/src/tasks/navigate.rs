//! Navigate task

use log::trace;
use std::collections::HashMap;

use crate::{
    data_store::{DataStore, MotionDemand},
    sched::Task,
};

/// Keeps the fleet's pheromone map and sets the motion demand.
pub struct NavigateTask {
    enabled: bool,

    /// Pheromone intensities of each sector, by sector ID
    pheromone_map: HashMap<u32, Vec<u8>>,

    /// Units: millimeters/second
    cruise_speed_mm_s: i32,

    /// The pose is queued for sending once every this many invocations
    pose_period: u32,

    invocations: u32,
}

impl NavigateTask {
    pub fn new(enabled: bool, cruise_speed_mm_s: i32, pose_period: u32) -> Self {
        Self {
            enabled,
            pheromone_map: HashMap::new(),
            cruise_speed_mm_s,
            pose_period: pose_period.max(1),
            invocations: 0,
        }
    }

    pub fn sector(&self, sector_id: u32) -> Option<&[u8]> {
        self.pheromone_map.get(&sector_id).map(|s| s.as_slice())
    }
}

impl Task for NavigateTask {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        while let Some(sector) = ds.navigate_inbox.pop_front() {
            trace!("Pheromone sector {} updated", sector.sector_id);
            self.pheromone_map.insert(sector.sector_id, sector.intensities);
        }

        ds.motion_dem = if ds.go_ahead && !ds.mission_stopped {
            MotionDemand {
                speed_mm_s: self.cruise_speed_mm_s,
                turn_rate_mrad_s: 0,
            }
        } else {
            MotionDemand::default()
        };

        if self.invocations % self.pose_period == 0 {
            ds.outbound.push_pose(ds.robot_pose);
        }
        self.invocations = self.invocations.wrapping_add(1);
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comms::TrafficClass;
    use comms_if::proto::PheromoneSector;

    #[test]
    fn test_navigate() {
        let mut task = NavigateTask::new(true, 200, 5);
        let mut ds = DataStore::default();

        ds.navigate_inbox.push_back(PheromoneSector {
            sector_id: 4,
            intensities: vec![1, 2],
        });
        ds.navigate_inbox.push_back(PheromoneSector {
            sector_id: 4,
            intensities: vec![3, 4],
        });

        task.execute(&mut ds);

        assert_eq!(task.sector(4), Some(&[3u8, 4][..]));
        assert_eq!(ds.motion_dem, MotionDemand::default());

        ds.go_ahead = true;
        for _ in 0..9 {
            task.execute(&mut ds);
        }

        assert_eq!(ds.motion_dem.speed_mm_s, 200);
        assert_eq!(ds.outbound.count(TrafficClass::Robot), 2);
    }
}
