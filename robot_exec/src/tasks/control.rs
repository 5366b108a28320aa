//! Control task

use log::debug;
use std::time::Duration;

use crate::{
    data_store::{DataStore, MotionDemand},
    sched::Task,
};

/// Applies the motion demand to the drive, stopping while an obstacle is detected.
///
/// The pose estimate is dead-reckoned from the motion applied since the previous run.
pub struct ControlTask {
    enabled: bool,
    last_run: Option<Duration>,
}

impl ControlTask {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_run: None,
        }
    }

    fn dead_reckon(&self, ds: &mut DataStore) {
        let dt_s = match self.last_run {
            Some(t) if ds.now > t => (ds.now - t).as_secs_f64(),
            _ => return,
        };

        let pose = &mut ds.robot_pose;
        let dist_mm = ds.motion_applied.speed_mm_s as f64 * dt_s;

        pose.heading_rad += ds.motion_applied.turn_rate_mrad_s as f64 * 1e-3 * dt_s;
        pose.x_mm += (dist_mm * pose.heading_rad.cos()).round() as i32;
        pose.y_mm += (dist_mm * pose.heading_rad.sin()).round() as i32;
    }
}

impl Task for ControlTask {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        self.dead_reckon(ds);
        self.last_run = Some(ds.now);

        let dem = if ds.obstacle_detected {
            MotionDemand::default()
        } else {
            ds.motion_dem
        };

        if dem != ds.motion_applied {
            debug!("Applying motion demand {:?}", dem);
        }

        ds.motion_applied = dem;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_obstacle_stops_drive() {
        let mut task = ControlTask::new(true);
        let mut ds = DataStore::default();

        ds.motion_dem = MotionDemand {
            speed_mm_s: 150,
            turn_rate_mrad_s: 10,
        };

        task.execute(&mut ds);
        assert_eq!(ds.motion_applied, ds.motion_dem);

        ds.obstacle_detected = true;
        task.execute(&mut ds);
        assert_eq!(ds.motion_applied, MotionDemand::default());
    }

    #[test]
    fn test_pose_follows_applied_motion() {
        let mut task = ControlTask::new(true);
        let mut ds = DataStore::default();

        ds.motion_dem = MotionDemand {
            speed_mm_s: 200,
            turn_rate_mrad_s: 0,
        };

        // First run has no previous time to integrate from
        ds.now = Duration::from_millis(100);
        task.execute(&mut ds);
        assert_eq!((ds.robot_pose.x_mm, ds.robot_pose.y_mm), (0, 0));

        ds.now = Duration::from_millis(600);
        task.execute(&mut ds);
        assert_eq!((ds.robot_pose.x_mm, ds.robot_pose.y_mm), (100, 0));

        // Stopped by the obstacle, the next run still integrates the motion applied before it
        ds.obstacle_detected = true;
        ds.now = Duration::from_millis(1100);
        task.execute(&mut ds);
        assert_eq!(ds.robot_pose.x_mm, 200);

        ds.now = Duration::from_millis(1600);
        task.execute(&mut ds);
        assert_eq!(ds.robot_pose.x_mm, 200);
    }
}
