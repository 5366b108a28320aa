//! Refine task
//!
//! Tags read by the RFID reader are either landmarks, which are used to correct the pose
//! estimate, or victims. Victims are checked against the table of known victim positions to
//! measure how accurate the robot's localisation was when it found them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::proto::VictimReport;
use log::{info, trace, warn};
use std::collections::HashSet;

use crate::{
    data_store::{DataStore, FoundVictim},
    sched::Task,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Surveyed position of every victim in the arena, `(x_mm, y_mm, tag_id)`.
pub const KNOWN_VICTIMS: [(i32, i32, &str); 24] = [
    (340, 340, "020058F5BD"),
    (975, 1115, "020053A537"),
    (1845, 925, "020053E0BA"),
    (2670, 355, "01004B835E"),
    (3395, 870, "020053C80E"),
    (4645, 910, "020058100D"),
    (4800, 250, "0200580B96"),
    (5395, 1060, "02005345B6"),
    (5830, 1895, "020058F121"),
    (5110, 2390, "0200581B9E"),
    (5770, 3790, "020058066F"),
    (4500, 3190, "020058212D"),
    (4315, 3200, "020058022D"),
    (4150, 1810, "0200581542"),
    (3720, 3710, "0200534E5C"),
    (2580, 3770, "020053AB2C"),
    (2970, 2805, "01004A11E8"),
    (3030, 2070, "020053E282"),
    (3120, 1965, "0200553505"),
    (2880, 1840, "01004751A2"),
    (1890, 2580, "02005097C0"),
    (985, 3020, "020053BF78"),
    (730, 3175, "020056D0EF"),
    (320, 1800, "01004BDF7B"),
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct RefineTask {
    enabled: bool,

    /// Tags placed in the arena as landmarks
    landmark_tags: HashSet<String>,

    /// Victims this robot has already found
    found: HashSet<String>,
}

/// Result of checking a victim against the known victims.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Accuracy {
    Exact,

    /// Position differs from the surveyed one by the given distance
    ///
    /// Units: millimeters
    Offset(f64),

    /// Tag is not a known victim
    Unknown,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RefineTask {
    pub fn new<I: IntoIterator<Item = String>>(enabled: bool, landmark_tags: I) -> Self {
        Self {
            enabled,
            landmark_tags: landmark_tags.into_iter().collect(),
            found: HashSet::new(),
        }
    }
}

impl Task for RefineTask {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        while let Some(tag) = ds.tag_inbox.pop_front() {
            if self.landmark_tags.contains(&tag) {
                trace!("Landmark {} read", tag);
                continue;
            }

            if !self.found.insert(tag.clone()) {
                continue;
            }

            let victim = VictimReport {
                x_mm: ds.robot_pose.x_mm,
                y_mm: ds.robot_pose.y_mm,
                tag_id: tag,
            };

            info!("Victim {} found at ({}, {})", victim.tag_id, victim.x_mm, victim.y_mm);

            match check_accuracy(&victim) {
                Accuracy::Exact => ds.stats.record_victim(true, None),
                Accuracy::Offset(o) => {
                    warn!("Victim {} position is {:.1} mm out", victim.tag_id, o);
                    ds.stats.record_victim(false, Some(o));
                }
                Accuracy::Unknown => {
                    warn!("Victim {} is not a known victim", victim.tag_id);
                    ds.stats.record_victim(false, None);
                }
            }

            ds.refined_victims.push_back(FoundVictim {
                report: victim,
                found_at: ds.now,
            });
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_accuracy(victim: &VictimReport) -> Accuracy {
    match KNOWN_VICTIMS.iter().find(|(_, _, id)| *id == victim.tag_id) {
        Some((x, y, _)) if *x == victim.x_mm && *y == victim.y_mm => Accuracy::Exact,
        Some((x, y, _)) => {
            let dx = (victim.x_mm - x) as f64;
            let dy = (victim.y_mm - y) as f64;
            Accuracy::Offset(dx.hypot(dy))
        }
        None => Accuracy::Unknown,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_refine() {
        let mut task = RefineTask::new(true, vec!["LANDMARK0".to_string()]);
        let mut ds = DataStore::default();

        ds.now = Duration::from_millis(40);
        ds.robot_pose.x_mm = 340;
        ds.robot_pose.y_mm = 340;
        ds.tag_inbox.push_back("LANDMARK0".into());
        ds.tag_inbox.push_back("020058F5BD".into());
        ds.tag_inbox.push_back("020058F5BD".into());
        task.execute(&mut ds);

        ds.now = Duration::from_millis(90);
        ds.robot_pose.x_mm = 978;
        ds.robot_pose.y_mm = 1119;
        ds.tag_inbox.push_back("020053A537".into());
        ds.tag_inbox.push_back("FFFFFFFFFF".into());
        task.execute(&mut ds);

        let snap = ds.stats.snapshot();
        assert_eq!(snap.total_victims, 3);
        assert_eq!(snap.inaccurate_victims, 2);
        assert_eq!(snap.avg_victim_offset_mm, Some(5.0));
        let found_at: Vec<Duration> = ds.refined_victims.iter().map(|v| v.found_at).collect();
        assert_eq!(
            found_at,
            vec![
                Duration::from_millis(40),
                Duration::from_millis(90),
                Duration::from_millis(90)
            ]
        );
    }

    #[test]
    fn test_check_accuracy() {
        let mut victim = VictimReport {
            x_mm: 320,
            y_mm: 1800,
            tag_id: "01004BDF7B".into(),
        };
        assert_eq!(check_accuracy(&victim), Accuracy::Exact);

        victim.y_mm = 1790;
        assert_eq!(check_accuracy(&victim), Accuracy::Offset(10.0));

        victim.tag_id = "0".into();
        assert_eq!(check_accuracy(&victim), Accuracy::Unknown);
    }
}
