//! Mission task

use comms_if::proto::{CommandKind, VictimReport};
use log::{debug, info};

use crate::{
    data_store::{DataStore, MissionInput},
    sched::Task,
};

/// Keeps track of the mission state from commands and victim reports received from the fleet.
pub struct MissionTask {
    enabled: bool,

    /// Victims reported by other robots
    known_victims: Vec<VictimReport>,
}

impl MissionTask {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            known_victims: Vec::new(),
        }
    }

    pub fn known_victims(&self) -> &[VictimReport] {
        &self.known_victims
    }
}

impl Task for MissionTask {
    fn execute(&mut self, ds: &mut DataStore) {
        if !self.enabled {
            return;
        }

        while let Some(input) = ds.mission_inbox.pop_front() {
            match input {
                MissionInput::Command(cmd) => match cmd.kind {
                    CommandKind::GoAhead => {
                        if !ds.go_ahead {
                            info!("Go-ahead received");
                        }
                        ds.go_ahead = true;
                    }
                    CommandKind::Stop => {
                        info!("Mission stopped");
                        ds.mission_stopped = true;
                    }
                    CommandKind::Resume => {
                        info!("Mission resumed");
                        ds.mission_stopped = false;
                    }
                },
                MissionInput::Victim(v) => {
                    if !self.known_victims.iter().any(|k| k.tag_id == v.tag_id) {
                        debug!("Fleet found victim {} at ({}, {})", v.tag_id, v.x_mm, v.y_mm);
                        self.known_victims.push(v);
                    }
                }
            }
        }
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::proto::Command;

    fn cmd(kind: CommandKind) -> MissionInput {
        MissionInput::Command(Command { kind })
    }

    #[test]
    fn test_mission_inputs() {
        let mut task = MissionTask::new(true);
        let mut ds = DataStore::default();

        let victim = VictimReport {
            x_mm: 340,
            y_mm: 340,
            tag_id: "020058F5BD".into(),
        };

        ds.mission_inbox.push_back(cmd(CommandKind::GoAhead));
        ds.mission_inbox.push_back(MissionInput::Victim(victim.clone()));
        ds.mission_inbox.push_back(MissionInput::Victim(victim.clone()));
        ds.mission_inbox.push_back(cmd(CommandKind::Stop));

        task.execute(&mut ds);

        assert!(ds.go_ahead);
        assert!(ds.mission_stopped);
        assert!(ds.mission_inbox.is_empty());
        assert_eq!(task.known_victims(), &[victim][..]);

        ds.mission_inbox.push_back(cmd(CommandKind::Resume));
        task.execute(&mut ds);
        assert!(!ds.mission_stopped);
    }

    #[test]
    fn test_disabled() {
        let mut task = MissionTask::new(false);
        let mut ds = DataStore::default();

        ds.mission_inbox.push_back(cmd(CommandKind::GoAhead));
        task.execute(&mut ds);

        assert!(!ds.go_ahead);
        assert_eq!(ds.mission_inbox.len(), 1);
    }
}
