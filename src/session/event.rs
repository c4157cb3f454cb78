use serde::{Deserialize, Serialize};

/// Membership change in a voice channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberEvent {
    #[serde(rename = "member_join")]
    Join,
    #[serde(rename = "member_leave")]
    Leave,
}

/// Result of applying one event to the occupancy counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyChange {
    /// Someone joined; carries the new member count
    Joined(u32),
    /// Someone left and the channel is still occupied (or was never occupied)
    Left(u32),
    /// The last member left a channel that had been occupied
    Emptied,
    /// A leave arrived while the counter was already zero
    Underflow,
}

/// Member accounting for one channel
///
/// Owned by the session's lifecycle task and only touched from its
/// serialized event path, so the fields are plain integers, not atomics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occupancy {
    members: u32,
    ever_occupied: bool,
}

impl Occupancy {
    pub fn members(&self) -> u32 {
        self.members
    }

    pub fn ever_occupied(&self) -> bool {
        self.ever_occupied
    }

    pub fn apply(&mut self, event: MemberEvent) -> OccupancyChange {
        match event {
            MemberEvent::Join => {
                self.members = self.members.saturating_add(1);
                if self.members == 1 {
                    self.ever_occupied = true;
                }
                OccupancyChange::Joined(self.members)
            }
            MemberEvent::Leave => {
                let Some(members) = self.members.checked_sub(1) else {
                    return OccupancyChange::Underflow;
                };
                self.members = members;

                if members == 0 && self.ever_occupied {
                    OccupancyChange::Emptied
                } else {
                    OccupancyChange::Left(members)
                }
            }
        }
    }
}
