//! Active-schedule membership and turn-order neighbors.

use crate::chain::ProducerSchedule;
use crate::producer::ProducerName;

/// Whether the protected producer is part of the active schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MembershipState {
    InActiveSet,
    #[default]
    NotInActiveSet,
}

impl MembershipState {
    pub fn is_member(self) -> bool {
        matches!(self, MembershipState::InActiveSet)
    }
}

/// Producers immediately before and after the protected producer in the
/// alphabetically sorted active set, wrapping at both ends.
///
/// Producers take turns in name order, so seeing `before` sign means the
/// protected producer is due next, and seeing `after` sign means its turn
/// has passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighborSet {
    pub before: String,
    pub after: String,
}

impl NeighborSet {
    /// Resolve the neighbors of `protected` within `active`.
    ///
    /// Returns `None` if `protected` is not in the set.
    pub fn resolve<'a>(
        active: impl IntoIterator<Item = &'a str>,
        protected: &ProducerName,
    ) -> Option<Self> {
        let mut sorted: Vec<&str> = active.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let idx = sorted.iter().position(|p| protected == p)?;
        let len = sorted.len();
        let before = sorted[(idx + len - 1) % len];
        let after = sorted[(idx + 1) % len];

        Some(Self {
            before: before.to_string(),
            after: after.to_string(),
        })
    }
}

/// Published result of one schedule refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleView {
    /// Version of the active schedule this view was derived from.
    pub version: u32,
    pub membership: MembershipState,
    /// Defined only while the protected producer is in the active set.
    pub neighbors: Option<NeighborSet>,
}

impl ScheduleView {
    pub fn from_schedule(schedule: &ProducerSchedule, protected: &ProducerName) -> Self {
        let neighbors = NeighborSet::resolve(schedule.active_producers(), protected);
        let membership = if neighbors.is_some() {
            MembershipState::InActiveSet
        } else {
            MembershipState::NotInActiveSet
        };

        Self {
            version: schedule.active.version,
            membership,
            neighbors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ProducerKey, ScheduleSet};

    fn name(s: &str) -> ProducerName {
        ProducerName::new(s).unwrap()
    }

    fn schedule(version: u32, producers: &[&str]) -> ProducerSchedule {
        ProducerSchedule {
            active: ScheduleSet {
                version,
                producers: producers
                    .iter()
                    .map(|p| ProducerKey {
                        producer_name: p.to_string(),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_neighbors_middle() {
        let active = ["cccccccccccc", "aaaaaaaaaaaa", "bbbbbbbbbbbb"];
        let n = NeighborSet::resolve(active, &name("bbbbbbbbbbbb")).unwrap();
        assert_eq!(n.before, "aaaaaaaaaaaa");
        assert_eq!(n.after, "cccccccccccc");
    }

    #[test]
    fn test_neighbors_wrap_first() {
        let active = ["bbbbbbbbbbbb", "aaaaaaaaaaaa", "cccccccccccc"];
        let n = NeighborSet::resolve(active, &name("aaaaaaaaaaaa")).unwrap();
        assert_eq!(n.before, "cccccccccccc");
        assert_eq!(n.after, "bbbbbbbbbbbb");
    }

    #[test]
    fn test_neighbors_wrap_last() {
        let active = ["aaaaaaaaaaaa", "bbbbbbbbbbbb", "cccccccccccc"];
        let n = NeighborSet::resolve(active, &name("cccccccccccc")).unwrap();
        assert_eq!(n.before, "bbbbbbbbbbbb");
        assert_eq!(n.after, "aaaaaaaaaaaa");
    }

    #[test]
    fn test_neighbors_single_member() {
        let n = NeighborSet::resolve(["aaaaaaaaaaaa"], &name("aaaaaaaaaaaa")).unwrap();
        assert_eq!(n.before, "aaaaaaaaaaaa");
        assert_eq!(n.after, "aaaaaaaaaaaa");
    }

    #[test]
    fn test_not_a_member() {
        let active = ["aaaaaaaaaaaa", "bbbbbbbbbbbb"];
        assert!(NeighborSet::resolve(active, &name("zzzzzzzzzzzz")).is_none());

        let view = ScheduleView::from_schedule(&schedule(4, &active), &name("zzzzzzzzzzzz"));
        assert_eq!(view.version, 4);
        assert_eq!(view.membership, MembershipState::NotInActiveSet);
        assert!(view.neighbors.is_none());
    }

    #[test]
    fn test_view_for_member() {
        let active = ["aaaaaaaaaaaa", "bbbbbbbbbbbb", "cccccccccccc"];
        let view = ScheduleView::from_schedule(&schedule(9, &active), &name("bbbbbbbbbbbb"));
        assert!(view.membership.is_member());
        assert_eq!(
            view.neighbors,
            Some(NeighborSet {
                before: "aaaaaaaaaaaa".into(),
                after: "cccccccccccc".into(),
            })
        );
    }
}
