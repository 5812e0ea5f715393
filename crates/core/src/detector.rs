//! Detector identities and miss classifications.

use std::fmt;

/// Workers that report liveness to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetectorKind {
    /// Chain info poller publishing block observations.
    BlockUpdates,
    /// Schedule tracker resolving membership and neighbors.
    Schedule,
    /// Turn-order missed block detector.
    MissedBlocks,
    /// Last-produced missed round detector.
    MissedRounds,
    /// Node log watcher for duplicate signatures.
    LogWatcher,
}

impl DetectorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectorKind::BlockUpdates => "block updates",
            DetectorKind::Schedule => "schedule",
            DetectorKind::MissedBlocks => "missed blocks",
            DetectorKind::MissedRounds => "missed rounds",
            DetectorKind::LogWatcher => "log watcher",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a detector believes the protected producer is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissKind {
    /// The successor signed without the protected producer signing after the
    /// predecessor.
    SkippedTurn,
    /// The head stopped advancing while the protected producer was due.
    StalledHead,
    /// The protected producer's last block lags the head by more than a round.
    MissedRound,
}

impl fmt::Display for MissKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissKind::SkippedTurn => write!(f, "skipped its turn"),
            MissKind::StalledHead => write!(f, "has missed blocks"),
            MissKind::MissedRound => write!(f, "has missed a round"),
        }
    }
}
