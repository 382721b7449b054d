use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The operating units a cost model can be trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpUnit {
    Gc,
    LogSerializerTask,
    DiskLogConsumerTask,
    TxnBegin,
    TxnCommit,
    SeqScan,
    IdxScan,
    HashjoinBuild,
    HashjoinProbe,
    AggBuild,
    AggIterate,
    SortBuild,
    SortIterate,
    Insert,
    Update,
    Delete,
    Output,
    Limit,
    IndexInsert,
    IndexDelete,
    CreateIndex,
}

impl OpUnit {
    pub const ALL: [OpUnit; 21] = [
        OpUnit::Gc,
        OpUnit::LogSerializerTask,
        OpUnit::DiskLogConsumerTask,
        OpUnit::TxnBegin,
        OpUnit::TxnCommit,
        OpUnit::SeqScan,
        OpUnit::IdxScan,
        OpUnit::HashjoinBuild,
        OpUnit::HashjoinProbe,
        OpUnit::AggBuild,
        OpUnit::AggIterate,
        OpUnit::SortBuild,
        OpUnit::SortIterate,
        OpUnit::Insert,
        OpUnit::Update,
        OpUnit::Delete,
        OpUnit::Output,
        OpUnit::Limit,
        OpUnit::IndexInsert,
        OpUnit::IndexDelete,
        OpUnit::CreateIndex,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OpUnit::Gc => "GC",
            OpUnit::LogSerializerTask => "LOG_SERIALIZER_TASK",
            OpUnit::DiskLogConsumerTask => "DISK_LOG_CONSUMER_TASK",
            OpUnit::TxnBegin => "TXN_BEGIN",
            OpUnit::TxnCommit => "TXN_COMMIT",
            OpUnit::SeqScan => "SEQ_SCAN",
            OpUnit::IdxScan => "IDX_SCAN",
            OpUnit::HashjoinBuild => "HASHJOIN_BUILD",
            OpUnit::HashjoinProbe => "HASHJOIN_PROBE",
            OpUnit::AggBuild => "AGG_BUILD",
            OpUnit::AggIterate => "AGG_ITERATE",
            OpUnit::SortBuild => "SORT_BUILD",
            OpUnit::SortIterate => "SORT_ITERATE",
            OpUnit::Insert => "INSERT",
            OpUnit::Update => "UPDATE",
            OpUnit::Delete => "DELETE",
            OpUnit::Output => "OUTPUT",
            OpUnit::Limit => "LIMIT",
            OpUnit::IndexInsert => "INDEX_INSERT",
            OpUnit::IndexDelete => "INDEX_DELETE",
            OpUnit::CreateIndex => "CREATE_INDEX",
        }
    }

    /// Transaction bookkeeping units, sampled down before training.
    pub fn is_txn(&self) -> bool {
        matches!(self, OpUnit::TxnBegin | OpUnit::TxnCommit)
    }
}

impl FromStr for OpUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|opunit| opunit.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for OpUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
