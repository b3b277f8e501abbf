use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Contiguous range of corpus indices owned by one worker. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub worker_index: usize,
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, id: usize) -> bool {
        self.range().contains(&id)
    }
}

/// Assign worker `worker_index` of `workers` its share of `total` entries.
///
/// Every worker gets `total / workers` entries; the last one also absorbs the
/// remainder. With fewer entries than workers the leading partitions are
/// empty. An out-of-range index yields an empty partition at `total`.
pub fn partition(total: usize, workers: usize, worker_index: usize) -> Partition {
    let workers = workers.max(1);
    if worker_index >= workers {
        return Partition {
            worker_index,
            start: total,
            end: total,
        };
    }
    let chunk = total / workers;
    let start = worker_index * chunk;
    let end = if worker_index == workers - 1 {
        total
    } else {
        start + chunk
    };
    Partition {
        worker_index,
        start,
        end,
    }
}

pub fn build_partitions(total: usize, workers: usize) -> Vec<Partition> {
    (0..workers.max(1))
        .map(|worker_index| partition(total, workers, worker_index))
        .collect()
}
