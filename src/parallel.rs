//! Collective-communication seam for the distributed AMI path.
//!
//! Distribution mechanics belong to the embedding application; this crate
//! only fixes the contract it needs: who owns faces (a rank/size query plus
//! one all-gather) and how an exchanged address table is described
//! ([`DistributionMap`]). The in-process [`SerialComm`] is the only
//! implementation shipped here.

/// Minimal collective interface. One instance per participating process.
pub trait Communicator {
    /// This process's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of participating processes.
    fn size(&self) -> usize;

    /// Gather one `usize` from every rank, in rank order.
    fn all_gather_usize(&self, value: usize) -> Vec<usize>;
}

/// Single-process communicator: rank 0 of 1, gathers are identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather_usize(&self, value: usize) -> Vec<usize> {
        vec![value]
    }
}

/// Description of a scatter/gather exchange of face data.
///
/// `sub_map[p]` lists the local element slots sent to partition `p`;
/// `construct_map[p]` lists the slots in the local receive buffer filled by
/// partition `p`; `construct_size` is the receive buffer length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionMap {
    /// Per-partition lists of local slots to send.
    pub sub_map: Vec<Vec<usize>>,
    /// Per-partition lists of receive-buffer slots.
    pub construct_map: Vec<Vec<usize>>,
    /// Receive buffer length.
    pub construct_size: usize,
}

impl DistributionMap {
    /// Renumber every construct/sub index by `offset`, used when appending
    /// a second exchange so its slots land past the current maximum.
    pub fn offset_indices(&mut self, offset: usize) {
        for list in self.sub_map.iter_mut().chain(self.construct_map.iter_mut()) {
            for i in list.iter_mut() {
                *i += offset;
            }
        }
        self.construct_size += offset;
    }

    /// Largest construct slot in use, if any.
    pub fn max_construct_index(&self) -> Option<usize> {
        self.construct_map
            .iter()
            .flat_map(|l| l.iter().copied())
            .max()
    }
}

/// Compact the construct slots of `map` to a dense `0..n` range, returning
/// the old-slot to new-slot translation table (old slot -> `Some(new)`).
///
/// Correctness-critical ordering invariant: compact slot numbers are derived
/// ONLY from data each side already holds, walked partition by partition in
/// rank order and within each partition in list order. Sender and receiver
/// run this walk over the maps they built during the original exchange, so
/// both allocate identical compact numbers without a further handshake. A
/// partition that contributed zero elements has an empty sub-list here; it
/// produces no slots and shifts nothing, keeping the two walks aligned.
pub fn remap_compact(map: &mut DistributionMap) -> Vec<Option<usize>> {
    let mut translation = vec![None; map.construct_size];
    let mut next = 0usize;
    for list in &map.construct_map {
        for &slot in list {
            if translation[slot].is_none() {
                translation[slot] = Some(next);
                next += 1;
            }
        }
    }
    for list in &mut map.construct_map {
        for slot in list.iter_mut() {
            // Every construct entry was just visited
            *slot = translation[*slot].unwrap();
        }
    }
    map.construct_size = next;
    translation
}
