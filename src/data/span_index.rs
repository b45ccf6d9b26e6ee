//! Address-indexed span lookup
//!
//! A flat sorted array with one entry per byte address covered by at least
//! one span, each entry carrying the set of covering spans. Addresses not
//! covered by any span have no entry. The input is finite and construction
//! is one-shot, so a flat array beats an interval tree here; lookups are a
//! single binary search.

use crate::core::types::SpanId;
use crate::data::store::DebugStore;
use tracing::debug;

/// Spans covering one address. The single-span case is by far the most
/// common one and avoids the extra allocation.
#[derive(Debug)]
enum Covering {
    One(SpanId),
    Many(Vec<SpanId>),
}

#[derive(Debug)]
struct AddrEntry {
    addr: u32,
    covering: Covering,
}

/// Inverted index from byte address to the spans covering it
#[derive(Debug, Default)]
pub(crate) struct SpanAddrIndex {
    entries: Vec<AddrEntry>,
}

impl SpanAddrIndex {
    /// Build the index over all spans in the store. Spans are processed in
    /// ascending (start, end) order, which also fixes the order of the
    /// covering sets.
    pub(crate) fn build(store: &DebugStore) -> Self {
        let mut spans: Vec<(u32, u32, SpanId)> = store
            .spans
            .iter()
            .flatten()
            .map(|s| (s.start, s.end, s.id))
            .collect();
        spans.sort_by_key(|&(start, end, _)| (start, end));

        if spans.is_empty() {
            return Self::default();
        }

        // Sweep 1: count the distinct addresses. A running high-water mark
        // tells how much of each span is new.
        let (first_start, first_end, _) = spans[0];
        let mut total = (u64::from(first_end) - u64::from(first_start) + 1) as usize;
        let mut high = first_end;
        for &(start, end, _) in &spans[1..] {
            if start > high {
                total += (u64::from(end) - u64::from(start) + 1) as usize;
                high = end;
            } else if end > high {
                total += (u64::from(end) - u64::from(high)) as usize;
                high = end;
            }
        }

        // Sweep 2: fill in the addresses and per-address cover counts
        let mut addrs: Vec<u32> = vec![0; total];
        let mut counts: Vec<u32> = vec![0; total];
        {
            let mut start_index = 0usize;
            let mut start = spans[0].0;
            let mut end = spans[0].1;
            for (j, addr) in (spans[0].0..=spans[0].1).enumerate() {
                addrs[j] = addr;
                counts[j] += 1;
            }
            for &(s_start, s_end, _) in &spans[1..] {
                // Spans are start-sorted, so the next start is never below
                // the current one
                if s_start <= end {
                    start_index += (s_start - start) as usize;
                    start = s_start;
                    if s_end > end {
                        end = s_end;
                    }
                } else {
                    start_index += (end - start) as usize + 1;
                    start = s_start;
                    end = s_end;
                }
                for (j, addr) in (s_start..=s_end).enumerate() {
                    addrs[start_index + j] = addr;
                    counts[start_index + j] += 1;
                }
            }
        }

        // Sweep 3: distribute the spans over the per-address sets, sized
        // from the counts of the previous sweep
        let mut cover: Vec<Vec<SpanId>> = counts
            .iter()
            .map(|&c| Vec::with_capacity(c as usize))
            .collect();
        {
            let mut start_index = 0usize;
            let mut start = spans[0].0;
            let mut end = spans[0].1;
            for (j, _) in (spans[0].0..=spans[0].1).enumerate() {
                cover[j].push(spans[0].2);
            }
            for &(s_start, s_end, id) in &spans[1..] {
                if s_start <= end {
                    start_index += (s_start - start) as usize;
                    start = s_start;
                    if s_end > end {
                        end = s_end;
                    }
                } else {
                    start_index += (end - start) as usize + 1;
                    start = s_start;
                    end = s_end;
                }
                for (j, _) in (s_start..=s_end).enumerate() {
                    cover[start_index + j].push(id);
                }
            }
        }

        let entries: Vec<AddrEntry> = addrs
            .into_iter()
            .zip(cover)
            .map(|(addr, ids)| AddrEntry {
                addr,
                covering: if ids.len() == 1 {
                    Covering::One(ids[0])
                } else {
                    Covering::Many(ids)
                },
            })
            .collect();

        debug!(
            spans = spans.len(),
            addresses = entries.len(),
            "built span address index"
        );
        Self { entries }
    }

    /// All spans covering `addr`, in ascending (start, end) order of the
    /// spans. Empty if no span covers the address.
    pub(crate) fn lookup(&self, addr: u32) -> &[SpanId] {
        match self.entries.binary_search_by_key(&addr, |e| e.addr) {
            Ok(i) => match &self.entries[i].covering {
                Covering::One(id) => std::slice::from_ref(id),
                Covering::Many(ids) => ids.as_slice(),
            },
            Err(_) => &[],
        }
    }

    /// Number of distinct covered addresses
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::Span;

    fn store_with_spans(ranges: &[(u32, u32)]) -> DebugStore {
        let mut store = DebugStore::default();
        store.spans = ranges
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| {
                Some(Span {
                    id: SpanId(i as u32),
                    segment: None,
                    start,
                    end,
                    scopes: Vec::new(),
                    lines: Vec::new(),
                })
            })
            .collect();
        store
    }

    #[test]
    fn empty_store_has_empty_index() {
        let index = SpanAddrIndex::build(&DebugStore::default());
        assert_eq!(index.len(), 0);
        assert!(index.lookup(0x1000).is_empty());
    }

    #[test]
    fn single_span_boundaries() {
        let store = store_with_spans(&[(0x1000, 0x100f)]);
        let index = SpanAddrIndex::build(&store);
        assert_eq!(index.len(), 16);
        assert!(index.lookup(0x0fff).is_empty());
        assert_eq!(index.lookup(0x1000), &[SpanId(0)]);
        assert_eq!(index.lookup(0x100f), &[SpanId(0)]);
        assert!(index.lookup(0x1010).is_empty());
    }

    #[test]
    fn overlapping_spans_in_start_order() {
        let store = store_with_spans(&[(0x2000, 0x200f), (0x2008, 0x2017)]);
        let index = SpanAddrIndex::build(&store);
        assert_eq!(index.len(), 0x18);
        assert_eq!(index.lookup(0x2008), &[SpanId(0), SpanId(1)]);
        assert_eq!(index.lookup(0x2010), &[SpanId(1)]);
        assert_eq!(index.lookup(0x2007), &[SpanId(0)]);
    }

    #[test]
    fn nested_span_sorts_shorter_first() {
        let store = store_with_spans(&[(0x100, 0x1ff), (0x100, 0x10f)]);
        let index = SpanAddrIndex::build(&store);
        // Shorter span precedes the longer one at the shared start
        assert_eq!(index.lookup(0x100), &[SpanId(1), SpanId(0)]);
        assert_eq!(index.lookup(0x110), &[SpanId(0)]);
    }

    #[test]
    fn disjoint_spans_leave_a_gap() {
        let store = store_with_spans(&[(0x10, 0x1f), (0x30, 0x3f)]);
        let index = SpanAddrIndex::build(&store);
        assert_eq!(index.len(), 32);
        assert_eq!(index.lookup(0x1f), &[SpanId(0)]);
        assert!(index.lookup(0x20).is_empty());
        assert!(index.lookup(0x2f).is_empty());
        assert_eq!(index.lookup(0x30), &[SpanId(1)]);
    }

    #[test]
    fn identical_spans_share_every_address() {
        let store = store_with_spans(&[(0x40, 0x4f), (0x40, 0x4f)]);
        let index = SpanAddrIndex::build(&store);
        assert_eq!(index.len(), 16);
        assert_eq!(index.lookup(0x48), &[SpanId(0), SpanId(1)]);
    }

    #[test]
    fn holes_in_span_arena_are_skipped() {
        let mut store = store_with_spans(&[(0x10, 0x13)]);
        store.spans.push(None);
        store.spans.push(Some(Span {
            id: SpanId(2),
            segment: None,
            start: 0x12,
            end: 0x15,
            scopes: Vec::new(),
            lines: Vec::new(),
        }));
        let index = SpanAddrIndex::build(&store);
        assert_eq!(index.len(), 6);
        assert_eq!(index.lookup(0x12), &[SpanId(0), SpanId(2)]);
        assert_eq!(index.lookup(0x15), &[SpanId(2)]);
    }
}
