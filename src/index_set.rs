//! Ordered sets of row indices stored as a list of chunks.
//!
//! Rows within a chunk are strictly increasing,
//! and chunks are non-overlapping and ordered.
//! A chunk may be sparse: it only has to stay dense enough
//! (see [`IndexSet::append`]).
use rand::prelude::*;
use rand::distributions::WeightedIndex;
use serde::{Serialize, Deserialize};

use crate::constants::DEFAULT_MINIMUM_SPARSITY;


/// An ordered, chunk-compressed set of row indices.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSet {
    chunks: Vec<Vec<usize>>,
    size: usize,
}


/// Position of one set's rows inside an [`IntersectionRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPart {
    /// Chunk covering the region.
    pub chunk: usize,
    /// Index, inside `chunk`, of the first row of the region.
    pub index_in_chunk: usize,
    /// Number of rows of the set inside the region.
    pub count: usize,
}


/// A span `[begin, end)` of row indices together with
/// the chunks of two sets that cover it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionRegion {
    /// First row index of the span.
    pub begin: usize,
    /// One past the last row index of the span.
    pub end: usize,
    /// Part of the first set, if one of its chunks covers the span.
    pub first: Option<RegionPart>,
    /// Part of the second set, if one of its chunks covers the span.
    pub second: Option<RegionPart>,
}


impl IntersectionRegion {
    /// Returns `true` if only the first set covers this region.
    pub fn is_first_only(&self) -> bool {
        self.first.is_some() && self.second.is_none()
    }


    /// Returns `true` if both sets cover this region.
    pub fn is_both(&self) -> bool {
        self.first.is_some() && self.second.is_some()
    }


    /// Returns `true` if only the second set covers this region.
    pub fn is_second_only(&self) -> bool {
        self.first.is_none() && self.second.is_some()
    }


    /// Number of rows of the first set inside this region.
    pub fn first_count(&self) -> usize {
        self.first.map_or(0, |p| p.count)
    }


    /// Number of rows of the second set inside this region.
    pub fn second_count(&self) -> usize {
        self.second.map_or(0, |p| p.count)
    }
}


impl IndexSet {
    /// Construct an empty set.
    pub fn new() -> Self {
        Self { chunks: Vec::new(), size: 0 }
    }


    /// Construct the set `begin..end` as a single chunk.
    pub fn range(begin: usize, end: usize) -> Self {
        assert!(begin <= end, "invalid range {begin}..{end}");
        let mut set = Self::new();
        if begin < end {
            set.chunks.push((begin..end).collect());
            set.size = end - begin;
        }
        set
    }


    /// Construct a set from strictly increasing indices.
    pub fn from_sorted<I>(indices: I, minimum_sparsity: f64) -> Self
        where I: IntoIterator<Item = usize>
    {
        let mut set = Self::new();
        for index in indices {
            set.append(index, minimum_sparsity);
        }
        set
    }


    /// Append `index`, which must exceed every stored index.
    /// A new chunk starts when adding `index` to the last chunk
    /// would make its density drop below `minimum_sparsity`.
    pub fn append(&mut self, index: usize, minimum_sparsity: f64) {
        match self.chunks.last_mut() {
            None => { self.chunks.push(vec![index]); },
            Some(last) => {
                let front = last[0];
                let back = last[last.len() - 1];
                assert!(back < index, "indices must be appended in order");

                let density = (last.len() + 1) as f64
                    / (index - front + 1) as f64;
                if density < minimum_sparsity {
                    self.chunks.push(vec![index]);
                } else {
                    last.push(index);
                }
            },
        }
        self.size += 1;
    }


    /// Insert `index` anywhere in the set.
    /// Returns `false` if it was already present.
    pub fn insert(&mut self, index: usize) -> bool {
        let k = self.chunks.partition_point(|c| c[0] <= index);
        if k > 0 {
            let chunk = &mut self.chunks[k - 1];
            if index <= chunk[chunk.len() - 1] {
                return match chunk.binary_search(&index) {
                    Ok(_) => false,
                    Err(pos) => {
                        chunk.insert(pos, index);
                        self.size += 1;
                        true
                    },
                };
            }
        }
        self.chunks.insert(k, vec![index]);
        self.size += 1;
        true
    }


    /// Insert a whole chunk, which must not overlap existing chunks.
    pub fn insert_chunk(&mut self, chunk: Vec<usize>) {
        if chunk.is_empty() {
            return;
        }
        debug_assert!(chunk.windows(2).all(|w| w[0] < w[1]));
        let front = chunk[0];
        let back = chunk[chunk.len() - 1];
        let k = self.chunks.partition_point(|c| c[0] < front);
        if k > 0 {
            let prev = &self.chunks[k - 1];
            assert!(prev[prev.len() - 1] < front, "overlapping chunks");
        }
        if k < self.chunks.len() {
            assert!(back < self.chunks[k][0], "overlapping chunks");
        }
        self.size += chunk.len();
        self.chunks.insert(k, chunk);
    }


    /// Number of indices.
    pub fn len(&self) -> usize {
        self.size
    }


    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }


    /// The chunks of this set.
    pub fn chunks(&self) -> &[Vec<usize>] {
        &self.chunks
    }


    /// Iterate over the indices in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.iter().flat_map(|c| c.iter().copied())
    }


    /// Returns `true` if `index` belongs to the set.
    pub fn contains(&self, index: usize) -> bool {
        let k = self.chunks.partition_point(|c| c[0] <= index);
        k > 0 && self.chunks[k - 1].binary_search(&index).is_ok()
    }


    /// Smallest index.
    pub fn first(&self) -> Option<usize> {
        self.chunks.first().map(|c| c[0])
    }


    /// Largest index.
    pub fn last(&self) -> Option<usize> {
        self.chunks.last().map(|c| c[c.len() - 1])
    }


    /// Collect the indices.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }


    /// Part of `self` covering `[begin, end)`.
    /// `begin` and `end` must not cut through a chunk boundary.
    fn part_in(&self, begin: usize, end: usize) -> Option<RegionPart> {
        let k = self.chunks.partition_point(|c| c[0] <= begin);
        if k == 0 {
            return None;
        }
        let chunk = &self.chunks[k - 1];
        if chunk[chunk.len() - 1] < begin {
            return None;
        }
        let index_in_chunk = chunk.partition_point(|&i| i < begin);
        let count = chunk.partition_point(|&i| i < end) - index_in_chunk;
        Some(RegionPart { chunk: k - 1, index_in_chunk, count })
    }


    /// Decompose the union of the chunk spans of `first` and `second`
    /// into consecutive regions covered by the first set only,
    /// by both, or by the second set only.
    pub fn intersection_regions(first: &Self, second: &Self)
        -> Vec<IntersectionRegion>
    {
        let mut breakpoints = first.chunks.iter()
            .chain(second.chunks.iter())
            .flat_map(|c| [c[0], c[c.len() - 1] + 1])
            .collect::<Vec<_>>();
        breakpoints.sort_unstable();
        breakpoints.dedup();

        breakpoints.windows(2)
            .filter_map(|w| {
                let (begin, end) = (w[0], w[1]);
                let region = IntersectionRegion {
                    begin,
                    end,
                    first: first.part_in(begin, end),
                    second: second.part_in(begin, end),
                };
                (region.first.is_some() || region.second.is_some())
                    .then_some(region)
            })
            .collect()
    }


    /// Grow `self` to `new_size` indices taken from `source`,
    /// which must be a superset of `self`.
    ///
    /// New rows are drawn as blocks from regions that `source` covers
    /// and `self` does not, picking a region with probability
    /// proportional to its number of rows.
    /// When `contiguous` is set, blocks start at the beginning of a region
    /// and preferably extend an existing chunk.
    pub fn randomly_expand_using_source<R>(
        &mut self,
        rng: &mut R,
        new_size: usize,
        source: &Self,
        contiguous: bool,
    )
        where R: Rng,
    {
        assert!(
            new_size <= source.len(),
            "cannot expand to {new_size} rows from a source of {}",
            source.len()
        );

        while self.size < new_size {
            let regions = Self::intersection_regions(source, self);

            let free = regions.iter()
                .enumerate()
                .filter(|(_, r)| r.is_first_only() && r.first_count() > 0)
                .map(|(i, _)| i)
                .collect::<Vec<_>>();

            let mut candidates = free.iter()
                .copied()
                .filter(|&i| {
                    !contiguous
                        || self.is_empty()
                        || (i > 0 && regions[i - 1].second.is_some())
                })
                .collect::<Vec<_>>();
            if candidates.is_empty() {
                candidates = free;
            }

            // Remaining rows hide inside sparse chunks of `self`.
            if candidates.is_empty() {
                match source.iter().find(|&i| !self.contains(i)) {
                    Some(index) => { self.insert(index); },
                    None => break,
                }
                continue;
            }

            let weights = candidates.iter()
                .map(|&i| regions[i].first_count() as f64)
                .collect::<Vec<_>>();
            let pick = match WeightedIndex::new(&weights) {
                Ok(dist) => dist.sample(rng),
                Err(_) => 0,
            };
            let region_index = candidates[pick];
            let region = regions[region_index];
            let part = match region.first {
                Some(part) => part,
                None => continue,
            };

            let offset = if contiguous { 0 } else { rng.gen_range(0..part.count) };
            let take = (part.count - offset).min(new_size - self.size);
            let begin = part.index_in_chunk + offset;
            let rows = &source.chunks[part.chunk][begin..begin + take];

            let target = if offset == 0 && region_index > 0 {
                regions[region_index - 1].second.map(|p| p.chunk)
            } else {
                None
            };
            match target {
                Some(chunk) if contiguous => {
                    self.chunks[chunk].extend_from_slice(rows);
                    self.size += rows.len();
                },
                _ => { self.insert_chunk(rows.to_vec()); },
            }
        }
    }
}


impl FromIterator<usize> for IndexSet {
    /// Collect strictly increasing indices.
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_sorted(iter, DEFAULT_MINIMUM_SPARSITY)
    }
}
