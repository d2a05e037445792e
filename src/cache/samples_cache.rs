use fixedbitset::FixedBitSet;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crate::constants::{
    DEFAULT_MAX_CACHE_SIZE,
    DEFAULT_MINIMUM_SPARSITY,
    NUMERIC_TOLERANCE,
};
use crate::data_type::{Type, Value, Column, RAW_FALSE, RAW_TRUE};
use crate::expression::{NodeId, NodeKind, SequenceKind, SequenceAccumulator};
use crate::index_set::IndexSet;
use crate::universe::Universe;

use super::{SampleVector, InstanceCache};


type SortedValues = (Vec<(usize, f64)>, Vec<usize>);


#[derive(Debug)]
struct CacheEntry {
    column: Arc<Column>,
    accumulator: Option<SequenceAccumulator>,
    pinned: bool,
}


/// Split the rows of a boolean `condition` into
/// its `false`, `true` and missing rows.
/// The three sets are disjoint and their union is `condition.indices()`.
pub fn dispatch_indices(condition: &SampleVector) -> (IndexSet, IndexSet, IndexSet) {
    let mut failure = IndexSet::new();
    let mut success = IndexSet::new();
    let mut missing = IndexSet::new();
    for s in condition.iter() {
        match s.raw_boolean() {
            RAW_FALSE => failure.append(s.row, DEFAULT_MINIMUM_SPARSITY),
            RAW_TRUE => success.append(s.row, DEFAULT_MINIMUM_SPARSITY),
            _ => missing.append(s.row, DEFAULT_MINIMUM_SPARSITY),
        }
    }
    (failure, success, missing)
}


/// Columns of node values over one dataset.
///
/// Input columns are pinned when the dataset is attached.
/// Other columns are kept in insertion order and the earliest ones are
/// evicted once their total size exceeds the budget.
#[derive(Debug)]
pub struct SamplesCache {
    n_samples: usize,
    all_indices: Arc<IndexSet>,
    max_cache_size: usize,
    actual_cache_size: usize,
    input_size: usize,

    entries: HashMap<NodeId, CacheEntry>,
    order: VecDeque<NodeId>,
    inputs: HashMap<usize, Arc<Column>>,
    supervision: Option<Arc<Column>>,

    removable: HashMap<NodeId, SampleVector>,
    removable_size: usize,
    sorted: HashMap<NodeId, Arc<SortedValues>>,
}


impl Default for SamplesCache {
    fn default() -> Self {
        Self::new(0)
    }
}


impl SamplesCache {
    /// Construct an empty cache over `n_samples` rows.
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            all_indices: Arc::new(IndexSet::range(0, n_samples)),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            actual_cache_size: 0,
            input_size: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
            inputs: HashMap::new(),
            supervision: None,
            removable: HashMap::new(),
            removable_size: 0,
            sorted: HashMap::new(),
        }
    }


    /// Set the budget, in bytes, of the evictable columns.
    pub fn max_cache_size(mut self, bytes: usize) -> Self {
        self.max_cache_size = bytes;
        self
    }


    /// Number of rows.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }


    /// Every row of the dataset.
    pub fn all_indices(&self) -> Arc<IndexSet> {
        self.all_indices.clone()
    }


    /// Bytes held by evictable columns.
    pub fn actual_cache_size(&self) -> usize {
        self.actual_cache_size
    }


    /// Bytes held by the values kept for the current iteration.
    pub fn removable_size(&self) -> usize {
        self.removable_size
    }


    /// Bytes held by pinned columns.
    pub fn input_size(&self) -> usize {
        self.input_size
    }


    /// Returns `true` if `node` has a full-dataset column.
    pub fn is_cached(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }


    /// Cached nodes in insertion order, inputs included.
    pub fn cached_nodes(&self) -> Vec<NodeId> {
        self.order.iter().copied().collect()
    }


    /// The full-dataset column of `node`, if cached.
    pub fn column(&self, node: NodeId) -> Option<Arc<Column>> {
        self.entries.get(&node).map(|e| e.column.clone())
    }


    /// Pin the column of an input variable.
    pub fn cache_input(&mut self, universe: &Universe, node: NodeId, column: Column) {
        let input_index = match universe.node(node).kind() {
            NodeKind::Variable { input_index, .. } => *input_index,
            other => panic!("node {node} is a {}, not a variable", other.tag()),
        };
        assert_eq!(column.len(), self.n_samples, "input column length mismatch");

        if let Some(old) = self.entries.remove(&node) {
            self.order.retain(|id| *id != node);
            if old.pinned {
                self.input_size -= old.column.size_in_bytes();
            } else {
                self.actual_cache_size -= old.column.size_in_bytes();
            }
        }
        let column = Arc::new(column);
        self.inputs.insert(input_index, column.clone());
        let entry = CacheEntry { column, accumulator: None, pinned: true };
        self.insert_entry(node, entry);
    }


    /// Keep the column of the cached `node` out of eviction.
    /// Its bytes move from the evictable total to the pinned total.
    pub fn pin_node(&mut self, node: NodeId) {
        if let Some(entry) = self.entries.get_mut(&node) {
            if !entry.pinned {
                entry.pinned = true;
                let bytes = entry.column.size_in_bytes();
                self.actual_cache_size -= bytes;
                self.input_size += bytes;
            }
        }
    }


    /// Attach the supervision column.
    pub fn set_supervision(&mut self, column: Column) {
        assert_eq!(column.len(), self.n_samples, "supervision length mismatch");
        self.supervision = Some(Arc::new(column));
    }


    /// The supervision column.
    pub fn supervision(&self) -> Option<&Arc<Column>> {
        self.supervision.as_ref()
    }


    /// Cache the full-dataset column of `node`,
    /// computing it unless `values` are given.
    /// Sequences always rebuild their accumulator from their children.
    pub fn cache_node(&mut self, universe: &Universe, node: NodeId, values: Option<Column>) {
        if self.entries.contains_key(&node) {
            return;
        }
        let entry = match universe.node(node).kind() {
            NodeKind::Sequence { kind, children } => {
                let all = self.all_indices();
                let mut accumulator = self.accumulate(universe, kind, children, &all);
                CacheEntry {
                    column: Arc::new(accumulator.take_column()),
                    accumulator: Some(accumulator),
                    pinned: false,
                }
            },
            _ => {
                let column = match values {
                    Some(column) => {
                        assert_eq!(column.len(), self.n_samples, "column length mismatch");
                        column
                    },
                    None => {
                        let all = self.all_indices();
                        self.compute_samples(universe, node, &all).into_column()
                    },
                };
                CacheEntry { column: Arc::new(column), accumulator: None, pinned: false }
            },
        };
        self.insert_entry(node, entry);
    }


    fn insert_entry(&mut self, node: NodeId, entry: CacheEntry) {
        let bytes = entry.column.size_in_bytes();
        let pinned = entry.pinned;
        if pinned {
            self.input_size += bytes;
        } else {
            self.actual_cache_size += bytes;
        }
        self.entries.insert(node, entry);
        self.order.push_back(node);
        if let Some(old) = self.removable.remove(&node) {
            self.removable_size -= old.size_in_bytes();
        }
        log::debug!(
            "cached {node} ({bytes} bytes{}), evictable total {} / {}",
            if pinned { ", pinned" } else { "" },
            self.actual_cache_size,
            self.max_cache_size,
        );

        if !pinned {
            self.ensure_budget(node);
        }
    }


    /// Evict the earliest non-input nodes until the budget holds again.
    /// `keep` is never evicted.
    fn ensure_budget(&mut self, keep: NodeId) {
        while self.actual_cache_size > self.max_cache_size {
            let victim = self.order.iter()
                .position(|id| {
                    *id != keep && self.entries.get(id).map_or(false, |e| !e.pinned)
                });
            let Some(position) = victim else { break };
            if let Some(id) = self.order.remove(position) {
                self.remove_entry(id);
                log::debug!("evicted {id}, evictable total {}", self.actual_cache_size);
            }
        }
    }


    fn remove_entry(&mut self, node: NodeId) {
        if let Some(entry) = self.entries.remove(&node) {
            let bytes = entry.column.size_in_bytes();
            if entry.pinned {
                self.input_size -= bytes;
            } else {
                self.actual_cache_size -= bytes;
            }
        }
        self.sorted.remove(&node);
    }


    /// Drop the column of a non-input node.
    pub fn uncache_node(&mut self, node: NodeId) {
        let evictable = self.entries.get(&node).map_or(false, |e| !e.pinned);
        if evictable {
            self.order.retain(|id| *id != node);
            self.remove_entry(node);
            log::debug!("uncached {node}");
        }
    }


    /// Forget the values computed for the current iteration only.
    pub fn clear_removable(&mut self) {
        self.removable.clear();
        self.removable_size = 0;
    }


    /// Keep `samples` until the next [`SamplesCache::clear_removable`]
    /// unless that would hold more than `max_cache_size` bytes.
    fn keep_removable(&mut self, node: NodeId, samples: &SampleVector) {
        let bytes = samples.size_in_bytes();
        let released = self.removable.get(&node).map_or(0, SampleVector::size_in_bytes);
        if self.removable_size - released + bytes > self.max_cache_size {
            log::debug!("not keeping {node} ({bytes} bytes) for this iteration");
            return;
        }
        self.removable_size = self.removable_size - released + bytes;
        self.removable.insert(node, samples.clone());
    }


    /// The values of `node` over `indices`.
    ///
    /// Cached nodes are read through an aliasing view.
    /// Otherwise the node is computed over exactly `indices`;
    /// when `is_removable` is set the result is kept until
    /// [`SamplesCache::clear_removable`], within the same byte budget
    /// as the cached columns.
    pub fn get_samples(
        &mut self,
        universe: &Universe,
        node: NodeId,
        indices: &Arc<IndexSet>,
        is_removable: bool,
    ) -> SampleVector
    {
        let ty = universe.type_of(node);
        if indices.is_empty() {
            return SampleVector::constant(indices.clone(), ty, Value::Missing);
        }
        if let Some(value) = universe.node(node).as_constant() {
            return SampleVector::constant(indices.clone(), ty, value.clone());
        }
        if let Some(entry) = self.entries.get(&node) {
            return SampleVector::cached(indices.clone(), ty, entry.column.clone());
        }
        if let Some(samples) = self.removable.get(&node) {
            let same = Arc::ptr_eq(samples.indices(), indices)
                || samples.indices().as_ref() == indices.as_ref();
            if same {
                return samples.clone();
            }
        }

        let start = Instant::now();
        let samples = self.compute_samples(universe, node, indices);
        let elapsed = start.elapsed().as_secs_f64() * 1e6;
        universe.observe_node_computing_time(node, elapsed / indices.len() as f64);

        let is_sequence = matches!(universe.node(node).kind(), NodeKind::Sequence { .. });
        let is_full = indices.len() == self.n_samples;
        if is_full && !is_sequence && !samples.is_cached() {
            let column = samples.into_column();
            let bytes = column.size_in_bytes();
            if self.actual_cache_size + bytes <= self.max_cache_size {
                let column = Arc::new(column);
                let entry = CacheEntry {
                    column: column.clone(),
                    accumulator: None,
                    pinned: false,
                };
                self.insert_entry(node, entry);
                return SampleVector::cached(indices.clone(), ty, column);
            }
            let samples = SampleVector::owned(indices.clone(), ty, column);
            if is_removable {
                self.keep_removable(node, &samples);
            }
            return samples;
        }
        if is_removable {
            self.keep_removable(node, &samples);
        }
        samples
    }


    /// Compute `node` over `indices` without consulting its own cache entry.
    fn compute_samples(&mut self, universe: &Universe, node: NodeId, indices: &Arc<IndexSet>)
        -> SampleVector
    {
        let ty = universe.type_of(node);
        match universe.node(node).kind() {
            NodeKind::Variable { name, .. } => {
                match self.entries.get(&node) {
                    Some(entry) => SampleVector::cached(indices.clone(), ty, entry.column.clone()),
                    None => panic!("input `{name}` has no column in this cache"),
                }
            },
            NodeKind::Constant(value) => {
                SampleVector::constant(indices.clone(), ty, value.clone())
            },
            NodeKind::Function { function, arguments } => {
                let args = arguments.iter()
                    .map(|a| self.get_samples(universe, *a, indices, true))
                    .collect::<Vec<_>>();
                SampleVector::owned(indices.clone(), ty, function.compute_bulk(&args))
            },
            NodeKind::Test { condition, failure, success, missing } => {
                let branches = [*failure, *success, *missing];
                self.compute_test(universe, *condition, branches, ty, indices)
            },
            NodeKind::Sequence { kind, children } => {
                let accumulator = self.accumulate(universe, kind, children, indices);
                SampleVector::owned(indices.clone(), ty, accumulator.finish())
            },
        }
    }


    fn compute_test(
        &mut self,
        universe: &Universe,
        condition: NodeId,
        branches: [NodeId; 3],
        ty: Type,
        indices: &Arc<IndexSet>,
    ) -> SampleVector
    {
        let condition = self.get_samples(universe, condition, indices, true);
        let mut column = Column::with_capacity(ty, indices.len());

        let constants = branches.map(|b| universe.node(b).as_constant().cloned());
        if let [Some(failure), Some(success), Some(missing)] = constants {
            let values = [failure, success, missing];
            for s in condition.iter() {
                column.push(&values[s.raw_boolean().min(2) as usize]);
            }
            return SampleVector::owned(indices.clone(), ty, column);
        }

        let (failure, success, missing) = dispatch_indices(&condition);
        let subsets = [failure, success, missing];
        let branch_values = branches.iter()
            .zip(subsets)
            .map(|(branch, subset)| {
                self.get_samples(universe, *branch, &Arc::new(subset), true)
            })
            .collect::<Vec<_>>();

        let mut cursors = branch_values.iter()
            .map(|values| values.iter())
            .collect::<Vec<_>>();
        for s in condition.iter() {
            let value = cursors[s.raw_boolean().min(2) as usize]
                .next()
                .map_or(Value::Missing, |v| v.value());
            column.push(&value);
        }
        SampleVector::owned(indices.clone(), ty, column)
    }


    fn accumulate(
        &mut self,
        universe: &Universe,
        kind: &SequenceKind,
        children: &[NodeId],
        indices: &Arc<IndexSet>,
    ) -> SequenceAccumulator
    {
        let mut accumulator = SequenceAccumulator::new(kind, indices.len());
        for (i, child) in children.iter().enumerate() {
            let samples = self.get_samples(universe, *child, indices, true);
            accumulator.add_samples(i, &samples);
        }
        accumulator
    }


    /// Update the cached output of `sequence` after `child` was appended
    /// to it in `universe`.
    /// Only the full-dataset column of `child` is read.
    pub fn observe_new_child(&mut self, universe: &Universe, sequence: NodeId, child: NodeId) {
        self.clear_removable();
        let has_accumulator = self.entries.get(&sequence)
            .map_or(false, |e| e.accumulator.is_some());
        if !has_accumulator {
            return;
        }
        let child_index = match universe.node(sequence).kind() {
            NodeKind::Sequence { children, .. } => {
                debug_assert_eq!(children.last(), Some(&child));
                children.len() - 1
            },
            _ => return,
        };

        let all = self.all_indices();
        let samples = self.get_samples(universe, child, &all, false);
        let mut evictable = false;
        if let Some(CacheEntry { column, accumulator: Some(accumulator), pinned })
            = self.entries.get_mut(&sequence)
        {
            let column = Arc::make_mut(column);
            let before = column.size_in_bytes();
            accumulator.append_into(child_index, &samples, column);
            let after = column.size_in_bytes();
            let total = if *pinned { &mut self.input_size } else { &mut self.actual_cache_size };
            *total = (*total + after).saturating_sub(before);
            evictable = !*pinned;
        }
        self.sorted.remove(&sequence);
        if evictable {
            self.ensure_budget(sequence);
        }
        log::debug!("updated {sequence} with child {child} ({child_index})");
    }


    /// `(row, value)` pairs of the numeric `node` over `indices`,
    /// sorted by value, and the rows where the value is missing.
    pub fn sorted_double_values(
        &mut self,
        universe: &Universe,
        node: NodeId,
        indices: &Arc<IndexSet>,
    ) -> SortedValues
    {
        if let Some(entry) = self.entries.get(&node) {
            if !self.sorted.contains_key(&node) {
                let column = entry.column.clone();
                let sorted = sort_rows(0..self.n_samples, |row| column.raw_double(row));
                self.sorted.insert(node, Arc::new(sorted));
            }
            let sorted = self.sorted[&node].clone();
            if indices.len() == self.n_samples {
                return (*sorted).clone();
            }

            let mut mask = FixedBitSet::with_capacity(self.n_samples);
            indices.iter().for_each(|row| mask.insert(row));
            let valued = sorted.0.iter()
                .filter(|(row, _)| mask.contains(*row))
                .copied()
                .collect();
            let missing = sorted.1.iter()
                .filter(|row| mask.contains(**row))
                .copied()
                .collect();
            return (valued, missing);
        }

        let samples = self.get_samples(universe, node, indices, true);
        let values = samples.iter()
            .map(|s| (s.row, s.raw_double()))
            .collect::<HashMap<_, _>>();
        sort_rows(indices.iter(), |row| values[&row])
    }


    /// Raw input values of `row`, indexed by input slot.
    pub fn row_inputs(&self, row: usize) -> Vec<Value> {
        let size = self.inputs.keys().max().map_or(0, |m| m + 1);
        let mut inputs = vec![Value::Missing; size];
        for (index, column) in self.inputs.iter() {
            inputs[*index] = column.get(row);
        }
        inputs
    }


    /// Recompute every row of the cached `node` from its inputs
    /// and compare with the cached column.
    /// Returns `false` on the first mismatch and `true` for uncached nodes.
    pub fn check_cache_is_correct(&self, universe: &Universe, node: NodeId) -> bool {
        let Some(entry) = self.entries.get(&node) else { return true };
        for row in 0..self.n_samples {
            let mut instance = InstanceCache::new(self.row_inputs(row));
            let expected = instance.compute(universe, node);
            let cached = entry.column.get(row);
            if !cached.approx_eq(&expected, NUMERIC_TOLERANCE) {
                log::warn!(
                    "cache mismatch for {node} at row {row}: cached {cached}, expected {expected}"
                );
                return false;
            }
        }
        true
    }
}


fn sort_rows<I, F>(rows: I, value: F) -> SortedValues
    where I: IntoIterator<Item = usize>,
          F: Fn(usize) -> f64,
{
    let mut valued = Vec::new();
    let mut missing = Vec::new();
    for row in rows {
        let x = value(row);
        if x.is_nan() {
            missing.push(row);
        } else {
            valued.push((row, x));
        }
    }
    valued.sort_by(|a, b| a.1.total_cmp(&b.1));
    (valued, missing)
}
