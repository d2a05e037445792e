//! The inference wrapper.
//!
//! [`LuapeInference`] owns the node arena, the root sequence
//! that boosting grows, and one [`SamplesCache`] per dataset.
//! It decodes the root value according to the [`Task`].
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::constants::DEFAULT_MAX_CACHE_SIZE;
use crate::data_type::{Type, Value, Column};
use crate::expression::{NodeId, NodeKind, SequenceKind};
use crate::index_set::IndexSet;
use crate::universe::Universe;
use crate::cache::{SampleVector, SamplesCache, InstanceCache};
use crate::sample::Sample;
use crate::common::utils;
use crate::error::{LuapeError, Result};


/// The learning task, which fixes the root sequence
/// and how its value is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// The root sums real valued votes; the prediction is the sum.
    Regression,
    /// Labels are `+1` / `-1` (any positive label is `+1`).
    /// The prediction is `true` when the sum is positive.
    BinaryClassification,
    /// Labels are class indices in `0..n_classes`.
    /// The root sums one vote per class; the prediction is the argmax.
    MultiClassClassification {
        /// Number of classes.
        n_classes: usize,
    },
    /// Items are scored; only their order within a group matters.
    Ranking,
}


impl Task {
    fn root_kind(&self) -> SequenceKind {
        match self {
            Self::MultiClassClassification { n_classes } => {
                SequenceKind::VectorSum { n: *n_classes, convert_to_probabilities: false }
            },
            _ => SequenceKind::ScalarSum {
                convert_to_probabilities: false,
                compute_average: false,
            },
        }
    }


    /// Type of the decoded predictions.
    pub fn output_type(&self) -> Type {
        match self {
            Self::Regression | Self::Ranking => Type::Double,
            Self::BinaryClassification => Type::Boolean,
            Self::MultiClassClassification { n_classes } => Type::Enumeration(*n_classes),
        }
    }


    /// Type of the votes grafted into the root.
    pub fn vote_type(&self) -> Type {
        self.root_kind().output_type()
    }
}


/// Selects the training or the validation cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// Rows the weak learners search on.
    Training,
    /// Rows only used for reporting.
    Validation,
}


#[derive(Serialize)]
struct SnapshotRef<'a> {
    task: Task,
    inputs: &'a [NodeId],
    root: NodeId,
    universe: &'a Universe,
}


#[derive(Deserialize)]
struct Snapshot {
    task: Task,
    inputs: Vec<NodeId>,
    root: NodeId,
    universe: Universe,
}


/// A typed function from input values to a prediction,
/// represented by a root sequence of grafted nodes.
#[derive(Debug)]
pub struct LuapeInference {
    universe: Universe,
    task: Task,
    inputs: Vec<NodeId>,
    root: NodeId,

    training: SamplesCache,
    validation: SamplesCache,
    has_validation: bool,
    training_groups: Vec<usize>,
    validation_groups: Vec<usize>,

    max_cache_size: usize,
}


impl LuapeInference {
    /// Construct an inference without input and with an empty root.
    pub fn new(task: Task) -> Result<Self> {
        if let Task::MultiClassClassification { n_classes } = task {
            if n_classes < 2 {
                return Err(LuapeError::InvalidArgument(format!(
                    "multi-class classification needs at least 2 classes, got {n_classes}"
                )));
            }
        }
        let mut universe = Universe::new();
        let root = universe.make_sequence_node(task.root_kind(), Vec::new())?;
        let mut training = SamplesCache::default();
        training.cache_node(&universe, root, None);
        training.pin_node(root);
        Ok(Self {
            universe,
            task,
            inputs: Vec::new(),
            root,
            training,
            validation: SamplesCache::default(),
            has_validation: false,
            training_groups: Vec::new(),
            validation_groups: Vec::new(),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
        })
    }


    /// Construct an inference with one input per feature of `sample`.
    pub fn from_sample(sample: &Sample, task: Task) -> Result<Self> {
        let mut inference = Self::new(task)?;
        for feature in sample.features() {
            inference.add_input(feature.name(), feature.ty())?;
        }
        Ok(inference)
    }


    /// Set the budget, in bytes, of the evictable columns of each cache.
    /// Takes effect at the next [`LuapeInference::set_samples`].
    pub fn max_cache_size(mut self, bytes: usize) -> Self {
        self.max_cache_size = bytes;
        self
    }


    /// Declare the next input slot.
    pub fn add_input<S: ToString>(&mut self, name: S, ty: Type) -> Result<NodeId> {
        let index = self.inputs.len();
        let node = self.universe.make_variable_node(name, ty, index)?;
        self.inputs.push(node);
        Ok(node)
    }


    /// Attach the training and validation rows.
    ///
    /// Input columns and supervision are copied into the caches now,
    /// and the root sequence is computed and pinned.
    pub fn set_samples(&mut self, training: &Sample, validation: Option<&Sample>)
        -> Result<()>
    {
        let training_cache = self.build_cache(training)?;
        let validation_cache = match validation {
            Some(sample) => self.build_cache(sample)?,
            None => SamplesCache::default(),
        };
        self.training = training_cache;
        self.validation = validation_cache;
        self.has_validation = validation.is_some();
        self.training_groups = vec![training.shape().0];
        self.validation_groups = validation.map_or_else(Vec::new, |v| vec![v.shape().0]);
        log::debug!(
            "attached {} training rows, {} validation rows",
            self.training.n_samples(),
            self.validation.n_samples(),
        );
        Ok(())
    }


    fn build_cache(&self, sample: &Sample) -> Result<SamplesCache> {
        let (n_sample, n_feature) = sample.shape();
        if n_feature != self.inputs.len() {
            return Err(LuapeError::InvalidArgument(format!(
                "sample has {n_feature} features, the inference has {} inputs",
                self.inputs.len()
            )));
        }

        let mut cache = SamplesCache::new(n_sample)
            .max_cache_size(self.max_cache_size);
        for (feature, &input) in sample.features().iter().zip(&self.inputs) {
            let ty = self.universe.type_of(input);
            if feature.ty() != ty {
                return Err(LuapeError::type_mismatch(
                    format!("feature `{}`", feature.name()), ty, feature.ty(),
                ));
            }
            cache.cache_input(&self.universe, input, feature.column().clone());
        }
        cache.set_supervision(self.supervision_column(sample.target(), n_sample)?);
        cache.cache_node(&self.universe, self.root, None);
        cache.pin_node(self.root);
        Ok(cache)
    }


    fn supervision_column(&self, target: &[f64], n_sample: usize) -> Result<Column> {
        if target.len() != n_sample {
            return Err(LuapeError::InvalidArgument(format!(
                "sample has {} targets for {n_sample} rows", target.len()
            )));
        }
        if let Some(row) = target.iter().position(|y| y.is_nan()) {
            return Err(LuapeError::InvalidArgument(
                format!("target of row {row} is missing")
            ));
        }

        let column = match self.task {
            Task::Regression | Task::Ranking => Column::Double(target.to_vec()),
            Task::BinaryClassification => Column::Double(
                target.iter()
                    .map(|&y| if y > 0.0 { 1.0 } else { -1.0 })
                    .collect()
            ),
            Task::MultiClassClassification { n_classes } => {
                let mut labels = Vec::with_capacity(n_sample);
                for &y in target {
                    if y.fract() != 0.0 || y < 0.0 || y as usize >= n_classes {
                        return Err(LuapeError::InvalidArgument(format!(
                            "label {y} is not a class index in 0..{n_classes}"
                        )));
                    }
                    labels.push(Some(y as i64));
                }
                Column::Integer(labels)
            },
        };
        Ok(column)
    }


    /// Split rows into consecutive query groups of the given sizes.
    /// Sizes must be positive and add up to the number of rows.
    pub fn set_ranking_groups(&mut self, dataset: Dataset, groups: Vec<usize>)
        -> Result<()>
    {
        if groups.contains(&0) {
            return Err(LuapeError::InvalidArgument(
                "ranking groups cannot be empty".into()
            ));
        }
        let n_rows = self.cache(dataset).n_samples();
        let total = groups.iter().sum::<usize>();
        if total != n_rows {
            return Err(LuapeError::InvalidArgument(format!(
                "ranking groups cover {total} rows out of {n_rows}"
            )));
        }
        match dataset {
            Dataset::Training => self.training_groups = groups,
            Dataset::Validation => self.validation_groups = groups,
        }
        Ok(())
    }


    /// Sizes of the consecutive query groups.
    pub fn ranking_groups(&self, dataset: Dataset) -> &[usize] {
        match dataset {
            Dataset::Training => &self.training_groups,
            Dataset::Validation => &self.validation_groups,
        }
    }


    /// The task.
    pub fn task(&self) -> Task {
        self.task
    }


    /// The node arena.
    pub fn universe(&self) -> &Universe {
        &self.universe
    }


    /// The node arena, for building candidates.
    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }


    /// The root sequence.
    pub fn root(&self) -> NodeId {
        self.root
    }


    /// Nodes grafted so far, in order.
    pub fn contributions(&self) -> &[NodeId] {
        match self.universe.node(self.root).kind() {
            NodeKind::Sequence { children, .. } => children,
            _ => &[],
        }
    }


    /// Input variables, in slot order.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }


    /// The cache of `dataset`.
    /// The validation cache is empty when no validation rows are attached.
    pub fn cache(&self, dataset: Dataset) -> &SamplesCache {
        match dataset {
            Dataset::Training => &self.training,
            Dataset::Validation => &self.validation,
        }
    }


    /// Returns `true` if validation rows are attached.
    pub fn has_validation(&self) -> bool {
        self.has_validation
    }


    /// Number of training rows.
    pub fn n_training(&self) -> usize {
        self.training.n_samples()
    }


    /// Every training row.
    pub fn training_indices(&self) -> Arc<IndexSet> {
        self.training.all_indices()
    }


    /// Values of `node` over training `indices`.
    /// Values computed here are dropped at the next graft.
    pub fn training_samples(&mut self, node: NodeId, indices: &Arc<IndexSet>)
        -> SampleVector
    {
        self.training.get_samples(&self.universe, node, indices, true)
    }


    /// Sorted values and missing rows of the numeric `node`
    /// over training `indices`.
    pub fn training_sorted_doubles(&mut self, node: NodeId, indices: &Arc<IndexSet>)
        -> (Vec<(usize, f64)>, Vec<usize>)
    {
        self.training.sorted_double_values(&self.universe, node, indices)
    }


    /// The supervision column of `dataset`.
    pub fn supervision(&self, dataset: Dataset) -> Option<&Arc<Column>> {
        self.cache(dataset).supervision()
    }


    /// Supervision of `dataset` as doubles.
    /// Class indices are converted to `f64`.
    pub fn labels(&self, dataset: Dataset) -> Vec<f64> {
        match self.supervision(dataset) {
            Some(column) => (0..column.len()).map(|row| column.raw_double(row)).collect(),
            None => Vec::new(),
        }
    }


    /// Append `node` to the root and update the cached root of
    /// both datasets with the values of `node` only.
    pub fn push_node(&mut self, node: NodeId) -> Result<()> {
        let index = self.universe.push_sequence_child(self.root, node)?;
        self.training.observe_new_child(&self.universe, self.root, node);
        if self.has_validation {
            self.validation.observe_new_child(&self.universe, self.root, node);
        }
        log::debug!("grafted {node} as contribution {index}");
        Ok(())
    }


    /// Forget iteration-scoped values of both caches.
    pub fn clear_removable(&mut self) {
        self.training.clear_removable();
        self.validation.clear_removable();
    }


    /// Current root output of `dataset`.
    pub fn root_column(&self, dataset: Dataset) -> Option<Arc<Column>> {
        self.cache(dataset).column(self.root)
    }


    /// Scalar root output of every row of `dataset`.
    pub fn scores(&self, dataset: Dataset) -> Vec<f64> {
        match self.root_column(dataset) {
            Some(column) => (0..column.len()).map(|row| column.raw_double(row)).collect(),
            None => Vec::new(),
        }
    }


    /// Per-class root output of every row of `dataset`.
    pub fn class_scores(&self, dataset: Dataset) -> Vec<Vec<f64>> {
        let Some(column) = self.root_column(dataset) else { return Vec::new() };
        let dim = match self.task {
            Task::MultiClassClassification { n_classes } => n_classes,
            _ => 1,
        };
        (0..column.len())
            .map(|row| match column.raw_vector(row) {
                Some(v) => v.to_vec(),
                None => vec![column.raw_double(row); dim],
            })
            .collect()
    }


    fn decode(&self, value: &Value) -> Value {
        match self.task {
            Task::Regression | Task::Ranking => {
                Value::Double(value.as_f64().unwrap_or(0.0))
            },
            Task::BinaryClassification => match value.as_f64() {
                Some(x) => Value::Boolean(x > 0.0),
                None => Value::Missing,
            },
            Task::MultiClassClassification { .. } => {
                value.as_vector()
                    .and_then(utils::argmax)
                    .map_or(Value::Missing, |k| Value::Integer(k as i64))
            },
        }
    }


    /// Raw root value for one instance.
    pub fn compute_raw(&self, inputs: &[Value]) -> Value {
        let mut instance = InstanceCache::new(inputs.to_vec());
        instance.compute(&self.universe, self.root)
    }


    /// Decoded prediction for one instance.
    pub fn compute_function(&self, inputs: &[Value]) -> Value {
        self.decode(&self.compute_raw(inputs))
    }


    /// Class probabilities for one instance.
    ///
    /// Binary classification gives the probability of the positive class,
    /// multi-class classification a vector summing to one.
    pub fn probability(&self, inputs: &[Value]) -> Result<Value> {
        let raw = self.compute_raw(inputs);
        match self.task {
            Task::BinaryClassification => {
                let score = raw.as_f64().unwrap_or(0.0);
                Ok(Value::Double(utils::sigmoid(2.0 * score)))
            },
            Task::MultiClassClassification { n_classes } => {
                let mut p = raw.as_vector()
                    .map_or_else(|| vec![0.0; n_classes], <[f64]>::to_vec);
                p.iter_mut().for_each(|x| *x = utils::sigmoid(*x));
                utils::normalize_sum(&mut p);
                Ok(Value::Vector(p))
            },
            _ => Err(LuapeError::InvalidArgument(
                "probabilities are only defined for classification".into()
            )),
        }
    }


    /// Positions of `items` ordered by decreasing score.
    /// Ties keep the input order.
    pub fn rank(&self, items: &[Vec<Value>]) -> Vec<usize> {
        let scores = items.iter()
            .map(|inputs| self.compute_raw(inputs).as_f64().unwrap_or(0.0))
            .collect::<Vec<_>>();
        let mut order = (0..items.len()).collect::<Vec<_>>();
        order.sort_by(|&i, &j| scores[j].total_cmp(&scores[i]));
        order
    }


    /// Decoded predictions for every row of `sample`.
    pub fn predict_all(&self, sample: &Sample) -> Vec<Value> {
        let n_sample = sample.shape().0;
        (0..n_sample).into_par_iter()
            .map(|row| self.compute_function(&sample.row(row)))
            .collect()
    }


    /// Quality of the current predictions on `dataset`:
    /// RMSE for regression, error rate for classification,
    /// fraction of misordered pairs for ranking.
    /// Returns `None` when the dataset is not attached.
    pub fn evaluate_predictions(&self, dataset: Dataset) -> Option<f64> {
        if dataset == Dataset::Validation && !self.has_validation {
            return None;
        }
        let labels = self.labels(dataset);
        if labels.is_empty() {
            return None;
        }
        let n_sample = labels.len() as f64;

        let score = match self.task {
            Task::Regression => utils::rmse(&self.scores(dataset), &labels),
            Task::BinaryClassification => {
                self.scores(dataset).iter()
                    .zip(&labels)
                    .filter(|(f, y)| (**f > 0.0) != (**y > 0.0))
                    .count() as f64
                    / n_sample
            },
            Task::MultiClassClassification { .. } => {
                self.class_scores(dataset).iter()
                    .zip(&labels)
                    .filter(|(f, y)| utils::argmax(f) != Some(**y as usize))
                    .count() as f64
                    / n_sample
            },
            Task::Ranking => {
                let groups = self.ranking_groups(dataset);
                utils::misordered_pairs(&self.scores(dataset), &labels, groups)
            },
        };
        Some(score)
    }


    /// Bytes held by the evictable columns of `dataset`.
    pub fn cache_size(&self, dataset: Dataset) -> usize {
        self.cache(dataset).actual_cache_size()
    }


    /// Compare the cached column of `node` with a row-by-row recomputation.
    pub fn check_cache_is_correct(&self, dataset: Dataset, node: NodeId) -> bool {
        self.cache(dataset).check_cache_is_correct(&self.universe, node)
    }


    /// Serialize the task, the inputs, the root and the arena.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = SnapshotRef {
            task: self.task,
            inputs: &self.inputs,
            root: self.root,
            universe: &self.universe,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }


    /// Restore an inference saved by [`LuapeInference::to_json`].
    /// No rows are attached.
    pub fn from_json(json: &str) -> Result<Self> {
        let Snapshot { task, inputs, root, mut universe }
            = serde_json::from_str::<Snapshot>(json)?;
        universe.rebuild_tables();
        if root.index() >= universe.len() {
            return Err(LuapeError::InvalidArgument(
                format!("root {root} is outside of the arena")
            ));
        }

        let mut training = SamplesCache::default();
        training.cache_node(&universe, root, None);
        training.pin_node(root);
        Ok(Self {
            universe,
            task,
            inputs,
            root,
            training,
            validation: SamplesCache::default(),
            has_validation: false,
            training_groups: Vec::new(),
            validation_groups: Vec::new(),
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
        })
    }


    /// Write [`LuapeInference::to_json`] to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }


    /// Read an inference written by [`LuapeInference::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
