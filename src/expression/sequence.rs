use crate::data_type::{Column, SparseVector, Value};
use crate::cache::SampleVector;
use crate::common::utils;

use super::SequenceKind;


#[derive(Debug, Clone)]
enum Accumulated {
    Scalar(Vec<f64>),
    Vector { dim: usize, sums: Vec<f64> },
    Sparse(Vec<SparseVector>),
    /// The sparse entries were moved to the output column.
    SparseInColumn,
}


/// Raw running state of a sequence over `len` positions.
///
/// Adding a child costs one pass over its values,
/// and [`SequenceAccumulator::append_into`] brings an output column
/// up to date without looking at the previous children again.
#[derive(Debug, Clone)]
pub struct SequenceAccumulator {
    kind: SequenceKind,
    len: usize,
    count: usize,
    state: Accumulated,
}


impl SequenceAccumulator {
    /// Construct an empty accumulator over `len` positions.
    pub fn new(kind: &SequenceKind, len: usize) -> Self {
        let state = match kind {
            SequenceKind::ScalarSum { .. } => Accumulated::Scalar(vec![0.0; len]),
            SequenceKind::VectorSum { n, .. } => {
                Accumulated::Vector { dim: *n, sums: vec![0.0; n * len] }
            },
            SequenceKind::CreateSparseVector => {
                Accumulated::Sparse(vec![SparseVector::new(); len])
            },
        };
        Self { kind: kind.clone(), len, count: 0, state }
    }


    /// Number of children added so far.
    pub fn count(&self) -> usize {
        self.count
    }


    /// Number of positions.
    pub fn len(&self) -> usize {
        self.len
    }


    /// Returns `true` if there are no positions.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }


    /// Add the values of child number `child_index`.
    /// `samples` must be aligned with the positions of this accumulator.
    pub fn add_samples(&mut self, child_index: usize, samples: &SampleVector) {
        assert_eq!(samples.len(), self.len, "misaligned child values");
        match &mut self.state {
            Accumulated::Scalar(sums) => {
                for s in samples.iter() {
                    let x = s.raw_double();
                    if !x.is_nan() {
                        sums[s.position] += x;
                    }
                }
            },
            Accumulated::Vector { dim, sums } => {
                let dim = *dim;
                for s in samples.iter() {
                    let value = s.value();
                    if let Some(v) = value.as_vector() {
                        let row = &mut sums[s.position * dim..(s.position + 1) * dim];
                        row.iter_mut()
                            .zip(v)
                            .filter(|(_, x)| !x.is_nan())
                            .for_each(|(acc, x)| *acc += x);
                    }
                }
            },
            Accumulated::Sparse(vectors) => {
                for s in samples.iter() {
                    let x = s.raw_double();
                    if !x.is_nan() {
                        vectors[s.position].set(child_index, x);
                    }
                }
            },
            Accumulated::SparseInColumn => {
                panic!("sparse entries live in the output column, use `append_into`");
            },
        }
        self.count += 1;
    }


    /// Add child number `child_index` and bring `column`,
    /// the output over the previous children, up to date.
    ///
    /// Once [`SequenceAccumulator::take_column`] has moved the sparse entries
    /// out, only the new `(child_index, value)` entries are written.
    pub fn append_into(&mut self, child_index: usize, samples: &SampleVector, column: &mut Column) {
        if !matches!(self.state, Accumulated::SparseInColumn) {
            self.add_samples(child_index, samples);
            self.finish_into(column);
            return;
        }

        let Column::Sparse(out) = column else {
            panic!("sparse sequence output needs a sparse column");
        };
        assert_eq!(samples.len(), out.len(), "misaligned child values");
        for s in samples.iter() {
            let x = s.raw_double();
            if !x.is_nan() {
                out[s.position].get_or_insert_with(SparseVector::new).set(child_index, x);
            }
        }
        self.count += 1;
    }


    /// Add the value of child number `child_index` to a single position
    /// accumulator.
    pub fn add_value(&mut self, child_index: usize, value: &Value) {
        assert_eq!(self.len, 1, "add_value needs a single position");
        match &mut self.state {
            Accumulated::Scalar(sums) => {
                if let Some(x) = value.as_f64() {
                    sums[0] += x;
                }
            },
            Accumulated::Vector { sums, .. } => {
                if let Some(v) = value.as_vector() {
                    sums.iter_mut()
                        .zip(v)
                        .filter(|(_, x)| !x.is_nan())
                        .for_each(|(acc, x)| *acc += x);
                }
            },
            Accumulated::Sparse(vectors) => {
                if let Some(x) = value.as_f64() {
                    vectors[0].set(child_index, x);
                }
            },
            Accumulated::SparseInColumn => {
                panic!("sparse entries live in the output column, use `append_into`");
            },
        }
        self.count += 1;
    }


    fn finish_scalar(&self, sum: f64) -> f64 {
        let (convert_to_probabilities, compute_average) = match self.kind {
            SequenceKind::ScalarSum { convert_to_probabilities, compute_average }
                => (convert_to_probabilities, compute_average),
            _ => (false, false),
        };
        let mut x = sum;
        if compute_average && self.count > 0 {
            x /= self.count as f64;
        }
        if convert_to_probabilities {
            x = utils::sigmoid(x);
        }
        x
    }


    fn finish_vector(&self, sums: &[f64], out: &mut [f64]) {
        out.copy_from_slice(sums);
        if let SequenceKind::VectorSum { convert_to_probabilities: true, .. } = self.kind {
            out.iter_mut().for_each(|x| *x = utils::sigmoid(*x));
            utils::normalize_sum(out);
        }
    }


    /// The output value at `position`.
    pub fn value(&self, position: usize) -> Value {
        match &self.state {
            Accumulated::Scalar(sums) => Value::Double(self.finish_scalar(sums[position])),
            Accumulated::Vector { dim, sums } => {
                let mut out = vec![0.0; *dim];
                self.finish_vector(&sums[position * dim..(position + 1) * dim], &mut out);
                Value::Vector(out)
            },
            Accumulated::Sparse(vectors) => Value::Sparse(vectors[position].clone()),
            Accumulated::SparseInColumn => {
                panic!("sparse entries live in the output column");
            },
        }
    }


    /// Build the output column. Sparse entries are moved, not copied,
    /// and later children must be added through
    /// [`SequenceAccumulator::append_into`] on that column.
    pub fn take_column(&mut self) -> Column {
        if let Accumulated::Sparse(vectors) = &mut self.state {
            let vectors = std::mem::take(vectors);
            self.state = Accumulated::SparseInColumn;
            return Column::Sparse(vectors.into_iter().map(Some).collect());
        }
        self.finish()
    }


    /// Build the output column.
    pub fn finish(&self) -> Column {
        let mut column = Column::with_capacity(self.kind.output_type(), self.len);
        match &mut column {
            Column::Double(out) => {
                out.resize(self.len, 0.0);
            },
            Column::Vector { dim, values } => {
                values.resize(*dim * self.len, 0.0);
            },
            Column::Sparse(out) => {
                out.resize(self.len, None);
            },
            _ => {},
        }
        self.finish_into(&mut column);
        column
    }


    /// Overwrite `column` with the current output, in place.
    pub fn finish_into(&self, column: &mut Column) {
        assert_eq!(column.len(), self.len, "misaligned output column");
        match (&self.state, column) {
            (Accumulated::Scalar(sums), Column::Double(out)) => {
                out.iter_mut()
                    .zip(sums)
                    .for_each(|(o, s)| *o = self.finish_scalar(*s));
            },
            (Accumulated::Vector { dim, sums }, Column::Vector { values, .. }) => {
                let dim = *dim;
                if dim == 0 {
                    return;
                }
                values.chunks_mut(dim)
                    .zip(sums.chunks(dim))
                    .for_each(|(out, sums)| self.finish_vector(sums, out));
            },
            (Accumulated::Sparse(vectors), Column::Sparse(out)) => {
                out.iter_mut()
                    .zip(vectors)
                    .for_each(|(o, v)| *o = Some(v.clone()));
            },
            // The column already holds every entry.
            (Accumulated::SparseInColumn, Column::Sparse(_)) => {},
            (_, column) => {
                panic!("sequence output cannot be written to {column:?}");
            },
        }
    }
}
