use std::sync::Arc;

use crate::data_type::{Type, Value, Column};
use crate::index_set::IndexSet;


#[derive(Debug, Clone)]
enum SampleData {
    /// The same value for every row.
    Constant(Value),
    /// A column aligned with the positions of the index set.
    Owned(Arc<Column>),
    /// A full-dataset column read by row.
    Cached(Arc<Column>),
}


/// The values of one node over the rows of an [`IndexSet`].
///
/// Position `p` of the vector holds the value of the `p`-th row
/// of the index set.
#[derive(Debug, Clone)]
pub struct SampleVector {
    indices: Arc<IndexSet>,
    ty: Type,
    data: SampleData,
}


impl SampleVector {
    /// A vector repeating `value` over `indices`.
    pub fn constant(indices: Arc<IndexSet>, ty: Type, value: Value) -> Self {
        Self { indices, ty, data: SampleData::Constant(value) }
    }


    /// A vector owning `column`, aligned with the positions of `indices`.
    pub fn owned(indices: Arc<IndexSet>, ty: Type, column: Column) -> Self {
        assert_eq!(column.len(), indices.len(), "misaligned owned column");
        Self { indices, ty, data: SampleData::Owned(Arc::new(column)) }
    }


    /// A view on a full-dataset `column`, read at the rows of `indices`.
    pub fn cached(indices: Arc<IndexSet>, ty: Type, column: Arc<Column>) -> Self {
        debug_assert!(indices.last().map_or(true, |last| last < column.len()));
        Self { indices, ty, data: SampleData::Cached(column) }
    }


    /// Number of values.
    pub fn len(&self) -> usize {
        self.indices.len()
    }


    /// Returns `true` if there is no value.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }


    /// The type of the values.
    pub fn ty(&self) -> Type {
        self.ty
    }


    /// The rows this vector covers.
    pub fn indices(&self) -> &Arc<IndexSet> {
        &self.indices
    }


    /// The shared value, if this vector is constant.
    pub fn constant_value(&self) -> Option<&Value> {
        match &self.data {
            SampleData::Constant(value) => Some(value),
            _ => None,
        }
    }


    /// Returns `true` if this vector reads a cached column.
    pub fn is_cached(&self) -> bool {
        matches!(self.data, SampleData::Cached(_))
    }


    /// Bytes owned by this vector. Constants and cached views own none.
    pub fn size_in_bytes(&self) -> usize {
        match &self.data {
            SampleData::Owned(column) => column.size_in_bytes(),
            _ => 0,
        }
    }


    /// Iterate over the values together with their row and position.
    pub fn iter(&self) -> SampleIter<'_> {
        SampleIter { vector: self, chunk: 0, index_in_chunk: 0, position: 0 }
    }


    /// Collect the values.
    pub fn values(&self) -> Vec<Value> {
        self.iter().map(|s| s.value()).collect()
    }


    /// Collect the raw doubles.
    pub fn raw_doubles(&self) -> Vec<f64> {
        self.iter().map(|s| s.raw_double()).collect()
    }


    /// Materialize the values as a column aligned with the positions.
    pub fn into_column(self) -> Column {
        let len = self.len();
        match self.data {
            SampleData::Constant(value) => Column::filled(self.ty, &value, len),
            SampleData::Owned(column) => {
                Arc::try_unwrap(column).unwrap_or_else(|shared| (*shared).clone())
            },
            SampleData::Cached(column) => column.select(self.indices.iter()),
        }
    }
}


/// One element of a [`SampleVector`].
#[derive(Debug, Clone, Copy)]
pub struct SampleRef<'a> {
    vector: &'a SampleVector,
    /// Row index in the dataset.
    pub row: usize,
    /// Position inside the vector.
    pub position: usize,
}


impl SampleRef<'_> {
    /// Raw boolean byte of this element.
    #[inline(always)]
    pub fn raw_boolean(&self) -> u8 {
        match &self.vector.data {
            SampleData::Constant(value) => value.raw_boolean(),
            SampleData::Owned(column) => column.raw_boolean(self.position),
            SampleData::Cached(column) => column.raw_boolean(self.row),
        }
    }


    /// Raw double of this element, `NaN` when missing.
    #[inline(always)]
    pub fn raw_double(&self) -> f64 {
        match &self.vector.data {
            SampleData::Constant(value) => value.raw_double(),
            SampleData::Owned(column) => column.raw_double(self.position),
            SampleData::Cached(column) => column.raw_double(self.row),
        }
    }


    /// The value of this element.
    pub fn value(&self) -> Value {
        match &self.vector.data {
            SampleData::Constant(value) => value.clone(),
            SampleData::Owned(column) => column.get(self.position),
            SampleData::Cached(column) => column.get(self.row),
        }
    }
}


/// Iterator over the elements of a [`SampleVector`].
#[derive(Debug, Clone)]
pub struct SampleIter<'a> {
    vector: &'a SampleVector,
    chunk: usize,
    index_in_chunk: usize,
    position: usize,
}


impl<'a> Iterator for SampleIter<'a> {
    type Item = SampleRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let vector: &'a SampleVector = self.vector;
        let chunks = vector.indices.chunks();
        while self.chunk < chunks.len()
            && self.index_in_chunk >= chunks[self.chunk].len()
        {
            self.chunk += 1;
            self.index_in_chunk = 0;
        }
        let row = *chunks.get(self.chunk)?.get(self.index_in_chunk)?;
        let item = SampleRef { vector, row, position: self.position };
        self.index_in_chunk += 1;
        self.position += 1;
        Some(item)
    }


    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.len() - self.position;
        (remaining, Some(remaining))
    }
}


impl ExactSizeIterator for SampleIter<'_> {}
