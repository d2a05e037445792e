use polars::prelude::*;
use rayon::prelude::*;

use std::path::Path;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::collections::HashMap;

use crate::data_type::{Type, Value};
use crate::error::{LuapeError, Result};
use super::feature::Feature;


const MISSING_TOKENS: [&str; 3] = ["", "?", "NA"];


/// Struct `Sample` holds a batch of examples with named, typed features
/// and a numeric target.
#[derive(Debug, Clone)]
pub struct Sample {
    pub(super) name_to_index: HashMap<String, usize>,
    pub(super) features: Vec<Feature>,
    pub(super) target: Vec<f64>,
    pub(super) n_sample: usize,
    pub(super) n_feature: usize,
}


fn parse_cell(cell: &str, line: usize) -> Result<f64> {
    let cell = cell.trim();
    if MISSING_TOKENS.contains(&cell) {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| LuapeError::InvalidArgument(
            format!("line {line}: cannot parse `{cell}` as a number")
        ))
}


impl Sample {
    /// Construct a sample from features of equal length.
    /// `target` is either empty or has one value per example.
    pub fn from_features(features: Vec<Feature>, target: Vec<f64>) -> Result<Self> {
        let n_sample = features.first().map_or(target.len(), Feature::len);
        if let Some(feat) = features.iter().find(|f| f.len() != n_sample) {
            return Err(LuapeError::InvalidArgument(format!(
                "feature `{}` has {} rows, expected {n_sample}",
                feat.name(), feat.len()
            )));
        }
        if !target.is_empty() && target.len() != n_sample {
            return Err(LuapeError::InvalidArgument(format!(
                "target has {} rows, expected {n_sample}", target.len()
            )));
        }

        let n_feature = features.len();
        let name_to_index = features.iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect::<HashMap<_, _>>();
        Ok(Self { name_to_index, features, target, n_sample, n_feature })
    }


    /// Convert `polars::DataFrame` and `polars::Series` into `Sample`.
    /// This method takes the ownership for the given pair
    /// `data` and `target`.
    pub fn from_dataframe(data: DataFrame, target: Series) -> Result<Self> {
        let target = target.cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|y| y.unwrap_or(f64::NAN))
            .collect::<Vec<_>>();

        let features = data.get_columns()
            .par_iter()
            .map(Feature::from_series)
            .collect::<Result<Vec<_>>>()?;

        Self::from_features(features, target)
    }


    /// Read a CSV format file to `Sample` type.
    /// Every column is read as a double feature;
    /// empty cells, `?` and `NA` are missing.
    /// Call [`Sample::set_target`] to pick the target column.
    pub fn from_csv<P>(file: P, has_header: bool) -> Result<Self>
        where P: AsRef<Path>,
    {
        // Open the given `file`.
        let file = File::open(file)?;
        let mut lines = BufReader::new(file).lines().enumerate();

        let mut features = Vec::new();
        if has_header {
            if let Some((_, line)) = lines.next() {
                features = line?.split(',')
                    .map(|name| Feature::double(name.trim(), Vec::new()))
                    .collect::<Vec<_>>();
            }
        }

        // For each line of the file
        for (number, line) in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let xs = line.split(',')
                .map(|cell| parse_cell(cell, number + 1))
                .collect::<Result<Vec<_>>>()?;

            // if the header does not exist,
            // construct a dummy header.
            if features.is_empty() {
                features = (1..=xs.len())
                    .map(|i| Feature::double(format!("Feat. [{i}]"), Vec::new()))
                    .collect();
            }
            if xs.len() != features.len() {
                return Err(LuapeError::InvalidArgument(format!(
                    "line {}: {} cells, expected {}",
                    number + 1, xs.len(), features.len()
                )));
            }
            features.iter_mut()
                .zip(xs)
                .for_each(|(feat, x)| feat.append(x));
        }

        Self::from_features(features, Vec::new())
    }


    /// Returns the target values.
    pub fn target(&self) -> &[f64] {
        &self.target[..]
    }


    /// Returns a slice of type `Feature`.
    pub fn features(&self) -> &[Feature] {
        &self.features[..]
    }


    /// Returns the feature named `name`.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.name_to_index.get(name).map(|&i| &self.features[i])
    }


    /// Returns the pair of the number of examples and
    /// the number of features.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_sample, self.n_feature)
    }


    /// Raw input values of example `row`, one per feature.
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.features.iter()
            .map(|f| f.get(row))
            .collect()
    }


    fn position<S: AsRef<str>>(&self, name: S) -> Result<usize> {
        let name = name.as_ref();
        self.name_to_index.get(name)
            .copied()
            .ok_or_else(|| LuapeError::MissingFeature(name.to_string()))
    }


    fn reindex(&mut self) {
        self.n_feature = self.features.len();
        self.name_to_index = self.features.iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect::<HashMap<_, _>>();
    }


    /// Set the feature of name `target` to `self.target`.
    /// The old value assigned to `self.target` will be dropped.
    pub fn set_target<S: AsRef<str>>(mut self, target: S) -> Result<Self> {
        let pos = self.position(target)?;
        self.target = self.features.remove(pos).into_target();
        self.reindex();
        Ok(self)
    }


    /// Convert the feature `name` to type `ty`.
    /// See [`Feature::retype`].
    pub fn set_feature_type<S: AsRef<str>>(mut self, name: S, ty: Type) -> Result<Self> {
        let pos = self.position(name)?;
        let placeholder = Feature::double("", Vec::new());
        let feature = std::mem::replace(&mut self.features[pos], placeholder);
        self.features[pos] = feature.retype(ty)?;
        Ok(self)
    }


    /// Rename the feature `old` to `new`.
    pub fn rename_feature<S, T>(mut self, old: S, new: T) -> Result<Self>
        where S: AsRef<str>,
              T: ToString,
    {
        let pos = self.position(old)?;
        self.features[pos].replace_name(new);
        self.reindex();
        Ok(self)
    }
}
