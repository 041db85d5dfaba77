//! Grouped observations and their per-group sufficient statistics.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::error::{GibbsError, Result};

/// Sample size, mean and sum of squared deviations of one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSummary {
    pub id: u64,
    pub n: usize,
    pub mean: f64,
    /// Sum of squared deviations from the group mean.
    pub ssd: f64,
}

impl GroupSummary {
    fn from_values(id: u64, values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(GibbsError::EmptyGroup { group: id });
        }
        if let Some(index) = values.iter().position(|y| !y.is_finite()) {
            return Err(GibbsError::NonFiniteObservation { group: id, index });
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let ssd = values.iter().map(|y| (y - mean) * (y - mean)).sum();
        Ok(GroupSummary { id, n, mean, ssd })
    }

    /// Unbiased sample variance, not defined for a single observation.
    pub fn variance(&self) -> Option<f64> {
        if self.n < 2 {
            return None;
        }
        Some(self.ssd / (self.n - 1) as f64)
    }

    /// `sum_i (y_i - theta)^2`, computed from the summary.
    pub fn sum_sq_resid(&self, theta: f64) -> f64 {
        let diff = self.mean - theta;
        self.ssd + self.n as f64 * diff * diff
    }
}

/// Real valued observations partitioned into groups.
///
/// Groups are ordered by id. Summaries are computed once on construction,
/// the observations themselves cannot be changed afterwards.
#[derive(Debug, Clone)]
pub struct GroupedData {
    groups: Vec<(u64, Box<[f64]>)>,
    summaries: Box<[GroupSummary]>,
}

impl GroupedData {
    /// Build from `(group id, observation)` pairs in any order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, f64)>) -> Result<Self> {
        let mut groups: BTreeMap<u64, Vec<f64>> = BTreeMap::new();
        for (id, y) in pairs {
            groups.entry(id).or_default().push(y);
        }
        Self::new(groups.into_iter().map(|(id, ys)| (id, ys.into())).collect())
    }

    /// Build from one vector per group. Group ids are the vector indices.
    pub fn from_groups(groups: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(
            groups
                .into_iter()
                .enumerate()
                .map(|(id, ys)| (id as u64, ys.into()))
                .collect(),
        )
    }

    fn new(mut groups: Vec<(u64, Box<[f64]>)>) -> Result<Self> {
        if groups.is_empty() {
            return Err(GibbsError::NoGroups);
        }
        groups.sort_by_key(|(id, _)| *id);
        let summaries = groups
            .iter()
            .map(|(id, ys)| GroupSummary::from_values(*id, ys))
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupedData {
            groups,
            summaries: summaries.into(),
        })
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_observations(&self) -> usize {
        self.summaries.iter().map(|s| s.n).sum()
    }

    pub fn summaries(&self) -> &[GroupSummary] {
        &self.summaries
    }

    pub fn group_ids(&self) -> Vec<u64> {
        self.groups.iter().map(|(id, _)| *id).collect()
    }

    /// Raw observations of the group at position `group` in id order.
    pub fn observations(&self, group: usize) -> Option<&[f64]> {
        self.groups.get(group).map(|(_, ys)| &ys[..])
    }

    /// Sample means of all groups in group order.
    pub fn means(&self) -> Vec<f64> {
        self.summaries.iter().map(|s| s.mean).collect()
    }

    /// Average of the sample variances of all groups with at least two
    /// observations.
    pub fn pooled_variance(&self) -> Option<f64> {
        let vars = self
            .summaries
            .iter()
            .filter_map(|s| s.variance())
            .collect_vec();
        if vars.is_empty() {
            return None;
        }
        Some(vars.iter().sum::<f64>() / vars.len() as f64)
    }
}
