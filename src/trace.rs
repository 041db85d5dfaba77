//! Storage and summaries of sampled chains.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Float64Builder, StructArray},
    datatypes::{DataType, Field},
};
use itertools::Itertools;

use crate::{math, model::ParameterVector};

/// The draws of a single chain, in iteration order.
#[derive(Debug, Clone)]
pub struct Trace<S> {
    pub chain_id: u64,
    pub draws: Vec<S>,
}

impl<S> Trace<S> {
    pub(crate) fn with_capacity(chain_id: u64, capacity: usize) -> Self {
        Trace {
            chain_id,
            draws: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Fraction of draws for which `pred` holds, `None` for an empty trace.
    pub fn probability(&self, pred: impl Fn(&S) -> bool) -> Option<f64> {
        if self.draws.is_empty() {
            return None;
        }
        let hits = self.draws.iter().filter(|s| pred(s)).count();
        Some(hits as f64 / self.draws.len() as f64)
    }

    /// Evaluate a derived quantity for every draw.
    pub fn derived<T>(&self, f: impl Fn(&S) -> T) -> Vec<T> {
        self.draws.iter().map(f).collect()
    }
}

impl<S: ParameterVector> Trace<S> {
    pub fn param_names(&self) -> Vec<String> {
        self.draws.first().map(|s| s.names()).unwrap_or_default()
    }

    /// All values of one parameter, or `None` if no parameter has that name.
    pub fn param(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.param_names().iter().position(|n| n == name)?;
        let mut buffer = Vec::new();
        Some(
            self.draws
                .iter()
                .map(|s| {
                    buffer.clear();
                    s.write_values(&mut buffer);
                    buffer[idx]
                })
                .collect(),
        )
    }

    /// Posterior mean of a parameter.
    pub fn mean(&self, name: &str) -> Option<f64> {
        let values = self.param(name)?;
        if values.is_empty() {
            return None;
        }
        Some(math::mean(&values))
    }

    /// Posterior quantile of a parameter.
    pub fn quantile(&self, name: &str, q: f64) -> Option<f64> {
        math::quantile(&self.param(name)?, q)
    }

    /// Convert the trace into an arrow struct array with one Float64
    /// column per parameter.
    pub fn to_arrow(&self) -> Option<StructArray> {
        let names = self.param_names();
        if names.is_empty() {
            return None;
        }
        let mut builders = names
            .iter()
            .map(|_| Float64Builder::with_capacity(self.len()))
            .collect_vec();

        let mut buffer = Vec::with_capacity(names.len());
        for draw in self.draws.iter() {
            buffer.clear();
            draw.write_values(&mut buffer);
            for (builder, &value) in builders.iter_mut().zip(buffer.iter()) {
                builder.append_value(value);
            }
        }

        let fields = names
            .iter()
            .map(|name| Field::new(name, DataType::Float64, false))
            .collect_vec();
        let arrays = builders
            .into_iter()
            .map(|mut builder| Arc::new(builder.finish()) as ArrayRef)
            .collect_vec();
        Some(StructArray::new(fields.into(), arrays, None))
    }
}

/// Independent chains of the same model, sorted by chain id.
#[derive(Debug, Clone)]
pub struct MultiTrace<S> {
    pub chains: Vec<Trace<S>>,
}

impl<S> From<Vec<Trace<S>>> for MultiTrace<S> {
    fn from(mut chains: Vec<Trace<S>>) -> Self {
        chains.sort_unstable_by_key(|x| x.chain_id);
        MultiTrace { chains }
    }
}

impl<S: ParameterVector> MultiTrace<S> {
    /// Values of one parameter from all chains, concatenated.
    pub fn param(&self, name: &str) -> Option<Vec<f64>> {
        let per_chain: Option<Vec<Vec<f64>>> =
            self.chains.iter().map(|chain| chain.param(name)).collect();
        Some(per_chain?.concat())
    }

    pub fn mean(&self, name: &str) -> Option<f64> {
        let values = self.param(name)?;
        if values.is_empty() {
            return None;
        }
        Some(math::mean(&values))
    }

    /// Per chain posterior means of a parameter, for comparing chains.
    pub fn chain_means(&self, name: &str) -> Option<Vec<f64>> {
        self.chains.iter().map(|chain| chain.mean(name)).collect()
    }

    pub fn probability(&self, pred: impl Fn(&S) -> bool) -> Option<f64> {
        let total: usize = self.chains.iter().map(|c| c.len()).sum();
        if total == 0 {
            return None;
        }
        let hits: usize = self
            .chains
            .iter()
            .map(|c| c.draws.iter().filter(|s| pred(s)).count())
            .sum();
        Some(hits as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_models::Counter;
    use approx::assert_abs_diff_eq;
    use arrow::array::{Array, Float64Array};
    use pretty_assertions::assert_eq;

    fn counter_trace(chain_id: u64, values: &[f64]) -> Trace<Counter> {
        Trace {
            chain_id,
            draws: values.iter().map(|&value| Counter { value }).collect(),
        }
    }

    #[test]
    fn summaries() {
        let trace = counter_trace(0, &[1., 2., 3., 4.]);
        assert_eq!(trace.param_names(), vec!["value".to_string()]);
        assert_eq!(trace.param("value"), Some(vec![1., 2., 3., 4.]));
        assert_eq!(trace.param("other"), None);
        assert_abs_diff_eq!(trace.mean("value").unwrap(), 2.5);
        assert_abs_diff_eq!(trace.quantile("value", 0.5).unwrap(), 2.5);
        assert_eq!(trace.probability(|s| s.value > 2.5), Some(0.5));
        assert_eq!(trace.derived(|s| s.value * 2.), vec![2., 4., 6., 8.]);
    }

    #[test]
    fn empty_trace() {
        let trace = counter_trace(0, &[]);
        assert!(trace.is_empty());
        assert_eq!(trace.mean("value"), None);
        assert!(trace.to_arrow().is_none());
        assert_eq!(trace.probability(|s| s.value > 0.), None);

        let multi: MultiTrace<Counter> = vec![counter_trace(0, &[]), counter_trace(1, &[])].into();
        assert_eq!(multi.probability(|s| s.value > 0.), None);
    }

    #[test]
    fn arrow_columns() {
        let trace = counter_trace(0, &[1., 2., 3.]);
        let array = trace.to_arrow().unwrap();
        assert_eq!(array.len(), 3);
        let column = array
            .column_by_name("value")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(column.values().to_vec(), vec![1., 2., 3.]);
    }

    #[test]
    fn multi_trace_sorted() {
        let trace: MultiTrace<Counter> =
            vec![counter_trace(1, &[3., 5.]), counter_trace(0, &[1.])].into();
        assert_eq!(trace.chains[0].chain_id, 0);
        assert_eq!(trace.param("value"), Some(vec![1., 3., 5.]));
        assert_abs_diff_eq!(trace.mean("value").unwrap(), 3.);
        assert_eq!(trace.chain_means("value"), Some(vec![1., 4.]));
        assert_abs_diff_eq!(trace.probability(|s| s.value > 2.).unwrap(), 2. / 3.);
    }
}
