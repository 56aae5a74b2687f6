//! Output layer mapping logits to predictions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::activation::Sigmoid;
use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// Prediction task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Task {
    /// Click probability through a sigmoid
    #[default]
    Binary,
    /// Raw score
    Regression,
}

impl Task {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Binary => "binary",
            Task::Regression => "regression",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Task::Binary),
            "regression" => Ok(Task::Regression),
            _ => Err(LayerError::config("task must be binary or regression")),
        }
    }
}

impl TryFrom<String> for Task {
    type Error = LayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Task> for String {
    fn from(value: Task) -> Self {
        value.as_str().to_string()
    }
}

/// Adds an optional scalar bias and applies the task's output function.
///
/// ```
/// use ctr_layers::layer::Layer;
/// use ctr_layers::prediction::{PredictionLayer, Task};
/// use ctr_layers::tensor::Tensor;
///
/// let layer = PredictionLayer::new(Task::Binary, true);
/// let out = layer.forward(&Tensor::zeros(&[2, 1])).unwrap();
/// assert_eq!(out.data(), &[0.5, 0.5]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLayer {
    task: Task,
    bias: Option<Tensor>,
}

impl PredictionLayer {
    /// Creates a prediction layer; the bias starts at zero.
    pub fn new(task: Task, use_bias: bool) -> Self {
        Self {
            task,
            bias: use_bias.then(|| Tensor::zeros(&[1])),
        }
    }

    /// Returns the task.
    pub fn task(&self) -> Task {
        self.task
    }
}

impl Layer for PredictionLayer {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let logits = match &self.bias {
            Some(bias) => input.add(bias),
            None => input.clone(),
        };
        Ok(match self.task {
            Task::Binary => logits.map(Sigmoid::apply),
            Task::Regression => logits,
        })
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.bias.iter().collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.bias.iter_mut().collect()
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        self.bias.iter().map(|b| ("bias".to_string(), b)).collect()
    }

    fn name(&self) -> &str {
        "PredictionLayer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_task_parse() {
        assert_eq!("binary".parse::<Task>().unwrap(), Task::Binary);
        assert_eq!("regression".parse::<Task>().unwrap(), Task::Regression);
        let err = "multiclass".parse::<Task>().unwrap_err();
        assert!(err.to_string().contains("task must be binary or regression"));
    }

    #[test]
    fn test_binary_is_sigmoid() {
        let layer = PredictionLayer::new(Task::Binary, false);
        let out = layer
            .forward(&Tensor::from_data(&[2, 1], vec![0.0, 2.0]))
            .unwrap();
        assert_relative_eq!(out.data()[0], 0.5);
        assert_relative_eq!(out.data()[1], 1.0 / (1.0 + (-2.0f32).exp()), epsilon = 1e-6);
        assert!(layer.parameters().is_empty());
    }

    #[test]
    fn test_regression_is_identity_plus_bias() {
        let mut layer = PredictionLayer::new(Task::Regression, true);
        layer.parameters_mut()[0].data_mut()[0] = 1.5;
        let out = layer
            .forward(&Tensor::from_data(&[2, 1], vec![-1.0, 3.0]))
            .unwrap();
        assert_eq!(out.data(), &[0.5, 4.5]);
    }
}
