use crate::rates::RateParameters;

/// Inputs that shape the engine apart from the events themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsConfig {
    /// Ordered state variable names; the order fixes effect-size positions.
    pub variables: Vec<String>,
    /// Explicit subject list. When absent, subjects are taken from the events
    /// in order of first appearance.
    pub subjects: Option<Vec<String>>,
    /// Initial rate parameters. Defaults to unit rates with zero effects.
    pub parameters: Option<RateParameters>,
}

impl DynamicsConfig {
    /// Configuration over the given state variables.
    pub fn new<I>(variables: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            subjects: None,
            parameters: None,
        }
    }

    /// Replace the variables with a comma-delimited list such as
    /// `"Network, Hospital,Ward"`. Names are trimmed; empty entries skipped.
    pub fn with_variable_list(mut self, list: &str) -> Self {
        self.variables = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Fix the subject universe instead of inferring it.
    pub fn with_subjects<I>(mut self, subjects: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.subjects = Some(subjects.into_iter().map(Into::into).collect());
        self
    }

    /// Set the initial rate parameters.
    pub fn with_parameters(mut self, parameters: RateParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Initial parameters, or neutral ones sized to the variable list.
    pub fn initial_parameters(&self) -> RateParameters {
        self.parameters
            .clone()
            .unwrap_or_else(|| RateParameters::neutral(self.variables.len()))
    }
}
