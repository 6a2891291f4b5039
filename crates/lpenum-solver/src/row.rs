use std::fmt;

/// One equation of an augmented matrix `Ax = b`.
///
/// The last element is always the right-hand side `b`; everything before it is
/// a coefficient. The flags are set while the initial tableau is being built
/// and are carried along unchanged by every copy.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Row {
    elements: Vec<f64>,
    constraint: bool,
    negate: bool,
    needs_slack: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from coefficients followed by `b`
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            elements: values.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_constraint(mut self, constraint: bool) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_negation(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn with_slack(mut self, needs_slack: bool) -> Self {
        self.needs_slack = needs_slack;
        self
    }

    /// Append an element. The new value becomes `b`, the previous `b` becomes
    /// the last coefficient.
    pub fn push(&mut self, value: f64) {
        self.elements.push(value);
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.elements.get(index).copied()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut f64> {
        self.elements.get_mut(index)
    }

    /// Insert a coefficient just before `b`
    pub fn insert_a(&mut self, value: f64) {
        let at = self.elements.len().saturating_sub(1);
        self.elements.insert(at, value);
    }

    pub fn insert_front(&mut self, value: f64) {
        self.elements.insert(0, value);
    }

    pub fn remove_front(&mut self) -> Option<f64> {
        if self.elements.is_empty() {
            None
        } else {
            Some(self.elements.remove(0))
        }
    }

    /// Negate every element, `b` included
    pub fn negate(&mut self) {
        for value in &mut self.elements {
            *value = -*value;
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Right-hand side of the equation (0 for an empty row)
    pub fn b(&self) -> f64 {
        self.elements.last().copied().unwrap_or_default()
    }

    /// All coefficients, excluding `b`
    pub fn coefficients(&self) -> &[f64] {
        let end = self.elements.len().saturating_sub(1);
        &self.elements[..end]
    }

    pub fn values(&self) -> &[f64] {
        &self.elements
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.elements
    }

    pub fn is_constraint(&self) -> bool {
        self.constraint
    }

    pub fn needs_negation(&self) -> bool {
        self.negate
    }

    pub fn needs_slack(&self) -> bool {
        self.needs_slack
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

/// Two-decimal fixed notation: one leading space for non-negative values, a
/// bare sign for negative ones
pub(crate) fn format_value(value: f64) -> String {
    if value < 0.0 {
        format!("{:.2}", value)
    } else {
        // -0.0 + 0.0 is +0.0
        format!(" {:.2}", value + 0.0)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return writeln!(f);
        }
        for &value in self.coefficients() {
            write!(f, "\t{}", format_value(value))?;
        }
        writeln!(f, "\t |{}", format_value(self.b()))
    }
}
