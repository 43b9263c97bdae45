/// A single value or an ordered sequence of values.
///
/// Script operations such as `cwd`, `include` and `execute` accept either one
/// path or a list of paths and answer in the same shape they were given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

impl<T> OneOrMany<T> {
  /// Apply `f` to every element, keeping the shape.
  pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OneOrMany<U> {
    match self {
      OneOrMany::One(value) => OneOrMany::One(f(value)),
      OneOrMany::Many(values) => OneOrMany::Many(values.into_iter().map(f).collect()),
    }
  }

  /// Apply a fallible `f` to every element, stopping at the first error.
  pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<OneOrMany<U>, E> {
    match self {
      OneOrMany::One(value) => Ok(OneOrMany::One(f(value)?)),
      OneOrMany::Many(values) => Ok(OneOrMany::Many(
        values.into_iter().map(f).collect::<Result<Vec<_>, _>>()?,
      )),
    }
  }

  pub fn into_vec(self) -> Vec<T> {
    match self {
      OneOrMany::One(value) => vec![value],
      OneOrMany::Many(values) => values,
    }
  }

  pub fn is_one(&self) -> bool {
    matches!(self, OneOrMany::One(_))
  }

  /// The single value, if this is `One`.
  pub fn one(self) -> Option<T> {
    match self {
      OneOrMany::One(value) => Some(value),
      OneOrMany::Many(_) => None,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      OneOrMany::One(_) => 1,
      OneOrMany::Many(values) => values.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl From<&str> for OneOrMany<String> {
  fn from(value: &str) -> Self {
    OneOrMany::One(value.to_string())
  }
}

impl From<String> for OneOrMany<String> {
  fn from(value: String) -> Self {
    OneOrMany::One(value)
  }
}

impl From<&String> for OneOrMany<String> {
  fn from(value: &String) -> Self {
    OneOrMany::One(value.clone())
  }
}

impl From<Vec<String>> for OneOrMany<String> {
  fn from(values: Vec<String>) -> Self {
    OneOrMany::Many(values)
  }
}

impl From<Vec<&str>> for OneOrMany<String> {
  fn from(values: Vec<&str>) -> Self {
    OneOrMany::Many(values.into_iter().map(str::to_string).collect())
  }
}

impl From<&[&str]> for OneOrMany<String> {
  fn from(values: &[&str]) -> Self {
    OneOrMany::Many(values.iter().map(|s| s.to_string()).collect())
  }
}

impl<const N: usize> From<[&str; N]> for OneOrMany<String> {
  fn from(values: [&str; N]) -> Self {
    OneOrMany::Many(values.iter().map(|s| s.to_string()).collect())
  }
}
