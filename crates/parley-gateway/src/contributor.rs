use parley_engine::Execution;
use parley_message::Headers;

/// Adds gateway-specific headers to outbound requests.
///
/// Contributed headers never replace mapped variables or correlation
/// headers with the same key.
pub trait HeaderContributor: Send + Sync {
  fn contribute(&self, execution: &Execution) -> Headers;
}

impl<F> HeaderContributor for F
where
  F: Fn(&Execution) -> Headers + Send + Sync,
{
  fn contribute(&self, execution: &Execution) -> Headers {
    self(execution)
  }
}
