/// A projection folds an ordered event stream into derived state.
///
/// Projections are the explicit accumulators of a replay: all mutable state
/// lives in the implementing struct and is threaded through `apply`, one
/// event at a time. They are:
///
/// - **Deterministic**: the same events in the same order give the same outputs.
/// - **Disposable**: nothing is persisted; a new replay starts from a fresh value.
/// - **Order-sensitive**: callers sort the stream before applying it.
pub trait Projection {
    type Ev;
    type Output;

    /// Apply a single event and report the state it produced.
    fn apply(&mut self, event: &Self::Ev) -> Self::Output;
}

/// Run every event through `projection`, collecting one output per event.
pub fn replay<'a, P, I>(projection: &mut P, events: I) -> Vec<P::Output>
where
    P: Projection,
    P::Ev: 'a,
    I: IntoIterator<Item = &'a P::Ev>,
{
    events.into_iter().map(|ev| projection.apply(ev)).collect()
}

/// [`replay`] for fallible projections: stops at the first failing event.
pub fn try_replay<'a, P, I, T, E>(projection: &mut P, events: I) -> Result<Vec<T>, E>
where
    P: Projection<Output = Result<T, E>>,
    P::Ev: 'a,
    I: IntoIterator<Item = &'a P::Ev>,
{
    events.into_iter().map(|ev| projection.apply(ev)).collect()
}
