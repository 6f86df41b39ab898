/// Receives events emitted by equipment while it builds or settles.
///
/// Observers let callers log, count, or assert on internal decisions (a
/// mixed tank, a suppressed evaporation layer) without changing the
/// equipment API.
///
/// Closures automatically implement `Observer`, and a built-in impl for `()`
/// provides a no-op observer.
pub trait Observer<E> {
    /// Observes one event.
    fn observe(&mut self, event: &E);
}

/// Blanket implementation for observer closures.
impl<E, F> Observer<E> for F
where
    F: FnMut(&E),
{
    fn observe(&mut self, event: &E) {
        self(event);
    }
}

/// A no-op observer.
impl<E> Observer<E> for () {
    fn observe(&mut self, _event: &E) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(observer: &mut impl Observer<u32>) {
        for event in [1, 2, 3] {
            observer.observe(&event);
        }
    }

    #[test]
    fn closures_collect_events() {
        let mut seen = Vec::new();
        emit(&mut |e: &u32| seen.push(*e));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn unit_ignores_events() {
        emit(&mut ());
    }
}
