//! Derived signals: computed cells recomputed on source change.

use crate::scope::Scope;
use crate::signal::Signal;

/// Compute `f(source)` eagerly and recompute it on every source
/// notification. The subscription on `source` is released when `scope`
/// closes; the derived signal itself stays readable afterwards, frozen at
/// its last value.
pub fn derive<A, B>(source: &Signal<A>, f: impl Fn(&A) -> B + 'static, scope: &Scope) -> Signal<B>
where
    A: Clone + 'static,
    B: Clone + PartialEq + 'static,
{
    let initial = f(&source.get());
    let derived = Signal::new(initial);
    let output = derived.clone();
    let subscription = source.subscribe(move |value| output.set(f(value)));
    scope.defer(move || subscription.unsubscribe());
    derived
}

/// Multi-source variant of [`derive`]: recomputes `f` over a snapshot of
/// all sources whenever any of them notifies.
pub fn derive_all<A, B>(
    sources: &[Signal<A>],
    f: impl Fn(&[A]) -> B + 'static,
    scope: &Scope,
) -> Signal<B>
where
    A: Clone + 'static,
    B: Clone + PartialEq + 'static,
{
    let sources: Vec<Signal<A>> = sources.to_vec();
    let f = std::rc::Rc::new(f);
    let derived = Signal::new(f(&snapshot(&sources)));
    for source in &sources {
        let output = derived.clone();
        let f = f.clone();
        let all = sources.clone();
        let subscription = source.subscribe(move |_| output.set(f(&snapshot(&all))));
        scope.defer(move || subscription.unsubscribe());
    }
    derived
}

fn snapshot<A: Clone + 'static>(sources: &[Signal<A>]) -> Vec<A> {
    sources.iter().map(Signal::get).collect()
}
