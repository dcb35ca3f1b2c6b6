use std::fmt::Debug;
use std::hash::Hash;

/// A component: plain data that a binder turns into a view.
///
/// Components are modelled as a closed enum. `kind` returns the field-less
/// tag that selects the binder, so dispatch is a table lookup and never needs
/// runtime type introspection.
///
/// ```rust
/// use weft_core::Model;
///
/// #[derive(Clone, Debug)]
/// enum Ui {
///     Label(String),
///     Counter(i32),
/// }
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum UiKind {
///     Label,
///     Counter,
/// }
///
/// impl Model for Ui {
///     type Kind = UiKind;
///     fn kind(&self) -> UiKind {
///         match self {
///             Ui::Label(_) => UiKind::Label,
///             Ui::Counter(_) => UiKind::Counter,
///         }
///     }
/// }
///
/// assert_eq!(Ui::Counter(1).kind(), UiKind::Counter);
/// ```
pub trait Model: Clone + Debug + 'static {
    type Kind: Copy + Eq + Hash + Debug + 'static;

    fn kind(&self) -> Self::Kind;
}
