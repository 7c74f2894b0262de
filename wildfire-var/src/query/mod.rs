//! Requêtes spatiales: fan-out concurrent puis tri des réponses

pub mod classify;
pub mod dispatch;

pub use classify::{classify, Classified};
pub use dispatch::{build_bundles, dispatch, DispatchError, DispatchReport, QueryBundle, QueryOutcome, QueryTemplate};
