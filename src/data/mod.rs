//! External data collaborators: quote loaders, fixings, FX triangulation
//! and reference data.
pub mod fixings;
pub mod fx;
pub mod loader;
pub mod quote;
pub mod reference;

pub use fixings::{Fixing, FixingHistory};
pub use fx::FxTriangulation;
pub use loader::{CompositeLoader, DataError, InMemoryLoader, Loader, MarketDatum};
pub use quote::{QuoteLinkage, SimpleQuote};
pub use reference::{InMemoryReferenceData, ReferenceDataProvider, ReferenceDatum};
