//! Remote Layer
//!
//! Bindings to the ingredient REST service.

mod traits;
mod http;
mod memory;

pub use traits::IngredientRemote;
pub use http::HttpRemote;
pub use memory::InMemoryRemote;
