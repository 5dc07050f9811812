pub mod categorize;
pub mod error;
pub mod hist;
pub mod io;
pub mod pipeline;
pub mod plot;
pub mod table;
pub mod variable;

pub use error::{Error, Result};
pub use hist::{build_histogram, Histogram};
pub use table::EventTable;
pub use variable::Variable;
