pub mod profile;
pub mod response;
pub mod schema;
pub mod stock;
pub mod table;

pub use profile::*;
pub use response::*;
pub use stock::*;
pub use table::Table;
