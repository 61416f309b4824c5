pub mod ccass;
pub mod response;

pub use ccass::*;
pub use response::*;
