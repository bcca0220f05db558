pub mod user;
pub mod order;
pub mod payment;
pub mod message;
pub mod review;

pub use user::*;
pub use order::*;
pub use payment::*;
pub use message::*;
pub use review::*;
