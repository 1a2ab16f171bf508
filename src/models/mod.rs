pub mod article;
pub mod family;
pub mod user;

pub use article::*;
pub use family::*;
pub use user::*;
