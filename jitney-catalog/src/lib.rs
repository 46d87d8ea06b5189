pub mod composer;
pub mod menu;

pub use composer::{ComposeError, OrderComposer, OrderLine, OrderLineRequest};
pub use menu::{MenuItem, MenuRepository};
