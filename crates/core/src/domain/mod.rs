pub mod conversation;
pub mod criterion;
pub mod device;
pub mod history;
pub mod selectors;
