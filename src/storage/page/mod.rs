pub mod page;
pub mod slotted;
