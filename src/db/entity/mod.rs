pub mod alert;
pub mod price;
