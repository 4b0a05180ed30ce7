pub mod appointment;
pub mod dose_record;
pub mod enums;
pub mod medication;
pub mod patient;

pub use appointment::*;
pub use dose_record::*;
pub use medication::*;
pub use patient::*;
