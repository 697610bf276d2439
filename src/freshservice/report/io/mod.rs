pub mod console;
pub mod excel_write;
