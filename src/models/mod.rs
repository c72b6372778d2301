pub mod scan_result;
pub mod size;
pub mod target;
