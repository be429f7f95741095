//! Shift Left resources

pub mod resource_shift_left_cve_exception_list;
pub mod resource_shift_left_project;

pub use resource_shift_left_cve_exception_list::ShiftLeftCveExceptionListResource;
pub use resource_shift_left_project::ShiftLeftProjectResource;
