pub mod approximate;
pub mod universe;
