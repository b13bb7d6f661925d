pub mod absences;
pub mod core;
pub mod partials;
pub mod periods;
pub mod results;
pub mod storage;
pub mod subjects;
