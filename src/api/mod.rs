pub mod attendance;
pub mod exams;
pub mod fees;
pub mod marks;
