pub mod assessment;
pub mod attendance;
pub mod fee;
pub mod lifecycle;
pub mod marksheet;
pub mod role;
pub mod school;
