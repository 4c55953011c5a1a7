pub mod applicant;
pub mod application;
pub mod company;
pub mod job;
pub mod location;
pub mod profession;
