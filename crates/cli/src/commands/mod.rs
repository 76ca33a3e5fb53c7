pub mod doctor;
pub mod onboard;
pub mod scores;
pub mod serve;
pub mod session;
