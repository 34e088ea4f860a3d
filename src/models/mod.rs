pub mod follow_up;
pub mod room;
pub mod shift;

pub use follow_up::{FollowUp, FollowUpCategory};
pub use room::Room;
pub use shift::Shift;
