mod increment_u32_id;
pub use increment_u32_id::increment_u32_id;

mod now;
pub use now::{deadline_from_millis, now_millis};
